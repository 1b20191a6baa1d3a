//! 客户端唯一标识生成

/// 生成新的唯一 ID（UUID v4 字符串）
///
/// 用于仓库历史记录 ID 和后端未提供 ID 的报告。
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
