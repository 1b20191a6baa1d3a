//! # 报告数据模型
//!
//! - `ReportKind`：周报 / 月报 / 自定义
//! - `Report`：报告后端返回的原始生成结果
//! - `ReportSession`：引擎内部跟踪、可重命名和编辑的报告会话（持久化到报告历史）

use serde::{Deserialize, Serialize};

use super::commit::Commit;

/// 报告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Weekly,
    Monthly,
    Custom,
}

impl ReportKind {
    /// 默认报告名称使用的中文标签
    pub fn label(self) -> &'static str {
        match self {
            Self::Weekly => "周报",
            Self::Monthly => "月报",
            Self::Custom => "自定义报告",
        }
    }
}

/// 报告后端的生成结果
///
/// 后端可能不提供 `id` 或 `name`，缺失时由引擎补齐。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub kind: ReportKind,

    /// 生成时间（Unix 毫秒）
    pub generated_at: i64,

    pub content: String,

    pub commits: Vec<Commit>,
}

/// 报告会话
///
/// `generated_at` 创建后不可变；`last_modified` 在重命名和编辑内容时更新。
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface Report {
///   id: string;
///   name: string;
///   type: 'weekly' | 'monthly' | 'custom';
///   generatedAt: number;
///   lastModified: number;
///   content: string;
///   commits: Commit[];
///   repoIds: string[];
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSession {
    pub id: String,
    pub name: String,

    #[serde(rename = "type")]
    pub kind: ReportKind,

    pub content: String,
    pub commits: Vec<Commit>,
    pub generated_at: i64,
    pub last_modified: i64,

    /// 参与生成此报告的仓库 ID 列表
    pub repo_ids: Vec<String>,
}
