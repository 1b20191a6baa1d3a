//! # 业务逻辑服务模块
//!
//! 会话引擎的各个 store 及其支撑服务，与 `commands` 编排层解耦：
//! - `repo_session` - 仓库历史（持久化）与活跃仓库（运行期）
//! - `commit_selection` - 跨仓库的提交选择集合
//! - `diff_cache` - 提交 diff 的 LRU 缓存，同一提交同时只有一次加载
//! - `report_session` - 当前报告、生成中标志与报告历史
//! - `stream` - 报告生成进度的流式聚合
//! - `config_store` - 应用配置（LLM 提供商、代理、导出格式）
//! - `storage` - 持久化切片的键值存储
//! - `push` - 钉钉 / 飞书推送客户端

pub mod commit_selection;
pub mod config_store;
pub mod diff_cache;
pub mod push;
pub mod repo_session;
pub mod report_session;
pub mod storage;
pub mod stream;
