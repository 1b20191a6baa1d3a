//! # 数据模型模块
//!
//! 定义了与前端 TypeScript 类型一一对应的 Rust 数据结构。
//! 所有结构体均派生 `Serialize` 和 `Deserialize`，用于 IPC 传输和持久化存储读写。
//! - `commit` - 提交、提交引用、仓库快照和报告输入分组
//! - `repo` - 仓库历史记录和运行期活跃仓库条目
//! - `report` - 报告类型、后端生成结果和报告会话
//! - `config` - LLM 提供商、代理和导出格式等应用配置

pub mod commit;
pub mod config;
pub mod repo;
pub mod report;

pub use commit::{Commit, CommitGroup, CommitRef, RepoInfo, TimeRange};
pub use config::{AppConfig, ExportFormat, LlmProvider, ProviderKind, ProviderSettings, ProxyConfig};
pub use repo::{ActiveRepoEntry, RepoHistoryItem};
pub use report::{Report, ReportKind, ReportSession};
