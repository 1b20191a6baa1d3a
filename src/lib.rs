//! # GitLog AI Reporter - 会话状态与缓存引擎
//!
//! 本 crate 是报告应用的客户端状态层：它不做 git 操作，也不调用 LLM，
//! 而是通过 `backend` 中的窄接口驱动外部协作者，并维护界面需要的全部会话状态：
//! - 仓库历史（持久化，最多 20 条，LRU 淘汰）与本次会话的活跃仓库
//! - 跨仓库的提交选择
//! - 提交 diff 的按需加载缓存（同一提交同时只有一次请求）
//! - 报告历史与当前报告、生成中标志
//! - 报告生成进度的流式聚合
//! - 应用配置（LLM 提供商、代理、导出格式）
//!
//! ## 模块结构
//! - `state` - `AppState`：持有所有 store 的全局状态
//! - `commands/` - 面向界面的编排流程
//! - `services/` - 各个 store、持久化存储、推送客户端
//! - `backend/` - 协作者接口与进程内进度通道
//! - `models/` - 数据模型（对应前端 TypeScript 类型）
//! - `utils/` - 通用工具函数

pub mod backend;
pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use backend::{ProgressHub, ProgressSource, REPORT_PROGRESS_EVENT, ReportBackend, RepositoryBackend};
pub use state::{AppState, SessionOptions};

/// 安装日志输出
///
/// 库本身只通过 `log` 宏记录日志；宿主程序调用此函数安装 tracing 订阅者，
/// `log` 记录经桥接后一并输出。过滤级别读取 `RUST_LOG`，默认 `info`。
/// 已安装过订阅者时静默跳过。
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
