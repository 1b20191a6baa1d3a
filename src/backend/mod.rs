//! # 外部协作者接口
//!
//! 会话引擎本身不做 git 操作，也不调用 LLM。它通过以下窄接口与外部协作者交互：
//! - `RepositoryBackend` - 打开仓库、按时间范围获取提交、获取单个提交的 diff
//! - `ReportBackend` - 将分组后的提交生成报告，生成过程中可在进度通道上推送文本块
//! - `ProgressSource` - 报告生成进度的发布/订阅通道（见 `progress`）
//!
//! 所有调用都是异步的，失败时以 `Err(String)` 返回可读的错误信息。
//! 返回的 Future 要求 `Send`，以便在 tokio 任务中驱动。

pub mod progress;
#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

use crate::models::{Commit, CommitGroup, RepoInfo, Report, ReportKind};

pub use progress::{ProgressHub, ProgressSource, REPORT_PROGRESS_EVENT};

/// 仓库后端
pub trait RepositoryBackend: Send + Sync {
    /// 打开仓库并返回快照
    fn open_repository(&self, path: &str)
    -> impl Future<Output = Result<RepoInfo, String>> + Send;

    /// 获取 `[from, to]`（Unix 秒）范围内的提交，按时间倒序
    fn get_commits(
        &self,
        path: &str,
        from: i64,
        to: i64,
    ) -> impl Future<Output = Result<Vec<Commit>, String>> + Send;

    /// 获取单个提交的完整 diff 文本
    fn get_commit_diff(
        &self,
        path: &str,
        hash: &str,
    ) -> impl Future<Output = Result<String, String>> + Send;
}

/// 报告后端
pub trait ReportBackend: Send + Sync {
    /// 生成报告
    ///
    /// 生成期间可以在 `REPORT_PROGRESS_EVENT` 通道上推送零个或多个文本块，
    /// 返回时给出完整报告。
    fn generate_report(
        &self,
        kind: ReportKind,
        groups: Vec<CommitGroup>,
        template_id: Option<String>,
    ) -> impl Future<Output = Result<Report, String>> + Send;
}
