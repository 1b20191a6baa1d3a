//! 单元测试用的假协作者

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{ProgressHub, ReportBackend, RepositoryBackend};
use crate::models::{Commit, CommitGroup, RepoInfo, Report, ReportKind};
use crate::utils::path::repo_display_name;

pub fn commit(hash: &str, timestamp: i64) -> Commit {
    Commit {
        hash: hash.to_string(),
        author: "alice".to_string(),
        email: "alice@example.com".to_string(),
        timestamp,
        message: format!("feat: {}", hash),
        repo_id: None,
    }
}

pub fn repo_info(path: &str) -> RepoInfo {
    RepoInfo {
        path: path.to_string(),
        name: repo_display_name(path),
        branch: "main".to_string(),
        total_commits: 0,
    }
}

/// 假仓库后端：按路径登记仓库，diff 调用计数并可切换为失败模式
#[derive(Default)]
pub struct FakeRepoBackend {
    repos: Mutex<HashMap<String, Vec<Commit>>>,
    diff_calls: AtomicUsize,
    fail_diffs: AtomicBool,
}

impl FakeRepoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, path: &str, commits: Vec<Commit>) -> Self {
        if let Ok(mut repos) = self.repos.lock() {
            repos.insert(path.to_string(), commits);
        }
        self
    }

    pub fn set_fail_diffs(&self, fail: bool) {
        self.fail_diffs.store(fail, Ordering::SeqCst);
    }

    pub fn diff_calls(&self) -> usize {
        self.diff_calls.load(Ordering::SeqCst)
    }
}

impl RepositoryBackend for FakeRepoBackend {
    async fn open_repository(&self, path: &str) -> Result<RepoInfo, String> {
        tokio::task::yield_now().await;
        let total = {
            let repos = self.repos.lock().map_err(|e| e.to_string())?;
            repos.get(path).map(|commits| commits.len())
        };
        match total {
            Some(total_commits) => Ok(RepoInfo {
                total_commits,
                ..repo_info(path)
            }),
            None => Err(format!("不是有效的 Git 仓库: {}", path)),
        }
    }

    async fn get_commits(&self, path: &str, from: i64, to: i64) -> Result<Vec<Commit>, String> {
        tokio::task::yield_now().await;
        let repos = self.repos.lock().map_err(|e| e.to_string())?;
        let commits = repos
            .get(path)
            .ok_or_else(|| format!("不是有效的 Git 仓库: {}", path))?;
        Ok(commits
            .iter()
            .filter(|c| c.timestamp >= from && c.timestamp <= to)
            .cloned()
            .collect())
    }

    async fn get_commit_diff(&self, path: &str, hash: &str) -> Result<String, String> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        if self.fail_diffs.load(Ordering::SeqCst) {
            return Err(format!("获取 diff 失败: {}", hash));
        }
        Ok(format!("diff --git {} {}", path, hash))
    }
}

/// 假报告后端：在进度通道上依次推送预设文本块，然后返回拼接后的报告
pub struct FakeReportBackend {
    hub: Arc<ProgressHub>,
    chunks: Vec<String>,
    fail: AtomicBool,
    calls: AtomicUsize,
    last_groups: Mutex<Vec<CommitGroup>>,
}

impl FakeReportBackend {
    pub fn new(hub: Arc<ProgressHub>, chunks: &[&str]) -> Self {
        Self {
            hub,
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_groups: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_groups(&self) -> Vec<CommitGroup> {
        self.last_groups
            .lock()
            .map(|groups| groups.clone())
            .unwrap_or_default()
    }
}

impl ReportBackend for FakeReportBackend {
    async fn generate_report(
        &self,
        kind: ReportKind,
        groups: Vec<CommitGroup>,
        _template_id: Option<String>,
    ) -> Result<Report, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_groups.lock() {
            *last = groups.clone();
        }
        for chunk in &self.chunks {
            self.hub.emit(chunk.clone());
            tokio::task::yield_now().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err("LLM 请求失败: 503".to_string());
        }
        Ok(Report {
            id: String::new(),
            name: None,
            kind,
            generated_at: 1_700_000_000_000,
            content: self.chunks.concat(),
            commits: groups.into_iter().flat_map(|g| g.commits).collect(),
        })
    }
}
