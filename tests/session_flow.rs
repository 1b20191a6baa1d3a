//! 端到端会话流程：打开仓库 → 选择提交 → 展开 diff → 生成报告 → 重启后恢复

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use gitlog_reporter::commands::{diffs, reports, repos};
use gitlog_reporter::models::{Commit, CommitGroup, CommitRef, RepoInfo, Report, ReportKind};
use gitlog_reporter::services::storage::{FileStorage, SharedStorage};
use gitlog_reporter::utils::clock::{Clock, now_millis};
use gitlog_reporter::{AppState, ProgressHub, ReportBackend, RepositoryBackend, SessionOptions};
use pretty_assertions::assert_eq;

fn commit(hash: &str, timestamp: i64) -> Commit {
    Commit {
        hash: hash.to_string(),
        author: "bob".to_string(),
        email: "bob@example.com".to_string(),
        timestamp,
        message: format!("fix: {}", hash),
        repo_id: None,
    }
}

/// 从当前时间开始、每次读取递增 1 毫秒的时钟
fn increasing_clock() -> Clock {
    let counter = Arc::new(AtomicI64::new(now_millis()));
    Arc::new(move || counter.fetch_add(1, Ordering::SeqCst))
}

/// 内存中的仓库集合，提交时间戳都落在最近几天内
struct InMemoryRepos {
    repos: HashMap<String, Vec<Commit>>,
    diff_calls: AtomicUsize,
}

impl InMemoryRepos {
    fn new() -> Self {
        let now = now_millis() / 1000;
        let mut repos = HashMap::new();
        repos.insert(
            "/work/api".to_string(),
            vec![commit("c3", now - 3_600), commit("c2", now - 7_200)],
        );
        // 与 api 仓库共享一个哈希（fork）
        repos.insert(
            "/work/api-fork".to_string(),
            vec![commit("c3", now - 3_600)],
        );
        Self {
            repos,
            diff_calls: AtomicUsize::new(0),
        }
    }
}

impl RepositoryBackend for InMemoryRepos {
    async fn open_repository(&self, path: &str) -> Result<RepoInfo, String> {
        let commits = self
            .repos
            .get(path)
            .ok_or_else(|| format!("不是有效的 Git 仓库: {}", path))?;
        Ok(RepoInfo {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            branch: "main".to_string(),
            total_commits: commits.len(),
        })
    }

    async fn get_commits(&self, path: &str, from: i64, to: i64) -> Result<Vec<Commit>, String> {
        let commits = self
            .repos
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
        tokio::task::yield_now().await;
        Ok(format!("{}@{}", hash, path))
    }
}

/// 按仓库逐段推送摘要的报告后端
struct ScriptedWriter {
    hub: Arc<ProgressHub>,
}

impl ReportBackend for ScriptedWriter {
    async fn generate_report(
        &self,
        kind: ReportKind,
        groups: Vec<CommitGroup>,
        _template_id: Option<String>,
    ) -> Result<Report, String> {
        let mut content = String::new();
        for group in &groups {
            let line = format!("- {}: {} 个提交\n", group.repo_name, group.commits.len());
            self.hub.emit(line.clone());
            content.push_str(&line);
            tokio::task::yield_now().await;
        }
        Ok(Report {
            id: String::new(),
            name: Some("第 46 周周报".to_string()),
            kind,
            generated_at: 1_763_000_000_000,
            content,
            commits: groups.into_iter().flat_map(|g| g.commits).collect(),
        })
    }
}

#[tokio::test]
async fn test_full_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend = InMemoryRepos::new();
    let hub = Arc::new(ProgressHub::new());
    let writer = ScriptedWriter {
        hub: Arc::clone(&hub),
    };

    let (api, fork, report_id) = {
        let storage: SharedStorage = Arc::new(FileStorage::new(dir.path()).unwrap());
        let state = AppState::with_clock(storage, SessionOptions::default(), increasing_clock());

        let api = repos::open_repository(&state, &backend, "/work/api").await.unwrap();
        let fork = repos::open_repository(&state, &backend, "/work/api-fork")
            .await
            .unwrap();
        assert_ne!(api, fork);
        assert_eq!(state.repos.current_repo_id(), Some(fork.clone()));
        assert_eq!(state.repos.aggregated_commits().len(), 3);

        // 同一哈希在两个仓库中是两个独立的选择和两个独立的 diff
        state.selection.toggle(&CommitRef::new("c3", api.as_str()));
        state.selection.toggle(&CommitRef::new("c2", api.as_str()));
        state.selection.toggle(&CommitRef::new("c3", fork.as_str()));
        let api_diff = diffs::expand_commit(&state, &backend, &CommitRef::new("c3", api.as_str()))
            .await
            .unwrap();
        let fork_diff =
            diffs::expand_commit(&state, &backend, &CommitRef::new("c3", fork.as_str()))
                .await
                .unwrap();
        assert_eq!(api_diff, "c3@/work/api");
        assert_eq!(fork_diff, "c3@/work/api-fork");
        diffs::expand_commit(&state, &backend, &CommitRef::new("c3", api.as_str()))
            .await
            .unwrap();
        assert_eq!(backend.diff_calls.load(Ordering::SeqCst), 2);

        let session = reports::generate_report(
            &state,
            &writer,
            hub.as_ref(),
            ReportKind::Weekly,
            None,
        )
        .await
        .unwrap();
        assert_eq!(session.name, "第 46 周周报");
        assert_eq!(session.commits.len(), 3);
        assert_eq!(state.stream.text(), session.content);
        assert!(!state.reports.is_generating());

        // 第二次生成沿用同一个订阅
        reports::generate_report(&state, &writer, hub.as_ref(), ReportKind::Weekly, None)
            .await
            .unwrap();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(state.reports.history().len(), 2);
        assert!(reports::delete_report(&state, &state.reports.current().unwrap().id));

        (api, fork, session.id)
    };

    let storage: SharedStorage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let restored = AppState::new(storage, SessionOptions::default());

    let history_ids: Vec<String> = restored.repos.history().into_iter().map(|i| i.id).collect();
    assert_eq!(history_ids, vec![fork.clone(), api.clone()]);
    assert_eq!(restored.repos.current_repo_id(), Some(fork));
    assert!(restored.repos.active_repo_ids().is_empty());
    assert!(restored.selection.is_empty());
    assert_eq!(restored.diffs.stats().count, 0);

    let report_ids: Vec<String> = restored.reports.history().into_iter().map(|r| r.id).collect();
    assert_eq!(report_ids, vec![report_id]);
    assert_eq!(restored.reports.current(), None);
    assert!(!restored.reports.is_generating());
    assert!(!restored.stream.is_subscribed());

    // 重启后从历史记录重新打开得到同一个 ID
    let reopened = repos::reopen_from_history(&restored, &backend, &api).await.unwrap();
    assert_eq!(reopened, api);
}
