//! # 提交 diff 流程
//!
//! 界面展开某个提交时调用 `expand_commit`：先查缓存，未命中再按需加载，
//! 同一提交已有进行中的请求时等待它完成而不是再发一次。

use crate::backend::RepositoryBackend;
use crate::models::CommitRef;
use crate::services::diff_cache::{DiffCacheStats, DiffLoad};
use crate::state::AppState;

/// 展开提交，返回它的 diff 文本
///
/// # 返回值
/// diff 文本；仓库无法解析或加载失败时返回 `None`（失败已记录日志，再次展开会重试）
pub async fn expand_commit<B: RepositoryBackend>(
    state: &AppState,
    backend: &B,
    commit: &CommitRef,
) -> Option<String> {
    if let Some(diff) = state.diffs.get(commit) {
        return Some(diff);
    }

    let repo_path = match state.repos.active_repo(&commit.repo_id) {
        Some(entry) => entry.repo_info.path,
        None => match state.repos.history_item(&commit.repo_id) {
            Some(item) => item.path,
            None => {
                log::debug!("提交 {} 所属仓库 {} 未知，忽略", commit.hash, commit.repo_id);
                return None;
            }
        },
    };

    match state.diffs.load(backend, &repo_path, commit).await {
        DiffLoad::Cached | DiffLoad::Loaded => state.diffs.get(commit),
        DiffLoad::InFlight => state.diffs.wait_for(commit).await,
        DiffLoad::Failed(_) => None,
    }
}

/// diff 缓存统计
pub fn cache_stats(state: &AppState) -> DiffCacheStats {
    state.diffs.stats()
}

/// 清空 diff 缓存
pub fn clear_cache(state: &AppState) {
    state.diffs.clear();
    log::info!("diff 缓存已清空");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::testing::{FakeRepoBackend, commit};
    use crate::services::storage::MemoryStorage;
    use crate::state::SessionOptions;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStorage::new()), SessionOptions::default())
    }

    #[tokio::test]
    async fn test_concurrent_expands_share_one_fetch() {
        let state = state();
        let backend = FakeRepoBackend::new().with_repo("/repo/a", vec![commit("a1", 1)]);
        let repo_id = state
            .repos
            .open_and_register(&backend, "/repo/a")
            .await
            .unwrap();
        let target = CommitRef::new("a1", repo_id.as_str());

        let (first, second, third) = tokio::join!(
            expand_commit(&state, &backend, &target),
            expand_commit(&state, &backend, &target),
            expand_commit(&state, &backend, &target),
        );

        assert_eq!(backend.diff_calls(), 1);
        let expected = Some("diff --git /repo/a a1".to_string());
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(third, expected);
        assert_eq!(cache_stats(&state).count, 1);
    }

    #[tokio::test]
    async fn test_failed_expand_retries_next_time() {
        let state = state();
        let backend = FakeRepoBackend::new().with_repo("/repo/a", vec![commit("a1", 1)]);
        let repo_id = state
            .repos
            .open_and_register(&backend, "/repo/a")
            .await
            .unwrap();
        let target = CommitRef::new("a1", repo_id.as_str());

        backend.set_fail_diffs(true);
        assert_eq!(expand_commit(&state, &backend, &target).await, None);
        backend.set_fail_diffs(false);
        assert!(expand_commit(&state, &backend, &target).await.is_some());
        assert_eq!(backend.diff_calls(), 2);

        clear_cache(&state);
        assert_eq!(cache_stats(&state).count, 0);
    }

    #[tokio::test]
    async fn test_unknown_repo_is_ignored() {
        let state = state();
        let backend = FakeRepoBackend::new();
        assert_eq!(
            expand_commit(&state, &backend, &CommitRef::new("x", "missing")).await,
            None
        );
        assert_eq!(backend.diff_calls(), 0);
    }
}
