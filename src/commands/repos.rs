//! # 仓库相关流程
//!
//! - `open_repository` - 打开仓库：登记历史、加载提交、设为当前仓库
//! - `reopen_from_history` - 从历史记录重新打开
//! - `refresh_commits` - 按时间范围重新加载某个仓库的提交
//! - `switch_repository` - 切换当前仓库
//! - `unload_repository` / `remove_repository` - 卸载活跃仓库 / 从历史记录删除
//!
//! 打开（可能触发历史淘汰）、卸载或删除仓库后会同步收敛提交选择集合，
//! 使选择中只剩活跃仓库的提交。

use std::collections::HashSet;

use crate::backend::RepositoryBackend;
use crate::models::{Commit, TimeRange};
use crate::state::AppState;

/// 打开仓库
///
/// 依次完成：调用后端打开并登记到历史记录，加载默认时间窗口内的提交，
/// 加入活跃仓库，设为当前仓库。
///
/// # 参数
/// - `state` - 应用全局状态
/// - `backend` - 仓库后端
/// - `path` - 仓库路径
///
/// # 返回值
/// 该仓库的稳定 `repo_id`
///
/// # 错误
/// 打开失败时不修改任何状态；提交加载失败时仓库已登记到历史记录，但不会成为活跃仓库
pub async fn open_repository<B: RepositoryBackend>(
    state: &AppState,
    backend: &B,
    path: &str,
) -> Result<String, String> {
    let repo_id = state.repos.open_and_register(backend, path).await?;
    // 登记可能淘汰最久未访问的仓库，它的已选提交随之移除
    reconcile_selection(state);
    let range = TimeRange::Days(state.options.commit_window_days);
    load_commits(state, backend, &repo_id, range).await?;
    state.repos.switch_to(&repo_id);
    log::info!("已打开仓库: {} ({})", path, repo_id);
    Ok(repo_id)
}

/// 从历史记录重新打开仓库
///
/// # 错误
/// `repo_id` 不在历史记录中，或后端打开 / 加载提交失败时返回错误信息
pub async fn reopen_from_history<B: RepositoryBackend>(
    state: &AppState,
    backend: &B,
    repo_id: &str,
) -> Result<String, String> {
    let item = state
        .repos
        .history_item(repo_id)
        .ok_or_else(|| format!("仓库不在历史记录中: {}", repo_id))?;
    open_repository(state, backend, &item.path).await
}

/// 按时间范围重新加载仓库的提交，替换活跃条目中的提交列表
///
/// # 返回值
/// 加载到的提交数量
///
/// # 错误
/// `repo_id` 不在历史记录中或后端失败时返回错误信息，原有提交保持不变
pub async fn refresh_commits<B: RepositoryBackend>(
    state: &AppState,
    backend: &B,
    repo_id: &str,
    range: TimeRange,
) -> Result<usize, String> {
    let commits = load_commits(state, backend, repo_id, range).await?;
    Ok(commits.len())
}

async fn load_commits<B: RepositoryBackend>(
    state: &AppState,
    backend: &B,
    repo_id: &str,
    range: TimeRange,
) -> Result<Vec<Commit>, String> {
    let item = state
        .repos
        .history_item(repo_id)
        .ok_or_else(|| format!("仓库不在历史记录中: {}", repo_id))?;
    let (from, to) = range.window(state.now_millis());
    let commits = backend.get_commits(&item.path, from, to).await?;
    log::debug!(
        "{} 加载了 {} 个提交（{}）",
        item.name,
        commits.len(),
        range.label()
    );
    state
        .repos
        .add_active_repo(repo_id, item.repo_info(), commits.clone());
    Ok(commits)
}

/// 切换当前仓库；未知 ID 静默忽略
pub fn switch_repository(state: &AppState, repo_id: &str) -> bool {
    state.repos.switch_to(repo_id)
}

/// 卸载活跃仓库（保留历史记录），并移除该仓库的已选提交
pub fn unload_repository(state: &AppState, repo_id: &str) -> bool {
    let removed = state.repos.remove_active_repo(repo_id);
    if removed {
        reconcile_selection(state);
    }
    removed
}

/// 从历史记录中删除仓库，并移除该仓库的已选提交
pub fn remove_repository(state: &AppState, repo_id: &str) -> bool {
    let removed = state.repos.remove_from_history(repo_id);
    if removed {
        reconcile_selection(state);
    }
    removed
}

fn reconcile_selection(state: &AppState) {
    let active: HashSet<String> = state.repos.active_repo_ids().into_iter().collect();
    let dropped = state.selection.retain_repos(&active);
    if dropped > 0 {
        log::debug!("移除了 {} 个已卸载仓库的选择", dropped);
    }
}
