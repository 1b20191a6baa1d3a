//! # 仓库会话 store
//!
//! 管理两类仓库状态：
//! - **仓库历史**（持久化）：打开过的仓库列表 + 当前仓库 ID，按 `last_accessed` 倒序展示
//! - **活跃仓库**（运行期）：本次会话已加载提交的仓库，以 `repo_id` 为键
//!
//! ## 身份规则
//! 仓库以 `path` 为自然键：同一路径无论打开多少次都只有一条历史记录、一个稳定的 `repo_id`。
//! 重复打开只刷新 `last_accessed`。
//!
//! ## 容量与淘汰
//! 历史记录最多保留 `REPO_HISTORY_MAX` 条。每次插入后如果超出上限，
//! 反复移除 `last_accessed` 最小（最久未访问）的记录直到回到上限。
//!
//! ## 线程安全
//! 状态放在 `RwLock` 中；锁从不跨越 `.await` 持有，后端调用期间不会阻塞其他操作。
//! 打开仓库失败时不产生任何部分修改。

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::backend::RepositoryBackend;
use crate::models::{ActiveRepoEntry, Commit, RepoHistoryItem, RepoInfo};
use crate::services::storage::{self, REPO_HISTORY_KEY, SharedStorage};
use crate::utils::clock::Clock;
use crate::utils::id::new_id;
use crate::utils::path::repo_display_name;

/// 仓库历史记录的默认容量上限
pub const REPO_HISTORY_MAX: usize = 20;

/// 仓库会话的持久化切片
///
/// 这是仓库 store 中唯一会被序列化的部分。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSessionDurable {
    #[serde(default)]
    pub repo_history: Vec<RepoHistoryItem>,
    #[serde(default)]
    pub current_repo_id: Option<String>,
}

/// 仓库会话的运行期切片：启动时总是为空
#[derive(Debug, Default)]
struct RepoSessionRuntime {
    active_repos: HashMap<String, ActiveRepoEntry>,
}

#[derive(Debug, Default)]
struct RepoSessionState {
    durable: RepoSessionDurable,
    runtime: RepoSessionRuntime,
}

/// 仓库会话 store
pub struct RepoSessionStore {
    state: RwLock<RepoSessionState>,
    storage: SharedStorage,
    clock: Clock,
    capacity: usize,
}

impl RepoSessionStore {
    /// 从存储中恢复仓库历史并创建 store
    ///
    /// 恢复时会修正不满足不变量的持久化数据：同一路径的重复记录只保留最近访问的一条，
    /// 超出容量的记录被淘汰，指向不存在记录的当前仓库 ID 被清空。
    pub fn new(storage: SharedStorage, clock: Clock, capacity: usize) -> Self {
        let mut durable: RepoSessionDurable =
            storage::load_or_default(storage.as_ref(), REPO_HISTORY_KEY);

        let mut by_path: HashMap<String, RepoHistoryItem> = HashMap::new();
        for item in durable.repo_history.drain(..) {
            match by_path.get(&item.path) {
                Some(existing) if existing.last_accessed >= item.last_accessed => {}
                _ => {
                    by_path.insert(item.path.clone(), item);
                }
            }
        }
        durable.repo_history = by_path.into_values().collect();

        let mut state = RepoSessionState {
            durable,
            runtime: RepoSessionRuntime::default(),
        };
        let capacity = capacity.max(1);
        evict_overflow(&mut state, capacity);
        if let Some(current) = state.durable.current_repo_id.clone() {
            if find_index(&state.durable, &current).is_none() {
                state.durable.current_repo_id = None;
            }
        }

        log::info!(
            "恢复仓库历史: {} 条记录",
            state.durable.repo_history.len()
        );

        Self {
            state: RwLock::new(state),
            storage,
            clock,
            capacity,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RepoSessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RepoSessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &RepoSessionState) {
        storage::persist(self.storage.as_ref(), REPO_HISTORY_KEY, &state.durable);
    }

    // ======== 打开与注册 ========

    /// 打开仓库并登记到历史记录
    ///
    /// 先调用仓库后端获取 `RepoInfo`，成功后再登记。后端失败时直接返回错误，
    /// store 不发生任何修改。
    ///
    /// # 返回值
    /// 该路径对应的稳定 `repo_id`
    pub async fn open_and_register<B: RepositoryBackend>(
        &self,
        backend: &B,
        path: &str,
    ) -> Result<String, String> {
        let info = backend.open_repository(path).await?;
        Ok(self.register(&info))
    }

    /// 将仓库快照登记到历史记录
    ///
    /// 路径已存在时只刷新 `last_accessed` 并返回原 ID；否则创建新记录，
    /// 然后执行容量淘汰。
    pub fn register(&self, info: &RepoInfo) -> String {
        let mut state = self.write();
        let now = (self.clock)();

        let repo_id = match state
            .durable
            .repo_history
            .iter_mut()
            .find(|item| item.path == info.path)
        {
            Some(item) => {
                item.last_accessed = now;
                item.id.clone()
            }
            None => {
                let id = new_id();
                let name = if info.name.trim().is_empty() {
                    repo_display_name(&info.path)
                } else {
                    info.name.clone()
                };
                log::info!("新仓库加入历史: {} ({})", name, info.path);
                state.durable.repo_history.push(RepoHistoryItem {
                    id: id.clone(),
                    path: info.path.clone(),
                    name,
                    branch: info.branch.clone(),
                    total_commits: info.total_commits,
                    added_at: now,
                    last_accessed: now,
                });
                evict_overflow(&mut state, self.capacity);
                id
            }
        };

        self.persist(&state);
        repo_id
    }

    // ======== 活跃仓库 ========

    /// 插入或替换活跃仓库条目，不影响历史排序
    pub fn add_active_repo(&self, repo_id: &str, repo_info: RepoInfo, commits: Vec<Commit>) {
        let mut state = self.write();
        state.runtime.active_repos.insert(
            repo_id.to_string(),
            ActiveRepoEntry {
                repo_id: repo_id.to_string(),
                repo_info,
                commits,
            },
        );
    }

    /// 卸载活跃仓库（保留历史记录）
    ///
    /// # 返回值
    /// 条目存在并被移除时返回 true
    pub fn remove_active_repo(&self, repo_id: &str) -> bool {
        self.write().runtime.active_repos.remove(repo_id).is_some()
    }

    pub fn active_repo(&self, repo_id: &str) -> Option<ActiveRepoEntry> {
        self.read().runtime.active_repos.get(repo_id).cloned()
    }

    pub fn is_active(&self, repo_id: &str) -> bool {
        self.read().runtime.active_repos.contains_key(repo_id)
    }

    /// 所有活跃仓库 ID（排序后返回，保证结果稳定）
    pub fn active_repo_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().runtime.active_repos.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 多仓库聚合视图：所有活跃仓库的提交，标记来源 `repo_id`，按时间倒序
    pub fn aggregated_commits(&self) -> Vec<Commit> {
        let state = self.read();
        let mut commits: Vec<Commit> = state
            .runtime
            .active_repos
            .values()
            .flat_map(|entry| {
                entry.commits.iter().map(|commit| Commit {
                    repo_id: Some(entry.repo_id.clone()),
                    ..commit.clone()
                })
            })
            .collect();
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
        commits
    }

    // ======== 当前仓库 ========

    /// 切换当前仓库并刷新其 `last_accessed`
    ///
    /// 未知的 `repo_id` 被视为界面层的不一致，静默忽略。
    ///
    /// # 返回值
    /// 切换成功返回 true，ID 不存在返回 false
    pub fn switch_to(&self, repo_id: &str) -> bool {
        let mut state = self.write();
        let now = (self.clock)();
        let Some(index) = find_index(&state.durable, repo_id) else {
            log::debug!("切换到未知仓库 {}，忽略", repo_id);
            return false;
        };
        state.durable.repo_history[index].last_accessed = now;
        state.durable.current_repo_id = Some(repo_id.to_string());
        self.persist(&state);
        true
    }

    pub fn current_repo_id(&self) -> Option<String> {
        self.read().durable.current_repo_id.clone()
    }

    /// 当前仓库的单仓库视图
    ///
    /// 只有当前仓库存在且已加载（活跃）时才返回。
    pub fn current_repo(&self) -> Option<ActiveRepoEntry> {
        let state = self.read();
        let current = state.durable.current_repo_id.as_ref()?;
        state.runtime.active_repos.get(current).cloned()
    }

    // ======== 历史记录 ========

    /// 从历史记录中移除仓库
    ///
    /// 同时卸载对应的活跃条目；如果它是当前仓库，当前仓库被清空。
    ///
    /// # 返回值
    /// 记录存在并被移除时返回 true
    pub fn remove_from_history(&self, repo_id: &str) -> bool {
        let mut state = self.write();
        let Some(index) = find_index(&state.durable, repo_id) else {
            return false;
        };
        remove_at(&mut state, index);
        self.persist(&state);
        true
    }

    /// 历史记录，按 `last_accessed` 倒序
    pub fn history(&self) -> Vec<RepoHistoryItem> {
        let mut items = self.read().durable.repo_history.clone();
        items.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        items
    }

    pub fn history_item(&self, repo_id: &str) -> Option<RepoHistoryItem> {
        let state = self.read();
        find_index(&state.durable, repo_id).map(|index| state.durable.repo_history[index].clone())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn find_index(durable: &RepoSessionDurable, repo_id: &str) -> Option<usize> {
    durable.repo_history.iter().position(|item| item.id == repo_id)
}

/// 移除一条历史记录，并维护当前仓库和活跃条目的一致性
fn remove_at(state: &mut RepoSessionState, index: usize) -> RepoHistoryItem {
    let item = state.durable.repo_history.remove(index);
    state.runtime.active_repos.remove(&item.id);
    if state.durable.current_repo_id.as_deref() == Some(item.id.as_str()) {
        state.durable.current_repo_id = None;
    }
    item
}

/// 超出容量时反复淘汰最久未访问的记录
fn evict_overflow(state: &mut RepoSessionState, capacity: usize) {
    while state.durable.repo_history.len() > capacity {
        let Some(index) = state
            .durable
            .repo_history
            .iter()
            .enumerate()
            .min_by_key(|(_, item)| item.last_accessed)
            .map(|(index, _)| index)
        else {
            break;
        };
        let evicted = remove_at(state, index);
        log::info!("仓库历史已满，淘汰: {} ({})", evicted.name, evicted.path);
    }
}
