//! # 提交 diff 缓存服务
//!
//! 展开提交行时需要完整 diff，获取代价较高。本服务提供旁路缓存（cache-aside）：
//! - **缓存命中**：直接返回，不做任何 I/O
//! - **请求合并**：同一提交的 diff 正在获取时，后到的调用立即返回 `InFlight`，
//!   不会发起第二次请求；需要结果的调用方可以 `wait_for` 等待
//! - **失败可重试**：获取失败只清除加载标记，不写入缓存，下次 `load` 会重新获取
//!
//! 正确性保证是"任意时刻同一键最多一个进行中的请求"，而不是"同一键只请求一次"。
//!
//! ## 缓存键
//! 哈希只在单个仓库内唯一，缓存以 `CommitRef`（哈希 + 仓库 ID）为键。
//!
//! ## 容量策略
//! 使用 `lru::LruCache` 限制条目数（默认 `DIFF_CACHE_MAX_ENTRIES`），
//! 满时淘汰最久未使用的 diff。没有过期时间。
//!
//! ## 不变量
//! 对任意键，"在加载集合中"与"已有缓存条目"互斥。

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::backend::RepositoryBackend;
use crate::models::CommitRef;

/// diff 缓存的默认最大条目数
pub const DIFF_CACHE_MAX_ENTRIES: usize = 200;

/// 一次 `load` 调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLoad {
    /// 已缓存，未发起请求
    Cached,
    /// 已有进行中的请求，本次调用未发起请求
    InFlight,
    /// 本次调用发起请求并成功写入缓存
    Loaded,
    /// 本次调用发起的请求失败（已记录日志，未写入缓存）
    Failed(String),
}

/// 缓存统计信息，与后端 `get_cache_stats` 的返回结构保持一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffCacheStats {
    /// 缓存条目数
    pub count: usize,
    /// diff 文本占用的大致内存（MB）
    pub memory_mb: f64,
    /// 命中率（百分比）
    pub hit_rate: f64,
}

struct DiffCacheState {
    entries: LruCache<CommitRef, String>,
    loading: HashSet<CommitRef>,
    hits: u64,
    misses: u64,
}

/// 提交 diff 缓存
pub struct DiffCache {
    state: Mutex<DiffCacheState>,
    /// 每次缓存内容或加载集合变化时递增，供 `wait_for` 感知
    revision: watch::Sender<u64>,
}

impl DiffCache {
    /// 创建指定容量的缓存（容量为 0 时按 1 处理）
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(DiffCacheState {
                entries: LruCache::new(capacity),
                loading: HashSet::new(),
                hits: 0,
                misses: 0,
            }),
            revision,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DiffCacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// 同步读取缓存的 diff
    pub fn get(&self, commit: &CommitRef) -> Option<String> {
        self.lock().entries.get(commit).cloned()
    }

    pub fn is_loading(&self, commit: &CommitRef) -> bool {
        self.lock().loading.contains(commit)
    }

    /// 按需加载提交的 diff
    ///
    /// # 参数
    /// - `backend` - 仓库后端
    /// - `repo_path` - 提交所在仓库的路径
    /// - `commit` - 提交引用
    ///
    /// # 返回值
    /// 见 `DiffLoad`。后端错误在这里被捕获并记录，不向上传播。
    pub async fn load<B: RepositoryBackend>(
        &self,
        backend: &B,
        repo_path: &str,
        commit: &CommitRef,
    ) -> DiffLoad {
        {
            let mut state = self.lock();
            if state.entries.get(commit).is_some() {
                state.hits += 1;
                return DiffLoad::Cached;
            }
            if state.loading.contains(commit) {
                return DiffLoad::InFlight;
            }
            state.misses += 1;
            state.loading.insert(commit.clone());
        }
        self.bump();

        // 调用方在请求途中丢弃 future 时，守卫负责清除加载标记
        let guard = LoadingGuard {
            cache: self,
            commit: Some(commit.clone()),
        };

        let result = backend.get_commit_diff(repo_path, &commit.hash).await;
        guard.complete(result)
    }

    /// 等待进行中的请求结束并返回缓存内容
    ///
    /// 没有进行中的请求时立即返回当前缓存内容；请求失败时返回 `None`。
    pub async fn wait_for(&self, commit: &CommitRef) -> Option<String> {
        // 先订阅再检查状态，避免检查与订阅之间的变化被漏掉
        let mut revision = self.revision.subscribe();
        loop {
            {
                let mut state = self.lock();
                if !state.loading.contains(commit) {
                    return state.entries.get(commit).cloned();
                }
            }
            if revision.changed().await.is_err() {
                return None;
            }
        }
    }

    /// 清空缓存和统计（进行中的请求不受影响，完成后照常写入）
    pub fn clear(&self) {
        {
            let mut state = self.lock();
            state.entries.clear();
            state.hits = 0;
            state.misses = 0;
        }
        self.bump();
    }

    pub fn stats(&self) -> DiffCacheStats {
        let state = self.lock();
        let bytes: usize = state.entries.iter().map(|(_, diff)| diff.len()).sum();
        let total = state.hits + state.misses;
        DiffCacheStats {
            count: state.entries.len(),
            memory_mb: bytes as f64 / 1024.0 / 1024.0,
            hit_rate: if total > 0 {
                state.hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

impl Default for DiffCache {
    fn default() -> Self {
        Self::new(DIFF_CACHE_MAX_ENTRIES)
    }
}

/// 进行中请求的加载标记守卫
struct LoadingGuard<'a> {
    cache: &'a DiffCache,
    commit: Option<CommitRef>,
}

impl LoadingGuard<'_> {
    /// 请求结束：清除加载标记，成功时写入缓存
    fn complete(mut self, result: Result<String, String>) -> DiffLoad {
        let Some(commit) = self.commit.take() else {
            return DiffLoad::InFlight;
        };
        let outcome = {
            let mut state = self.cache.lock();
            state.loading.remove(&commit);
            match result {
                Ok(diff) => {
                    state.entries.put(commit, diff);
                    DiffLoad::Loaded
                }
                Err(e) => {
                    log::warn!("获取提交 {} 的 diff 失败: {}", commit.hash, e);
                    DiffLoad::Failed(e)
                }
            }
        };
        self.cache.bump();
        outcome
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(commit) = self.commit.take() {
            self.cache.lock().loading.remove(&commit);
            self.cache.bump();
        }
    }
}
