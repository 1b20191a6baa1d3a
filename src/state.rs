//! # 应用全局状态
//!
//! `AppState` 持有会话引擎的全部 store，是界面层唯一需要管理的状态对象；
//! 所有编排流程（`commands` 模块）都以 `&AppState` 为入口。
//!
//! ## 线程安全
//! 每个 store 内部自行加锁，`AppState` 本身只读共享，可以放进 `Arc` 在多个任务间使用。

use std::sync::Arc;

use crate::services::commit_selection::CommitSelectionManager;
use crate::services::config_store::ConfigStore;
use crate::services::diff_cache::{DIFF_CACHE_MAX_ENTRIES, DiffCache};
use crate::services::repo_session::{REPO_HISTORY_MAX, RepoSessionStore};
use crate::services::report_session::ReportSessionStore;
use crate::services::storage::{FileStorage, SharedStorage};
use crate::services::stream::StreamAggregator;
use crate::utils::clock::{Clock, system_clock};

/// 打开仓库时默认加载的提交时间窗口（天）
pub const DEFAULT_COMMIT_WINDOW_DAYS: u32 = 30;

/// 会话引擎的可调参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// 仓库历史记录上限
    pub repo_history_max: usize,
    /// diff 缓存条目上限
    pub diff_cache_max_entries: usize,
    /// 报告历史上限；`None` 表示不限制
    pub report_history_max: Option<usize>,
    /// 打开仓库时加载最近多少天的提交
    pub commit_window_days: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            repo_history_max: REPO_HISTORY_MAX,
            diff_cache_max_entries: DIFF_CACHE_MAX_ENTRIES,
            report_history_max: None,
            commit_window_days: DEFAULT_COMMIT_WINDOW_DAYS,
        }
    }
}

/// 应用全局状态
pub struct AppState {
    pub repos: RepoSessionStore,
    pub selection: CommitSelectionManager,
    pub diffs: DiffCache,
    pub reports: ReportSessionStore,
    pub stream: StreamAggregator,
    pub config: ConfigStore,
    pub options: SessionOptions,
    clock: Clock,
}

impl AppState {
    /// 使用系统时钟创建状态，并从存储中恢复持久化切片
    pub fn new(storage: SharedStorage, options: SessionOptions) -> Self {
        Self::with_clock(storage, options, system_clock())
    }

    /// 使用指定时钟创建状态
    pub fn with_clock(storage: SharedStorage, options: SessionOptions, clock: Clock) -> Self {
        Self {
            repos: RepoSessionStore::new(
                Arc::clone(&storage),
                Arc::clone(&clock),
                options.repo_history_max,
            ),
            selection: CommitSelectionManager::new(),
            diffs: DiffCache::new(options.diff_cache_max_entries),
            reports: ReportSessionStore::new(
                Arc::clone(&storage),
                Arc::clone(&clock),
                options.report_history_max,
            ),
            stream: StreamAggregator::new(),
            config: ConfigStore::load(storage),
            options,
            clock,
        }
    }

    /// 在默认数据目录（`~/.gitlog-ai-reporter/`）下创建状态
    ///
    /// # 错误
    /// 无法确定或创建数据目录时返回错误信息
    pub fn open_default() -> Result<Self, String> {
        let storage: SharedStorage = Arc::new(FileStorage::open_default()?);
        Ok(Self::new(storage, SessionOptions::default()))
    }

    /// 当前时间（Unix 毫秒）
    pub fn now_millis(&self) -> i64 {
        (self.clock)()
    }
}
