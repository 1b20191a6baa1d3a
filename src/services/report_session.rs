//! # 报告会话 store
//!
//! 跟踪当前显示的报告和报告历史：
//! - **报告历史**（持久化）：生成或编辑过的报告，最新的在前；以及上次打开的报告 ID
//! - **当前报告 / 生成中标志**（运行期）：启动时由上次打开的报告 ID 恢复当前报告
//!
//! `is_generating` 是给调用方用的互斥标志：一次生成未结束前不应发起第二次。
//! store 本身不拒绝并发调用，这一约束由 `commands::reports` 执行。
//!
//! ## 容量策略
//! 默认不限制报告历史数量；可以通过 `SessionOptions::report_history_max`
//! 设置上限，超出时淘汰 `generated_at` 最早的报告。

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::models::ReportSession;
use crate::services::storage::{self, REPORT_HISTORY_KEY, SharedStorage};
use crate::utils::clock::Clock;

/// 报告会话的持久化切片
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSessionDurable {
    #[serde(default)]
    pub report_history: Vec<ReportSession>,
    #[serde(default)]
    pub last_open_report_id: Option<String>,
}

#[derive(Debug, Default)]
struct ReportSessionRuntime {
    current: Option<ReportSession>,
    is_generating: bool,
}

#[derive(Debug, Default)]
struct ReportSessionState {
    durable: ReportSessionDurable,
    runtime: ReportSessionRuntime,
}

/// 报告会话 store
pub struct ReportSessionStore {
    state: RwLock<ReportSessionState>,
    storage: SharedStorage,
    clock: Clock,
    capacity: Option<usize>,
}

impl ReportSessionStore {
    pub fn new(storage: SharedStorage, clock: Clock, capacity: Option<usize>) -> Self {
        let durable: ReportSessionDurable =
            storage::load_or_default(storage.as_ref(), REPORT_HISTORY_KEY);
        let current = durable.last_open_report_id.as_ref().and_then(|id| {
            durable
                .report_history
                .iter()
                .find(|report| &report.id == id)
                .cloned()
        });

        let mut state = ReportSessionState {
            durable,
            runtime: ReportSessionRuntime {
                current,
                is_generating: false,
            },
        };
        if state.runtime.current.is_none() {
            state.durable.last_open_report_id = None;
        }
        if let Some(capacity) = capacity {
            evict_overflow(&mut state, capacity.max(1));
        }

        log::info!(
            "恢复报告历史: {} 份报告",
            state.durable.report_history.len()
        );

        Self {
            state: RwLock::new(state),
            storage,
            clock,
            capacity: capacity.map(|c| c.max(1)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ReportSessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ReportSessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &ReportSessionState) {
        storage::persist(self.storage.as_ref(), REPORT_HISTORY_KEY, &state.durable);
    }

    // ======== 当前报告与生成状态 ========

    /// 设置当前显示的报告（不要求它在历史中）
    pub fn set_current(&self, report: Option<ReportSession>) {
        let mut state = self.write();
        let id = report.as_ref().map(|r| r.id.clone());
        let in_history = id
            .as_ref()
            .is_some_and(|id| state.durable.report_history.iter().any(|r| &r.id == id));
        state.runtime.current = report;
        state.durable.last_open_report_id = if in_history { id } else { None };
        self.persist(&state);
    }

    pub fn current(&self) -> Option<ReportSession> {
        self.read().runtime.current.clone()
    }

    pub fn set_generating(&self, generating: bool) {
        self.write().runtime.is_generating = generating;
    }

    pub fn is_generating(&self) -> bool {
        self.read().runtime.is_generating
    }

    /// 检查并设置生成中标志
    ///
    /// # 返回值
    /// 之前不在生成中、本次成功置位时返回 true
    pub fn try_begin_generating(&self) -> bool {
        let mut state = self.write();
        if state.runtime.is_generating {
            return false;
        }
        state.runtime.is_generating = true;
        true
    }

    // ======== 报告历史 ========

    /// 加入报告历史（放在最前面）；ID 已存在时原位替换，保留原有的 `generated_at`
    pub fn add(&self, report: ReportSession) {
        let mut state = self.write();
        let history = &mut state.durable.report_history;
        let stored = match history.iter_mut().find(|r| r.id == report.id) {
            Some(existing) => {
                *existing = ReportSession {
                    generated_at: existing.generated_at,
                    ..report
                };
                existing.clone()
            }
            None => {
                history.insert(0, report.clone());
                report
            }
        };
        if state
            .runtime
            .current
            .as_ref()
            .is_some_and(|current| current.id == stored.id)
        {
            state.runtime.current = Some(stored);
        }
        if let Some(capacity) = self.capacity {
            evict_overflow(&mut state, capacity);
        }
        self.persist(&state);
    }

    /// 从报告历史中移除；移除的是当前报告时清空当前报告
    pub fn remove(&self, report_id: &str) -> bool {
        let mut state = self.write();
        let Some(index) = find_index(&state.durable, report_id) else {
            return false;
        };
        remove_at(&mut state, index);
        self.persist(&state);
        true
    }

    /// 切换当前报告为历史中的某一份；ID 不存在时静默忽略
    pub fn switch_to(&self, report_id: &str) -> bool {
        let mut state = self.write();
        let Some(index) = find_index(&state.durable, report_id) else {
            log::debug!("切换到未知报告 {}，忽略", report_id);
            return false;
        };
        state.runtime.current = Some(state.durable.report_history[index].clone());
        state.durable.last_open_report_id = Some(report_id.to_string());
        self.persist(&state);
        true
    }

    /// 重命名报告并更新 `last_modified`
    pub fn rename(&self, report_id: &str, name: &str) -> bool {
        let now = (self.clock)();
        self.modify(report_id, |report| {
            report.name = name.to_string();
            report.last_modified = now;
        })
    }

    /// 编辑报告内容并更新 `last_modified`
    pub fn edit_content(&self, report_id: &str, content: &str) -> bool {
        let now = (self.clock)();
        self.modify(report_id, |report| {
            report.content = content.to_string();
            report.last_modified = now;
        })
    }

    /// 修改历史中的报告，并同步到当前报告
    fn modify(&self, report_id: &str, apply: impl Fn(&mut ReportSession)) -> bool {
        let mut state = self.write();
        let Some(index) = find_index(&state.durable, report_id) else {
            return false;
        };
        apply(&mut state.durable.report_history[index]);
        if let Some(current) = state.runtime.current.as_mut() {
            if current.id == report_id {
                apply(current);
            }
        }
        self.persist(&state);
        true
    }

    pub fn get(&self, report_id: &str) -> Option<ReportSession> {
        let state = self.read();
        find_index(&state.durable, report_id).map(|index| state.durable.report_history[index].clone())
    }

    /// 报告历史，最新加入的在前
    pub fn history(&self) -> Vec<ReportSession> {
        self.read().durable.report_history.clone()
    }
}

fn find_index(durable: &ReportSessionDurable, report_id: &str) -> Option<usize> {
    durable.report_history.iter().position(|r| r.id == report_id)
}

fn remove_at(state: &mut ReportSessionState, index: usize) -> ReportSession {
    let report = state.durable.report_history.remove(index);
    if state
        .runtime
        .current
        .as_ref()
        .is_some_and(|current| current.id == report.id)
    {
        state.runtime.current = None;
    }
    if state.durable.last_open_report_id.as_deref() == Some(report.id.as_str()) {
        state.durable.last_open_report_id = None;
    }
    report
}

/// 超出容量时淘汰生成时间最早的报告
fn evict_overflow(state: &mut ReportSessionState, capacity: usize) {
    while state.durable.report_history.len() > capacity {
        let Some(index) = state
            .durable
            .report_history
            .iter()
            .enumerate()
            .min_by_key(|(_, report)| report.generated_at)
            .map(|(index, _)| index)
        else {
            break;
        };
        let evicted = remove_at(state, index);
        log::info!("报告历史已满，淘汰: {}", evicted.name);
    }
}
