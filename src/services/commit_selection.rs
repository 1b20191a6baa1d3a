//! # 提交选择管理
//!
//! 维护作为报告输入的提交集合，与当前显示哪个仓库无关。
//! 集合元素是 `CommitRef`（哈希 + 仓库 ID），因此可以跨多个同时打开的仓库选择。
//!
//! 选择集合只存在于本次会话，不持久化。集合本身允许包含已卸载仓库的引用；
//! 发送给报告后端之前由调用方按活跃仓库过滤（见 `commands::reports`）。

use std::collections::{BTreeSet, HashSet};
use std::sync::{PoisonError, RwLock};

use crate::models::CommitRef;

/// 提交选择管理器
#[derive(Debug, Default)]
pub struct CommitSelectionManager {
    selected: RwLock<BTreeSet<CommitRef>>,
}

impl CommitSelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换选择状态：已选中则移除，未选中则加入
    ///
    /// # 返回值
    /// 切换后是否处于选中状态
    pub fn toggle(&self, commit: &CommitRef) -> bool {
        let mut selected = self.selected.write().unwrap_or_else(PoisonError::into_inner);
        if selected.remove(commit) {
            false
        } else {
            selected.insert(commit.clone());
            true
        }
    }

    pub fn clear(&self) {
        self.selected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_selected(&self, commit: &CommitRef) -> bool {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(commit)
    }

    /// 当前选择（按仓库 ID、哈希排序）
    pub fn selected(&self) -> Vec<CommitRef> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.selected.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 只保留属于指定仓库的选择，在仓库被卸载后用于收敛选择集合
    ///
    /// # 返回值
    /// 被移除的引用数量
    pub fn retain_repos(&self, active_repo_ids: &HashSet<String>) -> usize {
        let mut selected = self.selected.write().unwrap_or_else(PoisonError::into_inner);
        let before = selected.len();
        selected.retain(|commit| active_repo_ids.contains(&commit.repo_id));
        before - selected.len()
    }
}
