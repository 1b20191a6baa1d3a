//! # 仓库会话数据模型
//!
//! - `RepoHistoryItem`：持久化的仓库历史记录，用于侧边栏快速重新打开和排序
//! - `ActiveRepoEntry`：运行期活跃仓库条目，仅在本次会话内存在，从不持久化

use serde::{Deserialize, Serialize};

use super::commit::{Commit, RepoInfo};

/// 仓库历史记录
///
/// `id` 对每个唯一的 `path` 只生成一次；任何两条记录都不会共享同一个 `path`。
/// 重新打开或切换仓库时只更新 `last_accessed`，其余字段创建后不再改变。
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface RepoHistoryItem {
///   id: string;
///   path: string;
///   name: string;
///   branch: string;
///   totalCommits: number;
///   lastAccessed: number;
///   addedAt: number;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoHistoryItem {
    pub id: String,
    pub path: String,
    pub name: String,
    pub branch: String,
    pub total_commits: usize,

    /// 首次加入历史的时间（Unix 毫秒）
    pub added_at: i64,

    /// 最近一次打开或切换的时间（Unix 毫秒），淘汰和排序都以它为准
    pub last_accessed: i64,
}

impl RepoHistoryItem {
    /// 转换回仓库快照（用于从历史记录重新打开）
    pub fn repo_info(&self) -> RepoInfo {
        RepoInfo {
            path: self.path.clone(),
            name: self.name.clone(),
            branch: self.branch.clone(),
            total_commits: self.total_commits,
        }
    }
}

/// 运行期活跃仓库条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRepoEntry {
    pub repo_id: String,
    pub repo_info: RepoInfo,
    pub commits: Vec<Commit>,
}
