//! # 提交与仓库数据模型
//!
//! 定义了仓库后端返回的提交（Commit）、仓库快照（RepoInfo），
//! 以及跨仓库选择时使用的复合身份（CommitRef）和报告输入分组（CommitGroup）。

use serde::{Deserialize, Serialize};

/// 单个提交
///
/// 由仓库后端 `get_commits` 返回。`hash` 只在单个仓库内唯一，
/// 多仓库聚合展示时通过 `repo_id` 标记来源仓库。
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface Commit {
///   hash: string;
///   author: string;
///   email: string;
///   timestamp: number;
///   message: string;
///   repoId?: string;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// 完整提交哈希
    pub hash: String,

    /// 作者名称
    pub author: String,

    /// 作者邮箱
    pub email: String,

    /// 提交时间（Unix 秒）
    pub timestamp: i64,

    /// 提交信息
    pub message: String,

    /// 来源仓库 ID：仅在多仓库聚合视图中存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
}

impl Commit {
    /// 返回此提交在指定仓库中的复合引用
    pub fn reference(&self, repo_id: &str) -> CommitRef {
        CommitRef::new(self.hash.clone(), repo_id)
    }
}

/// 提交的跨仓库身份：`hash` + `repo_id`
///
/// 同一个哈希可能出现在多个仓库（例如 fork），因此选择集合和 diff 缓存
/// 都以 CommitRef 而不是裸哈希为键。派生 `Ord` 以便放入有序集合。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    pub repo_id: String,
    pub hash: String,
}

impl CommitRef {
    pub fn new(hash: impl Into<String>, repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            hash: hash.into(),
        }
    }
}

/// 仓库快照
///
/// 在打开仓库时由后端生成，之后不会自动重新校验。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    /// 仓库根目录的绝对路径（历史记录的自然键）
    pub path: String,

    /// 仓库显示名称（通常是目录名）
    pub name: String,

    /// 打开时所在的分支
    pub branch: String,

    /// 打开时的提交总数
    pub total_commits: usize,
}

/// 报告生成的输入分组：一个仓库贡献的所有已选提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitGroup {
    pub repo_id: String,
    pub repo_path: String,
    pub repo_name: String,
    pub commits: Vec<Commit>,
}

/// 提交列表的时间范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7days")]
    Last7Days,
    #[default]
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "3months")]
    Last3Months,
    #[serde(rename = "6months")]
    Last6Months,
    /// 自定义天数
    #[serde(rename = "days")]
    Days(u32),
}

impl TimeRange {
    pub fn days(self) -> u32 {
        match self {
            Self::Last7Days => 7,
            Self::Last30Days => 30,
            Self::Last3Months => 90,
            Self::Last6Months => 180,
            Self::Days(days) => days,
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Last7Days => "最近 7 天".to_string(),
            Self::Last30Days => "最近 30 天".to_string(),
            Self::Last3Months => "最近 3 个月".to_string(),
            Self::Last6Months => "最近 6 个月".to_string(),
            Self::Days(days) => format!("最近 {} 天", days),
        }
    }

    /// 以 `now_millis` 为终点的 `(from, to)`，单位为 Unix 秒
    pub fn window(self, now_millis: i64) -> (i64, i64) {
        let span_millis = i64::from(self.days()) * 24 * 60 * 60 * 1000;
        ((now_millis - span_millis) / 1000, now_millis / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_ref_identity_includes_repo() {
        let commit = Commit {
            hash: "abc".to_string(),
            author: "alice".to_string(),
            email: "alice@example.com".to_string(),
            timestamp: 1,
            message: "init".to_string(),
            repo_id: None,
        };
        assert_eq!(commit.reference("repo-a"), CommitRef::new("abc", "repo-a"));
        assert_ne!(commit.reference("repo-a"), commit.reference("repo-b"));
    }

    #[test]
    fn test_time_range_window() {
        let now = 1_700_000_000_000;
        assert_eq!(
            TimeRange::Last7Days.window(now),
            (1_700_000_000 - 7 * 86_400, 1_700_000_000)
        );
        assert_eq!(TimeRange::default().days(), 30);
        assert_eq!(TimeRange::Days(14).label(), "最近 14 天");

        let parsed: TimeRange = serde_json::from_str("\"3months\"").unwrap();
        assert_eq!(parsed, TimeRange::Last3Months);
    }
}
