//! # 报告生成与报告历史流程
//!
//! `generate_report` 是一次完整的生成请求：
//! 1. 已有生成进行中时直接拒绝
//! 2. 只保留属于活跃仓库的已选提交，按仓库分组
//! 3. 置位生成中标志，进入流式生成（清空缓冲区），调用报告后端
//! 4. 无论成功失败都结束流式生成并清除生成中标志；
//!    请求在等待后端时被丢弃（如外层超时）也会由守卫完成同样的收尾
//! 5. 成功时补全 ID 和名称，加入报告历史并设为当前报告
//!
//! 重命名、编辑、删除、切换直接转发给报告 store。

use std::collections::{BTreeMap, HashSet};

use crate::backend::{ProgressSource, ReportBackend};
use crate::models::{CommitGroup, Report, ReportKind, ReportSession};
use crate::state::AppState;
use crate::utils::id::new_id;

/// 按仓库分组已选提交
///
/// 不属于活跃仓库的引用、以及在活跃条目中找不到的提交都会被跳过。
/// 每组内的提交保持活跃条目中的顺序（时间倒序）。
pub fn selected_commit_groups(state: &AppState) -> Vec<CommitGroup> {
    let mut by_repo: BTreeMap<String, HashSet<String>> = BTreeMap::new();
    for commit in state.selection.selected() {
        by_repo.entry(commit.repo_id).or_default().insert(commit.hash);
    }

    by_repo
        .into_iter()
        .filter_map(|(repo_id, hashes)| {
            let entry = state.repos.active_repo(&repo_id)?;
            let commits: Vec<_> = entry
                .commits
                .into_iter()
                .filter(|commit| hashes.contains(&commit.hash))
                .collect();
            if commits.is_empty() {
                return None;
            }
            Some(CommitGroup {
                repo_id,
                repo_path: entry.repo_info.path,
                repo_name: entry.repo_info.name,
                commits,
            })
        })
        .collect()
}

/// 生成报告
///
/// # 参数
/// - `state` - 应用全局状态
/// - `backend` - 报告后端
/// - `progress` - 报告生成进度通道
/// - `kind` - 报告类型
/// - `template_id` - 可选的报告模板 ID
///
/// # 返回值
/// 加入历史并设为当前报告的报告会话
///
/// # 错误
/// 已有生成进行中、没有可用的已选提交，或后端失败时返回错误信息。
/// 后端失败时流式缓冲区保留已收到的部分文本
pub async fn generate_report<B, S>(
    state: &AppState,
    backend: &B,
    progress: &S,
    kind: ReportKind,
    template_id: Option<String>,
) -> Result<ReportSession, String>
where
    B: ReportBackend,
    S: ProgressSource + ?Sized,
{
    let groups = selected_commit_groups(state);
    if groups.is_empty() {
        return Err("请先选择要生成报告的提交".to_string());
    }
    if !state.reports.try_begin_generating() {
        return Err("已有报告正在生成".to_string());
    }

    let repo_ids: Vec<String> = groups.iter().map(|group| group.repo_id.clone()).collect();
    log::info!(
        "开始生成{}: {} 个仓库, {} 个提交",
        kind.label(),
        groups.len(),
        groups.iter().map(|group| group.commits.len()).sum::<usize>()
    );

    let mut guard = GeneratingGuard {
        state,
        finished: false,
    };
    state.stream.begin_generation(progress).await;
    let result = backend.generate_report(kind, groups, template_id).await;
    state.stream.finish_generation().await;
    guard.finished = true;
    drop(guard);

    let report = result.inspect_err(|e| log::warn!("{}生成失败: {}", kind.label(), e))?;
    let session = into_session(report, repo_ids);
    state.reports.add(session.clone());
    state.reports.switch_to(&session.id);
    log::info!("{}生成完成: {}", kind.label(), session.name);
    Ok(session)
}

/// 生成中标志的守卫：离开作用域时清除标志；未正常结束流式生成时同步收尾
struct GeneratingGuard<'a> {
    state: &'a AppState,
    finished: bool,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("报告生成在完成前被取消");
            self.state.stream.abandon_generation();
        }
        self.state.reports.set_generating(false);
    }
}

/// 把后端结果转换为报告会话：缺少 ID 时生成，缺少名称时按类型命名
fn into_session(report: Report, repo_ids: Vec<String>) -> ReportSession {
    let id = if report.id.trim().is_empty() {
        new_id()
    } else {
        report.id
    };
    let name = report
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            let short_id: String = id.chars().take(8).collect();
            format!("{} · {}", report.kind.label(), short_id)
        });
    ReportSession {
        id,
        name,
        kind: report.kind,
        content: report.content,
        commits: report.commits,
        generated_at: report.generated_at,
        last_modified: report.generated_at,
        repo_ids,
    }
}

/// 切换当前报告；未知 ID 静默忽略
pub fn open_report(state: &AppState, report_id: &str) -> bool {
    state.reports.switch_to(report_id)
}

/// 关闭当前报告（不影响历史）
pub fn close_report(state: &AppState) {
    state.reports.set_current(None);
}

pub fn rename_report(state: &AppState, report_id: &str, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    state.reports.rename(report_id, name)
}

pub fn edit_report(state: &AppState, report_id: &str, content: &str) -> bool {
    state.reports.edit_content(report_id, content)
}

pub fn delete_report(state: &AppState, report_id: &str) -> bool {
    state.reports.remove(report_id)
}
