//! # 路径工具函数
//!
//! 提供与文件路径相关的工具函数，包括：
//! - 获取应用自身数据目录路径（`~/.gitlog-ai-reporter/`）
//! - 从仓库路径推导显示名称

use std::path::PathBuf;

/// 应用数据目录名
const APP_DIR_NAME: &str = ".gitlog-ai-reporter";

/// 获取应用数据目录的绝对路径
///
/// 所有持久化的 store 快照（仓库历史、报告历史、应用配置）都保存在此目录下，
/// 每个 store 一个 JSON 文件。使用 `dirs` crate 获取跨平台的主目录路径。
///
/// # 错误
/// 如果无法确定用户主目录（极端情况，如无 HOME 环境变量），返回错误信息。
///
/// # 示例
/// - Windows: `C:\Users\username\.gitlog-ai-reporter`
/// - Linux/macOS: `/home/username/.gitlog-ai-reporter`
pub fn get_app_data_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "无法获取用户主目录".to_string())?;
    Ok(home.join(APP_DIR_NAME))
}

/// 从仓库路径推导显示名称（最后一级目录名）
///
/// `/` 和 `\` 都视为分隔符（仓库历史可能来自另一个平台），
/// 路径以分隔符结尾时忽略末尾分隔符；无法推导时返回原路径。
pub fn repo_display_name(repo_path: &str) -> String {
    repo_path
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| repo_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_display_name() {
        assert_eq!(repo_display_name("/home/user/projects/myapp"), "myapp");
        assert_eq!(repo_display_name("/home/user/projects/myapp/"), "myapp");
        assert_eq!(repo_display_name("/"), "/");
    }

    #[test]
    fn test_repo_display_name_windows_separators() {
        assert_eq!(repo_display_name(r"C:\Users\dev\projects\api"), "api");
        assert_eq!(repo_display_name(r"C:\Users\dev\projects\api\"), "api");
        assert_eq!(repo_display_name(r"D:\work/mixed\web"), "web");
    }

    #[test]
    fn test_app_data_path_is_under_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(get_app_data_path().unwrap(), home.join(APP_DIR_NAME));
        }
    }
}
