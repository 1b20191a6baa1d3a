//! # 编排流程模块
//!
//! 面向界面的操作入口，每个函数以 `&AppState` 和所需的协作者为参数，
//! 把多个 store 的修改组织成一次完整的用户操作：
//! - `repos` - 打开、重新打开、切换、卸载和删除仓库
//! - `diffs` - 展开提交 diff、缓存统计
//! - `reports` - 生成报告、报告历史的切换 / 重命名 / 编辑 / 删除
//! - `settings` - 应用配置读写

pub mod diffs;
pub mod reports;
pub mod repos;
pub mod settings;
