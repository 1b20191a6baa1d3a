//! # 工具函数模块
//!
//! - `path` - 应用数据目录定位
//! - `clock` - 可注入的毫秒时钟（测试中替换为确定性时钟）
//! - `id` - 客户端唯一标识生成

pub mod clock;
pub mod id;
pub mod path;
