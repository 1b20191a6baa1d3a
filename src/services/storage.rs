//! # 持久化存储服务
//!
//! 每个 store 只把自己的"持久化切片"（durable 结构体）序列化为 JSON，
//! 以 store 名称为键写入键值存储；运行期字段（活跃仓库、diff 缓存、加载集合、
//! 选择集合、流式缓冲区）从不落盘，冷启动时总是为空。
//!
//! ## 存储后端
//! - `FileStorage` - 每个键一个 `<dir>/<key>.json` 文件（默认目录 `~/.gitlog-ai-reporter/`）
//! - `MemoryStorage` - 纯内存实现，用于测试和不需要落盘的临时会话
//!
//! ## 错误策略
//! 持久化错误不向调用方传播：读取失败或内容损坏时记录警告并回退到默认空状态，
//! 写入失败时记录警告，内存状态保持不变。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::utils::path;

/// 仓库历史 store 的持久化键
pub const REPO_HISTORY_KEY: &str = "repo-history";

/// 报告历史 store 的持久化键
pub const REPORT_HISTORY_KEY: &str = "report-history";

/// 应用配置 store 的持久化键（改名自 `app-config` 以强制刷新旧缓存）
pub const APP_CONFIG_KEY: &str = "app-config-v2";

/// 键值存储
pub trait Storage: Send + Sync {
    /// 读取键对应的内容；键不存在时返回 `Ok(None)`
    fn read(&self, key: &str) -> Result<Option<String>, String>;

    /// 写入（覆盖）键对应的内容
    fn write(&self, key: &str, value: &str) -> Result<(), String>;

    /// 删除键；键不存在时不报错
    fn remove(&self, key: &str) -> Result<(), String>;
}

/// 共享的存储句柄
pub type SharedStorage = Arc<dyn Storage>;

/// 基于文件的存储：每个键对应目录下的一个 JSON 文件
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// 在指定目录下创建文件存储，目录不存在时递归创建
    ///
    /// # 错误
    /// 目录创建失败时返回错误信息
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, String> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| format!("创建数据目录失败: {}", e))?;
        }
        Ok(Self { dir })
    }

    /// 在默认应用数据目录（`~/.gitlog-ai-reporter/`）下创建文件存储
    pub fn open_default() -> Result<Self, String> {
        Self::new(path::get_app_data_path()?)
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        let file_path = self.file_path(key);
        if !file_path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&file_path)
            .map(Some)
            .map_err(|e| format!("读取存储文件失败: {}", e))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        // 先写临时文件再重命名，避免写入中途崩溃留下半截 JSON
        let file_path = self.file_path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        std::fs::write(&tmp_path, value).map_err(|e| format!("写入存储文件失败: {}", e))?;
        std::fs::rename(&tmp_path, &file_path).map_err(|e| format!("替换存储文件失败: {}", e))
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let file_path = self.file_path(key);
        if !file_path.exists() {
            return Ok(());
        }
        std::fs::remove_file(&file_path).map_err(|e| format!("删除存储文件失败: {}", e))
    }
}

/// 纯内存存储
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, String> {
        let entries = self
            .entries
            .read()
            .map_err(|e| format!("读取内存存储失败: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| format!("写入内存存储失败: {}", e))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| format!("写入内存存储失败: {}", e))?;
        entries.remove(key);
        Ok(())
    }
}

/// 读取并反序列化 store 的持久化切片
///
/// 键不存在、读取失败或 JSON 损坏时都回退到 `T::default()`，后两种情况记录警告。
pub fn load_or_default<T>(storage: &dyn Storage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match storage.read(key) {
        Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("持久化数据 {} 解析失败，回退到默认状态: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            log::warn!("持久化数据 {} 读取失败，回退到默认状态: {}", key, e);
            T::default()
        }
    }
}

/// 序列化并写入 store 的持久化切片
///
/// 失败时只记录警告，不影响内存中的状态。
pub fn persist<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) {
    let content = match serde_json::to_string_pretty(value) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("序列化持久化数据 {} 失败: {}", key, e);
            return;
        }
    };
    if let Err(e) = storage.write(key, &content) {
        log::warn!("写入持久化数据 {} 失败: {}", key, e);
    }
}
