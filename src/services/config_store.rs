//! # 应用配置 store
//!
//! 持有当前的 `AppConfig`，持久化在 `app-config-v2` 键下。
//! 读取失败或内容损坏时回退到默认配置（OpenAI / Markdown / UTC）。
//!
//! 切换提供商时不会保留上一个提供商的 API Key，新提供商从 `provider_default` 开始，
//! 由调用方填写后再 `save`。

use std::sync::{PoisonError, RwLock};

use crate::models::{AppConfig, ExportFormat, LlmProvider, ProviderKind, ProxyConfig};
use crate::services::storage::{self, APP_CONFIG_KEY, SharedStorage};

/// 应用配置 store
pub struct ConfigStore {
    config: RwLock<AppConfig>,
    storage: SharedStorage,
}

impl ConfigStore {
    /// 从存储中加载配置并创建 store
    pub fn load(storage: SharedStorage) -> Self {
        let config: AppConfig = storage::load_or_default(storage.as_ref(), APP_CONFIG_KEY);
        log::info!(
            "加载应用配置: 提供商 {:?}, 时区 {}",
            config.llm_provider.kind(),
            config.timezone
        );
        Self {
            config: RwLock::new(config),
            storage,
        }
    }

    /// 当前配置的副本
    pub fn config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 整体保存配置
    ///
    /// # 错误
    /// 提供商配置校验失败时返回错误信息，此时内存和存储中的配置都保持不变
    pub fn save(&self, config: AppConfig) -> Result<(), String> {
        config.llm_provider.validate()?;
        self.replace(config);
        Ok(())
    }

    /// 更新 LLM 提供商
    ///
    /// # 错误
    /// 校验失败时返回错误信息
    pub fn update_provider(&self, provider: LlmProvider) -> Result<(), String> {
        provider.validate()?;
        self.modify(|config| config.llm_provider = provider);
        Ok(())
    }

    pub fn update_export_format(&self, format: ExportFormat) {
        self.modify(|config| config.export_format = format);
    }

    /// 更新时区（IANA 名称，如 `Asia/Shanghai`）
    ///
    /// # 错误
    /// 时区为空时返回错误信息
    pub fn update_timezone(&self, timezone: &str) -> Result<(), String> {
        let timezone = timezone.trim();
        if timezone.is_empty() {
            return Err("时区不能为空".to_string());
        }
        self.modify(|config| config.timezone = timezone.to_string());
        Ok(())
    }

    /// 更新代理配置
    ///
    /// # 错误
    /// 启用代理但地址不是 http(s) 地址时返回错误信息
    pub fn update_proxy(&self, proxy: ProxyConfig) -> Result<(), String> {
        for url in [&proxy.http_proxy, &proxy.https_proxy] {
            let url = url.trim();
            if proxy.enabled
                && !url.is_empty()
                && !(url.starts_with("http://") || url.starts_with("https://"))
            {
                return Err(format!("无效的代理地址: {}", url));
            }
        }
        self.modify(|config| config.proxy_config = proxy);
        Ok(())
    }

    /// 指定提供商的默认配置
    pub fn provider_default(kind: ProviderKind) -> LlmProvider {
        LlmProvider::default_for(kind)
    }

    fn replace(&self, config: AppConfig) {
        let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *current = config;
        storage::persist(self.storage.as_ref(), APP_CONFIG_KEY, &*current);
    }

    fn modify(&self, apply: impl FnOnce(&mut AppConfig)) {
        let mut current = self.config.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut *current);
        storage::persist(self.storage.as_ref(), APP_CONFIG_KEY, &*current);
    }
}
