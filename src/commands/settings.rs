//! # 设置流程
//!
//! 读取和修改应用配置。切换提供商时返回该提供商的默认配置，
//! 由界面填写 API Key 后再通过 `save_provider` 保存。

use crate::models::{AppConfig, ExportFormat, LlmProvider, ProviderKind, ProxyConfig};
use crate::services::config_store::ConfigStore;
use crate::state::AppState;

pub fn get_config(state: &AppState) -> AppConfig {
    state.config.config()
}

/// 整体保存配置
///
/// # 错误
/// 提供商配置校验失败时返回错误信息
pub fn save_config(state: &AppState, config: AppConfig) -> Result<(), String> {
    state.config.save(config)
}

/// 切换到另一个提供商时使用的初始配置
///
/// 当前提供商与 `kind` 相同时返回当前配置（保留已填写的 API Key），
/// 否则返回该提供商的默认配置。
pub fn provider_template(state: &AppState, kind: ProviderKind) -> LlmProvider {
    let current = state.config.config().llm_provider;
    if current.kind() == kind {
        current
    } else {
        ConfigStore::provider_default(kind)
    }
}

/// 保存提供商配置
///
/// # 错误
/// 校验失败时返回错误信息
pub fn save_provider(state: &AppState, provider: LlmProvider) -> Result<(), String> {
    state.config.update_provider(provider)
}

pub fn set_export_format(state: &AppState, format: ExportFormat) {
    state.config.update_export_format(format);
}

/// # 错误
/// 时区为空时返回错误信息
pub fn set_timezone(state: &AppState, timezone: &str) -> Result<(), String> {
    state.config.update_timezone(timezone)
}

/// # 错误
/// 代理地址无效时返回错误信息
pub fn set_proxy(state: &AppState, proxy: ProxyConfig) -> Result<(), String> {
    state.config.update_proxy(proxy)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::ProviderSettings;
    use crate::services::storage::MemoryStorage;
    use crate::state::SessionOptions;

    #[test]
    fn test_provider_template_keeps_current_settings() {
        let state = AppState::new(Arc::new(MemoryStorage::new()), SessionOptions::default());
        let openai = LlmProvider::OpenAI(ProviderSettings {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o".to_string(),
        });
        save_provider(&state, openai.clone()).unwrap();

        assert_eq!(provider_template(&state, ProviderKind::OpenAI), openai);
        assert_eq!(
            provider_template(&state, ProviderKind::Gemini),
            LlmProvider::default_for(ProviderKind::Gemini)
        );
    }

    #[test]
    fn test_settings_round_trip() {
        let state = AppState::new(Arc::new(MemoryStorage::new()), SessionOptions::default());
        set_export_format(&state, ExportFormat::Pdf);
        set_timezone(&state, "Asia/Shanghai").unwrap();
        assert!(set_timezone(&state, "").is_err());

        let config = get_config(&state);
        assert_eq!(config.export_format, ExportFormat::Pdf);
        assert_eq!(config.timezone, "Asia/Shanghai");
        assert!(save_config(&state, config).is_err());
    }
}
