//! # 应用配置数据模型
//!
//! 定义了 LLM 提供商、代理和导出格式等应用配置，持久化在 `app-config-v2` 键下。
//!
//! 提供商配置使用带标签的枚举（`type` 字段区分 openai / claude / gemini），
//! 每个变体携带各自的 `{base_url, api_key, model}`，所有分派都基于标签而不是字段形状。

use serde::{Deserialize, Serialize};

/// 单个提供商的连接参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// LLM 提供商配置
///
/// 对应前端 TypeScript 联合类型：
/// ```typescript
/// type LLMProvider =
///   | { type: 'openai'; base_url: string; api_key: string; model: string }
///   | { type: 'claude'; base_url: string; api_key: string; model: string }
///   | { type: 'gemini'; base_url: string; api_key: string; model: string };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAI(ProviderSettings),
    Claude(ProviderSettings),
    Gemini(ProviderSettings),
}

/// 提供商标签（不携带连接参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    Claude,
    Gemini,
}

impl LlmProvider {
    /// 指定提供商的默认配置（API Key 为空，需要用户填写）
    pub fn default_for(kind: ProviderKind) -> Self {
        let settings = |base_url: &str, model: &str| ProviderSettings {
            base_url: base_url.to_string(),
            api_key: String::new(),
            model: model.to_string(),
        };
        match kind {
            ProviderKind::OpenAI => {
                Self::OpenAI(settings("https://api.openai.com/v1", "gpt-4o"))
            }
            ProviderKind::Claude => Self::Claude(settings(
                "https://api.anthropic.com",
                "claude-3-5-sonnet-20241022",
            )),
            ProviderKind::Gemini => Self::Gemini(settings(
                "https://generativelanguage.googleapis.com/v1beta",
                "gemini-2.0-flash-exp",
            )),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAI(_) => ProviderKind::OpenAI,
            Self::Claude(_) => ProviderKind::Claude,
            Self::Gemini(_) => ProviderKind::Gemini,
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        match self {
            Self::OpenAI(s) | Self::Claude(s) | Self::Gemini(s) => s,
        }
    }

    /// 保存前校验提供商配置
    ///
    /// # 错误
    /// Base URL 不是 http(s) 地址、API Key 或模型名为空时返回错误信息
    pub fn validate(&self) -> Result<(), String> {
        let settings = self.settings();
        let base_url = settings.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(format!("无效的 Base URL: {}", settings.base_url));
        }
        if settings.api_key.trim().is_empty() {
            return Err("API Key 不能为空".to_string());
        }
        if settings.model.trim().is_empty() {
            return Err("模型名称不能为空".to_string());
        }
        Ok(())
    }
}

/// 代理配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
}

impl ProxyConfig {
    /// 实际生效的代理地址：启用时优先 HTTPS 代理，其次 HTTP 代理
    pub fn effective_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        [self.https_proxy.trim(), self.http_proxy.trim()]
            .into_iter()
            .find(|url| !url.is_empty())
    }
}

/// 报告导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
    Pdf,
}

/// 应用配置
///
/// 对应前端 TypeScript 接口：
/// ```typescript
/// interface AppConfig {
///   llm_provider: LLMProvider;
///   exportFormat: 'markdown' | 'html' | 'pdf';
///   timezone: string;
///   proxy_config?: ProxyConfig;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm_provider: LlmProvider,

    #[serde(rename = "exportFormat", default)]
    pub export_format: ExportFormat,

    pub timezone: String,

    #[serde(default)]
    pub proxy_config: ProxyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_provider: LlmProvider::default_for(ProviderKind::OpenAI),
            export_format: ExportFormat::Markdown,
            timezone: "UTC".to_string(),
            proxy_config: ProxyConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_serializes_with_type_tag() {
        let provider = LlmProvider::default_for(ProviderKind::Claude);
        let value = serde_json::to_value(&provider).unwrap();
        assert_eq!(value["type"], "claude");
        assert_eq!(value["base_url"], "https://api.anthropic.com");

        let parsed: LlmProvider = serde_json::from_value(serde_json::json!({
            "type": "openai",
            "base_url": "https://example.com/v1",
            "api_key": "sk-test",
            "model": "gpt-4o-mini"
        }))
        .unwrap();
        assert_eq!(parsed.kind(), ProviderKind::OpenAI);
        assert_eq!(parsed.settings().model, "gpt-4o-mini");
    }

    #[test]
    fn test_validate_rejects_missing_key_and_bad_url() {
        let provider = LlmProvider::default_for(ProviderKind::Gemini);
        assert!(provider.validate().is_err());

        let bad_url = LlmProvider::OpenAI(ProviderSettings {
            base_url: "api.openai.com".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o".to_string(),
        });
        assert!(bad_url.validate().unwrap_err().contains("Base URL"));

        let ok = LlmProvider::OpenAI(ProviderSettings {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o".to_string(),
        });
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_proxy_effective_url_prefers_https() {
        let mut proxy = ProxyConfig {
            enabled: false,
            http_proxy: "http://127.0.0.1:7890".to_string(),
            https_proxy: "http://127.0.0.1:7891".to_string(),
        };
        assert_eq!(proxy.effective_url(), None);

        proxy.enabled = true;
        assert_eq!(proxy.effective_url(), Some("http://127.0.0.1:7891"));

        proxy.https_proxy.clear();
        assert_eq!(proxy.effective_url(), Some("http://127.0.0.1:7890"));
    }

    #[test]
    fn test_app_config_defaults_fill_missing_fields() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "llm_provider": {
                "type": "gemini",
                "base_url": "https://generativelanguage.googleapis.com/v1beta",
                "api_key": "key",
                "model": "gemini-2.0-flash-exp"
            },
            "timezone": "Asia/Shanghai"
        }))
        .unwrap();
        assert_eq!(config.export_format, ExportFormat::Markdown);
        assert!(!config.proxy_config.enabled);
    }
}
