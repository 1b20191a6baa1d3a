//! # 报告推送客户端
//!
//! 把生成好的报告文件推送到聊天工具，供 `push-dingtalk` / `push-feishu` 两个命令行工具使用：
//! - 钉钉：自定义机器人 Webhook，markdown 消息，可选加签
//! - 飞书：应用凭证换取 `tenant_access_token`，再以富文本（post）消息发送给个人
//!
//! 两个平台都以 HTTP 状态码和响应体中的错误码共同判断成功与否。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

/// 未指定 `REPORT_FILE` 时读取的报告文件
pub const DEFAULT_REPORT_FILE: &str = "dist/report-weekly.md";

/// 钉钉消息未指定标题时使用的标题
pub const DINGTALK_DEFAULT_TITLE: &str = "自动周报";

/// 飞书消息未指定标题时使用的标题
pub const FEISHU_DEFAULT_TITLE: &str = "自动化周报";

const FEISHU_API_BASE: &str = "https://open.feishu.cn/open-apis";

/// 错误信息中响应体的最大长度
const MAX_ERROR_BODY_CHARS: usize = 500;

type HmacSha256 = Hmac<Sha256>;

/// 读取报告文件
///
/// # 错误
/// 文件不存在或无法读取时返回错误信息
pub async fn read_report_file(path: &str) -> Result<String, String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("读取周报文件失败: {}\n{}", path, e))
}

fn http_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .user_agent(concat!("gitlog-reporter/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| format!("初始化 HTTP 客户端失败: {}", e))
}

fn truncate_for_error(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{}...", truncated)
}

/// 发送请求并读取响应体；非 2xx 状态码视为错误
async fn send_for_body(request: reqwest::RequestBuilder, action: &str) -> Result<String, String> {
    let response = request
        .send()
        .await
        .map_err(|e| format!("{}: {}", action, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("{}: 读取响应失败: {}", action, e))?;
    if !status.is_success() {
        return Err(format!(
            "{}: {} {}",
            action,
            status.as_u16(),
            truncate_for_error(&body)
        ));
    }
    Ok(body)
}

// ============ 钉钉 ============

#[derive(Debug, Deserialize)]
struct DingTalkResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// 钉钉加签：`base64(HMAC-SHA256(secret, "{timestamp}\n{secret}"))`
///
/// # 错误
/// 密钥无法初始化 HMAC 时返回错误信息
pub fn dingtalk_sign(secret: &str, timestamp_ms: i64) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("初始化签名失败: {}", e))?;
    mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 生成带签名的 Webhook 地址；没有密钥时原样返回
///
/// # 错误
/// Webhook 不是合法 URL 时返回错误信息
pub fn signed_webhook(
    webhook: &str,
    secret: Option<&str>,
    timestamp_ms: i64,
) -> Result<String, String> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Ok(webhook.to_string());
    };
    let sign = dingtalk_sign(secret, timestamp_ms)?;
    let mut url =
        reqwest::Url::parse(webhook).map_err(|e| format!("无效的 Webhook 地址: {}", e))?;
    url.query_pairs_mut()
        .append_pair("timestamp", &timestamp_ms.to_string())
        .append_pair("sign", &sign);
    Ok(url.to_string())
}

/// 组装钉钉 markdown 消息的 `(title, text)`
///
/// 指定了标题时正文以二级标题开头；否则标题使用默认值，正文为报告原文。
pub fn dingtalk_markdown(title: &str, report: &str) -> (String, String) {
    let title = title.trim();
    if title.is_empty() {
        (DINGTALK_DEFAULT_TITLE.to_string(), report.to_string())
    } else {
        (title.to_string(), format!("## {}\n\n{}", title, report))
    }
}

/// 钉钉自定义机器人客户端
pub struct DingTalkClient {
    client: reqwest::Client,
    webhook: String,
    secret: Option<String>,
}

impl DingTalkClient {
    pub fn new(webhook: impl Into<String>, secret: Option<String>) -> Result<Self, String> {
        Ok(Self {
            client: http_client()?,
            webhook: webhook.into(),
            secret,
        })
    }

    /// 发送 markdown 消息
    ///
    /// # 错误
    /// 请求失败、非 2xx 响应或 `errcode != 0` 时返回错误信息
    pub async fn send_markdown(&self, title: &str, text: &str) -> Result<(), String> {
        let url = signed_webhook(
            &self.webhook,
            self.secret.as_deref(),
            crate::utils::clock::now_millis(),
        )?;
        let request = self.client.post(url).json(&json!({
            "msgtype": "markdown",
            "markdown": {
                "title": title,
                "text": text,
            },
        }));

        let body = send_for_body(request, "发送钉钉消息失败").await?;
        let data: DingTalkResponse =
            serde_json::from_str(&body).map_err(|e| format!("解析钉钉响应失败: {}", e))?;
        if data.errcode != 0 {
            return Err(format!("发送钉钉消息失败: {}", data.errmsg));
        }
        Ok(())
    }
}

// ============ 飞书 ============

#[derive(Debug, Deserialize)]
struct FeishuResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: Option<String>,
}

/// 构建飞书富文本消息内容：报告的每一行是一个段落
pub fn feishu_post_content(title: &str, report: &str) -> serde_json::Value {
    let content: Vec<serde_json::Value> = report
        .split('\n')
        .map(|line| json!([{ "tag": "text", "text": line }]))
        .collect();
    json!({
        "zh_cn": {
            "title": title,
            "content": content,
        }
    })
}

/// 飞书应用客户端
pub struct FeishuClient {
    client: reqwest::Client,
    api_base: String,
    app_id: String,
    app_secret: String,
}

impl FeishuClient {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Result<Self, String> {
        Ok(Self {
            client: http_client()?,
            api_base: FEISHU_API_BASE.to_string(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        })
    }

    /// 用应用凭证换取 `tenant_access_token`
    ///
    /// # 错误
    /// 请求失败、非 2xx 响应或 `code != 0` 时返回错误信息
    pub async fn tenant_access_token(&self) -> Result<String, String> {
        let request = self
            .client
            .post(format!(
                "{}/auth/v3/tenant_access_token/internal",
                self.api_base
            ))
            .json(&json!({
                "app_id": self.app_id,
                "app_secret": self.app_secret,
            }));

        let body = send_for_body(request, "获取 tenant_access_token 失败").await?;
        let data: FeishuResponse = serde_json::from_str(&body)
            .map_err(|e| format!("解析 tenant_access_token 响应失败: {}", e))?;
        if data.code != 0 {
            return Err(format!("获取 tenant_access_token 失败: {}", data.msg));
        }
        data.tenant_access_token
            .ok_or_else(|| "获取 tenant_access_token 失败: 响应中缺少 token".to_string())
    }

    /// 以富文本消息发送给指定用户（open_id）
    ///
    /// # 错误
    /// 请求失败、非 2xx 响应或 `code != 0` 时返回错误信息
    pub async fn send_post(
        &self,
        token: &str,
        open_id: &str,
        title: &str,
        report: &str,
    ) -> Result<(), String> {
        let content = json!({ "post": feishu_post_content(title, report) });
        let request = self
            .client
            .post(format!(
                "{}/im/v1/messages?receive_id_type=open_id",
                self.api_base
            ))
            .bearer_auth(token)
            .json(&json!({
                "receive_id": open_id,
                "msg_type": "post",
                "content": content.to_string(),
            }));

        let body = send_for_body(request, "发送消息失败").await?;
        let data: FeishuResponse =
            serde_json::from_str(&body).map_err(|e| format!("解析飞书响应失败: {}", e))?;
        if data.code != 0 {
            return Err(format!("发送消息失败: {}", data.msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const WEBHOOK: &str = "https://oapi.dingtalk.com/robot/send?access_token=abc";

    #[test]
    fn test_dingtalk_sign_matches_reference_vector() {
        assert_eq!(
            dingtalk_sign("SECtest", 1_700_000_000_000).unwrap(),
            "aZLLrriXgn05YbwaGR7knYsLeJADjr9NwLaNNKpxh4g="
        );
    }

    #[test]
    fn test_signed_webhook_appends_encoded_params() {
        let url = signed_webhook(WEBHOOK, Some("SECtest"), 1_700_000_000_000).unwrap();
        assert_eq!(
            url,
            "https://oapi.dingtalk.com/robot/send?access_token=abc\
             &timestamp=1700000000000&sign=aZLLrriXgn05YbwaGR7knYsLeJADjr9NwLaNNKpxh4g%3D"
        );

        assert_eq!(signed_webhook(WEBHOOK, None, 1).unwrap(), WEBHOOK);
        assert_eq!(signed_webhook(WEBHOOK, Some(""), 1).unwrap(), WEBHOOK);
        assert!(signed_webhook("not a url", Some("SECtest"), 1).is_err());
    }

    #[test]
    fn test_dingtalk_markdown_title_handling() {
        assert_eq!(
            dingtalk_markdown("", "内容"),
            ("自动周报".to_string(), "内容".to_string())
        );
        assert_eq!(
            dingtalk_markdown("第 42 周", "内容"),
            ("第 42 周".to_string(), "## 第 42 周\n\n内容".to_string())
        );
    }

    #[test]
    fn test_feishu_post_content_one_paragraph_per_line() {
        let content = feishu_post_content("周报", "# 标题\n\n- 完成 A");
        assert_eq!(content["zh_cn"]["title"], "周报");
        let paragraphs = content["zh_cn"]["content"].as_array().unwrap();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0][0]["tag"], "text");
        assert_eq!(paragraphs[0][0]["text"], "# 标题");
        assert_eq!(paragraphs[1][0]["text"], "");
        assert_eq!(paragraphs[2][0]["text"], "- 完成 A");
    }

    #[test]
    fn test_truncate_for_error() {
        let long = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        assert_eq!(
            truncate_for_error(&long).len(),
            MAX_ERROR_BODY_CHARS + 3
        );
        assert_eq!(truncate_for_error("short"), "short");
    }

    #[tokio::test]
    async fn test_read_report_file_missing() {
        let err = read_report_file("/definitely/missing/report.md")
            .await
            .unwrap_err();
        assert!(err.contains("读取周报文件失败"));
    }
}
