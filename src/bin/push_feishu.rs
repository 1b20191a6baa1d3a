//! # 飞书推送工具
//!
//! 用应用凭证换取 `tenant_access_token`，把报告以富文本消息发送给指定用户。
//!
//! 环境变量：
//! - `FEISHU_APP_ID` / `FEISHU_APP_SECRET` - 应用凭证（必填）
//! - `FEISHU_USER_OPEN_ID` - 接收人的 open_id（必填）
//! - `REPORT_FILE` - 报告文件路径，默认 `dist/report-weekly.md`
//! - `REPORT_TITLE` - 消息标题，默认 `自动化周报`
//! - `REPORT_SUMMARY` - 可选摘要，设置后代替报告全文发送

use std::env;
use std::process::ExitCode;

use gitlog_reporter::init_logging;
use gitlog_reporter::services::push::{
    DEFAULT_REPORT_FILE, FEISHU_DEFAULT_TITLE, FeishuClient, read_report_file,
};

fn required(name: &str) -> Result<String, String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("缺少 {} 环境变量", name))
}

async fn run() -> Result<(), String> {
    let app_id = required("FEISHU_APP_ID")?;
    let app_secret = required("FEISHU_APP_SECRET")?;
    let open_id = required("FEISHU_USER_OPEN_ID")?;
    let report_path = env::var("REPORT_FILE").unwrap_or_else(|_| DEFAULT_REPORT_FILE.to_string());
    let title = env::var("REPORT_TITLE").unwrap_or_else(|_| FEISHU_DEFAULT_TITLE.to_string());
    let summary = env::var("REPORT_SUMMARY").unwrap_or_default();

    let client = FeishuClient::new(app_id, app_secret)?;

    log::info!("正在获取 tenant_access_token...");
    let token = client.tenant_access_token().await?;

    let report = read_report_file(&report_path).await?;
    let content = if summary.is_empty() { report } else { summary };

    log::info!("正在发送消息到飞书...");
    client.send_post(&token, &open_id, &title, &content).await?;
    log::info!("飞书推送成功");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("飞书推送失败: {}", e);
            ExitCode::FAILURE
        }
    }
}
