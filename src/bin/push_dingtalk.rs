//! # 钉钉推送工具
//!
//! 读取报告文件，通过钉钉自定义机器人以 markdown 消息发送。
//!
//! 环境变量：
//! - `DINGTALK_WEBHOOK` - 机器人 Webhook 地址（必填）
//! - `DINGTALK_SECRET` - 加签密钥（可选）
//! - `REPORT_FILE` - 报告文件路径，默认 `dist/report-weekly.md`
//! - `REPORT_TITLE` - 消息标题，默认 `自动周报`

use std::env;
use std::process::ExitCode;

use gitlog_reporter::init_logging;
use gitlog_reporter::services::push::{
    DEFAULT_REPORT_FILE, DingTalkClient, dingtalk_markdown, read_report_file,
};

async fn run() -> Result<(), String> {
    let webhook = env::var("DINGTALK_WEBHOOK")
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| "缺少 DINGTALK_WEBHOOK 环境变量".to_string())?;
    let secret = env::var("DINGTALK_SECRET").ok().filter(|value| !value.is_empty());
    let report_path = env::var("REPORT_FILE").unwrap_or_else(|_| DEFAULT_REPORT_FILE.to_string());
    let title = env::var("REPORT_TITLE").unwrap_or_default();

    log::info!("正在读取周报内容: {}", report_path);
    let report = read_report_file(&report_path).await?;
    let (title, text) = dingtalk_markdown(&title, &report);

    log::info!("正在通过钉钉机器人发送周报...");
    DingTalkClient::new(webhook, secret)?
        .send_markdown(&title, &text)
        .await?;
    log::info!("钉钉推送成功");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("钉钉推送失败: {}", e);
            ExitCode::FAILURE
        }
    }
}
