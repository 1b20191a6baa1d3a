//! # 报告生成进度通道
//!
//! 报告后端在生成过程中以文本块的形式推送进度，前端实时显示累计文本。
//! 这里用 tokio broadcast 通道实现一个进程内的发布/订阅中心：
//! 后端调用 `emit` 推送，`StreamAggregator` 通过 `ProgressSource::subscribe` 订阅。
//!
//! 通道只保证单次生成内的到达顺序，不做重排或去重。
//!
//! ## 容量限制
//! 通道最多缓存 `PROGRESS_CHANNEL_CAPACITY` 个尚未被订阅任务取走的文本块。
//! 在 `current_thread` 运行时上，后端如果连续推送超过这个数量的文本块而中途不让出
//! （没有 `.await`），订阅任务来不及消费，最早的文本块会被丢弃，订阅端只记录一条
//! 警告日志，流式缓冲区因此缺少这部分文本。后端的最终报告内容不受影响。
//! 逐块推送的后端应在每次 `emit` 之后让出执行权（例如等待网络读取），
//! 或者在多线程运行时上运行。

use tokio::sync::broadcast;

/// 进度事件名称（与前端监听的事件名保持一致）
pub const REPORT_PROGRESS_EVENT: &str = "report-generation-progress";

/// broadcast 通道容量：订阅者消费过慢时最早的文本块会被丢弃（Lagged）
const PROGRESS_CHANNEL_CAPACITY: usize = 1024;

/// 进度通道的订阅端
pub trait ProgressSource: Send + Sync {
    /// 建立一个新订阅，返回接收端
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

/// 进程内进度发布中心
#[derive(Debug, Clone)]
pub struct ProgressHub {
    sender: broadcast::Sender<String>,
}

impl ProgressHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// 推送一个文本块
    ///
    /// 当前没有订阅者时文本块被直接丢弃，与前端未挂载监听器时的行为一致。
    pub fn emit(&self, chunk: impl Into<String>) {
        let chunk = chunk.into();
        if self.sender.send(chunk).is_err() {
            log::debug!("{} 没有订阅者，丢弃文本块", REPORT_PROGRESS_EVENT);
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSource for ProgressHub {
    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }
}
