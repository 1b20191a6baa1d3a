//! # 报告生成流式聚合服务
//!
//! 报告后端在生成过程中通过进度通道推送文本块，本服务把它们按到达顺序拼接到
//! 一个缓冲区中，供界面实时显示。
//!
//! ## 订阅模型
//! 全进程最多一个订阅：订阅句柄由 `StreamAggregator` 显式持有（而不是模块级全局变量），
//! 内部是一个专用的 tokio 任务，独占进度通道的接收端并写入共享缓冲区。
//!
//! 状态机：`Idle → Subscribed → Idle`。订阅在多次生成之间保持存活，
//! 同一个订阅服务后续所有生成请求；只有通道关闭或显式 `unsubscribe` 后才会重新订阅。
//!
//! ## 生成边界
//! - `begin_generation`：确保已订阅，丢弃通道中残留的上一轮文本块，把缓冲区清空。
//!   返回时清空已经完成，调用方随后才发起后端请求。
//! - `finish_generation`：把通道中已到达但尚未处理的文本块并入缓冲区，标记为非活跃。
//!   缓冲区保留最终（或失败时的部分）文本，直到下一次 `begin_generation`。
//!
//! 这两个边界操作通过控制通道发送给订阅任务执行，与文本块的处理串行，
//! 因此不会出现清空之后又追加上一轮残留文本的情况。
//!
//! 生成请求在等待后端时被丢弃（如外层超时）无法再 `await`，
//! 此时由 `abandon_generation` 同步收尾。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::backend::{ProgressSource, REPORT_PROGRESS_EVENT};

/// 流式缓冲区
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamBuffer {
    /// 已累计的文本
    pub text: String,
    /// 是否处于生成中
    pub active: bool,
}

/// 发送给订阅任务的控制指令，附带完成确认
enum Control {
    Begin(oneshot::Sender<()>),
    Finish(oneshot::Sender<()>),
}

/// 活跃订阅的句柄
struct Subscription {
    control: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

/// 流式聚合器
pub struct StreamAggregator {
    buffer: Arc<Mutex<StreamBuffer>>,
    subscription: Mutex<Option<Subscription>>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(StreamBuffer::default())),
            subscription: Mutex::new(None),
        }
    }

    fn subscription(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 订阅进度通道
    ///
    /// 已有存活的订阅时直接跳过。必须在 tokio 运行时内调用。
    ///
    /// # 返回值
    /// 本次调用新建了订阅返回 true，已有订阅返回 false
    pub fn subscribe<S: ProgressSource + ?Sized>(&self, source: &S) -> bool {
        let mut subscription = self.subscription();
        if subscription
            .as_ref()
            .is_some_and(|existing| !existing.task.is_finished())
        {
            return false;
        }

        let chunks = source.subscribe();
        let (control, commands) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_subscription(
            chunks,
            commands,
            Arc::clone(&self.buffer),
        ));
        *subscription = Some(Subscription { control, task });
        log::info!("已订阅 {}", REPORT_PROGRESS_EVENT);
        true
    }

    /// 取消订阅
    ///
    /// # 返回值
    /// 存在订阅并被取消时返回 true
    pub fn unsubscribe(&self) -> bool {
        match self.subscription().take() {
            Some(existing) => {
                existing.task.abort();
                log::info!("已取消订阅 {}", REPORT_PROGRESS_EVENT);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription()
            .as_ref()
            .is_some_and(|existing| !existing.task.is_finished())
    }

    /// 进入一次生成请求：确保已订阅并清空缓冲区
    pub async fn begin_generation<S: ProgressSource + ?Sized>(&self, source: &S) {
        self.subscribe(source);
        let acknowledged = self.send_control(Control::Begin).await;
        if !acknowledged {
            // 订阅任务已退出（通道关闭），直接在这里清空
            let mut buffer = lock_buffer(&self.buffer);
            buffer.text.clear();
            buffer.active = true;
        }
    }

    /// 结束一次生成请求（无论成功或失败），保留缓冲区内容
    pub async fn finish_generation(&self) {
        let acknowledged = self.send_control(Control::Finish).await;
        if !acknowledged {
            lock_buffer(&self.buffer).active = false;
        }
    }

    /// 生成请求被中途丢弃时的同步收尾：立即标记为非活跃，
    /// 并通知订阅任务在处理完之前的指令后再执行一次结束，不等待确认
    pub fn abandon_generation(&self) {
        lock_buffer(&self.buffer).active = false;
        let (ack, _) = oneshot::channel();
        if let Some(existing) = self.subscription().as_ref() {
            let _ = existing.control.send(Control::Finish(ack));
        }
    }

    /// 把指令发给订阅任务并等待确认；没有可用的订阅任务时返回 false
    async fn send_control(&self, make: fn(oneshot::Sender<()>) -> Control) -> bool {
        let (ack, done) = oneshot::channel();
        let sent = {
            let subscription = self.subscription();
            match subscription.as_ref() {
                Some(existing) => existing.control.send(make(ack)).is_ok(),
                None => false,
            }
        };
        sent && done.await.is_ok()
    }

    /// 缓冲区快照
    pub fn snapshot(&self) -> StreamBuffer {
        lock_buffer(&self.buffer).clone()
    }

    /// 当前累计的文本
    pub fn text(&self) -> String {
        lock_buffer(&self.buffer).text.clone()
    }

    pub fn is_active(&self) -> bool {
        lock_buffer(&self.buffer).active
    }
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamAggregator {
    fn drop(&mut self) {
        if let Some(existing) = self.subscription().take() {
            existing.task.abort();
        }
    }
}

fn lock_buffer(buffer: &Mutex<StreamBuffer>) -> MutexGuard<'_, StreamBuffer> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 订阅任务：独占接收端，串行处理文本块和控制指令
async fn run_subscription(
    mut chunks: broadcast::Receiver<String>,
    mut commands: mpsc::UnboundedReceiver<Control>,
    buffer: Arc<Mutex<StreamBuffer>>,
) {
    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(Control::Begin(ack)) => {
                    // 残留的文本块属于上一轮生成，丢弃
                    drain_pending(&mut chunks, None);
                    {
                        let mut buffer = lock_buffer(&buffer);
                        buffer.text.clear();
                        buffer.active = true;
                    }
                    let _ = ack.send(());
                }
                Some(Control::Finish(ack)) => {
                    drain_pending(&mut chunks, Some(&*buffer));
                    lock_buffer(&buffer).active = false;
                    let _ = ack.send(());
                }
                None => break,
            },

            chunk = chunks.recv() => match chunk {
                Ok(chunk) => {
                    lock_buffer(&buffer).text.push_str(&chunk);
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("{} 消费过慢，丢失 {} 个文本块", REPORT_PROGRESS_EVENT, skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    log::debug!("{} 订阅任务退出", REPORT_PROGRESS_EVENT);
}

/// 取出通道中已到达的所有文本块；`target` 为 None 时丢弃
fn drain_pending(chunks: &mut broadcast::Receiver<String>, target: Option<&Mutex<StreamBuffer>>) {
    loop {
        match chunks.try_recv() {
            Ok(chunk) => {
                if let Some(buffer) = target {
                    lock_buffer(buffer).text.push_str(&chunk);
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                log::warn!("{} 消费过慢，丢失 {} 个文本块", REPORT_PROGRESS_EVENT, skipped);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
