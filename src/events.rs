//! 生命周期事件
//!
//! 每条通过级别过滤的记录最终产生一个 `Logged` 或 `Error` 事件。
//! 事件总是在独立任务中发出，订阅者的处理逻辑不会影响写入路径。
//!
//! 使用方应当订阅并消费 `Error` 事件；无人订阅时错误只会以 warn 级别写入诊断日志。

use crate::error::TransportError;
use crate::record::LogRecord;
use log::{trace, warn};
use tokio::runtime::Handle;
use tokio::sync::broadcast;

/// 传输层生命周期事件
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// 记录已写入，携带原始记录
    Logged(LogRecord),
    /// 写入失败
    Error(TransportError),
}

/// 事件总线（观察者注册 + 分发）
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TransportEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 注册一个订阅者；订阅之前发出的事件不会补发
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.sender.subscribe()
    }

    /// 当前订阅者数量
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 在下一个调度轮次发出事件，不等待订阅者处理
    pub(crate) fn emit_deferred(&self, runtime: &Handle, event: TransportEvent) {
        let sender = self.sender.clone();
        runtime.spawn(async move {
            tokio::task::yield_now().await;
            if let Err(broadcast::error::SendError(event)) = sender.send(event) {
                match event {
                    TransportEvent::Error(err) => {
                        warn!("Unobserved transport error (no event subscriber): {err}");
                    }
                    TransportEvent::Logged(record) => {
                        trace!("Logged event dropped, no subscriber (level: {})", record.level);
                    }
                }
            }
        });
    }
}
