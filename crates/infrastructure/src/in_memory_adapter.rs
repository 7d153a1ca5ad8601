use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use svchost_core::{Message, MessageAdapter, MessageHandler};
use svchost_errors::{HostError, HostResult};

/// 内存消息适配器
///
/// 使用 Tokio channels 在进程内投递消息，适用于嵌入式部署和测试。
/// 处理失败的消息会放回队列尾部，随后整个消费过程以该错误结束。
/// 克隆得到的句柄共享同一组队列。
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageAdapter {
    state: Arc<AdapterState>,
}

#[derive(Debug, Default)]
struct AdapterState {
    /// 队列名 -> 收发两端
    queues: RwLock<HashMap<String, QueueChannels>>,
    closed: AtomicBool,
    processed: AtomicU64,
}

#[derive(Debug, Clone)]
struct QueueChannels {
    sender: mpsc::UnboundedSender<Message>,
    /// 多个消费者共享同一个接收端
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Message>>>,
}

impl QueueChannels {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }
}

impl InMemoryMessageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    async fn channels(&self, queue_name: &str) -> HostResult<QueueChannels> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(HostError::message_queue("内存消息适配器已关闭"));
        }

        if let Some(channels) = self.state.queues.read().await.get(queue_name) {
            return Ok(channels.clone());
        }

        let mut queues = self.state.queues.write().await;
        let channels = queues
            .entry(queue_name.to_string())
            .or_insert_with(|| {
                debug!("创建内存队列: {}", queue_name);
                QueueChannels::new()
            })
            .clone();
        Ok(channels)
    }

    /// 向队列投递一条消息，队列不存在时自动创建
    pub async fn publish(&self, queue_name: &str, message: Message) -> HostResult<()> {
        let channels = self.channels(queue_name).await?;
        channels
            .sender
            .send(message)
            .map_err(|e| HostError::message_queue(format!("投递到内存队列 {queue_name} 失败: {e}")))?;
        debug!("消息已投递到内存队列: {}", queue_name);
        Ok(())
    }

    /// 成功处理的消息总数
    pub fn processed_count(&self) -> u64 {
        self.state.processed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    async fn run_consumer(
        self,
        index: usize,
        channels: QueueChannels,
        handler: Arc<dyn MessageHandler>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        loop {
            let next = async { channels.receiver.lock().await.recv().await };
            let message = tokio::select! {
                _ = shutdown.recv() => {
                    debug!("内存消费者 {} 收到关闭信号", index);
                    return Ok(());
                }
                message = next => match message {
                    Some(message) => message,
                    None => return Ok(()),
                },
            };

            let retry = message.clone();
            match handler.handle(message).await {
                Ok(()) => {
                    self.state.processed.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => {
                    error!("内存消息 {} 处理失败: {}", retry.id, err);
                    // 放回队列，接收端已关闭时直接丢弃
                    let _ = channels.sender.send(retry);
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl MessageAdapter for InMemoryMessageAdapter {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn consume_messages(
        &self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
        num_threads: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        let channels = self.channels(queue_name).await?;

        let mut consumers = JoinSet::new();
        for index in 0..num_threads.max(1) {
            consumers.spawn(self.clone().run_consumer(
                index,
                channels.clone(),
                Arc::clone(&handler),
                shutdown.resubscribe(),
            ));
        }
        info!(
            "开始消费内存队列 {}，消费者数量: {}",
            queue_name, num_threads
        );

        while let Some(result) = consumers.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    consumers.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    consumers.abort_all();
                    return Err(HostError::Internal(format!("消费者任务异常退出: {e}")));
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> HostResult<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.queues.write().await.clear();
        info!("内存消息适配器已关闭");
        Ok(())
    }
}
