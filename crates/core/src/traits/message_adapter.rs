use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use svchost_errors::HostResult;

use super::processor::MessageHandler;

/// 消息队列适配器抽象接口
///
/// 适配器由工厂创建时已完成连接，生命周期覆盖整个消费过程；
/// 调用方在消费结束（无论成功、失败还是收到关闭信号）后必须调用
/// [`MessageAdapter::close`] 释放连接。
#[async_trait]
pub trait MessageAdapter: Send + Sync {
    /// 适配器名称，用于日志
    fn name(&self) -> &str;

    /// 阻塞消费指定队列，直到收到关闭信号或处理出错
    ///
    /// `num_threads` 个消费者并发处理消息，单个消费者内消息串行处理。
    async fn consume_messages(
        &self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
        num_threads: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()>;

    /// 关闭连接
    async fn close(&self) -> HostResult<()>;
}
