//! 业务处理器接口定义
//!
//! 宿主只认识两种调用方式：
//! - 消息模式下，每条消息调用一次 [`ServiceProcessor::process_message`]
//! - 定时模式下，每次触发调用一次无参数的 [`ServiceProcessor::process`]
//!
//! 处理器只需实现自己运行模式所需的那一个方法，另一个保持默认实现，
//! 被错误调用时返回 `HostError::UnsupportedCapability`。

use std::sync::Arc;

use async_trait::async_trait;

use svchost_errors::{HostError, HostResult};

use crate::models::Message;

#[async_trait]
pub trait ServiceProcessor: Send + Sync {
    /// 处理器版本，启动时写入日志
    fn version(&self) -> &str {
        "unknown"
    }

    /// 处理单条消息
    async fn process_message(&self, _message: &Message) -> HostResult<()> {
        Err(HostError::UnsupportedCapability {
            processor_type: std::any::type_name::<Self>().to_string(),
            capability: "process(message)",
        })
    }

    /// 定时触发时执行一次
    async fn process(&self) -> HostResult<()> {
        Err(HostError::UnsupportedCapability {
            processor_type: std::any::type_name::<Self>().to_string(),
            capability: "process()",
        })
    }
}

/// 消息适配器收到消息后的回调
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> HostResult<()>;
}

/// 把处理器的 `process_message` 包装成消费回调
pub struct ProcessorMessageHandler {
    processor: Arc<dyn ServiceProcessor>,
}

impl ProcessorMessageHandler {
    pub fn new(processor: Arc<dyn ServiceProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl MessageHandler for ProcessorMessageHandler {
    async fn handle(&self, message: Message) -> HostResult<()> {
        self.processor.process_message(&message).await
    }
}
