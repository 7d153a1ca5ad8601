//! 宿主自带的示例处理器，注册在 `builtin` 模块下。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use svchost_core::{Message, ProcessorParams, ProcessorRegistry, ServiceProcessor};
use svchost_errors::HostResult;

pub const BUILTIN_MODULE: &str = "builtin";

const PROCESSOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 定时模式示例：每次触发记录一条带UTC时间的日志
///
/// 第一个参数（如有）作为日志标签。
#[derive(Debug, Clone)]
pub struct LoggingServiceProcessor {
    label: String,
}

impl LoggingServiceProcessor {
    pub fn new(params: &ProcessorParams) -> Self {
        Self {
            label: params
                .first()
                .cloned()
                .unwrap_or_else(|| "svchost".to_string()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl ServiceProcessor for LoggingServiceProcessor {
    fn version(&self) -> &str {
        PROCESSOR_VERSION
    }

    async fn process(&self) -> HostResult<()> {
        info!("[{}] 定时任务执行: {}", self.label, Utc::now().to_rfc3339());
        Ok(())
    }
}

/// 消息模式示例：记录收到的每条消息
#[derive(Debug, Default, Clone)]
pub struct MessageLoggingProcessor;

#[async_trait]
impl ServiceProcessor for MessageLoggingProcessor {
    fn version(&self) -> &str {
        PROCESSOR_VERSION
    }

    async fn process_message(&self, message: &Message) -> HostResult<()> {
        info!(
            "收到消息 {} (接收于 {}): {}",
            message.id,
            message.received_at.to_rfc3339(),
            message.body
        );
        Ok(())
    }
}

/// 注册全部内置处理器
pub fn register_builtin_processors(registry: &mut ProcessorRegistry) {
    registry
        .register(BUILTIN_MODULE, "LoggingServiceProcessor", |params| {
            Ok(Arc::new(LoggingServiceProcessor::new(params)) as Arc<dyn ServiceProcessor>)
        })
        .register(BUILTIN_MODULE, "MessageLoggingProcessor", |_| {
            Ok(Arc::new(MessageLoggingProcessor) as Arc<dyn ServiceProcessor>)
        });
}

pub fn builtin_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    register_builtin_processors(&mut registry);
    registry
}
