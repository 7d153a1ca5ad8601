use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info};

use svchost_config::{MessagingParams, MessagingType};
use svchost_core::MessageAdapter;
use svchost_errors::{HostError, HostResult};

use crate::rabbitmq_adapter::RabbitMqMessageAdapter;

/// 适配器构造函数：接收连接参数，返回已连接的适配器
pub type AdapterConstructor = Arc<
    dyn Fn(MessagingParams) -> BoxFuture<'static, HostResult<Arc<dyn MessageAdapter>>>
        + Send
        + Sync,
>;

/// 按消息队列类型创建适配器
///
/// 默认只注册RabbitMQ；SQS等其他实现由嵌入方通过 [`register`](Self::register) 提供。
#[derive(Clone, Default)]
pub struct MessageAdapterFactory {
    constructors: HashMap<MessagingType, AdapterConstructor>,
}

impl MessageAdapterFactory {
    /// 空工厂，不包含任何适配器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register(MessagingType::RabbitMq, |params| async move {
            let adapter = RabbitMqMessageAdapter::from_params(&params).await?;
            Ok(Arc::new(adapter) as Arc<dyn MessageAdapter>)
        });
        factory
    }

    pub fn register<F, Fut>(&mut self, messaging_type: MessagingType, constructor: F) -> &mut Self
    where
        F: Fn(MessagingParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HostResult<Arc<dyn MessageAdapter>>> + Send + 'static,
    {
        debug!("注册消息适配器: {}", messaging_type);
        self.constructors.insert(
            messaging_type,
            Arc::new(move |params| constructor(params).boxed()),
        );
        self
    }

    pub fn supports(&self, messaging_type: MessagingType) -> bool {
        self.constructors.contains_key(&messaging_type)
    }

    pub async fn create(&self, params: &MessagingParams) -> HostResult<Arc<dyn MessageAdapter>> {
        let messaging_type = params.messaging_type();
        debug!("创建消息适配器，类型: {}", messaging_type);

        let constructor = self.constructors.get(&messaging_type).ok_or_else(|| {
            HostError::AdapterUnavailable(format!("未注册 {messaging_type} 类型的消息适配器"))
        })?;

        let adapter = constructor(params.clone()).await?;
        info!("消息适配器 {} 已就绪", adapter.name());
        Ok(adapter)
    }
}
