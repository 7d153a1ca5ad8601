use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::*,
    types::FieldTable,
    uri::{AMQPAuthority, AMQPUri, AMQPUserInfo},
    Channel, Connection, ConnectionProperties, Consumer,
};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use svchost_config::constants::values;
use svchost_config::MessagingParams;
use svchost_core::{Message, MessageAdapter, MessageHandler};
use svchost_errors::{HostError, HostResult};

use crate::consume_config::ConsumeConfig;

/// RabbitMQ连接参数
#[derive(Clone)]
pub struct RabbitMqSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub virtual_host: String,
    pub consume_config_path: Option<PathBuf>,
}

impl std::fmt::Debug for RabbitMqSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabbitMqSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("virtual_host", &self.virtual_host)
            .field("consume_config_path", &self.consume_config_path)
            .finish()
    }
}

impl RabbitMqSettings {
    /// 缺失的用户名、密码、虚拟主机使用AMQP默认值
    pub fn from_params(params: &MessagingParams) -> HostResult<Self> {
        match params {
            MessagingParams::RabbitMq {
                host,
                port,
                user,
                password,
                virtual_host,
                consume_config_path,
            } => Ok(Self {
                host: host.clone(),
                port: *port,
                user: user
                    .clone()
                    .unwrap_or_else(|| values::DEFAULT_RABBITMQ_USER.to_string()),
                password: password
                    .clone()
                    .unwrap_or_else(|| values::DEFAULT_RABBITMQ_PASSWORD.to_string()),
                virtual_host: virtual_host
                    .clone()
                    .filter(|vhost| !vhost.is_empty())
                    .unwrap_or_else(|| values::DEFAULT_RABBITMQ_VIRTUAL_HOST.to_string()),
                consume_config_path: consume_config_path.clone(),
            }),
            other => Err(HostError::config_error(format!(
                "RabbitMQ适配器收到了 {} 的连接参数",
                other.messaging_type()
            ))),
        }
    }

    /// 虚拟主机名原样保存在URI结构中，无需再做URL编码
    pub fn to_uri(&self) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.user.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.virtual_host.clone(),
            ..Default::default()
        }
    }

    /// 用于日志的地址，不含密码
    pub fn display_address(&self) -> String {
        format!(
            "amqp://{}@{}:{}/{}",
            self.user, self.host, self.port, self.virtual_host
        )
    }
}

/// RabbitMQ消息适配器
///
/// 一个连接，每个消费者独占一个通道；消息处理成功后确认，
/// 处理失败则拒绝并重新入队，随后整个消费过程以该错误结束。
pub struct RabbitMqMessageAdapter {
    connection: Connection,
    consume_config: ConsumeConfig,
    address: String,
}

impl RabbitMqMessageAdapter {
    pub async fn connect(settings: RabbitMqSettings) -> HostResult<Self> {
        let consume_config = ConsumeConfig::load(settings.consume_config_path.as_deref())?;
        let address = settings.display_address();

        let connection = Connection::connect_uri(settings.to_uri(), ConnectionProperties::default())
            .await
            .map_err(|e| HostError::message_queue(format!("连接RabbitMQ失败 {address}: {e}")))?;

        info!("成功连接到RabbitMQ: {}", address);
        Ok(Self {
            connection,
            consume_config,
            address,
        })
    }

    pub async fn from_params(params: &MessagingParams) -> HostResult<Self> {
        Self::connect(RabbitMqSettings::from_params(params)?).await
    }

    pub fn consume_config(&self) -> &ConsumeConfig {
        &self.consume_config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    async fn declare_queue(&self, queue_name: &str) -> HostResult<()> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| HostError::message_queue(format!("创建通道失败: {e}")))?;

        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: self.consume_config.durable,
                    auto_delete: self.consume_config.auto_delete,
                    exclusive: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| HostError::message_queue(format!("声明队列 {queue_name} 失败: {e}")))?;

        debug!("队列 {} 声明成功", queue_name);
        // 声明用的通道用完即关
        if let Err(e) = channel.close(200, "队列声明完成").await {
            warn!("关闭声明通道失败: {}", e);
        }
        Ok(())
    }

    async fn create_consumer(
        &self,
        queue_name: &str,
        consumer_tag: &str,
    ) -> HostResult<(Channel, Consumer)> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| HostError::message_queue(format!("创建通道失败: {e}")))?;

        channel
            .basic_qos(self.consume_config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| HostError::message_queue(format!("设置预取数量失败: {e}")))?;

        let consumer = channel
            .basic_consume(
                queue_name,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| HostError::message_queue(format!("创建消费者失败: {e}")))?;

        debug!("为队列 {} 创建消费者: {}", queue_name, consumer_tag);
        Ok((channel, consumer))
    }
}

fn consumer_tag(index: usize) -> String {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown-host".to_string());
    format!("svchost-{host}-{index}-{}", &Uuid::new_v4().to_string()[..8])
}

fn decode_delivery(delivery: &Delivery) -> HostResult<Message> {
    let body: serde_json::Value = serde_json::from_slice(&delivery.data)?;
    let id = delivery
        .properties
        .message_id()
        .as_ref()
        .map(|id| id.as_str().to_string())
        .unwrap_or_else(|| delivery.delivery_tag.to_string());
    Ok(Message::with_id(id, body))
}

async fn handle_delivery(
    channel: &Channel,
    handler: &Arc<dyn MessageHandler>,
    delivery: Delivery,
) -> HostResult<()> {
    let tag = delivery.delivery_tag;

    let message = match decode_delivery(&delivery) {
        Ok(message) => message,
        Err(e) => {
            // 无法解析的消息不重新入队
            error!("消息 {} 无法解析，丢弃: {}", tag, e);
            return channel
                .basic_reject(tag, BasicRejectOptions { requeue: false })
                .await
                .map_err(|e| HostError::message_queue(format!("拒绝消息失败: {e}")));
        }
    };

    let message_id = message.id.clone();
    match handler.handle(message).await {
        Ok(()) => {
            channel
                .basic_ack(tag, BasicAckOptions::default())
                .await
                .map_err(|e| HostError::message_queue(format!("确认消息失败: {e}")))?;
            debug!("消息 {} 处理完成", message_id);
            Ok(())
        }
        Err(err) => {
            error!("消息 {} 处理失败: {}", message_id, err);
            if let Err(e) = channel
                .basic_nack(
                    tag,
                    BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    },
                )
                .await
            {
                warn!("消息 {} 重新入队失败: {}", message_id, e);
            }
            Err(err)
        }
    }
}

async fn run_consumer(
    consumer_tag: String,
    channel: Channel,
    mut consumer: Consumer,
    handler: Arc<dyn MessageHandler>,
    mut shutdown: broadcast::Receiver<()>,
) -> HostResult<()> {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                debug!("消费者 {} 收到关闭信号", consumer_tag);
                return Ok(());
            }
            delivery = consumer.next() => {
                let Some(delivery) = delivery else {
                    warn!("消费者 {} 的消息流已结束", consumer_tag);
                    return Ok(());
                };
                let delivery = delivery
                    .map_err(|e| HostError::message_queue(format!("接收消息失败: {e}")))?;
                handle_delivery(&channel, &handler, delivery).await?;
            }
        }
    }
}

#[async_trait]
impl MessageAdapter for RabbitMqMessageAdapter {
    fn name(&self) -> &str {
        "rabbitmq"
    }

    async fn consume_messages(
        &self,
        queue_name: &str,
        handler: Arc<dyn MessageHandler>,
        num_threads: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        self.declare_queue(queue_name).await?;

        let mut consumers = JoinSet::new();
        for index in 0..num_threads.max(1) {
            let tag = consumer_tag(index);
            let (channel, consumer) = self.create_consumer(queue_name, &tag).await?;
            consumers.spawn(run_consumer(
                tag,
                channel,
                consumer,
                Arc::clone(&handler),
                shutdown.resubscribe(),
            ));
        }

        info!(
            "开始从 {} 的队列 {} 消费消息，消费者数量: {}",
            self.address, queue_name, num_threads
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

        info!("队列 {} 的全部消费者已停止", queue_name);
        Ok(())
    }

    async fn close(&self) -> HostResult<()> {
        if !self.is_connected() {
            debug!("RabbitMQ连接已断开，无需关闭");
            return Ok(());
        }
        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| HostError::message_queue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}
