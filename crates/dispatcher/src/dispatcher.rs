use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use tokio::sync::broadcast;
use tracing::{debug, info, info_span, warn, Instrument};

use svchost_config::{Config, CronSchedule, ExecutionMode, MessagingType, TimeUnit};
use svchost_core::{MessageAdapter, ProcessorMessageHandler, ProcessorRegistry, ServiceProcessor};
use svchost_errors::{HostError, HostResult};
use svchost_infrastructure::MessageAdapterFactory;

use crate::engine::{Scheduler, DEFAULT_POLL_INTERVAL};
use crate::trigger::{Clock, SystemClock};

/// 由配置一次性确定的运行状态
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchMode {
    MessageConsume {
        messaging_type: MessagingType,
        queue_name: Option<String>,
        num_threads: usize,
    },
    CronExpression {
        expressions: Vec<String>,
        run_at_startup: bool,
    },
    CronInterval {
        amount: f64,
        unit: TimeUnit,
        run_at: Option<NaiveTime>,
        run_at_startup: bool,
    },
}

impl DispatchMode {
    pub fn from_config(config: &Config) -> HostResult<Self> {
        match config.execution_mode {
            ExecutionMode::Message => Ok(Self::MessageConsume {
                messaging_type: config.messaging_type(),
                queue_name: config.queue_name(),
                num_threads: config.num_threads,
            }),
            ExecutionMode::Cron => match &config.schedule {
                Some(CronSchedule::Expressions(expressions)) => Ok(Self::CronExpression {
                    expressions: expressions.clone(),
                    run_at_startup: config.run_at_startup,
                }),
                Some(CronSchedule::Interval {
                    amount,
                    unit,
                    run_at,
                }) => Ok(Self::CronInterval {
                    amount: *amount,
                    unit: *unit,
                    run_at: *run_at,
                    run_at_startup: config.run_at_startup,
                }),
                None => Err(HostError::Internal("CRON模式缺少调度定义".to_string())),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageConsume { .. } => "message-consume",
            Self::CronExpression { .. } => "cron-expression",
            Self::CronInterval { .. } => "cron-interval",
        }
    }
}

/// 宿主调度入口
///
/// 解析处理器后按配置进入消息消费或定时调度，阻塞直到关闭信号或出错。
pub struct Dispatcher {
    config: Arc<Config>,
    registry: Arc<ProcessorRegistry>,
    adapters: MessageAdapterFactory,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ProcessorRegistry>,
        adapters: MessageAdapterFactory,
    ) -> Self {
        Self {
            config,
            registry,
            adapters,
            clock: Arc::new(SystemClock),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn mode(&self) -> HostResult<DispatchMode> {
        DispatchMode::from_config(&self.config)
    }

    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> HostResult<()> {
        let span = info_span!(
            "dispatcher",
            module = %self.config.processor_module,
            processor = %self.config.processor_type
        );
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner(&self, shutdown: broadcast::Receiver<()>) -> HostResult<()> {
        let resolved = self.registry.resolve(
            &self.config.processor_module,
            &self.config.processor_type,
            &self.config.processor_params,
        )?;
        info!("Service Processor Version: {}", resolved.version);

        let processor_info = self.config.processor_info(&resolved.version);
        debug!("处理器信息: {:?}", processor_info);

        let mode = self.mode()?;
        info!("运行模式: {}", mode.name());

        match mode {
            DispatchMode::MessageConsume { .. } => {
                self.consume_messages(resolved.processor, shutdown).await
            }
            DispatchMode::CronExpression { run_at_startup, .. }
            | DispatchMode::CronInterval { run_at_startup, .. } => {
                self.run_schedule(resolved.processor, run_at_startup, shutdown)
                    .await
            }
        }
    }

    async fn consume_messages(
        &self,
        processor: Arc<dyn ServiceProcessor>,
        shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        let adapter = self.adapters.create(&self.config.messaging).await?;
        let result = self
            .consume_with(adapter.as_ref(), processor, shutdown)
            .await;

        // 无论消费结果如何都释放连接
        match adapter.close().await {
            Ok(()) => result,
            Err(close_err) if result.is_ok() => Err(close_err),
            Err(close_err) => {
                warn!("关闭消息适配器失败: {}", close_err);
                result
            }
        }
    }

    async fn consume_with(
        &self,
        adapter: &dyn MessageAdapter,
        processor: Arc<dyn ServiceProcessor>,
        shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        let queue_name = self
            .config
            .queue_name()
            .ok_or_else(|| HostError::MissingQueueName {
                processor_type: self.config.processor_type.clone(),
            })?;

        info!(
            "通过 {} 消费队列 {}，消费者数量: {}",
            adapter.name(),
            queue_name,
            self.config.num_threads
        );
        let handler = Arc::new(ProcessorMessageHandler::new(processor));
        adapter
            .consume_messages(&queue_name, handler, self.config.num_threads, shutdown)
            .await
    }

    async fn run_schedule(
        &self,
        processor: Arc<dyn ServiceProcessor>,
        run_at_startup: bool,
        shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        let schedule = self
            .config
            .schedule
            .as_ref()
            .ok_or_else(|| HostError::Internal("CRON模式缺少调度定义".to_string()))?;
        info!("调度定义: {}", schedule.describe());

        let mut scheduler = Scheduler::from_schedule(processor, schedule)?
            .with_clock(Arc::clone(&self.clock))
            .with_poll_interval(self.poll_interval);

        if run_at_startup {
            scheduler.run_at_startup().await?;
        }
        scheduler.run_until_shutdown(shutdown).await
    }
}
