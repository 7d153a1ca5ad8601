//! 服务宿主的基础抽象：处理器与消息适配器接口、处理器注册表、CRON工具。

pub mod cron_utils;
pub mod models;
pub mod registry;
pub mod traits;

pub use cron_utils::CronScheduler;
pub use models::{Message, ProcessorInfo, ProcessorParams};
pub use registry::{ProcessorDescriptor, ProcessorFactory, ProcessorRegistry, ResolvedProcessor};
pub use traits::{MessageAdapter, MessageHandler, ProcessorMessageHandler, ServiceProcessor};

pub use svchost_errors::{HostError, HostResult, ValidationIssue};
