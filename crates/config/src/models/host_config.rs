use serde::{Deserialize, Serialize};

use svchost_core::{ProcessorInfo, ProcessorParams};

use super::messaging::{MessagingParams, MessagingType};
use super::schedule::{CronSchedule, ExecutionMode};

/// 校验通过后的宿主配置，构建完成后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub execution_mode: ExecutionMode,
    pub messaging: MessagingParams,
    /// 并发消费者数量，至少为1
    pub num_threads: usize,
    pub processor_type: String,
    pub processor_module: String,
    /// 处理器构造参数，按顺序传给构造函数
    pub processor_params: ProcessorParams,
    /// 仅CRON模式存在
    pub schedule: Option<CronSchedule>,
    pub run_at_startup: bool,
    pub queue_name_prefix: Option<String>,
    /// `{PROCESSOR_TYPE}_QUEUE_NAME` 的原始取值
    pub processor_queue_name: Option<String>,
}

impl Config {
    pub fn messaging_type(&self) -> MessagingType {
        self.messaging.messaging_type()
    }

    /// 队列名 = 前缀 + 处理器队列名，任一缺失则无法确定
    pub fn queue_name(&self) -> Option<String> {
        if !matches!(self.execution_mode, ExecutionMode::Message) {
            return None;
        }
        match (&self.queue_name_prefix, &self.processor_queue_name) {
            (Some(prefix), Some(name)) => Some(format!("{prefix}{name}")),
            _ => None,
        }
    }

    pub fn processor_info(&self, version: &str) -> ProcessorInfo {
        ProcessorInfo {
            processor_type: self.processor_type.clone(),
            queue_name: self.queue_name(),
            version: version.to_string(),
        }
    }
}
