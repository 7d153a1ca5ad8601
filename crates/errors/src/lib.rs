use std::fmt;

use thiserror::Error;

/// 单个配置校验问题：出错的环境变量、实际取值和期望的约束
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub value: Option<String>,
    pub expected: String,
}

impl ValidationIssue {
    pub fn new<F, E>(field: F, value: Option<&str>, expected: E) -> Self
    where
        F: Into<String>,
        E: Into<String>,
    {
        Self {
            field: field.into(),
            value: value.map(str::to_string),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "{} 的取值 {:?} 无效，期望: {}",
                self.field, value, self.expected
            ),
            None => write!(f, "{} 缺失，期望: {}", self.field, self.expected),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("配置校验失败: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("环境变量 {field} 解析失败: {value:?} - {reason}")]
    Parse {
        field: String,
        value: Option<String>,
        reason: String,
    },
    #[error("处理器模块未找到: {module}")]
    ModuleNotFound { module: String },
    #[error("处理器类型 {processor_type} 在模块 {module} 中未找到")]
    ProcessorTypeNotFound {
        module: String,
        processor_type: String,
    },
    #[error("无效的CRON表达式: {expr} - {message}")]
    InvalidCron { expr: String, message: String },
    #[error("无法确定处理器 {processor_type} 的队列名称")]
    MissingQueueName { processor_type: String },
    #[error("消息适配器不可用: {0}")]
    AdapterUnavailable(String),
    #[error("处理器 {processor_type} 不支持 {capability} 调用方式")]
    UnsupportedCapability {
        processor_type: String,
        capability: &'static str,
    },
    #[error("消息队列错误: {0}")]
    MessageQueue(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("处理器执行错误: {0}")]
    Processor(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn processor_error<S: Into<String>>(msg: S) -> Self {
        Self::Processor(msg.into())
    }
    pub fn message_queue<S: Into<String>>(msg: S) -> Self {
        Self::MessageQueue(msg.into())
    }
    pub fn parse_error<F, R>(field: F, value: Option<&str>, reason: R) -> Self
    where
        F: Into<String>,
        R: Into<String>,
    {
        Self::Parse {
            field: field.into(),
            value: value.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// 启动阶段错误：配置或处理器解析失败，进程应直接退出
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            HostError::Configuration(_)
                | HostError::Validation(_)
                | HostError::Parse { .. }
                | HostError::ModuleNotFound { .. }
                | HostError::ProcessorTypeNotFound { .. }
        )
    }

    /// 运行期分发错误：本应被配置校验拦截，出现即说明内部状态不一致
    pub fn is_dispatch_error(&self) -> bool {
        matches!(
            self,
            HostError::MissingQueueName { .. } | HostError::AdapterUnavailable(_)
        )
    }

    /// 校验失败时返回全部问题列表
    pub fn validation_issues(&self) -> &[ValidationIssue] {
        match self {
            HostError::Validation(issues) => issues,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for HostError {
    fn from(err: anyhow::Error) -> Self {
        HostError::Internal(err.to_string())
    }
}
