use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 从队列中收到的一条消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub body: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            body,
            received_at: Utc::now(),
        }
    }

    pub fn with_id<S: Into<String>>(id: S, body: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            body,
            received_at: Utc::now(),
        }
    }
}

/// 处理器构造参数，按顺序传给注册的构造函数
pub type ProcessorParams = Vec<String>;

/// 已解析处理器的描述信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorInfo {
    pub processor_type: String,
    /// 仅消息模式下才有值
    pub queue_name: Option<String>,
    pub version: String,
}
