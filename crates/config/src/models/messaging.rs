use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::values;

/// 消息队列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessagingType {
    RabbitMq,
    Sqs,
    /// CRON模式下不连接任何队列
    None,
}

impl MessagingType {
    /// 解析 `MESSAGING_TYPE`，大小写敏感
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value {
            values::RABBITMQ_CONNECTION => Some(Self::RabbitMq),
            values::SQS_CONNECTION => Some(Self::Sqs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RabbitMq => values::RABBITMQ_CONNECTION,
            Self::Sqs => values::SQS_CONNECTION,
            Self::None => "None",
        }
    }
}

impl fmt::Display for MessagingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连接参数，随消息队列类型变化
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagingParams {
    RabbitMq {
        host: String,
        port: u16,
        user: Option<String>,
        password: Option<String>,
        virtual_host: Option<String>,
        consume_config_path: Option<PathBuf>,
    },
    Sqs {
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        region: Option<String>,
        consume_config_path: Option<PathBuf>,
    },
    None,
}

impl MessagingParams {
    pub fn messaging_type(&self) -> MessagingType {
        match self {
            Self::RabbitMq { .. } => MessagingType::RabbitMq,
            Self::Sqs { .. } => MessagingType::Sqs,
            Self::None => MessagingType::None,
        }
    }

    pub fn consume_config_path(&self) -> Option<&PathBuf> {
        match self {
            Self::RabbitMq {
                consume_config_path,
                ..
            }
            | Self::Sqs {
                consume_config_path,
                ..
            } => consume_config_path.as_ref(),
            Self::None => None,
        }
    }
}

// 手写Debug，避免密码和密钥进入日志
impl fmt::Debug for MessagingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "***"
            } else {
                "None"
            }
        }

        match self {
            Self::RabbitMq {
                host,
                port,
                user,
                password,
                virtual_host,
                consume_config_path,
            } => f
                .debug_struct("RabbitMq")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &mask(password))
                .field("virtual_host", virtual_host)
                .field("consume_config_path", consume_config_path)
                .finish(),
            Self::Sqs {
                access_key_id,
                secret_access_key,
                region,
                consume_config_path,
            } => f
                .debug_struct("Sqs")
                .field("access_key_id", &mask(access_key_id))
                .field("secret_access_key", &mask(secret_access_key))
                .field("region", region)
                .field("consume_config_path", consume_config_path)
                .finish(),
            Self::None => f.write_str("None"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messaging_type_is_case_sensitive() {
        assert_eq!(
            MessagingType::from_env_value("RabbitMqConnection"),
            Some(MessagingType::RabbitMq)
        );
        assert_eq!(
            MessagingType::from_env_value("SqsConnection"),
            Some(MessagingType::Sqs)
        );
        assert_eq!(MessagingType::from_env_value("rabbitmqconnection"), None);
        assert_eq!(MessagingType::from_env_value(""), None);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let params = MessagingParams::RabbitMq {
            host: "localhost".to_string(),
            port: 5672,
            user: Some("guest".to_string()),
            password: Some("hunter2".to_string()),
            virtual_host: None,
            consume_config_path: None,
        };
        let rendered = format!("{params:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("localhost"));
        assert_eq!(params.messaging_type(), MessagingType::RabbitMq);
    }
}
