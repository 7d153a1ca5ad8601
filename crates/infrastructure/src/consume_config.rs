use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use svchost_errors::{HostError, HostResult};

/// 消费配置，来自 `CONSUME_CONFIG_FILE_PATH` 指向的JSON文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumeConfig {
    /// 每个消费者未确认消息的上限
    pub prefetch_count: u16,
    pub durable: bool,
    pub auto_delete: bool,
}

impl Default for ConsumeConfig {
    fn default() -> Self {
        Self {
            prefetch_count: 1,
            durable: true,
            auto_delete: false,
        }
    }
}

impl ConsumeConfig {
    /// 未指定路径时使用默认值
    pub fn load(path: Option<&Path>) -> HostResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            HostError::config_error(format!("读取消费配置文件 {} 失败: {e}", path.display()))
        })?;
        let config: ConsumeConfig = serde_json::from_str(&content).map_err(|e| {
            HostError::config_error(format!("解析消费配置文件 {} 失败: {e}", path.display()))
        })?;

        if config.prefetch_count == 0 {
            return Err(HostError::config_error("prefetch_count 必须大于0"));
        }

        info!("已加载消费配置 {}: {:?}", path.display(), config);
        Ok(config)
    }
}
