use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use svchost_errors::{HostError, HostResult};

use crate::env::EnvSource;

#[derive(Debug, Default, Deserialize)]
struct HostFile {
    #[serde(default)]
    env: toml::Table,
}

/// 宿主配置文件提供的默认环境变量
///
/// 文件格式为TOML，`[env]` 表中的键值作为环境变量的默认值，
/// 真实环境变量优先级更高（由 `LayeredEnv` 的叠加顺序决定）。
///
/// ```toml
/// [env]
/// EXECUTION_TYPE = "CRON"
/// CRON_TIME_AMOUNT = 30
/// CRON_TIME_UNIT = "seconds"
/// ```
#[derive(Debug, Default, Clone)]
pub struct HostFileEnv {
    vars: HashMap<String, String>,
}

impl HostFileEnv {
    pub fn load<P: AsRef<Path>>(path: P) -> HostResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HostError::config_error(format!("读取宿主配置文件 {} 失败: {e}", path.display()))
        })?;
        let env = Self::parse(&content)?;
        info!("已加载宿主配置文件 {}，共 {} 项", path.display(), env.len());
        Ok(env)
    }

    pub fn parse(content: &str) -> HostResult<Self> {
        let file: HostFile = toml::from_str(content)
            .map_err(|e| HostError::config_error(format!("解析宿主配置文件失败: {e}")))?;

        let mut vars = HashMap::with_capacity(file.env.len());
        for (key, value) in file.env {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(HostError::config_error(format!(
                        "宿主配置项 {key} 只能是标量值，实际为 {}",
                        other.type_str()
                    )))
                }
            };
            debug!("宿主配置项 {} 已载入", key);
            vars.insert(key, value);
        }

        Ok(Self { vars })
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl EnvSource for HostFileEnv {
    fn get_env_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
