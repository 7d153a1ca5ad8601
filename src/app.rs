use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use svchost_config::{Config, HostFileEnv};
use svchost_core::ProcessorRegistry;
use svchost_dispatcher::Dispatcher;
use svchost_errors::HostResult;
use svchost_infrastructure::MessageAdapterFactory;

/// 读取并校验宿主配置
///
/// 指定了宿主配置文件时，文件中的 `[env]` 作为默认值，真实环境变量优先。
pub fn load_config(host_file: Option<&Path>) -> HostResult<Config> {
    match host_file {
        Some(path) => Config::from_env_with_host_file(HostFileEnv::load(path)?),
        None => Config::from_env(),
    }
}

/// 主应用程序
pub struct Application {
    config: Arc<Config>,
    dispatcher: Dispatcher,
}

impl Application {
    pub fn new(
        config: Config,
        registry: ProcessorRegistry,
        adapters: MessageAdapterFactory,
    ) -> Self {
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(Arc::clone(&config), Arc::new(registry), adapters);
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 运行到关闭信号或出错
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> HostResult<()> {
        info!(
            "启动服务宿主，处理器: {}::{}，执行模式: {:?}",
            self.config.processor_module, self.config.processor_type, self.config.execution_mode
        );
        self.dispatcher.run(shutdown_rx).await?;
        info!("服务宿主已停止");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::builtin_registry;
    use std::io::Write;
    use svchost_config::ExecutionMode;
    use svchost_dispatcher::DispatchMode;

    #[test]
    fn test_load_config_from_host_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"[env]
EXECUTION_TYPE = "CRON"
PROCESSOR_TYPE = "SvchostHostFileProbe"
PROCESSOR_MODULE = "builtin"
CRON_TIME_AMOUNT = 15
CRON_TIME_UNIT = "minutes"
"#
        )
        .unwrap();

        // 只有在进程环境没有覆盖这些键时才能断言文件中的值
        if std::env::var("PROCESSOR_TYPE").is_ok() || std::env::var("EXECUTION_TYPE").is_ok() {
            return;
        }

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.execution_mode, ExecutionMode::Cron);
        assert_eq!(config.processor_type, "SvchostHostFileProbe");

        let app = Application::new(config, builtin_registry(), MessageAdapterFactory::with_defaults());
        assert!(matches!(
            app.dispatcher().mode().unwrap(),
            DispatchMode::CronInterval { .. }
        ));
    }

    #[test]
    fn test_missing_host_file_is_an_error() {
        assert!(load_config(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
