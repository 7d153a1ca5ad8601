use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use svchost::app::{load_config, Application};
use svchost::processors::builtin_registry;
use svchost::shutdown::ShutdownManager;
use svchost_infrastructure::MessageAdapterFactory;

/// 收到关闭信号后等待处理器收尾的时间
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Command::new("svchost")
        .version(env!("CARGO_PKG_VERSION"))
        .about("通用服务宿主")
        .arg(
            Arg::new("host-file")
                .long("host-file")
                .value_name("FILE")
                .help("宿主配置文件路径，[env] 表作为环境变量默认值")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别（RUST_LOG 优先）")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .default_value("pretty"),
        )
        .arg(
            Arg::new("list-processors")
                .long("list-processors")
                .help("列出已注册的处理器后退出")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    let log_format = matches
        .get_one::<String>("log-format")
        .map(String::as_str)
        .unwrap_or("pretty");

    if let Err(e) = init_logging(log_level, log_format) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    if matches.get_flag("list-processors") {
        for descriptor in builtin_registry().describe() {
            println!("{}::{}", descriptor.module, descriptor.processor_type);
        }
        return ExitCode::SUCCESS;
    }

    let host_file = matches.get_one::<PathBuf>("host-file").cloned();
    match run(host_file).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(host_file: Option<PathBuf>) -> Result<()> {
    info!("Service Host Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &host_file {
        info!("宿主配置文件: {}", path.display());
    }

    let config = load_config(host_file.as_deref()).context("宿主配置校验失败")?;
    let app = Application::new(config, builtin_registry(), MessageAdapterFactory::with_defaults());

    let shutdown_manager = ShutdownManager::new();
    let shutdown_rx = shutdown_manager.subscribe().await;
    let app_future = app.run(shutdown_rx);
    tokio::pin!(app_future);

    tokio::select! {
        result = &mut app_future => {
            return result.context("服务宿主运行失败");
        }
        signal = shutdown_manager.shutdown_on_signal() => {
            signal.context("安装信号处理器失败")?;
        }
    }

    // 已触发关闭，等待当前处理结束
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, app_future).await {
        Ok(Ok(())) => info!("服务宿主已优雅关闭"),
        Ok(Err(e)) => warn!("关闭过程中处理器返回错误: {}", e),
        Err(_) => warn!("等待关闭超时（{:?}），强制退出", SHUTDOWN_TIMEOUT),
    }
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}
