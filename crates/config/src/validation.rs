//! 环境变量校验流水线
//!
//! 按固定顺序执行：消息队列类型 → 处理器 → CRON → 连接参数，
//! 任一步骤失败立即返回，不会产生部分填充的配置。

use std::path::PathBuf;

use chrono::NaiveTime;
use tracing::{debug, error, info};

use svchost_core::CronScheduler;
use svchost_errors::{HostError, HostResult, ValidationIssue};

use crate::constants::{env_keys, values};
use crate::env::{EnvSource, LayeredEnv, ProcessEnv};
use crate::host_file::HostFileEnv;
use crate::models::{Config, CronSchedule, ExecutionMode, MessagingParams, MessagingType, TimeUnit};

/// CRON模式下的调度设置
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CronSettings {
    pub schedule: CronSchedule,
    pub run_at_startup: bool,
}

impl Config {
    /// 从任意环境来源构建并校验配置
    pub fn from_source(env: &dyn EnvSource) -> HostResult<Config> {
        let execution_mode = ExecutionMode::from_env_value(
            env.get_env_var(env_keys::EXECUTION_TYPE).as_deref(),
        );
        debug!("执行模式: {:?}", execution_mode);

        let messaging_type = validate_messaging_and_execution_type(env, execution_mode)?;
        let (processor_type, processor_module) = validate_processor_config(env)?;
        let cron = validate_cron_config(env, execution_mode)?;
        let (messaging, num_threads) = setup_messaging_params(env, messaging_type)?;

        let (queue_name_prefix, processor_queue_name) = match execution_mode {
            ExecutionMode::Message => (
                env.get_env_var(env_keys::QUEUE_NAME_PREFIX),
                env.get_env_var(&format!("{processor_type}{}", env_keys::QUEUE_NAME_SUFFIX)),
            ),
            ExecutionMode::Cron => (None, None),
        };

        let (schedule, run_at_startup) = match cron {
            Some(settings) => (Some(settings.schedule), settings.run_at_startup),
            None => (None, false),
        };

        Ok(Config {
            execution_mode,
            messaging,
            num_threads,
            processor_type,
            processor_module,
            processor_params: Vec::new(),
            schedule,
            run_at_startup,
            queue_name_prefix,
            processor_queue_name,
        })
    }

    /// 从进程环境变量构建配置
    pub fn from_env() -> HostResult<Config> {
        Self::from_source(&ProcessEnv)
    }

    /// 宿主配置文件提供默认值，进程环境变量优先
    pub fn from_env_with_host_file(host_file: HostFileEnv) -> HostResult<Config> {
        let env = LayeredEnv::new().with_layer(ProcessEnv).with_layer(host_file);
        Self::from_source(&env)
    }
}

fn invalid(field: &str, value: Option<&str>, expected: &str) -> HostError {
    let issue = ValidationIssue::new(field, value, expected);
    error!("{}", issue);
    HostError::Validation(vec![issue])
}

fn non_empty(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.get_env_var(key).filter(|value| !value.trim().is_empty())
}

/// 非CRON模式下 `MESSAGING_TYPE` 必须是受支持的取值
pub(crate) fn validate_messaging_and_execution_type(
    env: &dyn EnvSource,
    execution_mode: ExecutionMode,
) -> HostResult<MessagingType> {
    if execution_mode.is_cron() {
        return Ok(MessagingType::None);
    }

    let raw = env.get_env_var(env_keys::MESSAGING_TYPE);
    raw.as_deref()
        .and_then(MessagingType::from_env_value)
        .ok_or_else(|| {
            invalid(
                env_keys::MESSAGING_TYPE,
                raw.as_deref(),
                "RabbitMqConnection 或 SqsConnection",
            )
        })
}

pub(crate) fn validate_processor_config(env: &dyn EnvSource) -> HostResult<(String, String)> {
    let processor_type = non_empty(env, env_keys::PROCESSOR_TYPE)
        .ok_or_else(|| invalid(env_keys::PROCESSOR_TYPE, None, "非空的处理器类型名"))?;
    let processor_module = non_empty(env, env_keys::PROCESSOR_MODULE)
        .ok_or_else(|| invalid(env_keys::PROCESSOR_MODULE, None, "非空的处理器模块名"))?;
    Ok((processor_type, processor_module))
}

/// CRON模式下校验调度设置，`CRON_EXPRESSIONS` 优先于便捷字段
pub(crate) fn validate_cron_config(
    env: &dyn EnvSource,
    execution_mode: ExecutionMode,
) -> HostResult<Option<CronSettings>> {
    if !execution_mode.is_cron() {
        return Ok(None);
    }

    let schedule = match non_empty(env, env_keys::CRON_EXPRESSIONS) {
        Some(raw) => CronSchedule::Expressions(validate_cron_expressions(&raw)?),
        None => validate_cron_convenience_fields(env)?,
    };
    let run_at_startup = parse_run_at_startup(env);

    info!("调度设置: {}，启动时执行: {}", schedule.describe(), run_at_startup);
    Ok(Some(CronSettings {
        schedule,
        run_at_startup,
    }))
}

/// 逐条校验逗号分隔的表达式，报告全部非法项
pub(crate) fn validate_cron_expressions(raw: &str) -> HostResult<Vec<String>> {
    let mut expressions = Vec::new();
    let mut issues = Vec::new();

    for entry in raw.split(',').map(str::trim) {
        match CronScheduler::validate_cron_expression(entry) {
            Ok(()) => expressions.push(entry.to_string()),
            Err(e) => {
                error!("CRON_EXPRESSIONS 中的表达式 {:?} 无效: {}", entry, e);
                issues.push(ValidationIssue::new(
                    env_keys::CRON_EXPRESSIONS,
                    Some(entry),
                    "合法的crontab表达式",
                ));
            }
        }
    }

    if !issues.is_empty() {
        return Err(HostError::Validation(issues));
    }

    info!("使用 CRON_EXPRESSIONS: {:?}", expressions);
    Ok(expressions)
}

pub(crate) fn validate_cron_convenience_fields(env: &dyn EnvSource) -> HostResult<CronSchedule> {
    let amount = validate_cron_time_amount(env)?;
    let unit = validate_cron_time_unit(env)?;
    validate_cron_interval(amount, unit)?;
    let run_at = validate_cron_run_at(env, unit)?;
    Ok(CronSchedule::Interval {
        amount,
        unit,
        run_at,
    })
}

pub(crate) fn validate_cron_time_amount(env: &dyn EnvSource) -> HostResult<f64> {
    const EXPECTED: &str = "大于0的数字";

    let raw = env.get_env_var(env_keys::CRON_TIME_AMOUNT);
    let Some(value) = raw.as_deref() else {
        return Err(invalid(env_keys::CRON_TIME_AMOUNT, None, EXPECTED));
    };

    match value.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(invalid(env_keys::CRON_TIME_AMOUNT, Some(value), EXPECTED)),
    }
}

/// 换算后的间隔须至少1纳秒且不超过 `MAX_INTERVAL_SECONDS`
pub(crate) fn validate_cron_interval(amount: f64, unit: TimeUnit) -> HostResult<()> {
    if unit.duration_of(amount).is_some() {
        return Ok(());
    }
    Err(invalid(
        env_keys::CRON_TIME_AMOUNT,
        Some(amount.to_string().as_str()),
        &format!(
            "以 {unit} 为单位时换算后介于1纳秒与 {} 秒之间",
            values::MAX_INTERVAL_SECONDS
        ),
    ))
}

pub(crate) fn validate_cron_time_unit(env: &dyn EnvSource) -> HostResult<TimeUnit> {
    let raw = env.get_env_var(env_keys::CRON_TIME_UNIT);
    raw.as_deref().and_then(TimeUnit::parse).ok_or_else(|| {
        invalid(
            env_keys::CRON_TIME_UNIT,
            raw.as_deref(),
            &format!("{:?} 之一", values::SUPPORTED_TIME_UNITS),
        )
    })
}

/// `CRON_RUN_AT` 只允许与天为单位一起使用，格式为 `HH:MM` 或 `HH:MM:SS`
pub(crate) fn validate_cron_run_at(
    env: &dyn EnvSource,
    unit: TimeUnit,
) -> HostResult<Option<NaiveTime>> {
    let Some(raw) = non_empty(env, env_keys::CRON_RUN_AT) else {
        return Ok(None);
    };

    if unit != TimeUnit::Days {
        return Err(invalid(
            env_keys::CRON_RUN_AT,
            Some(raw.as_str()),
            &format!("仅在 CRON_TIME_UNIT 为 days 时设置，当前单位为 {unit}"),
        ));
    }

    parse_time_of_day(raw.trim())
        .map(Some)
        .ok_or_else(|| invalid(env_keys::CRON_RUN_AT, Some(raw.as_str()), "HH:MM 或 HH:MM:SS"))
}

fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// 仅当取值忽略大小写等于 `true` 时启用
pub(crate) fn parse_run_at_startup(env: &dyn EnvSource) -> bool {
    env.get_env_var(env_keys::RUN_AT_STARTUP)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

pub(crate) fn setup_messaging_params(
    env: &dyn EnvSource,
    messaging_type: MessagingType,
) -> HostResult<(MessagingParams, usize)> {
    match messaging_type {
        MessagingType::RabbitMq => setup_rabbitmq_params(env),
        MessagingType::Sqs => Ok((setup_sqs_params(env), values::DEFAULT_NUM_THREADS)),
        MessagingType::None => Ok((MessagingParams::None, values::DEFAULT_NUM_THREADS)),
    }
}

pub(crate) fn setup_rabbitmq_params(env: &dyn EnvSource) -> HostResult<(MessagingParams, usize)> {
    let host = non_empty(env, env_keys::RABBITMQ_HOST)
        .ok_or_else(|| invalid(env_keys::RABBITMQ_HOST, None, "RabbitMQ主机地址"))?;

    let raw_port = env.get_env_var(env_keys::RABBITMQ_PORT);
    let port = match raw_port.as_deref() {
        None => {
            return Err(HostError::parse_error(
                env_keys::RABBITMQ_PORT,
                None,
                "缺少端口号",
            ))
        }
        Some(value) => value.trim().parse::<u16>().map_err(|e| {
            HostError::parse_error(env_keys::RABBITMQ_PORT, Some(value), e.to_string())
        })?,
    };

    let num_threads = match non_empty(env, env_keys::RABBITMQ_NUM_THREADS) {
        None => values::DEFAULT_NUM_THREADS,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => n as usize,
            _ => {
                return Err(invalid(
                    env_keys::RABBITMQ_NUM_THREADS,
                    Some(raw.as_str()),
                    "正整数",
                ))
            }
        },
    };

    let params = MessagingParams::RabbitMq {
        host,
        port,
        user: env.get_env_var(env_keys::RABBITMQ_USER),
        password: env.get_env_var(env_keys::RABBITMQ_PASSWORD),
        virtual_host: env.get_env_var(env_keys::RABBITMQ_VIRTUAL_HOST),
        consume_config_path: consume_config_path(env),
    };
    debug!("RabbitMQ连接参数: {:?}，消费者数量: {}", params, num_threads);
    Ok((params, num_threads))
}

/// `AWS_ACCESS_KEY_SECRET` 优先于 `AWS_SECRET_ACCESS_KEY`
pub(crate) fn setup_sqs_params(env: &dyn EnvSource) -> MessagingParams {
    let params = MessagingParams::Sqs {
        access_key_id: env.get_env_var(env_keys::AWS_ACCESS_KEY_ID),
        secret_access_key: non_empty(env, env_keys::AWS_ACCESS_KEY_SECRET)
            .or_else(|| env.get_env_var(env_keys::AWS_SECRET_ACCESS_KEY)),
        region: env.get_env_var(env_keys::AWS_REGION),
        consume_config_path: consume_config_path(env),
    };
    debug!("SQS连接参数: {:?}", params);
    params
}

fn consume_config_path(env: &dyn EnvSource) -> Option<PathBuf> {
    non_empty(env, env_keys::CONSUME_CONFIG_FILE_PATH).map(PathBuf::from)
}
