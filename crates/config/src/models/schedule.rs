use std::fmt;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::constants::values;

/// 执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// 从消息队列消费
    #[default]
    Message,
    /// 按时间触发
    Cron,
}

impl ExecutionMode {
    /// 只有 `CRON` 表示定时模式，其余取值（包括缺失）均为消息模式
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(values::EXECUTION_TYPE_CRON) => Self::Cron,
            _ => Self::Message,
        }
    }

    pub fn is_cron(&self) -> bool {
        matches!(self, Self::Cron)
    }
}

/// 间隔调度的时间单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    /// 大小写不敏感地解析时间单位
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "seconds" => Some(Self::Seconds),
            "minutes" => Some(Self::Minutes),
            "hours" => Some(Self::Hours),
            "days" => Some(Self::Days),
            "weeks" => Some(Self::Weeks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => values::SUPPORTED_TIME_UNITS[0],
            Self::Minutes => values::SUPPORTED_TIME_UNITS[1],
            Self::Hours => values::SUPPORTED_TIME_UNITS[2],
            Self::Days => values::SUPPORTED_TIME_UNITS[3],
            Self::Weeks => values::SUPPORTED_TIME_UNITS[4],
        }
    }

    pub fn seconds_per_unit(&self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
            Self::Weeks => 7 * 24 * 60 * 60,
        }
    }

    /// `amount` 个单位对应的时长
    ///
    /// 非正数、非有限值、换算后为零或超过 `MAX_INTERVAL_SECONDS` 时返回 `None`。
    pub fn duration_of(&self, amount: f64) -> Option<Duration> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        let period = Duration::try_from_secs_f64(amount * self.seconds_per_unit() as f64).ok()?;
        if period.is_zero() || period > Duration::from_secs(values::MAX_INTERVAL_SECONDS) {
            return None;
        }
        Some(period)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 定时调度定义
///
/// 设置了 `CRON_EXPRESSIONS` 时总是使用表达式，便捷字段被忽略。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CronSchedule {
    /// 规范化后的表达式列表，保持原始顺序
    Expressions(Vec<String>),
    Interval {
        amount: f64,
        unit: TimeUnit,
        /// 每日固定时刻（UTC），仅在单位为天时出现
        run_at: Option<NaiveTime>,
    },
}

impl CronSchedule {
    pub fn describe(&self) -> String {
        match self {
            Self::Expressions(expressions) => format!("cron [{}]", expressions.join(", ")),
            Self::Interval {
                amount,
                unit,
                run_at: Some(run_at),
            } => format!("every {amount} {unit} at {run_at}"),
            Self::Interval { amount, unit, .. } => format!("every {amount} {unit}"),
        }
    }
}
