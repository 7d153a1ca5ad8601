use chrono::{DateTime, Duration, Utc};
use cron::Schedule;
use std::str::FromStr;

use svchost_errors::{HostError, HostResult};

/// CRON表达式解析和调度工具
///
/// 同时接受5字段的crontab格式（分 时 日 月 周）和 `cron` crate 原生的
/// 6/7字段格式（带秒，可选年）。5字段表达式会先经过 [`normalize_expression`]
/// 转换。
#[derive(Debug, Clone)]
pub struct CronScheduler {
    expression: String,
    schedule: Schedule,
}

impl CronScheduler {
    /// 创建新的CRON调度器
    pub fn new(cron_expr: &str) -> HostResult<Self> {
        let normalized = normalize_expression(cron_expr);
        let schedule = Schedule::from_str(&normalized).map_err(|e| HostError::InvalidCron {
            expr: cron_expr.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            expression: cron_expr.trim().to_string(),
            schedule,
        })
    }

    /// 原始表达式（去除首尾空白）
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 获取下一次执行时间（严格晚于 `from`）
    pub fn next_execution_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }

    /// 获取从指定时间开始的多个执行时间
    pub fn upcoming_times(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.after(&from).take(count).collect()
    }

    /// 计算下次执行时间距离现在的时长
    pub fn time_until_next_execution(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_execution_time(now).map(|next| next - now)
    }

    /// 验证CRON表达式是否有效
    pub fn validate_cron_expression(cron_expr: &str) -> HostResult<()> {
        Self::new(cron_expr).map(|_| ())
    }
}

/// 把5字段crontab表达式转换为 `cron` crate 的6字段格式
///
/// 秒字段固定补 `0`；星期字段从crontab的 0-7（0和7都是周日）映射到
/// `cron` crate 的 1-7（1是周日）。其他字段数量的表达式只做空白规整。
pub fn normalize_expression(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return fields.join(" ");
    }

    format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        convert_day_of_week(fields[4])
    )
}

fn convert_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(convert_day_of_week_item)
        .collect::<Vec<_>>()
        .join(",")
}

fn convert_day_of_week_item(item: &str) -> String {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };
    let with_step = |converted: String| match step {
        Some(step) => format!("{converted}/{step}"),
        None => converted,
    };

    if let Some((start, end)) = base.split_once('-') {
        match (start.parse::<u8>(), end.parse::<u8>()) {
            (Ok(start), Ok(7)) if start > 0 && start <= 7 && step.is_none() => {
                // 周日在crontab中为7，在cron crate中为1，需要拆成两段
                format!("{}-7,1", start + 1)
            }
            (Ok(start), Ok(end)) if start <= 7 && end <= 7 => with_step(format!(
                "{}-{}",
                crontab_day_to_cron(start),
                if end == 7 { 7 } else { end + 1 }
            )),
            _ => item.to_string(),
        }
    } else {
        match base.parse::<u8>() {
            Ok(day) if day <= 7 => with_step(crontab_day_to_cron(day).to_string()),
            _ => item.to_string(),
        }
    }
}

fn crontab_day_to_cron(day: u8) -> u8 {
    match day {
        0 | 7 => 1,
        day => day + 1,
    }
}
