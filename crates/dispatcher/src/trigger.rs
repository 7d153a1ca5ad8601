//! 触发器：根据上一次执行结束的时间计算下一次触发时间
//!
//! 所有时间均为UTC。

use std::sync::Mutex;

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};

use svchost_config::TimeUnit;
use svchost_core::CronScheduler;
use svchost_errors::{HostError, HostResult};

/// 时间来源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟，用于确定性地驱动调度器
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub trait Trigger: Send + Sync {
    /// `after` 之后的下一次触发时间，没有后续触发时返回 `None`
    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;

    fn describe(&self) -> String;
}

fn period_of(amount: f64, unit: TimeUnit) -> HostResult<Duration> {
    let period = unit.duration_of(amount).ok_or_else(|| {
        HostError::config_error(format!("调度间隔 {amount} {unit} 必须为正数且在可表示范围内"))
    })?;
    Duration::from_std(period)
        .map_err(|e| HostError::config_error(format!("调度间隔 {amount} {unit} 超出范围: {e}")))
}

/// 固定间隔触发，从上一次执行结束开始计时
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    amount: f64,
    unit: TimeUnit,
    period: Duration,
}

impl IntervalTrigger {
    pub fn new(amount: f64, unit: TimeUnit) -> HostResult<Self> {
        Ok(Self {
            amount,
            unit,
            period: period_of(amount, unit)?,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Trigger for IntervalTrigger {
    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        after.checked_add_signed(self.period)
    }

    fn describe(&self) -> String {
        format!("every {} {}", self.amount, self.unit)
    }
}

/// 以天为单位、固定在某个时刻触发
///
/// 间隔为1天时，若今天的 `run_at` 尚未到达则今天触发，否则明天；
/// 其他间隔则取 `after + amount天` 当天的 `run_at`，该时刻不晚于 `after` 时顺延一天。
#[derive(Debug, Clone)]
pub struct DailyAtTrigger {
    amount: f64,
    run_at: NaiveTime,
    period: Duration,
}

impl DailyAtTrigger {
    pub fn new(amount: f64, run_at: NaiveTime) -> HostResult<Self> {
        Ok(Self {
            amount,
            run_at,
            period: period_of(amount, TimeUnit::Days)?,
        })
    }

    pub fn run_at(&self) -> NaiveTime {
        self.run_at
    }
}

impl Trigger for DailyAtTrigger {
    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.amount == 1.0 {
            let date = if self.run_at > after.time() {
                after.date_naive()
            } else {
                after.date_naive().checked_add_days(Days::new(1))?
            };
            return Some(date.and_time(self.run_at).and_utc());
        }

        let target = after.checked_add_signed(self.period)?;
        let pinned = target.date_naive().and_time(self.run_at).and_utc();
        if pinned > after {
            Some(pinned)
        } else {
            pinned.checked_add_days(Days::new(1))
        }
    }

    fn describe(&self) -> String {
        format!("every {} days at {}", self.amount, self.run_at)
    }
}

/// crontab表达式触发
#[derive(Debug, Clone)]
pub struct CronTrigger {
    scheduler: CronScheduler,
}

impl CronTrigger {
    pub fn new(expression: &str) -> HostResult<Self> {
        Ok(Self {
            scheduler: CronScheduler::new(expression)?,
        })
    }
}

impl Trigger for CronTrigger {
    fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.scheduler.next_execution_time(after)
    }

    fn describe(&self) -> String {
        format!("cron '{}'", self.scheduler.expression())
    }
}
