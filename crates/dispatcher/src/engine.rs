use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use svchost_config::CronSchedule;
use svchost_core::ServiceProcessor;
use svchost_errors::{HostError, HostResult};

use crate::trigger::{Clock, CronTrigger, DailyAtTrigger, IntervalTrigger, SystemClock, Trigger};

/// 轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub type JobId = usize;

struct ScheduledJob {
    id: JobId,
    trigger: Box<dyn Trigger>,
    next_run: Option<DateTime<Utc>>,
    enabled: bool,
    runs: u64,
}

/// 单个任务的只读视图
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub id: JobId,
    pub description: String,
    pub next_run: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub runs: u64,
}

/// 单处理器调度器
///
/// 每个任务由一个触发器驱动，到期时调用处理器的 `process()`。
/// 任务串行执行；任务结束后按时钟的当前时间重新计算下一次触发，
/// 因此同一任务不会重叠执行，耗时过长只会推迟它自己的下一次触发。
pub struct Scheduler {
    processor: Arc<dyn ServiceProcessor>,
    jobs: Vec<ScheduledJob>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(processor: Arc<dyn ServiceProcessor>) -> Self {
        Self {
            processor,
            jobs: Vec::new(),
            clock: Arc::new(SystemClock),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.arm();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// 按调度定义创建任务：每个表达式一个任务，间隔调度一个任务
    pub fn from_schedule(
        processor: Arc<dyn ServiceProcessor>,
        schedule: &CronSchedule,
    ) -> HostResult<Self> {
        let mut scheduler = Self::new(processor);
        for trigger in build_triggers(schedule)? {
            scheduler.add_job(trigger);
        }
        Ok(scheduler)
    }

    /// 添加任务并立即按当前时间计算首次触发
    pub fn add_job(&mut self, trigger: Box<dyn Trigger>) -> JobId {
        let id = self.jobs.len();
        let next_run = trigger.next_fire_after(self.clock.now());
        debug!("添加调度任务 {}: {}，首次触发: {:?}", id, trigger.describe(), next_run);
        self.jobs.push(ScheduledJob {
            id,
            trigger,
            next_run,
            enabled: true,
            runs: 0,
        });
        id
    }

    /// 以当前时间重新计算所有任务的下一次触发
    pub fn arm(&mut self) {
        let now = self.clock.now();
        for job in &mut self.jobs {
            job.next_run = job.trigger.next_fire_after(now);
        }
    }

    /// 只影响指定任务
    pub fn set_enabled(&mut self, job: JobId, enabled: bool) -> HostResult<()> {
        let job = self
            .jobs
            .get_mut(job)
            .ok_or_else(|| HostError::Internal(format!("调度任务 {job} 不存在")))?;
        job.enabled = enabled;
        info!("调度任务 {} 已{}", job.id, if enabled { "启用" } else { "停用" });
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn job_status(&self, job: JobId) -> Option<JobStatus> {
        self.jobs.get(job).map(|job| JobStatus {
            id: job.id,
            description: job.trigger.describe(),
            next_run: job.next_run,
            enabled: job.enabled,
            runs: job.runs,
        })
    }

    /// 最近一次待触发时间（仅统计启用的任务）
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.jobs
            .iter()
            .filter(|job| job.enabled)
            .filter_map(|job| job.next_run)
            .min()
    }

    /// 启动前执行一次处理器，然后重新计算触发时间
    pub async fn run_at_startup(&mut self) -> HostResult<()> {
        info!("RUN_AT_STARTUP 已启用，启动时执行一次处理器");
        self.processor.process().await?;
        self.arm();
        Ok(())
    }

    /// 依次执行所有到期且启用的任务，返回执行数量
    ///
    /// 处理器返回错误时立即停止并向上传递。
    pub async fn run_pending(&mut self) -> HostResult<usize> {
        let now = self.clock.now();
        let mut due: Vec<(DateTime<Utc>, JobId)> = self
            .jobs
            .iter()
            .filter(|job| job.enabled)
            .filter_map(|job| job.next_run.filter(|next| *next <= now).map(|next| (next, job.id)))
            .collect();
        due.sort();

        for (_, id) in &due {
            let description = self.jobs[*id].trigger.describe();
            debug!("执行调度任务 {} ({})", id, description);

            if let Err(e) = self.processor.process().await {
                error!("调度任务 {} ({}) 执行失败: {}", id, description, e);
                return Err(e);
            }

            let finished_at = self.clock.now();
            let job = &mut self.jobs[*id];
            job.runs += 1;
            job.next_run = job.trigger.next_fire_after(finished_at);
            if job.next_run.is_none() {
                warn!("调度任务 {} ({}) 没有后续触发时间", id, description);
            }
        }

        Ok(due.len())
    }

    /// 轮询执行到期任务，直到收到关闭信号或处理器出错
    ///
    /// 没有任何启用的任务还有后续触发时间时，以内部错误结束，不会空转。
    pub async fn run_until_shutdown(
        &mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> HostResult<()> {
        info!(
            "调度器启动，共 {} 个任务，轮询间隔 {:?}",
            self.jobs.len(),
            self.poll_interval
        );
        for job in &self.jobs {
            info!("  任务 {}: {}，下一次触发: {:?}", job.id, job.trigger.describe(), job.next_run);
        }

        loop {
            self.run_pending().await?;
            if self.next_due().is_none() {
                error!("没有任何调度任务还有后续触发时间，调度器退出");
                return Err(HostError::Internal("没有可触发的调度任务".to_string()));
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.recv() => {
                    info!("调度器收到关闭信号，停止调度");
                    return Ok(());
                }
            }
        }
    }
}

/// 把调度定义转换为触发器列表，表达式保持原有顺序
pub fn build_triggers(schedule: &CronSchedule) -> HostResult<Vec<Box<dyn Trigger>>> {
    match schedule {
        CronSchedule::Expressions(expressions) => expressions
            .iter()
            .map(|expression| {
                CronTrigger::new(expression).map(|trigger| Box::new(trigger) as Box<dyn Trigger>)
            })
            .collect(),
        CronSchedule::Interval {
            amount,
            unit,
            run_at: Some(run_at),
        } => {
            if *unit != svchost_config::TimeUnit::Days {
                return Err(HostError::config_error(format!(
                    "固定时刻触发只支持以天为单位，实际单位为 {unit}"
                )));
            }
            Ok(vec![Box::new(DailyAtTrigger::new(*amount, *run_at)?)])
        }
        CronSchedule::Interval {
            amount,
            unit,
            run_at: None,
        } => Ok(vec![Box::new(IntervalTrigger::new(*amount, *unit)?)]),
    }
}
