//! 调度引擎与分发状态机：按配置选择消息消费或定时调度并驱动处理器。

pub mod dispatcher;
pub mod engine;
pub mod trigger;

pub use dispatcher::{DispatchMode, Dispatcher};
pub use engine::{build_triggers, JobId, JobStatus, Scheduler, DEFAULT_POLL_INTERVAL};
pub use trigger::{
    Clock, CronTrigger, DailyAtTrigger, IntervalTrigger, ManualClock, SystemClock, Trigger,
};
