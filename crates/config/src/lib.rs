//! 宿主配置：从环境变量（可叠加宿主配置文件）构建并校验 [`Config`]。

pub mod constants;
pub mod env;
pub mod host_file;
pub mod models;
pub mod validation;

pub use env::{EnvSource, LayeredEnv, ProcessEnv};
pub use host_file::HostFileEnv;
pub use models::{
    Config, CronSchedule, ExecutionMode, MessagingParams, MessagingType, TimeUnit,
};

#[cfg(test)]
mod tests;
