pub mod host_config;
pub mod messaging;
pub mod schedule;

pub use host_config::*;
pub use messaging::*;
pub use schedule::*;
