pub mod message_adapter;
pub mod processor;

pub use message_adapter::*;
pub use processor::*;
