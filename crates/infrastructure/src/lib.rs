//! 消息队列适配器实现：RabbitMQ（lapin）、进程内内存队列，以及按类型创建适配器的工厂。

pub mod consume_config;
pub mod in_memory_adapter;
pub mod message_adapter_factory;
pub mod rabbitmq_adapter;

pub use consume_config::ConsumeConfig;
pub use in_memory_adapter::InMemoryMessageAdapter;
pub use message_adapter_factory::{AdapterConstructor, MessageAdapterFactory};
pub use rabbitmq_adapter::{RabbitMqMessageAdapter, RabbitMqSettings};
