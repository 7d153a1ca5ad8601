pub mod app;
pub mod processors;
pub mod shutdown;
