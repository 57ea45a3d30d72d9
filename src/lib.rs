pub mod config;
pub mod gateway;
pub mod ipc;
pub mod stats;
pub mod validate;
