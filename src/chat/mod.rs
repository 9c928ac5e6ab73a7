pub mod assistant;
pub mod client;
pub mod config;
pub mod converse;
pub mod db;
pub mod error;
pub mod schema;
pub mod serialization;
pub mod session;
pub mod workflow;

pub(crate) mod migration;
pub(crate) mod store;

// 重新导出存储层的核心类型
pub use client::ChatClient;
pub use error::{StorageError, StorageResult};
