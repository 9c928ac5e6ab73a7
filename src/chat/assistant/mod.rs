//! 助手模块

pub mod dao;
pub mod models;

pub use dao::AssistantDao;
pub use models::Assistant;
