//! 配置模块

pub mod dao;
pub mod models;

pub use dao::ConfigDao;
pub use models::{Config, CONFIG_KEY};
