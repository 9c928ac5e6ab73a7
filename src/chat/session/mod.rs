//! 会话模块
//!
//! 会话/消息模型、数据访问层和生命周期服务

pub mod dao;
pub mod models;
pub mod service;

// 重新导出主要类型
pub use dao::SessionDao;
pub use models::{
    ChatMessage, ChatSession, ContentBlock, DocumentFormat, ImageFormat, MessageRole, MessageType,
};
pub use service::ChatService;
