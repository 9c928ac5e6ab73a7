pub mod chat;

// 重新导出常用类型和函数，方便外部使用
pub use chat::{
    assistant::Assistant,
    client::ChatClient,
    config::Config,
    converse::{BedrockClient, ConverseModel},
    error::{StorageError, StorageResult},
    session::{ChatMessage, ChatService, ChatSession, ContentBlock},
    workflow::Workflow,
};
