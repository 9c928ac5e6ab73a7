//! 推理服务模块
//!
//! 远端对话推理 API 的请求/响应形状和 HTTP 客户端

pub mod api;
pub mod types;

pub use api::{BedrockClient, ConverseModel};
pub use types::{ConverseMessage, ConverseRequest, ConverseResponse, InferenceConfig};
