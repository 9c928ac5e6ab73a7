//! 推理服务的请求/响应结构
//!
//! 只覆盖本 SDK 交给远端的数据形状：带角色的内容块序列加推理参数进去，
//! 完整文本或增量文本片段出来。线上协议的其余部分不在范围内。

use crate::chat::session::models::{ContentBlock, MessageRole};
use serde::{Deserialize, Serialize};

/// 推理参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(rename = "topP")]
    pub top_p: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 1.0,
        }
    }
}

/// 交给远端的一条消息：角色 + 内容块序列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseMessage {
    pub role: MessageRole,
    pub content: Vec<ContentBlock>,
}

/// 对话推理请求
#[derive(Debug, Clone, Serialize)]
pub struct ConverseRequest {
    #[serde(rename = "modelId")]
    pub model_id: String,
    pub messages: Vec<ConverseMessage>,
    #[serde(rename = "inferenceConfig")]
    pub inference_config: InferenceConfig,
}

/// token 用量
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUsage {
    #[serde(rename = "inputTokens", default)]
    pub input_tokens: u32,
    #[serde(rename = "outputTokens", default)]
    pub output_tokens: u32,
}

/// 对话推理响应（完整回复）
#[derive(Debug, Deserialize)]
pub struct ConverseResponse {
    #[serde(default)]
    pub output: Option<ConverseOutput>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ConverseOutput {
    #[serde(default)]
    pub message: Option<OutputMessage>,
}

#[derive(Debug, Deserialize)]
pub struct OutputMessage {
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
pub struct OutputContent {
    #[serde(default)]
    pub text: Option<String>,
}

impl ConverseResponse {
    /// 取出第一个文本块；响应形状不对时返回 None
    pub fn first_text(self) -> Option<String> {
        self.output?
            .message?
            .content
            .into_iter()
            .find_map(|block| block.text)
    }
}

/// 流式响应的一个事件行：文本增量或结束标记
#[derive(Debug, Deserialize)]
pub struct StreamEvent {
    /// 文本增量
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    /// 结束标记，出现后不再有增量
    #[serde(rename = "messageStop", default)]
    pub message_stop: bool,
}

#[derive(Debug, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub text: Option<String>,
}
