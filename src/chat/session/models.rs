//! 会话与消息的本地模型定义
//!
//! 记录以 JSON 文档形态持久化，字段名保持线上数据的原始拼写
//! （camelCase 以及历史遗留的 `dlm_message_type`）。
//! 早期 schema 把消息内容存成纯字符串，读取时由 DAO 调用
//! [`normalize_session`] 一次性升级成当前形态，旧形态不会越过 DAO 边界。

use crate::chat::serialization::{deserialize_base64, serialize_base64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 新会话的占位标题，累计到足够的对话后由服务层替换为生成的主题
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// 消息类别：普通内容、捕获到的失败、仅指令用的内部消息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Chat,
    Error,
    System,
}

/// 图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

/// 文档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Csv,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Html,
    Txt,
    Md,
}

/// 一条消息里的一个内容块
///
/// `type` 标签决定哪个载荷字段被填充，每个块恰好一种载荷。
/// 一条消息可以捆绑多个异构内容块（文档 + 图片 + 文字一起发送）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        format: ImageFormat,
        #[serde(
            serialize_with = "serialize_base64",
            deserialize_with = "deserialize_base64"
        )]
        source: Vec<u8>,
    },
    #[serde(rename = "document")]
    Document {
        format: DocumentFormat,
        name: String,
        /// 上传时声明的字节数
        #[serde(default)]
        size: u64,
        #[serde(
            serialize_with = "serialize_base64",
            deserialize_with = "deserialize_base64"
        )]
        source: Vec<u8>,
    },
    #[serde(rename = "video")]
    Video {
        format: String,
        #[serde(
            serialize_with = "serialize_base64",
            deserialize_with = "deserialize_base64"
        )]
        source: Vec<u8>,
    },
    #[serde(rename = "toolUse")]
    ToolUse {
        #[serde(rename = "toolUseId")]
        tool_use_id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "toolResult")]
    ToolResult {
        #[serde(rename = "toolUseId")]
        tool_use_id: String,
        content: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    #[serde(rename = "guardContent")]
    GuardContent { text: String },
}

impl ContentBlock {
    /// 纯文本内容块
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// 一条对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 消息 ID，全局唯一，跨会话不复用
    pub id: String,
    /// 角色
    pub role: MessageRole,
    /// 消息类别
    #[serde(rename = "dlm_message_type", default)]
    pub message_type: MessageType,
    /// 内容块序列，顺序即展示顺序
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// 创建时间（Unix 毫秒）
    pub timestamp: i64,
    /// 流式接收中标记：与远端模型的交互完成或失败后为 false
    #[serde(rename = "isStreaming", default)]
    pub is_streaming: bool,
    /// 旧版字符串内容，仅为兼容读取保留
    #[serde(rename = "legacy_content", default, skip_serializing_if = "Option::is_none")]
    pub legacy_content: Option<String>,
    /// 旧版内容类型，仅为兼容读取保留
    #[serde(
        rename = "legacy_content_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_content_type: Option<String>,
}

impl ChatMessage {
    /// 新建一条消息，ID 与时间戳在创建时分配
    pub fn new(role: MessageRole, message_type: MessageType, content: Vec<ContentBlock>) -> Self {
        Self {
            id: crate::chat::serialization::generate_msg_id(),
            role,
            message_type,
            content,
            timestamp: Utc::now().timestamp_millis(),
            is_streaming: false,
            legacy_content: None,
            legacy_content_type: None,
        }
    }

    /// 用户消息
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self::new(MessageRole::User, MessageType::Chat, content)
    }

    /// 助手文本回复
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Chat,
            vec![ContentBlock::text(text)],
        )
    }

    /// 捕获到的失败，作为 error 类别消息记入对话
    pub fn error_text(text: impl Into<String>) -> Self {
        Self::new(
            MessageRole::Assistant,
            MessageType::Error,
            vec![ContentBlock::text(text)],
        )
    }

    /// 第一个文本块的内容，用于预览和标题生成
    pub fn text_snippet(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// 一个会话线程
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// 主键，创建时按创建时间毫秒数分配
    pub id: i64,
    /// 展示标题
    pub title: String,
    /// 最近一条消息的摘要，用于列表展示
    #[serde(default)]
    pub preview: String,
    /// 消息序列，只追加，顺序即对话顺序
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// 软删除标记，记录永不物理删除
    #[serde(default)]
    pub deleted: bool,
    /// 临时会话标记：首条消息发送之前不落盘
    #[serde(rename = "isTemporary", default)]
    pub is_temporary: bool,
}

impl ChatSession {
    /// 新建临时会话：尚未持久化，首条消息发出时才第一次写库
    pub fn new_temporary() -> Self {
        Self {
            id: Utc::now().timestamp_millis(),
            title: PLACEHOLDER_TITLE.to_string(),
            preview: String::new(),
            messages: Vec::new(),
            deleted: false,
            is_temporary: true,
        }
    }

    /// 追加一条消息并刷新预览
    pub fn push_message(&mut self, message: ChatMessage) {
        self.preview = message
            .text_snippet()
            .map(|t| truncate_chars(t, 60))
            .unwrap_or_default();
        self.messages.push(message);
    }

    /// 第一条用户消息的文本，用于生成标题
    pub fn first_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .and_then(|m| m.text_snippet())
    }
}

/// 按字符数截断（预览与标题都不应截断在 UTF-8 边界中间）
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ========== 旧形态读取升级 ==========

/// 把一条旧形态的会话记录原地升级为当前形态
///
/// 早期 schema 的消息形如
/// `{id: 数字, content: 字符串, content_type?, sent: 布尔, timestamp: RFC3339 字符串}`。
/// 升级在读取时发生一次，调用方永远只看到当前形态。
pub(crate) fn normalize_session(record: &mut Value) {
    let Some(messages) = record.get_mut("messages").and_then(Value::as_array_mut) else {
        return;
    };
    for message in messages {
        normalize_message(message);
    }
}

fn normalize_message(message: &mut Value) {
    let Some(obj) = message.as_object_mut() else {
        return;
    };

    // 数字 ID → 字符串 ID
    if let Some(id) = obj.get("id").and_then(Value::as_i64) {
        obj.insert("id".to_string(), Value::from(id.to_string()));
    }

    // sent 布尔 → role
    if !obj.contains_key("role") {
        let sent = obj.get("sent").and_then(Value::as_bool).unwrap_or(true);
        let role = if sent { "user" } else { "assistant" };
        obj.insert("role".to_string(), Value::from(role));
    }
    obj.remove("sent");

    // 字符串内容 → 单个文本块，原文保留在 legacy 字段里
    if let Some(text) = obj.get("content").and_then(Value::as_str).map(String::from) {
        obj.insert("legacy_content".to_string(), Value::from(text.clone()));
        if let Some(ct) = obj.remove("content_type") {
            obj.insert("legacy_content_type".to_string(), ct);
        }
        obj.insert(
            "content".to_string(),
            serde_json::json!([{ "type": "text", "text": text }]),
        );
    }

    // RFC3339 时间戳字符串 → Unix 毫秒，无法解析时取 0
    if let Some(ts) = obj.get("timestamp").and_then(Value::as_str) {
        let millis = DateTime::parse_from_rfc3339(ts)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0);
        obj.insert("timestamp".to_string(), Value::from(millis));
    }

    if !obj.contains_key("dlm_message_type") {
        obj.insert("dlm_message_type".to_string(), Value::from("chat"));
    }
}
