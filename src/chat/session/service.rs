//! 会话生命周期服务层
//!
//! 会话状态机：临时（未落盘）→ 活跃（随首条消息一起首次写库）→ 软删除
//! （永久保留）。软删除之后没有出路。
//!
//! 所有变更先写库确认再返回：写失败时返回错误，调用方应丢弃手里的
//! 内存副本，已持久化的值保持权威。

use crate::chat::converse::api::ConverseModel;
use crate::chat::converse::types::{ConverseMessage, InferenceConfig};
use crate::chat::error::StorageResult;
use crate::chat::session::dao::SessionDao;
use crate::chat::session::models::{
    truncate_chars, ChatMessage, ChatSession, ContentBlock, MessageType, PLACEHOLDER_TITLE,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// 标题在会话累计到这个消息数之后才从占位符替换为生成的主题
const TITLE_AFTER_MESSAGES: usize = 2;
/// 生成标题的最大字符数
const TITLE_MAX_CHARS: usize = 30;

/// 会话服务
pub struct ChatService {
    dao: SessionDao,
    model: Arc<dyn ConverseModel>,
}

impl ChatService {
    /// 创建新的会话服务
    pub fn new(dao: SessionDao, model: Arc<dyn ConverseModel>) -> Self {
        Self { dao, model }
    }

    /// 新建临时会话：不落盘，防止"点了新会话又没发消息"撑大存储
    pub fn new_session(&self) -> ChatSession {
        ChatSession::new_temporary()
    }

    /// 发送一条用户消息
    ///
    /// 追加用户消息并持久化（临时会话在这里随首条消息完成首次落盘），
    /// 然后调用远端模型；模型失败会作为 error 类别消息记入对话，
    /// 不算本次调用失败。只有写库失败才返回错误。
    pub async fn send_message(
        &self,
        session: &mut ChatSession,
        content: Vec<ContentBlock>,
    ) -> Result<()> {
        session.push_message(ChatMessage::user(content));
        // 临时 → 活跃：与首条消息的写入原子地发生
        session.is_temporary = false;
        self.dao.update_session(session).await?;

        match self
            .model
            .converse(outbound_messages(session), InferenceConfig::default())
            .await
        {
            Ok(reply) => {
                session.push_message(ChatMessage::assistant_text(reply));
            }
            Err(e) => {
                warn!("[ChatSvc] 模型调用失败，记入对话: {}", e);
                session.push_message(ChatMessage::error_text(e.to_string()));
            }
        }

        maybe_generate_title(session);
        self.dao.update_session(session).await?;
        info!(
            "[ChatSvc] 会话 {} 现有 {} 条消息",
            session.id,
            session.messages.len()
        );
        Ok(())
    }

    /// 软删除：记录永不物理删除，此后不再出现在任何列表视图里
    pub async fn delete_session(&self, session: &mut ChatSession) -> StorageResult<()> {
        session.deleted = true;
        self.dao.update_session(session).await
    }

    /// 活跃会话列表（删除或重载后的默认选择来源），新的在前
    pub async fn active_sessions(&self) -> StorageResult<Vec<ChatSession>> {
        let mut sessions = self.dao.get_all_sessions().await?;
        sessions.retain(|s| !s.deleted);
        sessions.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(sessions)
    }
}

/// 组装交给模型的消息：捕获到的失败（error 类别）不回放给模型
fn outbound_messages(session: &ChatSession) -> Vec<ConverseMessage> {
    session
        .messages
        .iter()
        .filter(|m| m.message_type != MessageType::Error)
        .map(|m| ConverseMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}

/// 累计到足够的对话后，用第一条用户消息的文本替换占位标题
fn maybe_generate_title(session: &mut ChatSession) {
    if session.title != PLACEHOLDER_TITLE || session.messages.len() < TITLE_AFTER_MESSAGES {
        return;
    }
    if let Some(text) = session.first_user_text() {
        session.title = truncate_chars(text, TITLE_MAX_CHARS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::db;
    use async_trait::async_trait;

    struct EchoModel;

    #[async_trait]
    impl ConverseModel for EchoModel {
        async fn converse(
            &self,
            messages: Vec<ConverseMessage>,
            _inference_config: InferenceConfig,
        ) -> Result<String> {
            let last = messages.last().and_then(|m| {
                m.content.iter().find_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.clone()),
                    _ => None,
                })
            });
            Ok(format!("回声: {}", last.unwrap_or_default()))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ConverseModel for FailingModel {
        async fn converse(
            &self,
            _messages: Vec<ConverseMessage>,
            _inference_config: InferenceConfig,
        ) -> Result<String> {
            Err(anyhow::anyhow!("模型不可用"))
        }
    }

    async fn test_service(model: Arc<dyn ConverseModel>) -> (tempfile::TempDir, ChatService) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        let pool = db::open_db(&url).await.unwrap();
        (dir, ChatService::new(SessionDao::new(pool), model))
    }

    #[tokio::test]
    async fn temporary_session_persists_only_with_first_message() {
        let (_dir, svc) = test_service(Arc::new(EchoModel)).await;
        let mut session = svc.new_session();
        assert!(session.is_temporary);

        // 尚未发送任何消息：不落盘
        assert!(svc.active_sessions().await.unwrap().is_empty());

        svc.send_message(&mut session, vec![ContentBlock::text("你好")])
            .await
            .unwrap();

        let active = svc.active_sessions().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, session.id);
        assert!(!active[0].is_temporary);
        // 用户消息 + 模型回复
        assert_eq!(active[0].messages.len(), 2);
        assert_eq!(active[0].messages[1].text_snippet(), Some("回声: 你好"));
    }

    #[tokio::test]
    async fn title_replaces_placeholder_after_first_exchange() {
        let (_dir, svc) = test_service(Arc::new(EchoModel)).await;
        let mut session = svc.new_session();
        svc.send_message(
            &mut session,
            vec![ContentBlock::text("帮我写一首关于秋天的诗")],
        )
        .await
        .unwrap();

        assert_ne!(session.title, PLACEHOLDER_TITLE);
        assert_eq!(session.title, "帮我写一首关于秋天的诗");
        assert!(!session.preview.is_empty());
    }

    #[tokio::test]
    async fn model_failure_is_recorded_as_error_message() {
        let (_dir, svc) = test_service(Arc::new(FailingModel)).await;
        let mut session = svc.new_session();
        svc.send_message(&mut session, vec![ContentBlock::text("你好")])
            .await
            .unwrap();

        let active = svc.active_sessions().await.unwrap();
        let last = active[0].messages.last().unwrap();
        assert_eq!(last.message_type, MessageType::Error);
        assert_eq!(last.text_snippet(), Some("模型不可用"));
        assert!(!last.is_streaming);
    }

    #[tokio::test]
    async fn soft_delete_leaves_no_way_back_into_lists() {
        let (_dir, svc) = test_service(Arc::new(EchoModel)).await;
        let mut session = svc.new_session();
        svc.send_message(&mut session, vec![ContentBlock::text("你好")])
            .await
            .unwrap();

        svc.delete_session(&mut session).await.unwrap();
        assert!(svc.active_sessions().await.unwrap().is_empty());
        // 记录本身仍可查询
        let all = svc.dao.get_all_sessions().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].deleted);
    }
}
