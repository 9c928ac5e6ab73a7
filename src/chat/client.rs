//! 聊天客户端聚合入口
//!
//! UI 层（或 CLI）唯一需要的句柄：`connect` 打开存储并完成 schema 升级
//! （幂等，重复调用无副作用），之后通过四对访问器读写各实体。
//! 原始连接/事务类型永远不越过这层边界。

use crate::chat::assistant::dao::AssistantDao;
use crate::chat::assistant::models::Assistant;
use crate::chat::config::dao::ConfigDao;
use crate::chat::config::models::Config;
use crate::chat::converse::api::ConverseModel;
use crate::chat::db;
use crate::chat::error::StorageResult;
use crate::chat::session::dao::SessionDao;
use crate::chat::session::models::ChatSession;
use crate::chat::session::service::ChatService;
use crate::chat::workflow::dao::WorkflowDao;
use crate::chat::workflow::models::Workflow;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::info;

/// 聊天客户端
pub struct ChatClient {
    pool: Pool<Sqlite>,
    session_dao: SessionDao,
    config_dao: ConfigDao,
    workflow_dao: WorkflowDao,
    assistant_dao: AssistantDao,
}

impl ChatClient {
    /// 打开（必要时创建）本地存储并升级到当前 schema 版本
    ///
    /// 幂等：存储已是当前版本时迁移引擎是无操作，重复 connect 是安全的。
    pub async fn connect(db_path: &str) -> StorageResult<Self> {
        let pool = db::open_db(db_path).await?;
        info!("[Client] 存储已就绪: {}", db_path);
        Ok(Self {
            session_dao: SessionDao::new(pool.clone()),
            config_dao: ConfigDao::new(pool.clone()),
            workflow_dao: WorkflowDao::new(pool.clone()),
            assistant_dao: AssistantDao::new(pool.clone()),
            pool,
        })
    }

    /// 会话服务（生命周期状态机），模型实现由调用方注入
    pub fn session_service(&self, model: Arc<dyn ConverseModel>) -> ChatService {
        ChatService::new(SessionDao::new(self.pool.clone()), model)
    }

    // ========== 会话 ==========

    pub async fn get_all_sessions(&self) -> StorageResult<Vec<ChatSession>> {
        self.session_dao.get_all_sessions().await
    }

    pub async fn update_session(&self, session: &ChatSession) -> StorageResult<()> {
        self.session_dao.update_session(session).await
    }

    // ========== 配置 ==========

    pub async fn get_all_config(&self) -> StorageResult<Vec<Config>> {
        self.config_dao.get_all_config().await
    }

    pub async fn update_config(&self, config: &Config) -> StorageResult<()> {
        self.config_dao.update_config(config).await
    }

    // ========== 工作流 ==========

    pub async fn get_all_workflows(&self) -> StorageResult<Vec<Workflow>> {
        self.workflow_dao.get_all_workflows().await
    }

    pub async fn update_workflow(&self, workflow: &Workflow) -> StorageResult<()> {
        self.workflow_dao.update_workflow(workflow).await
    }

    // ========== 助手 ==========

    pub async fn get_all_assistants(&self) -> StorageResult<Vec<Assistant>> {
        self.assistant_dao.get_all_assistants().await
    }

    pub async fn update_assistant(&self, assistant: &Assistant) -> StorageResult<Assistant> {
        self.assistant_dao.update_assistant(assistant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_twice_then_all_accessors_work() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("{}/chat.db", dir.path().display());

        // 重复初始化是无操作
        let _first = ChatClient::connect(&path).await.unwrap();
        let client = ChatClient::connect(&path).await.unwrap();

        assert!(client.get_all_sessions().await.unwrap().is_empty());
        assert!(client.get_all_config().await.unwrap().is_empty());
        assert!(client.get_all_workflows().await.unwrap().is_empty());
        assert!(client.get_all_assistants().await.unwrap().is_empty());

        let workflow = Workflow::new("主流程");
        client.update_workflow(&workflow).await.unwrap();
        let stored = client
            .update_assistant(&Assistant::new("小助手", workflow.id))
            .await
            .unwrap();
        // 外键是纯查找关系，解析要另行查询
        let workflows = client.get_all_workflows().await.unwrap();
        assert!(workflows.iter().any(|w| w.id == stored.main_workflow));
    }
}
