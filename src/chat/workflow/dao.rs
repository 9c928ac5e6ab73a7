//! 工作流数据访问层（DAO）

use crate::chat::error::{StorageError, StorageResult};
use crate::chat::schema;
use crate::chat::store;
use crate::chat::workflow::models::Workflow;
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// 工作流 DAO
pub struct WorkflowDao {
    pool: Pool<Sqlite>,
}

impl WorkflowDao {
    /// 创建新的工作流 DAO
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// 读取全部工作流（含软删除的）
    pub async fn get_all_workflows(&self) -> StorageResult<Vec<Workflow>> {
        let records = store::fetch_all(&self.pool, &schema::WORKFLOWS).await?;
        let mut workflows = Vec::with_capacity(records.len());
        for record in records {
            workflows.push(serde_json::from_value(record).map_err(StorageError::read)?);
        }
        debug!("[WorkflowDAO] 获取工作流列表，共 {} 个", workflows.len());
        Ok(workflows)
    }

    /// 插入或整条覆盖一个工作流
    pub async fn update_workflow(&self, workflow: &Workflow) -> StorageResult<()> {
        let record = serde_json::to_value(workflow).map_err(StorageError::write)?;
        store::put_integer(&self.pool, &schema::WORKFLOWS, workflow.id, &record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::db;
    use crate::chat::workflow::models::{NodePosition, WorkflowConnection, WorkflowNode};

    #[tokio::test]
    async fn graph_round_trips_opaquely() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        let dao = WorkflowDao::new(db::open_db(&url).await.unwrap());

        let mut workflow = Workflow::new("审批流");
        workflow.nodes.push(WorkflowNode {
            id: "1".to_string(),
            node_type: "prompt".to_string(),
            position: NodePosition { x: 10.0, y: 20.0 },
            title: "起点".to_string(),
        });
        workflow.nodes.push(WorkflowNode {
            id: "2".to_string(),
            node_type: "model".to_string(),
            position: NodePosition { x: 200.0, y: 20.0 },
            title: "模型".to_string(),
        });
        workflow.connections.push(WorkflowConnection {
            from: "1".to_string(),
            to: "2".to_string(),
        });
        dao.update_workflow(&workflow).await.unwrap();

        let all = dao.get_all_workflows().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].nodes, workflow.nodes);
        assert_eq!(all[0].connections, workflow.connections);
    }

    #[tokio::test]
    async fn soft_deleted_workflows_stay_queryable() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        let dao = WorkflowDao::new(db::open_db(&url).await.unwrap());

        let mut workflow = Workflow::new("临时流程");
        dao.update_workflow(&workflow).await.unwrap();
        workflow.deleted = true;
        dao.update_workflow(&workflow).await.unwrap();

        let all = dao.get_all_workflows().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].deleted);
    }
}
