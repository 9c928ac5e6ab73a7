//! 助手数据访问层（DAO）
//!
//! 助手仓库的主键由存储引擎自增分配，因此写入不是统一的 upsert：
//! 未携带主键的记录走自增插入，携带主键的记录按主键整条覆盖。
//! 写入前先做入参校验，校验不通过时不发起任何 I/O。

use crate::chat::assistant::models::Assistant;
use crate::chat::error::{StorageError, StorageResult};
use crate::chat::schema;
use crate::chat::store;
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// 助手 DAO
pub struct AssistantDao {
    pool: Pool<Sqlite>,
}

impl AssistantDao {
    /// 创建新的助手 DAO
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// 读取全部助手
    pub async fn get_all_assistants(&self) -> StorageResult<Vec<Assistant>> {
        let records = store::fetch_all(&self.pool, &schema::ASSISTANTS).await?;
        let mut assistants = Vec::with_capacity(records.len());
        for record in records {
            assistants.push(serde_json::from_value(record).map_err(StorageError::read)?);
        }
        debug!("[AssistantDAO] 获取助手列表，共 {} 个", assistants.len());
        Ok(assistants)
    }

    /// 写入助手；新记录返回引擎分配的主键，已有记录整条覆盖
    pub async fn update_assistant(&self, assistant: &Assistant) -> StorageResult<Assistant> {
        // 校验先于一切 I/O，失败时仓库内容不变
        if assistant.name.trim().is_empty() {
            return Err(StorageError::Validation("助手名称不能为空".to_string()));
        }
        if assistant.main_workflow == 0 {
            return Err(StorageError::Validation(
                "助手必须引用一个非零的主工作流".to_string(),
            ));
        }

        let mut stored = assistant.clone();
        match assistant.id {
            Some(id) => {
                let record = serde_json::to_value(&stored).map_err(StorageError::write)?;
                store::put_integer(&self.pool, &schema::ASSISTANTS, id, &record).await?;
                debug!("[AssistantDAO] 覆盖助手，主键 {}", id);
            }
            None => {
                let record = serde_json::to_value(&stored).map_err(StorageError::write)?;
                let id = store::insert_autoincrement(&self.pool, &schema::ASSISTANTS, record).await?;
                stored.id = Some(id);
                debug!("[AssistantDAO] 新增助手，分配主键 {}", id);
            }
        }
        Ok(stored)
    }
}
