//! 会话数据访问层（DAO）
//!
//! 每个操作都是独立的工作单元：各自走一次连接池，互相之间没有共享事务，
//! 也没有跨调用的顺序保证（整条记录覆盖，后提交者胜出）。
//! 旧形态记录在读取路径上就地升级，调用方永远只看到当前形态。

use crate::chat::error::{StorageError, StorageResult};
use crate::chat::schema;
use crate::chat::session::models::{normalize_session, ChatSession};
use crate::chat::store;
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// 会话 DAO
pub struct SessionDao {
    pool: Pool<Sqlite>,
}

impl SessionDao {
    /// 创建新的会话 DAO
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// 读取全部会话（含软删除的；过滤由调用方负责）
    pub async fn get_all_sessions(&self) -> StorageResult<Vec<ChatSession>> {
        let records = store::fetch_all(&self.pool, &schema::SESSIONS).await?;
        let mut sessions = Vec::with_capacity(records.len());
        for mut record in records {
            normalize_session(&mut record);
            let session: ChatSession =
                serde_json::from_value(record).map_err(StorageError::read)?;
            sessions.push(session);
        }
        debug!("[SessionDAO] 获取会话列表，共 {} 个会话", sessions.len());
        Ok(sessions)
    }

    /// 插入或整条覆盖一个会话（按主键，无字段级合并）
    pub async fn update_session(&self, session: &ChatSession) -> StorageResult<()> {
        let record = serde_json::to_value(session).map_err(StorageError::write)?;
        store::put_integer(&self.pool, &schema::SESSIONS, session.id, &record).await
    }
}
