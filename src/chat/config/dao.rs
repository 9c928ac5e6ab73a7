//! 配置数据访问层（DAO）
//!
//! 配置是单例：永远存在固定主键 [`CONFIG_KEY`] 之下，
//! "至多一条"由结构保证而不是靠约定。

use crate::chat::config::models::{Config, CONFIG_KEY};
use crate::chat::error::{StorageError, StorageResult};
use crate::chat::schema;
use crate::chat::store;
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// 配置 DAO
pub struct ConfigDao {
    pool: Pool<Sqlite>,
}

impl ConfigDao {
    /// 创建新的配置 DAO
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// 读取全部配置记录（单例语义下长度只会是 0 或 1）
    pub async fn get_all_config(&self) -> StorageResult<Vec<Config>> {
        let records = store::fetch_all(&self.pool, &schema::CONFIG).await?;
        let mut configs = Vec::with_capacity(records.len());
        for record in records {
            configs.push(serde_json::from_value(record).map_err(StorageError::read)?);
        }
        Ok(configs)
    }

    /// 写入配置：无视调用方提供的 id，固定存在单例主键之下
    pub async fn update_config(&self, config: &Config) -> StorageResult<()> {
        let mut singleton = config.clone();
        singleton.id = CONFIG_KEY.to_string();
        let record = serde_json::to_value(&singleton).map_err(StorageError::write)?;
        store::put_text(&self.pool, &schema::CONFIG, CONFIG_KEY, &record).await?;
        debug!("[ConfigDAO] 配置已写入，模型: {}", singleton.bedrock_model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::db;

    fn sample(region: &str) -> Config {
        Config {
            id: "任意值都会被覆盖".to_string(),
            aws_region: region.to_string(),
            aws_access_key: "AK".to_string(),
            aws_secret_key: "SK".to_string(),
            bedrock_model: "anthropic.claude-3-sonnet".to_string(),
            bedrock_endpoint: None,
        }
    }

    #[tokio::test]
    async fn config_stays_a_singleton() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        let dao = ConfigDao::new(db::open_db(&url).await.unwrap());

        dao.update_config(&sample("us-east-1")).await.unwrap();
        dao.update_config(&sample("eu-west-1")).await.unwrap();

        let all = dao.get_all_config().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, CONFIG_KEY);
        assert_eq!(all[0].aws_region, "eu-west-1");
    }
}
