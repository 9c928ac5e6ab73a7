//! 迁移引擎
//!
//! 每次打开数据库时运行一次，把存储从当前版本（包括"尚不存在"的版本 0）
//! 升级到注册表声明的目标版本，全部动作在同一个事务内完成：
//!
//! 1. 建内部台账表 `store_ledger`（首个写操作，同时借数据库写锁挡住并发升级者）；
//! 2. 锁内复核 `PRAGMA user_version`，已是目标版本则直接提交（重入安全）；
//! 3. 台账中形态不再被声明的仓库按退役处理：有后继声明的先按字段映射逐条
//!    迁移记录，然后删表、销台账；
//! 4. 声明了但缺失的仓库按主键策略建空表、记台账；
//! 5. 写入目标版本号并提交。
//!
//! 任何一步失败整个事务回滚：版本号、表结构、记录都回到升级前，不留半套 schema。

use crate::chat::error::{StorageError, StorageResult};
use crate::chat::schema::{
    self, KeyKind, StoreSpec, SuccessorMapping, DB_VERSION,
};
use crate::chat::store;
use serde_json::Value;
use sqlx::{Pool, Row, Sqlite, Transaction};
use std::collections::HashSet;
use tracing::{info, warn};

/// 台账表：记录每个物理表当前的形态（名字 + 主键策略）
const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS store_ledger (
    name TEXT PRIMARY KEY,
    key_path TEXT NOT NULL,
    key_kind TEXT NOT NULL
)";

/// 把存储升级到 [`DB_VERSION`]；已是目标版本时为 schema 无操作
pub(crate) async fn upgrade(pool: &Pool<Sqlite>) -> StorageResult<()> {
    // 快路径：绝大多数打开都发生在版本已是当前的库上
    let version = read_version_pool(pool).await?;
    if version == DB_VERSION {
        return Ok(());
    }
    if version > DB_VERSION {
        return Err(StorageError::Migration(format!(
            "存储版本 {} 高于目标版本 {}，版本号只增不减",
            version, DB_VERSION
        )));
    }

    let mut tx = pool.begin().await.map_err(StorageError::migration)?;

    sqlx::query(LEDGER_DDL)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::migration)?;

    // 拿到写锁后复核版本：另一个打开方可能已经完成了升级
    let version = read_version_tx(&mut tx).await?;
    if version == DB_VERSION {
        tx.commit().await.map_err(StorageError::migration)?;
        return Ok(());
    }

    info!("[Migration] 开始升级存储，版本 {} -> {}", version, DB_VERSION);

    // 当前事务内已存在且形态与声明一致的仓库
    let mut present: HashSet<String> = HashSet::new();

    let ledger_rows = sqlx::query("SELECT name, key_path, key_kind FROM store_ledger")
        .fetch_all(&mut *tx)
        .await
        .map_err(StorageError::migration)?;

    for row in ledger_rows {
        let name: String = row.try_get("name").map_err(StorageError::migration)?;
        let kind_raw: String = row.try_get("key_kind").map_err(StorageError::migration)?;
        let kind = KeyKind::parse(&kind_raw).ok_or_else(|| {
            StorageError::Migration(format!("台账损坏：仓库 {} 的主键策略 {} 无法识别", name, kind_raw))
        })?;

        let declared = schema::store_spec(&name);
        if declared.map(|s| s.key) == Some(kind) {
            present.insert(name);
            continue;
        }

        // 形态不再被声明：退役处理
        match schema::retired_store(&name, kind) {
            Some(retired) => {
                if let Some(successor) = &retired.successor {
                    migrate_records(&mut tx, &name, successor, &mut present).await?;
                }
            }
            None => {
                warn!("[Migration] 仓库 {} 没有退役声明，记录随仓库一起删除", name);
            }
        }
        drop_store(&mut tx, &name).await?;
    }

    // 声明了但缺失的仓库建空表
    for spec in schema::STORES {
        if !present.contains(spec.name) {
            create_store(&mut tx, spec).await?;
            present.insert(spec.name.to_string());
        }
    }

    sqlx::query(&format!("PRAGMA user_version = {}", DB_VERSION))
        .execute(&mut *tx)
        .await
        .map_err(StorageError::migration)?;
    tx.commit().await.map_err(StorageError::migration)?;

    info!("[Migration] 升级完成，当前版本 {}", DB_VERSION);
    Ok(())
}

/// 把退役仓库的全部记录按字段映射迁入后继仓库
async fn migrate_records(
    tx: &mut Transaction<'_, Sqlite>,
    from: &str,
    successor: &SuccessorMapping,
    present: &mut HashSet<String>,
) -> StorageResult<()> {
    let to_spec = schema::store_spec(successor.to).ok_or_else(|| {
        StorageError::Migration(format!("后继仓库 {} 未在注册表中声明", successor.to))
    })?;

    // 后继仓库可能比退役仓库晚引入，先保证它存在
    if !present.contains(to_spec.name) {
        create_store(tx, to_spec).await?;
        present.insert(to_spec.name.to_string());
    }

    let rows = sqlx::query(&format!("SELECT data FROM {from}", from = from))
        .fetch_all(&mut **tx)
        .await
        .map_err(StorageError::migration)?;

    let upsert_sql = format!(
        "INSERT INTO {to} (id, data) VALUES (?, ?) \
         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        to = to_spec.name
    );

    let mut migrated = 0usize;
    for row in rows {
        let raw: String = row.try_get("data").map_err(StorageError::migration)?;
        let source: Value = serde_json::from_str(&raw).map_err(StorageError::migration)?;
        let mapped = schema::map_record(successor.fields, &source);

        // 引擎绝不在迁移中臆造主键：缺主键的记录让整个升级失败回滚
        let payload = serde_json::to_string(&mapped).map_err(StorageError::migration)?;
        let query = sqlx::query(&upsert_sql);
        let query = match mapped.get(to_spec.key_path) {
            Some(Value::Number(n)) if n.is_i64() => query.bind(n.as_i64().unwrap()),
            Some(Value::String(s)) => query.bind(s.clone()),
            _ => {
                return Err(StorageError::Migration(format!(
                    "仓库 {} 的记录缺少主键 {}，无法迁入 {}",
                    from, to_spec.key_path, to_spec.name
                )))
            }
        };
        query
            .bind(payload)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::migration)?;
        migrated += 1;
    }

    info!(
        "[Migration] 仓库 {} -> {}，迁移 {} 条记录",
        from, to_spec.name, migrated
    );
    Ok(())
}

async fn create_store(tx: &mut Transaction<'_, Sqlite>, spec: &StoreSpec) -> StorageResult<()> {
    sqlx::query(&store::create_table_sql(spec))
        .execute(&mut **tx)
        .await
        .map_err(StorageError::migration)?;
    sqlx::query("INSERT INTO store_ledger (name, key_path, key_kind) VALUES (?, ?, ?)")
        .bind(spec.name)
        .bind(spec.key_path)
        .bind(spec.key.as_str())
        .execute(&mut **tx)
        .await
        .map_err(StorageError::migration)?;
    info!("[Migration] 创建仓库 {}（主键策略 {}）", spec.name, spec.key.as_str());
    Ok(())
}

async fn drop_store(tx: &mut Transaction<'_, Sqlite>, name: &str) -> StorageResult<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {name}", name = name))
        .execute(&mut **tx)
        .await
        .map_err(StorageError::migration)?;
    sqlx::query("DELETE FROM store_ledger WHERE name = ?")
        .bind(name)
        .execute(&mut **tx)
        .await
        .map_err(StorageError::migration)?;
    info!("[Migration] 删除退役仓库 {}", name);
    Ok(())
}

async fn read_version_pool(pool: &Pool<Sqlite>) -> StorageResult<u32> {
    let row = sqlx::query("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(StorageError::migration)?;
    let version: i64 = row.try_get(0).map_err(StorageError::migration)?;
    Ok(version as u32)
}

async fn read_version_tx(tx: &mut Transaction<'_, Sqlite>) -> StorageResult<u32> {
    let row = sqlx::query("PRAGMA user_version")
        .fetch_one(&mut **tx)
        .await
        .map_err(StorageError::migration)?;
    let version: i64 = row.try_get(0).map_err(StorageError::migration)?;
    Ok(version as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::db;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn raw_pool(url: &str) -> Pool<Sqlite> {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .expect("打开测试数据库失败")
    }

    /// 构造一个 v3 形态的旧库：sessions + config + 旧 assistants（内嵌 workflow）
    async fn seed_v3_database(url: &str, assistants: &[Value]) {
        let pool = raw_pool(url).await;
        sqlx::query(LEDGER_DDL).execute(&pool).await.unwrap();
        sqlx::query("CREATE TABLE sessions (id INTEGER PRIMARY KEY, data TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE config (id TEXT PRIMARY KEY, data TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE assistants (id INTEGER PRIMARY KEY, data TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        for (name, kind) in [
            ("sessions", "caller_integer"),
            ("config", "fixed_text"),
            ("assistants", "caller_integer"),
        ] {
            sqlx::query("INSERT INTO store_ledger (name, key_path, key_kind) VALUES (?, 'id', ?)")
                .bind(name)
                .bind(kind)
                .execute(&pool)
                .await
                .unwrap();
        }
        for record in assistants {
            sqlx::query("INSERT INTO assistants (id, data) VALUES (?, ?)")
                .bind(record["id"].as_i64().unwrap())
                .bind(serde_json::to_string(record).unwrap())
                .execute(&pool)
                .await
                .unwrap();
        }
        sqlx::query("PRAGMA user_version = 3").execute(&pool).await.unwrap();
        pool.close().await;
    }

    async fn table_names(pool: &Pool<Sqlite>) -> Vec<String> {
        sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.get::<String, _>("name"))
            .collect()
    }

    async fn count(pool: &Pool<Sqlite>, table: &str) -> i64 {
        sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
            .get("n")
    }

    #[tokio::test]
    async fn fresh_database_gets_all_declared_stores() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());

        let pool = db::open_db(&url).await.unwrap();
        let tables = table_names(&pool).await;
        for store in ["sessions", "config", "workflows", "assistants"] {
            assert!(tables.iter().any(|t| t == store), "缺少仓库 {store}");
            assert_eq!(count(&pool, store).await, 0);
        }
        assert_eq!(read_version_pool(&pool).await.unwrap(), DB_VERSION);
    }

    #[tokio::test]
    async fn legacy_assistants_migrate_into_workflows() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        seed_v3_database(
            &url,
            &[json!({
                "id": 5,
                "name": "Bot",
                "workflow": { "nodes": [{"id": "1", "type": "prompt", "title": "起点"}], "connections": [] }
            })],
        )
        .await;

        let pool = db::open_db(&url).await.unwrap();

        // 记录数不变地迁入后继仓库
        assert_eq!(count(&pool, "workflows").await, 1);
        let row = sqlx::query("SELECT data FROM workflows WHERE id = 5")
            .fetch_one(&pool)
            .await
            .unwrap();
        let migrated: Value = serde_json::from_str(&row.get::<String, _>("data")).unwrap();
        assert_eq!(migrated["name"], json!("Bot"));
        assert_eq!(migrated["nodes"][0]["id"], json!("1"));
        assert_eq!(migrated["connections"], json!([]));
        assert_eq!(migrated["deleted"], json!(false));

        // 旧仓库不复存在，新 assistants 仓库为空且主键自增
        assert_eq!(count(&pool, "assistants").await, 0);
        let result = sqlx::query("INSERT INTO assistants (data) VALUES ('{}')")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(result.last_insert_rowid(), 1);
        assert_eq!(read_version_pool(&pool).await.unwrap(), DB_VERSION);
    }

    #[tokio::test]
    async fn migration_preserves_record_count() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        let legacy: Vec<Value> = (1..=3)
            .map(|i| json!({ "id": i, "name": format!("助手{i}") }))
            .collect();
        seed_v3_database(&url, &legacy).await;

        let pool = db::open_db(&url).await.unwrap();
        assert_eq!(count(&pool, "workflows").await, 3);
        // 内嵌图缺失时用空序列代替
        let row = sqlx::query("SELECT data FROM workflows WHERE id = 2")
            .fetch_one(&pool)
            .await
            .unwrap();
        let migrated: Value = serde_json::from_str(&row.get::<String, _>("data")).unwrap();
        assert_eq!(migrated["nodes"], json!([]));
    }

    #[tokio::test]
    async fn second_open_is_a_schema_noop() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());

        let pool = db::open_db(&url).await.unwrap();
        sqlx::query("INSERT INTO sessions (id, data) VALUES (1001, '{\"id\":1001}')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        // 重新打开：不建不删不变换，已有数据原样保留
        let pool = db::open_db(&url).await.unwrap();
        assert_eq!(count(&pool, "sessions").await, 1);
        assert_eq!(read_version_pool(&pool).await.unwrap(), DB_VERSION);
    }

    #[tokio::test]
    async fn version_ahead_of_target_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/chat.db?mode=rwc", dir.path().display());
        let pool = raw_pool(&url).await;
        sqlx::query("PRAGMA user_version = 99").execute(&pool).await.unwrap();
        pool.close().await;

        let err = db::open_db(&url).await.unwrap_err();
        assert!(matches!(err, StorageError::Migration(_)));
    }
}
