//! 通用记录层
//!
//! 所有对象仓库共用同一种物理形态：`(id, data)` 两列表，`data` 为一条
//! JSON 文档。本模块提供 DAO 共用的三种操作：全量读取、按主键整条
//! 覆盖写入（upsert）、自增插入（插入后把生成的主键回写进 JSON）。
//! 表名只来自 [`schema::STORES`] 的静态声明，运行时拼接 SQL 是安全的。

use crate::chat::error::{StorageError, StorageResult};
use crate::chat::schema::{KeyKind, StoreSpec};
use serde_json::Value;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

/// 按主键策略生成建表语句
pub(crate) fn create_table_sql(spec: &StoreSpec) -> String {
    let key_column = match spec.key {
        KeyKind::CallerInteger => "id INTEGER PRIMARY KEY",
        KeyKind::FixedText => "id TEXT PRIMARY KEY",
        KeyKind::AutoIncrement => "id INTEGER PRIMARY KEY AUTOINCREMENT",
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({key_column}, data TEXT NOT NULL)",
        table = spec.name,
        key_column = key_column
    )
}

/// 读取仓库内全部记录（存储顺序，无排序保证，调用方自行排序）
pub(crate) async fn fetch_all(pool: &Pool<Sqlite>, spec: &StoreSpec) -> StorageResult<Vec<Value>> {
    let sql = format!("SELECT data FROM {table}", table = spec.name);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(StorageError::read)?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let data: String = row.try_get("data").map_err(StorageError::read)?;
        let value: Value = serde_json::from_str(&data).map_err(StorageError::read)?;
        records.push(value);
    }
    debug!("[Store] 读取仓库 {}，共 {} 条记录", spec.name, records.len());
    Ok(records)
}

fn upsert_sql(spec: &StoreSpec) -> String {
    format!(
        "INSERT INTO {table} (id, data) VALUES (?, ?) \
         ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        table = spec.name
    )
}

/// 按整数主键整条覆盖写入
pub(crate) async fn put_integer(
    pool: &Pool<Sqlite>,
    spec: &StoreSpec,
    id: i64,
    data: &Value,
) -> StorageResult<()> {
    let payload = serde_json::to_string(data).map_err(StorageError::write)?;
    sqlx::query(&upsert_sql(spec))
        .bind(id)
        .bind(payload)
        .execute(pool)
        .await
        .map_err(StorageError::write)?;
    debug!("[Store] 写入仓库 {}，主键 {}", spec.name, id);
    Ok(())
}

/// 按字符串主键整条覆盖写入
pub(crate) async fn put_text(
    pool: &Pool<Sqlite>,
    spec: &StoreSpec,
    id: &str,
    data: &Value,
) -> StorageResult<()> {
    let payload = serde_json::to_string(data).map_err(StorageError::write)?;
    sqlx::query(&upsert_sql(spec))
        .bind(id)
        .bind(payload)
        .execute(pool)
        .await
        .map_err(StorageError::write)?;
    debug!("[Store] 写入仓库 {}，主键 {}", spec.name, id);
    Ok(())
}

/// 自增插入：由存储引擎分配主键，并在同一事务内把主键回写进记录 JSON，
/// 保证 `fetch_all` 返回的每条记录都带有自己的主键
pub(crate) async fn insert_autoincrement(
    pool: &Pool<Sqlite>,
    spec: &StoreSpec,
    mut data: Value,
) -> StorageResult<i64> {
    let mut tx = pool.begin().await.map_err(StorageError::write)?;

    let insert_sql = format!("INSERT INTO {table} (data) VALUES (?)", table = spec.name);
    let placeholder = serde_json::to_string(&data).map_err(StorageError::write)?;
    let result = sqlx::query(&insert_sql)
        .bind(placeholder)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::write)?;
    let id = result.last_insert_rowid();

    if let Some(obj) = data.as_object_mut() {
        obj.insert(spec.key_path.to_string(), Value::from(id));
    }
    let payload = serde_json::to_string(&data).map_err(StorageError::write)?;
    let update_sql = format!("UPDATE {table} SET data = ? WHERE id = ?", table = spec.name);
    sqlx::query(&update_sql)
        .bind(payload)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::write)?;

    tx.commit().await.map_err(StorageError::write)?;
    debug!("[Store] 仓库 {} 自增插入，分配主键 {}", spec.name, id);
    Ok(id)
}
