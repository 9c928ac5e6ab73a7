//! SQLite 数据库工具：创建连接池并在打开时运行迁移引擎
//!
//! 打开即迁移：任何调用方拿到连接池之前，schema 一定已经是注册表声明的
//! 目标版本。重复打开是幂等的——版本已是当前时迁移引擎是无操作。

use crate::chat::error::{StorageError, StorageResult};
use crate::chat::migration;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tracing::debug;

/// 把数据库路径规范化为 sqlx 连接 URL：
/// - 相对路径：如 `chat.db` 转换为 `sqlite://chat.db?mode=rwc`
/// - 绝对路径：如 `/path/to/chat.db` 转换为 `sqlite:///path/to/chat.db?mode=rwc`
/// - 完整 URL：如 `sqlite://chat.db?mode=rwc` 直接使用
pub fn normalize_db_url(db_path: &str) -> String {
    if db_path.starts_with("sqlite:") {
        db_path.to_string()
    } else {
        format!("sqlite://{}?mode=rwc", db_path)
    }
}

/// 创建 SQLite 连接池并把存储升级到当前 schema 版本
///
/// 迁移失败时整个打开请求失败，不会交出半套 schema 的连接池。
pub async fn open_db(db_path: &str) -> StorageResult<Pool<Sqlite>> {
    let db_url = normalize_db_url(db_path);
    debug!("[DB] 打开数据库: {}", db_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .map_err(StorageError::Connection)?;

    migration::upgrade(&pool).await?;
    Ok(pool)
}
