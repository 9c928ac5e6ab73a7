//! 存储层错误类型
//!
//! 按失败阶段区分错误：打开连接、schema 升级、读、写、入参校验。
//! 存储核心只返回 `StorageError`，不做任何重试；上层（服务/CLI）统一用 anyhow 包装。

use thiserror::Error;

/// 存储层错误分类
#[derive(Debug, Error)]
pub enum StorageError {
    /// 数据库无法打开（引擎不可用、路径非法、被其他升级阻塞等）
    #[error("打开数据库失败: {0}")]
    Connection(#[source] sqlx::Error),

    /// schema 升级过程中失败，整个升级事务已回滚，版本保持原值
    #[error("存储迁移失败: {0}")]
    Migration(String),

    /// 连接已打开后的读操作失败
    #[error("读取存储失败: {0}")]
    Read(String),

    /// 连接已打开后的写操作失败
    #[error("写入存储失败: {0}")]
    Write(String),

    /// 写入前的入参校验失败，未发起任何 I/O
    #[error("参数校验失败: {0}")]
    Validation(String),
}

impl StorageError {
    /// 读路径上的 sqlx 错误
    pub(crate) fn read(e: impl std::fmt::Display) -> Self {
        StorageError::Read(e.to_string())
    }

    /// 写路径上的 sqlx 错误
    pub(crate) fn write(e: impl std::fmt::Display) -> Self {
        StorageError::Write(e.to_string())
    }

    /// 迁移路径上的错误
    pub(crate) fn migration(e: impl std::fmt::Display) -> Self {
        StorageError::Migration(e.to_string())
    }
}

/// 存储层统一 Result 别名
pub type StorageResult<T> = std::result::Result<T, StorageError>;
