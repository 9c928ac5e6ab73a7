//! 助手模型
//!
//! 助手只通过 `mainWorkflow` 以主键引用工作流——纯查找关系，不是结构性
//! 拥有，解析引用要另行查询工作流仓库。

use serde::{Deserialize, Serialize};

/// 一个助手
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    /// 主键，由存储引擎自增分配；新记录写入前为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// 名称，必填且非空
    pub name: String,
    /// 主工作流外键，必填且非零
    #[serde(rename = "mainWorkflow")]
    pub main_workflow: i64,
    /// 创建时间（Unix 毫秒）
    #[serde(rename = "createdTime", default)]
    pub created_time: i64,
    /// 最近更新时间（Unix 毫秒）
    #[serde(rename = "updatedAt", default)]
    pub updated_at: i64,
}

impl Assistant {
    /// 新建尚未持久化的助手（主键由首次写入时分配）
    pub fn new(name: impl Into<String>, main_workflow: i64) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            name: name.into(),
            main_workflow,
            created_time: now,
            updated_at: now,
        }
    }
}
