//! 工作流模型
//!
//! 工作流是一张命名的有向图。存储核心不解释节点类型和图的拓扑，
//! 那是画布编辑器和执行器的事；这里只保证整张图原样存取。

use serde::{Deserialize, Serialize};

/// 图中的一个节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// 节点 ID（图内唯一）
    pub id: String,
    /// 节点类型，存储核心视为不透明字符串
    #[serde(rename = "type")]
    pub node_type: String,
    /// 画布坐标
    pub position: NodePosition,
    /// 展示标题
    #[serde(default)]
    pub title: String,
}

/// 节点的画布坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

/// 两个节点之间的连线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConnection {
    /// 起点节点 ID
    pub from: String,
    /// 终点节点 ID
    pub to: String,
}

/// 一个命名的工作流图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// 主键，创建时按创建时间毫秒数分配
    pub id: i64,
    /// 名称
    pub name: String,
    /// 创建时间（Unix 毫秒）
    #[serde(rename = "createdTime", default)]
    pub created_time: i64,
    /// 软删除标记
    #[serde(default)]
    pub deleted: bool,
    /// 节点序列
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    /// 连线序列
    #[serde(default)]
    pub connections: Vec<WorkflowConnection>,
}

impl Workflow {
    /// 新建空工作流
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: chrono::Utc::now().timestamp_millis(),
            name: name.into(),
            created_time: chrono::Utc::now().timestamp_millis(),
            deleted: false,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }
}
