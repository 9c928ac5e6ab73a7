//! 工作流模块

pub mod dao;
pub mod models;

pub use dao::WorkflowDao;
pub use models::{NodePosition, Workflow, WorkflowConnection, WorkflowNode};
