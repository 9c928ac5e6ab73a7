//! 应用配置模型

use serde::{Deserialize, Serialize};

/// 配置记录的固定主键：结构上保证任意时刻至多一条配置
pub const CONFIG_KEY: &str = "app_config";

fn default_config_id() -> String {
    CONFIG_KEY.to_string()
}

/// 远端推理服务的连接参数（单例记录）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 固定主键，写入时无视调用方提供的值
    #[serde(default = "default_config_id")]
    pub id: String,
    /// 区域
    #[serde(rename = "awsRegion")]
    pub aws_region: String,
    /// 访问凭证
    #[serde(rename = "awsAccessKey")]
    pub aws_access_key: String,
    /// 访问凭证（secret）
    #[serde(rename = "awsSecretKey")]
    pub aws_secret_key: String,
    /// 选用的模型标识
    #[serde(rename = "bedrockModel")]
    pub bedrock_model: String,
    /// 自定义服务端点，缺省时按区域推导
    #[serde(rename = "bedrockEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub bedrock_endpoint: Option<String>,
}
