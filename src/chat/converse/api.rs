//! 推理服务 HTTP 客户端
//!
//! 包装远端对话推理 API：整段请求/响应，外加一个把文本片段逐个交给
//! 回调的流式变体。不做请求签名——目标端点是网关或自定义端点
//! （配置里的 `bedrockEndpoint`），凭证通过请求头传递。
//! 失败以带人类可读信息的错误浮出，由调用方决定如何呈现。

use crate::chat::config::models::Config;
use crate::chat::converse::types::{
    ConverseMessage, ConverseRequest, ConverseResponse, InferenceConfig, StreamEvent,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, error, info};

/// 模型调用的接缝：服务层只依赖这个 trait，测试时用桩实现
#[async_trait]
pub trait ConverseModel: Send + Sync {
    /// 发送完整对话，返回完整文本回复
    async fn converse(
        &self,
        messages: Vec<ConverseMessage>,
        inference_config: InferenceConfig,
    ) -> Result<String>;
}

/// 远端推理服务客户端
pub struct BedrockClient {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
}

impl BedrockClient {
    /// 按配置构造客户端，凭证放进默认请求头
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config
            .bedrock_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", config.aws_region));

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::HeaderName::from_static("x-api-access-key"),
            reqwest::header::HeaderValue::from_str(&config.aws_access_key)
                .context("无效的访问凭证")?,
        );
        headers.insert(
            reqwest::header::HeaderName::from_static("x-api-secret-key"),
            reqwest::header::HeaderValue::from_str(&config.aws_secret_key)
                .context("无效的访问凭证")?,
        );
        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .build()
            .context("创建 HTTP 客户端失败")?;

        Ok(Self {
            client,
            endpoint,
            model_id: config.bedrock_model.clone(),
        })
    }

    fn request(&self, messages: Vec<ConverseMessage>, inference_config: InferenceConfig) -> ConverseRequest {
        ConverseRequest {
            model_id: self.model_id.clone(),
            messages,
            inference_config,
        }
    }

    /// 流式调用：每收到一个文本片段就交给 `on_fragment`，
    /// 收到结束标记后返回拼装好的完整回复
    pub async fn converse_stream(
        &self,
        messages: Vec<ConverseMessage>,
        inference_config: InferenceConfig,
        mut on_fragment: impl FnMut(&str) + Send,
    ) -> Result<String> {
        let url = format!("{}/model/{}/converse-stream", self.endpoint, self.model_id);
        info!("[ConverseAPI] 📡 发起流式推理请求，模型: {}", self.model_id);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.request(messages, inference_config))
            .send()
            .await
            .context("推理请求失败")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("[ConverseAPI] 流式推理失败，HTTP状态: {}, 响应: {}", status, text);
            return Err(anyhow::anyhow!("推理服务错误 {}: {}", status, text));
        }

        // 事件以行分隔的 JSON 传输：文本增量若干行，最后一行是结束标记
        let mut assembled = String::new();
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("读取流式响应失败")?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let event: StreamEvent =
                    serde_json::from_str(line).context("解析流式事件失败")?;
                if let Some(text) = event.delta.and_then(|d| d.text) {
                    on_fragment(&text);
                    assembled.push_str(&text);
                }
                if event.message_stop {
                    debug!("[ConverseAPI] 流式推理完成，共 {} 字符", assembled.chars().count());
                    return Ok(assembled);
                }
            }
        }
        // 流提前断开而没有结束标记
        Err(anyhow::anyhow!("流式响应在结束标记之前中断"))
    }
}

#[async_trait]
impl ConverseModel for BedrockClient {
    async fn converse(
        &self,
        messages: Vec<ConverseMessage>,
        inference_config: InferenceConfig,
    ) -> Result<String> {
        let url = format!("{}/model/{}/converse", self.endpoint, self.model_id);
        info!("[ConverseAPI] 📡 发起推理请求，模型: {}", self.model_id);
        debug!("[ConverseAPI]   请求URL: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.request(messages, inference_config))
            .send()
            .await
            .context("推理请求失败")?;

        let status = response.status();
        let body = response.bytes().await.context("读取响应 body 失败")?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            error!("[ConverseAPI] 推理失败，HTTP状态: {}, 响应: {}", status, text);
            return Err(anyhow::anyhow!("推理服务错误 {}: {}", status, text));
        }

        let parsed: ConverseResponse =
            serde_json::from_slice(&body).context("反序列化推理响应失败")?;
        if let Some(usage) = &parsed.usage {
            debug!(
                "[ConverseAPI] token 用量: 输入 {}, 输出 {}",
                usage.input_tokens, usage.output_tokens
            );
        }
        parsed
            .first_text()
            .ok_or_else(|| anyhow::anyhow!("推理响应格式无效：缺少文本内容"))
    }
}
