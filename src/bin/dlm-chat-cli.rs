//! DLM Chat CLI 客户端（测试版）
//!
//! 非交互式 CLI，用于测试和展示 SDK 功能：
//! 初始化本地存储、读写配置、列出/发送会话消息、查看工作流与助手。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dlm_chat_core_rust::chat::converse::BedrockClient;
use dlm_chat_core_rust::chat::session::ContentBlock;
use dlm_chat_core_rust::{ChatClient, Config};
use std::sync::Arc;
use tracing::info;

/// DLM Chat CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "dlm-chat-cli")]
#[command(about = "DLM Chat CLI 客户端 - 用于测试和展示本地会话存储", long_about = None)]
struct Args {
    /// 数据库路径（默认: chat.db）
    #[arg(long, default_value = "chat.db")]
    db: String,

    /// 日志级别（默认: info,dlm_chat_core_rust=debug）
    #[arg(long, default_value = "info,dlm_chat_core_rust=debug")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 初始化本地存储（幂等，重复执行安全）
    Init,
    /// 列出活跃会话
    Sessions,
    /// 发送一条消息（省略 --session 时新建会话）
    Send {
        /// 既有会话 ID
        #[arg(long)]
        session: Option<i64>,
        /// 消息文本
        text: String,
    },
    /// 软删除一个会话
    Delete {
        /// 会话 ID
        session: i64,
    },
    /// 写入远端服务配置
    SetConfig {
        #[arg(long)]
        region: String,
        #[arg(long)]
        access_key: String,
        #[arg(long)]
        secret_key: String,
        #[arg(long)]
        model: String,
        /// 自定义端点，缺省时按区域推导
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// 列出工作流
    Workflows,
    /// 列出助手
    Assistants,
}

/// 初始化日志（同时输出到 stdout 和文件）
fn init_logger(log_level: &str) {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("无法创建日志文件 debug.log");

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

async fn load_config(client: &ChatClient) -> Result<Config> {
    client
        .get_all_config()
        .await?
        .into_iter()
        .next()
        .context("尚未写入配置，请先执行 set-config")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);

    let client = ChatClient::connect(&args.db).await?;

    match args.command {
        Command::Init => {
            info!("[CLI] ✅ 存储已初始化: {}", args.db);
        }
        Command::Sessions => {
            let sessions = client.get_all_sessions().await?;
            let mut active: Vec<_> = sessions.into_iter().filter(|s| !s.deleted).collect();
            active.sort_by(|a, b| b.id.cmp(&a.id));
            info!("[CLI] 📋 活跃会话 {} 个", active.len());
            for session in active {
                println!("{}\t{}\t{}", session.id, session.title, session.preview);
            }
        }
        Command::Send { session, text } => {
            let config = load_config(&client).await?;
            let model = Arc::new(BedrockClient::new(&config)?);
            let service = client.session_service(model);

            let mut target = match session {
                Some(id) => client
                    .get_all_sessions()
                    .await?
                    .into_iter()
                    .find(|s| s.id == id && !s.deleted)
                    .context(format!("会话 {} 不存在或已删除", id))?,
                None => service.new_session(),
            };

            service
                .send_message(&mut target, vec![ContentBlock::text(text)])
                .await?;

            if let Some(reply) = target.messages.last().and_then(|m| m.text_snippet()) {
                println!("{}", reply);
            }
            info!("[CLI] 💬 会话 {} 现有 {} 条消息", target.id, target.messages.len());
        }
        Command::Delete { session } => {
            let mut target = client
                .get_all_sessions()
                .await?
                .into_iter()
                .find(|s| s.id == session)
                .context(format!("会话 {} 不存在", session))?;
            target.deleted = true;
            client.update_session(&target).await?;
            info!("[CLI] 🗑 会话 {} 已软删除", session);
        }
        Command::SetConfig {
            region,
            access_key,
            secret_key,
            model,
            endpoint,
        } => {
            let config = Config {
                id: String::new(), // 写入时固定为单例主键
                aws_region: region,
                aws_access_key: access_key,
                aws_secret_key: secret_key,
                bedrock_model: model,
                bedrock_endpoint: endpoint,
            };
            client.update_config(&config).await?;
            info!("[CLI] ⚙️ 配置已写入");
        }
        Command::Workflows => {
            let workflows = client.get_all_workflows().await?;
            for workflow in workflows.iter().filter(|w| !w.deleted) {
                println!(
                    "{}\t{}\t{} 节点 / {} 连线",
                    workflow.id,
                    workflow.name,
                    workflow.nodes.len(),
                    workflow.connections.len()
                );
            }
        }
        Command::Assistants => {
            let assistants = client.get_all_assistants().await?;
            for assistant in assistants {
                println!(
                    "{}\t{}\t主工作流 {}",
                    assistant.id.unwrap_or_default(),
                    assistant.name,
                    assistant.main_workflow
                );
            }
        }
    }

    Ok(())
}
