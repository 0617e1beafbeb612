pub mod bridge;

pub use bridge::{parse_line, BridgeClient, BridgeEvent};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// 个人会话地址的域后缀
pub const CHAT_DOMAIN: &str = "c.us";

/// 会话内的收件人地址, 如 `5215512345678@c.us`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_phone(phone: &str) -> Self {
        Self(format!("{}@{}", phone.trim(), CHAT_DOMAIN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 媒体附件, data 为 base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageMedia {
    pub mimetype: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// 消息客户端上报的生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    PairingCode(String),
    Authenticated,
    AuthFailure(String),
    Ready,
    Disconnected(String),
    Message { from: String, body: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("messaging client is not initialized")]
    NotInitialized,
    #[error("failed to spawn bridge process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("bridge request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bridge rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// 消息客户端 (浏览器自动化消息库的黑盒能力)
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// 启动会话握手, 结果通过事件通道异步上报
    async fn initialize(&self) -> Result<(), ClientError>;

    async fn send_text(&self, to: &ChatId, text: &str) -> Result<(), ClientError>;

    async fn send_media(&self, to: &ChatId, media: &MessageMedia) -> Result<(), ClientError>;
}
