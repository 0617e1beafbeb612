//! 桥接进程客户端。
//!
//! 桥接进程托管浏览器自动化消息库, 每行向 stdout 输出一个 JSON 事件:
//! `{"type":"qr","data":"..."}`、`{"type":"ready"}` 等。
//! 发送消息通过桥接进程本地的 `POST /send` 完成。

use super::{ChatId, ClientError, ClientEvent, MessageMedia, MessagingClient};
use crate::config::BridgeConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 桥接进程输出的事件
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Qr {
        data: String,
    },
    Authenticated,
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Message {
        from: String,
        #[serde(default)]
        body: String,
    },
}

impl From<BridgeEvent> for ClientEvent {
    fn from(event: BridgeEvent) -> Self {
        match event {
            BridgeEvent::Qr { data } => ClientEvent::PairingCode(data),
            BridgeEvent::Authenticated => ClientEvent::Authenticated,
            BridgeEvent::AuthFailure { message } => ClientEvent::AuthFailure(message),
            BridgeEvent::Ready => ClientEvent::Ready,
            BridgeEvent::Disconnected { reason } => ClientEvent::Disconnected(reason),
            BridgeEvent::Message { from, body } => ClientEvent::Message { from, body },
        }
    }
}

/// 解析一行输出; 空行、非 JSON 或未知事件返回 None
pub fn parse_line(line: &str) -> Option<BridgeEvent> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(target: "whatsapp_bridge", "[Bridge] 忽略无法识别的输出: {}", e);
            None
        }
    }
}

/// 基于桥接进程的消息客户端
pub struct BridgeClient {
    config: BridgeConfig,
    auth_path: PathBuf,
    endpoint: String,
    http: reqwest::Client,
    events: mpsc::Sender<ClientEvent>,
    child: Mutex<Option<Child>>,
    /// 每次 initialize 递增; 旧进程退出时不再上报断线
    generation: Arc<AtomicU64>,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig, auth_path: PathBuf) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let endpoint = format!("http://127.0.0.1:{}", config.port);
        let client = Self {
            config,
            auth_path,
            endpoint,
            http: reqwest::Client::new(),
            events,
            child: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        };
        (client, rx)
    }

    /// 覆盖桥接进程的 HTTP 地址
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// 桥接进程未启动或已退出时返回 NotInitialized
    async fn ensure_running(&self) -> Result<(), ClientError> {
        let mut slot = self.child.lock().await;
        let Some(child) = slot.as_mut() else {
            return Err(ClientError::NotInitialized);
        };
        match child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => {
                warn!("[Bridge] 桥接进程已退出: {}", status);
                *slot = None;
                Err(ClientError::NotInitialized)
            }
            Err(e) => {
                warn!("[Bridge] 无法查询桥接进程状态: {}", e);
                *slot = None;
                Err(ClientError::NotInitialized)
            }
        }
    }

    async fn post_send(&self, body: serde_json::Value) -> Result<(), ClientError> {
        self.ensure_running().await?;

        let response = self
            .http
            .post(format!("{}/send", self.endpoint))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    async fn initialize(&self) -> Result<(), ClientError> {
        let mut slot = self.child.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(mut old) = slot.take() {
            info!("[Bridge] 停止旧的桥接进程");
            if let Err(e) = old.kill().await {
                warn!("[Bridge] 停止旧进程失败: {}", e);
            }
        }

        info!(
            command = %self.config.command,
            script = %self.config.script.display(),
            port = self.config.port,
            "[Bridge] 启动桥接进程"
        );

        let mut child = Command::new(&self.config.command)
            .arg(&self.config.script)
            .env("BRIDGE_PORT", self.config.port.to_string())
            .env("AUTH_PATH", &self.auth_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ClientError::Spawn)?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_events(
                stdout,
                self.events.clone(),
                Arc::clone(&self.generation),
                generation,
            ));
        }

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "whatsapp_bridge", "{}", line);
                }
            });
        }

        *slot = Some(child);
        Ok(())
    }

    async fn send_text(&self, to: &ChatId, text: &str) -> Result<(), ClientError> {
        self.post_send(json!({
            "to": to.as_str(),
            "type": "text",
            "text": text,
        }))
        .await
    }

    async fn send_media(&self, to: &ChatId, media: &MessageMedia) -> Result<(), ClientError> {
        let mut body = json!({
            "to": to.as_str(),
            "type": "media",
            "mimetype": media.mimetype,
            "data": media.data,
        });
        if let Some(filename) = &media.filename {
            body["filename"] = json!(filename);
        }
        self.post_send(body).await
    }
}

/// 读取桥接进程 stdout 并转发事件; 进程退出时补发一次断线事件
async fn forward_events(
    stdout: ChildStdout,
    events: mpsc::Sender<ClientEvent>,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut saw_disconnect = false;

    while let Ok(Some(line)) = lines.next_line().await {
        match parse_line(&line) {
            Some(event) => {
                saw_disconnect |= matches!(event, BridgeEvent::Disconnected { .. });
                if events.send(event.into()).await.is_err() {
                    return;
                }
            }
            None if !line.trim().is_empty() => {
                info!(target: "whatsapp_bridge", "{}", line.trim());
            }
            None => {}
        }
    }

    if saw_disconnect || current.load(Ordering::SeqCst) != generation {
        return;
    }
    let _ = events
        .send(ClientEvent::Disconnected("bridge process exited".to_string()))
        .await;
}
