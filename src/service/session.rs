use crate::client::{ChatId, ClientError, ClientEvent, MessagingClient};
use crate::config::ReconnectPolicy;
use crate::models::{ConnectionStatus, SessionState};
use crate::service::pairing::render_qr_data_url;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const PING_COMMAND: &str = "!ping";
const PONG_REPLY: &str = "pong";

/// 会话管理器
/// 持有唯一的消息会话状态; 状态只由事件循环 (单写者) 修改
pub struct SessionManager {
    client: Arc<dyn MessagingClient>,
    state: RwLock<SessionState>,
    policy: ReconnectPolicy,
    reconnect_attempts: AtomicU32,
}

impl SessionManager {
    pub fn new(client: Arc<dyn MessagingClient>, policy: ReconnectPolicy) -> Self {
        Self {
            client,
            state: RwLock::new(SessionState::Unauthenticated),
            policy,
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    /// 启动会话握手
    pub async fn initialize(&self) -> Result<(), ClientError> {
        info!("[Session] 初始化会话");
        self.client.initialize().await
    }

    /// 启动事件循环, 按到达顺序逐个处理生命周期事件
    pub fn spawn_event_loop(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<ClientEvent>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                manager.handle_event(event).await;
            }
            warn!("[Session] 事件通道已关闭");
        })
    }

    pub async fn handle_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::PairingCode(token) => self.on_pairing_code(&token).await,
            ClientEvent::Authenticated => {
                info!("[Session] 认证成功");
                self.transition(SessionState::Authenticated).await;
            }
            ClientEvent::AuthFailure(message) => {
                error!("[Session] 认证失败: {}", message);
            }
            ClientEvent::Ready => {
                info!("[Session] 客户端就绪");
                self.reconnect_attempts.store(0, Ordering::SeqCst);
                self.transition(SessionState::Ready).await;
            }
            ClientEvent::Disconnected(reason) => {
                warn!("[Session] 连接断开: {}", reason);
                self.transition(SessionState::Disconnected).await;
                if self.policy.enabled {
                    self.reconnect().await;
                }
            }
            ClientEvent::Message { from, body } => self.on_message(from, &body).await,
        }
    }

    /// 当前配对二维码 (仅 AwaitingScan 时存在)
    pub async fn pairing_artifact(&self) -> Option<String> {
        self.state.read().await.pairing_artifact().map(str::to_string)
    }

    pub async fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from(&*self.state.read().await)
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    async fn on_pairing_code(&self, token: &str) {
        match render_qr_data_url(token) {
            Ok(qr_data_url) => {
                info!("[Session] 收到配对二维码, 访问 /qr 查看");
                self.transition(SessionState::AwaitingScan { qr_data_url })
                    .await;
            }
            Err(e) => error!("[Session] 二维码生成失败: {}", e),
        }
    }

    async fn on_message(&self, from: String, body: &str) {
        if !body.eq_ignore_ascii_case(PING_COMMAND) {
            return;
        }
        let to = ChatId::new(from);
        if let Err(e) = self.client.send_text(&to, PONG_REPLY).await {
            warn!("[Session] {}: 回复失败: {}", to, e);
        }
    }

    async fn transition(&self, next: SessionState) {
        let mut state = self.state.write().await;
        if state.name() != next.name() {
            info!("[Session] 状态: {} -> {}", state.name(), next.name());
        }
        *state = next;
    }

    /// 指数退避重连; 次数跨连续断线累计, Ready 后清零
    async fn reconnect(&self) {
        loop {
            let attempt = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt > self.policy.max_attempts {
                error!("[Session] 重连 {} 次均失败, 放弃", self.policy.max_attempts);
                self.transition(SessionState::Disconnected).await;
                return;
            }

            let delay = self.policy.backoff(attempt);
            info!(
                "[Session] {:?} 后重连 (第 {}/{} 次)",
                delay, attempt, self.policy.max_attempts
            );
            tokio::time::sleep(delay).await;

            self.transition(SessionState::Unauthenticated).await;
            match self.client.initialize().await {
                Ok(()) => return,
                Err(e) => warn!("[Session] 第 {} 次重连失败: {}", attempt, e),
            }
        }
    }
}
