pub mod handlers;

pub use handlers::{health_check, qr_code, send_message, status};

use crate::config::CorsConfig;
use crate::service::{DispatchService, SessionManager};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// 共享状态: 会话管理器 + 批量发送服务
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
    pub dispatcher: Arc<DispatchService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/qr", get(qr_code))
        .route("/status", get(status))
        .route("/send-message", post(send_message))
        .with_state(state)
}

/// 跨域策略: 仅允许白名单来源的 GET/POST
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("[Cors] 忽略无效来源: {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
