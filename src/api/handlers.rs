use crate::api::AppState;
use crate::models::{ConnectionStatus, SendRequest};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;

/// 没有可用二维码时的提示
pub const QR_UNAVAILABLE: &str = "Cliente de WhatsApp ya está listo o no hay QR disponible.";

/// 批量发送成功响应
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: String,
}

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: ConnectionStatus,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 获取配对二维码
pub async fn qr_code(State(state): State<AppState>) -> Response {
    match state.session.pairing_artifact().await {
        Some(data_url) => Html(format!(r#"<img src="{}" alt="QR Code">"#, data_url)).into_response(),
        None => QR_UNAVAILABLE.into_response(),
    }
}

/// 连接状态
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.session.status().await,
    })
}

/// 批量发送销售通知
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::warn!("[Api] 请求体无效: {}", rejection.body_text());
            return bad_request(rejection.body_text());
        }
    };

    let (chat_id, rows) = match req.validate() {
        Ok(validated) => validated,
        Err(e) => return bad_request(e.to_string()),
    };

    match state.dispatcher.dispatch(&chat_id, &rows).await {
        Ok(report) => {
            tracing::info!(
                "[Api] {}: 发送成功 - 文本: {}, 图片: {}",
                chat_id, report.texts_sent, report.images_sent
            );
            let response = SendMessageResponse {
                success: true,
                message: "Mensajes enviados".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("[Api] 发送失败: {}", e);
            let response = ErrorResponse {
                success: false,
                error: e.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}

fn bad_request(error: String) -> Response {
    let response = ErrorResponse {
        success: false,
        error,
    };
    (StatusCode::BAD_REQUEST, Json(response)).into_response()
}
