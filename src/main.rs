use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;
use whatsapp_sales_relay::{
    api::{self, AppState},
    AppConfig, BridgeClient, DispatchService, HttpImageFetcher, MessagingClient, SessionManager,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 可选
    dotenvy::dotenv().ok();

    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    // 确保认证数据目录存在
    tokio::fs::create_dir_all(&config.session.auth_path).await?;

    // 消息客户端 + 会话管理
    let (bridge, events) = BridgeClient::new(
        config.session.bridge.clone(),
        config.session.auth_path.clone(),
    );
    let client: Arc<dyn MessagingClient> = Arc::new(bridge);
    let session = Arc::new(SessionManager::new(
        Arc::clone(&client),
        config.session.reconnect.clone(),
    ));
    session.spawn_event_loop(events);

    if let Err(e) = session.initialize().await {
        error!("Failed to initialize WhatsApp session: {}", e);
    }

    let dispatcher = Arc::new(DispatchService::new(
        client,
        Arc::new(HttpImageFetcher::new()),
    ));

    // 构建路由
    let app = api::router(AppState {
        session,
        dispatcher,
    })
    .layer(ServiceBuilder::new().layer(api::cors_layer(&config.cors)));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /health        - Health check");
    info!("  GET  /qr            - Pairing QR code");
    info!("  GET  /status        - Session status");
    info!("  POST /send-message  - Send sale notifications");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
