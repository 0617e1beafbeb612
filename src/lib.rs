pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod service;

pub use client::{BridgeClient, ChatId, ClientEvent, MessagingClient};
pub use config::AppConfig;
pub use service::{DispatchService, HttpImageFetcher, SessionManager};
