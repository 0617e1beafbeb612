use crate::client::MessageMedia;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

/// 响应未声明图片类型时使用
pub const DEFAULT_IMAGE_MIMETYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed with status code {status}")]
    Status { status: u16 },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// 下载图片并编码为媒体附件
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MessageMedia, FetchError>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<MessageMedia, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let mimetype = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
            .filter(|v| v.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIMETYPE)
            .to_string();

        let bytes = response.bytes().await?;
        tracing::debug!(url, size = bytes.len(), %mimetype, "image fetched");

        Ok(MessageMedia {
            mimetype,
            data: STANDARD.encode(&bytes),
            filename: None,
        })
    }
}
