use crate::client::{ChatId, ClientError, MessagingClient};
use crate::models::SaleRecord;
use crate::service::fetcher::{FetchError, ImageFetcher};
use crate::service::formatter::format_sale_message;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// 批量发送失败; 消息即底层错误的消息
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{source}")]
    Send {
        index: usize,
        #[source]
        source: ClientError,
    },
    #[error("{source}")]
    Fetch {
        index: usize,
        url: String,
        #[source]
        source: FetchError,
    },
}

impl DispatchError {
    /// 失败记录在批次中的位置
    pub fn index(&self) -> usize {
        match self {
            Self::Send { index, .. } | Self::Fetch { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub texts_sent: usize,
    pub images_sent: usize,
}

/// 批量发送服务
/// 按顺序逐条发送: 文本 -> (可选) 下载图片 -> 图片; 任一步失败即中止
pub struct DispatchService {
    client: Arc<dyn MessagingClient>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl DispatchService {
    pub fn new(client: Arc<dyn MessagingClient>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { client, fetcher }
    }

    pub async fn dispatch(
        &self,
        to: &ChatId,
        records: &[SaleRecord],
    ) -> Result<DispatchReport, DispatchError> {
        let mut report = DispatchReport::default();

        tracing::info!("[Dispatch] {}: 开始发送, {} 条记录", to, records.len());

        for (index, record) in records.iter().enumerate() {
            for (field, raw) in record.invalid_amounts() {
                tracing::warn!(
                    "[Dispatch] {}: 记录 {} 的 {} 不是数字 ({:?}), 按 0 处理",
                    to, index, field, raw
                );
            }

            let text = format_sale_message(record);
            self.client
                .send_text(to, &text)
                .await
                .map_err(|source| DispatchError::Send { index, source })
                .inspect_err(|e| log_failure(to, e))?;
            report.texts_sent += 1;

            let Some(url) = record.image_url() else {
                continue;
            };

            let media = self
                .fetcher
                .fetch(url)
                .await
                .map_err(|source| DispatchError::Fetch {
                    index,
                    url: url.to_string(),
                    source,
                })
                .inspect_err(|e| log_failure(to, e))?;

            self.client
                .send_media(to, &media)
                .await
                .map_err(|source| DispatchError::Send { index, source })
                .inspect_err(|e| log_failure(to, e))?;
            report.images_sent += 1;
        }

        tracing::info!(
            "[Dispatch] {}: 发送完成 - 文本: {}, 图片: {}",
            to, report.texts_sent, report.images_sent
        );

        Ok(report)
    }
}

fn log_failure(to: &ChatId, error: &DispatchError) {
    match error {
        DispatchError::Fetch { index, url, .. } => {
            tracing::error!("[Dispatch] {}: 记录 {} 图片下载失败 {}: {}", to, index, url, error)
        }
        DispatchError::Send { index, .. } => {
            tracing::error!("[Dispatch] {}: 记录 {} 发送失败: {}", to, index, error)
        }
    }
}
