use crate::payload::IngestResultPayload;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("producer callback request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("producer callback returned {status}")]
    Rejected { status: u16 },
}

/// Posts terminal ingest results to the producer's callback URL, per spec
/// §5's 10s bounded timeout on the notify step. A timeout or non-2xx
/// response classifies as `NOTIFY_CALLBACK_FAIL` for the caller to decide
/// whether a retry cycle remains — the notifier itself never retries.
pub struct Notifier {
    client: reqwest::Client,
    callback_url: Option<String>,
    enabled: bool,
}

impl Notifier {
    pub fn new(callback_url: Option<String>, enabled: bool, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client config is valid");
        Self {
            client,
            callback_url,
            enabled,
        }
    }

    pub async fn notify(&self, result: &IngestResultPayload) -> Result<(), NotifyError> {
        if !self.enabled {
            return Ok(());
        }
        let Some(url) = &self.callback_url else {
            tracing::warn!("notify_enabled is true but no callback_url configured; skipping");
            return Ok(());
        };

        let response = self.client.post(url).json(result).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
