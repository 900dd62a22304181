//! Shared HTTP session: one `reqwest::Client` plus one retry policy, built once per run
//! and handed to every component that fetches something.

use crate::config::SessionConfig;
use crate::contract::{FetchError, FetchErrorKind, RemoteSource};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpSession {
    client: reqwest::Client,
    config: SessionConfig,
}

impl HttpSession {
    pub fn new(config: SessionConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        config.trace_loaded();
        Ok(Self { client, config })
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.backoff_base)
            .with_factor(2.0)
            .with_max_times(self.config.max_retries)
    }

    async fn send_once(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(|e| classify(url, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(url, status = status.as_u16(), body = %body, "Request returned error status");
            return Err(FetchError::new(
                FetchErrorKind::Status(status.as_u16()),
                url,
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }
        Ok(response)
    }

    async fn text_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.send_once(url, None).await?;
        response.text().await.map_err(|e| classify(url, e))
    }

    async fn bytes_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.send_once(url, Some(self.config.file_timeout)).await?;
        let body = response.bytes().await.map_err(|e| classify(url, e))?;
        Ok(body.to_vec())
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::parse(url, err.to_string())
    } else {
        FetchError::new(FetchErrorKind::Transient, url, err.to_string())
    }
}

fn log_retry(err: &FetchError, delay: Duration) {
    warn!(url = %err.url, error = %err, delay_ms = delay.as_millis() as u64, "Retrying request");
}

#[async_trait]
impl RemoteSource for HttpSession {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET (text)");
        (|| async { self.text_once(url).await })
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(FetchError::is_transient)
            .notify(log_retry)
            .await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url, "GET (bytes)");
        (|| async { self.bytes_once(url).await })
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(FetchError::is_transient)
            .notify(log_retry)
            .await
    }
}
