use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{debug, info};

/// Key the JSON dataset is mirrored under; excluded from directory reconciliation.
pub const DEFAULT_DATASET_KEY: &str = "datausa.json";

pub const DEFAULT_USER_AGENT: &str = "Agent/1.0 (https://stmarkssolutions.com)";

/// Everything the sync job needs to know about where to read from and write to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub bucket: String,
    /// Directory index to mirror.
    pub index_url: String,
    /// JSON dataset mirrored verbatim.
    pub dataset_url: String,
    pub dataset_key: String,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            index_url = %self.index_url,
            dataset_url = %self.dataset_url,
            dataset_key = %self.dataset_key,
            "Loaded SyncConfig"
        );
    }
}

/// Settings applied uniformly to every outbound HTTP request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub user_agent: String,
    /// Retries after the first attempt; only transient failures are retried.
    pub max_retries: usize,
    /// Delay before the first retry, doubled on each subsequent one.
    pub backoff_base: Duration,
    /// Per-request timeout for file downloads.
    pub file_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            file_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    pub fn trace_loaded(&self) {
        info!(
            user_agent = %self.user_agent,
            max_retries = self.max_retries,
            "Loaded SessionConfig"
        );
        debug!(?self, "SessionConfig loaded (full debug)");
    }
}

/// Filters used by the report job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportParams {
    pub from_year: i32,
    pub to_year: i32,
    pub series_id: String,
    pub period: String,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            from_year: 2013,
            to_year: 2018,
            series_id: "PRS30006032".to_string(),
            period: "Q01".to_string(),
        }
    }
}

impl ReportParams {
    pub fn years(&self) -> RangeInclusive<i32> {
        self.from_year..=self.to_year
    }

    pub fn trace_loaded(&self) {
        info!(
            from_year = self.from_year,
            to_year = self.to_year,
            series_id = %self.series_id,
            period = %self.period,
            "Loaded ReportParams"
        );
    }
}
