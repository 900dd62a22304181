/// `load_config` module: reads the job configuration from the process environment and
/// adapts it into the core's typed config structs.
///
/// # Responsibilities
/// - Read required variables (`BUCKET`, `BLS_GOV_URL`, `DATAUSA_URL` for sync;
///   `S3_BLS_CSV_FILE`, `S3_DATAUSA_FILE` for report)
/// - Apply defaults for the optional ones (`DATASET_KEY`, `HTTP_USER_AGENT`,
///   `HTTP_MAX_RETRIES`)
/// - Fail with a message naming the variable when something is missing or malformed
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use bls_mirror_core::config::{SessionConfig, SyncConfig, DEFAULT_DATASET_KEY};
use std::env;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub sync: SyncConfig,
    pub session: SessionConfig,
}

/// Locations of the mirrored inputs read by the report job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSources {
    pub series_file: String,
    pub dataset_file: String,
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        Ok(_) => {
            error!(variable = name, "Environment variable is empty");
            Err(anyhow::anyhow!("Environment variable {name} is empty"))
        }
        Err(e) => {
            error!(variable = name, error = ?e, "Environment variable missing");
            Err(anyhow::anyhow!("Missing environment variable {name}: {e}"))
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_sync_settings() -> Result<SyncSettings> {
    let sync = SyncConfig {
        bucket: required("BUCKET")?,
        index_url: required("BLS_GOV_URL")?,
        dataset_url: required("DATAUSA_URL")?,
        dataset_key: optional("DATASET_KEY").unwrap_or_else(|| DEFAULT_DATASET_KEY.to_string()),
    };

    let mut session = SessionConfig::default();
    if let Some(agent) = optional("HTTP_USER_AGENT") {
        session.user_agent = agent;
    }
    if let Some(raw) = optional("HTTP_MAX_RETRIES") {
        session.max_retries = raw.parse().map_err(|e| {
            error!(error = ?e, raw = %raw, "Failed to parse HTTP_MAX_RETRIES");
            anyhow::anyhow!("HTTP_MAX_RETRIES must be a non-negative integer, got {raw:?}")
        })?;
    }

    sync.trace_loaded();
    info!("Sync configuration loaded from environment");
    Ok(SyncSettings { sync, session })
}

pub fn load_report_sources() -> Result<ReportSources> {
    let sources = ReportSources {
        series_file: required("S3_BLS_CSV_FILE")?,
        dataset_file: required("S3_DATAUSA_FILE")?,
    };
    info!(
        series_file = %sources.series_file,
        dataset_file = %sources.dataset_file,
        "Report sources loaded from environment"
    );
    Ok(sources)
}
