//! High-level pipeline: orchestrates listing → inventory → reconcile → apply for the
//! directory mirror.
//!
//! # Responsibilities
//! - Fetch the remote index and the live mirror inventory, and classify them (see
//!   [`crate::reconcile`])
//! - Write new files unconditionally, rewrite retained files only when their checksum
//!   changed, delete files that disappeared remotely
//! - Retained files are checked and rewritten under the key they are already stored at
//! - Aggregate and return a [`SyncReport`] of what happened
//!
//! # Error Handling
//! Fetch failures (after the session's retries) and a failed inventory listing abort the
//! run. Individual put/delete failures are logged, recorded in
//! [`SyncReport::failures`], and do not stop the remaining entries. A failed checksum
//! read is treated as a change, so the object gets rewritten.
//!
//! # Concurrency
//! Every fetch and store call is awaited in turn; nothing runs in parallel. Two runs
//! racing on the same bucket are not guarded against.

use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::contract::{MirrorStore, RemoteEntry, RemoteSource, SyncError};
use crate::inventory::list_mirror;
use crate::listing::fetch_listing;
use crate::reconcile::{classify, content_changed, content_checksum, object_key, stored_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Put,
    Delete,
    Checksum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOperation {
    pub key: String,
    pub operation: StoreOperation,
    pub detail: String,
}

/// Outcome of one sync run, by stored object key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<FailedOperation>,
}

impl SyncReport {
    pub fn writes(&self) -> usize {
        self.added.len() + self.updated.len()
    }

    fn record_failure(&mut self, key: &str, operation: StoreOperation, detail: impl ToString) {
        self.failures.push(FailedOperation {
            key: key.to_string(),
            operation,
            detail: detail.to_string(),
        });
    }
}

/// Entrypoint: bring the mirror bucket in line with the remote directory index.
pub async fn synchronise<S, M>(
    source: &S,
    store: &M,
    config: &SyncConfig,
) -> Result<SyncReport, SyncError>
where
    S: RemoteSource + ?Sized,
    M: MirrorStore + ?Sized,
{
    info!(index_url = %config.index_url, bucket = %config.bucket, "[SYNC] Starting directory synchronisation");

    let remote = fetch_listing(source, &config.index_url).await?;
    let mirror = list_mirror(store, &config.dataset_key).await?;
    let plan = classify(&remote, &mirror);
    info!(
        to_add = plan.to_add.len(),
        to_check = plan.to_check.len(),
        to_delete = plan.to_delete.len(),
        "[SYNC] Classified remote listing against mirror"
    );
    debug!(?plan, "[SYNC] Full classification");

    let mut report = SyncReport::default();

    for entry in &plan.to_add {
        let key = object_key(&entry.name);
        info!(name = %entry.name, key = %key, "[SYNC][ADD] Adding new file");
        let content = source.fetch_bytes(&entry.url).await?;
        if put(store, &key, content, &mut report).await {
            report.added.push(key);
        }
    }

    for entry in &plan.to_check {
        let key = stored_key(&entry.name, &mirror);
        check_and_update(source, store, entry, key, &mut report).await?;
    }

    for object in &plan.to_delete {
        info!(key = %object.key, "[SYNC][DELETE] Removing file no longer listed remotely");
        match store.delete_object(&object.key).await {
            Ok(()) => report.deleted.push(object.key.clone()),
            Err(e) => {
                error!(key = %object.key, error = %e, "[SYNC][ERROR][DELETE] Delete failed");
                report.record_failure(&object.key, StoreOperation::Delete, e);
            }
        }
    }

    info!(
        added = report.added.len(),
        updated = report.updated.len(),
        unchanged = report.unchanged.len(),
        deleted = report.deleted.len(),
        failures = report.failures.len(),
        "[SYNC] Directory synchronisation complete"
    );
    Ok(report)
}

async fn check_and_update<S, M>(
    source: &S,
    store: &M,
    entry: &RemoteEntry,
    key: String,
    report: &mut SyncReport,
) -> Result<(), SyncError>
where
    S: RemoteSource + ?Sized,
    M: MirrorStore + ?Sized,
{
    let content = source.fetch_bytes(&entry.url).await?;
    let remote_checksum = content_checksum(&content);

    let stored_checksum = match store.checksum(&key).await {
        Ok(checksum) => Some(checksum),
        Err(e) => {
            warn!(key = %key, error = %e, "[SYNC][CHECK] Stored checksum unavailable, rewriting");
            report.record_failure(&key, StoreOperation::Checksum, e);
            None
        }
    };

    if !content_changed(&remote_checksum, stored_checksum.as_deref()) {
        debug!(key = %key, checksum = %remote_checksum, "[SYNC][CHECK] Unchanged");
        report.unchanged.push(key);
        return Ok(());
    }

    info!(
        key = %key,
        remote = %remote_checksum,
        stored = stored_checksum.as_deref().unwrap_or("<none>"),
        "[SYNC][UPDATE] Checksum mismatch, rewriting"
    );
    if put(store, &key, content, report).await {
        report.updated.push(key);
    }
    Ok(())
}

async fn put<M>(store: &M, key: &str, content: Vec<u8>, report: &mut SyncReport) -> bool
where
    M: MirrorStore + ?Sized,
{
    let size = content.len();
    match store.put_object(key, content).await {
        Ok(()) => {
            debug!(key, size, "[SYNC][PUT] Object written");
            true
        }
        Err(e) => {
            error!(key, error = %e, "[SYNC][ERROR][PUT] Write failed");
            report.record_failure(key, StoreOperation::Put, e);
            false
        }
    }
}
