//! # contract: the two seams every sync operation goes through
//!
//! The pipeline only talks to the outside world through [`RemoteSource`] (HTTP fetches)
//! and [`MirrorStore`] (the object store holding the mirror). Concrete clients live in
//! [`crate::session`] and in the CLI crate; tests plug in the generated mocks or an
//! in-memory fake.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, exported when the `test-export-mocks`
//!   feature is on so integration tests in other crates can use them.
//!
//! ## Errors
//! - Fetch failures are [`FetchError`] values carrying a [`FetchErrorKind`], never panics.
//! - Store failures are [`StoreError`]; callers decide which of them are fatal.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A file advertised by the remote directory index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Path relative to the index's namespace, e.g. `pr.data.0.Current`.
    pub name: String,
    /// Fully qualified URL of the file.
    pub url: String,
}

/// An object currently stored in the mirror bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorObject {
    /// Stored key, suffix included.
    pub key: String,
    /// Store-reported content hash (ETag) as of listing.
    pub checksum: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    #[error("transient network failure")]
    Transient,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("malformed response")]
    Parse,
}

/// Failure of a single outbound request, after the session's retries.
#[derive(Debug, Clone, Error)]
#[error("{kind} fetching {url}: {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub url: String,
    pub detail: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            detail: detail.into(),
        }
    }

    pub fn parse(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Parse, url, detail)
    }

    /// Whether the shared retry policy should try this request again.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            FetchErrorKind::Transient => true,
            FetchErrorKind::Status(code) => matches!(code, 429 | 502 | 503 | 504),
            FetchErrorKind::Parse => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("object {key} not found")]
    NotFound { key: String },
    #[error("store access failed for {key}: {detail}")]
    Access { key: String, detail: String },
}

impl StoreError {
    pub fn access(key: impl Into<String>, detail: impl ToString) -> Self {
        StoreError::Access {
            key: key.into(),
            detail: detail.to_string(),
        }
    }
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to list mirror: {0}")]
    Store(#[from] StoreError),
    #[error("invalid index URL {url}: {detail}")]
    InvalidUrl { url: String, detail: String },
}

/// Outbound HTTP access, shared by every fetch-performing component.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch a small text resource such as a directory index or a JSON document.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch a remote file in full, used both for hashing and as the write payload.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// The object store holding the mirror. Calls are not retried at this layer.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// List every object in the bucket with its current checksum.
    async fn list_objects(&self) -> Result<Vec<MirrorObject>, StoreError>;

    /// Read the checksum of a single object from its metadata.
    async fn checksum(&self, key: &str) -> Result<String, StoreError>;

    /// Create or overwrite an object.
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    async fn delete_object(&self, key: &str) -> Result<(), StoreError>;
}
