#![doc = "Object store integration for the CLI: bridges the core `MirrorStore` trait to an `object_store` backend (S3 in production)."]
//
//! # Store Integration (CLI <-> Core)
//!
//! - [`ObjectStoreMirror`] implements [`MirrorStore`] over any `object_store::ObjectStore`;
//!   [`ObjectStoreMirror::s3_from_env`] builds the S3 one from the standard `AWS_*`
//!   environment variables.
//! - Keys are taken verbatim (`Path::parse`), never percent-encoded, so the key a file
//!   is written under is exactly the key the next listing returns.
//! - The checksum of an object is its ETag with the surrounding quotes removed, which
//!   for single-part uploads is the hex MD5 of the content.
//! - [`read_uri`] loads a whole object for the report job from an `s3://` URL, a
//!   `file://` URL or a plain local path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bls_mirror_core::contract::{MirrorObject, MirrorStore, StoreError};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::sync::Arc;
use url::Url;

pub struct ObjectStoreMirror {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStoreMirror {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn s3_from_env(bucket: &str) -> Result<Self> {
        let s3 = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .with_context(|| format!("Failed to build S3 client for bucket {bucket}"))?;
        tracing::info!(bucket, "Initialized S3 mirror store from environment");
        Ok(Self::new(Arc::new(s3), bucket))
    }
}

fn checksum_of(meta: &ObjectMeta) -> String {
    meta.e_tag
        .as_deref()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

fn location(key: &str) -> Result<Path, StoreError> {
    Path::parse(key).map_err(|e| {
        tracing::error!(key, error = %e, "Key is not a valid object path");
        StoreError::access(key, e)
    })
}

fn store_error(key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::NotFound {
            key: key.to_string(),
        },
        other => StoreError::access(key, other),
    }
}

#[async_trait]
impl MirrorStore for ObjectStoreMirror {
    async fn list_objects(&self) -> Result<Vec<MirrorObject>, StoreError> {
        tracing::info!(bucket = %self.bucket, "Listing mirror bucket");
        let metas = self
            .store
            .list(None)
            .try_collect::<Vec<ObjectMeta>>()
            .await
            .map_err(|e| {
                tracing::error!(bucket = %self.bucket, error = %e, "Failed to list bucket");
                store_error(&self.bucket, e)
            })?;
        Ok(metas
            .iter()
            .map(|meta| MirrorObject {
                key: meta.location.to_string(),
                checksum: checksum_of(meta),
            })
            .collect())
    }

    async fn checksum(&self, key: &str) -> Result<String, StoreError> {
        match self.store.head(&location(key)?).await {
            Ok(meta) => Ok(checksum_of(&meta)),
            Err(e) => {
                tracing::error!(bucket = %self.bucket, key, error = %e, "Unexpected S3 access error reading checksum");
                Err(store_error(key, e))
            }
        }
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let size = body.len();
        self.store
            .put(&location(key)?, PutPayload::from(body))
            .await
            .map_err(|e| {
                tracing::error!(bucket = %self.bucket, key, error = %e, "Unexpected S3 write error");
                store_error(key, e)
            })?;
        tracing::debug!(bucket = %self.bucket, key, size, "Put object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(&location(key)?).await.map_err(|e| {
            tracing::error!(bucket = %self.bucket, key, error = %e, "Unexpected S3 delete error");
            store_error(key, e)
        })?;
        tracing::debug!(bucket = %self.bucket, key, "Deleted object");
        Ok(())
    }
}

fn aws_env_options() -> impl Iterator<Item = (String, String)> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("AWS_"))
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
}

/// Read a whole text object from an object-store URL or a local path.
pub async fn read_uri(uri: &str) -> Result<String> {
    let bytes: Vec<u8> = match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("Invalid file URL {uri}"))?;
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?
        }
        // Single-letter schemes are Windows drive letters, not URLs.
        Ok(url) if url.scheme().len() > 1 => {
            let (store, path) = object_store::parse_url_opts(&url, aws_env_options())
                .with_context(|| format!("Unsupported object store URL {uri}"))?;
            store
                .get(&path)
                .await
                .with_context(|| format!("Failed to fetch {uri}"))?
                .bytes()
                .await
                .with_context(|| format!("Failed to read body of {uri}"))?
                .to_vec()
        }
        _ => tokio::fs::read(uri)
            .await
            .with_context(|| format!("Failed to read {uri}"))?,
    };
    tracing::info!(uri, bytes = bytes.len(), "Loaded report input");
    String::from_utf8(bytes).with_context(|| format!("{uri} is not valid UTF-8"))
}
