//! Mirrors a single JSON dataset into the store. No diffing: the `data` payload is
//! always rewritten.

use crate::contract::{FetchError, MirrorStore, RemoteSource, SyncError};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    pub key: String,
    pub bytes: usize,
    pub written: bool,
}

/// Extract the `data` member of a dataset response, re-serialized compactly with its
/// member order intact.
pub fn extract_payload(url: &str, body: &str) -> Result<String, FetchError> {
    let document: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::parse(url, e.to_string()))?;
    let data = document
        .get("data")
        .ok_or_else(|| FetchError::parse(url, "response has no `data` member"))?;
    serde_json::to_string(data).map_err(|e| FetchError::parse(url, e.to_string()))
}

pub async fn mirror_dataset<S, M>(
    source: &S,
    store: &M,
    url: &str,
    key: &str,
) -> Result<DatasetReport, SyncError>
where
    S: RemoteSource + ?Sized,
    M: MirrorStore + ?Sized,
{
    info!(url, key, "[DATASET] Fetching dataset");
    let body = source.fetch_text(url).await?;
    let payload = extract_payload(url, &body)?;
    debug!(payload = %payload, "[DATASET] Extracted payload");

    let bytes = payload.len();
    let written = match store.put_object(key, payload.into_bytes()).await {
        Ok(()) => {
            info!(key, bytes, "[DATASET] Dataset written");
            true
        }
        Err(e) => {
            error!(key, error = %e, "[DATASET][ERROR] Dataset write failed");
            false
        }
    };
    Ok(DatasetReport {
        key: key.to_string(),
        bytes,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{FetchErrorKind, MockMirrorStore, MockRemoteSource, StoreError};
    use mockall::predicate::eq;

    const URL: &str = "https://datausa.io/api/data?drilldowns=Nation&measures=Population";

    #[test]
    fn payload_is_the_data_member() {
        let body = r#"{"data":[{"Year":"2019","Population":328239523}],"source":[{"name":"acs"}]}"#;
        let payload = extract_payload(URL, body).unwrap();
        assert_eq!(payload, r#"[{"Year":"2019","Population":328239523}]"#);
    }

    #[test]
    fn payload_keeps_member_order_and_drops_whitespace() {
        let body = r#"{"data": [
            {"ID Nation": "01000US", "Nation": "United States", "ID Year": 2019, "Year": "2019", "Population": 328239523},
            {"Zeta": 1, "Alpha": {"b": 2, "a": 1}}
        ]}"#;
        let payload = extract_payload(URL, body).unwrap();
        assert_eq!(
            payload,
            r#"[{"ID Nation":"01000US","Nation":"United States","ID Year":2019,"Year":"2019","Population":328239523},{"Zeta":1,"Alpha":{"b":2,"a":1}}]"#
        );
    }

    #[test]
    fn malformed_or_missing_data_is_a_parse_error() {
        let err = extract_payload(URL, "<html>").unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Parse);
        let err = extract_payload(URL, r#"{"source":[]}"#).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Parse);
    }

    #[tokio::test]
    async fn dataset_is_always_overwritten() {
        let mut source = MockRemoteSource::new();
        source
            .expect_fetch_text()
            .returning(|_| Ok(r#"{"data":[1,2,3]}"#.to_string()));
        let mut store = MockMirrorStore::new();
        store
            .expect_put_object()
            .with(eq("datausa.json"), eq(b"[1,2,3]".to_vec()))
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_checksum().never();

        let report = mirror_dataset(&source, &store, URL, "datausa.json").await.unwrap();
        assert!(report.written);
        assert_eq!(report.bytes, 7);
    }

    #[tokio::test]
    async fn write_failure_is_reported_not_fatal() {
        let mut source = MockRemoteSource::new();
        source
            .expect_fetch_text()
            .returning(|_| Ok(r#"{"data":{}}"#.to_string()));
        let mut store = MockMirrorStore::new();
        store
            .expect_put_object()
            .returning(|key, _| Err(StoreError::access(key, "access denied")));

        let report = mirror_dataset(&source, &store, URL, "datausa.json").await.unwrap();
        assert!(!report.written);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let mut source = MockRemoteSource::new();
        source.expect_fetch_text().returning(|url| {
            Err(FetchError::new(FetchErrorKind::Status(500), url, "server error"))
        });
        let store = MockMirrorStore::new();

        let err = mirror_dataset(&source, &store, URL, "datausa.json").await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(_)));
    }
}
