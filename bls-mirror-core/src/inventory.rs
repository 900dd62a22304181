use crate::contract::{MirrorObject, MirrorStore, StoreError};
use tracing::{debug, info};

/// Key used to compare a stored object against remote names: the `.csv` suffix added
/// on write is stripped. The stored key itself is never changed.
pub fn normalize_key(key: &str) -> &str {
    key.strip_suffix(".csv").unwrap_or(key)
}

/// Current contents of the mirror bucket, minus the reserved dataset object.
///
/// Always reads live store state; nothing is cached between runs.
pub async fn list_mirror<M>(store: &M, reserved_key: &str) -> Result<Vec<MirrorObject>, StoreError>
where
    M: MirrorStore + ?Sized,
{
    let objects: Vec<MirrorObject> = store
        .list_objects()
        .await?
        .into_iter()
        .filter(|object| object.key != reserved_key)
        .collect();
    debug!(keys = ?objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(), "[INVENTORY] Mirror keys");
    info!(count = objects.len(), "[INVENTORY] Listed mirror bucket");
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockMirrorStore;

    #[test]
    fn normalize_strips_only_trailing_csv() {
        assert_eq!(normalize_key("pr.class.csv"), "pr.class");
        assert_eq!(normalize_key("pr.txt"), "pr.txt");
        assert_eq!(normalize_key("a.csv.bak"), "a.csv.bak");
        assert_eq!(normalize_key("plain"), "plain");
    }

    #[tokio::test]
    async fn list_mirror_excludes_reserved_dataset_key() {
        let mut store = MockMirrorStore::new();
        store.expect_list_objects().times(1).returning(|| {
            Ok(vec![
                MirrorObject {
                    key: "datausa.json".into(),
                    checksum: "j".into(),
                },
                MirrorObject {
                    key: "pr.class.csv".into(),
                    checksum: "c".into(),
                },
            ])
        });

        let objects = list_mirror(&store, "datausa.json").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "pr.class.csv");
    }

    #[tokio::test]
    async fn list_mirror_propagates_store_failure() {
        let mut store = MockMirrorStore::new();
        store
            .expect_list_objects()
            .returning(|| Err(StoreError::access("<bucket>", "access denied")));

        assert!(list_mirror(&store, "datausa.json").await.is_err());
    }
}
