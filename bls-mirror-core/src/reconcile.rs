//! Three-way reconciliation of the remote listing against the mirror.
//!
//! Remote names and stored keys are compared after [`normalize_key`]; the partition is
//! rebuilt from live state on every run:
//!
//! - `to_delete`: stored objects whose normalized key no longer appears remotely
//! - `to_add`: remote entries with no stored counterpart
//! - `to_check`: remote entries already stored, whose content must be compared by
//!   checksum before deciding to rewrite

use crate::contract::{MirrorObject, RemoteEntry};
use crate::inventory::normalize_key;
use md5::{Digest, Md5};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub to_delete: Vec<MirrorObject>,
    pub to_add: Vec<RemoteEntry>,
    pub to_check: Vec<RemoteEntry>,
}

/// Key a remote file is stored under: `.txt` files keep their name, everything else is
/// stored with a single `.csv` suffix.
pub fn object_key(name: &str) -> String {
    if name.contains(".txt") {
        name.to_string()
    } else {
        format!("{}.csv", normalize_key(name))
    }
}

pub fn classify(remote: &[RemoteEntry], mirror: &[MirrorObject]) -> Classification {
    if mirror.is_empty() {
        return Classification {
            to_add: remote.to_vec(),
            ..Default::default()
        };
    }

    let remote_names: HashSet<&str> = remote.iter().map(|e| normalize_key(&e.name)).collect();
    let mirror_names: HashSet<&str> = mirror.iter().map(|o| normalize_key(&o.key)).collect();

    let to_delete: Vec<MirrorObject> = mirror
        .iter()
        .filter(|o| !remote_names.contains(normalize_key(&o.key)))
        .cloned()
        .collect();
    let deleted: HashSet<&str> = to_delete.iter().map(|o| normalize_key(&o.key)).collect();

    let (to_add, to_check): (Vec<RemoteEntry>, Vec<RemoteEntry>) = remote
        .iter()
        .filter(|e| !deleted.contains(normalize_key(&e.name)))
        .cloned()
        .partition(|e| !mirror_names.contains(normalize_key(&e.name)));

    Classification {
        to_delete,
        to_add,
        to_check,
    }
}

/// Key a retained entry is checked and rewritten under: its conventional key when the
/// mirror holds one, otherwise the stored key it matched (e.g. a legacy `v` for `v`).
pub fn stored_key(name: &str, mirror: &[MirrorObject]) -> String {
    let conventional = object_key(name);
    if mirror.iter().any(|o| o.key == conventional) {
        return conventional;
    }
    let normalized = normalize_key(name);
    mirror
        .iter()
        .find(|o| normalize_key(&o.key) == normalized)
        .map(|o| o.key.clone())
        .unwrap_or(conventional)
}

/// Hex MD5 of the content, comparable with an S3 single-part ETag.
pub fn content_checksum(content: &[u8]) -> String {
    format!("{:x}", Md5::digest(content))
}

fn clean(checksum: &str) -> &str {
    checksum.trim().trim_matches('"').trim()
}

/// Whether freshly fetched content differs from what the store holds.
///
/// A missing stored checksum counts as changed, so an unreadable object is rewritten
/// rather than left stale.
pub fn content_changed(remote_checksum: &str, stored_checksum: Option<&str>) -> bool {
    match stored_checksum {
        Some(stored) => !clean(remote_checksum).eq_ignore_ascii_case(clean(stored)),
        None => true,
    }
}
