//! Directory-index listing: turns an HTML index page into the ordered set of files it
//! advertises.

use crate::contract::{RemoteEntry, RemoteSource, SyncError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("href pattern is valid")
});

/// Path of the directory an index URL lives in, with leading and trailing slash.
///
/// `https://host/pub/time.series/pr/` → `/pub/time.series/pr/`
pub fn namespace_of(index_url: &Url) -> String {
    let path = index_url.path();
    match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    }
}

fn hrefs(html: &str) -> impl Iterator<Item = &str> {
    HREF.captures_iter(html).filter_map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().trim())
    })
}

/// Parse an index page. Links that resolve into the index's own namespace (itself, its
/// parents, sort links) or onto another host are dropped; document order is kept.
pub fn parse_index(index_url: &str, html: &str) -> Result<Vec<RemoteEntry>, SyncError> {
    let base = Url::parse(index_url).map_err(|e| SyncError::InvalidUrl {
        url: index_url.to_string(),
        detail: e.to_string(),
    })?;
    let namespace = namespace_of(&base);

    let mut entries = Vec::new();
    for href in hrefs(html) {
        let Ok(resolved) = base.join(href) else {
            debug!(href, "Skipping unresolvable link");
            continue;
        };
        if resolved.host_str() != base.host_str() {
            debug!(href, "Skipping link to another host");
            continue;
        }
        let path = resolved.path();
        if namespace.starts_with(path) {
            debug!(href, "Skipping self/parent link");
            continue;
        }
        let name = match path.strip_prefix(namespace.as_str()) {
            Some(relative) => relative,
            None => path.rsplit('/').next().unwrap_or_default(),
        }
        .to_string();
        if name.is_empty() {
            continue;
        }
        let mut url = resolved;
        url.set_fragment(None);
        entries.push(RemoteEntry {
            name,
            url: url.to_string(),
        });
    }
    Ok(entries)
}

/// Fetch and parse the directory index through the shared session.
pub async fn fetch_listing<S>(source: &S, index_url: &str) -> Result<Vec<RemoteEntry>, SyncError>
where
    S: RemoteSource + ?Sized,
{
    info!(index_url, "[LISTING] Fetching directory index");
    let html = source.fetch_text(index_url).await?;
    let entries = parse_index(index_url, &html)?;
    info!(count = entries.len(), "[LISTING] Parsed directory index");
    Ok(entries)
}
