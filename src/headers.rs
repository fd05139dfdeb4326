//! Captured-header store and whitelist pruning
//!
//! The reservation API only accepts calls that look like continuations of a
//! genuine browser session, so the monitor captures the headers of real
//! browser traffic and replays a whitelisted subset on every direct call.
//! [`HeaderStore`] is the single piece of state shared between a monitor
//! and all of its check-in workers: writes replace the whole set
//! atomically, reads hand out snapshot copies.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::browser::CapturedRequest;

/// Header names replayed verbatim on direct API calls, matched
/// case-insensitively
pub const WHITELISTED_HEADERS: &[&str] = &[
    "user-agent",
    "x-api-key",
    "x-channel-id",
    "x-user-experience-id",
];

/// Prefix of the provider's short-named anti-bot header family
pub const PROVIDER_HEADER_PREFIX: &str = "ee30zvqlwf-";

/// True when a captured header name survives pruning
fn is_whitelisted(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    WHITELISTED_HEADERS.contains(&lower.as_str()) || lower.starts_with(PROVIDER_HEADER_PREFIX)
}

/// Prune a captured header list down to the whitelist
///
/// Unknown names (cookies included) are dropped silently; names that do not
/// form valid header values are skipped with a warning. Later occurrences
/// of the same name overwrite earlier ones, so the freshest capture wins.
pub fn prune_headers(captured: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in captured {
        if !is_whitelisted(name) {
            continue;
        }

        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "Skipping captured header with invalid bytes");
            }
        }
    }

    headers
}

/// Prune the headers of every captured request, in capture order
pub fn prune_captured(requests: &[CapturedRequest]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for request in requests {
        headers.extend(prune_headers(&request.headers));
    }
    headers
}

/// Shared store for the current outbound header set
///
/// `replace` swaps the whole mapping in one write; `snapshot` returns a
/// copy, so no caller ever observes a partially updated set.
#[derive(Debug, Default)]
pub struct HeaderStore {
    inner: RwLock<HeaderMap>,
}

impl HeaderStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Atomically replace the stored header set
    pub async fn replace(&self, headers: HeaderMap) {
        let mut guard = self.inner.write().await;
        *guard = headers;
    }

    /// Snapshot copy of the current header set
    pub async fn snapshot(&self) -> HeaderMap {
        self.inner.read().await.clone()
    }

    /// True before the first capture has been stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured_pairs() -> Vec<(String, String)> {
        [
            ("Host", "test_host"),
            ("User-Agent", "test_agent"),
            ("Accept", "test_accept"),
            ("Referer", "test_referer"),
            ("X-API-Key", "test_key"),
            ("X-Channel-ID", "test_channel_id"),
            ("X-User-Experience-ID", "test_ux_id"),
            ("Content-Type", "test_content"),
            ("EE30zvQLWf-f", "test_f"),
            ("EE30zvQLWf-b", "test_b"),
            ("Cookie", "test_cookie"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_prune_keeps_only_whitelisted() {
        let headers = prune_headers(&captured_pairs());

        assert_eq!(headers.len(), 6);
        assert_eq!(headers.get("User-Agent").unwrap(), "test_agent");
        assert_eq!(headers.get("X-API-Key").unwrap(), "test_key");
        assert_eq!(headers.get("X-Channel-ID").unwrap(), "test_channel_id");
        assert_eq!(headers.get("X-User-Experience-ID").unwrap(), "test_ux_id");
        assert_eq!(headers.get("EE30zvQLWf-f").unwrap(), "test_f");
        assert_eq!(headers.get("EE30zvQLWf-b").unwrap(), "test_b");
    }

    #[test]
    fn test_prune_drops_cookie() {
        let headers = prune_headers(&captured_pairs());
        assert!(!headers.contains_key("Cookie"));
        assert!(!headers.contains_key("Host"));
        assert!(!headers.contains_key("Referer"));
    }

    #[test]
    fn test_prune_is_case_insensitive() {
        let captured = vec![
            ("USER-AGENT".to_string(), "agent".to_string()),
            ("ee30zvqlwf-z".to_string(), "z".to_string()),
        ];

        let headers = prune_headers(&captured);
        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key("user-agent"));
        assert!(headers.contains_key("ee30zvqlwf-z"));
    }

    #[test]
    fn test_prune_later_capture_wins() {
        let captured = vec![
            ("X-API-Key".to_string(), "stale".to_string()),
            ("X-API-Key".to_string(), "fresh".to_string()),
        ];

        let headers = prune_headers(&captured);
        assert_eq!(headers.get("X-API-Key").unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_store_replace_is_wholesale() {
        let store = HeaderStore::new();
        assert!(store.is_empty().await);

        let mut first = HeaderMap::new();
        first.insert("x-api-key", HeaderValue::from_static("one"));
        first.insert("x-channel-id", HeaderValue::from_static("chan"));
        store.replace(first).await;

        let mut second = HeaderMap::new();
        second.insert("x-api-key", HeaderValue::from_static("two"));
        store.replace(second).await;

        // Replaced wholesale, never merged field-by-field
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("x-api-key").unwrap(), "two");
        assert!(!snapshot.contains_key("x-channel-id"));
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_copy() {
        let store = HeaderStore::new();
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("one"));
        store.replace(headers).await;

        let snapshot = store.snapshot().await;
        store.replace(HeaderMap::new()).await;

        assert_eq!(snapshot.get("x-api-key").unwrap(), "one");
        assert!(store.is_empty().await);
    }
}
