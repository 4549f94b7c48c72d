//! Common types shared across Tidings crates.
//!
//! This crate defines the feed item model every bridge produces, the shared
//! error taxonomy, bridge metadata, and the centralised tracing
//! initialisation. It is intentionally lightweight and dependency-minimal so
//! that all crates can depend on it without introducing heavy transitive
//! costs.
//!
//! # Overview
//!
//! - [`FeedItem`]: the uniform output unit handed to feed serializers
//! - [`BridgeError`] and [`Result`]: shared error handling
//! - [`BridgeInfo`]: static metadata a bridge exposes to its host
//! - [`observability`]: centralised tracing/logging initialisation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod observability;

/// A single extracted content item.
///
/// Bridges create one `FeedItem` per qualifying tweet or article snippet and
/// never update it afterwards. Ordering among items is the bridge's contract
/// (the tweet bridge sorts by descending numeric id).
///
/// ```
/// use tidings_common::FeedItem;
///
/// let item = FeedItem {
///     id: "1234".into(),
///     uri: "https://example.org/1234".into(),
///     title: "hello".into(),
///     ..FeedItem::default()
/// };
/// assert!(item.enclosures.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub uri: String,
    pub title: String,
    /// Display author, e.g. `Alice (@alice)`. Absent for article snippets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Rendered HTML body.
    pub content: String,
    /// Media URLs attached for client-side rendering/download, in emit order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub enclosures: Vec<String>,
}

/// Static metadata a bridge exposes to its host framework.
#[derive(Debug, Clone, Copy)]
pub struct BridgeInfo {
    pub name: &'static str,
    pub uri: &'static str,
    pub description: &'static str,
    /// Suggested cache lifetime for collected feeds, in seconds.
    pub cache_timeout: u64,
}

/// Error types used across the Tidings system.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// Token bootstrap is impossible and no fallback value exists.
    #[error("credential error: {0}")]
    Credential(String),

    /// Transport or API failure, terminal for this invocation.
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },

    /// Unknown user or list.
    #[error("not found: {0}")]
    NotFound(String),

    /// A search produced no results.
    #[error("no results: {0}")]
    NoResults(String),

    /// An expected DOM region is missing from a fetched page.
    #[error("content not found: {0}")]
    ContentNotFound(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The cache collaborator failed to load or save a slot.
    #[error("cache error: {0}")]
    Cache(String),

    /// A response did not decode into the expected record.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Convenient alias for results that use [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_item_serializes_without_empty_optionals() {
        let item = FeedItem {
            id: "1".into(),
            uri: "https://example.org/1".into(),
            title: "t".into(),
            ..FeedItem::default()
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("author").is_none());
        assert!(json.get("enclosures").is_none());
    }

    #[test]
    fn error_display_includes_status() {
        let err = BridgeError::Http {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "http error 403: forbidden");
    }
}
