//! Tweet bridge: tweets plus the tweet being replied to, for context.
//!
//! Submodules provide the credential manager (bearer key + guest token), the
//! API client wrapper with its single auth-retry, the collection pipeline
//! with its query modes and filter rules, the HTML renderer, and strongly
//! typed response models.
pub mod auth;
pub mod client;
pub mod collect;
pub mod render;
pub mod types;

pub use client::TwitterApi;
pub use collect::{Query, RenderOptions, TwitterBridge};

use tidings_common::BridgeInfo;

/// Public site the feed links point back to for names/URIs.
pub const SITE_URI: &str = "https://twitter.com/";
/// Alternative frontend used for item links and in-body anchors.
pub const LINK_URI: &str = "https://nitter.it/";
/// Fixed API base for all authenticated calls.
pub const API_URI: &str = "https://api.twitter.com";

/// A freshly issued guest token is good for this many credential fetches.
pub const GUEST_TOKEN_USES: i64 = 100;
/// Guest tokens (and the derived bearer key) expire after 3 hours.
pub const GUEST_TOKEN_EXPIRY: i64 = 10_800;
/// Suggested feed cache lifetime, in seconds.
pub const CACHE_TIMEOUT: u64 = 300;

pub const INFO: BridgeInfo = BridgeInfo {
    name: "Twitter with reply context",
    uri: SITE_URI,
    description: "Returns tweets and the tweet being replied to for context",
    cache_timeout: CACHE_TIMEOUT,
};
