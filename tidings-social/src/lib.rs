//! Social network bridges used by Tidings.
//!
//! Currently only the tweet bridge is implemented. Its submodules cover the
//! login-free credential flow, the authenticated API client, the collection
//! pipeline, and the HTML renderer that turns raw tweet records into feed
//! items.
pub mod twitter;
