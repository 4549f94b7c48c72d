//! Web page extraction bridges used by Tidings.
//!
//! Currently only the Wikipedia bridge is implemented: featured-article and
//! did-you-know snippets from localized homepages, with optional dereference
//! into the full article body.
pub mod wikipedia;
