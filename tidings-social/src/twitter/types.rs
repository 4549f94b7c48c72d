//! Strongly typed records for the platform's v1.1 extended-mode payloads.
//!
//! Responses are decoded into these records up front so missing required
//! fields fail fast as decode errors instead of surfacing as panics deep in
//! the pipeline. Optional fields default so that any subset of entity lists
//! may be absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    pub id_str: String,
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_image_url_https: String,
    /// The platform reports pinned tweets as an array of id strings; the
    /// single pinned tweet is the first entry.
    #[serde(default)]
    pub pinned_tweet_ids_str: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id_str: String,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub user: ApiUser,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub extended_entities: Option<ExtendedEntities>,
    #[serde(default)]
    pub in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<String>,
    #[serde(default)]
    pub retweeted_status: Option<Box<Tweet>>,
}

impl Tweet {
    /// Numeric id used for the final descending sort. Ids are 64-bit
    /// snowflakes; anything unparseable sorts last.
    pub fn numeric_id(&self) -> u64 {
        self.id_str.parse().unwrap_or(0)
    }

    /// Id of the tweet this one replies to, if any.
    pub fn reply_target(&self) -> Option<&str> {
        self.in_reply_to_status_id_str
            .as_deref()
            .filter(|id| !id.is_empty())
    }

    /// Both reply-id fields count as equivalent presence markers.
    pub fn has_reply_target(&self) -> bool {
        self.in_reply_to_status_id.is_some() || self.reply_target().is_some()
    }

    /// Parse the v1.1 `created_at` format (`Wed Oct 10 20:19:24 +0000 2018`).
    pub fn parsed_created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default)]
    pub user_mentions: Vec<MentionEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlEntity {
    /// Short URL as it appears in the tweet text.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded_url: String,
    #[serde(default)]
    pub display_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionEntity {
    pub screen_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntity {
    /// Short URL as it appears in the tweet text.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expanded_url: String,
    #[serde(default)]
    pub display_url: String,
    #[serde(default)]
    pub media_url_https: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub variants: Vec<VideoVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoVariant {
    #[serde(default)]
    pub bitrate: Option<i64>,
    #[serde(default)]
    pub content_type: String,
    pub url: String,
}

/// Envelope returned by the search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub statuses: Vec<Tweet>,
}
