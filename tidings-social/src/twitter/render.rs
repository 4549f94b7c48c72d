//! Turns raw tweet records into titles, cleaned HTML bodies, avatar and
//! media fragments, and enclosure lists.
//!
//! Every function takes `Option<&Tweet>` and renders the empty string for
//! `None` so an absent reply parent degrades silently.

use std::sync::LazyLock;

use regex::Regex;

use super::collect::RenderOptions;
use super::types::{ApiUser, Tweet};

/// Best-effort link-ifier for bare `scheme://...` substrings, used only when
/// a tweet carries no url/media entities at all.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:http|https|ftp|ftps)://[a-zA-Z0-9.-]+\.[a-zA-Z]{2,3}(?:/\S*)?")
        .expect("url pattern")
});

/// Remove all markup, keeping only text content.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Item title: markup stripped, truncated to 100 characters with an ellipsis
/// when truncation occurred.
pub fn title_from(full_text: &str) -> String {
    let stripped = strip_tags(full_text);
    let mut title: String = stripped.chars().take(100).collect();
    if stripped.chars().count() > 100 {
        title.push_str("...");
    }
    title
}

/// Cleaned HTML body of a tweet.
///
/// Retweets are prefixed with a linked `RT @originalAuthor:` marker and
/// rendered from the original tweet's text and entities. Short URLs from the
/// media/urls entity lists become anchors to their expanded targets; when no
/// entity list is present a regex fallback link-ifies bare URLs. Hashtags
/// and mentions always become search/profile links.
pub fn clean_tweet(tweet: Option<&Tweet>, base: &str) -> String {
    let Some(outer) = tweet else {
        return String::new();
    };

    let (tweet, mut text) = match &outer.retweeted_status {
        Some(original) => (
            original.as_ref(),
            format!(
                "RT <a href=\"{base}{handle}\">@{handle}</a>: {text}",
                handle = original.user.screen_name,
                text = original.full_text
            ),
        ),
        None => (outer, outer.full_text.clone()),
    };

    let mut replaced_urls = false;
    for media in &tweet.entities.media {
        if media.url.is_empty() {
            continue;
        }
        text = text.replace(
            &media.url,
            &format!(
                "<a href=\"{}\">{}</a>",
                media.expanded_url, media.display_url
            ),
        );
        replaced_urls = true;
    }
    for url in &tweet.entities.urls {
        if url.url.is_empty() {
            continue;
        }
        text = text.replace(
            &url.url,
            &format!("<a href=\"{}\">{}</a>", url.expanded_url, url.display_url),
        );
        replaced_urls = true;
    }
    if !replaced_urls {
        text = URL_PATTERN
            .replace_all(&text, |caps: &regex::Captures<'_>| {
                let url = &caps[0];
                format!("<a href=\"{url}\" target=\"_blank\">{url}</a>")
            })
            .into_owned();
    }

    for hashtag in &tweet.entities.hashtags {
        text = text.replace(
            &format!("#{}", hashtag.text),
            &format!(
                "<a href=\"{base}search?q=%23{tag}\">#{tag}</a>",
                tag = hashtag.text
            ),
        );
    }
    for mention in &tweet.entities.user_mentions {
        text = text.replace(
            &format!("@{}", mention.screen_name),
            &format!(
                "<a href=\"{base}{handle}\">@{handle}</a>",
                handle = mention.screen_name
            ),
        );
    }

    text
}

/// Linked profile-picture-plus-name markup for the author (and, for
/// retweets, the original author). Empty when avatars are hidden or for an
/// absent reply parent.
pub fn avatar_html(tweet: Option<&Tweet>, options: &RenderOptions, base: &str) -> String {
    let Some(tweet) = tweet else {
        return String::new();
    };
    if options.hide_avatars {
        return String::new();
    }

    let mut html = profile_link(&tweet.user, base);
    if let Some(original) = &tweet.retweeted_status {
        html.push_str(" / ");
        html.push_str(&profile_link(&original.user, base));
    }
    html
}

fn profile_link(user: &ApiUser, base: &str) -> String {
    format!(
        "<a href=\"{base}{handle}\"><img alt=\"{handle}\" src=\"{avatar}\" title=\"{name}\" /></a>\
         <a href=\"{base}{handle}\">{name} (@{handle}):</a>",
        handle = user.screen_name,
        avatar = user.profile_image_url_https,
        name = user.name
    )
}

/// Media markup for the (possibly de-referenced) original tweet, appending
/// every emitted URL to `enclosures`. Photos link the original-resolution
/// image; videos and animated gifs pick the highest-bitrate variant, first
/// max winning and missing bitrates ranking below zero. Unrecognized media
/// types are logged and skipped.
pub fn media_html(
    tweet: Option<&Tweet>,
    options: &RenderOptions,
    enclosures: &mut Vec<String>,
) -> String {
    let Some(outer) = tweet else {
        return String::new();
    };
    if options.hide_images {
        return String::new();
    }
    let tweet = outer.retweeted_status.as_deref().unwrap_or(outer);
    let Some(extended) = &tweet.extended_entities else {
        return String::new();
    };

    let mut html = String::new();
    for media in &extended.media {
        match media.kind.as_str() {
            "photo" => {
                let image = format!("{}?name=orig", media.media_url_https);
                let display_image = if options.no_image_scaling {
                    image.clone()
                } else {
                    media.media_url_https.clone()
                };
                enclosures.push(image.clone());
                html.push_str(&format!(
                    "<a href=\"{image}\"><img style=\"align:top; max-width:558px; \
                     border:1px solid black;\" referrerpolicy=\"no-referrer\" \
                     src=\"{display_image}\" /></a>"
                ));
            }
            "video" | "animated_gif" => {
                let Some(info) = &media.video_info else {
                    continue;
                };
                let mut max_bitrate = -1i64;
                let mut video: Option<&str> = None;
                for variant in &info.variants {
                    let bitrate = variant.bitrate.unwrap_or(-100);
                    if bitrate > max_bitrate {
                        max_bitrate = bitrate;
                        video = Some(&variant.url);
                    }
                }
                if let Some(video) = video {
                    enclosures.push(video.to_string());
                    enclosures.push(media.media_url_https.clone());
                    html.push_str(&format!(
                        "<a href=\"{link}\">Video</a><video controls \
                         style=\"align:top; max-width:558px; border:1px solid black;\" \
                         referrerpolicy=\"no-referrer\" src=\"{video}\" \
                         poster=\"{poster}\"></video>",
                        link = media.expanded_url,
                        poster = media.media_url_https
                    ));
                }
            }
            other => {
                tracing::debug!(media_type = other, "twitter.render.unsupported_media");
            }
        }
    }
    html
}

/// Simple layout wrapper: avatar, body, media, each in its own block.
pub fn layout_block(avatar: &str, body: &str, media: &str) -> String {
    format!(
        "<div style=\"display: block; vertical-align: top;\">{avatar}</div>\
         <div style=\"display: block; vertical-align: top;\"><p>{body}</p></div>\
         <div style=\"display: block; vertical-align: top;\"><p>{media}</p></div>"
    )
}
