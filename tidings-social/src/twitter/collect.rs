//! Collection pipeline: per-mode fetch, reply-context assembly, filter
//! rules, item building, final sort.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tidings_common::{BridgeError, FeedItem, Result};

use super::client::TwitterApi;
use super::render;
use super::types::{ApiUser, SearchResponse, Tweet};
use super::{LINK_URI, SITE_URI};

/// Query mode. Closed and exhaustive: an unrecognized mode is a fatal input
/// error at the parameter layer, there is no default fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Keyword or #hashtag search.
    Keyword { query: String },
    /// A single user's timeline.
    Username {
        username: String,
        /// Only return initial tweets (`norep`).
        no_replies: bool,
        /// Disable fetching and showing the tweet being replied to
        /// (`noreplycontext`).
        no_reply_context: bool,
        /// Hide retweets (`noretweet`).
        no_retweets: bool,
        /// Hide the pinned tweet (`nopinned`).
        no_pinned: bool,
    },
    /// A list by owner and name.
    List {
        owner: String,
        name: String,
        filter: Option<String>,
    },
    /// A list by numeric id.
    ListId { id: String, filter: Option<String> },
}

impl Query {
    /// Fail fast on missing required parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Query::Keyword { query } if query.is_empty() => {
                Err(BridgeError::MissingParameter("q"))
            }
            Query::Username { username, .. } if username.is_empty() => {
                Err(BridgeError::MissingParameter("u"))
            }
            Query::List { owner, .. } if owner.is_empty() => {
                Err(BridgeError::MissingParameter("user"))
            }
            Query::List { name, .. } if name.is_empty() => {
                Err(BridgeError::MissingParameter("list"))
            }
            Query::ListId { id, .. } if id.is_empty() => {
                Err(BridgeError::MissingParameter("listid"))
            }
            _ => Ok(()),
        }
    }

    fn filter_term(&self) -> Option<&str> {
        match self {
            Query::List { filter, .. } | Query::ListId { filter, .. } => {
                filter.as_deref().filter(|f| !f.is_empty())
            }
            _ => None,
        }
    }
}

/// Global rendering flags shared by every query mode.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Hide profile pictures in content (`nopic`).
    pub hide_avatars: bool,
    /// Hide images in tweets (`noimg`).
    pub hide_images: bool,
    /// Keep the original image instead of the scaled preview
    /// (`noimgscaling`).
    pub no_image_scaling: bool,
}

/// Feed title for a query, matching the host's naming conventions.
pub fn feed_name(query: &Query) -> String {
    match query {
        Query::Keyword { query } => format!("Twitter search {query}"),
        Query::Username { username, .. } => format!("Twitter @{username}"),
        Query::List { owner, name, .. } => format!("{name} - Twitter list by {owner}"),
        Query::ListId { id, .. } => format!("Twitter List #{id}"),
    }
}

/// Public URI a feed for this query points back to.
pub fn feed_uri(query: &Query) -> String {
    match query {
        Query::Keyword { query } => format!(
            "{SITE_URI}search?q={}&f=tweets",
            urlencoding::encode(query)
        ),
        // Always link the profile without replies.
        Query::Username { username, .. } => {
            format!("{SITE_URI}{}", urlencoding::encode(username))
        }
        Query::List { owner, name, .. } => format!(
            "{SITE_URI}{}/lists/{}",
            urlencoding::encode(owner),
            name.to_lowercase().replace(' ', "-")
        ),
        Query::ListId { id, .. } => format!("{SITE_URI}i/lists/{}", urlencoding::encode(id)),
    }
}

static DETECT_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?twitter\.com/search.*[?&]q=([^/&?\n]+)")
        .expect("detect pattern")
});
static DETECT_HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?twitter\.com/hashtag/([^/?\n]+)").expect("detect pattern")
});
static DETECT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?twitter\.com/([^/?\n]+)/lists/([^/?\n]+)")
        .expect("detect pattern")
});
static DETECT_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?twitter\.com/([^/?\n]+)").expect("detect pattern")
});

/// Derive a query from a pasted site URL, if it matches a known form.
pub fn detect_parameters(url: &str) -> Option<Query> {
    let decode = |raw: &str| {
        urlencoding::decode(raw)
            .map(|cow| cow.into_owned())
            .unwrap_or_else(|_| raw.to_string())
    };

    if let Some(caps) = DETECT_SEARCH.captures(url) {
        return Some(Query::Keyword {
            query: decode(&caps[1]),
        });
    }
    if let Some(caps) = DETECT_HASHTAG.captures(url) {
        return Some(Query::Keyword {
            query: decode(&caps[1]),
        });
    }
    if let Some(caps) = DETECT_LIST.captures(url) {
        return Some(Query::List {
            owner: decode(&caps[1]),
            name: decode(&caps[2]),
            filter: None,
        });
    }
    if let Some(caps) = DETECT_USER.captures(url) {
        return Some(Query::Username {
            username: decode(&caps[1]),
            no_replies: false,
            no_reply_context: false,
            no_retweets: false,
            no_pinned: false,
        });
    }
    None
}

/// The tweet bridge: orchestrates fetch, filtering, rendering, and ordering.
pub struct TwitterBridge {
    api: TwitterApi,
    options: RenderOptions,
}

impl TwitterBridge {
    pub fn new(api: TwitterApi, options: RenderOptions) -> Self {
        Self { api, options }
    }

    /// Collect the ordered item list for `query`.
    pub async fn collect(&self, query: &Query) -> Result<Vec<FeedItem>> {
        query.validate()?;

        let (user, raw) = self.fetch(query).await?;

        // Search results repeat the canonical tweet for retweets; drop the
        // wrapper so only the original shows up.
        let tweets: Vec<Tweet> = raw
            .into_iter()
            .filter(|tweet| match query {
                Query::Keyword { .. } => {
                    !(tweet.retweeted_status.is_some() && tweet.full_text.starts_with("RT @"))
                }
                _ => true,
            })
            .collect();

        let suppress_context = matches!(
            query,
            Query::Username {
                no_reply_context: true,
                ..
            }
        );
        let reply_parents = if suppress_context {
            HashMap::new()
        } else {
            self.fetch_reply_parents(&tweets).await?
        };

        let pinned_id: Option<String> = match query {
            Query::Username {
                no_pinned: true, ..
            } => user
                .as_ref()
                .and_then(|u| u.pinned_tweet_ids_str.first().cloned()),
            _ => None,
        };

        let mut items = Vec::new();
        for tweet in &tweets {
            // Own retweets are pure duplicates of the original.
            if let Some(original) = &tweet.retweeted_status {
                if original.user.id_str == tweet.user.id_str {
                    continue;
                }
            }

            if let Some(pinned) = &pinned_id {
                if tweet.id_str == *pinned {
                    continue;
                }
            }

            if let Query::Username {
                no_replies: true, ..
            } = query
            {
                if tweet.has_reply_target() {
                    continue;
                }
            }

            // Identity redirection: a retweet's item belongs to the original
            // tweet and its author, which is what the de-dup and noretweet
            // comparisons run against.
            let display: &Tweet = tweet.retweeted_status.as_deref().unwrap_or(tweet);

            let parent = tweet
                .reply_target()
                .and_then(|id| reply_parents.get(id));

            let cleaned = render::clean_tweet(Some(tweet), LINK_URI);
            let cleaned_parent = render::clean_tweet(parent, LINK_URI);

            // List filtering runs on the cleaned text.
            if let Some(term) = query.filter_term() {
                if !cleaned.to_lowercase().contains(&term.to_lowercase()) {
                    continue;
                }
            }

            if let Query::Username {
                no_retweets: true,
                username,
                ..
            } = query
            {
                if !display.user.screen_name.eq_ignore_ascii_case(username) {
                    continue;
                }
            }

            let mut enclosures = Vec::new();
            let avatar = render::avatar_html(Some(tweet), &self.options, LINK_URI);
            let avatar_parent = render::avatar_html(parent, &self.options, LINK_URI);
            let media = render::media_html(Some(tweet), &self.options, &mut enclosures);
            let media_parent = render::media_html(parent, &self.options, &mut enclosures);

            let mut content = String::new();
            if parent.is_some() {
                content.push_str(&render::layout_block(
                    &avatar_parent,
                    &cleaned_parent,
                    &media_parent,
                ));
            }
            content.push_str(&render::layout_block(&avatar, &cleaned, &media));

            items.push(FeedItem {
                id: display.id_str.clone(),
                uri: format!(
                    "{LINK_URI}{}/status/{}",
                    display.user.screen_name, display.id_str
                ),
                title: render::title_from(&tweet.full_text),
                author: Some(format!(
                    "{} (@{})",
                    display.user.name, display.user.screen_name
                )),
                timestamp: tweet.parsed_created_at(),
                content,
                enclosures,
            });
        }

        // Newest first; ids are globally unique so ties are not expected.
        items.sort_by_key(|item| std::cmp::Reverse(numeric_id(&item.id)));
        tracing::info!(
            mode = mode_label(query),
            items = items.len(),
            "twitter.collect.done"
        );
        Ok(items)
    }

    /// Per-mode fetch. Empty raw results map to mode-specific user-facing
    /// errors; the resolved user record is kept for pinned-tweet lookup.
    async fn fetch(&self, query: &Query) -> Result<(Option<ApiUser>, Vec<Tweet>)> {
        match query {
            Query::Username { username, .. } => {
                let user: ApiUser = self
                    .api
                    .call(
                        "/1.1/users/show.json",
                        &[("screen_name", username.clone())],
                    )
                    .await
                    .map_err(|err| map_lookup_error(username, err))?;

                let timeline: Vec<Tweet> = self
                    .api
                    .call(
                        "/1.1/statuses/user_timeline.json",
                        &[
                            ("user_id", user.id_str.clone()),
                            ("tweet_mode", "extended".to_string()),
                        ],
                    )
                    .await?;
                if timeline.is_empty() {
                    return Err(BridgeError::NotFound(format!(
                        "requested username @{username} can't be found"
                    )));
                }
                Ok((Some(user), timeline))
            }
            Query::Keyword { query } => {
                let response: SearchResponse = self
                    .api
                    .call(
                        "/1.1/search/tweets.json",
                        &[
                            ("q", query.clone()),
                            ("tweet_mode", "extended".to_string()),
                            ("tweet_search_mode", "live".to_string()),
                        ],
                    )
                    .await?;
                if response.statuses.is_empty() {
                    return Err(BridgeError::NoResults(format!(
                        "no results for this query: {query}"
                    )));
                }
                Ok((None, response.statuses))
            }
            Query::List { owner, name, .. } => {
                let tweets: Vec<Tweet> = self
                    .api
                    .call(
                        "/1.1/lists/statuses.json",
                        &[
                            ("slug", name.to_lowercase()),
                            ("owner_screen_name", owner.to_lowercase()),
                            ("tweet_mode", "extended".to_string()),
                        ],
                    )
                    .await?;
                if tweets.is_empty() {
                    return Err(BridgeError::NotFound(
                        "requested username or list can't be found".into(),
                    ));
                }
                Ok((None, tweets))
            }
            Query::ListId { id, .. } => {
                let tweets: Vec<Tweet> = self
                    .api
                    .call(
                        "/1.1/lists/statuses.json",
                        &[
                            ("list_id", id.clone()),
                            ("tweet_mode", "extended".to_string()),
                        ],
                    )
                    .await?;
                if tweets.is_empty() {
                    return Err(BridgeError::NotFound(
                        "requested username or list can't be found".into(),
                    ));
                }
                Ok((None, tweets))
            }
        }
    }

    /// One bulk lookup for every reply target on the page. Duplicates and
    /// empty markers are kept in the id list deliberately; the endpoint
    /// tolerates both.
    async fn fetch_reply_parents(&self, tweets: &[Tweet]) -> Result<HashMap<String, Tweet>> {
        let ids = tweets
            .iter()
            .map(|tweet| tweet.reply_target().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");

        let parents: Vec<Tweet> = self
            .api
            .call(
                "/1.1/statuses/lookup.json",
                &[("id", ids), ("tweet_mode", "extended".to_string())],
            )
            .await?;
        tracing::debug!(parents = parents.len(), "twitter.collect.reply_parents");
        Ok(parents
            .into_iter()
            .map(|parent| (parent.id_str.clone(), parent))
            .collect())
    }
}

fn map_lookup_error(username: &str, err: BridgeError) -> BridgeError {
    match err {
        BridgeError::Http { status: 404, .. } => {
            BridgeError::NotFound(format!("requested username @{username} can't be found"))
        }
        other => other,
    }
}

fn numeric_id(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}

fn mode_label(query: &Query) -> &'static str {
    match query {
        Query::Keyword { .. } => "keyword",
        Query::Username { .. } => "username",
        Query::List { .. } => "list",
        Query::ListId { .. } => "list_id",
    }
}
