//! Wikipedia bridge: featured-article and did-you-know snippets from
//! localized homepages.
//!
//! The `/wiki` path on each language host redirects to the localized main
//! page; the per-language selector tables in [`selectors`] locate the right
//! blocks and the shared operations in [`extract`] turn them into items.
//! Full-article mode dereferences every item into a second fetch+parse.

pub mod extract;
pub mod selectors;

use tidings_common::{BridgeError, BridgeInfo, FeedItem, Result};
use tidings_http::{HttpClient, RequestOpts};

pub const INFO: BridgeInfo = BridgeInfo {
    name: "Wikipedia bridge for many languages",
    uri: "https://www.wikipedia.org/",
    description: "Returns articles for a language of your choice",
    cache_timeout: 3600,
};

/// What to extract from the homepage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    FeaturedArticle,
    DidYouKnow,
}

impl Subject {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "tfa" => Some(Self::FeaturedArticle),
            "dyk" => Some(Self::DidYouKnow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WikipediaQuery {
    /// Language code from the supported set (`en`, `de`, `fr`, `eo`).
    pub language: String,
    pub subject: Subject,
    /// Always load the full article instead of the homepage snippet.
    pub full_article: bool,
}

impl WikipediaQuery {
    pub fn validate(&self) -> Result<()> {
        if self.language.is_empty() {
            return Err(BridgeError::MissingParameter("language"));
        }
        Ok(())
    }
}

/// Feed title for a query.
pub fn feed_name(query: &WikipediaQuery) -> String {
    let language = query.language.to_lowercase();
    match query.subject {
        Subject::FeaturedArticle => {
            format!("Today's featured article from {language}.wikipedia.org")
        }
        Subject::DidYouKnow => {
            format!("Did you know? - articles from {language}.wikipedia.org")
        }
    }
}

/// Public URI a feed for this query points back to.
pub fn feed_uri(query: &WikipediaQuery) -> String {
    format!("https://{}.wikipedia.org", query.language.to_lowercase())
}

/// The Wikipedia bridge. State-free: one homepage fetch per collection plus
/// one article fetch per item in full-article mode.
pub struct WikipediaBridge {
    http: HttpClient,
}

impl WikipediaBridge {
    pub fn new() -> Result<Self> {
        let http = HttpClient::new(INFO.uri).map_err(|e| BridgeError::Http {
            status: 0,
            message: format!("http client: {e}"),
        })?;
        Ok(Self { http })
    }

    pub async fn collect(&self, query: &WikipediaQuery) -> Result<Vec<FeedItem>> {
        query.validate()?;
        let language = query.language.to_lowercase();
        let table = selectors::selectors_for(&language)
            .ok_or_else(|| BridgeError::UnsupportedLanguage(query.language.clone()))?;
        let base = format!("https://{language}.wikipedia.org");

        let homepage = self.fetch(&format!("{base}/wiki")).await?;
        let mut extracted = match query.subject {
            Subject::FeaturedArticle => {
                vec![extract::featured_article(&homepage, table.featured, &base)?]
            }
            Subject::DidYouKnow => extract::did_you_know(&homepage, table.did_you_know, &base)?,
        };

        if query.full_article {
            for item in &mut extracted {
                let page = self.fetch(&item.uri).await?;
                item.content = extract::full_article(&page, &base)?;
            }
        }

        tracing::info!(
            language = %language,
            subject = ?query.subject,
            items = extracted.len(),
            "wikipedia.collect.done"
        );
        Ok(extracted
            .into_iter()
            .map(|item| FeedItem {
                id: item.uri.clone(),
                uri: item.uri,
                title: item.title,
                author: None,
                timestamp: None,
                content: item.content,
                enclosures: Vec::new(),
            })
            .collect())
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.http
            .get_text(
                url,
                RequestOpts {
                    retries: Some(0),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| BridgeError::Http {
                status: err.status().unwrap_or(0),
                message: err.to_string(),
            })
    }
}
