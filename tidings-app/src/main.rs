use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tidings_cache::FileCache;
use tidings_common::FeedItem;
use tidings_common::observability::{LogConfig, init_logging};
use tidings_config::{BridgeDetails, TidingsConfigLoader, TwitterMode, TwitterParams};
use tidings_social::twitter::auth::{CredentialManager, WebTokenEndpoints};
use tidings_social::twitter::{self, Query, RenderOptions, TwitterApi, TwitterBridge};
use tidings_web::wikipedia::{self, Subject, WikipediaBridge, WikipediaQuery};

#[derive(Parser)]
#[command(name = "tidings", about = "Content-extraction bridges, emitting feed items as JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect tweets (with reply context) for a query.
    Twitter(TwitterArgs),
    /// Collect Wikipedia featured-article or did-you-know snippets.
    Wikipedia(WikipediaArgs),
    /// Run every enabled bridge from a configuration file.
    Run {
        #[arg(long, default_value = "tidings.yaml")]
        config: PathBuf,
    },
}

#[derive(Args)]
struct TwitterArgs {
    /// Keyword or #hashtag to search for.
    #[arg(long)]
    query: Option<String>,
    /// Username whose timeline to fetch.
    #[arg(long)]
    username: Option<String>,
    /// Only return initial tweets.
    #[arg(long)]
    norep: bool,
    /// Disable fetching and showing the tweet being replied to.
    #[arg(long)]
    noreplycontext: bool,
    /// Hide retweets.
    #[arg(long)]
    noretweet: bool,
    /// Hide pinned tweet.
    #[arg(long)]
    nopinned: bool,
    /// List owner (together with --list-name).
    #[arg(long)]
    list_owner: Option<String>,
    /// List name (together with --list-owner).
    #[arg(long)]
    list_name: Option<String>,
    /// Numeric list id.
    #[arg(long)]
    list_id: Option<String>,
    /// Term the rendered tweet text must contain (list modes only).
    #[arg(long)]
    filter: Option<String>,
    /// Hide profile pictures in content.
    #[arg(long)]
    nopic: bool,
    /// Hide images in tweets.
    #[arg(long)]
    noimg: bool,
    /// Disable image scaling (keeps original image).
    #[arg(long)]
    noimgscaling: bool,
}

impl TwitterArgs {
    fn into_query(self) -> Result<(Query, RenderOptions)> {
        let options = RenderOptions {
            hide_avatars: self.nopic,
            hide_images: self.noimg,
            no_image_scaling: self.noimgscaling,
        };
        let query = if let Some(query) = self.query {
            Query::Keyword { query }
        } else if let Some(username) = self.username {
            Query::Username {
                username,
                no_replies: self.norep,
                no_reply_context: self.noreplycontext,
                no_retweets: self.noretweet,
                no_pinned: self.nopinned,
            }
        } else if let (Some(owner), Some(name)) = (self.list_owner, self.list_name) {
            Query::List {
                owner,
                name,
                filter: self.filter,
            }
        } else if let Some(id) = self.list_id {
            Query::ListId {
                id,
                filter: self.filter,
            }
        } else {
            bail!("one of --query, --username, --list-owner/--list-name, --list-id is required");
        };
        Ok((query, options))
    }
}

#[derive(Args)]
struct WikipediaArgs {
    /// Language code (en, de, fr, eo).
    #[arg(long)]
    language: String,
    /// Subject: tfa (today's featured article) or dyk (did you know…).
    #[arg(long)]
    subject: String,
    /// Always load the full article.
    #[arg(long)]
    fullarticle: bool,
}

impl WikipediaArgs {
    fn into_query(self) -> Result<WikipediaQuery> {
        let subject = Subject::parse(&self.subject)
            .with_context(|| format!("unknown subject: {} (expected tfa or dyk)", self.subject))?;
        Ok(WikipediaQuery {
            language: self.language,
            subject,
            full_article: self.fullarticle,
        })
    }
}

/// What gets printed per collected feed.
#[derive(Serialize)]
struct FeedDocument {
    name: String,
    uri: String,
    items: Vec<FeedItem>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogConfig::default())?;

    match cli.command {
        Command::Twitter(args) => {
            let (query, options) = args.into_query()?;
            let document = collect_twitter(&query, options).await?;
            print_document(&document)
        }
        Command::Wikipedia(args) => {
            let query = args.into_query()?;
            let document = collect_wikipedia(&query).await?;
            print_document(&document)
        }
        Command::Run { config } => {
            let cfg = TidingsConfigLoader::new()
                .with_file(&config)
                .load()
                .with_context(|| format!("loading {}", config.display()))?;

            for spec in cfg.bridges.iter().filter(|spec| spec.is_enabled()) {
                tracing::info!(bridge = %spec.id, "app.bridge.start");
                let document = match &spec.details {
                    BridgeDetails::Twitter { config } => {
                        let (query, options) = from_twitter_params(config);
                        collect_twitter(&query, options).await?
                    }
                    BridgeDetails::Wikipedia { config } => {
                        let subject = Subject::parse(&config.subject).with_context(|| {
                            format!("bridge {}: unknown subject {}", spec.id, config.subject)
                        })?;
                        collect_wikipedia(&WikipediaQuery {
                            language: config.language.clone(),
                            subject,
                            full_article: config.fullarticle,
                        })
                        .await?
                    }
                };
                print_document(&document)?;
            }
            Ok(())
        }
    }
}

async fn collect_twitter(query: &Query, options: RenderOptions) -> Result<FeedDocument> {
    let cache = Arc::new(FileCache::default_location());
    let endpoints = Arc::new(WebTokenEndpoints::new()?);
    let auth = CredentialManager::new(cache, endpoints);
    let bridge = TwitterBridge::new(TwitterApi::new(auth)?, options);

    let items = bridge.collect(query).await?;
    Ok(FeedDocument {
        name: twitter::collect::feed_name(query),
        uri: twitter::collect::feed_uri(query),
        items,
    })
}

async fn collect_wikipedia(query: &WikipediaQuery) -> Result<FeedDocument> {
    let bridge = WikipediaBridge::new()?;
    let items = bridge.collect(query).await?;
    Ok(FeedDocument {
        name: wikipedia::feed_name(query),
        uri: wikipedia::feed_uri(query),
        items,
    })
}

fn from_twitter_params(params: &TwitterParams) -> (Query, RenderOptions) {
    let options = RenderOptions {
        hide_avatars: params.nopic,
        hide_images: params.noimg,
        no_image_scaling: params.noimgscaling,
    };
    let query = match &params.mode {
        TwitterMode::Keyword { q } => Query::Keyword { query: q.clone() },
        TwitterMode::Username {
            u,
            norep,
            noreplycontext,
            noretweet,
            nopinned,
        } => Query::Username {
            username: u.clone(),
            no_replies: *norep,
            no_reply_context: *noreplycontext,
            no_retweets: *noretweet,
            no_pinned: *nopinned,
        },
        TwitterMode::List { user, list, filter } => Query::List {
            owner: user.clone(),
            name: list.clone(),
            filter: filter.clone(),
        },
        TwitterMode::ListId { listid, filter } => Query::ListId {
            id: listid.clone(),
            filter: filter.clone(),
        },
    };
    (query, options)
}

fn print_document(document: &FeedDocument) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(document)?);
    Ok(())
}
