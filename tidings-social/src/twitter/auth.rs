//! Login-free credential flow: bearer key plus short-lived guest token.
//!
//! The bearer key is scraped out of the platform's public web bundle and the
//! guest token is issued against it. Both persist across invocations through
//! the cache collaborator under three independent slots (`refresh`,
//! `api_key`, `guest_token`) that may be individually absent or stale; a
//! malformed read always means "renew", never a crash.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tidings_cache::CacheStore;
use tidings_common::{BridgeError, Result};
use tidings_http::{Auth, HttpClient, RequestOpts};

use super::{API_URI, GUEST_TOKEN_EXPIRY, GUEST_TOKEN_USES, SITE_URI};

/// Cache scope shared by the three credential slots.
pub const CACHE_SCOPE: &str = "twitter";

/// Versioned main-bundle script URLs, in priority order: the first pattern
/// that matches the landing page wins.
static BUNDLE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"https://abs\.twimg\.com/responsive-web/web/main\.[^.]+\.js")
            .expect("bundle pattern"),
        Regex::new(r"https://abs\.twimg\.com/responsive-web/web_legacy/main\.[^.]+\.js")
            .expect("bundle pattern"),
        Regex::new(r"https://abs\.twimg\.com/responsive-web/client-web/main\.[^.]+\.js")
            .expect("bundle pattern"),
        Regex::new(r"https://abs\.twimg\.com/responsive-web/client-web-legacy/main\.[^.]+\.js")
            .expect("bundle pattern"),
    ]
});

/// Token-shaped substring inside the bundle: 59 alphanumerics, a literal
/// percent sign, 44 alphanumerics.
static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]{59}%[a-zA-Z0-9]{44}").expect("bearer pattern"));

/// The credential pair needed to authorize API calls.
#[derive(Debug, Clone)]
pub struct Credential {
    pub bearer_token: String,
    pub guest_token: String,
    pub guest_token_uses_remaining: i64,
    pub refreshed_at: i64,
}

/// Guest-token usage record as persisted in the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuestTokenRecord {
    uses_remaining: i64,
    token: String,
}

/// Network seam for credential bootstrap, faked in tests.
#[async_trait]
pub trait TokenEndpoints: Send + Sync {
    /// Fetch the platform landing page HTML.
    async fn landing_page(&self) -> Result<String>;
    /// Fetch a main-bundle script by absolute URL.
    async fn script_bundle(&self, url: &str) -> Result<String>;
    /// Ask the guest-token issuance endpoint for a fresh token.
    async fn activate_guest_token(&self, bearer: &str) -> Result<String>;
}

/// Live implementation over the shared HTTP client.
pub struct WebTokenEndpoints {
    http: HttpClient,
}

impl WebTokenEndpoints {
    pub fn new() -> Result<Self> {
        let http = HttpClient::new(SITE_URI)
            .map_err(|e| BridgeError::Credential(format!("http client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl TokenEndpoints for WebTokenEndpoints {
    async fn landing_page(&self) -> Result<String> {
        self.http
            .get_text(
                SITE_URI,
                RequestOpts {
                    retries: Some(0),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(http_error)
    }

    async fn script_bundle(&self, url: &str) -> Result<String> {
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
            .map_err(http_error)
    }

    async fn activate_guest_token(&self, bearer: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Activation {
            guest_token: String,
        }

        let activation: Activation = self
            .http
            .post_json(
                &format!("{API_URI}/1.1/guest/activate.json"),
                RequestOpts {
                    auth: Some(Auth::Bearer(bearer)),
                    retries: Some(0),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(http_error)?;
        Ok(activation.guest_token)
    }
}

fn http_error(err: tidings_http::HttpError) -> BridgeError {
    BridgeError::Http {
        status: err.status().unwrap_or(0),
        message: err.to_string(),
    }
}

/// Obtains and refreshes the credential pair, enforcing usage and expiry
/// limits. One instance per bridge invocation; the cache collaborator is
/// passed in explicitly.
pub struct CredentialManager {
    cache: Arc<dyn CacheStore>,
    endpoints: Arc<dyn TokenEndpoints>,
}

impl CredentialManager {
    pub fn new(cache: Arc<dyn CacheStore>, endpoints: Arc<dyn TokenEndpoints>) -> Self {
        Self { cache, endpoints }
    }

    /// Produce a usable credential, renewing whatever is forced, absent,
    /// malformed, or older than the expiry window.
    ///
    /// Fails with [`BridgeError::Credential`] only when a first-time guest
    /// token acquisition is impossible; once a token has ever been issued,
    /// renewal failures degrade to the last-known token.
    pub async fn ensure(&self, force_refresh: bool) -> Result<Credential> {
        let now = Utc::now().timestamp();

        let refresh = match self.load_i64("refresh").await? {
            Some(ts) => ts,
            None => {
                // First run: start the expiry clock.
                self.cache.save(CACHE_SCOPE, "refresh", json!(now)).await?;
                now
            }
        };
        let stale = now - refresh > GUEST_TOKEN_EXPIRY;

        let bearer = match self.load_string("api_key").await? {
            Some(key) if !force_refresh && !stale => key,
            _ => {
                let key = self.derive_bearer().await?;
                self.cache.save(CACHE_SCOPE, "api_key", json!(key)).await?;
                key
            }
        };

        let record = match self.cache.load(CACHE_SCOPE, "guest_token").await? {
            Some(value) => serde_json::from_value::<GuestTokenRecord>(value).ok(),
            None => None,
        };
        let must_renew = force_refresh
            || stale
            || record.as_ref().map_or(true, |r| r.uses_remaining <= 0);

        let (guest_token, uses_remaining, refreshed_at) = match (must_renew, record) {
            (false, Some(mut record)) => {
                record.uses_remaining -= 1;
                self.save_record(&record).await?;
                (record.token, record.uses_remaining, refresh)
            }
            (_, record) => match self.endpoints.activate_guest_token(&bearer).await {
                Ok(token) => {
                    let fresh = GuestTokenRecord {
                        uses_remaining: GUEST_TOKEN_USES,
                        token: token.clone(),
                    };
                    self.save_record(&fresh).await?;
                    self.cache.save(CACHE_SCOPE, "refresh", json!(now)).await?;
                    tracing::info!("twitter.auth.guest_token_renewed");
                    (token, GUEST_TOKEN_USES, now)
                }
                Err(err) => match record {
                    // Degrade to the last-known token rather than failing
                    // the whole collection.
                    Some(record) => {
                        tracing::warn!(error = %err, "twitter.auth.guest_token_renewal_failed");
                        (record.token, record.uses_remaining, refresh)
                    }
                    None => {
                        return Err(BridgeError::Credential(format!(
                            "could not parse guest token: {err}"
                        )));
                    }
                },
            },
        };

        Ok(Credential {
            bearer_token: bearer,
            guest_token,
            guest_token_uses_remaining: uses_remaining,
            refreshed_at,
        })
    }

    /// Re-derive the bearer key from the platform's public web bundle.
    async fn derive_bearer(&self) -> Result<String> {
        let page = self.endpoints.landing_page().await?;
        let bundle_url = BUNDLE_PATTERNS
            .iter()
            .find_map(|pattern| pattern.find(&page))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| BridgeError::Credential("could not locate main.js link".into()))?;

        let bundle = self.endpoints.script_bundle(&bundle_url).await?;
        let key = BEARER_PATTERN
            .find(&bundle)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                BridgeError::Credential("could not extract bearer key from main.js".into())
            })?;
        tracing::info!(bundle = %bundle_url, "twitter.auth.bearer_derived");
        Ok(key)
    }

    async fn save_record(&self, record: &GuestTokenRecord) -> Result<()> {
        let value = serde_json::to_value(record)
            .map_err(|e| BridgeError::Cache(format!("encode guest token: {e}")))?;
        self.cache.save(CACHE_SCOPE, "guest_token", value).await
    }

    async fn load_i64(&self, key: &str) -> Result<Option<i64>> {
        Ok(self
            .cache
            .load(CACHE_SCOPE, key)
            .await?
            .and_then(|v| v.as_i64()))
    }

    async fn load_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .cache
            .load(CACHE_SCOPE, key)
            .await?
            .and_then(|v| v.as_str().map(str::to_owned)))
    }
}
