//! Authenticated API client with the single auth-retry.
//!
//! Endpoint paths and url-encoded query parameters are appended to the fixed
//! API base; requests carry the bearer authorization header and the guest
//! token header. A 401/403 forces a credential refresh and one retry per
//! logical call; everything else propagates unchanged.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tidings_common::{BridgeError, Result};
use tidings_http::{Auth, HttpClient, RequestOpts};
use tokio::sync::Mutex;

use super::API_URI;
use super::auth::{Credential, CredentialManager};

/// Transport seam for authenticated GET calls, faked in tests.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        credential: &Credential,
    ) -> Result<Value>;
}

/// Live transport over the shared HTTP client.
pub struct HttpApiTransport {
    http: HttpClient,
}

impl HttpApiTransport {
    pub fn new() -> Result<Self> {
        let http = HttpClient::new(API_URI)
            .map_err(|e| BridgeError::Http {
                status: 0,
                message: format!("http client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ApiTransport for HttpApiTransport {
    async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        credential: &Credential,
    ) -> Result<Value> {
        let query: Vec<(&str, Cow<'_, str>)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), Cow::from(v.as_str())))
            .collect();

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-guest-token"),
            HeaderValue::from_str(&credential.guest_token).map_err(|e| BridgeError::Http {
                status: 0,
                message: format!("invalid guest token header: {e}"),
            })?,
        );

        self.http
            .get_json(
                endpoint,
                RequestOpts {
                    auth: Some(Auth::Bearer(&credential.bearer_token)),
                    headers: Some(headers),
                    query: Some(query),
                    retries: Some(0),
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

/// Issues authenticated GET calls against the platform API.
///
/// The credential is fetched once per logical collection (so the guest-token
/// usage counter decrements exactly once) and cached for subsequent calls.
pub struct TwitterApi {
    transport: Arc<dyn ApiTransport>,
    auth: CredentialManager,
    current: Mutex<Option<Credential>>,
}

impl TwitterApi {
    pub fn new(auth: CredentialManager) -> Result<Self> {
        Ok(Self::with_transport(auth, Arc::new(HttpApiTransport::new()?)))
    }

    pub fn with_transport(auth: CredentialManager, transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            auth,
            current: Mutex::new(None),
        }
    }

    /// GET `endpoint` with `params` and decode the JSON response.
    ///
    /// On HTTP 401 or 403 the credential is force-refreshed and the call is
    /// retried exactly once; a second auth failure, and any other error,
    /// propagates unchanged.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();

        let mut retried = false;
        loop {
            let credential = self.credential(retried).await?;
            match self.transport.get(endpoint, &params, &credential).await {
                Ok(value) => {
                    return serde_json::from_value(value)
                        .map_err(|e| BridgeError::Decode(format!("{endpoint}: {e}")));
                }
                Err(BridgeError::Http { status, message }) if !retried && auth_rejected(status) => {
                    tracing::warn!(
                        endpoint,
                        status,
                        message = %message,
                        "twitter.api.auth_rejected_refreshing"
                    );
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn credential(&self, force: bool) -> Result<Credential> {
        let mut slot = self.current.lock().await;
        if !force {
            if let Some(credential) = &*slot {
                return Ok(credential.clone());
            }
        }
        let fresh = self.auth.ensure(force).await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }
}

fn auth_rejected(status: u16) -> bool {
    status == 401 || status == 403
}
