//! HTTP client for the booking backend.
//!
//! Every call goes through [`ApiClient::request`]:
//! 1. Attach the stored access token as a bearer token
//! 2. On 401, get a fresh token from the [`TokenCoordinator`]
//! 3. Retry once with it; a second 401 ends the session
//! 4. Decode the JSON body, or turn the error body into an [`ApiError`]

use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

use super::auth::{HttpRefresher, TokenCoordinator, TokenFingerprint, TokenRefresher};
use super::envelope::DataEnvelope;
use super::error::{extract_server_message, ApiError};
use crate::config::DashboardConfig;
use crate::models::{LoginRequest, TokenResponse};
use crate::store::CredentialStore;

const LOGIN_PATH: &str = "/auth/login";

/// Client for the booking backend's REST API.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    store: Arc<CredentialStore>,
    tokens: TokenCoordinator,
}

impl ApiClient {
    /// Creates a client that refreshes tokens through the backend.
    pub fn new(config: &DashboardConfig, store: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let http = build_http_client(config)?;
        let base_url = base_url(config)?;
        let refresher = Arc::new(HttpRefresher::new(http.clone(), base_url.clone()));
        Ok(Self::with_parts(http, base_url, store, refresher))
    }

    /// Creates a client with a custom token refresher.
    pub fn with_refresher(
        config: &DashboardConfig,
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Result<Self, ApiError> {
        let http = build_http_client(config)?;
        let base_url = base_url(config)?;
        Ok(Self::with_parts(http, base_url, store, refresher))
    }

    fn with_parts(
        http: Client,
        base_url: Url,
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let tokens = TokenCoordinator::new(store.clone(), refresher);
        Self {
            http,
            base_url,
            store,
            tokens,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Backend URL built from path segments. Each segment is percent-encoded
    /// on its own, so caller-supplied ids cannot add segments, a query or a
    /// fragment.
    pub(crate) fn segments_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ApiError::InvalidId {
                id: bad.to_string(),
            });
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::UrlError {
                message: format!("{} cannot be a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends an authenticated request and returns the decoded body
    /// (`Value::Null` for an empty body).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        self.request_url(method, url, body).await
    }

    pub(crate) async fn request_url(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let correlation_id = generate_correlation_id();
        let path = url.path().to_owned();
        let path = path.as_str();
        let start = Instant::now();

        let token = self.store.access_token()?;
        let response = self
            .send_once(method.clone(), url.clone(), body, token.as_deref())
            .await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            let fingerprint = token.as_deref().map(TokenFingerprint::of);
            info!(
                correlation_id = %correlation_id,
                path,
                token = ?fingerprint,
                "Access token rejected, refreshing"
            );
            let fresh = self.tokens.fresh_token(token.as_deref()).await?;
            let retried = self.send_once(method.clone(), url, body, Some(&fresh)).await?;

            if retried.status() == StatusCode::UNAUTHORIZED {
                warn!(
                    correlation_id = %correlation_id,
                    path,
                    "Refreshed token rejected, ending session"
                );
                self.store.clear()?;
                return Err(ApiError::SessionExpired {
                    reason: "refreshed token was rejected".to_string(),
                });
            }
            retried
        } else {
            response
        };

        let result = read_body(response).await;
        match &result {
            Ok(_) => debug!(
                correlation_id = %correlation_id,
                method = %method,
                path,
                duration_ms = start.elapsed().as_millis() as u64,
                "Backend request succeeded"
            ),
            Err(e) => error!(
                correlation_id = %correlation_id,
                method = %method,
                path,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Backend request failed"
            ),
        }
        result
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut req = self.http.request(method, url);
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, None).await
    }

    /// Logs in, stores the token pair and the returned user, and returns the user.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Value, ApiError> {
        let url = self.url(LOGIN_PATH)?;
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::UnexpectedResponse {
            message: e.to_string(),
        })?;
        let response = self.send_once(Method::POST, url, Some(&body), None).await?;
        let payload = read_body(response).await?;

        let tokens = serde_json::from_value::<DataEnvelope<TokenResponse>>(payload)
            .map(DataEnvelope::into_inner)
            .map_err(|e| ApiError::UnexpectedResponse {
                message: format!("login response: {e}"),
            })?;

        self.store
            .set_tokens(&tokens.access_token, tokens.refresh_token.as_deref())?;
        let user = tokens.user.unwrap_or(Value::Null);
        if !user.is_null() {
            self.store.set_cached_user(&user)?;
        }

        info!(
            access = %TokenFingerprint::of(&tokens.access_token),
            "Logged in"
        );
        Ok(user)
    }

    /// Forgets the stored session.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }
}

fn build_http_client(config: &DashboardConfig) -> Result<Client, ApiError> {
    Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| ApiError::Network {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

fn base_url(config: &DashboardConfig) -> Result<Url, ApiError> {
    config.base_url().map_err(|e| ApiError::UrlError {
        message: e.to_string(),
    })
}

async fn read_body(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Server {
            status: status.as_u16(),
            message: extract_server_message(&text),
        });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| ApiError::UnexpectedResponse {
        message: format!("invalid JSON body: {e}"),
    })
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
