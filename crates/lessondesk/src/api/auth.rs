//! Access-token refresh, shared between concurrent callers.
//!
//! Every request that gets a 401 asks [`TokenCoordinator::fresh_token`] for a
//! new token. Only one refresh runs at a time; callers arriving while it is in
//! flight await the same future and all receive its token or its failure.

use futures::future::{BoxFuture, FutureExt, Shared};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};
use url::Url;

use super::envelope::DataEnvelope;
use super::error::ApiError;
use crate::models::TokenResponse;
use crate::store::CredentialStore;

const REFRESH_PATH: &str = "/auth/refresh";

/// Short, non-reversible token identifier for logs.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct TokenFingerprint(String);

impl TokenFingerprint {
    pub fn of(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        Self(digest[..6].iter().map(|b| format!("{b:02x}")).collect())
    }
}

impl std::fmt::Display for TokenFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exchanges a refresh token for a new token pair.
pub trait TokenRefresher: Send + Sync {
    fn refresh(&self, refresh_token: String) -> BoxFuture<'static, Result<TokenResponse, ApiError>>;
}

/// Calls the backend's refresh endpoint.
pub struct HttpRefresher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRefresher {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

impl TokenRefresher for HttpRefresher {
    fn refresh(&self, refresh_token: String) -> BoxFuture<'static, Result<TokenResponse, ApiError>> {
        let client = self.client.clone();
        let url = format!(
            "{}{REFRESH_PATH}",
            self.base_url.as_str().trim_end_matches('/')
        );

        async move {
            let response = client
                .post(&url)
                .json(&serde_json::json!({ "refresh_token": refresh_token }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(ApiError::Server {
                    status: response.status().as_u16(),
                    message: Some("token refresh rejected".to_string()),
                });
            }

            let text = response.text().await?;
            serde_json::from_str::<DataEnvelope<TokenResponse>>(&text)
                .map(DataEnvelope::into_inner)
                .map_err(|e| ApiError::UnexpectedResponse {
                    message: format!("refresh response: {e}"),
                })
        }
        .boxed()
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, ApiError>>>;

struct InFlight {
    generation: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct RefreshSlot {
    next_generation: u64,
    in_flight: Option<InFlight>,
}

/// Single-flight coordinator for token refreshes.
pub struct TokenCoordinator {
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    slot: Mutex<RefreshSlot>,
}

impl TokenCoordinator {
    pub fn new(store: Arc<CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            slot: Mutex::new(RefreshSlot::default()),
        }
    }

    /// Returns an access token newer than `rejected`.
    ///
    /// If the stored token already differs from the rejected one, another
    /// caller has refreshed in the meantime and that token is returned as is.
    /// Otherwise the caller joins (or starts) the in-flight refresh.
    pub async fn fresh_token(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        let (generation, future) = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

            match &slot.in_flight {
                Some(in_flight) => (in_flight.generation, in_flight.future.clone()),
                None => {
                    if let Some(current) = self.store.access_token()? {
                        if Some(current.as_str()) != rejected {
                            return Ok(current);
                        }
                    }

                    slot.next_generation += 1;
                    let generation = slot.next_generation;
                    let future = run_refresh(self.store.clone(), self.refresher.clone())
                        .boxed()
                        .shared();
                    slot.in_flight = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            slot.in_flight = None;
        }

        result
    }
}

/// Runs one refresh. Any failure clears the stored credentials.
async fn run_refresh(
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
) -> Result<String, ApiError> {
    let Some(refresh_token) = store.refresh_token()? else {
        warn!("No refresh token stored, session cannot be renewed");
        store.clear()?;
        return Err(ApiError::SessionExpired {
            reason: "no refresh token".to_string(),
        });
    };

    info!(
        refresh = %TokenFingerprint::of(&refresh_token),
        "Refreshing access token"
    );

    match refresher.refresh(refresh_token).await {
        Ok(tokens) => {
            store.set_tokens(&tokens.access_token, tokens.refresh_token.as_deref())?;
            info!(
                access = %TokenFingerprint::of(&tokens.access_token),
                "Access token refreshed"
            );
            Ok(tokens.access_token)
        }
        Err(e) => {
            warn!(error = %e, "Token refresh failed, clearing stored credentials");
            if let Err(clear_err) = store.clear() {
                error!(error = %clear_err, "Failed to clear credentials");
            }
            Err(ApiError::SessionExpired {
                reason: e.to_string(),
            })
        }
    }
}
