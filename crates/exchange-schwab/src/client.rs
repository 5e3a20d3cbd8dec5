//! Schwab REST client with bearer auth and rate limiting.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use zdte_core::SchwabConfig;

use crate::error::{Result, SchwabError};

/// Schwab production API base URL.
pub const SCHWAB_API_URL: &str = "https://api.schwabapi.com";

/// Configuration for the Schwab client.
#[derive(Debug, Clone)]
pub struct SchwabClientConfig {
    pub base_url: String,
    pub access_token: SecretString,
    pub account_hash: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout_secs: u64,
}

impl Default for SchwabClientConfig {
    fn default() -> Self {
        Self {
            base_url: SCHWAB_API_URL.to_string(),
            access_token: SecretString::from(String::new()),
            account_hash: String::new(),
            requests_per_minute: nonzero!(120u32),
            timeout_secs: 10,
        }
    }
}

impl SchwabClientConfig {
    /// Builds the client config from the application section.
    #[must_use]
    pub fn from_app(config: &SchwabConfig, timeout_secs: u64) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: SecretString::from(config.access_token.clone()),
            account_hash: config.account_hash.clone(),
            timeout_secs,
            ..Default::default()
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = SecretString::from(token.into());
        self
    }

    /// Sets the account hash used in trader paths.
    #[must_use]
    pub fn with_account_hash(mut self, hash: impl Into<String>) -> Self {
        self.account_hash = hash.into();
        self
    }
}

/// Schwab REST API client.
///
/// Cheap to clone; clones share the HTTP pool and the rate limiter.
#[derive(Clone)]
pub struct SchwabClient {
    config: Arc<SchwabClientConfig>,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for SchwabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchwabClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl SchwabClient {
    /// Creates a new client.
    ///
    /// # Errors
    /// Returns error if the access token is empty or the HTTP client cannot
    /// be built.
    pub fn new(config: SchwabClientConfig) -> Result<Self> {
        if config.access_token.expose_secret().is_empty() {
            return Err(SchwabError::Authentication(
                "access token is empty; set ZDTE_SCHWAB__ACCESS_TOKEN".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SchwabError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config: Arc::new(config),
            http,
            rate_limiter,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    #[must_use]
    pub fn account_hash(&self) -> &str {
        &self.config.account_hash
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.config.timeout_secs
    }

    /// Waits for the rate limiter and makes an authenticated GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Waits for the rate limiter and POSTs `body`, returning the raw
    /// response for header inspection.
    pub(crate) async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        let body_json = serde_json::to_string(body)?;
        tracing::debug!("POST {} body_len={}", url, body_json.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(body_json)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(SchwabError::RateLimit {
                retry_after_secs: retry_after,
            });
        }
        if status.as_u16() == 401 {
            return Err(SchwabError::Authentication("access token rejected".to_string()));
        }
        let text = response.text().await.unwrap_or_default();
        Err(SchwabError::api(status.as_u16(), text))
    }
}
