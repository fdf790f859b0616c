//! Hetzner Cloud API client implementation.
//!
//! API Documentation: <https://docs.hetzner.cloud/>

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::backoff::Backoff;
use crate::error::ClientError;
use crate::models::{ErrorResponse, Meta};

/// Default Hetzner Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.hetzner.cloud/v1";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size used when listing resources.
const PER_PAGE: u32 = 50;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API token.
    pub token: String,
    /// API endpoint.
    pub endpoint: String,
    /// Application name, added to the user agent.
    pub application_name: Option<String>,
    /// Application version, added to the user agent.
    pub application_version: Option<String>,
    /// Interval between two polls of a running action.
    pub poll_interval: Backoff,
    /// Maximum number of polls before an action times out.
    pub poll_max_retries: u32,
    /// Interval between two attempts of a failed request.
    pub retry_interval: Backoff,
    /// Maximum number of retries of a failed request.
    pub retry_max_retries: u32,
    /// Timeout of a single HTTP request.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            application_name: None,
            application_version: None,
            poll_interval: Backoff::poll(),
            poll_max_retries: 25,
            retry_interval: Backoff::retry(),
            retry_max_retries: 5,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Use another API endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Identify the calling application in the user agent.
    #[must_use]
    pub fn application(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self.application_version = Some(version.into());
        self
    }

    /// Override the request retry policy.
    #[must_use]
    pub fn retry(mut self, interval: Backoff, max_retries: u32) -> Self {
        self.retry_interval = interval;
        self.retry_max_retries = max_retries;
        self
    }

    /// Override the action polling policy.
    #[must_use]
    pub fn poll(mut self, interval: Backoff, max_retries: u32) -> Self {
        self.poll_interval = interval;
        self.poll_max_retries = max_retries;
        self
    }

    fn user_agent(&self) -> String {
        let mut agent = format!("hcloud-rust/{}", env!("CARGO_PKG_VERSION"));
        if let Some(name) = &self.application_name {
            agent.push(' ');
            agent.push_str(name);
            if let Some(version) = &self.application_version {
                agent.push('/');
                agent.push_str(version);
            }
        }
        agent
    }
}

/// Response bodies of successful GET requests, keyed by URL.
type ResponseCache = Arc<Mutex<Option<HashMap<String, String>>>>;

/// Hetzner Cloud API client.
#[derive(Clone)]
pub struct Client {
    /// HTTP client.
    http: reqwest::Client,
    /// API endpoint, always ending with a slash.
    endpoint: Url,
    /// Client configuration.
    config: Arc<ClientConfig>,
    /// GET cache, only active inside a [`CachedSession`].
    cache: ResponseCache,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns error if the endpoint is not a valid URL or the HTTP client
    /// cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| ClientError::Config(format!("invalid API endpoint {endpoint}: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            http,
            endpoint,
            config: Arc::new(config),
            cache: Arc::new(Mutex::new(None)),
        })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cache the responses of all GET requests until the returned guard is
    /// dropped.
    ///
    /// Cached responses never expire, the guard must not be kept for long
    /// living scopes.
    #[must_use = "the cache is disabled again when the session is dropped"]
    pub fn cached_session(&self) -> CachedSession<'_> {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(HashMap::new());
        CachedSession { client: self }
    }

    fn cached(&self, url: &str) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|cache| cache.get(url).cloned())
    }

    fn store(&self, url: &str, body: &str) {
        if let Some(cache) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            cache.insert(url.to_string(), body.to_string());
        }
    }

    /// Build the URL for `path` relative to the endpoint.
    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self
            .endpoint
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid API path {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Make an authenticated GET request, retrying transient failures.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(path, query)?;

        if let Some(text) = self.cached(url.as_str()) {
            debug!(url = %url, "GET request (cached)");
            return Self::parse(&text);
        }

        let mut retries = 0;
        loop {
            debug!(url = %url, retries, "GET request");

            let response = self
                .http
                .get(url.clone())
                .bearer_auth(&self.config.token)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                self.store(url.as_str(), &text);
                return Self::parse(&text);
            }

            let error = Self::api_error(status.as_u16(), &text);
            if retries < self.config.retry_max_retries && error.is_retryable() {
                let delay = self.config.retry_interval.interval(retries);
                warn!(url = %url, error = %error, ?delay, "Retrying API request");
                tokio::time::sleep(delay).await;
                retries += 1;
                continue;
            }

            return Err(error);
        }
    }

    /// Parse a successful response body. Empty bodies parse as `null`.
    fn parse<T: DeserializeOwned>(text: &str) -> Result<T, ClientError> {
        let text = if text.trim().is_empty() { "null" } else { text };
        serde_json::from_str(text).map_err(|e| {
            warn!(error = %e, body = %text, "Failed to parse response");
            ClientError::Serialization(e)
        })
    }

    /// Convert an error response into a [`ClientError::Api`].
    fn api_error(status: u16, text: &str) -> ClientError {
        match serde_json::from_str::<ErrorResponse>(text) {
            Ok(body) => ClientError::Api {
                status,
                code: body.error.code,
                message: body.error.message,
                details: body.error.details,
            },
            Err(_) => ClientError::Api {
                status,
                code: status.to_string(),
                message: if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text.to_string()
                },
                details: None,
            },
        }
    }

    /// Fetch every page of a list endpoint.
    pub(crate) async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        list_key: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ClientError> {
        let mut results = Vec::new();
        let mut page = 1;

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("page", page.to_string()));
            page_query.push(("per_page", PER_PAGE.to_string()));

            let mut response: serde_json::Value = self.get(path, &page_query).await?;

            let items = response
                .get_mut(list_key)
                .map(serde_json::Value::take)
                .unwrap_or_default();
            if !items.is_null() {
                results.extend(serde_json::from_value::<Vec<T>>(items)?);
            }

            let meta: Meta = response
                .get_mut("meta")
                .map(serde_json::Value::take)
                .map(serde_json::from_value)
                .transpose()?
                .unwrap_or_default();

            match meta.pagination.and_then(|p| p.next_page) {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        debug!(path, count = results.len(), "Listed resources");
        Ok(results)
    }
}

/// Scope during which GET responses are cached.
///
/// Created by [`Client::cached_session`].
pub struct CachedSession<'a> {
    client: &'a Client,
}

impl Drop for CachedSession<'_> {
    fn drop(&mut self) {
        *self
            .client
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
