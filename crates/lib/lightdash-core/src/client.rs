use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
pub use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const API_PREFIX: [&str; 2] = ["api", "v1"];
const CF_ACCESS_CLIENT_ID: HeaderName = HeaderName::from_static("cf-access-client-id");
const CF_ACCESS_CLIENT_SECRET: HeaderName = HeaderName::from_static("cf-access-client-secret");

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Lightdash request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Lightdash API returned {status}: {body}")]
    Api { status: StatusCode, body: Value },
    #[error("failed to decode Lightdash response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("invalid Lightdash base URL: {0}")]
    InvalidBaseUrl(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Connection settings for a Lightdash instance.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub cf_access_client_id: Option<String>,
    pub cf_access_client_secret: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            cf_access_client_id: None,
            cf_access_client_secret: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_cf_access(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.cf_access_client_id = Some(client_id.into());
        self.cf_access_client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn default_headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("ApiKey {}", self.api_key))
            .map_err(|_| ClientError::InvalidHeader("Authorization"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let (Some(id), Some(secret)) = (
            self.cf_access_client_id.as_deref(),
            self.cf_access_client_secret.as_deref(),
        ) {
            let id = HeaderValue::from_str(id)
                .map_err(|_| ClientError::InvalidHeader("CF-Access-Client-Id"))?;
            let mut secret = HeaderValue::from_str(secret)
                .map_err(|_| ClientError::InvalidHeader("CF-Access-Client-Secret"))?;
            secret.set_sensitive(true);
            headers.insert(CF_ACCESS_CLIENT_ID, id);
            headers.insert(CF_ACCESS_CLIENT_SECRET, secret);
        }
        Ok(headers)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("cf_access", &self.cf_access_client_id.is_some())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Thin JSON client for the Lightdash REST API.
///
/// Paths are given as segments below `/api/v1`; each segment is
/// percent-encoded, so identifiers containing `/`, `?` or `#` stay inside
/// their segment. Every call unwraps the `{"status": "ok", "results": ...}`
/// envelope and returns the `results` value (`null` when the response
/// carries none).
#[derive(Debug, Clone)]
pub struct LightdashClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LightdashClient {
    /// Builds a client with the authentication headers baked in.
    ///
    /// # Errors
    /// Returns `ClientError` if the base URL cannot hold a path, a header
    /// value is invalid, or the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
        let http = reqwest::Client::builder()
            .default_headers(config.default_headers()?)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    /// # Errors
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn get(&self, path: &[&str]) -> ClientResult<Value> {
        self.send(Method::GET, path, &[], None).await
    }

    /// # Errors
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn post(&self, path: &[&str], body: &Value) -> ClientResult<Value> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    /// # Errors
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn post_with_query(
        &self,
        path: &[&str],
        query: &[(&str, &str)],
        body: &Value,
    ) -> ClientResult<Value> {
        self.send(Method::POST, path, query, Some(body)).await
    }

    /// # Errors
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn patch(&self, path: &[&str], body: &Value) -> ClientResult<Value> {
        self.send(Method::PATCH, path, &[], Some(body)).await
    }

    /// # Errors
    /// Returns `ClientError` on transport failure or a non-success status.
    pub async fn delete(&self, path: &[&str]) -> ClientResult<Value> {
        self.send(Method::DELETE, path, &[], None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let url = self.endpoint(path)?;
        debug!(%method, path = url.path(), "lightdash request");

        let mut request = self.http.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(ClientError::Api { status, body });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let mut envelope: Value = serde_json::from_str(&text)?;
        Ok(envelope
            .get_mut("results")
            .map_or(Value::Null, Value::take))
    }
}
