use crate::{Error, ErrorContext, ProviderErrorKind, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Proxy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

pub const TIMEOUT_ENV: &str = "GEO_BATCH_HTTP_TIMEOUT_SECS";
pub const PROXY_ENV: &str = "GEO_BATCH_PROXY_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub proxy_url: Option<String>,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            proxy_url: None,
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpTransportConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn with_proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }

    /// Apply `GEO_BATCH_HTTP_TIMEOUT_SECS` and `GEO_BATCH_PROXY_URL`; unparsable values are ignored.
    pub fn with_env(self) -> Self {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    pub(crate) fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(secs) = lookup(TIMEOUT_ENV).and_then(|s| s.trim().parse::<u64>().ok()) {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup(PROXY_ENV).filter(|s| !s.trim().is_empty()) {
            self.proxy_url = Some(url);
        }
        self
    }
}

/// JSON-over-HTTP client shared by the providers.
///
/// Every failure comes back as [`Error::Provider`] tagged with the provider name.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    provider: String,
}

impl HttpTransport {
    pub fn new(provider: impl Into<String>, config: HttpTransportConfig) -> Result<Self> {
        let provider = provider.into();
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout));

        if let Some(ua) = &config.user_agent {
            builder = builder.user_agent(ua.as_str());
        }

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy url: {}", e),
                    ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_source(provider.clone()),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("failed to build HTTP client: {}", e),
                ErrorContext::new().with_source(provider.clone()),
            )
        })?;

        Ok(Self { client, provider })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        trace!(provider = %self.provider, url, "GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        self.read_json(resp).await
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        trace!(provider = %self.provider, url, "POST");
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;
        self.read_json(resp).await
    }

    async fn read_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_secs = retry_after_secs(resp.headers());
            debug!(provider = %self.provider, ?retry_after_secs, "provider rate limited");
            return Err(Error::provider(
                &self.provider,
                ProviderErrorKind::RateLimited { retry_after_secs },
                "too many requests",
            ));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(
                &self.provider,
                ProviderErrorKind::Status(status.as_u16()),
                snippet(&body),
            ));
        }

        let bytes = resp.bytes().await.map_err(|e| self.network_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::provider(
                &self.provider,
                ProviderErrorKind::Parse,
                format!("{} (body: {})", e, snippet(&String::from_utf8_lossy(&bytes))),
            )
        })
    }

    fn network_error(&self, e: reqwest::Error) -> Error {
        let msg = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else {
            e.to_string()
        };
        Error::provider(&self.provider, ProviderErrorKind::Network, msg)
    }
}

/// `Retry-After` in whole seconds (delta-seconds form only).
pub fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
