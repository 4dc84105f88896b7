use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use metricsink_core::config::AuthScheme;
use metricsink_domain::MetricSinkError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::debug;

use crate::errors::InfraError;

/// Default `User-Agent` for outbound writes
pub const DEFAULT_USER_AGENT: &str = concat!("metricsink/", env!("CARGO_PKG_VERSION"));

/// Single-attempt HTTP client.
///
/// Each request is sent once; failed writes are counted by the sink's
/// circuit breaker.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, MetricSinkError> {
        Self::builder().build()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, MetricSinkError> {
        let request = builder.build().map_err(|err| MetricSinkError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }
}

/// `Authorization` header for a scheme, if it needs one
pub fn authorization_header(scheme: &AuthScheme) -> Result<Option<HeaderValue>, MetricSinkError> {
    let raw = match scheme {
        AuthScheme::Anonymous => return Ok(None),
        AuthScheme::Basic { username, password } => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
        AuthScheme::BearerToken { token } => format!("Bearer {token}"),
    };

    let mut value = HeaderValue::from_str(&raw).map_err(|err| MetricSinkError::from(InfraError::from(err)))?;
    value.set_sensitive(true);
    Ok(Some(value))
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: HeaderMap,
    auth: AuthScheme,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            default_headers: HeaderMap::new(),
            auth: AuthScheme::Anonymous,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Attach credentials sent with every request.
    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    pub fn build(self) -> Result<HttpClient, MetricSinkError> {
        if self.timeout.is_zero() {
            return Err(MetricSinkError::Config("HTTP timeout must be greater than 0".into()));
        }

        let mut headers = self.default_headers;
        if let Some(value) = authorization_header(&self.auth)? {
            headers.insert(AUTHORIZATION, value);
        }

        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .no_proxy()
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()))
            .default_headers(headers)
            .build()
            .map_err(|err| MetricSinkError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, timeout: self.timeout })
    }
}
