//! Batched HTTP writes guarded by a circuit breaker
//!
//! One generic client serves every HTTP sink; the [`BulkEndpoint`] supplies
//! the path, content type and target name.
//!
//! | Outcome                    | Breaker            | Result                        |
//! |----------------------------|--------------------|-------------------------------|
//! | blank payload              | untouched          | success, no request           |
//! | breaker open               | untouched          | failure, no request           |
//! | 2xx                        | `record_success`   | success                       |
//! | non-2xx                    | `record_failure`   | failure with status and body  |
//! | transport error / timeout  | `record_failure`   | failure with error detail     |
//! | cancelled                  | untouched          | failure                       |

use std::sync::Arc;

use async_trait::async_trait;
use metricsink_common::resilience::{BackoffCircuitBreaker, Clock, SystemClock};
use metricsink_core::config::{AuthScheme, ElasticsearchSettings, HttpPolicy, InfluxDbSettings};
use metricsink_core::ports::{BulkWriter, WriteResult};
use metricsink_domain::{MetricSinkError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use url::Url;

use super::endpoints::{BulkEndpoint, ElasticsearchEndpoint, InfluxDbEndpoint};
use crate::errors::InfraError;
use crate::http::HttpClient;

enum Attempt {
    Accepted,
    Rejected { status: StatusCode, reason: String },
    Transport(MetricSinkError),
}

/// HTTP bulk writer for one endpoint
pub struct BulkWriteClient<E: BulkEndpoint, C: Clock = SystemClock> {
    endpoint: E,
    url: Url,
    http: HttpClient,
    breaker: Arc<BackoffCircuitBreaker<C>>,
}

impl<E: BulkEndpoint> BulkWriteClient<E> {
    /// Client with its own breaker built from `policy`
    pub fn new(endpoint: E, base_uri: &str, auth: AuthScheme, policy: &HttpPolicy) -> Result<Self> {
        policy.validate()?;
        let breaker = BackoffCircuitBreaker::new(policy.breaker_config()?)
            .map_err(|err| MetricSinkError::Config(err.to_string()))?;
        let http = HttpClient::builder().timeout(policy.timeout).auth(auth).build()?;
        Self::with_breaker(endpoint, base_uri, http, Arc::new(breaker))
    }
}

impl BulkWriteClient<ElasticsearchEndpoint> {
    pub fn elasticsearch(settings: &ElasticsearchSettings) -> Result<Self> {
        settings.validate()?;
        Self::new(
            ElasticsearchEndpoint,
            &settings.base_uri,
            settings.auth.resolve()?,
            &settings.http_policy,
        )
    }
}

impl BulkWriteClient<InfluxDbEndpoint> {
    pub fn influxdb(settings: &InfluxDbSettings) -> Result<Self> {
        settings.validate()?;
        Self::new(
            InfluxDbEndpoint::from_settings(settings),
            &settings.base_uri,
            settings.auth.resolve()?,
            &settings.http_policy,
        )
    }
}

impl<E: BulkEndpoint, C: Clock> BulkWriteClient<E, C> {
    /// Client sharing an existing breaker
    pub fn with_breaker(
        endpoint: E,
        base_uri: &str,
        http: HttpClient,
        breaker: Arc<BackoffCircuitBreaker<C>>,
    ) -> Result<Self> {
        let url = endpoint_url(base_uri, endpoint.path())?;
        Ok(Self { endpoint, url, http, breaker })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn breaker(&self) -> &Arc<BackoffCircuitBreaker<C>> {
        &self.breaker
    }

    async fn attempt(&self, payload: &str) -> Attempt {
        let request = self
            .http
            .request(Method::POST, self.url.clone())
            .header(CONTENT_TYPE, self.endpoint.content_type())
            .body(payload.to_owned());

        let response = match self.http.send(request).await {
            Ok(response) => response,
            Err(err) => return Attempt::Transport(err),
        };

        let status = response.status();
        if status.is_success() {
            return Attempt::Accepted;
        }

        let body = response.text().await.unwrap_or_default();
        let reason = match body.trim() {
            "" => status.canonical_reason().unwrap_or("unknown").to_string(),
            trimmed => trimmed.to_string(),
        };
        Attempt::Rejected { status, reason }
    }
}

/// Join `path` onto `base_uri`, keeping any path prefix of the base
fn endpoint_url(base_uri: &str, path: &str) -> Result<Url> {
    let trimmed = base_uri.trim();
    let mut base = Url::parse(trimmed).map_err(|err| MetricSinkError::from(InfraError::from(err)))?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/')).map_err(|err| MetricSinkError::from(InfraError::from(err)))
}

#[async_trait]
impl<E: BulkEndpoint, C: Clock> BulkWriter for BulkWriteClient<E, C> {
    fn target(&self) -> &str {
        self.endpoint.target()
    }

    async fn write(&self, payload: &str, cancel: &CancellationToken) -> WriteResult {
        let target = self.endpoint.target();

        if payload.trim().is_empty() {
            trace!(target, "empty payload, nothing to write");
            return WriteResult::ok();
        }

        if self.breaker.should_backoff() {
            let message = format!("Too many failures in writing to {target}, Circuit Opened");
            debug!(target, failures = self.breaker.failure_count(), "{message}");
            return WriteResult::failed(message);
        }

        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.breaker.abandon_probe();
                info!(target, "write cancelled");
                return WriteResult::failed(format!("Write to {target} cancelled"));
            }
            attempt = self.attempt(payload) => attempt,
        };

        match attempt {
            Attempt::Accepted => {
                self.breaker.record_success();
                trace!(target, bytes = payload.len(), "successful write");
                WriteResult::ok()
            }
            Attempt::Rejected { status, reason } => {
                self.breaker.record_failure();
                let message = format!(
                    "Failed to write to {target} - StatusCode: {} Reason: {reason}",
                    status.as_u16()
                );
                error!(
                    target,
                    status = status.as_u16(),
                    failures = self.breaker.failure_count(),
                    "{message}"
                );
                WriteResult::failed(message)
            }
            Attempt::Transport(err) => {
                self.breaker.record_failure();
                error!(
                    target,
                    error = %err,
                    failures = self.breaker.failure_count(),
                    "failed to write to {target}"
                );
                WriteResult::failed(format!("Failed to write to {target} - {err}"))
            }
        }
    }
}
