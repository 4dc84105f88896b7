//! Conversions from external infrastructure errors into domain errors.

use metricsink_domain::MetricSinkError;
use reqwest::header::InvalidHeaderValue;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MetricSinkError);

impl From<InfraError> for MetricSinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MetricSinkError> for InfraError {
    fn from(value: MetricSinkError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSinkError {
    fn into_sink(self) -> MetricSinkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → MetricSinkError */
/* -------------------------------------------------------------------------- */

impl IntoSinkError for HttpError {
    fn into_sink(self) -> MetricSinkError {
        if self.is_timeout() {
            return MetricSinkError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return MetricSinkError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return MetricSinkError::Config(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => MetricSinkError::Auth(message),
                400..=499 => MetricSinkError::Validation(message),
                _ => MetricSinkError::Network(message),
            };
        }

        MetricSinkError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sink())
    }
}

/* -------------------------------------------------------------------------- */
/* Header, I/O and format errors */
/* -------------------------------------------------------------------------- */

impl From<InvalidHeaderValue> for InfraError {
    fn from(value: InvalidHeaderValue) -> Self {
        InfraError(MetricSinkError::Config(format!("invalid header value: {value}")))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(MetricSinkError::Io(format!("{:?}: {value}", value.kind())))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(MetricSinkError::Serialization(value.to_string()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(MetricSinkError::Config(format!("invalid TOML: {value}")))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(MetricSinkError::Config(format!("invalid url: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
