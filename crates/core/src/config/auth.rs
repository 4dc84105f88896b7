//! Authentication settings for HTTP sinks

use std::fmt;

use metricsink_domain::{MetricSinkError, Result};
use serde::{Deserialize, Serialize};

/// Raw credentials as they appear in configuration
///
/// `scheme` is one of `anonymous`, `basic` or `bearer`. When it is omitted
/// the scheme is inferred: basic if both username and password are set,
/// bearer if only a token is set, anonymous otherwise.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub scheme: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AuthSettings {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            scheme: Some("basic".into()),
            username: Some(username.into()),
            password: Some(password.into()),
            token: None,
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self { scheme: Some("bearer".into()), token: Some(token.into()), ..Self::default() }
    }

    /// Resolve into a validated [`AuthScheme`]
    pub fn resolve(&self) -> Result<AuthScheme> {
        let username = present(self.username.as_deref());
        let password = present(self.password.as_deref());
        let token = present(self.token.as_deref());

        let scheme = match present(self.scheme.as_deref()) {
            Some(scheme) => scheme.to_lowercase(),
            None if username.is_some() && password.is_some() => "basic".to_string(),
            None if token.is_some() => "bearer".to_string(),
            None => "anonymous".to_string(),
        };

        match scheme.as_str() {
            "anonymous" | "none" => Ok(AuthScheme::Anonymous),
            "basic" => match (username, password) {
                (Some(username), Some(password)) => Ok(AuthScheme::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                _ => Err(MetricSinkError::Config(
                    "basic authentication requires a username and password".into(),
                )),
            },
            "bearer" | "bearer_token" | "bearertoken" => match token {
                Some(token) => Ok(AuthScheme::BearerToken { token: token.to_string() }),
                None => Err(MetricSinkError::Config(
                    "bearer authentication requires a token".into(),
                )),
            },
            other => Err(MetricSinkError::Config(format!(
                "unsupported authorization scheme '{other}'"
            ))),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validated authentication scheme
#[derive(Clone, PartialEq, Eq)]
pub enum AuthScheme {
    Anonymous,
    Basic { username: String, password: String },
    BearerToken { token: String },
}

impl AuthScheme {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Basic { .. } => "basic",
            Self::BearerToken { .. } => "bearer",
        }
    }
}

impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
            Self::BearerToken { .. } => f.write_str("BearerToken(<redacted>)"),
        }
    }
}
