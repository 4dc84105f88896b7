//! Serialization utilities for configuration values
//!
//! Reporter settings express intervals, backoff windows and request timeouts
//! as integer milliseconds so the same value reads identically in JSON, TOML
//! and environment variables.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serde adapter storing a [`Duration`] as whole milliseconds
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use metricsink_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Policy {
///     #[serde(with = "duration_millis")]
///     backoff_period: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds, saturating at `u64::MAX`
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize milliseconds into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
