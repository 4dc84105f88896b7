//! Common utility functions
//!
//! - **[`serde`]**: Serialization helpers for configuration values

pub mod serde;

pub use self::serde::duration_millis;
