//! HTTP transport shared by the bulk sinks

pub mod client;

pub use client::{authorization_header, HttpClient, HttpClientBuilder, DEFAULT_USER_AGENT};
