//! Logging setup
//!
//! Every component logs through `tracing` with structured fields
//! (`reporter`, `target`, `status`, `failures`, `documents`). Hosts that
//! already install a subscriber can skip [`logging::init_tracing`].

pub mod logging;

pub use logging::{init_tracing, LogFormat};
