//! Report cycle orchestration

pub mod runner;

pub use runner::{CycleOutcome, ReportPhase, ReportRunner};
