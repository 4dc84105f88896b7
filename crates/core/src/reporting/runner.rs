//! Per-cycle report orchestration
//!
//! One cycle: `Idle → Collecting → Flushing → Idle`.
//!
//! 1. init the builder
//! 2. snapshot the metrics source and pack every value source
//! 3. serialize and hand the payload to the writer
//! 4. clear the builder, whatever the outcome
//!
//! Cycles never return `Err`. Failures are logged and surface as
//! [`CycleOutcome::Failed`] so the scheduler keeps ticking.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::packing::MetricPacker;
use crate::payload::PayloadBuilder;
use crate::ports::{BulkWriter, MetricsSource, ReportTask};

/// Where a runner is within its current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReportPhase {
    Idle = 0,
    Collecting = 1,
    Flushing = 2,
}

impl ReportPhase {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Collecting,
            2 => Self::Flushing,
            _ => Self::Idle,
        }
    }
}

/// Result of one report cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The payload was written (possibly empty)
    Flushed { documents: usize },
    /// Snapshot, packing, serialization or write failed
    Failed { reason: String },
    /// Another cycle of this runner was still in flight
    Skipped,
}

impl CycleOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Flushed { .. })
    }
}

/// Resets the in-flight flag and phase however the cycle ends
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    phase: &'a AtomicU8,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.phase.store(ReportPhase::Idle as u8, Ordering::Release);
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Drives one reporter's cycles
///
/// The builder sits behind a std mutex that is never held across an await;
/// the in-flight flag keeps overlapping cycles out.
pub struct ReportRunner<B: PayloadBuilder> {
    name: String,
    builder: Mutex<B>,
    writer: Arc<dyn BulkWriter>,
    source: Arc<dyn MetricsSource>,
    packer: MetricPacker,
    phase: AtomicU8,
    in_flight: AtomicBool,
}

impl<B: PayloadBuilder> ReportRunner<B> {
    pub fn new(
        name: impl Into<String>,
        builder: B,
        writer: Arc<dyn BulkWriter>,
        source: Arc<dyn MetricsSource>,
        packer: MetricPacker,
    ) -> Self {
        Self {
            name: name.into(),
            builder: Mutex::new(builder),
            writer,
            source,
            packer,
            phase: AtomicU8::new(ReportPhase::Idle as u8),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn reporter_name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> ReportPhase {
        ReportPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Documents currently held by the builder; zero between cycles
    pub fn pending_documents(&self) -> usize {
        self.builder().document_count()
    }

    fn builder(&self) -> MutexGuard<'_, B> {
        self.builder.lock().unwrap_or_else(|poisoned| {
            warn!(reporter = %self.name, "payload builder mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn set_phase(&self, phase: ReportPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Run one cycle
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(reporter = %self.name, "previous report cycle still in flight, skipping");
            return CycleOutcome::Skipped;
        }
        let _guard = InFlightGuard { in_flight: &self.in_flight, phase: &self.phase };

        self.set_phase(ReportPhase::Collecting);
        self.builder().init();

        let outcome = self.collect_and_flush(cancel).await;
        self.builder().clear();

        match &outcome {
            CycleOutcome::Flushed { documents } => {
                info!(reporter = %self.name, documents, "report cycle flushed");
            }
            CycleOutcome::Failed { reason } => {
                warn!(reporter = %self.name, reason = %reason, "report cycle failed");
            }
            CycleOutcome::Skipped => {}
        }
        outcome
    }

    async fn collect_and_flush(&self, cancel: &CancellationToken) -> CycleOutcome {
        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => return CycleOutcome::Failed { reason: format!("snapshot failed: {err}") },
        };

        let (payload, documents) = {
            let mut builder = self.builder();
            match self.packer.pack_snapshot(&mut *builder, &snapshot) {
                Ok(summary) if summary.skipped > 0 => {
                    warn!(
                        reporter = %self.name,
                        skipped = summary.skipped,
                        documents = summary.documents,
                        "invalid metric sources left out of the payload"
                    );
                }
                Ok(_) => {}
                Err(err) => return CycleOutcome::Failed { reason: err.to_string() },
            }
            let documents = builder.document_count();
            match builder.serialize() {
                Ok(payload) => (payload, documents),
                Err(err) => return CycleOutcome::Failed { reason: err.to_string() },
            }
        };

        debug!(
            reporter = %self.name,
            target = self.writer.target(),
            documents,
            bytes = payload.len(),
            "flushing payload"
        );
        self.set_phase(ReportPhase::Flushing);

        let result = self.writer.write(&payload, cancel).await;
        if result.success {
            CycleOutcome::Flushed { documents }
        } else {
            CycleOutcome::Failed { reason: result.message().to_string() }
        }
    }
}

#[async_trait]
impl<B: PayloadBuilder + 'static> ReportTask for ReportRunner<B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_once(&self, cancel: &CancellationToken) -> bool {
        self.run_cycle(cancel).await.is_success()
    }
}
