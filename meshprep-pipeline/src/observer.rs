//! Host notification hooks

use meshprep_algorithms::GroundingReport;
use tracing::info;

/// Receives lifecycle events from an [`crate::Asset`].
///
/// All methods default to doing nothing. Callbacks run on the thread that
/// triggered the event, which may be a worker thread.
pub trait PipelineObserver: Send + Sync {
    /// The asset was grounded after a load.
    fn on_grounded(&self, _report: &GroundingReport) {}

    /// An optimize pass finished; `generation` is the new counter value.
    fn on_ready(&self, _generation: u64) {}

    /// The asset entered or left an optimize pass.
    fn on_busy_changed(&self, _busy: bool) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that logs every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_grounded(&self, report: &GroundingReport) {
        info!(
            scaled = ?report.scaled,
            base = ?report.base,
            offset = report.offset,
            "asset grounded"
        );
    }

    fn on_ready(&self, generation: u64) {
        info!(generation, "asset ready");
    }

    fn on_busy_changed(&self, busy: bool) {
        info!(busy, "optimize state changed");
    }
}
