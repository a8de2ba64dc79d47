//! Progress reporting for builds.
//!
//! The orchestrator fires [`ProgressCallback::on_chunk_complete`] as each
//! chunk's worker finishes, in completion order — which is not dispatch
//! order. This is an observability affordance only; the build's result is
//! the [`BuildReport`](crate::BuildReport), not the callback stream.

use std::sync::Arc;

/// A snapshot delivered when one chunk finishes (successfully or not).
#[derive(Debug, Clone)]
pub struct ChunkProgress {
    /// The chunk that just finished.
    pub chunk_id: usize,
    /// Chunks finished so far, including this one.
    pub completed: usize,
    /// Total chunks in the run.
    pub total: usize,
    /// Records written by this chunk (zero when it failed).
    pub records_written: u64,
    /// Whether this chunk failed.
    pub failed: bool,
}

/// Trait for receiving per-chunk completion updates.
///
/// Implementations must be [`Send`] and [`Sync`] — callbacks fire from
/// worker threads. They are infallible: they observe but cannot halt the
/// build.
pub trait ProgressCallback: Send + Sync {
    /// Called once per chunk, as soon as its worker finishes.
    fn on_chunk_complete(&self, progress: &ChunkProgress);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_chunk_complete(&self, _progress: &ChunkProgress) {}
}

/// Convenience for the default callback.
pub(crate) fn no_op() -> Arc<dyn ProgressCallback> {
    Arc::new(NoOpProgress)
}
