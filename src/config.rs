//! Build configuration.
//!
//! [`BuildOptions`] carries every knob the pipeline reads — there is no
//! ambient state: the options value is passed explicitly into
//! [`DatasetPacker`](crate::DatasetPacker) and threaded from there into
//! each component.
//!
//! # Example
//!
//! ```
//! use framepack::BuildOptions;
//!
//! let options = BuildOptions::new()
//!     .with_chunk_size(100)
//!     .with_worker_count(8)
//!     .with_target_short_edge(224)
//!     .with_shuffle_seed(42)
//!     .with_overwrite_existing(true);
//! assert!(options.validate().is_ok());
//! ```

use std::path::PathBuf;

use crate::error::PlanError;

/// Configuration for one packaging run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub(crate) chunk_size: usize,
    pub(crate) worker_count: usize,
    pub(crate) target_short_edge: u32,
    pub(crate) overwrite_existing: bool,
    pub(crate) shuffle_seed: Option<u64>,
    pub(crate) scratch_root: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildOptions {
    /// Create options with defaults: 100 entries per chunk, one worker per
    /// CPU, 224-pixel short edge, no overwriting, no shuffle.
    pub fn new() -> Self {
        Self {
            chunk_size: 100,
            worker_count: num_cpus::get(),
            target_short_edge: 224,
            overwrite_existing: false,
            shuffle_seed: None,
            scratch_root: None,
        }
    }

    /// Entries per chunk.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Parallel packaging workers.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Resize target passed through to the resize primitive.
    #[must_use]
    pub fn with_target_short_edge(mut self, target_short_edge: u32) -> Self {
        self.target_short_edge = target_short_edge;
        self
    }

    /// Whether pre-existing chunk files are replaced (`true`) or treated
    /// as a conflict (`false`, the default).
    #[must_use]
    pub fn with_overwrite_existing(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }

    /// Shuffle entries with this seed before planning. Without a seed the
    /// manifest order is used as-is.
    #[must_use]
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Put burst scratch directories under this root (e.g. `/dev/shm`).
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Entries per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Parallel packaging workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Resize target.
    pub fn target_short_edge(&self) -> u32 {
        self.target_short_edge
    }

    /// Overwrite policy.
    pub fn overwrite_existing(&self) -> bool {
        self.overwrite_existing
    }

    /// Check the options for values that would misconfigure a run.
    ///
    /// # Errors
    ///
    /// [`PlanError::InvalidChunkSize`], [`PlanError::InvalidWorkerCount`],
    /// or [`PlanError::InvalidShortEdge`] for zero values.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.chunk_size == 0 {
            return Err(PlanError::InvalidChunkSize);
        }
        if self.worker_count == 0 {
            return Err(PlanError::InvalidWorkerCount);
        }
        if self.target_short_edge == 0 {
            return Err(PlanError::InvalidShortEdge);
        }
        Ok(())
    }
}
