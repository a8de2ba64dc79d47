//! Build orchestration.
//!
//! [`DatasetPacker`] is the main entry point for the crate. It validates
//! the run (plan-level errors are raised before any file I/O), shuffles
//! and plans the entry list, and dispatches chunks to a bounded worker
//! pool. Each worker owns exactly one chunk's output pair at a time, so
//! there is no shared mutable state between workers and no cross-worker
//! locking — the planner's deterministic chunk-id assignment is what keeps
//! two workers from ever targeting the same files.
//!
//! One failing chunk never stops its siblings: every chunk's result is
//! collected into the [`BuildReport`], success or not.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::{BuildOptions, DatasetPacker, manifest::{self, SourceLayout}};
//!
//! let records = manifest::read_manifest(Path::new("train.csv"))?;
//! let layout = SourceLayout::PreExtractedFrames { frames_root: "frames".into() };
//! let entries = manifest::to_entries(&records, &layout);
//!
//! let packer = DatasetPacker::new(
//!     BuildOptions::new().with_chunk_size(100).with_shuffle_seed(42),
//! );
//! let report = packer.pack(entries, Path::new("out"))?;
//! println!(
//!     "{} records written, {} chunks failed",
//!     report.records_written, report.chunks_failed,
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fs,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::burst::{Burster, FfmpegBurster};
use crate::config::BuildOptions;
use crate::error::{BuildError, PackagingError, PlanError};
use crate::labels::LabelDict;
use crate::manifest::{Entry, shuffle_entries};
use crate::package::{ChunkPackager, PackagingSummary};
use crate::plan::{Chunk, plan};
use crate::progress::{ChunkProgress, ProgressCallback, no_op};
use crate::resolve::FrameResolver;

/// The result of packaging one chunk.
#[derive(Debug)]
pub struct ChunkOutcome {
    /// The chunk this outcome describes.
    pub chunk_id: usize,
    /// The chunk's summary, or the error that made its pair unusable.
    pub result: Result<PackagingSummary, PackagingError>,
}

impl ChunkOutcome {
    /// Whether the chunk's output pair is complete and usable.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregated outcome of a whole build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Per-chunk outcomes, ordered by `chunk_id`.
    pub outcomes: Vec<ChunkOutcome>,
    /// Total records written across successful chunks.
    pub records_written: u64,
    /// Total entries skipped across successful chunks.
    pub entries_skipped: usize,
    /// Number of chunks that failed.
    pub chunks_failed: usize,
}

impl BuildReport {
    fn from_outcomes(mut outcomes: Vec<ChunkOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.chunk_id);
        let mut report = Self {
            outcomes,
            ..Self::default()
        };
        for outcome in &report.outcomes {
            match &outcome.result {
                Ok(summary) => {
                    report.records_written += summary.records_written;
                    report.entries_skipped += summary.entries_skipped.len();
                }
                Err(_) => report.chunks_failed += 1,
            }
        }
        report
    }

    /// Whether every chunk succeeded.
    pub fn is_complete(&self) -> bool {
        self.chunks_failed == 0
    }

    /// Ids of failed chunks — the subset to re-run.
    pub fn failed_chunk_ids(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.is_success())
            .map(|outcome| outcome.chunk_id)
            .collect()
    }

    /// Every skipped entry as `(chunk_id, entry_id, reason)`.
    pub fn skipped_entries(&self) -> impl Iterator<Item = (usize, &str, &str)> {
        self.outcomes.iter().flat_map(|outcome| {
            outcome.result.iter().flat_map(move |summary| {
                summary
                    .entries_skipped
                    .iter()
                    .map(move |(entry_id, reason)| {
                        (outcome.chunk_id, entry_id.as_str(), reason.as_str())
                    })
            })
        })
    }
}

/// Packs a dataset of labeled video entries into chunked binary files.
///
/// Construction is cheap; all the work happens in
/// [`pack`](DatasetPacker::pack) (full pipeline) or
/// [`run`](DatasetPacker::run) (pre-planned chunks).
pub struct DatasetPacker {
    options: BuildOptions,
    labels: Option<LabelDict>,
    burster: Arc<dyn Burster>,
    progress: Arc<dyn ProgressCallback>,
}

impl DatasetPacker {
    /// Create a packer with the given options, no label dictionary, the
    /// default ffmpeg burster, and no progress callback.
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            labels: None,
            burster: Arc::new(FfmpegBurster::new()),
            progress: no_op(),
        }
    }

    /// Index labels through `labels`. Entries whose label is absent make
    /// the run fail at plan level, before any output exists.
    #[must_use]
    pub fn with_labels(mut self, labels: LabelDict) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Replace the burst implementation.
    #[must_use]
    pub fn with_burster(mut self, burster: Arc<dyn Burster>) -> Self {
        self.burster = burster;
        self
    }

    /// Receive a callback as each chunk completes.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the full pipeline: validate, shuffle, plan, and package.
    ///
    /// # Errors
    ///
    /// Plan-level failures ([`PlanError`] wrapped in [`BuildError`]) are
    /// returned before any file I/O. Per-chunk failures land in the
    /// report instead.
    pub fn pack(&self, mut entries: Vec<Entry>, output_dir: &Path) -> Result<BuildReport, BuildError> {
        self.options.validate()?;
        if entries.is_empty() {
            return Err(PlanError::EmptyManifest.into());
        }
        if let Some(dict) = &self.labels {
            for entry in &entries {
                if !dict.contains(&entry.label) {
                    return Err(PlanError::UnknownLabel {
                        entry_id: entry.id.clone(),
                        label: entry.label.clone(),
                    }
                    .into());
                }
            }
        }

        if let Some(seed) = self.options.shuffle_seed {
            shuffle_entries(&mut entries, seed);
        }
        let chunks = plan(entries, self.options.chunk_size).map_err(BuildError::Plan)?;

        self.run(chunks, output_dir)
    }

    /// Package pre-planned chunks with a bounded worker pool.
    ///
    /// Chunks complete in any order; the report is re-ordered by
    /// `chunk_id`.
    pub fn run(&self, chunks: Vec<Chunk>, output_dir: &Path) -> Result<BuildReport, BuildError> {
        self.options.validate()?;

        fs::create_dir_all(output_dir).map_err(|source| BuildError::OutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.worker_count)
            .thread_name(|index| format!("framepack-worker-{index}"))
            .build()
            .map_err(|error| BuildError::WorkerPool(error.to_string()))?;

        let mut resolver = FrameResolver::new(self.options.target_short_edge)
            .with_burster(self.burster.clone());
        if let Some(root) = &self.options.scratch_root {
            resolver = resolver.with_scratch_root(root);
        }

        let mut packager = ChunkPackager::new(&resolver)
            .with_overwrite(self.options.overwrite_existing);
        if let Some(dict) = &self.labels {
            packager = packager.with_labels(dict);
        }
        let packager = &packager;

        let total = chunks.len();
        let completed = AtomicUsize::new(0);
        log::info!(
            "Packaging {total} chunks into {} with {} workers",
            output_dir.display(),
            self.options.worker_count
        );

        let outcomes: Vec<ChunkOutcome> = pool.install(|| {
            chunks
                .into_par_iter()
                .map(|chunk| {
                    let chunk_id = chunk.chunk_id;
                    let result = packager.package(&chunk, output_dir);
                    if let Err(error) = &result {
                        log::error!("Chunk {chunk_id} failed: {error}");
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.progress.on_chunk_complete(&ChunkProgress {
                        chunk_id,
                        completed: done,
                        total,
                        records_written: result
                            .as_ref()
                            .map(|summary| summary.records_written)
                            .unwrap_or(0),
                        failed: result.is_err(),
                    });

                    ChunkOutcome { chunk_id, result }
                })
                .collect()
        });

        Ok(BuildReport::from_outcomes(outcomes))
    }
}
