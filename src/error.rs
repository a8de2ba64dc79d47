//! Error types for the `framepack` crate.
//!
//! Errors are split by blast radius, matching how the build pipeline treats
//! them: [`FrameError`] is entry-level and recoverable (the packager records
//! the skip and moves on), [`PackagingError`] is fatal to a single chunk,
//! and [`PlanError`] is fatal to the whole run and is always raised before
//! any file I/O happens. [`ManifestError`] covers the manifest reader seam,
//! and [`BuildError`] is the top-level type returned by
//! [`DatasetPacker::pack`](crate::DatasetPacker::pack).

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// An entry-level failure while resolving or transforming frames.
///
/// These never abort a chunk: the packager records the entry as skipped
/// (with this error's message as the reason) and continues with the next
/// entry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// No pre-extracted frames and no source video were found for an entry.
    #[error("Entry {entry_id}: no frames and no source video under {}", .searched.display())]
    SourceMissing {
        /// Id of the entry that could not be resolved.
        entry_id: String,
        /// Location that was searched for a source video.
        searched: PathBuf,
    },

    /// More than one candidate source video was found for an entry.
    ///
    /// The resolver refuses to guess which file is the right one.
    #[error("Entry {entry_id}: {count} candidate videos under {} (expected exactly one)", .searched.display())]
    SourceAmbiguous {
        /// Id of the entry that could not be resolved.
        entry_id: String,
        /// Location that was searched for a source video.
        searched: PathBuf,
        /// Number of candidate files found.
        count: usize,
    },

    /// Frame resolution produced an empty frame set, even after bursting.
    #[error("Entry {entry_id}: no frames produced")]
    NoFrames {
        /// Id of the entry that produced no frames.
        entry_id: String,
    },

    /// The external burst command failed or produced unusable output.
    #[error("Failed to burst {}: {reason}", .video.display())]
    BurstFailed {
        /// Path of the video that was being burst.
        video: PathBuf,
        /// Underlying reason the burst failed.
        reason: String,
    },

    /// A frame image could not be decoded or re-encoded.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// An I/O error while reading a frame file or creating a scratch
    /// directory.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// A run-level configuration or consistency failure.
///
/// Plan errors are detected before any chunk is dispatched and before any
/// output file is created, so a misconfigured run never leaves partial
/// output on disk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    /// `chunk_size` must be greater than zero.
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    /// `worker_count` must be greater than zero.
    #[error("Worker count must be greater than zero")]
    InvalidWorkerCount,

    /// `target_short_edge` must be greater than zero.
    #[error("Target short edge must be greater than zero")]
    InvalidShortEdge,

    /// The manifest produced no entries.
    #[error("Manifest contains no entries")]
    EmptyManifest,

    /// An entry's label is absent from the supplied label dictionary.
    #[error("Entry {entry_id}: label {label:?} is not in the label dictionary")]
    UnknownLabel {
        /// Id of the offending entry.
        entry_id: String,
        /// The label that could not be mapped.
        label: String,
    },
}

/// A chunk-level failure that makes one chunk's output pair unusable.
///
/// Packaging errors abort the chunk they occur in and are reported to the
/// orchestrator; sibling chunks are unaffected. Bytes already flushed for
/// fully-written frames are deliberately left on disk — a failed chunk is
/// regenerated from scratch, never patched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackagingError {
    /// An output file already exists and overwriting was not requested.
    #[error("Output file already exists: {} (enable overwrite to replace)", .path.display())]
    PathConflict {
        /// The pre-existing file.
        path: PathBuf,
    },

    /// An output file could not be created or opened.
    #[error("Failed to create {}: {source}", .path.display())]
    Create {
        /// The file that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// A meta file is truncated or does not parse as a record sequence.
    #[error("Malformed meta file {}: {reason}", .path.display())]
    MalformedMeta {
        /// The meta file that failed to parse.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A record index beyond the end of the meta file was requested.
    #[error("Record {index} is out of range (chunk has {count} records)")]
    RecordOutOfRange {
        /// The requested record position.
        index: usize,
        /// Number of records in the chunk.
        count: usize,
    },

    /// An I/O error while writing, flushing, or reading chunk files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// An error while reading a dataset manifest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The manifest extension is not a supported format.
    #[error("Unsupported manifest format: {} (expected .csv or .json)", .path.display())]
    UnsupportedFormat {
        /// The manifest path.
        path: PathBuf,
    },

    /// The manifest could not be parsed as CSV.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// The manifest could not be parsed as JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error while reading the manifest file.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// The top-level error returned by [`DatasetPacker::pack`](crate::DatasetPacker::pack).
///
/// Per-chunk failures do **not** surface here — they are collected into the
/// [`BuildReport`](crate::BuildReport). A `BuildError` means the run could
/// not start (or could not set up its worker pool) at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// A plan-level validation failure. Raised before any file I/O.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// The output directory could not be created.
    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// The worker thread pool could not be constructed.
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}
