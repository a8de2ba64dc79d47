//! # framepack
//!
//! Pack labeled video-frame datasets into chunked binary files with
//! random-access indexes.
//!
//! `framepack` converts a manifest of labeled video entries — each a
//! directory of pre-extracted still frames, or a source video burst on
//! demand — into a set of self-contained chunk pairs: `data{N}.bin` (raw
//! frame bytes, back-to-back) plus `meta{N}.bin` (one fixed-shape index
//! record per frame). Any stored frame can later be read back by record
//! position without touching the rest of the chunk.
//!
//! ## Quick Start
//!
//! ### Pack a manifest of pre-extracted frames
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::{BuildOptions, DatasetPacker};
//! use framepack::manifest::{self, SourceLayout};
//!
//! let records = manifest::read_manifest(Path::new("train.csv")).unwrap();
//! let layout = SourceLayout::PreExtractedFrames { frames_root: "frames".into() };
//! let entries = manifest::to_entries(&records, &layout);
//!
//! let packer = DatasetPacker::new(
//!     BuildOptions::new()
//!         .with_chunk_size(100)
//!         .with_target_short_edge(224)
//!         .with_shuffle_seed(42),
//! );
//! let report = packer.pack(entries, Path::new("out")).unwrap();
//! assert!(report.is_complete());
//! ```
//!
//! ### Read a frame back
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::ChunkReader;
//!
//! let mut reader = ChunkReader::open(Path::new("out"), 0).unwrap();
//! let first_frame = reader.frame(0).unwrap();
//! std::fs::write("first_frame.jpg", first_frame).unwrap();
//! ```
//!
//! ## How a build works
//!
//! 1. The manifest is read into [`Entry`] values and (optionally)
//!    shuffled with a fixed seed, so chunk membership is reproducible.
//! 2. The planner slices the entry list into fixed-size [`Chunk`]s with
//!    stable integer ids.
//! 3. A bounded worker pool packages chunks in parallel. Each worker owns
//!    its chunk's output pair exclusively — no locking, no write
//!    contention.
//! 4. Inside a chunk, the [`FrameResolver`] produces each entry's frames
//!    (pre-extracted, or burst from the source video into a scratch
//!    directory that is always cleaned up), resized so their short edge
//!    matches the configured target.
//! 5. Failures stay contained: a bad entry is skipped and reported, a bad
//!    chunk is failed and reported, and only a misconfigured run aborts —
//!    before any file is created.
//!
//! The final [`BuildReport`] enumerates every skipped entry with its
//! reason and every failed chunk with its cause — enough to re-run just
//! the failed subset.

pub mod burst;
pub mod config;
pub mod error;
pub mod labels;
pub mod manifest;
pub mod orchestrate;
pub mod package;
pub mod plan;
pub mod progress;
pub mod resize;
pub mod resolve;

pub use burst::{Burster, FfmpegBurster};
pub use config::BuildOptions;
pub use error::{BuildError, FrameError, ManifestError, PackagingError, PlanError};
pub use labels::{LABEL_DICT_FILE, LabelDict, UNINDEXED_LABEL};
pub use manifest::{Entry, FrameSource, ManifestRecord, SourceLayout};
pub use orchestrate::{BuildReport, ChunkOutcome, DatasetPacker};
pub use package::{
    BinaryRecord, ChunkPackager, ChunkReader, ChunkWriter, PackagingSummary, data_file_path,
    meta_file_path,
};
pub use plan::{Chunk, plan};
pub use progress::{ChunkProgress, ProgressCallback};
pub use resize::resize_by_short_edge;
pub use resolve::{FrameResolver, ResolvedFrames};
