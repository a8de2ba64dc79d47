//! Dataset manifests and the [`Entry`] data model.
//!
//! A manifest is a CSV or JSON file listing one labeled video per row. This
//! module reads either format into a uniform sequence of [`ManifestRecord`]s,
//! turns records into [`Entry`] values against a dataset root, and provides
//! the deterministic shuffle that fixes chunk membership for a given seed.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use framepack::manifest::{self, SourceLayout};
//!
//! let records = manifest::read_manifest(Path::new("train.csv"))?;
//! let layout = SourceLayout::PreExtractedFrames {
//!     frames_root: "frames".into(),
//! };
//! let mut entries = manifest::to_entries(&records, &layout);
//! manifest::shuffle_entries(&mut entries, 42);
//! # Ok::<(), framepack::ManifestError>(())
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// Where an entry's frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// A directory of pre-extracted still images, named so that
    /// lexicographic order matches capture order.
    PreExtractedDir(PathBuf),
    /// A source video to burst frames from on demand. The path may omit
    /// its extension; the resolver probes known video extensions.
    VideoFile(PathBuf),
}

/// One labeled video item to be packaged.
///
/// Immutable once read from the manifest. Identity is `id`; two entries
/// with the same id refer to the same video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable identifier, unique within the dataset.
    pub id: String,
    /// Class label as spelled in the manifest.
    pub label: String,
    /// Where to obtain this entry's frames.
    pub source: FrameSource,
}

/// One raw manifest row, before it is bound to a dataset root.
///
/// The field names accept the common Kinetics-style CSV headers
/// (`youtube_id`, `time_start`, `time_end`) as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Video identifier.
    #[serde(alias = "youtube_id")]
    pub id: String,
    /// Class label.
    pub label: String,
    /// Clip start marker in seconds, when the dataset uses trimmed clips.
    #[serde(default, alias = "time_start")]
    pub start_time: Option<u64>,
    /// Clip end marker in seconds.
    #[serde(default, alias = "time_end")]
    pub end_time: Option<u64>,
}

impl ManifestRecord {
    /// The identifier used for directories and records.
    ///
    /// When start/end markers are present the id is qualified with them,
    /// zero-padded to six digits (`abc_000010_000020`), matching the
    /// directory naming convention of trimmed-clip datasets.
    pub fn qualified_id(&self) -> String {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => format!("{}_{:06}_{:06}", self.id, start, end),
            _ => self.id.clone(),
        }
    }
}

/// How manifest records map onto files under a dataset root.
#[derive(Debug, Clone)]
pub enum SourceLayout {
    /// Frames were extracted ahead of time into
    /// `<frames_root>/<label>/<qualified_id>/`.
    PreExtractedFrames {
        /// Root of the pre-extracted frame tree.
        frames_root: PathBuf,
    },
    /// Source videos live flat under `<videos_root>/<id>`, with or without
    /// a file extension.
    SourceVideos {
        /// Root of the video files.
        videos_root: PathBuf,
    },
}

/// Bind manifest records to a dataset root, producing packaging entries.
pub fn to_entries(records: &[ManifestRecord], layout: &SourceLayout) -> Vec<Entry> {
    records
        .iter()
        .map(|record| {
            let id = record.qualified_id();
            let source = match layout {
                SourceLayout::PreExtractedFrames { frames_root } => {
                    FrameSource::PreExtractedDir(frames_root.join(&record.label).join(&id))
                }
                SourceLayout::SourceVideos { videos_root } => {
                    FrameSource::VideoFile(videos_root.join(&record.id))
                }
            };
            Entry {
                id,
                label: record.label.clone(),
                source,
            }
        })
        .collect()
}

/// Read a manifest file, dispatching on its extension.
///
/// `.csv` files are parsed with headers; `.json` files must contain a
/// top-level array of record objects.
///
/// # Errors
///
/// Returns [`ManifestError::UnsupportedFormat`] for any other extension,
/// or the underlying parse/I/O error.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRecord>, ManifestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => read_csv_manifest(path),
        Some("json") => read_json_manifest(path),
        _ => Err(ManifestError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Read a CSV manifest with a header row.
///
/// Columns beyond the known ones are ignored, so Kinetics-style manifests
/// with `split`/`is_cc` columns parse unchanged.
pub fn read_csv_manifest(path: &Path) -> Result<Vec<ManifestRecord>, ManifestError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    log::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read a JSON manifest containing an array of record objects.
pub fn read_json_manifest(path: &Path) -> Result<Vec<ManifestRecord>, ManifestError> {
    let file = File::open(path)?;
    let records: Vec<ManifestRecord> = serde_json::from_reader(BufReader::new(file))?;
    log::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Shuffle entries in place with a seeded RNG.
///
/// The same `(entries, seed)` pair always produces the same order, which is
/// what keeps chunk ids stable across re-runs of the same dataset.
pub fn shuffle_entries(entries: &mut [Entry], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    entries.shuffle(&mut rng);
}
