//! Frame resolution.
//!
//! [`FrameResolver`] turns one [`Entry`] into its ordered sequence of
//! resized frame images. Pre-extracted frames are used when present; when
//! the frame directory is empty or missing the resolver falls back to
//! bursting the entry's single source video into a scratch directory.
//!
//! Resolution is lazy: [`ResolvedFrames`] reads and resizes one frame per
//! iteration step, so peak memory is bounded by a single image regardless
//! of entry length. The scratch directory (when bursting was needed) lives
//! inside `ResolvedFrames` as a [`TempDir`] and is removed when the
//! iterator is dropped — on success, skip, and error paths alike.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;

use crate::burst::{Burster, FfmpegBurster};
use crate::error::FrameError;
use crate::manifest::{Entry, FrameSource};
use crate::resize::resize_by_short_edge;

/// Image extensions recognized in pre-extracted frame directories.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Video extensions probed when locating an entry's source video.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "m4v"];

/// Resolves entries to ordered frame image sequences.
///
/// # Example
///
/// ```no_run
/// use framepack::{Entry, FrameResolver, FrameSource};
///
/// let resolver = FrameResolver::new(224);
/// let entry = Entry {
///     id: "clip_000001_000010".into(),
///     label: "jump".into(),
///     source: FrameSource::PreExtractedDir("frames/jump/clip_000001_000010".into()),
/// };
/// for frame in resolver.resolve(&entry)? {
///     let jpeg_bytes = frame?;
///     // feed to the packager
/// }
/// # Ok::<(), framepack::FrameError>(())
/// ```
pub struct FrameResolver {
    burster: Arc<dyn Burster>,
    target_short_edge: u32,
    scratch_root: Option<PathBuf>,
}

impl FrameResolver {
    /// Create a resolver that resizes frames to `target_short_edge` and
    /// bursts with [`FfmpegBurster`].
    pub fn new(target_short_edge: u32) -> Self {
        Self {
            burster: Arc::new(FfmpegBurster::new()),
            target_short_edge,
            scratch_root: None,
        }
    }

    /// Replace the burst implementation.
    #[must_use]
    pub fn with_burster(mut self, burster: Arc<dyn Burster>) -> Self {
        self.burster = burster;
        self
    }

    /// Put burst scratch directories under `root` instead of the system
    /// temp directory. Useful for pointing at shared memory (`/dev/shm`).
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Resolve one entry to its lazy frame sequence.
    ///
    /// # Errors
    ///
    /// [`FrameError::SourceMissing`] / [`FrameError::SourceAmbiguous`] when
    /// the burst fallback cannot identify exactly one source video,
    /// [`FrameError::NoFrames`] when resolution yields an empty frame set,
    /// or the underlying burst/I/O error.
    pub fn resolve(&self, entry: &Entry) -> Result<ResolvedFrames, FrameError> {
        let (paths, scratch) = match &entry.source {
            FrameSource::PreExtractedDir(dir) => {
                let frames = list_image_files(dir)?;
                if frames.is_empty() {
                    log::debug!(
                        "Entry {}: no pre-extracted frames in {}, trying burst fallback",
                        entry.id,
                        dir.display()
                    );
                    self.burst_single_source(entry)?
                } else {
                    (frames, None)
                }
            }
            FrameSource::VideoFile(_) => self.burst_single_source(entry)?,
        };

        if paths.is_empty() {
            // Dropping `scratch` here removes the burst directory.
            return Err(FrameError::NoFrames {
                entry_id: entry.id.clone(),
            });
        }

        Ok(ResolvedFrames {
            paths: paths.into_iter(),
            target_short_edge: self.target_short_edge,
            _scratch: scratch,
        })
    }

    /// Locate exactly one source video for the entry and burst it.
    fn burst_single_source(
        &self,
        entry: &Entry,
    ) -> Result<(Vec<PathBuf>, Option<TempDir>), FrameError> {
        let searched = source_search_root(&entry.source);
        let candidates = video_candidates(&entry.source)?;

        let video = match candidates.as_slice() {
            [] => {
                return Err(FrameError::SourceMissing {
                    entry_id: entry.id.clone(),
                    searched,
                });
            }
            [single] => single,
            many => {
                return Err(FrameError::SourceAmbiguous {
                    entry_id: entry.id.clone(),
                    searched,
                    count: many.len(),
                });
            }
        };

        let scratch = self.create_scratch_dir()?;
        let mut frames = self.burster.burst(video, scratch.path())?;
        frames.sort();
        Ok((frames, Some(scratch)))
    }

    fn create_scratch_dir(&self) -> Result<TempDir, FrameError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("framepack-burst-");
        match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                Ok(builder.tempdir_in(root)?)
            }
            None => Ok(builder.tempdir()?),
        }
    }
}

/// Lazy, single-pass sequence of resized frame images for one entry.
///
/// Each iteration step reads one frame file and applies the resize
/// primitive, yielding encoded JPEG bytes. Holding this value keeps the
/// burst scratch directory (if any) alive; dropping it deletes the
/// directory.
#[derive(Debug)]
pub struct ResolvedFrames {
    paths: std::vec::IntoIter<PathBuf>,
    target_short_edge: u32,
    _scratch: Option<TempDir>,
}

impl ResolvedFrames {
    /// Number of frames not yet yielded.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl Iterator for ResolvedFrames {
    type Item = Result<Vec<u8>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(load_and_resize(&path, self.target_short_edge))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

fn load_and_resize(path: &Path, target_short_edge: u32) -> Result<Vec<u8>, FrameError> {
    let bytes = fs::read(path)?;
    resize_by_short_edge(&bytes, target_short_edge)
}

/// List image files in `dir`, sorted lexicographically.
///
/// A missing directory is an empty list, not an error — the caller falls
/// back to the source video exactly as it does for an empty directory.
fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, FrameError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut frames = Vec::new();
    for dir_entry in dir.read_dir()? {
        let path = dir_entry?.path();
        if path.is_file() && has_extension_in(&path, IMAGE_EXTENSIONS) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Candidate source videos for an entry, without guessing between them.
fn video_candidates(source: &FrameSource) -> Result<Vec<PathBuf>, FrameError> {
    let mut candidates = Vec::new();
    match source {
        FrameSource::VideoFile(path) => {
            if path.is_file() {
                candidates.push(path.clone());
            } else {
                // The manifest may omit the extension; probe the known ones.
                for ext in VIDEO_EXTENSIONS {
                    let probed = path.with_extension(ext);
                    if probed.is_file() {
                        candidates.push(probed);
                    }
                }
            }
        }
        FrameSource::PreExtractedDir(dir) => {
            // A video stored inside the frame directory itself...
            if dir.is_dir() {
                for dir_entry in dir.read_dir()? {
                    let path = dir_entry?.path();
                    if path.is_file() && has_extension_in(&path, VIDEO_EXTENSIONS) {
                        candidates.push(path);
                    }
                }
            }
            // ...or a sibling file named after the directory.
            if let (Some(parent), Some(name)) = (dir.parent(), dir.file_name()) {
                let name = name.to_string_lossy();
                if parent.is_dir() {
                    for dir_entry in parent.read_dir()? {
                        let path = dir_entry?.path();
                        if path.is_file()
                            && has_extension_in(&path, VIDEO_EXTENSIONS)
                            && path
                                .file_stem()
                                .is_some_and(|stem| stem.to_string_lossy() == name)
                        {
                            candidates.push(path);
                        }
                    }
                }
            }
        }
    }
    candidates.sort();
    candidates.dedup();
    Ok(candidates)
}

fn source_search_root(source: &FrameSource) -> PathBuf {
    match source {
        FrameSource::PreExtractedDir(dir) => dir.clone(),
        FrameSource::VideoFile(path) => path.clone(),
    }
}

fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let lower = ext.to_ascii_lowercase();
            extensions.contains(&lower.as_str())
        })
}
