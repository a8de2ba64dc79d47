//! The frame-bursting primitive.
//!
//! Bursting turns a source video into a directory of still frames. The
//! [`Burster`] trait is the seam the resolver calls through; the scratch
//! directory's lifecycle is owned by the caller, so implementations only
//! write into it and report what they wrote.
//!
//! [`FfmpegBurster`] is the default implementation. It shells out to the
//! `ffmpeg` executable rather than linking the FFmpeg libraries: one
//! subprocess per video keeps workers isolated and requires nothing beyond
//! a binary on `PATH`.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::error::FrameError;

/// Extracts still frames from a video into a scratch directory.
///
/// Implementations must be [`Send`] and [`Sync`]: one shared burster is
/// called from every packaging worker.
pub trait Burster: Send + Sync {
    /// Burst `video` into `scratch_dir`, returning the extracted frame
    /// paths in capture order.
    ///
    /// `scratch_dir` exists and is empty on entry; the caller deletes it
    /// afterwards regardless of the outcome. An empty result is not an
    /// error here — the resolver decides what an empty frame set means.
    fn burst(&self, video: &Path, scratch_dir: &Path) -> Result<Vec<PathBuf>, FrameError>;
}

/// Default [`Burster`] that invokes the `ffmpeg` executable.
///
/// Frames are written as `frame_%06d.jpg` so lexicographic order equals
/// capture order.
#[derive(Debug, Clone)]
pub struct FfmpegBurster {
    executable: PathBuf,
}

impl FfmpegBurster {
    /// Use `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            executable: PathBuf::from("ffmpeg"),
        }
    }

    /// Use a specific ffmpeg executable.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Default for FfmpegBurster {
    fn default() -> Self {
        Self::new()
    }
}

impl Burster for FfmpegBurster {
    fn burst(&self, video: &Path, scratch_dir: &Path) -> Result<Vec<PathBuf>, FrameError> {
        let pattern = scratch_dir.join("frame_%06d.jpg");
        log::debug!(
            "Bursting {} into {}",
            video.display(),
            scratch_dir.display()
        );

        let output = Command::new(&self.executable)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(video)
            .arg("-qscale:v")
            .arg("2")
            .arg(&pattern)
            .output()
            .map_err(|error| FrameError::BurstFailed {
                video: video.to_path_buf(),
                reason: format!("could not run {}: {error}", self.executable.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FrameError::BurstFailed {
                video: video.to_path_buf(),
                reason: format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let mut frames = Vec::new();
        for dir_entry in scratch_dir.read_dir()? {
            let path = dir_entry?.path();
            if path.extension().is_some_and(|ext| ext == "jpg") {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}
