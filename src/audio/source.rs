//! Window loading with progressively more conservative retries.

use std::path::{Path, PathBuf};

use super::decode::{decode_audio, AudioBuffer};
use crate::error::{AnalysisError, Result};

/// Anything that can hand out a window of mono audio.
pub trait AudioSource {
    /// Load `duration` seconds starting at `offset`. `None` reads to the end.
    fn load(&self, offset: f32, duration: Option<f32>) -> Result<AudioBuffer>;

    /// Total length in seconds, if known without loading.
    fn total_duration(&self) -> Option<f32>;

    /// Get the name of this source (for logging)
    fn name(&self) -> String;
}

/// A file decoded once up front; windows are sliced out of memory.
pub struct FileSource {
    path: PathBuf,
    buffer: AudioBuffer,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let buffer = decode_audio(path).map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            buffer,
        })
    }
}

impl AudioSource for FileSource {
    fn load(&self, offset: f32, duration: Option<f32>) -> Result<AudioBuffer> {
        self.buffer.window(offset, duration)
    }

    fn total_duration(&self) -> Option<f32> {
        Some(self.buffer.duration())
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

impl AudioSource for AudioBuffer {
    fn load(&self, offset: f32, duration: Option<f32>) -> Result<AudioBuffer> {
        self.window(offset, duration)
    }

    fn total_duration(&self) -> Option<f32> {
        Some(self.duration())
    }

    fn name(&self) -> String {
        "<memory>".to_string()
    }
}

/// The window the caller asked for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowRequest {
    pub offset: f32,
    pub duration: f32,
    /// Duration used by the last retry.
    pub fallback_duration: f32,
}

/// Shrink a request so it fits a track of `total` seconds.
///
/// Keeps a 5 s tail margin. When fewer than 10 s would remain the offset is
/// dropped and up to `fallback_duration` seconds from the start are used.
pub fn plan_window(request: WindowRequest, total: f32) -> WindowRequest {
    let mut offset = request.offset;
    let mut duration = request.duration.min(total - offset - 5.0);
    if duration < 10.0 {
        duration = request.fallback_duration.min(total);
        offset = 0.0;
    }
    WindowRequest {
        offset,
        duration,
        ..request
    }
}

/// Load the requested window, retrying without offset and then with the
/// fallback duration. All attempts failing is a hard error.
pub fn load_window(source: &dyn AudioSource, request: WindowRequest) -> Result<AudioBuffer> {
    let err = match source.load(request.offset, Some(request.duration)) {
        Ok(buf) => {
            log::info!("Loaded {:.1}s of audio from {}", buf.duration(), source.name());
            return Ok(buf);
        }
        Err(e) => e,
    };
    log::warn!("Error with offset {:.1}s, trying without: {}", request.offset, err);

    let err = match source.load(0.0, Some(request.duration)) {
        Ok(buf) => {
            log::info!("Loaded {:.1}s of audio (no offset)", buf.duration());
            return Ok(buf);
        }
        Err(e) => e,
    };
    log::warn!("Error without offset, trying {:.0}s fallback: {}", request.fallback_duration, err);

    match source.load(0.0, Some(request.fallback_duration)) {
        Ok(buf) => {
            log::info!("Loaded {:.1}s of audio (fallback)", buf.duration());
            Ok(buf)
        }
        Err(e) => {
            log::error!("Error loading audio from {}: {}", source.name(), e);
            Err(AnalysisError::WindowUnavailable { last: Box::new(e) })
        }
    }
}
