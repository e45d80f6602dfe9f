use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the analysis core.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to decode '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Audio buffer is empty")]
    EmptyAudio,

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Window at {offset:.1}s (+{duration:.1}s) is outside {total:.1}s of audio")]
    WindowOutOfRange {
        offset: f32,
        duration: f32,
        total: f32,
    },

    /// Every retry of the window loader failed; the pipeline must abort.
    #[error("Could not load any analysis window: {last}")]
    WindowUnavailable { last: Box<AnalysisError> },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
