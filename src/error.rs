use std::path::PathBuf;

use thiserror::Error;

/// Top-level error for the voxfx pipeline.
#[derive(Debug, Error)]
pub enum VoxError {
    #[error("Effect chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("WAV error: {0}")]
    Wav(#[from] WavError),
    #[error("Invalid effect chain JSON: {0}")]
    ChainSpec(#[from] serde_json::Error),
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure raised by a single effect operator or while parsing its parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    #[error("Unknown effect '{0}'")]
    UnknownEffect(String),
    #[error("Invalid parameter '{key}' for effect '{effect}': {reason}")]
    InvalidParameter {
        effect: String,
        key: String,
        reason: String,
    },
    #[error("Effect '{effect}' failed: {cause}")]
    ProcessingFailure { effect: String, cause: String },
}

impl EffectError {
    pub fn invalid(effect: &str, key: &str, reason: impl Into<String>) -> Self {
        EffectError::InvalidParameter {
            effect: effect.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failure(effect: &str, cause: impl Into<String>) -> Self {
        EffectError::ProcessingFailure {
            effect: effect.to_string(),
            cause: cause.into(),
        }
    }
}

/// An effect error located at a step of a chain.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("step {step} ({effect}): {source}")]
pub struct ChainError {
    /// Zero-based index of the failing step.
    pub step: usize,
    /// Name of the effect as written in the chain.
    pub effect: String,
    #[source]
    pub source: EffectError,
}

impl ChainError {
    /// True when the failing step named an effect the registry does not know.
    pub fn is_unknown_effect(&self) -> bool {
        matches!(self.source, EffectError::UnknownEffect(_))
    }
}

#[derive(Debug, Error)]
pub enum WavError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Only mono WAV files are supported (got {0} channels)")]
    UnsupportedChannels(u16),
    #[error("Unsupported sample format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },
    #[error("Sample rate must be positive")]
    InvalidSampleRate,
    #[error(transparent)]
    Hound(#[from] hound::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
