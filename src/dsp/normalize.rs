//! Peak normalization with DC offset removal.

use log::warn;

use crate::buffer::{peak, SampleBuffer, PCM_MAX};
use crate::error::EffectError;
use crate::params::{ParamDefault, ParamMap, ParamReader, ParamSpec};

pub const NAME: &str = "normalize";

/// Peaks below this are treated as silence and left unscaled.
pub const SILENCE_THRESHOLD: f32 = 1e-9;

const TARGET_PEAK: ParamSpec = ParamSpec {
    name: "target_peak",
    aliases: &["max_amplitude"],
    default: ParamDefault::Number(PCM_MAX as f64),
    description: "Peak amplitude after scaling (PCM scale)",
};

pub const PARAMS: &[ParamSpec] = &[TARGET_PEAK];

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeParams {
    pub target_peak: f64,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            target_peak: PCM_MAX as f64,
        }
    }
}

impl NormalizeParams {
    pub fn from_params(params: &ParamMap) -> Result<Self, EffectError> {
        let mut r = ParamReader::new(NAME, params);
        let p = Self {
            target_peak: r.f64(&TARGET_PEAK)?,
        };
        r.finish()?;
        if p.target_peak <= 0.0 {
            return Err(EffectError::invalid(NAME, "target_peak", "must be greater than 0"));
        }
        Ok(p)
    }
}

/// Subtract the mean, then scale so the peak equals `target_peak`.
///
/// A silent signal (peak under [`SILENCE_THRESHOLD`] after centering) is
/// returned centered but unscaled.
pub fn normalize(input: &SampleBuffer, p: &NormalizeParams) -> SampleBuffer {
    if input.is_empty() {
        return input.clone();
    }

    let mean = input.samples.iter().map(|&s| s as f64).sum::<f64>() / input.len() as f64;
    let centered: Vec<f32> = input
        .samples
        .iter()
        .map(|&s| (s as f64 - mean) as f32)
        .collect();

    let current_peak = peak(&centered);
    if current_peak < SILENCE_THRESHOLD {
        warn!("normalize: signal is silent after DC removal, leaving it unscaled");
        return input.with_samples(centered);
    }

    let scale = (p.target_peak / current_peak as f64) as f32;
    input.with_samples(centered.into_iter().map(|s| s * scale).collect())
}
