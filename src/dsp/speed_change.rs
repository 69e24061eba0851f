//! Playback speed change. Duration changes with speed; pitch moves with it.

use crate::buffer::SampleBuffer;
use crate::error::EffectError;
use crate::params::{ParamDefault, ParamMap, ParamReader, ParamSpec};

use super::resample::resample_linear;

pub const NAME: &str = "speed_change";

/// Slowest accepted speed factor: output is at most 16 times the input length.
pub const MIN_SPEED_FACTOR: f64 = 1.0 / 16.0;

const SPEED_DELTA: ParamSpec = ParamSpec {
    name: "speed_delta",
    aliases: &["speed"],
    default: ParamDefault::Number(0.0),
    description: "Relative speed change: 0.25 is 25% faster, -0.25 is 25% slower",
};

pub const PARAMS: &[ParamSpec] = &[SPEED_DELTA];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedChangeParams {
    pub speed_delta: f64,
}

impl SpeedChangeParams {
    pub fn from_params(params: &ParamMap) -> Result<Self, EffectError> {
        let mut r = ParamReader::new(NAME, params);
        let p = Self {
            speed_delta: r.f64(&SPEED_DELTA)?,
        };
        r.finish()?;
        p.speed_factor()?;
        Ok(p)
    }

    /// `1 + speed_delta`, which must be positive and at least [`MIN_SPEED_FACTOR`].
    pub fn speed_factor(&self) -> Result<f64, EffectError> {
        let factor = 1.0 + self.speed_delta;
        if factor <= 0.0 {
            return Err(EffectError::invalid(
                NAME,
                "speed_delta",
                format!("speed factor must be > 0, got {factor}"),
            ));
        }
        if factor < MIN_SPEED_FACTOR {
            return Err(EffectError::invalid(
                NAME,
                "speed_delta",
                format!("speed factor must be at least {MIN_SPEED_FACTOR}, got {factor}"),
            ));
        }
        Ok(factor)
    }
}

/// Resample to `floor(len / (1 + speed_delta))` samples.
pub fn speed_change(input: &SampleBuffer, p: &SpeedChangeParams) -> Result<SampleBuffer, EffectError> {
    let factor = p.speed_factor()?;
    if p.speed_delta == 0.0 {
        return Ok(input.clone());
    }

    let new_len = (input.len() as f64 / factor).floor() as usize;
    Ok(input.with_samples(resample_linear(&input.samples, new_len)))
}
