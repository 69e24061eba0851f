//! Pitch shift by resampling plus overlap-add time correction.
//!
//! The signal is first resampled, which moves pitch and duration together,
//! then stretched back to its original length by overlap-adding fixed-size
//! segments. Segments are added with a rectangular window, so segment
//! boundaries can produce audible clicks.

use log::warn;

use crate::buffer::{peak, SampleBuffer};
use crate::error::EffectError;
use crate::params::{ensure_range, ParamDefault, ParamMap, ParamReader, ParamSpec};

use super::resample::resample_linear;

pub const NAME: &str = "pitch_shift";

/// Overlap-add segment length in samples.
pub const WINDOW_SIZE: usize = 2048;
/// Distance between consecutive segment starts.
pub const HOP_SIZE: usize = WINDOW_SIZE / 4;
/// Largest accepted shift either way: four octaves, so the resampled
/// signal is at most 16 times the input length.
pub const MAX_SEMITONE_CENTS: f64 = 400.0;

const SEMITONE_CENTS: ParamSpec = ParamSpec {
    name: "semitone_cents",
    aliases: &["pitch_change"],
    default: ParamDefault::Number(0.0),
    description: "Shift where +100 is one octave up and -100 one octave down",
};

pub const PARAMS: &[ParamSpec] = &[SEMITONE_CENTS];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchShiftParams {
    pub semitone_cents: f64,
}

impl PitchShiftParams {
    pub fn from_params(params: &ParamMap) -> Result<Self, EffectError> {
        let mut r = ParamReader::new(NAME, params);
        let p = Self {
            semitone_cents: r.f64(&SEMITONE_CENTS)?,
        };
        r.finish()?;
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> Result<(), EffectError> {
        ensure_range(
            NAME,
            "semitone_cents",
            self.semitone_cents,
            -MAX_SEMITONE_CENTS,
            MAX_SEMITONE_CENTS,
        )
    }

    /// Frequency ratio applied by the resampling stage.
    pub fn pitch_factor(&self) -> f64 {
        2.0_f64.powf(self.semitone_cents / 100.0)
    }
}

/// Shift the pitch while keeping the buffer length.
pub fn pitch_shift(input: &SampleBuffer, p: &PitchShiftParams) -> SampleBuffer {
    if p.semitone_cents == 0.0 || input.is_empty() {
        return input.clone();
    }

    let input_len = input.len();
    let shifted_len = (input_len as f64 / p.pitch_factor()).round() as usize;
    let shifted = resample_linear(&input.samples, shifted_len);

    if input_len <= WINDOW_SIZE {
        warn!(
            "pitch_shift: {input_len} samples is not longer than one {WINDOW_SIZE}-sample window, output will be silent"
        );
    }

    let mut out = overlap_add(&shifted, input_len);

    let out_peak = peak(&out);
    if out_peak > 0.0 {
        let scale = input.peak() / out_peak;
        for s in out.iter_mut() {
            *s *= scale;
        }
    }

    input.with_samples(out)
}

/// Rectangular overlap-add of `source` onto a timeline of `output_len` samples.
///
/// Each output segment start `i` reads the source at the proportional offset
/// `i * source_len / output_len`. Stops at the first segment that would read
/// past the end of `source`.
fn overlap_add(source: &[f32], output_len: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; output_len];
    if output_len <= WINDOW_SIZE {
        return out;
    }

    let source_len = source.len();
    for i in (0..output_len - WINDOW_SIZE).step_by(HOP_SIZE) {
        let pos = segment_offset(i, source_len, output_len);
        if pos + WINDOW_SIZE > source_len {
            break;
        }
        for (o, &s) in out[i..i + WINDOW_SIZE].iter_mut().zip(&source[pos..pos + WINDOW_SIZE]) {
            *o += s;
        }
    }
    out
}

/// `i * source_len / output_len`, computed in 64 bits so the product cannot
/// wrap where `usize` is 32 bits wide.
#[inline]
fn segment_offset(i: usize, source_len: usize, output_len: usize) -> usize {
    (i as u64 * source_len as u64 / output_len as u64) as usize
}
