//! Flanger: a short LFO-modulated delay line with feedback.
//!
//! A sine LFO sweeps the delay time between `min_delay` and `max_delay`.
//! The delayed signal is fed back into the line and mixed with the dry
//! input.

use crate::buffer::SampleBuffer;
use crate::error::EffectError;
use crate::params::{ensure_range, ParamDefault, ParamMap, ParamReader, ParamSpec};

use super::oscillator::unipolar_sine;

pub const NAME: &str = "flanger";

/// Longest accepted `max_delay` in seconds.
pub const MAX_DELAY_SECONDS: f64 = 1.0;

const RATE: ParamSpec = ParamSpec {
    name: "rate",
    aliases: &[],
    default: ParamDefault::Number(0.15),
    description: "LFO rate in Hz",
};
const MIN_DELAY: ParamSpec = ParamSpec {
    name: "min_delay",
    aliases: &[],
    default: ParamDefault::Number(0.0025),
    description: "Shortest delay in seconds",
};
const MAX_DELAY: ParamSpec = ParamSpec {
    name: "max_delay",
    aliases: &[],
    default: ParamDefault::Number(0.0035),
    description: "Longest delay in seconds",
};
const FEEDBACK: ParamSpec = ParamSpec {
    name: "feedback",
    aliases: &[],
    default: ParamDefault::Number(0.9),
    description: "Amount of delayed signal written back into the line",
};
const TIME_OFFSET: ParamSpec = ParamSpec {
    name: "time_offset",
    aliases: &["t_offset"],
    default: ParamDefault::Number(0.0),
    description: "LFO phase offset in seconds",
};
const DRY: ParamSpec = ParamSpec {
    name: "dry",
    aliases: &[],
    default: ParamDefault::Number(0.5),
    description: "Dry signal level (0-1)",
};
const WET: ParamSpec = ParamSpec {
    name: "wet",
    aliases: &[],
    default: ParamDefault::Number(0.5),
    description: "Delayed signal level (0-1)",
};

pub const PARAMS: &[ParamSpec] = &[RATE, MIN_DELAY, MAX_DELAY, FEEDBACK, TIME_OFFSET, DRY, WET];

/// Flanger settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FlangerParams {
    /// LFO rate in Hz.
    pub rate: f64,
    /// Minimum delay in seconds.
    pub min_delay: f64,
    /// Maximum delay in seconds. Sizes the delay line.
    pub max_delay: f64,
    /// Feedback gain, strictly inside (-1, 1).
    pub feedback: f64,
    /// LFO phase offset in seconds.
    pub time_offset: f64,
    pub dry: f64,
    pub wet: f64,
}

impl Default for FlangerParams {
    fn default() -> Self {
        Self {
            rate: 0.15,
            min_delay: 0.0025,
            max_delay: 0.0035,
            feedback: 0.9,
            time_offset: 0.0,
            dry: 0.5,
            wet: 0.5,
        }
    }
}

impl FlangerParams {
    pub fn from_params(params: &ParamMap) -> Result<Self, EffectError> {
        let mut r = ParamReader::new(NAME, params);
        let p = Self {
            rate: r.f64(&RATE)?,
            min_delay: r.f64(&MIN_DELAY)?,
            max_delay: r.f64(&MAX_DELAY)?,
            feedback: r.f64(&FEEDBACK)?,
            time_offset: r.f64(&TIME_OFFSET)?,
            dry: r.f64(&DRY)?,
            wet: r.f64(&WET)?,
        };
        r.finish()?;
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> Result<(), EffectError> {
        if !(self.max_delay > 0.0 && self.max_delay <= MAX_DELAY_SECONDS) {
            return Err(EffectError::invalid(
                NAME,
                "max_delay",
                format!("must be in (0, {MAX_DELAY_SECONDS}] seconds, got {}", self.max_delay),
            ));
        }
        ensure_range(NAME, "min_delay", self.min_delay, 0.0, self.max_delay)?;
        if self.rate < 0.0 {
            return Err(EffectError::invalid(NAME, "rate", "must not be negative"));
        }
        if !(self.feedback > -1.0 && self.feedback < 1.0) {
            return Err(EffectError::invalid(
                NAME,
                "feedback",
                format!("must be strictly between -1 and 1, got {}", self.feedback),
            ));
        }
        ensure_range(NAME, "dry", self.dry, 0.0, 1.0)?;
        ensure_range(NAME, "wet", self.wet, 0.0, 1.0)?;
        Ok(())
    }
}

/// Delay-line length for a maximum delay at a given rate, or `None` when it
/// does not fit in `usize`.
///
/// Two samples of slack keep `(n - delay_samples) mod len` from ever landing
/// on the slot being written.
pub fn delay_line_len(max_delay: f64, sample_rate: u32) -> Option<usize> {
    let slots = (max_delay * sample_rate as f64).ceil();
    if !(slots >= 0.0 && slots <= (usize::MAX - 2) as f64) {
        return None;
    }
    (slots as usize).checked_add(2)
}

/// Check that the delay line for `p` can be built at `sample_rate`.
pub fn check_sample_rate(p: &FlangerParams, sample_rate: u32) -> Result<usize, EffectError> {
    delay_line_len(p.max_delay, sample_rate).ok_or_else(|| {
        EffectError::invalid(
            NAME,
            "max_delay",
            format!("{} s delay line does not fit in memory at {sample_rate} Hz", p.max_delay),
        )
    })
}

/// Apply the flanger. Output has the same length as the input.
pub fn flanger(input: &SampleBuffer, p: &FlangerParams) -> Result<SampleBuffer, EffectError> {
    let sr = input.sample_rate as f64;
    let line_len = check_sample_rate(p, input.sample_rate)?;
    let mut line = vec![0.0f32; line_len];
    let depth = p.max_delay - p.min_delay;
    let feedback = p.feedback as f32;
    let dry = p.dry as f32;
    let wet = p.wet as f32;

    let mut out = Vec::with_capacity(input.len());
    for (n, &x) in input.samples.iter().enumerate() {
        let t = n as f64 / sr + p.time_offset;
        let delay_time = p.min_delay + depth * unipolar_sine(p.rate, t);
        let delay_samples = (delay_time * sr) as i64;

        let read_pos = (n as i64 - delay_samples).rem_euclid(line_len as i64) as usize;
        let write_pos = n % line_len;

        let delayed = line[read_pos];
        line[write_pos] = x + feedback * delayed;

        out.push(dry * x + wet * delayed);
    }

    Ok(input.with_samples(out))
}
