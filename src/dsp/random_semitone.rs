//! Random semitone sawtooth modulation.
//!
//! Splits the buffer into fixed-duration chunks and amplitude-modulates each
//! chunk with a sawtooth whose pitch is a random number of semitones above
//! `min_freq`. The sawtooth is evaluated on absolute time, so chunk edges do
//! not reset its phase.
//!
//! Without an `rng_seed` the output depends on the caller's generator and is
//! not reproducible unless that generator was seeded.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::buffer::SampleBuffer;
use crate::error::EffectError;
use crate::params::{ensure_range, ParamDefault, ParamMap, ParamReader, ParamSpec};

use super::oscillator::{sawtooth, semitone_to_frequency};

pub const NAME: &str = "random_semitone_sawtooth_wave";

const MIN_FREQ: ParamSpec = ParamSpec {
    name: "min_freq",
    aliases: &[],
    default: ParamDefault::Required,
    description: "Base sawtooth frequency in Hz",
};
const MAX_SEMITONES: ParamSpec = ParamSpec {
    name: "max_semitones",
    aliases: &[],
    default: ParamDefault::Required,
    description: "Largest random offset above min_freq, in semitones",
};
const PITCH_DURATION: ParamSpec = ParamSpec {
    name: "pitch_duration",
    aliases: &[],
    default: ParamDefault::Required,
    description: "Length of each constant-pitch chunk in seconds",
};
const WET: ParamSpec = ParamSpec {
    name: "wet",
    aliases: &[],
    default: ParamDefault::Number(0.5),
    description: "Modulated signal level (0-1)",
};
const RNG_SEED: ParamSpec = ParamSpec {
    name: "rng_seed",
    aliases: &["seed"],
    default: ParamDefault::Optional,
    description: "Seed for reproducible output",
};

pub const PARAMS: &[ParamSpec] = &[MIN_FREQ, MAX_SEMITONES, PITCH_DURATION, WET, RNG_SEED];

#[derive(Debug, Clone, PartialEq)]
pub struct RandomSemitoneParams {
    pub min_freq: f64,
    pub max_semitones: u32,
    /// Seconds per chunk.
    pub pitch_duration: f64,
    pub wet: f64,
    /// Overrides the caller's generator when set.
    pub rng_seed: Option<u64>,
}

impl RandomSemitoneParams {
    pub fn new(min_freq: f64, max_semitones: u32, pitch_duration: f64) -> Self {
        Self {
            min_freq,
            max_semitones,
            pitch_duration,
            wet: 0.5,
            rng_seed: None,
        }
    }

    pub fn from_params(params: &ParamMap) -> Result<Self, EffectError> {
        let mut r = ParamReader::new(NAME, params);
        let min_freq = r.f64(&MIN_FREQ)?;
        let max_semitones = r.u64(&MAX_SEMITONES)?;
        let pitch_duration = r.f64(&PITCH_DURATION)?;
        let wet = r.f64(&WET)?;
        let rng_seed = r.optional_u64(&RNG_SEED)?;
        r.finish()?;

        let max_semitones = u32::try_from(max_semitones)
            .map_err(|_| EffectError::invalid(NAME, "max_semitones", "too large"))?;
        let p = Self {
            min_freq,
            max_semitones,
            pitch_duration,
            wet,
            rng_seed,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> Result<(), EffectError> {
        if !(self.min_freq > 0.0) {
            return Err(EffectError::invalid(NAME, "min_freq", "must be greater than 0"));
        }
        if !(self.pitch_duration > 0.0) {
            return Err(EffectError::invalid(NAME, "pitch_duration", "must be greater than 0"));
        }
        ensure_range(NAME, "wet", self.wet, 0.0, 1.0)
    }

    /// Samples per constant-pitch chunk at `sample_rate`.
    pub fn chunk_size(&self, sample_rate: u32) -> usize {
        (self.pitch_duration * sample_rate as f64).round() as usize
    }

    /// Chunk size at `sample_rate`, rejecting chunks shorter than one sample.
    pub fn check_sample_rate(&self, sample_rate: u32) -> Result<usize, EffectError> {
        match self.chunk_size(sample_rate) {
            0 => Err(EffectError::invalid(
                NAME,
                "pitch_duration",
                format!("{} s is shorter than one sample at {sample_rate} Hz", self.pitch_duration),
            )),
            chunk => Ok(chunk),
        }
    }
}

/// Build the modulation signal for `len` samples.
pub fn modulation<R: Rng + ?Sized>(
    len: usize,
    sample_rate: u32,
    p: &RandomSemitoneParams,
    rng: &mut R,
) -> Result<Vec<f32>, EffectError> {
    let chunk = p.check_sample_rate(sample_rate)?;

    let sr = sample_rate as f64;
    let mut m = vec![0.0f32; len];
    for (c, block) in m.chunks_mut(chunk).enumerate() {
        let semitones = rng.gen_range(0..=p.max_semitones);
        let freq = semitone_to_frequency(p.min_freq, semitones as f64);
        let start = c * chunk;
        for (j, s) in block.iter_mut().enumerate() {
            let t = (start + j) as f64 / sr;
            *s = sawtooth(2.0 * PI * freq * t) as f32;
        }
    }
    Ok(m)
}

/// Apply the modulation: `x * m * wet + x * (1 - wet)`.
///
/// Uses a generator seeded from `p.rng_seed` when present, otherwise `rng`.
pub fn random_semitone<R: Rng + ?Sized>(
    input: &SampleBuffer,
    p: &RandomSemitoneParams,
    rng: &mut R,
) -> Result<SampleBuffer, EffectError> {
    let m = match p.rng_seed {
        Some(seed) => modulation(input.len(), input.sample_rate, p, &mut ChaCha8Rng::seed_from_u64(seed))?,
        None => modulation(input.len(), input.sample_rate, p, rng)?,
    };

    let wet = p.wet as f32;
    let samples = input
        .samples
        .iter()
        .zip(&m)
        .map(|(&x, &mod_val)| x * mod_val * wet + x * (1.0 - wet))
        .collect();
    Ok(input.with_samples(samples))
}
