//! Effect registry: the fixed table of effects a chain step may name.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::buffer::SampleBuffer;
use crate::dsp::flanger::{self, FlangerParams};
use crate::dsp::normalize::{self, NormalizeParams};
use crate::dsp::pitch_shift::{self, PitchShiftParams};
use crate::dsp::random_semitone::{self, RandomSemitoneParams};
use crate::dsp::speed_change::{self, SpeedChangeParams};
use crate::error::EffectError;
use crate::params::{ParamMap, ParamSpec};

/// Per-invocation state handed to effects.
///
/// Owns the random generator for one chain run, so concurrent runs never
/// share generator state.
#[derive(Debug, Clone)]
pub struct EffectContext {
    rng: ChaCha8Rng,
}

impl EffectContext {
    /// Seeded context, or one seeded from OS entropy when `seed` is `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        EffectContext { rng }
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// A parsed, validated effect step ready to run.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectConfig {
    Flanger(FlangerParams),
    Normalize(NormalizeParams),
    PitchShift(PitchShiftParams),
    RandomSemitone(RandomSemitoneParams),
    SpeedChange(SpeedChangeParams),
}

impl EffectConfig {
    /// Canonical registry name.
    pub fn name(&self) -> &'static str {
        match self {
            EffectConfig::Flanger(_) => flanger::NAME,
            EffectConfig::Normalize(_) => normalize::NAME,
            EffectConfig::PitchShift(_) => pitch_shift::NAME,
            EffectConfig::RandomSemitone(_) => random_semitone::NAME,
            EffectConfig::SpeedChange(_) => speed_change::NAME,
        }
    }

    /// Checks that depend on the sample rate and so cannot run at parse time.
    pub fn check_sample_rate(&self, sample_rate: u32) -> Result<(), EffectError> {
        if sample_rate == 0 {
            return Err(EffectError::failure(self.name(), "sample rate must be positive"));
        }
        match self {
            EffectConfig::Flanger(p) => flanger::check_sample_rate(p, sample_rate).map(|_| ()),
            EffectConfig::RandomSemitone(p) => p.check_sample_rate(sample_rate).map(|_| ()),
            EffectConfig::Normalize(_) | EffectConfig::PitchShift(_) | EffectConfig::SpeedChange(_) => Ok(()),
        }
    }

    /// Run the effect on `input`, producing a new buffer.
    pub fn apply(&self, input: &SampleBuffer, ctx: &mut EffectContext) -> Result<SampleBuffer, EffectError> {
        self.check_sample_rate(input.sample_rate)?;
        match self {
            EffectConfig::Flanger(p) => flanger::flanger(input, p),
            EffectConfig::Normalize(p) => Ok(normalize::normalize(input, p)),
            EffectConfig::PitchShift(p) => Ok(pitch_shift::pitch_shift(input, p)),
            EffectConfig::RandomSemitone(p) => random_semitone::random_semitone(input, p, ctx.rng()),
            EffectConfig::SpeedChange(p) => speed_change::speed_change(input, p),
        }
    }
}

/// A registered effect.
pub struct EffectEntry {
    pub name: &'static str,
    /// Other names accepted for this effect.
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    /// False when the output length can differ from the input length.
    pub preserves_length: bool,
    pub configure: fn(&ParamMap) -> Result<EffectConfig, EffectError>,
}

fn configure_flanger(params: &ParamMap) -> Result<EffectConfig, EffectError> {
    FlangerParams::from_params(params).map(EffectConfig::Flanger)
}

fn configure_normalize(params: &ParamMap) -> Result<EffectConfig, EffectError> {
    NormalizeParams::from_params(params).map(EffectConfig::Normalize)
}

fn configure_pitch_shift(params: &ParamMap) -> Result<EffectConfig, EffectError> {
    PitchShiftParams::from_params(params).map(EffectConfig::PitchShift)
}

fn configure_random_semitone(params: &ParamMap) -> Result<EffectConfig, EffectError> {
    RandomSemitoneParams::from_params(params).map(EffectConfig::RandomSemitone)
}

fn configure_speed_change(params: &ParamMap) -> Result<EffectConfig, EffectError> {
    SpeedChangeParams::from_params(params).map(EffectConfig::SpeedChange)
}

/// All effects, in listing order.
pub static EFFECTS: &[EffectEntry] = &[
    EffectEntry {
        name: flanger::NAME,
        aliases: &[],
        description: "Sine-swept short delay with feedback",
        params: flanger::PARAMS,
        preserves_length: true,
        configure: configure_flanger,
    },
    EffectEntry {
        name: normalize::NAME,
        aliases: &[],
        description: "DC offset removal and peak normalization",
        params: normalize::PARAMS,
        preserves_length: true,
        configure: configure_normalize,
    },
    EffectEntry {
        name: pitch_shift::NAME,
        aliases: &[],
        description: "Pitch shift by resampling and overlap-add, keeping duration",
        params: pitch_shift::PARAMS,
        preserves_length: true,
        configure: configure_pitch_shift,
    },
    EffectEntry {
        name: random_semitone::NAME,
        aliases: &["random_semitone_modulation"],
        description: "Amplitude modulation by a sawtooth jumping between random semitones",
        params: random_semitone::PARAMS,
        preserves_length: true,
        configure: configure_random_semitone,
    },
    EffectEntry {
        name: speed_change::NAME,
        aliases: &[],
        description: "Playback speed change; duration follows speed",
        params: speed_change::PARAMS,
        preserves_length: false,
        configure: configure_speed_change,
    },
];

/// Find an effect by name or alias (case-sensitive).
pub fn lookup(name: &str) -> Option<&'static EffectEntry> {
    EFFECTS
        .iter()
        .find(|e| e.name == name || e.aliases.contains(&name))
}

/// Resolve `name` and parse `params` into a runnable config.
pub fn configure(name: &str, params: &ParamMap) -> Result<EffectConfig, EffectError> {
    let entry = lookup(name).ok_or_else(|| EffectError::UnknownEffect(name.to_string()))?;
    (entry.configure)(params)
}

/// Serializable description of a registered effect.
#[derive(Debug, Clone, Serialize)]
pub struct EffectInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub preserves_length: bool,
    pub params: &'static [ParamSpec],
}

/// Describe every registered effect.
pub fn describe() -> Vec<EffectInfo> {
    EFFECTS
        .iter()
        .map(|e| EffectInfo {
            name: e.name,
            aliases: e.aliases,
            description: e.description,
            preserves_length: e.preserves_length,
            params: e.params,
        })
        .collect()
}
