//! Effect chain: ordered effect steps applied one after another.
//!
//! A chain is validated in full before any audio is touched: an unknown
//! effect or bad parameter anywhere in the list fails the call without
//! running earlier steps. Each run owns its own random generator, seeded
//! from the processor's seed when one is set.

use std::ops::Range;

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::error::{ChainError, EffectError};
use crate::params::ParamMap;
use crate::registry::{self, EffectConfig, EffectContext};

/// One step of a chain: an effect name and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectStep {
    pub name: String,
    #[serde(default)]
    pub params: ParamMap,
}

impl EffectStep {
    pub fn new(name: impl Into<String>, params: ParamMap) -> Self {
        EffectStep {
            name: name.into(),
            params,
        }
    }

    /// A step that uses every default.
    pub fn named(name: impl Into<String>) -> Self {
        EffectStep::new(name, ParamMap::new())
    }
}

#[derive(Deserialize)]
struct WrappedChain {
    effects: Vec<EffectStep>,
}

/// Parse a chain from JSON: either `[steps…]` or `{ "effects": [steps…] }`.
pub fn parse_chain(json: &str) -> Result<Vec<EffectStep>, serde_json::Error> {
    if json.trim_start().starts_with('{') {
        serde_json::from_str::<WrappedChain>(json).map(|w| w.effects)
    } else {
        serde_json::from_str(json)
    }
}

/// Render a chain parse error as an annotated report against the source.
pub fn render_parse_error(source_name: &str, json: &str, err: &serde_json::Error) -> String {
    let span = error_span(json, err);
    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, (source_name, span.clone()))
        .with_config(Config::default().with_color(false).with_index_type(IndexType::Byte))
        .with_message("invalid effect chain")
        .with_label(Label::new((source_name, span)).with_message(err.to_string()))
        .finish()
        .write((source_name, Source::from(json)), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => format!("{source_name}: invalid effect chain: {err}"),
    }
}

/// Byte span of the character at a serde_json error position.
///
/// serde_json reports a 1-based line and a 1-based byte column.
fn error_span(json: &str, err: &serde_json::Error) -> Range<usize> {
    let mut offset = 0;
    for (i, line) in json.split('\n').enumerate() {
        if i + 1 == err.line() {
            offset += err.column().saturating_sub(1).min(line.len());
            break;
        }
        offset += line.len() + 1;
    }
    let mut start = offset.min(json.len());
    while !json.is_char_boundary(start) {
        start -= 1;
    }
    let end = json[start..].chars().next().map_or(start, |c| start + c.len_utf8());
    start..end
}

/// Applies effect chains. Cheap to clone; holds no audio state.
#[derive(Debug, Clone, Default)]
pub struct ChainProcessor {
    seed: Option<u64>,
}

impl ChainProcessor {
    /// Processor whose random effects draw from OS entropy.
    pub fn new() -> Self {
        ChainProcessor { seed: None }
    }

    /// Processor whose runs are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        ChainProcessor { seed: Some(seed) }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Resolve every step and parse its parameters without processing audio.
    ///
    /// Checks that need the sample rate (delay-line size, chunk length) are
    /// not run; use [`ChainProcessor::validate_for`] when the rate is known.
    pub fn validate(&self, steps: &[EffectStep]) -> Result<Vec<EffectConfig>, ChainError> {
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                registry::configure(&step.name, &step.params).map_err(|e| step_error(i, step, e))
            })
            .collect()
    }

    /// [`ChainProcessor::validate`] plus every check that depends on `sample_rate`.
    ///
    /// No operator changes the sample rate, so passing this guarantees that
    /// no step of a run at `sample_rate` fails on its parameters.
    pub fn validate_for(&self, steps: &[EffectStep], sample_rate: u32) -> Result<Vec<EffectConfig>, ChainError> {
        let configs = self.validate(steps)?;
        for (i, (step, config)) in steps.iter().zip(&configs).enumerate() {
            config
                .check_sample_rate(sample_rate)
                .map_err(|e| step_error(i, step, e))?;
        }
        Ok(configs)
    }

    /// Apply `steps` in order. The output of each step is the input of the next.
    ///
    /// Fails on the first invalid step, before any processing, or on the first
    /// step whose operator fails. No partial output is returned.
    pub fn apply_chain(&self, buffer: &SampleBuffer, steps: &[EffectStep]) -> Result<SampleBuffer, ChainError> {
        let configs = self.validate_for(steps, buffer.sample_rate)?;
        info!(
            "applying {} effect(s) to {} samples at {} Hz",
            steps.len(),
            buffer.len(),
            buffer.sample_rate
        );

        let mut ctx = EffectContext::new(self.seed);
        let mut current = buffer.clone();
        for (i, (step, config)) in steps.iter().zip(&configs).enumerate() {
            debug!("applying effect: {} with params {:?}", step.name, config);
            current = config
                .apply(&current, &mut ctx)
                .map_err(|e| step_error(i, step, e))?;
            debug!("{} produced {} samples", step.name, current.len());
        }

        info!("effect chain done: {} samples", current.len());
        Ok(current)
    }
}

fn step_error(index: usize, step: &EffectStep, source: EffectError) -> ChainError {
    ChainError {
        step: index,
        effect: step.name.clone(),
        source,
    }
}

/// Apply a chain to raw samples at `framerate` with a fresh, unseeded processor.
pub fn apply_chain(samples: &[f32], framerate: u32, steps: &[EffectStep]) -> Result<Vec<f32>, ChainError> {
    let buffer = SampleBuffer::new(samples.to_vec(), framerate);
    ChainProcessor::new()
        .apply_chain(&buffer, steps)
        .map(|out| out.samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(name: &str, params: serde_json::Value) -> EffectStep {
        EffectStep::new(name, params.as_object().cloned().unwrap())
    }

    fn sine_48k(amplitude: f32) -> SampleBuffer {
        let sr = 48000;
        let samples = (0..sr)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
            .collect();
        SampleBuffer::new(samples, sr)
    }

    #[test]
    fn empty_chain_is_identity() {
        let input = sine_48k(1000.0);
        let out = ChainProcessor::new().apply_chain(&input, &[]).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn normalize_end_to_end() {
        let input = sine_48k(10000.0);
        let chain = parse_chain(r#"[{"name": "normalize", "params": {"target_peak": 32767}}]"#).unwrap();
        let out = ChainProcessor::new().apply_chain(&input, &chain).unwrap();
        assert_eq!(out.len(), input.len());
        assert!((out.peak() - 32767.0).abs() < 1.0, "peak = {}", out.peak());
    }

    #[test]
    fn steps_run_in_order() {
        let input = sine_48k(5000.0);
        let speed_then_norm = [
            step("speed_change", json!({ "speed_delta": 1.0 })),
            step("normalize", json!({ "target_peak": 100.0 })),
        ];
        let out = ChainProcessor::new().apply_chain(&input, &speed_then_norm).unwrap();
        assert_eq!(out.len(), 24000);
        assert!((out.peak() - 100.0).abs() < 0.01);

        let norm_then_speed = [
            step("normalize", json!({ "target_peak": 100.0 })),
            step("speed_change", json!({ "speed_delta": 1.0 })),
        ];
        let out = ChainProcessor::new().apply_chain(&input, &norm_then_speed).unwrap();
        assert_eq!(out.len(), 24000);
    }

    #[test]
    fn unknown_effect_fails_before_any_step() {
        let input = sine_48k(1000.0);
        let chain = [
            step("normalize", json!({})),
            step("flanger", json!({})),
            step("echo", json!({})),
            step("speed_change", json!({ "speed_delta": 0.5 })),
        ];
        let err = ChainProcessor::new().apply_chain(&input, &chain).unwrap_err();
        assert!(err.is_unknown_effect());
        assert_eq!(err.step, 2);
        assert_eq!(err.effect, "echo");
        assert_eq!(err.source, EffectError::UnknownEffect("echo".to_string()));
    }

    #[test]
    fn invalid_parameter_reports_step() {
        let input = sine_48k(1000.0);
        let chain = [
            step("normalize", json!({})),
            step("speed_change", json!({ "speed_delta": -1.0 })),
        ];
        let err = ChainProcessor::new().apply_chain(&input, &chain).unwrap_err();
        assert_eq!(err.step, 1);
        match err.source {
            EffectError::InvalidParameter { effect, key, .. } => {
                assert_eq!(effect, "speed_change");
                assert_eq!(key, "speed_delta");
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_key_is_rejected() {
        let chain = [step("flanger", json!({ "rate": 0.2, "mix": 0.5 }))];
        let err = ChainProcessor::new().validate(&chain).unwrap_err();
        assert!(matches!(err.source, EffectError::InvalidParameter { ref key, .. } if key == "mix"));
    }

    #[test]
    fn seeded_processor_is_reproducible() {
        let input = sine_48k(8000.0);
        let chain = [
            step("random_semitone_sawtooth_wave", json!({
                "min_freq": 120, "max_semitones": 12, "pitch_duration": 0.05
            })),
            step("normalize", json!({})),
        ];
        let a = ChainProcessor::with_seed(99).apply_chain(&input, &chain).unwrap();
        let b = ChainProcessor::with_seed(99).apply_chain(&input, &chain).unwrap();
        let c = ChainProcessor::with_seed(100).apply_chain(&input, &chain).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn free_function_applies_chain() {
        let samples: Vec<f32> = (0..4000).map(|i| (i as f32 * 0.05).sin() * 2000.0).collect();
        let out = apply_chain(&samples, 16000, &[step("speed_change", json!({ "speed": -0.5 }))]).unwrap();
        assert_eq!(out.len(), 8000);
    }

    #[test]
    fn parse_chain_forms() {
        let bare = parse_chain(r#"[{"name": "flanger"}, {"name": "pitch_shift", "params": {"semitone_cents": 35}}]"#)
            .unwrap();
        assert_eq!(bare.len(), 2);
        assert!(bare[0].params.is_empty());
        assert_eq!(bare[1].params["semitone_cents"], 35);

        let wrapped = parse_chain(r#"{"effects": [{"name": "normalize"}]}"#).unwrap();
        assert_eq!(wrapped, vec![EffectStep::named("normalize")]);

        assert!(parse_chain(r#"[{"params": {}}]"#).is_err());
    }

    #[test]
    fn parse_error_report_points_at_problem() {
        let json = "[\n  {\"name\": \"flanger\",}\n]";
        let err = parse_chain(json).unwrap_err();
        let report = render_parse_error("chain.json", json, &err);
        assert!(report.contains("invalid effect chain"), "{report}");
        assert!(report.contains("chain.json"), "{report}");
    }

    #[test]
    fn error_span_counts_bytes() {
        let json = r#"[{"name": "é"}, x]"#;
        let err = parse_chain(json).unwrap_err();
        let span = error_span(json, &err);
        assert_eq!(&json[span], "x");

        let json = "[\n  {\"name\": \"flängér\"},\n  ?\n]";
        let err = parse_chain(json).unwrap_err();
        assert_eq!(&json[error_span(json, &err)], "?");
        let report = render_parse_error("chain.json", json, &err);
        assert!(report.contains("chain.json"), "{report}");
    }

    #[test]
    fn sample_rate_checks_run_before_processing() {
        let chain = [
            step("normalize", json!({})),
            step("random_semitone_sawtooth_wave", json!({
                "min_freq": 100, "max_semitones": 4, "pitch_duration": 0.0004
            })),
        ];
        let processor = ChainProcessor::with_seed(1);
        assert!(processor.validate(&chain).is_ok());
        assert!(processor.validate_for(&chain, 16000).is_ok());

        let err = processor.validate_for(&chain, 1000).unwrap_err();
        assert_eq!(err.step, 1);
        assert!(matches!(err.source, EffectError::InvalidParameter { ref key, .. } if key == "pitch_duration"));

        let input = SampleBuffer::new(vec![100.0; 500], 1000);
        let err = processor.apply_chain(&input, &chain).unwrap_err();
        assert_eq!(err.step, 1);
    }

    #[test]
    fn extreme_parameters_fail_validation_not_processing() {
        let input = sine_48k(3000.0);
        let cases = [
            ("pitch_shift", json!({ "semitone_cents": -200000 }), "semitone_cents"),
            ("flanger", json!({ "max_delay": 1e300 }), "max_delay"),
            ("speed_change", json!({ "speed_delta": -0.9999999999 }), "speed_delta"),
        ];
        for (name, params, bad_key) in cases {
            let chain = [step("normalize", json!({})), step(name, params)];
            let err = ChainProcessor::new().validate(&chain).unwrap_err();
            assert_eq!(err.step, 1, "{name}");
            assert!(
                matches!(err.source, EffectError::InvalidParameter { ref key, .. } if key == bad_key),
                "{name}: {err}"
            );
            let err = ChainProcessor::new().apply_chain(&input, &chain).unwrap_err();
            assert_eq!(err.step, 1, "{name}");
        }
    }

    #[test]
    fn long_input_through_pitch_shift() {
        let sr = 22050;
        let samples = (0..3 * sr as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / sr as f32).sin() * 7000.0)
            .collect();
        let input = SampleBuffer::new(samples, sr);
        let chain = [
            step("pitch_shift", json!({ "semitone_cents": -100 })),
            step("normalize", json!({ "target_peak": 20000 })),
        ];
        let out = ChainProcessor::new().apply_chain(&input, &chain).unwrap();
        assert_eq!(out.len(), input.len());
        assert!((out.peak() - 20000.0).abs() < 1.0, "peak = {}", out.peak());
    }

    #[test]
    fn error_span_is_within_source() {
        let json = "[{\"name\": 5}]";
        let err = parse_chain(json).unwrap_err();
        let span = error_span(json, &err);
        assert!(span.start < json.len());
        assert!(span.end <= json.len());
    }
}
