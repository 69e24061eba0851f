//! Speech pipeline: synthesize, apply an effect chain, write a WAV file.
//!
//! Text-to-speech itself is an external engine behind [`SpeechSynthesizer`].
//! Where files go is decided by the injected [`PipelineConfig`].

use std::path::PathBuf;

use log::info;

use crate::buffer::SampleBuffer;
use crate::chain::{ChainProcessor, EffectStep};
use crate::error::VoxError;
use crate::wav;

/// A text-to-speech engine producing mono 16-bit-scale audio.
pub trait SpeechSynthesizer {
    fn synthesize(&self, text: &str) -> Result<SampleBuffer, VoxError>;
}

/// Output settings for a [`SpeechPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory receiving generated files. Must exist.
    pub output_dir: PathBuf,
    /// Re-encode the written file through [`wav::to_portable_file`].
    pub portable: bool,
    /// Resample rate applied by the portable conversion.
    pub target_sample_rate: Option<u32>,
    /// Seed for random effects; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            output_dir: output_dir.into(),
            portable: false,
            target_sample_rate: None,
            seed: None,
        }
    }
}

pub struct SpeechPipeline<S> {
    synthesizer: S,
    config: PipelineConfig,
    processor: ChainProcessor,
}

impl<S: SpeechSynthesizer> SpeechPipeline<S> {
    pub fn new(synthesizer: S, config: PipelineConfig) -> Self {
        let processor = match config.seed {
            Some(seed) => ChainProcessor::with_seed(seed),
            None => ChainProcessor::new(),
        };
        SpeechPipeline {
            synthesizer,
            config,
            processor,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Synthesize `text`, apply `chain`, and write `<output_dir>/<file_stem>.wav`.
    pub fn run(&self, text: &str, chain: &[EffectStep], file_stem: &str) -> Result<PathBuf, VoxError> {
        let speech = self.synthesizer.synthesize(text)?;
        info!(
            "synthesized {:.2} s at {} Hz for {} chars",
            speech.duration(),
            speech.sample_rate,
            text.chars().count()
        );

        let processed = self.processor.apply_chain(&speech, chain)?;
        let path = self.output_path(file_stem);
        wav::write_wav(&path, &processed)?;

        if self.config.portable {
            wav::to_portable_file(&path, &path, self.config.target_sample_rate)?;
        }
        info!("audio file generated: {}", path.display());
        Ok(path)
    }

    fn output_path(&self, file_stem: &str) -> PathBuf {
        self.config.output_dir.join(format!("{file_stem}.wav"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    /// Renders a tenth of a second of 200 Hz sine per character.
    struct ToneSynth {
        sample_rate: u32,
    }

    impl SpeechSynthesizer for ToneSynth {
        fn synthesize(&self, text: &str) -> Result<SampleBuffer, VoxError> {
            if text.is_empty() {
                return Err(VoxError::Synthesis("empty text".to_string()));
            }
            let len = text.chars().count() * self.sample_rate as usize / 10;
            let samples = (0..len)
                .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / self.sample_rate as f32).sin() * 6000.0)
                .collect();
            Ok(SampleBuffer::new(samples, self.sample_rate))
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("voxfx-pipeline-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn writes_processed_file_into_output_dir() {
        let dir = temp_dir("basic");
        let pipeline = SpeechPipeline::new(ToneSynth { sample_rate: 16000 }, PipelineConfig::new(&dir));
        let chain = vec![EffectStep::new(
            "normalize",
            json!({ "target_peak": 30000 }).as_object().cloned().unwrap(),
        )];

        let path = pipeline.run("bonjour", &chain, "greeting").unwrap();
        assert_eq!(path, dir.join("greeting.wav"));

        let audio = wav::read_wav(&path).unwrap();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.len(), 7 * 1600);
        assert!((audio.peak() - 30000.0).abs() <= 1.0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn portable_output_is_resampled() {
        let dir = temp_dir("portable");
        let config = PipelineConfig {
            portable: true,
            target_sample_rate: Some(8000),
            seed: Some(3),
            ..PipelineConfig::new(&dir)
        };
        let pipeline = SpeechPipeline::new(ToneSynth { sample_rate: 16000 }, config);
        let path = pipeline.run("abcd", &[EffectStep::named("flanger")], "tone").unwrap();

        let audio = wav::read_wav(&path).unwrap();
        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.len(), 3200);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn chain_errors_leave_no_file() {
        let dir = temp_dir("error");
        let pipeline = SpeechPipeline::new(ToneSynth { sample_rate: 8000 }, PipelineConfig::new(&dir));
        let err = pipeline
            .run("hello", &[EffectStep::named("chorus")], "broken")
            .unwrap_err();
        match err {
            VoxError::Chain(e) => assert!(e.is_unknown_effect()),
            other => panic!("expected chain error, got {other}"),
        }
        assert!(!dir.join("broken.wav").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn synthesis_errors_propagate() {
        let dir = temp_dir("synth");
        let pipeline = SpeechPipeline::new(ToneSynth { sample_rate: 8000 }, PipelineConfig::new(&dir));
        assert!(matches!(pipeline.run("", &[], "empty"), Err(VoxError::Synthesis(_))));
        fs::remove_dir_all(&dir).unwrap();
    }
}
