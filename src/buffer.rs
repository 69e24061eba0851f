//! Sample buffer: the unit of audio passed between effects.

/// Largest positive value of a signed 16-bit PCM sample.
pub const PCM_MAX: f32 = 32767.0;
/// Smallest value of a signed 16-bit PCM sample.
pub const PCM_MIN: f32 = -32768.0;

/// A finite block of mono audio on the 16-bit PCM scale.
///
/// Samples are stored as `f32` so intermediate stages have headroom; they are
/// only clipped back to `[PCM_MIN, PCM_MAX]` when encoded to a file. Effects
/// never mutate a buffer in place, they return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            samples,
            sample_rate,
        }
    }

    /// Build a buffer from 16-bit integer PCM.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        SampleBuffer::new(pcm.iter().map(|&s| s as f32).collect(), sample_rate)
    }

    /// Convert to 16-bit integer PCM: clip to the PCM range, then truncate
    /// toward zero.
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| s.clamp(PCM_MIN, PCM_MAX) as i16)
            .collect()
    }

    /// Same sample rate, new samples.
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        SampleBuffer::new(samples, self.sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Peak absolute amplitude (0 for an empty buffer).
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }
}

/// Peak absolute amplitude of a signal.
pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
