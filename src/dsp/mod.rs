//! Effect operators. Pure Rust, offline DSP over whole buffers.
//!
//! Every operator takes an immutable [`SampleBuffer`](crate::buffer::SampleBuffer)
//! plus its typed parameters and returns a freshly allocated buffer.

pub mod flanger;
pub mod normalize;
pub mod oscillator;
pub mod pitch_shift;
pub mod random_semitone;
pub mod resample;
pub mod speed_change;
