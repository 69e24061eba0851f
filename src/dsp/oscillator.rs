//! Stateless oscillator shapes evaluated at an absolute phase.
//!
//! Effects here render whole buffers, so oscillators are plain functions of
//! time rather than phase accumulators. Evaluating at `n / sample_rate` keeps
//! the waveform phase-continuous across any chunking of the buffer.

use std::f64::consts::PI;

/// Sawtooth at phase `radians`, period 2π, range [-1, 1).
///
/// Rises linearly and wraps at odd multiples of π, so `sawtooth(0) == 0`.
#[inline]
pub fn sawtooth(radians: f64) -> f64 {
    let cycles = radians / (2.0 * PI);
    2.0 * (cycles - (0.5 + cycles).floor())
}

/// Unipolar sine LFO in [0, 1] at `rate` Hz, evaluated at `t` seconds.
#[inline]
pub fn unipolar_sine(rate: f64, t: f64) -> f64 {
    0.5 * (1.0 + (2.0 * PI * rate * t).sin())
}

/// Frequency `semitones` above `base` in equal temperament.
#[inline]
pub fn semitone_to_frequency(base: f64, semitones: f64) -> f64 {
    base * 2.0_f64.powf(semitones / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sawtooth_shape() {
        assert!(sawtooth(0.0).abs() < 1e-12);
        assert!((sawtooth(PI / 2.0) - 0.5).abs() < 1e-12);
        // Wraps to -1 at π
        assert!((sawtooth(PI) + 1.0).abs() < 1e-12);
        assert!((sawtooth(3.0 * PI / 2.0) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn sawtooth_range() {
        for i in 0..10_000 {
            let s = sawtooth(i as f64 * 0.0173);
            assert!((-1.0..1.0).contains(&s), "Saw out of range: {s}");
        }
    }

    #[test]
    fn unipolar_sine_range() {
        assert!((unipolar_sine(1.0, 0.0) - 0.5).abs() < 1e-12);
        assert!((unipolar_sine(1.0, 0.25) - 1.0).abs() < 1e-12);
        assert!(unipolar_sine(1.0, 0.75).abs() < 1e-12);
    }

    #[test]
    fn octave_doubles_frequency() {
        assert!((semitone_to_frequency(220.0, 12.0) - 440.0).abs() < 1e-9);
        assert!((semitone_to_frequency(440.0, 0.0) - 440.0).abs() < 1e-12);
    }
}
