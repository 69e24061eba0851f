//! Linear-interpolation resampling over evenly spaced positions.

/// Resample `signal` to `new_len` samples.
///
/// Output sample `k` reads the input at position `k * (len - 1) / (new_len - 1)`,
/// so the first and last samples are always kept. A single output sample
/// reads position 0.
pub fn resample_linear(signal: &[f32], new_len: usize) -> Vec<f32> {
    let n = signal.len();
    if n == 0 || new_len == 0 {
        return Vec::new();
    }
    if new_len == 1 {
        return vec![signal[0]];
    }

    let last = (n - 1) as f64;
    let step = last / (new_len - 1) as f64;
    (0..new_len)
        .map(|k| interp_at(signal, (k as f64 * step).min(last)))
        .collect()
}

/// Read `signal` at fractional position `pos` (clamped to the signal bounds).
#[inline]
pub fn interp_at(signal: &[f32], pos: f64) -> f32 {
    let n = signal.len();
    if pos <= 0.0 {
        return signal[0];
    }
    let i0 = pos.floor() as usize;
    if i0 + 1 >= n {
        return signal[n - 1];
    }
    let frac = pos - i0 as f64;
    let a = signal[i0] as f64;
    let b = signal[i0 + 1] as f64;
    (a + (b - a) * frac) as f32
}
