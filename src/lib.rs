pub mod buffer;
pub mod chain;
pub mod dsp;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod wav;

pub use crate::buffer::SampleBuffer;
pub use crate::chain::{apply_chain, parse_chain, ChainProcessor, EffectStep};
pub use crate::error::{ChainError, EffectError, VoxError, WavError};

use std::io::Cursor;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the voxfx-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Decode a mono 16-bit WAV, run a JSON effect chain over it, and re-encode.
pub fn process_wav(wav_bytes: &[u8], chain_json: &str, seed: Option<u64>) -> Result<Vec<u8>, VoxError> {
    let steps = parse_chain(chain_json)?;
    let input = wav::decode_wav(Cursor::new(wav_bytes))?;
    let processor = match seed {
        Some(seed) => ChainProcessor::with_seed(seed),
        None => ChainProcessor::new(),
    };
    let output = processor.apply_chain(&input, &steps)?;
    Ok(wav::encode_wav_bytes(&output)?)
}

/// WASM-exposed: apply a JSON effect chain to a WAV byte array.
#[wasm_bindgen]
pub fn process_wav_bytes(wav_bytes: &[u8], chain_json: &str, seed: Option<u64>) -> Result<Vec<u8>, JsValue> {
    process_wav(wav_bytes, chain_json, seed).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: apply a JSON effect chain to raw samples on the 16-bit scale.
/// Returns the processed samples for AudioWorklet playback.
#[wasm_bindgen]
pub fn process_samples(samples: &[f32], sample_rate: u32, chain_json: &str, seed: Option<u64>) -> Result<Vec<f32>, JsValue> {
    let steps = parse_chain(chain_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let processor = match seed {
        Some(seed) => ChainProcessor::with_seed(seed),
        None => ChainProcessor::new(),
    };
    let input = SampleBuffer::new(samples.to_vec(), sample_rate);
    processor
        .apply_chain(&input, &steps)
        .map(|out| out.samples)
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: list registered effects with their parameters and defaults.
#[wasm_bindgen]
pub fn list_effects() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&registry::describe()).map_err(|e| JsValue::from_str(&format!("{e}")))
}
