//! WAV adapter: mono 16-bit PCM files to sample buffers and back.
//!
//! Effects only ever see mono buffers on the 16-bit scale. `decode_wav`
//! rejects anything else; `to_portable` converts arbitrary PCM or float WAV
//! into that shape first.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::buffer::{SampleBuffer, PCM_MAX, PCM_MIN};
use crate::dsp::resample::resample_linear;
use crate::error::WavError;

/// Spec of every WAV this crate writes, at a given rate.
pub fn mono16_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Decode a mono 16-bit PCM WAV stream.
pub fn decode_wav<R: Read>(reader: R) -> Result<SampleBuffer, WavError> {
    let mut wav = WavReader::new(reader)?;
    let spec = wav.spec();
    debug!(
        "decoding WAV: {} ch, {} Hz, {}-bit {:?}, {} frames",
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format,
        wav.duration()
    );

    if spec.channels != 1 {
        return Err(WavError::UnsupportedChannels(spec.channels));
    }
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(WavError::UnsupportedFormat {
            bits: spec.bits_per_sample,
            format: format_name(spec.sample_format),
        });
    }
    if spec.sample_rate == 0 {
        return Err(WavError::InvalidSampleRate);
    }

    let samples = wav
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32))
        .collect::<Result<Vec<f32>, _>>()?;
    Ok(SampleBuffer::new(samples, spec.sample_rate))
}

/// Encode a buffer as mono 16-bit PCM, clipping to the PCM range and
/// truncating toward zero.
pub fn encode_wav<W: Write + Seek>(buffer: &SampleBuffer, writer: W) -> Result<(), WavError> {
    if buffer.sample_rate == 0 {
        return Err(WavError::InvalidSampleRate);
    }
    let mut wav = WavWriter::new(writer, mono16_spec(buffer.sample_rate))?;
    for s in buffer.to_i16() {
        wav.write_sample(s)?;
    }
    wav.finalize()?;
    Ok(())
}

/// Encode to an in-memory WAV file.
pub fn encode_wav_bytes(buffer: &SampleBuffer) -> Result<Vec<u8>, WavError> {
    let mut cursor = Cursor::new(Vec::new());
    encode_wav(buffer, &mut cursor)?;
    Ok(cursor.into_inner())
}

pub fn read_wav(path: &Path) -> Result<SampleBuffer, WavError> {
    if !path.exists() {
        return Err(WavError::NotFound(path.to_path_buf()));
    }
    decode_wav(BufReader::new(File::open(path)?))
}

pub fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<(), WavError> {
    encode_wav(buffer, BufWriter::new(File::create(path)?))?;
    debug!("wrote {} samples to {}", buffer.len(), path.display());
    Ok(())
}

/// Decode any integer (8 to 32-bit) or 32-bit float WAV into a mono buffer on
/// the 16-bit scale, optionally resampled to `target_rate`.
///
/// Channels are averaged. Integer depths are shifted to 16 bits, floats are
/// scaled by 32768. Every sample is truncated to an integer value.
pub fn decode_portable<R: Read>(reader: R, target_rate: Option<u32>) -> Result<SampleBuffer, WavError> {
    let mut wav = WavReader::new(reader)?;
    let spec = wav.spec();
    debug!(
        "portable conversion from {} ch, {} Hz, {}-bit {:?}",
        spec.channels, spec.sample_rate, spec.bits_per_sample, spec.sample_format
    );
    if spec.sample_rate == 0 {
        return Err(WavError::InvalidSampleRate);
    }
    if spec.channels == 0 {
        return Err(WavError::UnsupportedChannels(0));
    }

    let interleaved: Vec<f64> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ 8..=32) => {
            let shift = bits as i32 - 16;
            wav.samples::<i32>()
                .map(|s| s.map(|v| to_16_bit_scale(v, shift)))
                .collect::<Result<_, _>>()?
        }
        (SampleFormat::Float, 32) => wav
            .samples::<f32>()
            .map(|s| s.map(|v| v as f64 * 32768.0))
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(WavError::UnsupportedFormat {
                bits,
                format: format_name(format),
            });
        }
    };

    let channels = spec.channels as usize;
    let mono: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let avg = frame.iter().sum::<f64>() / channels as f64;
            avg.clamp(PCM_MIN as f64, PCM_MAX as f64).trunc() as f32
        })
        .collect();

    let mut buffer = SampleBuffer::new(mono, spec.sample_rate);
    if let Some(rate) = target_rate.filter(|&r| r != spec.sample_rate) {
        if rate == 0 {
            return Err(WavError::InvalidSampleRate);
        }
        let new_len = (buffer.len() as f64 * rate as f64 / spec.sample_rate as f64).round() as usize;
        let resampled = resample_linear(&buffer.samples, new_len)
            .into_iter()
            .map(f32::trunc)
            .collect();
        buffer = SampleBuffer::new(resampled, rate);
    }
    Ok(buffer)
}

/// Convert a WAV stream to portable 16-bit mono and write it out.
pub fn to_portable<R: Read, W: Write + Seek>(
    reader: R,
    writer: W,
    target_rate: Option<u32>,
) -> Result<SampleBuffer, WavError> {
    let buffer = decode_portable(reader, target_rate)?;
    encode_wav(&buffer, writer)?;
    Ok(buffer)
}

/// File variant of [`to_portable`]. `input` and `output` may be the same path.
pub fn to_portable_file(input: &Path, output: &Path, target_rate: Option<u32>) -> Result<SampleBuffer, WavError> {
    // Fully decode before creating the output so in-place conversion is safe
    let buffer = read_portable(input, target_rate)?;
    write_wav(output, &buffer)?;
    Ok(buffer)
}

/// File variant of [`decode_portable`].
pub fn read_portable(path: &Path, target_rate: Option<u32>) -> Result<SampleBuffer, WavError> {
    if !path.exists() {
        return Err(WavError::NotFound(path.to_path_buf()));
    }
    decode_portable(BufReader::new(File::open(path)?), target_rate)
}

#[inline]
fn to_16_bit_scale(v: i32, shift: i32) -> f64 {
    if shift >= 0 {
        (v >> shift) as f64
    } else {
        ((v as i64) << -shift) as f64
    }
}

fn format_name(format: SampleFormat) -> &'static str {
    match format {
        SampleFormat::Int => "integer",
        SampleFormat::Float => "float",
    }
}
