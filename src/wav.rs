//! WAV fixtures
//!
//! Loads and saves buffers with the hound crate so tests can compare
//! processor output against golden files.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::block::{AudioBuffer, Block};
use crate::error::{BlockCheckError, Result};

/// Load a WAV file, converting integer formats to `[-1, 1)`
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer<f32>> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        "loaded wav"
    );
    AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate as f64)
}

/// Save a buffer as 32-bit float WAV
pub fn save_wav<P: AsRef<Path>>(buffer: &AudioBuffer<f32>, path: P) -> Result<()> {
    save_wav_with_depth(buffer, path, 32)
}

/// Save a buffer as WAV; 32 bits writes float, 16 and 24 write integer PCM
pub fn save_wav_with_depth<P: AsRef<Path>>(buffer: &AudioBuffer<f32>, path: P, bits: u16) -> Result<()> {
    let spec = wav_spec(buffer, bits)?;
    let mut writer = WavWriter::create(path.as_ref(), spec)?;

    let interleaved = buffer.to_interleaved();
    if bits == 32 {
        for &sample in &interleaved {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = ((1u32 << (bits - 1)) - 1) as f32;
        for &sample in &interleaved {
            writer.write_sample((sample.clamp(-1.0, 1.0) * max_val) as i32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

fn wav_spec(buffer: &AudioBuffer<f32>, bits: u16) -> Result<WavSpec> {
    if !matches!(bits, 16 | 24 | 32) {
        return Err(BlockCheckError::InvalidAudio {
            reason: format!("unsupported bit depth {bits}"),
        });
    }
    let channels = u16::try_from(buffer.num_channels())
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| BlockCheckError::InvalidAudio {
            reason: format!("cannot write {} channels", buffer.num_channels()),
        })?;
    let sample_rate = buffer.sample_rate();
    if !(sample_rate >= 1.0 && sample_rate <= u32::MAX as f64) {
        return Err(BlockCheckError::InvalidAudio {
            reason: format!("sample rate {sample_rate} cannot be stored"),
        });
    }

    Ok(WavSpec {
        channels,
        sample_rate: sample_rate.round() as u32,
        bits_per_sample: bits,
        sample_format: if bits == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::sine_buffer;
    use crate::matchers::{IsEqualTo, Matcher};
    use tempfile::tempdir;

    #[test]
    fn test_float_wav_is_lossless() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sine.wav");

        let original = sine_buffer::<f32>(2, 1000, 440.0, 48000.0, 0.5);
        save_wav(&original, &path).unwrap();
        let loaded = load_wav(&path).unwrap();

        assert_eq!(loaded.sample_rate(), 48000.0);
        assert!(IsEqualTo::block(&original).within(0.0).matches(&loaded));
    }

    #[test]
    fn test_16_bit_wav_within_quantisation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sine16.wav");

        let original = sine_buffer::<f32>(1, 500, 1000.0, 44100.0, 0.5);
        save_wav_with_depth(&original, &path, 16).unwrap();
        let loaded = load_wav(&path).unwrap();

        assert_eq!(loaded.num_channels(), 1);
        assert!(IsEqualTo::block(&original).within(1e-4).matches(&loaded));
    }

    #[test]
    fn test_rejects_unsupported_depth() {
        let dir = tempdir().unwrap();
        let buffer = AudioBuffer::<f32>::new(1, 4, 44100.0);
        let err = save_wav_with_depth(&buffer, dir.path().join("x.wav"), 12).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_AUDIO");
    }

    #[test]
    fn test_missing_file_is_wav_error() {
        let err = load_wav("does_not_exist.wav").unwrap_err();
        assert_eq!(err.error_code(), "WAV_ERROR");
    }
}
