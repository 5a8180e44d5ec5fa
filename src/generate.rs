//! Test signal generation and in-place transforms
//!
//! Fills blocks with periodic test tones and offers the small in-place
//! edits tests need when building expectations (normalize, reverse).

use std::f64::consts::{PI, TAU};

use crate::block::{AudioBuffer, Block, BlockMut, Sample};

/// Phase sequence of an oscillator, wrapped into `[-π, π)`
///
/// Starts at 0 and advances by `2π · frequency / sample_rate` per sample.
pub fn oscillator_phases(frequency: f64, sample_rate: f64) -> impl Iterator<Item = f64> {
    let delta = TAU * frequency / sample_rate;
    std::iter::successors(Some(0.0_f64), move |angle| {
        let mut next = angle + delta;
        if next >= PI {
            next -= TAU;
        }
        Some(next)
    })
}

/// Overwrite every channel with `gain * function(angle)`
///
/// Each channel starts at phase 0.
pub fn fill_with_function<T, B, F>(block: &mut B, function: F, frequency: f32, sample_rate: f32, gain: f32) -> &mut B
where
    T: Sample,
    B: BlockMut<Sample = T> + ?Sized,
    F: Fn(f64) -> f64,
{
    write_function(block, &function, frequency, sample_rate, gain, false);
    block
}

/// Add `gain * function(angle)` to the existing samples of every channel
pub fn add_function<T, B, F>(block: &mut B, function: F, frequency: f32, sample_rate: f32, gain: f32) -> &mut B
where
    T: Sample,
    B: BlockMut<Sample = T> + ?Sized,
    F: Fn(f64) -> f64,
{
    write_function(block, &function, frequency, sample_rate, gain, true);
    block
}

fn write_function<T, B>(
    block: &mut B,
    function: &dyn Fn(f64) -> f64,
    frequency: f32,
    sample_rate: f32,
    gain: f32,
    accumulate: bool,
) where
    T: Sample,
    B: BlockMut<Sample = T> + ?Sized,
{
    let gain = gain as f64;
    for c in 0..block.num_channels() {
        let phases = oscillator_phases(frequency as f64, sample_rate as f64);
        for (sample, angle) in block.channel_mut(c).iter_mut().zip(phases) {
            let value = gain * function(angle);
            *sample = if accumulate {
                T::from_f64(sample.as_f64() + value)
            } else {
                T::from_f64(value)
            };
        }
    }
}

/// Fill every channel with a sine wave
pub fn fill_with_sine<T: Sample, B: BlockMut<Sample = T> + ?Sized>(
    block: &mut B,
    frequency: f32,
    sample_rate: f32,
    gain: f32,
) -> &mut B {
    fill_with_function(block, f64::sin, frequency, sample_rate, gain)
}

/// Fill every channel with a cosine wave
pub fn fill_with_cosine<T: Sample, B: BlockMut<Sample = T> + ?Sized>(
    block: &mut B,
    frequency: f32,
    sample_rate: f32,
    gain: f32,
) -> &mut B {
    fill_with_function(block, f64::cos, frequency, sample_rate, gain)
}

/// Mix a sine wave into every channel
pub fn add_sine<T: Sample, B: BlockMut<Sample = T> + ?Sized>(
    block: &mut B,
    frequency: f32,
    sample_rate: f32,
    gain: f32,
) -> &mut B {
    add_function(block, f64::sin, frequency, sample_rate, gain)
}

/// New buffer holding a sine wave on every channel
pub fn sine_buffer<T: Sample>(
    num_channels: usize,
    num_samples: usize,
    frequency: f32,
    sample_rate: f32,
    gain: f32,
) -> AudioBuffer<T> {
    let mut buffer = AudioBuffer::new(num_channels, num_samples, sample_rate as f64);
    fill_with_sine(&mut buffer, frequency, sample_rate, gain);
    buffer
}

/// New buffer holding a cosine wave on every channel
pub fn cosine_buffer<T: Sample>(
    num_channels: usize,
    num_samples: usize,
    frequency: f32,
    sample_rate: f32,
    gain: f32,
) -> AudioBuffer<T> {
    let mut buffer = AudioBuffer::new(num_channels, num_samples, sample_rate as f64);
    fill_with_cosine(&mut buffer, frequency, sample_rate, gain);
    buffer
}

/// Scale each channel so its absolute peak is 1.0
///
/// Silent channels are left untouched.
pub fn normalize<T: Sample, B: BlockMut<Sample = T> + ?Sized>(block: &mut B) -> &mut B {
    for c in 0..block.num_channels() {
        let channel = block.channel_mut(c);
        let peak = channel.iter().map(|s| s.abs()).fold(T::zero(), T::max);
        if peak > T::zero() {
            let scale = T::one() / peak;
            channel.iter_mut().for_each(|s| *s = *s * scale);
        }
    }
    block
}

/// Reverse the samples of each channel in place
pub fn reverse<T: Sample, B: BlockMut<Sample = T> + ?Sized>(block: &mut B) -> &mut B {
    for c in 0..block.num_channels() {
        block.channel_mut(c).reverse();
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_phases_wrap_below_pi() {
        let phases: Vec<f64> = oscillator_phases(11025.0, 44100.0).take(5).collect();
        assert_relative_eq!(phases[0], 0.0);
        assert_relative_eq!(phases[1], PI / 2.0);
        // π wraps to -π
        assert_relative_eq!(phases[2], -PI);
        assert_relative_eq!(phases[3], -PI / 2.0);
        assert_relative_eq!(phases[4], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fill_with_sine_every_channel() {
        let buffer = sine_buffer::<f32>(2, 8, 11025.0, 44100.0, 0.5);
        for c in 0..2 {
            let channel = buffer.channel(c);
            assert_relative_eq!(channel[0], 0.0);
            assert_relative_eq!(channel[1], 0.5, epsilon = 1e-6);
            assert_relative_eq!(channel[3], -0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cosine_starts_at_gain() {
        let buffer = cosine_buffer::<f64>(1, 4, 11025.0, 44100.0, 0.8);
        // gain is an f32 parameter
        let gain = 0.8_f32 as f64;
        assert_relative_eq!(buffer.sample(0, 0), gain);
        assert_relative_eq!(buffer.sample(0, 2), -gain, epsilon = 1e-12);
    }

    #[test]
    fn test_add_sine_accumulates_without_offset() {
        let mut samples = vec![0.25_f32; 4];
        add_sine(&mut samples, 11025.0, 44100.0, 0.5);
        assert_relative_eq!(samples[0], 0.25);
        assert_relative_eq!(samples[1], 0.75, epsilon = 1e-6);
        assert_relative_eq!(samples[3], -0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_per_channel() {
        let mut buffer =
            AudioBuffer::from_channels(vec![vec![0.25_f32, -0.5], vec![0.0, 0.0]], 44100.0).unwrap();
        normalize(&mut buffer);
        assert_eq!(buffer.channel(0), &[0.5, -1.0]);
        assert_eq!(buffer.channel(1), &[0.0, 0.0]);
    }

    #[test]
    fn test_reverse() {
        let mut buffer =
            AudioBuffer::from_channels(vec![vec![1.0_f32, 2.0, 3.0], vec![4.0, 5.0, 6.0]], 44100.0).unwrap();
        reverse(&mut buffer);
        assert_eq!(buffer.channel(0), &[3.0, 2.0, 1.0]);
        assert_eq!(buffer.channel(1), &[6.0, 5.0, 4.0]);
    }
}
