//! Buffer measurements
//!
//! Objective, automated measurements of a block: validity, level, cycle
//! count, single-frequency correlation and amplitude distribution.

use std::num::FpCategory;

use tracing::info;

use crate::block::{Block, Sample};
use crate::error::{BlockCheckError, Result};
use crate::generate::oscillator_phases;

/// Floor used when converting silent gains to decibels
pub const MINUS_INFINITY_DB: f64 = -100.0;

/// Number of bins used by the histogram helpers
pub const HISTOGRAM_BINS: usize = 10;

/// Allowed deviation of each histogram bin from the expected count
const UNIFORM_TOLERANCE: f64 = 0.3;

/// Convert linear gain to decibels, flooring at [`MINUS_INFINITY_DB`]
pub fn gain_to_decibels(gain: f64) -> f64 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(MINUS_INFINITY_DB)
    } else {
        MINUS_INFINITY_DB
    }
}

/// Convert decibels to linear gain; anything at or below the floor is silence
pub fn decibels_to_gain(db: f64) -> f64 {
    if db > MINUS_INFINITY_DB {
        10.0_f64.powf(db / 20.0)
    } else {
        0.0
    }
}

/// True when no sample is NaN, infinite or subnormal
pub fn valid_audio<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> bool {
    (0..block.num_channels()).all(|c| {
        block.channel(c).iter().all(|s| {
            !matches!(
                s.classify(),
                FpCategory::Subnormal | FpCategory::Infinite | FpCategory::Nan
            )
        })
    })
}

/// Number of full cycles of the waveform on channel 0
///
/// Counts zero crossings and halves them. A sample that is exactly zero
/// counts as a crossing when it starts the block or follows a non-zero
/// sample; a sign change between neighbours counts once.
pub fn number_of_cycles<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> usize {
    if block.num_channels() == 0 {
        return 0;
    }

    let waveform = block.channel(0);
    let zero = T::zero();
    let mut crossings = 0;

    for (i, &sample) in waveform.iter().enumerate() {
        if sample == zero && (i == 0 || waveform[i - 1] != zero) {
            crossings += 1;
        }
        if i > 0 && ((waveform[i - 1] < zero) != (sample < zero)) {
            crossings += 1;
        }
    }

    crossings / 2
}

/// True when every channel matches channel 0 sample for sample
pub fn channels_are_identical<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> Result<bool> {
    if block.num_channels() < 2 {
        return Err(BlockCheckError::NotEnoughChannels {
            required: 2,
            actual: block.num_channels(),
        });
    }

    let reference = block.channel(0);
    Ok((1..block.num_channels()).all(|c| block.channel(c) == reference))
}

/// Largest absolute sample value across all channels
pub fn max_magnitude<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> T {
    (0..block.num_channels())
        .flat_map(|c| block.channel(c).iter())
        .map(|s| s.abs())
        .fold(T::zero(), T::max)
}

/// Smallest absolute sample value across all channels
///
/// Returns zero for an empty block.
pub fn min_magnitude<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> T {
    (0..block.num_channels())
        .flat_map(|c| block.channel(c).iter())
        .map(|s| s.abs())
        .reduce(T::min)
        .unwrap_or_else(T::zero)
}

/// Root mean square over every sample of every channel
pub fn rms<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> T {
    let total = block.total_samples();
    if total == 0 {
        return T::zero();
    }

    let sum_squares: f64 = (0..block.num_channels())
        .flat_map(|c| block.channel(c).iter())
        .map(|&s| s.as_f64() * s.as_f64())
        .sum();

    T::from_f64((sum_squares / total as f64).sqrt())
}

/// RMS level in decibels
pub fn rms_in_db<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> T {
    T::from_f64(gain_to_decibels(rms(block).as_f64()))
}

/// Mean sample value of channel 0
pub fn average<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> T {
    if block.is_block_empty() {
        return T::zero();
    }
    let sum: f64 = block.channel(0).iter().map(|s| s.as_f64()).sum();
    T::from_f64(sum / block.num_samples() as f64)
}

/// Magnitude of a single frequency on channel 0
///
/// Correlates the block against a sine and a cosine at `frequency` over the
/// largest whole number of cycles it contains. A full scale sine at that
/// frequency measures close to 1.0.
pub fn magnitude_of_frequency<T: Sample, B: Block<Sample = T> + ?Sized>(
    block: &B,
    frequency: f32,
    sample_rate: f32,
) -> Result<f32> {
    if block.is_block_empty() {
        return Err(BlockCheckError::EmptyBlock);
    }

    let length = block.num_samples();
    let samples_per_cycle = (sample_rate / frequency) as usize;
    if samples_per_cycle == 0 || samples_per_cycle > length {
        return Err(BlockCheckError::TooShortForFrequency { frequency, len: length });
    }
    let last_full_cycle = length - (length % samples_per_cycle);

    let mut sine_sum = 0.0_f64;
    let mut cosine_sum = 0.0_f64;
    for (angle, &sample) in oscillator_phases(frequency as f64, sample_rate as f64)
        .zip(block.channel(0).iter())
        .take(last_full_cycle)
    {
        sine_sum += angle.sin() * sample.as_f64();
        cosine_sum += angle.cos() * sample.as_f64();
    }

    let n = last_full_cycle as f64;
    Ok((((sine_sum / n).powi(2) + (cosine_sum / n).powi(2)).sqrt() * 2.0) as f32)
}

/// Histogram of channel 0 between its minimum and maximum
///
/// The maximum sample lands in the last bin. A constant block puts every
/// sample in the first bin.
pub fn histogram<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, num_bins: usize) -> Histogram {
    let mut counts = vec![0; num_bins.max(1)];
    if block.is_block_empty() {
        return Histogram {
            range_start: 0.0,
            bin_size: 0.0,
            counts,
        };
    }

    let channel = block.channel(0);
    let (min, max) = channel.iter().fold((f64::MAX, f64::MIN), |(lo, hi), s| {
        (lo.min(s.as_f64()), hi.max(s.as_f64()))
    });
    let bin_size = (max - min) / counts.len() as f64;

    for sample in channel {
        let index = if bin_size > 0.0 {
            ((sample.as_f64() - min) / bin_size) as usize
        } else {
            0
        };
        let last = counts.len() - 1;
        counts[index.min(last)] += 1;
    }

    Histogram {
        range_start: min,
        bin_size,
        counts,
    }
}

/// Sample distribution of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Lower edge of the first bin
    pub range_start: f64,
    /// Width of each bin
    pub bin_size: f64,
    /// Number of samples in each bin
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Text rendering with one bar line per bin: `[lo, hi): |||`
    pub fn report(&self) -> String {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let lo = self.range_start + i as f64 * self.bin_size;
                let hi = self.range_start + (i + 1) as f64 * self.bin_size;
                format!("[{lo}, {hi}): {}", "|".repeat(count))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Log a histogram of channel 0 at info level
pub fn print_histogram<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) {
    let report = histogram(block, HISTOGRAM_BINS).report();
    for line in report.lines() {
        info!("{line}");
    }
}

/// True when each histogram bin of channel 0 is within 30% of the expected count
pub fn is_uniformly_distributed<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> bool {
    if block.is_block_empty() {
        return false;
    }

    let histogram = histogram(block, HISTOGRAM_BINS);
    let expected = block.num_samples() as f64 / HISTOGRAM_BINS as f64;
    histogram
        .counts
        .iter()
        .all(|&count| (count as f64 - expected).abs() <= UNIFORM_TOLERANCE * expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::AudioBuffer;
    use crate::generate::{fill_with_sine, sine_buffer};
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test]
    fn test_valid_audio_rejects_nan_inf_subnormal() {
        let mut samples = vec![0.0_f32, 0.5, -0.5];
        assert!(valid_audio(&samples));

        samples[1] = f32::NAN;
        assert!(!valid_audio(&samples));

        samples[1] = f32::INFINITY;
        assert!(!valid_audio(&samples));

        samples[1] = f32::MIN_POSITIVE / 2.0;
        assert!(!valid_audio(&samples));
    }

    #[test_case(441.0, 44100.0, 4410 => 44 ; "441 Hz over 100 ms")]
    #[test_case(1000.0, 48000.0, 4800 => 100 ; "1 kHz over 100 ms")]
    #[test_case(100.0, 48000.0, 240 => 0 ; "half a cycle")]
    fn test_number_of_cycles(frequency: f32, rate: f32, len: usize) -> usize {
        let mut samples = vec![0.0_f32; len];
        fill_with_sine(&mut samples, frequency, rate, 1.0);
        number_of_cycles(&samples)
    }

    #[test]
    fn test_cycles_of_silence() {
        let samples = vec![0.0_f32; 64];
        assert_eq!(number_of_cycles(&samples), 0);
    }

    #[test]
    fn test_channels_are_identical() {
        let same = AudioBuffer::from_channels(vec![vec![0.1_f32, 0.2], vec![0.1, 0.2]], 44100.0).unwrap();
        assert!(channels_are_identical(&same).unwrap());

        let different =
            AudioBuffer::from_channels(vec![vec![0.1_f32, 0.2], vec![0.1, 0.3]], 44100.0).unwrap();
        assert!(!channels_are_identical(&different).unwrap());

        let mono = vec![0.1_f32];
        assert!(matches!(
            channels_are_identical(&mono),
            Err(BlockCheckError::NotEnoughChannels { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_magnitudes_across_channels() {
        let buffer =
            AudioBuffer::from_channels(vec![vec![0.2_f32, -0.3], vec![-0.8, 0.5]], 44100.0).unwrap();
        assert_relative_eq!(max_magnitude(&buffer), 0.8);
        assert_relative_eq!(min_magnitude(&buffer), 0.2);
    }

    #[test]
    fn test_max_magnitude_of_negative_peak_in_later_channel() {
        let buffer =
            AudioBuffer::from_channels(vec![vec![0.5_f32, 0.1], vec![0.2, -0.9]], 44100.0).unwrap();
        assert_relative_eq!(max_magnitude(&buffer), 0.9);
    }

    #[test]
    fn test_rms_of_sine() {
        let buffer = sine_buffer::<f32>(1, 44100, 441.0, 44100.0, 1.0);
        assert_relative_eq!(rms(&buffer), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-3);
        assert_relative_eq!(rms_in_db(&buffer), -3.0103, epsilon = 0.01);
    }

    #[test]
    fn test_rms_of_silence_floors_in_db() {
        let buffer = AudioBuffer::<f64>::new(2, 32, 44100.0);
        assert_eq!(rms(&buffer), 0.0);
        assert_eq!(rms_in_db(&buffer), MINUS_INFINITY_DB);
    }

    #[test]
    fn test_decibel_conversion() {
        assert_relative_eq!(gain_to_decibels(1.0), 0.0);
        assert_relative_eq!(gain_to_decibels(0.5), -6.0206, epsilon = 1e-3);
        assert_relative_eq!(decibels_to_gain(-6.0206), 0.5, epsilon = 1e-4);
        assert_eq!(decibels_to_gain(-120.0), 0.0);
    }

    #[test]
    fn test_average() {
        let samples = vec![0.25_f32, 0.75, -0.5, 0.5];
        assert_relative_eq!(average(&samples), 0.25);
    }

    #[test]
    fn test_magnitude_of_frequency() {
        let buffer = sine_buffer::<f32>(1, 4410, 441.0, 44100.0, 1.0);
        let present = magnitude_of_frequency(&buffer, 441.0, 44100.0).unwrap();
        assert_relative_eq!(present, 1.0, epsilon = 0.01);

        let absent = magnitude_of_frequency(&buffer, 882.0, 44100.0).unwrap();
        assert!(absent < 0.01, "got {absent}");

        let half = sine_buffer::<f32>(1, 4410, 441.0, 44100.0, 0.5);
        assert_relative_eq!(
            magnitude_of_frequency(&half, 441.0, 44100.0).unwrap(),
            0.5,
            epsilon = 0.01
        );
    }

    #[test]
    fn test_magnitude_needs_one_cycle() {
        let samples = vec![0.1_f32; 10];
        assert!(matches!(
            magnitude_of_frequency(&samples, 100.0, 44100.0),
            Err(BlockCheckError::TooShortForFrequency { .. })
        ));
    }

    #[test]
    fn test_histogram_counts_every_sample() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let histogram = histogram(&samples, HISTOGRAM_BINS);
        assert_eq!(histogram.counts.iter().sum::<usize>(), 1000);
        assert_eq!(histogram.report().lines().count(), HISTOGRAM_BINS);
        assert!(is_uniformly_distributed(&samples));
    }

    #[test]
    fn test_histogram_report_lists_bins() {
        let samples: Vec<f32> = (0..=10).map(|i| i as f32).collect();
        let histogram = histogram(&samples, 10);
        assert_eq!(histogram.counts, vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 2]);

        let expected = (0..10)
            .map(|i| format!("[{}, {}): {}", i, i + 1, if i == 9 { "||" } else { "|" }))
            .collect::<Vec<_>>()
            .join("\n");
        pretty_assertions::assert_eq!(histogram.report(), expected);
    }

    #[test]
    fn test_sine_is_not_uniform() {
        let buffer = sine_buffer::<f32>(1, 4410, 441.0, 44100.0, 1.0);
        assert!(!is_uniformly_distributed(&buffer));
    }
}
