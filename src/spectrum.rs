//! Single-bin spectral analysis
//!
//! Answers "which frequency is strongest in this block" and "is this
//! frequency absent" with a windowed forward FFT of channel 0.
//!
//! Only the strongest *single* bin is considered. A real tone often spreads
//! across neighbouring bins, so pick test frequencies near bin centres
//! (multiples of `sample_rate / fft_size`) when asserting exact bins.

use std::f32::consts::TAU;

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::block::{Block, Sample};
use crate::config::SpectrumConfig;
use crate::error::{BlockCheckError, Result};

/// Symmetric Hann window scaled so its samples sum to `size`
fn normalised_hann(size: usize) -> Vec<f32> {
    let denominator = (size - 1).max(1) as f32;
    let window: Vec<f32> = (0..size)
        .map(|i| 0.5 - 0.5 * (TAU * i as f32 / denominator).cos())
        .collect();

    let sum: f32 = window.iter().sum();
    if sum <= 0.0 {
        return window;
    }
    let factor = size as f32 / sum;
    window.into_iter().map(|w| w * factor).collect()
}

/// Magnitude spectrum of channel 0 of a block
///
/// # Example
/// ```
/// use blockcheck::generate::sine_buffer;
/// use blockcheck::spectrum::Spectrum;
///
/// // 20 bins of 44100 / 2048 Hz
/// let frequency = 20.0 * 44100.0 / 2048.0;
/// let buffer = sine_buffer::<f32>(1, 4096, frequency, 44100.0, 1.0);
/// let spectrum = Spectrum::new(&buffer, 44100.0).unwrap();
/// assert_eq!(spectrum.strongest_frequency_bin(), 20);
/// assert!(spectrum.strongest_frequency_is(frequency).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Spectrum {
    magnitudes: Vec<f32>,
    sample_rate: f32,
    config: SpectrumConfig,
}

impl Spectrum {
    /// Analyse a block with the default configuration
    pub fn new<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, sample_rate: f32) -> Result<Self> {
        Self::with_config(block, sample_rate, SpectrumConfig::default())
    }

    /// Analyse a block
    ///
    /// Fills `fft_size` samples from channel 0, wrapping around to the start
    /// when the block is shorter. Magnitudes are divided by `fft_size`, so a
    /// full scale sine on a bin centre reads 0.5 before rescaling.
    pub fn with_config<T: Sample, B: Block<Sample = T> + ?Sized>(
        block: &B,
        sample_rate: f32,
        config: SpectrumConfig,
    ) -> Result<Self> {
        let fft_size = config.fft_size;
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(BlockCheckError::InvalidFftSize { size: fft_size });
        }
        if block.is_block_empty() {
            return Err(BlockCheckError::EmptyBlock);
        }

        let source = block.channel(0);
        let window = normalised_hann(fft_size);
        let mut data: Vec<Complex<f32>> = (0..fft_size)
            .map(|i| Complex::new(source[i % source.len()].as_f64() as f32 * window[i], 0.0))
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        fft.process(&mut data);

        let mut magnitudes: Vec<f32> = data
            .iter()
            .take(config.num_bins())
            .map(|c| c.norm() / fft_size as f32)
            .collect();

        let max_value = magnitudes.iter().copied().fold(0.0_f32, f32::max);
        if config.scale && max_value > 0.0 {
            let factor = config.peak_scale / max_value;
            magnitudes.iter_mut().for_each(|m| *m *= factor);
        }

        debug!(fft_size, sample_rate, max_value, "computed spectrum");

        Ok(Self {
            magnitudes,
            sample_rate,
            config,
        })
    }

    /// Magnitude of each positive-frequency bin
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Number of positive-frequency bins
    pub fn num_bins(&self) -> usize {
        self.magnitudes.len()
    }

    /// Sample rate the spectrum was computed for
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Width of one bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.config.fft_size as f32
    }

    /// Nearest bin for a frequency
    pub fn frequency_bin_for(&self, frequency: f32) -> usize {
        (frequency / self.sample_rate * self.config.fft_size as f32 + 0.5) as usize
    }

    /// Rough frequency of a bin, as shown in [`Spectrum::debug_table`]
    ///
    /// Reports the upper edge of the bin: `(bin + 1) * bin_width`.
    pub fn approx_frequency_for_bin(&self, bin: usize) -> f32 {
        (bin + 1) as f32 * self.bin_width()
    }

    /// Nearest bin for each frequency
    pub fn frequency_bins_for(&self, frequencies: &[f32]) -> Vec<usize> {
        frequencies.iter().map(|&f| self.frequency_bin_for(f)).collect()
    }

    /// Magnitude of the bin nearest to a frequency
    pub fn magnitude_at(&self, frequency: f32) -> Result<f32> {
        let bin = self.frequency_bin_for(frequency);
        self.magnitudes
            .get(bin)
            .copied()
            .ok_or(BlockCheckError::BinOutOfRange {
                bin,
                num_bins: self.num_bins(),
            })
    }

    /// True when the bin for `frequency` holds the maximum magnitude
    pub fn strongest_frequency_is(&self, frequency: f32) -> Result<bool> {
        let magnitude = self.magnitude_at(frequency)?;
        let max_value = self.magnitudes.iter().copied().fold(0.0_f32, f32::max);
        Ok(magnitude == max_value)
    }

    /// Index of the bin with the largest magnitude (the first one on ties)
    pub fn strongest_frequency_bin(&self) -> usize {
        let mut strongest = 0;
        for (i, &magnitude) in self.magnitudes.iter().enumerate() {
            if magnitude > self.magnitudes[strongest] {
                strongest = i;
            }
        }
        strongest
    }

    /// Bins whose magnitude exceeds the strong-bin threshold
    pub fn strong_frequency_bins(&self) -> Vec<usize> {
        self.magnitudes
            .iter()
            .enumerate()
            .filter(|(_, &m)| m > self.config.strong_bin_threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// True when the bin for `frequency` is below the absent-bin threshold
    pub fn frequency_not_present(&self, frequency: f32) -> Result<bool> {
        Ok(self.magnitude_at(frequency)? < self.config.absent_bin_threshold)
    }

    /// Table of the strong bins:
    ///
    /// ```text
    /// FFT bins | freq | signal
    /// 9 | 215.332 | 0.246468
    /// 10 | 236.865 | 0.5
    /// ```
    pub fn debug_table(&self) -> String {
        let mut table = String::from("FFT bins | freq | signal");
        for bin in self.strong_frequency_bins() {
            table.push_str(&format!(
                "\n{} | {} | {}",
                bin,
                self.approx_frequency_for_bin(bin),
                self.magnitudes[bin]
            ));
        }
        table
    }

    /// Emit [`Spectrum::debug_table`] at debug level
    pub fn log_debug(&self) {
        for line in self.debug_table().lines() {
            debug!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::AudioBuffer;
    use crate::generate::{add_sine, sine_buffer};
    use approx::assert_relative_eq;

    const RATE: f32 = 44100.0;

    fn bin_centre(bin: usize) -> f32 {
        bin as f32 * RATE / 2048.0
    }

    #[test]
    fn test_window_sums_to_size() {
        let window = normalised_hann(2048);
        let sum: f32 = window.iter().sum();
        assert_relative_eq!(sum, 2048.0, epsilon = 0.1);
        assert_relative_eq!(window[0], 0.0);
    }

    #[test]
    fn test_strongest_bin_of_pure_tone() {
        let buffer = sine_buffer::<f32>(1, 4096, bin_centre(20), RATE, 1.0);
        let spectrum = Spectrum::new(&buffer, RATE).unwrap();

        assert_eq!(spectrum.num_bins(), 1024);
        assert_eq!(spectrum.strongest_frequency_bin(), 20);
        assert!(spectrum.strongest_frequency_is(bin_centre(20)).unwrap());
        assert!(!spectrum.strongest_frequency_is(bin_centre(40)).unwrap());
        assert_relative_eq!(spectrum.magnitudes()[20], 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_unscaled_magnitude_tracks_amplitude() {
        let full = sine_buffer::<f32>(1, 4096, bin_centre(50), RATE, 1.0);
        let half = sine_buffer::<f32>(1, 4096, bin_centre(50), RATE, 0.5);

        let full = Spectrum::with_config(&full, RATE, SpectrumConfig::unscaled()).unwrap();
        let half = Spectrum::with_config(&half, RATE, SpectrumConfig::unscaled()).unwrap();

        assert_relative_eq!(full.magnitudes()[50], 0.5, epsilon = 0.01);
        assert_relative_eq!(half.magnitudes()[50], 0.25, epsilon = 0.01);
    }

    #[test]
    fn test_two_tones() {
        let mut buffer = sine_buffer::<f32>(1, 4096, bin_centre(30), RATE, 1.0);
        add_sine(&mut buffer, bin_centre(100), RATE, 0.5);
        let spectrum = Spectrum::new(&buffer, RATE).unwrap();

        assert!(spectrum.strongest_frequency_is(bin_centre(30)).unwrap());
        let strong = spectrum.strong_frequency_bins();
        assert!(strong.contains(&30));
        assert!(strong.contains(&100));
        assert!(spectrum.frequency_not_present(bin_centre(300)).unwrap());
        assert!(!spectrum.frequency_not_present(bin_centre(100)).unwrap());
    }

    #[test]
    fn test_bin_mapping() {
        let buffer = sine_buffer::<f32>(1, 2048, 1000.0, RATE, 1.0);
        let spectrum = Spectrum::new(&buffer, RATE).unwrap();

        assert_eq!(spectrum.frequency_bin_for(1000.0), 46);
        assert_eq!(spectrum.frequency_bins_for(&[0.0, 440.0, 1000.0]), vec![0, 20, 46]);
        assert_relative_eq!(spectrum.approx_frequency_for_bin(10), 236.865, epsilon = 0.001);
    }

    #[test]
    fn test_short_block_wraps() {
        // 64 samples hold exactly one cycle, so wrapping stays continuous
        let buffer = sine_buffer::<f32>(1, 64, RATE / 64.0, RATE, 1.0);
        let spectrum = Spectrum::new(&buffer, RATE).unwrap();
        assert_eq!(spectrum.strongest_frequency_bin(), 32);
    }

    #[test]
    fn test_silence_is_left_unscaled() {
        let buffer = AudioBuffer::<f32>::new(1, 2048, RATE as f64);
        let spectrum = Spectrum::new(&buffer, RATE).unwrap();
        assert!(spectrum.magnitudes().iter().all(|&m| m == 0.0));
        assert!(spectrum.strong_frequency_bins().is_empty());
        assert_eq!(spectrum.strongest_frequency_bin(), 0);
    }

    #[test]
    fn test_errors() {
        let empty: Vec<f32> = Vec::new();
        assert!(matches!(Spectrum::new(&empty, RATE), Err(BlockCheckError::EmptyBlock)));

        let buffer = sine_buffer::<f32>(1, 256, 440.0, RATE, 1.0);
        let config = SpectrumConfig {
            fft_size: 1000,
            ..SpectrumConfig::default()
        };
        assert!(matches!(
            Spectrum::with_config(&buffer, RATE, config),
            Err(BlockCheckError::InvalidFftSize { size: 1000 })
        ));

        let spectrum = Spectrum::new(&buffer, RATE).unwrap();
        assert!(matches!(
            spectrum.strongest_frequency_is(30000.0),
            Err(BlockCheckError::BinOutOfRange { .. })
        ));
    }

    #[test]
    fn test_debug_table_lists_strong_bins() {
        let buffer = sine_buffer::<f32>(1, 4096, bin_centre(10), RATE, 1.0);
        let spectrum = Spectrum::new(&buffer, RATE).unwrap();
        let table = spectrum.debug_table();
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("FFT bins | freq | signal"));
        assert!(table.lines().any(|line| line.starts_with("10 | ")));
    }
}
