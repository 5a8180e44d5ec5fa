//! Audio Block Types
//!
//! Non-interleaved multi-channel sample storage and views. Every helper and
//! matcher in this crate is generic over [`Block`], so an owned
//! [`AudioBuffer`], a borrowed [`AudioBlock`] and a plain mono slice can all
//! be checked with the same call.

use std::fmt::{Debug, Display};

use num_traits::Float;

use crate::error::{BlockCheckError, Result};

// ============================================================================
// Sample Type
// ============================================================================

/// Floating point sample type (f32 or f64)
pub trait Sample: Float + Debug + Display + Default + Send + Sync + 'static {
    /// Machine epsilon of the sample type
    const EPSILON: Self;

    /// Convert from f64, rounding to the sample precision
    fn from_f64(value: f64) -> Self;

    /// Widen to f64 for accumulation
    fn as_f64(self) -> f64;
}

impl Sample for f32 {
    const EPSILON: Self = f32::EPSILON;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    const EPSILON: Self = f64::EPSILON;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

// ============================================================================
// Block Traits
// ============================================================================

/// Read access to a non-interleaved block of samples
///
/// `channel` panics on an out-of-range index, the same way slice indexing
/// does. All helpers only ask for channels below `num_channels`.
pub trait Block {
    /// Sample type held by the block
    type Sample: Sample;

    /// Number of channels
    fn num_channels(&self) -> usize;

    /// Number of samples per channel
    fn num_samples(&self) -> usize;

    /// Samples of one channel
    fn channel(&self, channel: usize) -> &[Self::Sample];

    /// A single sample
    #[inline]
    fn sample(&self, channel: usize, index: usize) -> Self::Sample {
        self.channel(channel)[index]
    }

    /// Total number of samples across all channels
    #[inline]
    fn total_samples(&self) -> usize {
        self.num_channels() * self.num_samples()
    }

    /// True when the block holds no samples
    #[inline]
    fn is_block_empty(&self) -> bool {
        self.total_samples() == 0
    }

    /// Borrow the whole block as an [`AudioBlock`] view
    fn as_block(&self) -> AudioBlock<'_, Self::Sample> {
        AudioBlock {
            channels: (0..self.num_channels()).map(|c| self.channel(c)).collect(),
        }
    }
}

/// Write access to a non-interleaved block of samples
pub trait BlockMut: Block {
    /// Mutable samples of one channel
    fn channel_mut(&mut self, channel: usize) -> &mut [Self::Sample];

    /// Overwrite a single sample
    #[inline]
    fn set_sample(&mut self, channel: usize, index: usize, value: Self::Sample) {
        self.channel_mut(channel)[index] = value;
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Owned multi-channel audio buffer
///
/// Stores one `Vec` per channel. All channels always have the same length.
///
/// # Example
/// ```
/// use blockcheck::{AudioBuffer, Block};
///
/// let buffer = AudioBuffer::<f32>::new(2, 512, 44100.0);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.num_samples(), 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer<T: Sample = f32> {
    samples: Vec<Vec<T>>,
    sample_rate: f64,
}

impl<T: Sample> AudioBuffer<T> {
    /// Create a zeroed buffer
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: f64) -> Self {
        Self {
            samples: vec![vec![T::zero(); num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a mono buffer from samples
    pub fn mono(samples: Vec<T>, sample_rate: f64) -> Self {
        Self {
            samples: vec![samples],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<T>>, sample_rate: f64) -> Result<Self> {
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().find(|ch| ch.len() != expected) {
                return Err(BlockCheckError::LengthMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self {
            samples: channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved data (L, R, L, R, ... for stereo)
    pub fn from_interleaved(interleaved: &[T], num_channels: usize, sample_rate: f64) -> Result<Self> {
        if num_channels == 0 || interleaved.len() % num_channels != 0 {
            return Err(BlockCheckError::NotInterleaved {
                len: interleaved.len(),
                channels: num_channels,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<T> {
        let mut interleaved = Vec::with_capacity(self.total_samples());
        for i in 0..self.num_samples() {
            for channel in &self.samples {
                interleaved.push(channel[i]);
            }
        }
        interleaved
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.num_samples() as f64 / self.sample_rate
    }

    /// Borrow a range of samples from every channel
    pub fn sub_block(&self, start: usize, len: usize) -> Result<AudioBlock<'_, T>> {
        self.as_block().sub_block(start, len)
    }

    /// Consume the buffer, returning the per-channel vectors
    pub fn into_channels(self) -> Vec<Vec<T>> {
        self.samples
    }
}

impl<T: Sample> Block for AudioBuffer<T> {
    type Sample = T;

    #[inline]
    fn num_channels(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    fn num_samples(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    #[inline]
    fn channel(&self, channel: usize) -> &[T] {
        &self.samples[channel]
    }
}

impl<T: Sample> BlockMut for AudioBuffer<T> {
    #[inline]
    fn channel_mut(&mut self, channel: usize) -> &mut [T] {
        &mut self.samples[channel]
    }
}

// ============================================================================
// Audio Block (borrowed view)
// ============================================================================

/// Borrowed read-only view over channel slices of equal length
#[derive(Debug, Clone)]
pub struct AudioBlock<'a, T: Sample> {
    channels: Vec<&'a [T]>,
}

impl<'a, T: Sample> AudioBlock<'a, T> {
    /// Build a view from channel slices
    pub fn from_slices(channels: Vec<&'a [T]>) -> Result<Self> {
        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().find(|ch| ch.len() != expected) {
                return Err(BlockCheckError::LengthMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }
        Ok(Self { channels })
    }

    /// Single channel view over a slice
    pub fn mono(samples: &'a [T]) -> Self {
        Self {
            channels: vec![samples],
        }
    }

    /// Samples `start..start + len` of every channel
    pub fn sub_block(&self, start: usize, len: usize) -> Result<AudioBlock<'a, T>> {
        let end = start.checked_add(len).unwrap_or(usize::MAX);
        if end > self.num_samples() {
            return Err(BlockCheckError::OutOfRange {
                index: end,
                len: self.num_samples(),
            });
        }
        Ok(AudioBlock {
            channels: self.channels.iter().copied().map(|ch| &ch[start..end]).collect(),
        })
    }

    /// View of just one channel
    pub fn single_channel(&self, channel: usize) -> Result<AudioBlock<'a, T>> {
        let slice = self
            .channels
            .get(channel)
            .ok_or(BlockCheckError::ChannelOutOfRange {
                channel,
                num_channels: self.channels.len(),
            })?;
        Ok(AudioBlock {
            channels: vec![*slice],
        })
    }
}

impl<T: Sample> Block for AudioBlock<'_, T> {
    type Sample = T;

    #[inline]
    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    fn num_samples(&self) -> usize {
        self.channels.first().map(|ch| ch.len()).unwrap_or(0)
    }

    #[inline]
    fn channel(&self, channel: usize) -> &[T] {
        self.channels[channel]
    }
}

// ============================================================================
// Slices and vectors as mono blocks
// ============================================================================

impl<T: Sample> Block for [T] {
    type Sample = T;

    #[inline]
    fn num_channels(&self) -> usize {
        1
    }

    #[inline]
    fn num_samples(&self) -> usize {
        self.len()
    }

    #[inline]
    fn channel(&self, channel: usize) -> &[T] {
        assert_eq!(channel, 0, "a slice is a single channel block");
        self
    }
}

impl<T: Sample> BlockMut for [T] {
    #[inline]
    fn channel_mut(&mut self, channel: usize) -> &mut [T] {
        assert_eq!(channel, 0, "a slice is a single channel block");
        self
    }
}

impl<T: Sample> Block for Vec<T> {
    type Sample = T;

    #[inline]
    fn num_channels(&self) -> usize {
        1
    }

    #[inline]
    fn num_samples(&self) -> usize {
        self.len()
    }

    #[inline]
    fn channel(&self, channel: usize) -> &[T] {
        self.as_slice().channel(channel)
    }
}

impl<T: Sample> BlockMut for Vec<T> {
    #[inline]
    fn channel_mut(&mut self, channel: usize) -> &mut [T] {
        self.as_mut_slice().channel_mut(channel)
    }
}
