//! Fill-state predicates
//!
//! "Empty" means every sample is exactly zero. "Filled" is looser: a
//! channel counts as filled as long as it never holds two zeros in a row,
//! so a waveform that passes through zero still qualifies.

use crate::block::{Block, Sample};
use crate::error::{BlockCheckError, Result};

fn check_boundary(index: usize, len: usize) -> Result<()> {
    if index > len {
        return Err(BlockCheckError::OutOfRange { index, len });
    }
    Ok(())
}

fn all_zero<T: Sample>(samples: &[T]) -> bool {
    samples.iter().all(|s| s.is_zero())
}

fn has_consecutive_zeros<T: Sample>(samples: &[T]) -> bool {
    samples.windows(2).any(|pair| pair[0].is_zero() && pair[1].is_zero())
}

/// Number of positions where a sample and its predecessor are both zero
pub fn number_of_consecutive_zeros<T: Sample>(samples: &[T]) -> usize {
    samples
        .windows(2)
        .filter(|pair| pair[0].is_zero() && pair[1].is_zero())
        .count()
}

/// True when every sample of every channel is zero
pub fn is_empty<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> bool {
    (0..block.num_channels()).all(|c| all_zero(block.channel(c)))
}

/// True when the first `num_samples` samples of every channel are zero
pub fn is_empty_until<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, num_samples: usize) -> Result<bool> {
    check_boundary(num_samples, block.num_samples())?;
    Ok((0..block.num_channels()).all(|c| all_zero(&block.channel(c)[..num_samples])))
}

/// True when every sample from `first_zero_at` onward is zero
///
/// A boundary at the end of the block leaves nothing to check.
pub fn is_empty_after<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, first_zero_at: usize) -> Result<bool> {
    check_boundary(first_zero_at, block.num_samples())?;
    Ok((0..block.num_channels()).all(|c| all_zero(&block.channel(c)[first_zero_at..])))
}

/// True when no channel holds two consecutive zeros
pub fn is_filled<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> bool {
    (0..block.num_channels()).all(|c| number_of_consecutive_zeros(block.channel(c)) == 0)
}

/// True when the first `sample_num` samples hold no two consecutive zeros
pub fn is_filled_until<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, sample_num: usize) -> Result<bool> {
    check_boundary(sample_num, block.num_samples())?;
    Ok((0..block.num_channels()).all(|c| !has_consecutive_zeros(&block.channel(c)[..sample_num])))
}

/// True when the samples from `sample_num` onward hold no two consecutive zeros
///
/// A boundary at the end of the block is never filled: there is nothing after it.
pub fn is_filled_after<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, sample_num: usize) -> Result<bool> {
    check_boundary(sample_num, block.num_samples())?;
    if sample_num == block.num_samples() {
        return Ok(false);
    }
    Ok((0..block.num_channels()).all(|c| !has_consecutive_zeros(&block.channel(c)[sample_num..])))
}

/// True when samples `start..end` hold no two consecutive zeros
pub fn is_filled_between<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B, start: usize, end: usize) -> Result<bool> {
    if end <= start {
        return Err(BlockCheckError::InvalidRange { start, end });
    }
    check_boundary(end, block.num_samples())?;
    Ok((0..block.num_channels()).all(|c| !has_consecutive_zeros(&block.channel(c)[start..end])))
}
