//! blockcheck - assertions for audio blocks in unit tests
//!
//! Helpers for testing audio processors: measure a block, check whether it
//! is filled or silent over a range, find its strongest frequency, and
//! assert all of it through matchers whose failures render the audio as a
//! sparkline.
//!
//! # Modules
//!
//! - [`block`]: the `Block` abstraction over buffers, views and slices
//! - [`analysis`], [`fill`], [`spectrum`]: measurements and predicates
//! - [`generate`]: test tones and in-place transforms
//! - [`matchers`]: `assert_that!` and the matcher types
//! - [`playhead`], [`parameters`]: host mocks for processor tests
//! - [`wav`], [`config`]: fixtures and tunable thresholds

pub mod analysis;
pub mod block;
pub mod cli;
pub mod config;
pub mod error;
pub mod fill;
pub mod generate;
pub mod matchers;
pub mod parameters;
pub mod playhead;
pub mod sparkline;
pub mod spectrum;
pub mod wav;

pub use block::{AudioBlock, AudioBuffer, Block, BlockMut, Sample};
pub use error::{BlockCheckError, Result};
