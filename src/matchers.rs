//! Assertion matchers
//!
//! A [`Matcher`] decides pass/fail for an actual value and explains itself
//! through [`Matcher::describe`]. Matchers keep details of the last failed
//! match (the wrong sample, the measured RMS, a precondition error) in
//! interior mutable state, so `describe` after a failure says *why*.
//!
//! ```
//! use blockcheck::assert_that;
//! use blockcheck::generate::sine_buffer;
//! use blockcheck::matchers::{HasRms, IsFilled, IsValidAudio};
//!
//! let buffer = sine_buffer::<f32>(2, 44100, 441.0, 44100.0, 1.0);
//! assert_that!(buffer, IsValidAudio);
//! assert_that!(buffer, IsFilled);
//! assert_that!(buffer, HasRms::within(0.7071, 0.001));
//! ```

use std::cell::{Cell, RefCell};

use thiserror::Error;
use tracing::debug;

use crate::analysis::{rms, valid_audio};
use crate::block::{AudioBlock, AudioBuffer, Block, Sample};
use crate::config::{SpectrumConfig, Tolerances};
use crate::error::Result;
use crate::fill;
use crate::sparkline::sparkline;
use crate::spectrum::Spectrum;

/// Predicate over an actual value with a human-readable description
pub trait Matcher<A: ?Sized> {
    /// True when `actual` satisfies the matcher
    fn matches(&self, actual: &A) -> bool;

    /// What the matcher expects, including details of the last failure
    fn describe(&self) -> String;
}

/// Rendering of an actual value in failure messages
pub trait DescribeActual {
    fn describe_actual(&self) -> String;
}

impl<T: Sample> DescribeActual for AudioBuffer<T> {
    fn describe_actual(&self) -> String {
        sparkline(self)
    }
}

impl<T: Sample> DescribeActual for AudioBlock<'_, T> {
    fn describe_actual(&self) -> String {
        sparkline(self)
    }
}

impl<T: Sample> DescribeActual for [T] {
    fn describe_actual(&self) -> String {
        format!("{self:?}")
    }
}

impl<T: Sample> DescribeActual for Vec<T> {
    fn describe_actual(&self) -> String {
        format!("{self:?}")
    }
}

/// A failed match, ready to print
#[derive(Error, Debug, Clone, PartialEq)]
#[error("expected: {description}\nactual:\n{actual}")]
pub struct MatchFailure {
    pub actual: String,
    pub description: String,
}

/// Run a matcher, returning the failure description when it does not match
pub fn check_that<A, M>(actual: &A, matcher: &M) -> std::result::Result<(), MatchFailure>
where
    A: DescribeActual + ?Sized,
    M: Matcher<A>,
{
    if matcher.matches(actual) {
        return Ok(());
    }

    let failure = MatchFailure {
        actual: actual.describe_actual(),
        description: matcher.describe(),
    };
    debug!(description = %failure.description, "matcher failed");
    Err(failure)
}

/// Assert that a value satisfies a matcher, panicking with its description
#[macro_export]
macro_rules! assert_that {
    ($actual:expr, $matcher:expr $(,)?) => {
        if let ::std::result::Result::Err(failure) = $crate::matchers::check_that(&$actual, &$matcher) {
            panic!("assertion failed: `{}`\n{}", stringify!($actual), failure);
        }
    };
}

/// Store the outcome of a fallible predicate, keeping the error text
fn record(slot: &RefCell<Option<String>>, result: Result<bool>) -> bool {
    match result {
        Ok(matched) => {
            slot.replace(None);
            matched
        }
        Err(err) => {
            slot.replace(Some(err.to_string()));
            false
        }
    }
}

fn with_error(base: String, slot: &RefCell<Option<String>>) -> String {
    match slot.borrow().as_deref() {
        Some(err) => format!("{base} ({err})"),
        None => base,
    }
}

// ============================================================================
// Whole-block matchers
// ============================================================================

/// Block is free of NaNs, INFs and subnormals
#[derive(Debug, Clone, Copy, Default)]
pub struct IsValidAudio;

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsValidAudio {
    fn matches(&self, actual: &B) -> bool {
        valid_audio(actual)
    }

    fn describe(&self) -> String {
        "Block is free of NaNs, INFs and subnormals".to_string()
    }
}

/// No channel holds two consecutive zeros
#[derive(Debug, Clone, Copy, Default)]
pub struct IsFilled;

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsFilled {
    fn matches(&self, actual: &B) -> bool {
        fill::is_filled(actual)
    }

    fn describe(&self) -> String {
        "Block is completely filled".to_string()
    }
}

/// Every sample is zero
#[derive(Debug, Clone, Copy, Default)]
pub struct IsEmpty;

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsEmpty {
    fn matches(&self, actual: &B) -> bool {
        fill::is_empty(actual)
    }

    fn describe(&self) -> String {
        "Block is completely empty".to_string()
    }
}

// ============================================================================
// Boundary matchers
// ============================================================================

/// Filled up to (not including) a sample
#[derive(Debug, Default)]
pub struct IsFilledUntil {
    boundary: usize,
    error: RefCell<Option<String>>,
}

impl IsFilledUntil {
    pub fn new(boundary: usize) -> Self {
        Self {
            boundary,
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsFilledUntil {
    fn matches(&self, actual: &B) -> bool {
        record(&self.error, fill::is_filled_until(actual, self.boundary))
    }

    fn describe(&self) -> String {
        with_error(format!("Block is filled to sample {}", self.boundary), &self.error)
    }
}

/// Filled from a sample to the end
#[derive(Debug, Default)]
pub struct IsFilledAfter {
    boundary: usize,
    error: RefCell<Option<String>>,
}

impl IsFilledAfter {
    pub fn new(boundary: usize) -> Self {
        Self {
            boundary,
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsFilledAfter {
    fn matches(&self, actual: &B) -> bool {
        record(&self.error, fill::is_filled_after(actual, self.boundary))
    }

    fn describe(&self) -> String {
        with_error(format!("Block is filled after sample {}", self.boundary), &self.error)
    }
}

/// Filled over `start..end`
#[derive(Debug, Default)]
pub struct IsFilledBetween {
    start: usize,
    end: usize,
    error: RefCell<Option<String>>,
}

impl IsFilledBetween {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsFilledBetween {
    fn matches(&self, actual: &B) -> bool {
        record(&self.error, fill::is_filled_between(actual, self.start, self.end))
    }

    fn describe(&self) -> String {
        with_error(
            format!("Block is filled between samples {} and {}", self.start, self.end),
            &self.error,
        )
    }
}

/// Silent from a sample to the end
#[derive(Debug, Default)]
pub struct IsEmptyAfter {
    boundary: usize,
    error: RefCell<Option<String>>,
}

impl IsEmptyAfter {
    pub fn new(boundary: usize) -> Self {
        Self {
            boundary,
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsEmptyAfter {
    fn matches(&self, actual: &B) -> bool {
        record(&self.error, fill::is_empty_after(actual, self.boundary))
    }

    fn describe(&self) -> String {
        with_error(format!("Block is empty after sample {}", self.boundary), &self.error)
    }
}

/// Silent up to (not including) a sample
#[derive(Debug, Default)]
pub struct IsEmptyUntil {
    boundary: usize,
    error: RefCell<Option<String>>,
}

impl IsEmptyUntil {
    pub fn new(boundary: usize) -> Self {
        Self {
            boundary,
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsEmptyUntil {
    fn matches(&self, actual: &B) -> bool {
        record(&self.error, fill::is_empty_until(actual, self.boundary))
    }

    fn describe(&self) -> String {
        with_error(format!("Block is empty until sample {}", self.boundary), &self.error)
    }
}

// ============================================================================
// Level
// ============================================================================

/// RMS within an absolute tolerance of an expected value
#[derive(Debug)]
pub struct HasRms {
    expected: f64,
    tolerance: f64,
    actual: Cell<f64>,
}

impl HasRms {
    /// Expect an RMS with the default tolerance
    pub fn new(expected: f64) -> Self {
        Self::within(expected, Tolerances::default().rms)
    }

    /// Expect an RMS with the tolerance from a loaded configuration
    pub fn with_tolerances(expected: f64, tolerances: &Tolerances) -> Self {
        Self::within(expected, tolerances.rms)
    }

    /// Expect an RMS within `tolerance`
    pub fn within(expected: f64, tolerance: f64) -> Self {
        Self {
            expected,
            tolerance,
            actual: Cell::new(0.0),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for HasRms {
    fn matches(&self, actual: &B) -> bool {
        let measured = rms(actual).as_f64();
        self.actual.set(measured);
        (measured - self.expected).abs() < self.tolerance
    }

    fn describe(&self) -> String {
        format!(
            "Block RMS of {} was expected to be within {} of {}",
            self.actual.get(),
            self.tolerance,
            self.expected
        )
    }
}

// ============================================================================
// Equality
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Mismatch {
    Shape {
        channels: usize,
        samples: usize,
    },
    Sample {
        channel: usize,
        index: usize,
        expected: f64,
        actual: f64,
    },
}

/// Sample-by-sample equality within a tolerance
///
/// Built from a block or from a vector of expected samples; either form
/// matches blocks, buffers and vectors of the same shape.
#[derive(Debug)]
pub struct IsEqualTo<T: Sample> {
    expected: AudioBuffer<T>,
    tolerance: f64,
    from_vector: bool,
    mismatch: RefCell<Option<Mismatch>>,
}

impl<T: Sample> IsEqualTo<T> {
    /// Expect the contents of a block
    pub fn block<B: Block<Sample = T> + ?Sized>(expected: &B) -> Self {
        let channels = (0..expected.num_channels())
            .map(|c| expected.channel(c).to_vec())
            .collect();
        Self {
            // channels of a Block always share one length
            expected: AudioBuffer::from_channels(channels, 0.0).unwrap_or_else(|_| AudioBuffer::new(0, 0, 0.0)),
            tolerance: Tolerances::default().equality,
            from_vector: false,
            mismatch: RefCell::default(),
        }
    }

    /// Expect a single channel holding exactly these samples
    pub fn vector(expected: Vec<T>) -> Self {
        Self {
            expected: AudioBuffer::mono(expected, 0.0),
            tolerance: Tolerances::default().equality,
            from_vector: true,
            mismatch: RefCell::default(),
        }
    }

    /// Override the per-sample tolerance
    pub fn within(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn describe_expected(&self) -> String {
        if self.from_vector {
            format!("{:?}", self.expected.channel(0))
        } else {
            sparkline(&self.expected)
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsEqualTo<T> {
    fn matches(&self, actual: &B) -> bool {
        if actual.num_channels() != self.expected.num_channels()
            || actual.num_samples() != self.expected.num_samples()
        {
            self.mismatch.replace(Some(Mismatch::Shape {
                channels: actual.num_channels(),
                samples: actual.num_samples(),
            }));
            return false;
        }

        for c in 0..actual.num_channels() {
            let pairs = self.expected.channel(c).iter().zip(actual.channel(c));
            for (index, (&expected, &got)) in pairs.enumerate() {
                // NaN never compares within tolerance
                let within = (expected.as_f64() - got.as_f64()).abs() <= self.tolerance;
                if !within {
                    self.mismatch.replace(Some(Mismatch::Sample {
                        channel: c,
                        index,
                        expected: expected.as_f64(),
                        actual: got.as_f64(),
                    }));
                    return false;
                }
            }
        }

        self.mismatch.replace(None);
        true
    }

    fn describe(&self) -> String {
        let mut description = format!("is equal to\n{}", self.describe_expected());
        match &*self.mismatch.borrow() {
            Some(Mismatch::Shape { channels, samples }) => description.push_str(&format!(
                "\nExpected {} channels of {} samples but got {} channels of {} samples",
                self.expected.num_channels(),
                self.expected.num_samples(),
                channels,
                samples
            )),
            Some(Mismatch::Sample {
                channel,
                index,
                expected,
                actual,
            }) => description.push_str(&format!(
                "\nChannel {} index {} expected to be {} but was {}, a difference of {}",
                channel,
                index,
                expected,
                actual,
                expected - actual
            )),
            None => {}
        }
        description
    }
}

// ============================================================================
// Range
// ============================================================================

/// Every sample lies within `[min, max]`, give or take 100 epsilons
#[derive(Debug)]
pub struct IsBetween {
    min: f64,
    max: f64,
    range_epsilons: f64,
    offender: Cell<Option<(usize, f64)>>,
}

impl IsBetween {
    pub fn new(min: f64, max: f64) -> Self {
        Self::with_tolerances(min, max, &Tolerances::default())
    }

    /// Bounds with the epsilon slack from a loaded configuration
    pub fn with_tolerances(min: f64, max: f64, tolerances: &Tolerances) -> Self {
        Self {
            min,
            max,
            range_epsilons: tolerances.range_epsilons,
            offender: Cell::new(None),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for IsBetween {
    fn matches(&self, actual: &B) -> bool {
        self.offender.set(None);
        if self.min >= self.max {
            return false;
        }

        let slack = T::EPSILON.as_f64() * self.range_epsilons;
        for c in 0..actual.num_channels() {
            for (i, &sample) in actual.channel(c).iter().enumerate() {
                let value = sample.as_f64();
                if !(value >= self.min - slack && value <= self.max + slack) {
                    self.offender.set(Some((i, value)));
                    return false;
                }
            }
        }
        true
    }

    fn describe(&self) -> String {
        let mut description = format!("items are between {} and {}", self.min, self.max);
        if self.min >= self.max {
            description.push_str(" (min must be below max)");
        } else if let Some((index, value)) = self.offender.get() {
            description.push_str(&format!("\nItem {index} was {value}"));
        }
        description
    }
}

// ============================================================================
// Spectral
// ============================================================================

/// The strongest single FFT bin of channel 0 is the bin for a frequency
#[derive(Debug)]
pub struct HasStrongestFrequency {
    frequency: f32,
    sample_rate: f32,
    config: SpectrumConfig,
    strongest: Cell<Option<(usize, f32)>>,
    error: RefCell<Option<String>>,
}

impl HasStrongestFrequency {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self::with_config(frequency, sample_rate, SpectrumConfig::default())
    }

    pub fn with_config(frequency: f32, sample_rate: f32, config: SpectrumConfig) -> Self {
        Self {
            frequency,
            sample_rate,
            config,
            strongest: Cell::new(None),
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for HasStrongestFrequency {
    fn matches(&self, actual: &B) -> bool {
        self.strongest.set(None);
        let result = Spectrum::with_config(actual, self.sample_rate, self.config.clone()).and_then(|spectrum| {
            let bin = spectrum.strongest_frequency_bin();
            self.strongest
                .set(Some((bin, spectrum.approx_frequency_for_bin(bin))));
            spectrum.strongest_frequency_is(self.frequency)
        });
        record(&self.error, result)
    }

    fn describe(&self) -> String {
        let mut description = format!("Strongest frequency is {} Hz", self.frequency);
        if let Some((bin, frequency)) = self.strongest.get() {
            description.push_str(&format!(", strongest bin was {bin} (~{frequency} Hz)"));
        }
        with_error(description, &self.error)
    }
}

/// The FFT bin for a frequency is below the absent-bin threshold
#[derive(Debug)]
pub struct LacksFrequency {
    frequency: f32,
    sample_rate: f32,
    config: SpectrumConfig,
    magnitude: Cell<Option<f32>>,
    error: RefCell<Option<String>>,
}

impl LacksFrequency {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self::with_config(frequency, sample_rate, SpectrumConfig::default())
    }

    pub fn with_config(frequency: f32, sample_rate: f32, config: SpectrumConfig) -> Self {
        Self {
            frequency,
            sample_rate,
            config,
            magnitude: Cell::new(None),
            error: RefCell::default(),
        }
    }
}

impl<T: Sample, B: Block<Sample = T> + ?Sized> Matcher<B> for LacksFrequency {
    fn matches(&self, actual: &B) -> bool {
        self.magnitude.set(None);
        let result = Spectrum::with_config(actual, self.sample_rate, self.config.clone()).and_then(|spectrum| {
            self.magnitude.set(spectrum.magnitude_at(self.frequency).ok());
            spectrum.frequency_not_present(self.frequency)
        });
        record(&self.error, result)
    }

    fn describe(&self) -> String {
        let mut description = format!(
            "{} Hz is below {} in the spectrum",
            self.frequency, self.config.absent_bin_threshold
        );
        if let Some(magnitude) = self.magnitude.get() {
            description.push_str(&format!(", but its bin measured {magnitude}"));
        }
        with_error(description, &self.error)
    }
}
