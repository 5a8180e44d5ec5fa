//! Helper configuration
//!
//! Thresholds and tolerances used by the spectrum helper and the matchers.
//! Defaults suit typical unit tests; suites that need looser or stricter
//! checks can load overrides from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for [`crate::spectrum::Spectrum`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Transform size in samples (power of two)
    pub fft_size: usize,
    /// Rescale magnitudes so the strongest bin equals `peak_scale`
    pub scale: bool,
    /// Value of the strongest bin after rescaling
    pub peak_scale: f32,
    /// Bins above this magnitude are reported as strong
    pub strong_bin_threshold: f32,
    /// Bins below this magnitude count as absent
    pub absent_bin_threshold: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            scale: true,
            peak_scale: 0.5,
            strong_bin_threshold: 0.05,
            // bleed of 0.01 is common two bins away from a pure tone
            absent_bin_threshold: 0.02,
        }
    }
}

impl SpectrumConfig {
    /// Same settings with rescaling turned off
    pub fn unscaled() -> Self {
        Self {
            scale: false,
            ..Self::default()
        }
    }

    /// Number of positive-frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }
}

/// Default tolerances for the comparison matchers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Per-sample tolerance for `IsEqualTo`
    pub equality: f64,
    /// Absolute tolerance for `HasRms`
    pub rms: f64,
    /// Multiple of the sample epsilon allowed outside `IsBetween` bounds
    pub range_epsilons: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            equality: f32::EPSILON as f64 * 100.0,
            rms: 0.0001,
            range_epsilons: 100.0,
        }
    }
}

/// Complete helper configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub spectrum: SpectrumConfig,
    pub tolerances: Tolerances,
}

impl HelperConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
