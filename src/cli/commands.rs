//! CLI Command Implementations
//!
//! Each command builds its report as a string so it can be tested without
//! capturing stdout.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::analysis::{gain_to_decibels, max_magnitude, rms, valid_audio};
use crate::block::Block;
use crate::config::HelperConfig;
use crate::matchers::{check_that, IsEqualTo, MatchFailure};
use crate::sparkline::sparkline;
use crate::spectrum::Spectrum;
use crate::wav::load_wav;

/// Load the configuration file, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<HelperConfig> {
    match path {
        Some(path) => HelperConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(HelperConfig::default()),
    }
}

/// Describe a WAV file
pub fn inspect(path: &Path, config: &HelperConfig) -> Result<String> {
    info!("Inspecting: {}", path.display());
    let buffer = load_wav(path).with_context(|| format!("failed to read {}", path.display()))?;

    let level = rms(&buffer) as f64;
    let peak = max_magnitude(&buffer) as f64;

    let mut report = String::new();
    writeln!(report, "{}", path.display())?;
    writeln!(report, "{}", sparkline(&buffer))?;
    writeln!(report, "sample rate: {} Hz", buffer.sample_rate())?;
    writeln!(report, "rms: {:.6} ({:.2} dB)", level, gain_to_decibels(level))?;
    writeln!(report, "peak: {:.6} ({:.2} dB)", peak, gain_to_decibels(peak))?;
    writeln!(report, "valid: {}", if valid_audio(&buffer) { "yes" } else { "no" })?;

    if buffer.is_block_empty() {
        writeln!(report, "strongest frequency: n/a (no samples)")?;
    } else {
        let spectrum = Spectrum::with_config(&buffer, buffer.sample_rate() as f32, config.spectrum.clone())?;
        let bin = spectrum.strongest_frequency_bin();
        writeln!(
            report,
            "strongest frequency: ~{:.1} Hz (bin {}, magnitude {:.4})",
            spectrum.approx_frequency_for_bin(bin),
            bin,
            spectrum.magnitudes()[bin]
        )?;
    }
    Ok(report)
}

/// Compare two WAV files, returning the failure when they differ
pub fn compare(
    expected: &Path,
    actual: &Path,
    tolerance: Option<f64>,
    config: &HelperConfig,
) -> Result<Option<MatchFailure>> {
    info!("Comparing {} against {}", actual.display(), expected.display());
    let expected_buffer =
        load_wav(expected).with_context(|| format!("failed to read {}", expected.display()))?;
    let actual_buffer = load_wav(actual).with_context(|| format!("failed to read {}", actual.display()))?;

    let matcher = IsEqualTo::block(&expected_buffer).within(tolerance.unwrap_or(config.tolerances.equality));
    Ok(check_that(&actual_buffer, &matcher).err())
}
