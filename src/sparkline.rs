//! Compact text rendering of a block
//!
//! Used in matcher failure messages so a failing test shows the shape of
//! the audio it got, not just a single wrong sample.

use std::num::FpCategory;

use crate::analysis::valid_audio;
use crate::block::{Block, Sample};

/// Widest rendering of one channel, in glyphs
pub const MAX_COLUMNS: usize = 64;

const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Column {
    Zero,
    Invalid,
    Level(char),
}

/// Render a block as a header line plus one glyph line per channel
///
/// ```text
/// [1 channel, 8 samples, min -1, max 1]
/// ▄▆█▆▄▂▁▂
/// ```
///
/// Long channels are downsampled to [`MAX_COLUMNS`] glyphs, keeping the
/// largest excursion of each span. Runs of silence collapse to `0(n)` and
/// NaN, infinite or subnormal samples show as `E`.
pub fn sparkline<T: Sample, B: Block<Sample = T> + ?Sized>(block: &B) -> String {
    let num_channels = block.num_channels();
    let num_samples = block.num_samples();

    let (min, max) = (0..num_channels)
        .flat_map(|c| block.channel(c).iter())
        .copied()
        .filter(|s| s.is_finite())
        .fold(None, |acc: Option<(T, T)>, s| {
            Some(acc.map_or((s, s), |(lo, hi)| (lo.min(s), hi.max(s))))
        })
        .unwrap_or((T::zero(), T::zero()));

    let mut out = format!(
        "[{} channel{}, {} samples, min {}, max {}{}]",
        num_channels,
        if num_channels == 1 { "" } else { "s" },
        num_samples,
        min,
        max,
        if valid_audio(block) { "" } else { ", invalid samples" }
    );

    let scale = min.abs().max(max.abs()).as_f64();
    for c in 0..num_channels {
        out.push('\n');
        out.push_str(&render_channel(block.channel(c), scale));
    }
    out
}

fn render_channel<T: Sample>(samples: &[T], scale: f64) -> String {
    if samples.is_empty() {
        return String::new();
    }

    let span = samples.len().div_ceil(MAX_COLUMNS);
    let columns: Vec<Column> = samples.chunks(span).map(|chunk| column_for(chunk, scale)).collect();

    let mut line = String::new();
    let mut i = 0;
    while i < columns.len() {
        match columns[i] {
            Column::Zero => {
                let run = columns[i..].iter().take_while(|c| **c == Column::Zero).count();
                // run length in samples, not columns
                let zeros = samples
                    .chunks(span)
                    .skip(i)
                    .take(run)
                    .map(|chunk| chunk.len())
                    .sum::<usize>();
                if zeros == 1 {
                    line.push('0');
                } else {
                    line.push_str(&format!("0({zeros})"));
                }
                i += run;
            }
            Column::Invalid => {
                line.push('E');
                i += 1;
            }
            Column::Level(glyph) => {
                line.push(glyph);
                i += 1;
            }
        }
    }
    line
}

fn column_for<T: Sample>(chunk: &[T], scale: f64) -> Column {
    if chunk.iter().any(|s| {
        matches!(
            s.classify(),
            FpCategory::Nan | FpCategory::Infinite | FpCategory::Subnormal
        )
    }) {
        return Column::Invalid;
    }
    if chunk.iter().all(|s| s.is_zero()) {
        return Column::Zero;
    }

    let peak = chunk
        .iter()
        .map(|s| s.as_f64())
        .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });

    // map -scale..scale onto the glyph range
    let position = if scale > 0.0 { (peak / scale + 1.0) / 2.0 } else { 0.5 };
    let index = (position * (GLYPHS.len() - 1) as f64).round() as usize;
    Column::Level(GLYPHS[index.min(GLYPHS.len() - 1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::AudioBuffer;
    use crate::generate::sine_buffer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_and_glyphs() {
        let samples = vec![1.0_f32, 0.5, -0.5, -1.0];
        assert_eq!(sparkline(&samples), "[1 channel, 4 samples, min -1, max 1]\n█▆▃▁");
    }

    #[test]
    fn test_silence_collapses() {
        let samples = vec![0.5_f32, 0.0, 0.0, 0.0, -0.5, 0.0, 0.5];
        assert_eq!(
            sparkline(&samples),
            "[1 channel, 7 samples, min -0.5, max 0.5]\n█0(3)▁0█"
        );
    }

    #[test]
    fn test_invalid_samples_marked() {
        let samples = vec![0.5_f32, f32::NAN, -0.5];
        let rendered = sparkline(&samples);
        assert!(rendered.starts_with("[1 channel, 3 samples, min -0.5, max 0.5, invalid samples]"));
        assert!(rendered.ends_with("█E▁"));

        let subnormal = vec![0.5_f32, f32::MIN_POSITIVE / 4.0, -0.5];
        let rendered = sparkline(&subnormal);
        assert!(rendered.contains(", invalid samples]"));
        assert!(rendered.ends_with("█E▁"));
    }

    #[test]
    fn test_header_uses_sample_precision() {
        let samples = vec![0.1_f32, -0.1];
        assert_eq!(sparkline(&samples), "[1 channel, 2 samples, min -0.1, max 0.1]\n█▁");
    }

    #[test]
    fn test_long_channels_are_downsampled() {
        let buffer = sine_buffer::<f32>(2, 4096, 100.0, 44100.0, 1.0);
        let rendered = sparkline(&buffer);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[2 channels, 4096 samples"));
        assert!(lines[1].chars().count() <= MAX_COLUMNS);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = AudioBuffer::<f32>::new(1, 0, 44100.0);
        assert_eq!(sparkline(&buffer), "[1 channel, 0 samples, min 0, max 0]\n");
    }
}
