//! Mock playheads
//!
//! Processors that follow host tempo ask a [`PlayHead`] for the current
//! position. Tests hand them either a [`NoPlayhead`] (host offers nothing)
//! or a [`PlayingPlayhead`] they can drive block by block.

use tracing::trace;

/// Host transport position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionInfo {
    pub is_playing: bool,
    pub bpm: Option<f64>,
    /// Position in quarter notes
    pub ppq_position: Option<f64>,
    pub time_in_samples: Option<i64>,
}

/// Source of transport position
pub trait PlayHead {
    /// Current position, or `None` when the host provides no information
    fn position(&self) -> Option<PositionInfo>;
}

/// Playhead that never reports a position
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlayhead;

impl PlayHead for NoPlayhead {
    fn position(&self) -> Option<PositionInfo> {
        None
    }
}

/// Playhead that reports a controllable, playing position
///
/// # Example
/// ```
/// use blockcheck::playhead::{PlayHead, PlayingPlayhead};
///
/// let mut playhead = PlayingPlayhead::new();
/// playhead.set_tempo(60.0);
/// playhead.advance_position(22050);
///
/// let position = playhead.position().unwrap();
/// assert!(position.is_playing);
/// assert_eq!(position.ppq_position, Some(0.5));
/// ```
#[derive(Debug, Clone)]
pub struct PlayingPlayhead {
    info: PositionInfo,
    sample_rate: f64,
}

impl Default for PlayingPlayhead {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayingPlayhead {
    /// Tempo assumed when none has been set
    pub const FALLBACK_BPM: f64 = 120.0;

    /// Playing at 44.1 kHz with no tempo or position set
    pub fn new() -> Self {
        Self::with_sample_rate(44100.0)
    }

    pub fn with_sample_rate(sample_rate: f64) -> Self {
        Self {
            info: PositionInfo {
                is_playing: true,
                ..PositionInfo::default()
            },
            sample_rate,
        }
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.info.bpm = Some(bpm);
    }

    pub fn set_is_playing(&mut self, is_playing: bool) {
        self.info.is_playing = is_playing;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Move forward by `num_samples` at the current tempo
    ///
    /// Advances regardless of the playing flag, as a host would when a test
    /// renders blocks back to back.
    pub fn advance_position(&mut self, num_samples: usize) {
        let bpm = self.info.bpm.unwrap_or(Self::FALLBACK_BPM);
        let samples_per_beat = self.sample_rate * 60.0 / bpm;

        let ppq = self.info.ppq_position.unwrap_or(0.0) + num_samples as f64 / samples_per_beat;
        let time = self.info.time_in_samples.unwrap_or(0) + num_samples as i64;
        self.info.ppq_position = Some(ppq);
        self.info.time_in_samples = Some(time);

        trace!(ppq, time, "playhead advanced");
    }
}

impl PlayHead for PlayingPlayhead {
    fn position(&self) -> Option<PositionInfo> {
        Some(self.info)
    }
}
