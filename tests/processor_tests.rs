//! Processor Tests
//!
//! A small tempo-synced gate stands in for a plugin under test. It reads
//! the host playhead and a parameter store, and the helpers assert on
//! what it renders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blockcheck::assert_that;
use blockcheck::generate::sine_buffer;
use blockcheck::matchers::{HasRms, IsEmpty, IsEmptyAfter, IsFilled, IsFilledUntil};
use blockcheck::parameters::{flush_parameters, wait_for_parameter_change, ParameterStore};
use blockcheck::playhead::{NoPlayhead, PlayHead, PlayingPlayhead};
use blockcheck::{AudioBuffer, Block, BlockMut};

/// Mutes everything after the first half beat of each beat while playing
struct BeatGate {
    bypassed: Arc<AtomicBool>,
}

impl BeatGate {
    fn new(parameters: &ParameterStore) -> Self {
        let bypassed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&bypassed);
        parameters.add_listener(move |change| {
            if change.id == "bypass" {
                flag.store(change.value >= 0.5, Ordering::SeqCst);
            }
        });
        Self { bypassed }
    }

    fn process(&self, buffer: &mut AudioBuffer<f32>, playhead: &dyn PlayHead) {
        if self.bypassed.load(Ordering::SeqCst) {
            return;
        }
        let Some(position) = playhead.position() else {
            return;
        };
        if !position.is_playing {
            return;
        }

        let ppq = position.ppq_position.unwrap_or(0.0);
        let samples_per_beat = buffer.sample_rate() * 60.0 / position.bpm.unwrap_or(120.0);
        for i in 0..buffer.num_samples() {
            let beat = ppq + i as f64 / samples_per_beat;
            if beat.fract() >= 0.5 {
                for c in 0..buffer.num_channels() {
                    buffer.set_sample(c, i, 0.0);
                }
            }
        }
    }
}

fn parameters() -> ParameterStore {
    ParameterStore::new().with_parameter("bypass", 0.0)
}

#[test]
fn test_gate_passes_audio_without_host_position() {
    let parameters = parameters();
    let gate = BeatGate::new(&parameters);
    let mut buffer = sine_buffer::<f32>(2, 1024, 441.0, 44100.0, 1.0);

    gate.process(&mut buffer, &NoPlayhead);
    assert_that!(buffer, IsFilled);
}

#[test]
fn test_gate_follows_playhead() {
    let parameters = parameters();
    let gate = BeatGate::new(&parameters);
    let mut playhead = PlayingPlayhead::new();
    playhead.set_tempo(60.0);

    // one beat at 60 bpm: open for 22050 samples, closed for 22050
    let mut buffer = sine_buffer::<f32>(2, 44100, 441.0, 44100.0, 1.0);
    gate.process(&mut buffer, &playhead);
    assert_that!(buffer, IsFilledUntil::new(22050));
    assert_that!(buffer, IsEmptyAfter::new(22050));

    // the second half of a beat is fully gated
    playhead.advance_position(22050);
    let mut next = sine_buffer::<f32>(2, 11025, 441.0, 44100.0, 1.0);
    gate.process(&mut next, &playhead);
    assert_that!(next, IsEmpty);
}

#[test]
fn test_stopped_transport_is_ungated() {
    let parameters = parameters();
    let gate = BeatGate::new(&parameters);
    let mut playhead = PlayingPlayhead::new();
    playhead.set_is_playing(false);

    let mut buffer = sine_buffer::<f32>(1, 44100, 441.0, 44100.0, 1.0);
    gate.process(&mut buffer, &playhead);
    assert_that!(buffer, HasRms::within(std::f64::consts::FRAC_1_SQRT_2, 0.001));
}

#[test]
fn test_bypass_applies_after_dispatch() {
    let parameters = parameters();
    let gate = BeatGate::new(&parameters);
    let mut playhead = PlayingPlayhead::new();
    playhead.advance_position(11025);

    parameters.set_value_notifying_host("bypass", 1.0).unwrap();

    // listener has not run yet, so the gate is still active
    let mut buffer = sine_buffer::<f32>(1, 11025, 441.0, 44100.0, 1.0);
    gate.process(&mut buffer, &playhead);
    assert_that!(buffer, IsEmpty);

    wait_for_parameter_change(&parameters);
    let mut buffer = sine_buffer::<f32>(1, 11025, 441.0, 44100.0, 1.0);
    gate.process(&mut buffer, &playhead);
    assert_that!(buffer, IsFilled);
}

#[test]
fn test_flush_reports_parameter_state() {
    let parameters = parameters();
    let gate = BeatGate::new(&parameters);

    parameters.set_value_notifying_host("bypass", 1.0).unwrap();
    let snapshot = flush_parameters(&parameters);

    assert_eq!(snapshot.get("bypass"), Some(&1.0));
    assert!(gate.bypassed.load(Ordering::SeqCst));
}
