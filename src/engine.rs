//! # Parameter Engine
//!
//! Turns the block-rate parameter snapshot into the control values the
//! audio loop needs:
//!
//! - **gain**: converted from dB to a linear multiplier and smoothed
//!   sample by sample over 20 ms, so knob moves never click.
//! - **delay time**: passed through in milliseconds, unsmoothed. A new
//!   delay time takes effect at the next block boundary. Gliding the
//!   read head would pitch-shift the echoes, which is a different effect.
//!
//! Call order is `configure()` → `pull_snapshot()` → `advance()` per
//! sample. Breaking it is a programming error, reported by debug
//! assertions and otherwise left alone.

use nih_plug::prelude::*;

use crate::dsp::smoother::LinearSmoother;
use crate::params::ParameterSource;

/// How long a gain change takes to ramp in, in milliseconds.
pub const GAIN_RAMP_MS: f32 = 20.0;

pub struct ParameterEngine {
    gain: LinearSmoother,

    /// Delay time from the last snapshot, in milliseconds.
    delay_time_ms: f32,

    configured: bool,
    has_snapshot: bool,
}

impl ParameterEngine {
    pub fn new() -> Self {
        Self {
            gain: LinearSmoother::new(GAIN_RAMP_MS),
            delay_time_ms: 0.0,
            configured: false,
            has_snapshot: false,
        }
    }

    /// Size the gain ramp for `sample_rate`.
    ///
    /// Safe to call again when the sample rate changes: a ramp in progress
    /// is dropped and the gain settles on its target.
    pub fn configure(&mut self, sample_rate: f32) {
        nih_debug_assert!(sample_rate > 0.0);

        self.gain.reset(sample_rate);
        self.configured = true;

        nih_trace!(
            "Gain ramp is {} samples at {} Hz",
            self.gain.ramp_samples(),
            sample_rate
        );
    }

    /// Read the latest parameter values from `source`.
    ///
    /// Values are clamped to their declared ranges first. The gain
    /// becomes the smoother's new target (`10^(dB/20)`); the delay time
    /// is stored as is.
    pub fn pull_snapshot(&mut self, source: &impl ParameterSource) {
        let snapshot = source.snapshot().clamped();

        self.gain.set_target(util::db_to_gain(snapshot.gain_db));
        self.delay_time_ms = snapshot.delay_time_ms;
        self.has_snapshot = true;
    }

    /// Jump the gain straight to its target and forget the delay time.
    ///
    /// Used when playback (re)starts, so the first block doesn't fade in
    /// from whatever the gain was when playback last stopped.
    pub fn reset_to_current(&mut self) {
        self.gain.set_current_and_target(self.gain.target());
        self.delay_time_ms = 0.0;
    }

    /// Advance the gain smoother by one sample and return the new gain.
    ///
    /// Call exactly once per output sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        nih_debug_assert!(self.configured && self.has_snapshot);

        self.gain.next()
    }

    /// Delay time from the last snapshot, in milliseconds.
    pub fn delay_time_ms(&self) -> f32 {
        nih_debug_assert!(self.has_snapshot);

        self.delay_time_ms
    }
}
