//! # Plugin Parameters
//!
//! The two knobs the user sees in the DAW:
//!
//! - **Output Gain**, −12 to +12 dB, applied after the delay.
//! - **Delay Time**, 5 ms to 5 s.
//!
//! The `#[id = "..."]` strings are what the host stores in projects and
//! presets. Never change them once released, or saved sessions lose
//! their settings.
//!
//! ## Reading parameters from the audio thread
//!
//! nih-plug stores every parameter value atomically. The UI thread and
//! host automation write to it, and the audio thread reads it once per
//! block through [`ParameterSource::snapshot`]. The read never blocks and
//! can never observe half a write.
//!
//! The audio path never touches `FloatParam` directly. It works on an
//! [`EffectParameters`] snapshot: two plain `f32`s, clamped to their
//! declared ranges, that stay fixed for the whole block.

use std::sync::Arc;

use nih_plug::prelude::*;

pub const GAIN_MIN_DB: f32 = -12.0;
pub const GAIN_MAX_DB: f32 = 12.0;
pub const GAIN_DEFAULT_DB: f32 = 0.0;

pub const DELAY_TIME_MIN_MS: f32 = 5.0;
pub const DELAY_TIME_MAX_MS: f32 = 5000.0;
pub const DELAY_TIME_DEFAULT_MS: f32 = 100.0;

/// Skew of the delay time slider. Below 1.0 gives more travel to short
/// delays: with 0.25, the first half of the slider covers 5 ms to ~317 ms.
const DELAY_TIME_SKEW: f32 = 0.25;

/// All user-facing parameters for Deeelay.
///
/// `#[derive(Params)]` registers them with the host and handles
/// saving/restoring them with the project.
#[derive(Params)]
pub struct DeeelayParams {
    /// **Output Gain**, in decibels. Smoothed by the processor, not here:
    /// see `ParameterEngine`.
    #[id = "gain"]
    pub gain: FloatParam,

    /// **Delay Time**, in milliseconds. Deliberately unsmoothed; a new value
    /// moves the read head at the start of the next block.
    #[id = "delayTime"]
    pub delay_time: FloatParam,
}

impl Default for DeeelayParams {
    fn default() -> Self {
        Self {
            gain: FloatParam::new(
                "Output Gain",
                GAIN_DEFAULT_DB,
                FloatRange::Linear {
                    min: GAIN_MIN_DB,
                    max: GAIN_MAX_DB,
                },
            )
            .with_unit(" dB")
            .with_value_to_string(formatters::v2s_f32_rounded(1)),

            delay_time: FloatParam::new(
                "Delay Time",
                DELAY_TIME_DEFAULT_MS,
                FloatRange::Skewed {
                    min: DELAY_TIME_MIN_MS,
                    max: DELAY_TIME_MAX_MS,
                    factor: DELAY_TIME_SKEW,
                },
            )
            .with_step_size(0.001)
            .with_value_to_string(v2s_delay_time())
            .with_string_to_value(s2v_delay_time()),
        }
    }
}

/// The block-local copy of the parameters the audio path works on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParameters {
    pub gain_db: f32,
    pub delay_time_ms: f32,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            gain_db: GAIN_DEFAULT_DB,
            delay_time_ms: DELAY_TIME_DEFAULT_MS,
        }
    }
}

impl EffectParameters {
    /// Clamp both values into their declared ranges.
    ///
    /// NaN falls back to the parameter's default.
    pub fn clamped(self) -> Self {
        Self {
            gain_db: clamp_or(self.gain_db, GAIN_MIN_DB, GAIN_MAX_DB, GAIN_DEFAULT_DB),
            delay_time_ms: clamp_or(
                self.delay_time_ms,
                DELAY_TIME_MIN_MS,
                DELAY_TIME_MAX_MS,
                DELAY_TIME_DEFAULT_MS,
            ),
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Anything the processor can read a parameter snapshot from.
///
/// Called once at the start of every block on the audio thread, so
/// implementations must not lock, block or allocate.
pub trait ParameterSource {
    fn snapshot(&self) -> EffectParameters;
}

impl ParameterSource for DeeelayParams {
    fn snapshot(&self) -> EffectParameters {
        EffectParameters {
            gain_db: self.gain.value(),
            delay_time_ms: self.delay_time.value(),
        }
    }
}

/// Fixed values, for driving the processor without a host.
impl ParameterSource for EffectParameters {
    fn snapshot(&self) -> EffectParameters {
        *self
    }
}

/// Format a delay time the way it reads best at each scale:
///
/// | value       | shown as  |
/// |-------------|-----------|
/// | 7.256       | `7.26 ms` |
/// | 42.57       | `42.6 ms` |
/// | 350.9       | `350 ms`  |
/// | 1234.0      | `1.23 s`  |
pub fn v2s_delay_time() -> Arc<dyn Fn(f32) -> String + Send + Sync> {
    Arc::new(|value| {
        if value < 10.0 {
            format!("{value:.2} ms")
        } else if value < 100.0 {
            format!("{value:.1} ms")
        } else if value < 1000.0 {
            format!("{} ms", value as i32)
        } else {
            format!("{:.2} s", value * 0.001)
        }
    })
}

/// Parse typed-in delay times. A bare number or an `ms` suffix means
/// milliseconds, an `s` suffix means seconds.
pub fn s2v_delay_time() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    Arc::new(|string| {
        let string = string.trim().to_ascii_lowercase();

        if let Some(ms) = string.strip_suffix("ms") {
            ms.trim().parse().ok()
        } else if let Some(seconds) = string.strip_suffix('s') {
            seconds.trim().parse::<f32>().ok().map(|s| s * 1000.0)
        } else {
            string.parse().ok()
        }
    })
}
