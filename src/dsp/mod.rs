//! # DSP (Digital Signal Processing) Primitives
//!
//! The building blocks of the delay:
//!
//! - **`delay_line`**: a multichannel ring buffer that hands samples back
//!   after a (possibly fractional) number of samples.
//!
//! - **`smoother`**: a linear ramp that turns block-rate parameter jumps
//!   into click-free per-sample values.

pub mod delay_line;
pub mod smoother;

/// The audio configuration a processor is prepared for.
///
/// Built from the host's `BufferConfig` and `AudioIOLayout` in
/// `initialize()`. Anything that allocates is sized from this.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    /// Sample rate in Hz.
    pub sample_rate: f32,

    /// The largest block the host will ever pass to `process()`.
    pub max_block_size: usize,

    pub num_channels: usize,
}

impl ProcessSpec {
    /// Whether buffers can be sized from this configuration. NaN and
    /// infinite sample rates are rejected along with zero and negative
    /// ones.
    pub fn is_valid(&self) -> bool {
        self.sample_rate.is_finite() && self.sample_rate > 0.0 && self.num_channels > 0
    }
}

/// Convert a delay time in milliseconds to a (fractional) sample count.
///
/// ```text
/// delay_samples = delay_ms * sample_rate / 1000
/// ```
///
/// Multiplying before dividing keeps round values exact: 100 ms at
/// 48 kHz is exactly 4800.0, not 4800.0001.
#[inline]
pub const fn delay_ms_to_samples(delay_ms: f32, sample_rate: f32) -> f32 {
    delay_ms * sample_rate / 1000.0
}
