//! # Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and hands them back a fixed number of
//! samples later. Picture a tape loop with a write head and a read head:
//! the gap between the heads is the delay time.
//!
//! In code the tape is a `Vec<f32>` per channel and the write head is an
//! index shared by every channel. Each tick:
//!
//! 1. [`push_sample`](DelayLine::push_sample) stores the input of each
//!    channel at `write_pos`.
//! 2. [`pop_sample`](DelayLine::pop_sample) reads each channel at
//!    `write_pos - delay`, wrapping around the start of the buffer.
//! 3. [`advance`](DelayLine::advance) moves `write_pos` on by one slot.
//!
//! Because the write happens before the read, a delay of zero hands back
//! the sample pushed in the same tick: the line is a straight wire.
//!
//! ## Linear Interpolation
//!
//! Delay times in milliseconds rarely land on whole samples (7.3 ms at
//! 44.1 kHz is 321.93 samples). For a delay of `d + f` the two
//! neighbouring slots are blended:
//!
//! ```text
//! result = s[t - d] * (1 - f) + s[t - d - 1] * f
//! ```
//!
//! The integer and fractional parts are split once in
//! [`set_delay`](DelayLine::set_delay), not once per sample.

use nih_plug::prelude::*;

use super::ProcessSpec;

/// Extra slots beyond the maximum delay. Interpolation reads one sample
/// past the integer delay, and the slot at `write_pos` always holds the
/// sample being written this tick.
const INTERPOLATION_MARGIN: usize = 2;

/// A multichannel ring buffer with one write cursor for all channels.
///
/// Memory is only allocated in [`prepare`](Self::prepare). Everything
/// called from the audio thread works on the existing buffers.
pub struct DelayLine {
    /// One buffer per channel, all of the same length.
    buffers: Vec<Vec<f32>>,

    /// Where the current tick's samples are written. Shared by every
    /// channel so the channels stay phase-locked.
    write_pos: usize,

    /// Length of each channel buffer. Zero before `prepare()`.
    buffer_len: usize,

    /// Largest delay `set_delay()` accepts, in samples.
    maximum_delay: usize,

    /// The delay as last set (after clamping).
    delay: f32,
    delay_int: usize,
    delay_frac: f32,
}

impl DelayLine {
    /// An empty delay line. Call [`set_maximum_delay`](Self::set_maximum_delay)
    /// and [`prepare`](Self::prepare) before pushing any audio.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            write_pos: 0,
            buffer_len: 0,
            maximum_delay: 0,
            delay: 0.0,
            delay_int: 0,
            delay_frac: 0.0,
        }
    }

    /// Set the largest delay, in samples, the buffers must be able to hold.
    ///
    /// Only takes effect on the next [`prepare`](Self::prepare).
    pub fn set_maximum_delay(&mut self, samples: usize) {
        self.maximum_delay = samples;
    }

    /// Allocate one zeroed buffer per channel, sized for the maximum delay.
    ///
    /// This allocates, so it must never be called from `process()`.
    pub fn prepare(&mut self, spec: &ProcessSpec) {
        nih_debug_assert!(spec.num_channels > 0);

        self.buffer_len = self.maximum_delay + INTERPOLATION_MARGIN;
        self.buffers = (0..spec.num_channels)
            .map(|_| vec![0.0; self.buffer_len])
            .collect();
        self.write_pos = 0;

        // The previous delay may not fit the new maximum.
        self.set_delay(self.delay);
    }

    /// Set the read offset, in samples, for every channel.
    ///
    /// Values outside `[0, maximum_delay]` are clamped, so the read never
    /// leaves the allocated buffer whatever the caller passes in.
    pub fn set_delay(&mut self, samples: f32) {
        // NaN would otherwise survive the clamp.
        let samples = if samples.is_nan() { 0.0 } else { samples };
        let clamped = samples.clamp(0.0, self.maximum_delay as f32);

        self.delay = clamped;
        self.delay_int = clamped as usize;
        self.delay_frac = clamped - self.delay_int as f32;
    }

    /// Write `value` into `channel` at the current write position.
    ///
    /// Does not move the write position; see [`advance`](Self::advance).
    #[inline]
    pub fn push_sample(&mut self, channel: usize, value: f32) {
        let write_pos = self.write_pos;
        let Some(buffer) = self.buffers.get_mut(channel) else {
            nih_debug_assert_failure!("no delay buffer for channel {}", channel);
            return;
        };

        buffer[write_pos] = value;
    }

    /// Read `channel` at `write_pos - delay`, interpolating fractional delays.
    ///
    /// The index math adds `buffer_len` before subtracting so the `usize`
    /// never goes negative:
    ///
    /// ```text
    /// index_a = (write_pos + buffer_len - delay_int) % buffer_len
    /// index_b = one slot older than index_a
    /// ```
    #[inline]
    pub fn pop_sample(&self, channel: usize) -> f32 {
        let Some(buffer) = self.buffers.get(channel) else {
            nih_debug_assert_failure!("no delay buffer for channel {}", channel);
            return 0.0;
        };

        let len = self.buffer_len;
        let index_a = (self.write_pos + len - self.delay_int) % len;
        let sample_a = buffer[index_a];

        if self.delay_frac == 0.0 {
            return sample_a;
        }

        let index_b = (index_a + len - 1) % len;
        let sample_b = buffer[index_b];

        sample_a * (1.0 - self.delay_frac) + sample_b * self.delay_frac
    }

    /// Move the shared write position on by one slot.
    ///
    /// Call once per tick, after every channel has been pushed and popped.
    #[inline]
    pub fn advance(&mut self) {
        if self.buffer_len == 0 {
            return;
        }
        self.write_pos = (self.write_pos + 1) % self.buffer_len;
    }

    /// Silence every buffer and rewind the write position.
    ///
    /// Keeps the allocation, so this is safe to call from `reset()`.
    pub fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.write_pos = 0;
    }

    /// The current delay in samples, after clamping.
    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn maximum_delay(&self) -> usize {
        self.maximum_delay
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
