//! # Linear Parameter Smoother
//!
//! When the user moves the gain knob, the host hands us the new value at
//! the start of the next block. Multiplying the audio by that value
//! straight away would put a step into the waveform, which is heard as a
//! click. Instead the smoother walks from the old value to the new one in
//! equal increments over a fixed ramp time:
//!
//! ```text
//! step = (target - current) / ramp_samples
//! ```
//!
//! At 48 kHz a 20 ms ramp is 960 samples, so a jump from 0 dB to +12 dB
//! (linear 1.0 → 3.98) becomes 960 steps of roughly 0.0031 each.
//!
//! The last step snaps exactly onto the target, so a settled smoother
//! returns the target bit-for-bit instead of drifting around it.

/// A value that ramps linearly toward its target over a fixed duration.
#[derive(Debug, Clone)]
pub struct LinearSmoother {
    /// Ramp duration in milliseconds. Fixed at construction.
    ramp_ms: f32,

    /// Ramp duration converted to samples at the configured sample rate.
    /// Zero until [`reset`](Self::reset) has been called with a sample rate,
    /// in which case every target change is applied instantly.
    ramp_samples: u32,

    current: f32,
    target: f32,

    /// Increment added per sample while ramping.
    step: f32,

    /// Samples left before `current` lands on `target`.
    steps_remaining: u32,
}

impl LinearSmoother {
    /// Create a smoother with the given ramp time. Both values start at 0.0.
    pub fn new(ramp_ms: f32) -> Self {
        Self {
            ramp_ms,
            ramp_samples: 0,
            current: 0.0,
            target: 0.0,
            step: 0.0,
            steps_remaining: 0,
        }
    }

    /// Recompute the ramp length for `sample_rate`.
    ///
    /// Any ramp in flight is dropped and the smoother settles on its
    /// current target, since step sizes computed for the old rate would
    /// no longer take 20 ms to finish.
    pub fn reset(&mut self, sample_rate: f32) {
        self.ramp_samples = (self.ramp_ms * sample_rate / 1000.0).round().max(0.0) as u32;
        self.set_current_and_target(self.target);
    }

    /// Start a ramp from the current value toward `target`.
    ///
    /// Setting the target it is already heading to is a no-op, so this
    /// can be called every block without restarting an unfinished ramp.
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }

        self.target = target;

        if self.ramp_samples == 0 {
            self.set_current_and_target(target);
            return;
        }

        self.steps_remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.ramp_samples as f32;
    }

    /// Jump straight to `value` with no ramp.
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.steps_remaining = 0;
    }

    /// Advance by one sample and return the new value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if !self.is_smoothing() {
            return self.target;
        }

        self.steps_remaining -= 1;
        self.current += self.step;

        // Accumulated rounding must never carry the value past the target.
        let overshot = (self.step > 0.0 && self.current > self.target)
            || (self.step < 0.0 && self.current < self.target);
        if self.steps_remaining == 0 || overshot {
            self.current = self.target;
            self.steps_remaining = 0;
        }

        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether a ramp is still in progress.
    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.steps_remaining > 0
    }

    /// Ramp length in samples at the configured sample rate.
    #[inline]
    pub fn ramp_samples(&self) -> u32 {
        self.ramp_samples
    }
}
