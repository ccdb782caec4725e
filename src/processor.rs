//! # Block Processor
//!
//! Wires the parameter engine and the delay line together and runs the
//! signal path once per host block:
//!
//! ```text
//! Input L/R ──► [Delay Line] ──► × gain (smoothed) ──► Output L/R
//!                    ▲                  ▲
//!                    │                  │
//!          delay time (per block)   gain (per sample)
//!                    └──── Parameter Engine ◄──── ParameterSource
//! ```
//!
//! Nothing here knows about nih-plug's `Buffer`; it works on two plain
//! channel slices, so the whole signal path can run in tests without a
//! host.

use nih_plug::prelude::*;

use crate::dsp::delay_line::DelayLine;
use crate::dsp::{delay_ms_to_samples, ProcessSpec};
use crate::engine::ParameterEngine;
use crate::params::ParameterSource;

/// Left and right. Only a stereo pair is processed.
const NUM_CHANNELS: usize = 2;

/// Where the processor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Nothing allocated yet.
    Uninitialized,
    /// Buffers allocated for a sample rate, playback not (re)started.
    Ready,
    /// Reset and accepting audio.
    Playing,
}

pub struct DelayProcessor {
    parameters: ParameterEngine,
    delay_line: DelayLine,

    /// Longest delay time the buffers are sized for, in milliseconds.
    max_delay_time_ms: f32,

    sample_rate: f32,
    state: ProcessorState,
}

impl DelayProcessor {
    /// A processor whose buffers will hold up to `max_delay_time_ms`.
    pub fn new(max_delay_time_ms: f32) -> Self {
        Self {
            parameters: ParameterEngine::new(),
            delay_line: DelayLine::new(),
            max_delay_time_ms,
            sample_rate: 0.0,
            state: ProcessorState::Uninitialized,
        }
    }

    /// Allocate for `spec`. Not real-time safe.
    ///
    /// Any audio or gain ramp from a previous configuration is discarded.
    /// The processor is left `Ready`; call [`reset`](Self::reset) before
    /// processing.
    pub fn prepare(&mut self, spec: &ProcessSpec, source: &impl ParameterSource) {
        nih_debug_assert_eq!(spec.num_channels, NUM_CHANNELS);

        self.sample_rate = spec.sample_rate;
        self.parameters.configure(spec.sample_rate);
        self.parameters.pull_snapshot(source);

        let max_delay_samples =
            delay_ms_to_samples(self.max_delay_time_ms, spec.sample_rate).ceil() as usize;
        self.delay_line.set_maximum_delay(max_delay_samples);
        self.delay_line.prepare(&ProcessSpec {
            num_channels: NUM_CHANNELS,
            ..*spec
        });

        nih_log!(
            "Prepared for {} Hz, {} sample blocks: max delay {} samples ({} ms)",
            spec.sample_rate,
            spec.max_block_size,
            self.delay_line.maximum_delay(),
            self.max_delay_time_ms
        );

        self.state = ProcessorState::Ready;
    }

    /// Start (or restart) playback from silence.
    ///
    /// The gain jumps to the current parameter value instead of ramping,
    /// and the delay buffers are cleared so nothing from the previous
    /// session comes back out. Does not allocate.
    pub fn reset(&mut self, source: &impl ParameterSource) {
        nih_debug_assert_ne!(self.state, ProcessorState::Uninitialized);

        self.parameters.pull_snapshot(source);
        self.parameters.reset_to_current();
        self.delay_line.reset();

        self.state = ProcessorState::Playing;
    }

    /// Playback stopped. Buffers stay allocated for the next `reset()`.
    pub fn release_resources(&mut self) {
        nih_trace!("Releasing processor resources");

        if self.state == ProcessorState::Playing {
            self.state = ProcessorState::Ready;
        }
    }

    /// Process one block in place.
    ///
    /// The order is fixed: snapshot, then delay time, then for every
    /// sample: gain, push, pop, advance, scale.
    pub fn process_block(
        &mut self,
        source: &impl ParameterSource,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        nih_debug_assert_eq!(self.state, ProcessorState::Playing);
        nih_debug_assert_eq!(left.len(), right.len());

        // 1. Latest parameter values, once per block.
        self.parameters.pull_snapshot(source);

        // 2. Delay time moves the read head once, at the block boundary.
        let delay_samples = delay_ms_to_samples(self.parameters.delay_time_ms(), self.sample_rate);
        self.delay_line.set_delay(delay_samples);

        // 3. Sample by sample.
        for (sample_l, sample_r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = self.parameters.advance();

            self.delay_line.push_sample(0, *sample_l);
            self.delay_line.push_sample(1, *sample_r);

            let wet_l = self.delay_line.pop_sample(0);
            let wet_r = self.delay_line.pop_sample(1);

            self.delay_line.advance();

            *sample_l = wet_l * gain;
            *sample_r = wet_r * gain;
        }
    }

    /// How many samples of output remain after the input goes silent.
    ///
    /// With no feedback there is exactly one echo, so the tail is one
    /// delay period (rounded up, plus the interpolation neighbour).
    pub fn tail_samples(&self) -> u32 {
        self.delay_line.delay().ceil() as u32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EffectParameters, DELAY_TIME_MAX_MS};

    const BLOCK_SIZE: usize = 512;

    fn spec(sample_rate: f32) -> ProcessSpec {
        ProcessSpec {
            sample_rate,
            max_block_size: BLOCK_SIZE,
            num_channels: 2,
        }
    }

    fn params(gain_db: f32, delay_time_ms: f32) -> EffectParameters {
        EffectParameters {
            gain_db,
            delay_time_ms,
        }
    }

    fn playing(sample_rate: f32, source: &EffectParameters) -> DelayProcessor {
        let mut processor = DelayProcessor::new(DELAY_TIME_MAX_MS);
        processor.prepare(&spec(sample_rate), source);
        processor.reset(source);
        processor
    }

    /// Run `left`/`right` through the processor in host-sized blocks.
    fn run(
        processor: &mut DelayProcessor,
        source: &EffectParameters,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        for (block_l, block_r) in left.chunks_mut(BLOCK_SIZE).zip(right.chunks_mut(BLOCK_SIZE)) {
            processor.process_block(source, block_l, block_r);
        }
    }

    #[test]
    fn test_lifecycle() {
        let source = params(0.0, 100.0);
        let mut processor = DelayProcessor::new(DELAY_TIME_MAX_MS);
        assert_eq!(processor.state, ProcessorState::Uninitialized);

        processor.prepare(&spec(48000.0), &source);
        assert_eq!(processor.state, ProcessorState::Ready);

        processor.reset(&source);
        assert_eq!(processor.state, ProcessorState::Playing);

        processor.release_resources();
        assert_eq!(processor.state, ProcessorState::Ready);

        processor.prepare(&spec(96000.0), &source);
        processor.reset(&source);
        assert_eq!(processor.state, ProcessorState::Playing);
        assert_eq!(processor.sample_rate, 96000.0);
    }

    #[test]
    fn test_buffers_sized_for_maximum_delay() {
        let processor = playing(48000.0, &params(0.0, 100.0));
        assert_eq!(processor.delay_line.maximum_delay(), 240_000);

        let processor = playing(44100.0, &params(0.0, 100.0));
        assert_eq!(processor.delay_line.maximum_delay(), 220_500);
    }

    /// 100 ms at 48 kHz: the impulse comes out at exactly tick 4800.
    #[test]
    fn test_impulse_arrives_after_delay_time() {
        let source = params(0.0, 100.0);
        let mut processor = playing(48000.0, &source);

        let mut left = vec![0.0; 9600];
        let mut right = vec![0.0; 9600];
        left[0] = 1.0;
        right[0] = 1.0;

        run(&mut processor, &source, &mut left, &mut right);
        assert_eq!(processor.delay_line.delay(), 4800.0);

        for (tick, (&l, &r)) in left.iter().zip(&right).enumerate() {
            let expected = if tick == 4800 { 1.0 } else { 0.0 };
            assert_eq!(l, expected, "Left tick {tick}");
            assert_eq!(r, expected, "Right tick {tick}");
        }
    }

    #[test]
    fn test_output_is_scaled_by_gain() {
        let source = params(-6.0, 10.0);
        let mut processor = playing(48000.0, &source);

        let mut left = vec![0.5; 2048];
        let mut right = vec![-0.25; 2048];
        run(&mut processor, &source, &mut left, &mut right);

        let gain = util::db_to_gain(-6.0);
        // 10 ms = 480 samples of silence, then the delayed constant.
        assert_eq!(left[479], 0.0);
        assert!((left[480] - 0.5 * gain).abs() < 1e-6);
        assert!((right[2047] + 0.25 * gain).abs() < 1e-6);
    }

    /// A gain change between blocks ramps in without a jump.
    #[test]
    fn test_gain_change_between_blocks_is_click_free() {
        let quiet = params(-12.0, 5.0);
        let loud = params(12.0, 5.0);
        let mut processor = playing(48000.0, &quiet);

        let mut left = vec![1.0; 1024];
        let mut right = vec![1.0; 1024];
        run(&mut processor, &quiet, &mut left, &mut right);

        let mut left = vec![1.0; 1024];
        let mut right = vec![1.0; 1024];
        run(&mut processor, &loud, &mut left, &mut right);

        let bound = (util::db_to_gain(12.0) - util::db_to_gain(-12.0)) / 960.0;
        let mut previous = util::db_to_gain(-12.0);
        for (i, &sample) in left.iter().enumerate() {
            assert!(sample >= previous, "Sample {i} moved backwards");
            assert!(sample - previous <= bound + 1e-4, "Sample {i} clicked");
            previous = sample;
        }
        assert!((left[1023] - util::db_to_gain(12.0)).abs() < 1e-6);
    }

    /// A new delay time takes effect at the next block boundary, in one step.
    #[test]
    fn test_delay_time_changes_per_block() {
        let mut processor = playing(48000.0, &params(0.0, 100.0));
        assert_eq!(processor.delay_line.delay(), 0.0, "no block processed yet");

        let mut left = vec![0.0; BLOCK_SIZE];
        let mut right = vec![0.0; BLOCK_SIZE];
        processor.process_block(&params(0.0, 100.0), &mut left, &mut right);
        assert_eq!(processor.delay_line.delay(), 4800.0);

        processor.process_block(&params(0.0, 250.0), &mut left, &mut right);
        assert_eq!(processor.delay_line.delay(), 12_000.0);
        assert_eq!(processor.tail_samples(), 12_001);
    }

    #[test]
    fn test_fractional_delay_interpolates() {
        // 5.01 ms at 44.1 kHz is 220.941 samples.
        let source = params(0.0, 5.01);
        let mut processor = playing(44100.0, &source);

        let mut left: Vec<f32> = (0..1024).map(|i| i as f32).collect();
        let mut right = left.clone();
        run(&mut processor, &source, &mut left, &mut right);

        let delay = processor.delay_line.delay();
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;
        for t in (whole + 1)..1024 {
            let newer = (t - whole) as f32;
            let older = (t - whole - 1) as f32;
            let expected = newer * (1.0 - frac) + older * frac;
            assert!(
                (left[t] - expected).abs() < 1e-2,
                "Tick {t}: expected {expected}, got {}",
                left[t]
            );
        }
    }

    /// Resetting clears old audio out of the delay line.
    #[test]
    fn test_reset_flushes_stale_audio() {
        let source = params(0.0, 5.0);
        let mut processor = playing(48000.0, &source);

        let mut left = vec![1.0; 100];
        let mut right = vec![1.0; 100];
        run(&mut processor, &source, &mut left, &mut right);

        processor.reset(&source);
        processor.reset(&source);

        let mut left = vec![0.0; 1024];
        let mut right = vec![0.0; 1024];
        run(&mut processor, &source, &mut left, &mut right);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
        assert_eq!(processor.parameters.advance(), 1.0);
    }

    #[test]
    fn test_out_of_range_delay_is_clamped() {
        let mut processor = playing(48000.0, &params(0.0, 100.0));

        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        processor.process_block(&params(0.0, 60_000.0), &mut left, &mut right);
        assert_eq!(processor.delay_line.delay(), 240_000.0);

        processor.process_block(&params(0.0, -10.0), &mut left, &mut right);
        assert_eq!(processor.delay_line.delay(), 240.0);
    }

    #[test]
    #[should_panic]
    fn test_process_before_prepare_panics() {
        let mut processor = DelayProcessor::new(DELAY_TIME_MAX_MS);
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        processor.process_block(&params(0.0, 100.0), &mut left, &mut right);
    }

    #[test]
    #[should_panic]
    fn test_process_before_reset_panics() {
        let source = params(0.0, 100.0);
        let mut processor = DelayProcessor::new(DELAY_TIME_MAX_MS);
        processor.prepare(&spec(48000.0), &source);

        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        processor.process_block(&source, &mut left, &mut right);
    }
}
