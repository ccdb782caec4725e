//! # Deeelay: An AU/VST3/CLAP Delay Plugin
//!
//! A single-effect delay with an output gain stage, built with
//! [nih-plug](https://github.com/robbert-vdh/nih-plug). One codebase
//! produces Audio Unit (AUv2), VST3 and CLAP builds.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──► [Ring Buffer / Delay Line] ──► × Output Gain ──► Output
//!            (returns the input after       (smoothed over
//!             Delay Time ms)                 20 ms per change)
//! ```
//!
//! There is no dry path and no feedback: what comes out is the input,
//! delayed once and scaled.
//!
//! ## Layout
//!
//! - `params`: the knobs, their ranges and display formatting.
//! - `engine`: turns knob values into per-sample control values.
//! - `dsp`: the delay line and the gain smoother.
//! - `processor`: runs the signal path over one block.
//!
//! This file only adapts the host's lifecycle calls onto
//! `DelayProcessor`.

mod dsp;
mod engine;
mod params;
mod processor;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::ProcessSpec;
use nih_plug::prelude::*;
use params::{DeeelayParams, DELAY_TIME_MAX_MS};
use processor::DelayProcessor;

/// The main plugin struct.
///
/// Parameters (`DeeelayParams`) are shared with the host through an `Arc`
/// and may be touched from any thread. The processor, with its delay
/// buffers, belongs to the audio thread alone and is only used from
/// `initialize()`, `reset()`, `process()` and `deactivate()`.
struct Deeelay {
    params: Arc<DeeelayParams>,
    processor: DelayProcessor,
}

impl Default for Deeelay {
    fn default() -> Self {
        Self {
            params: Arc::new(DeeelayParams::default()),
            // Buffers are sized for the Delay Time knob's full range, but
            // not allocated until initialize() knows the sample rate.
            processor: DelayProcessor::new(DELAY_TIME_MAX_MS),
        }
    }
}

impl Plugin for Deeelay {
    const NAME: &'static str = "Deeelay";
    const VENDOR: &'static str = "Quiet Dimensions";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo in, stereo out, nothing else. The processor runs a fixed
    // left/right pair.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per block, so there is nothing to gain
    // from having the host split blocks at automation points.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is loaded or the audio configuration
    /// changes. The only place the delay buffers are allocated.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let spec = ProcessSpec {
            sample_rate: buffer_config.sample_rate,
            max_block_size: buffer_config.max_buffer_size as usize,
            num_channels: audio_io_layout
                .main_input_channels
                .map(|c| c.get() as usize)
                .unwrap_or(2),
        };

        if !spec.is_valid() {
            nih_error!(
                "Refusing to initialize at a sample rate of {} Hz with {} channels",
                spec.sample_rate,
                spec.num_channels
            );
            return false;
        }

        self.processor.prepare(&spec, self.params.as_ref());

        // nih-plug calls reset() next, which starts playback.
        true
    }

    /// Called when playback starts or the transport jumps. Clears the
    /// delay buffers so no old audio comes back out.
    fn reset(&mut self) {
        self.processor.reset(self.params.as_ref());
    }

    fn deactivate(&mut self) {
        self.processor.release_resources();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let [left, right] = buffer.as_slice() else {
            nih_debug_assert_failure!("expected a stereo buffer");
            return ProcessStatus::Normal;
        };

        self.processor
            .process_block(self.params.as_ref(), &mut left[..], &mut right[..]);

        // Keep being called after the input stops, until the last echo
        // has played out.
        ProcessStatus::Tail(self.processor.tail_samples())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for Deeelay {
    const CLAP_ID: &'static str = "com.quiet-dimensions.deeelay";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("A delay with a smoothed output gain");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for Deeelay {
    // 16 ASCII bytes, unique to this plugin.
    const VST3_CLASS_ID: [u8; 16] = *b"QtDimsDeeelay001";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// These generate the C entry points hosts look for: `clap_entry` for
// CLAP, `GetPluginFactory` for VST3, and `GetPluginFactoryAUV2` (via
// clap-wrapper) so Logic Pro can load the CLAP build as an Audio Unit.

nih_export_clap!(Deeelay);
nih_export_vst3!(Deeelay);

clap_wrapper::export_auv2!();
