//! Modulation sources for DX7 synthesis
//!
//! This module mixes the four performance controllers (mod wheel, foot
//! controller, breath controller and aftertouch) into the three modulation
//! destinations the firmware understands: pitch, amplitude and EG bias.
//! Each source has its own range and assign flags from the function
//! parameters.

use serde::{Deserialize, Serialize};

use super::dx_units::scale_depth;
use super::patch::FunctionParams;

/// Assign flag for pitch modulation
pub const ASSIGN_PITCH: u8 = 0b001;
/// Assign flag for amplitude modulation
pub const ASSIGN_AMP: u8 = 0b010;
/// Assign flag for EG bias
pub const ASSIGN_EG_BIAS: u8 = 0b100;

/// Controller feeding the modulation mixer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModSource {
    /// Modulation wheel
    ModWheel = 0,
    /// Foot controller
    Foot = 1,
    /// Breath controller
    Breath = 2,
    /// Channel aftertouch
    AfterTouch = 3,
}

impl ModSource {
    /// All sources in mixing order
    pub const ALL: [ModSource; 4] = [
        ModSource::ModWheel,
        ModSource::Foot,
        ModSource::Breath,
        ModSource::AfterTouch,
    ];
}

/// State of one modulation source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    /// Source modulates pitch
    pub pitch: bool,
    /// Source modulates amplitude
    pub amp: bool,
    /// Source biases the envelopes
    pub eg_bias: bool,
    /// Range scaled to 0-255
    pub quant_range: u8,
    /// Last raw input (0-255)
    pub raw_input: u8,
    /// Raw input scaled by the range
    pub scaled_input: u8,
}

impl SourceState {
    /// Program range and assign flags
    ///
    /// # Arguments
    /// * `range` - Front panel range (0-99)
    /// * `assign` - Destination flags, see [`ASSIGN_PITCH`], [`ASSIGN_AMP`] and [`ASSIGN_EG_BIAS`]
    pub fn load(&mut self, range: u8, assign: u8) {
        self.quant_range = scale_depth(range);
        self.pitch = assign & ASSIGN_PITCH != 0;
        self.amp = assign & ASSIGN_AMP != 0;
        self.eg_bias = assign & ASSIGN_EG_BIAS != 0;
        self.compute_scaled_input();
    }

    /// Update raw input
    pub fn input(&mut self, raw: u8) {
        self.raw_input = raw;
        self.compute_scaled_input();
    }

    fn compute_scaled_input(&mut self) {
        self.scaled_input = ((u16::from(self.raw_input) * u16::from(self.quant_range)) >> 8) as u8;
    }
}

/// Modulation mixer
///
/// Totals are recomputed whenever a range, assign or input changes, so the
/// getters are plain reads on the control-rate path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modulation {
    source: [SourceState; 4],
    eg_bias_range: u8,
    eg_bias: u8,
    amp_mod: u8,
    pitch_mod: u8,
}

impl Modulation {
    /// Create a mixer with every source unassigned
    pub fn new() -> Self {
        Self::default()
    }

    /// Program ranges and assigns from the function parameters
    pub fn load(&mut self, params: &FunctionParams) {
        self.source[ModSource::ModWheel as usize]
            .load(params.mod_wheel_range, params.mod_wheel_assign);
        self.source[ModSource::Foot as usize]
            .load(params.foot_control_range, params.foot_control_assign);
        self.source[ModSource::Breath as usize]
            .load(params.breath_control_range, params.breath_control_assign);
        self.source[ModSource::AfterTouch as usize]
            .load(params.after_touch_range, params.after_touch_assign);

        self.calc_totals();
    }

    /// Supply a raw source input (0-255)
    pub fn raw_input(&mut self, source: ModSource, value: u8) {
        self.source[source as usize].input(value);
        self.calc_totals();
    }

    /// State of one source
    pub fn source(&self, source: ModSource) -> &SourceState {
        &self.source[source as usize]
    }

    /// Total EG bias range, limited to 0xFF and inverted
    pub fn eg_bias_range(&self) -> u8 {
        self.eg_bias_range
    }

    /// Total EG bias (0-255)
    pub fn eg_bias(&self) -> u8 {
        self.eg_bias
    }

    /// Total amplitude modulation factor (0-255)
    pub fn amp_mod(&self) -> u8 {
        self.amp_mod
    }

    /// Total pitch modulation factor (0-255)
    pub fn pitch_mod(&self) -> u8 {
        self.pitch_mod
    }

    fn calc_totals(&mut self) {
        let mut eg_bias_range = 0u32;
        let mut eg_bias = 0u32;
        let mut amp_mod = 0u32;
        let mut pitch_mod = 0u32;

        for source in &self.source {
            if source.eg_bias {
                eg_bias_range += u32::from(source.quant_range);
                eg_bias += u32::from(source.scaled_input);
            }
            if source.amp {
                amp_mod += u32::from(source.scaled_input);
            }
            if source.pitch {
                pitch_mod += u32::from(source.scaled_input);
            }
        }

        self.eg_bias_range = if eg_bias_range > 0xFF {
            0x00
        } else {
            !(eg_bias_range as u8)
        };
        self.eg_bias = eg_bias.min(0xFF) as u8;
        self.amp_mod = amp_mod.min(0xFF) as u8;
        self.pitch_mod = pitch_mod.min(0xFF) as u8;
    }
}
