//! Fixed-size voice pool
//!
//! Sums the outputs of `N` independent voices. Allocation prefers a muted
//! voice, then the oldest released voice, then steals the oldest held one.

use log::debug;

use crate::fm::patch::{FunctionParams, Patch};
use crate::fm::voice::{Voice, VoiceState};

/// DX7 synthesizer with `N` voices
#[derive(Debug, Clone)]
pub struct Synth<const N: usize> {
    voices: [Voice; N],
    order: u32,
}

impl<const N: usize> Default for Synth<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Synth<N> {
    /// Create a pool of muted voices holding the init voice
    pub fn new() -> Self {
        Self {
            voices: std::array::from_fn(|_| Voice::new()),
            order: 0,
        }
    }

    /// Load a patch into every voice
    pub fn program(&mut self, patch: &Patch) {
        debug!("program {} voices with {:?}", N, patch.name());
        for voice in self.voices.iter_mut() {
            voice.program(patch);
        }
    }

    /// Load a patch into one voice. Out of range indices are ignored.
    pub fn program_voice(&mut self, index: usize, patch: &Patch) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.program(patch);
        }
    }

    /// Load function parameters into every voice
    pub fn load_params(&mut self, params: &FunctionParams) {
        for voice in self.voices.iter_mut() {
            voice.load_params(params);
        }
    }

    /// Allocate a voice and start a note. Returns the voice index.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> usize {
        let index = self.allocate();
        self.gate_on(index, note, velocity);
        index
    }

    /// Release the held voice playing `note`, if any
    pub fn note_off(&mut self, note: u8) -> Option<usize> {
        let index = self
            .voices
            .iter()
            .position(|v| v.state() == VoiceState::On && v.note() == note & 0x7F)?;
        self.gate_off(index);
        Some(index)
    }

    /// Start a note on a specific voice
    pub fn gate_on(&mut self, index: usize, note: u8, velocity: u8) {
        let order = self.next_order();
        if let Some(voice) = self.voices.get_mut(index) {
            debug!("voice {} gate on: note {} velocity {}", index, note, velocity);
            voice.gate_on(note, velocity, order);
        }
    }

    /// Release a specific voice
    pub fn gate_off(&mut self, index: usize) {
        let order = self.next_order();
        if let Some(voice) = self.voices.get_mut(index) {
            debug!("voice {} gate off", index);
            voice.gate_off(order);
        }
    }

    /// MIDI control change on one voice
    pub fn set_controller(&mut self, index: usize, cc: u8, value: u8) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.set_controller(cc, value);
        }
    }

    /// Signed pitch bend (-0x2000..0x1FFF) on one voice
    pub fn set_pitch_bend(&mut self, index: usize, value: i16) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.set_pitch_bend(value);
        }
    }

    /// Channel aftertouch on one voice
    pub fn set_after_touch(&mut self, index: usize, value: u8) {
        if let Some(voice) = self.voices.get_mut(index) {
            voice.set_after_touch(value);
        }
    }

    /// Next output sample: the sum of all sounding voices divided by `N`
    pub fn sample(&mut self) -> i32 {
        let sum: i32 = self
            .voices
            .iter_mut()
            .filter(|v| v.state() != VoiceState::Mute)
            .map(|v| v.sample())
            .sum();
        sum / N.max(1) as i32
    }

    /// Control-rate tick for all sounding voices
    pub fn tick(&mut self) {
        for voice in self.voices.iter_mut() {
            if voice.state() != VoiceState::Mute {
                voice.tick();
            }
        }
    }

    /// Voice by index
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Number of voices not muted
    pub fn active_voices(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.state() != VoiceState::Mute)
            .count()
    }

    fn next_order(&mut self) -> u32 {
        self.order = self.order.wrapping_add(1);
        self.order
    }

    fn allocate(&self) -> usize {
        if let Some(index) = self.voices.iter().position(|v| v.state() == VoiceState::Mute) {
            return index;
        }

        let oldest = |state: VoiceState| {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state() == state)
                .min_by_key(|(_, v)| v.order())
                .map(|(i, _)| i)
        };

        oldest(VoiceState::Off)
            .or_else(|| oldest(VoiceState::On))
            .unwrap_or(0)
    }
}
