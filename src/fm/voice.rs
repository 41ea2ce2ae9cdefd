// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
// Copyright 2021 Emilie Gillet (emilie.o.gillet@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//
// See http://creativecommons.org/licenses/MIT/ for more information.

//! Single voice wrapper
//!
//! Couples one [`Firmware`] instance with the bookkeeping a voice allocator
//! needs: the held note, its age, and whether the voice is still audible.

use log::trace;

use super::firmware::Firmware;
use super::patch::{FunctionParams, Patch};

/// MIDI controller numbers routed to the modulation mixer
pub const CC_MOD_WHEEL: u8 = 1;
/// Breath controller
pub const CC_BREATH: u8 = 2;
/// Foot controller
pub const CC_FOOT: u8 = 4;
/// Sustain pedal, accepted and ignored
pub const CC_SUSTAIN: u8 = 64;
/// Portamento switch, accepted and ignored
pub const CC_PORTAMENTO: u8 = 65;

/// Allocation state of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    /// Silent, free for allocation
    #[default]
    Mute,
    /// Gate on
    On,
    /// Gate off, release still sounding
    Off,
}

/// One DX7 voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    fw: Firmware,
    state: VoiceState,
    note: u8,
    velocity: u8,
    order: u32,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

/// Widen a 7-bit MIDI value to the 8-bit range the controller inputs use
fn midi_to_raw(value: u8) -> u8 {
    let value = value & 0x7F;
    (value << 1) | (value >> 6)
}

impl Voice {
    /// Create a muted voice holding the init voice
    pub fn new() -> Self {
        Self {
            fw: Firmware::new(),
            state: VoiceState::Mute,
            note: 0,
            velocity: 0,
            order: 0,
        }
    }

    /// Load a patch
    pub fn program(&mut self, patch: &Patch) {
        self.fw.load_voice(patch);
    }

    /// Load function parameters
    pub fn load_params(&mut self, params: &FunctionParams) {
        self.fw.load_params(params);
    }

    /// Start a note. `order` is the allocator's event counter.
    pub fn gate_on(&mut self, note: u8, velocity: u8, order: u32) {
        self.note = note & 0x7F;
        self.velocity = velocity & 0x7F;
        self.order = order;
        self.state = VoiceState::On;
        self.fw.voice_add(self.note, self.velocity);
    }

    /// Release the held note
    pub fn gate_off(&mut self, order: u32) {
        if self.state == VoiceState::On {
            self.order = order;
            self.state = VoiceState::Off;
            self.fw.voice_remove();
        }
    }

    /// Stop tracking the voice. Its envelopes are sent to release.
    pub fn mute(&mut self) {
        if self.state == VoiceState::On {
            self.fw.voice_remove();
        }
        self.state = VoiceState::Mute;
    }

    /// Route a MIDI control change. Unknown controllers are ignored.
    pub fn set_controller(&mut self, cc: u8, value: u8) {
        let raw = midi_to_raw(value);
        match cc {
            CC_MOD_WHEEL => self.fw.set_mod_wheel(raw),
            CC_BREATH => self.fw.set_breath_control(raw),
            CC_FOOT => self.fw.set_foot_control(raw),
            CC_SUSTAIN | CC_PORTAMENTO => {}
            _ => trace!("ignoring controller {} = {}", cc, value),
        }
    }

    /// Signed pitch bend, -0x2000..0x1FFF with 0 at the centre
    pub fn set_pitch_bend(&mut self, value: i16) {
        self.fw.set_pitch_bend(value.clamp(-0x2000, 0x1FFF));
    }

    /// Channel aftertouch, 7-bit
    pub fn set_after_touch(&mut self, value: u8) {
        self.fw.set_after_touch(midi_to_raw(value));
    }

    /// Compute one output sample at the OPS rate
    pub fn sample(&mut self) -> i32 {
        self.fw.hw_mut().sample()
    }

    /// Control-rate tick. A released voice whose envelopes have all
    /// finished becomes muted.
    pub fn tick(&mut self) {
        if self.state == VoiceState::Off && self.fw.hw().is_complete() {
            self.state = VoiceState::Mute;
        }
        self.fw.tick();
    }

    /// Allocation state
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Last note played
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Last note velocity
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Event counter value of the last gate change
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Underlying firmware model
    pub fn firmware(&self) -> &Firmware {
        &self.fw
    }
}
