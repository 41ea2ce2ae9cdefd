//! Low Frequency Oscillator (LFO) - DX7 compatible
//!
//! The LFO is clocked by the firmware control tick (375 Hz). After key on it
//! waits out the programmed delay, fades the modulation depths in, and only
//! then starts advancing its 16-bit phase. Waveforms are produced with the
//! same integer tricks as the firmware, so the output is a signed 8-bit value.

use serde::{Deserialize, Serialize};

use super::constants::{LFO_SINE, PITCH_MOD_SENSE};
use super::dx_units::scale_depth;
use super::patch::LfoParams;

/// LFO waveform types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LfoWaveform {
    /// Triangle
    #[default]
    Triangle = 0,
    /// Falling sawtooth
    SawtoothDown = 1,
    /// Rising sawtooth
    SawtoothUp = 2,
    /// Square
    Square = 3,
    /// Sine
    Sine = 4,
    /// Random value held for each cycle
    SampleAndHold = 5,
}

impl From<u8> for LfoWaveform {
    fn from(value: u8) -> Self {
        match value {
            0 => LfoWaveform::Triangle,
            1 => LfoWaveform::SawtoothDown,
            2 => LfoWaveform::SawtoothUp,
            3 => LfoWaveform::Square,
            4 => LfoWaveform::Sine,
            5 => LfoWaveform::SampleAndHold,
            _ => LfoWaveform::Triangle,
        }
    }
}

const MAX_PHASE: i16 = i16::MAX;

/// DX7-compatible Low Frequency Oscillator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lfo {
    delay_inc: u16,
    phase_inc: u16,
    pitch_mod_depth: u8,
    amp_mod_depth: u8,
    sync: bool,
    waveform: LfoWaveform,
    pitch_mod_sense: u8,

    delay_counter: u32,
    fade_in: u16,
    phase: i16,
    rand_state: u8,
    amp_mod: u8,
    pitch_mod: u8,
    output: i8,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new()
    }
}

impl Lfo {
    /// Create a new LFO
    pub fn new() -> Self {
        Self {
            delay_inc: 0,
            phase_inc: 0,
            pitch_mod_depth: 0,
            amp_mod_depth: 0,
            sync: false,
            waveform: LfoWaveform::Triangle,
            pitch_mod_sense: 0,
            delay_counter: 0,
            fade_in: 0,
            phase: MAX_PHASE,
            rand_state: 0,
            amp_mod: 0,
            pitch_mod: 0,
            output: 0,
        }
    }

    /// Configure from the patch LFO parameters
    pub fn load(&mut self, params: &LfoParams) {
        self.delay_inc = delay_increment(params.delay);
        self.phase_inc = phase_increment(params.speed);
        self.sync = params.sync;
        self.waveform = params.waveform;
        self.amp_mod_depth = scale_depth(params.amp_mod_depth);
        self.pitch_mod_depth = scale_depth(params.pitch_mod_depth);
        self.pitch_mod_sense = PITCH_MOD_SENSE[usize::from(params.pitch_mod_sense & 0x7)];
    }

    /// Start of note
    pub fn key_on(&mut self) {
        self.delay_counter = 0;
        self.fade_in = 0;
        if self.sync {
            self.phase = MAX_PHASE;
        }
    }

    /// Control-rate step (375 Hz)
    pub fn tick(&mut self) {
        if self.delay_counter < 0xFFFF {
            self.delay_counter += u32::from(self.delay_inc);
            self.amp_mod = 0;
            self.pitch_mod = 0;
        } else if self.fade_in < 0xFF {
            // Fade in using the low byte of the delay increment
            let inc = self.delay_inc & 0xFF;
            self.fade_in = (self.fade_in + if inc == 0 { 1 } else { inc }).min(0xFF);

            self.amp_mod = ((self.fade_in * u16::from(self.amp_mod_depth)) >> 8) as u8;
            self.pitch_mod = ((self.fade_in * u16::from(self.pitch_mod_depth)) >> 8) as u8;
        } else {
            self.phase = self.phase.wrapping_add(self.phase_inc as i16);
        }

        self.output = self.waveform_output();
    }

    fn waveform_output(&mut self) -> i8 {
        let phase = self.phase;
        match self.waveform {
            LfoWaveform::Triangle => {
                let mut out = (phase >> 7) as i8;
                if phase < 0 {
                    out = !out;
                }
                out.wrapping_add(i8::MIN)
            }
            LfoWaveform::SawtoothDown => !((phase >> 8) as i8),
            LfoWaveform::SawtoothUp => (phase >> 8) as i8,
            LfoWaveform::Square => {
                if phase < 0 {
                    127
                } else {
                    -128
                }
            }
            LfoWaveform::Sine => {
                let mut index = ((phase >> 8) & 0x3F) as usize;
                if phase & 0x4000 != 0 {
                    index ^= 0x3F;
                }
                let out = LFO_SINE[index] as i8;
                if phase < 0 {
                    !out
                } else {
                    out
                }
            }
            LfoWaveform::SampleAndHold => {
                // New value once per cycle, on the tick that wraps the phase
                let since_wrap = i32::from(phase) - i32::from(i16::MIN);
                if since_wrap < i32::from(self.phase_inc) {
                    self.rand_state = self.rand_state.wrapping_mul(179).wrapping_add(11);
                }
                self.rand_state as i8
            }
        }
    }

    /// Faded-in amplitude modulation depth (0-255)
    pub fn amp_mod(&self) -> u8 {
        self.amp_mod
    }

    /// Faded-in pitch modulation depth (0-255)
    pub fn pitch_mod(&self) -> u8 {
        self.pitch_mod
    }

    /// Pitch modulation sensitivity (0-255)
    pub fn pitch_mod_sense(&self) -> u8 {
        self.pitch_mod_sense
    }

    /// Current waveform output
    pub fn output(&self) -> i8 {
        self.output
    }

    /// Current phase
    pub fn phase(&self) -> i16 {
        self.phase
    }

    /// Whether the delay and fade in have both completed
    pub fn is_faded_in(&self) -> bool {
        self.delay_counter >= 0xFFFF && self.fade_in >= 0xFF
    }
}

/// LFO delay (0-99) to delay counter increment
///
/// The inverted delay is treated as a 7-bit float, `EEEMMMM`.
pub fn delay_increment(delay: u8) -> u16 {
    let value = 99 - delay.min(99);
    let exp = 7 - (value >> 4);
    let mantissa = (0x10 | u16::from(value & 0xF)) << 9;
    mantissa >> exp
}

/// LFO speed (0-99) to phase increment per tick
pub fn phase_increment(speed: u8) -> u16 {
    if speed == 0 {
        return 11;
    }
    let scaled = u16::from(scale_depth(speed));
    if scaled < 160 {
        11 * scaled
    } else {
        (11 + (scaled - 160) / 4) * scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(waveform: LfoWaveform) -> LfoParams {
        LfoParams {
            speed: 99,
            delay: 0,
            pitch_mod_depth: 99,
            amp_mod_depth: 99,
            sync: true,
            waveform,
            pitch_mod_sense: 7,
        }
    }

    fn running(waveform: LfoWaveform, speed: u8) -> Lfo {
        let mut lfo = Lfo::new();
        let mut p = params(waveform);
        p.speed = speed;
        lfo.load(&p);
        lfo.key_on();
        while !lfo.is_faded_in() || lfo.phase() == MAX_PHASE {
            lfo.tick();
        }
        lfo
    }

    #[test]
    fn test_increments() {
        assert_eq!(phase_increment(0), 11);
        assert_eq!(phase_increment(99), 8670);
        assert_eq!(delay_increment(0), 0x1300);
        assert_eq!(delay_increment(99), 0x0040);
        for speed in 1..99 {
            assert!(phase_increment(speed + 1) >= phase_increment(speed));
        }
    }

    #[test]
    fn test_waveform_from_u8() {
        assert_eq!(LfoWaveform::from(4), LfoWaveform::Sine);
        assert_eq!(LfoWaveform::from(7), LfoWaveform::Triangle);
    }

    #[test]
    fn test_delay_then_fade_in() {
        let mut lfo = Lfo::new();
        let mut p = params(LfoWaveform::Triangle);
        p.delay = 50;
        lfo.load(&p);
        lfo.key_on();

        let mut ticks = 0;
        while lfo.amp_mod() == 0 {
            lfo.tick();
            assert_eq!(lfo.phase(), MAX_PHASE, "phase moved during delay");
            ticks += 1;
        }
        assert!(ticks > 10);

        let mut last = lfo.amp_mod();
        while !lfo.is_faded_in() {
            lfo.tick();
            assert!(lfo.amp_mod() >= last);
            last = lfo.amp_mod();
        }
        assert_eq!(lfo.amp_mod(), 0xFE);
        assert_eq!(lfo.pitch_mod(), lfo.amp_mod());
    }

    #[test]
    fn test_square_levels() {
        let mut lfo = running(LfoWaveform::Square, 99);
        for _ in 0..1000 {
            lfo.tick();
            let out = lfo.output();
            assert!(out == 127 || out == -128);
            assert_eq!(out == 127, lfo.phase() < 0);
        }
    }

    #[test]
    fn test_triangle_is_continuous() {
        let mut lfo = Lfo::new();
        let mut p = params(LfoWaveform::Triangle);
        p.speed = 10;
        lfo.load(&p);
        lfo.key_on();

        let mut last: Option<i8> = None;
        for _ in 0..5000 {
            lfo.tick();
            if !lfo.is_faded_in() {
                continue;
            }
            let out = lfo.output();
            if let Some(prev) = last {
                assert!((i32::from(out) - i32::from(prev)).abs() <= 4);
            }
            last = Some(out);
        }
    }

    #[test]
    fn test_sine_symmetry() {
        let mut lfo = running(LfoWaveform::Sine, 30);
        let mut min = i8::MAX;
        let mut max = i8::MIN;
        for _ in 0..1000 {
            lfo.tick();
            min = min.min(lfo.output());
            max = max.max(lfo.output());
        }
        assert_eq!(max, 0x7F);
        assert_eq!(min, !0x7F);
    }

    #[test]
    fn test_sample_and_hold_changes_per_cycle() {
        let mut lfo = running(LfoWaveform::SampleAndHold, 99);
        let mut changes = 0;
        let mut last = lfo.output();
        let ticks = 10 * 65536 / 8670;
        for _ in 0..ticks {
            lfo.tick();
            if lfo.output() != last {
                changes += 1;
                last = lfo.output();
            }
        }
        assert!((8..=11).contains(&changes), "changes {}", changes);
    }

    #[test]
    fn test_sync_resets_phase() {
        let mut lfo = running(LfoWaveform::SawtoothUp, 99);
        assert_ne!(lfo.phase(), MAX_PHASE);
        lfo.key_on();
        assert_eq!(lfo.phase(), MAX_PHASE);
    }
}
