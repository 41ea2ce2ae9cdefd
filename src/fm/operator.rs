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

//! Operator engine (OPS)
//!
//! Model of the phase and waveform generation of the YM21280. Each operator
//! has a 32-bit phase accumulator and an envelope generator; the engine owns
//! the modulation, memory and feedback registers that the algorithm ROM
//! steers between operator evaluations.
//!
//! Samples are computed in the log domain: the phase indexes a log-sine ROM,
//! envelope attenuation and carrier compensation are added, and a single exp
//! lookup converts back to a signed linear value.

use super::algorithms::{routes, ModSelect, OpRoute};
use super::envelope::EnvelopeGenerator;
use super::tables::{exp_14, exp_32, log_sine_14, LOG_14_MAX};
use crate::{NUM_ALGORITHMS, NUM_OPERATORS};

/// Per-operator state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpState<E> {
    /// Envelope generator feeding this operator's attenuation
    pub eg: E,
    phase_acc_32: u32,
    phase_inc_32: u32,
}

impl<E> OpState<E> {
    #[inline]
    fn step_phase(&mut self) -> u32 {
        self.phase_acc_32 = self.phase_acc_32.wrapping_add(self.phase_inc_32);
        self.phase_acc_32
    }
}

/// Generic engine of `N` operators sharing one set of routing registers
///
/// Operators are addressed by internal index `0..N`, which is the order of
/// evaluation and of the SysEx encoding. Documented operator number `n`
/// lives at index `N - n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ops<const N: usize, E> {
    state: [OpState<E>; N],
    sync: bool,
    fdbk: u32,
    algorithm: usize,
    modulation_12: i32,
    feedback1_15: i32,
    feedback2_15: i32,
    memory_15: i32,
}

impl<const N: usize, E: EnvelopeGenerator + Default> Default for Ops<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, E: EnvelopeGenerator + Default> Ops<N, E> {
    /// Creates an engine with oscillator sync on and no feedback
    pub fn new() -> Self {
        Self {
            state: std::array::from_fn(|_| OpState::default()),
            sync: true,
            fdbk: Self::fdbk_shift(0),
            algorithm: 0,
            modulation_12: 0,
            feedback1_15: 0,
            feedback2_15: 0,
            memory_15: 0,
        }
    }
}

impl<const N: usize, E: EnvelopeGenerator> Ops<N, E> {
    #[inline]
    fn fdbk_shift(feedback: u8) -> u32 {
        (7 - u32::from(feedback & 0x7)) + 4
    }

    /// Envelope generator of the operator at `op_index`
    pub fn eg(&self, op_index: usize) -> &E {
        &self.state[op_index].eg
    }

    /// Mutable envelope generator of the operator at `op_index`
    pub fn eg_mut(&mut self, op_index: usize) -> &mut E {
        &mut self.state[op_index].eg
    }

    /// Iterates all envelope generators in evaluation order
    pub fn egs(&self) -> impl Iterator<Item = &E> {
        self.state.iter().map(|s| &s.eg)
    }

    /// Set the oscillator sync mode
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
    }

    /// Set the algorithm feedback level (0-7)
    pub fn set_feedback(&mut self, feedback: u8) {
        self.fdbk = Self::fdbk_shift(feedback);
    }

    /// Select an algorithm (0-31); other values leave the selection unchanged
    pub fn set_algorithm(&mut self, algorithm: u8) {
        let algorithm = usize::from(algorithm);
        if algorithm < NUM_ALGORITHMS {
            self.algorithm = algorithm;
        }
    }

    /// Currently selected algorithm (0-31)
    pub fn algorithm(&self) -> usize {
        self.algorithm
    }

    /// Set operator frequency from a 14-bit log frequency
    pub fn set_freq(&mut self, op_index: usize, freq_14: u32) {
        self.state[op_index].phase_inc_32 = exp_32(freq_14);
    }

    /// Phase increment of the operator at `op_index`
    pub fn phase_inc(&self, op_index: usize) -> u32 {
        self.state[op_index].phase_inc_32
    }

    /// Start of note. Resets the phase accumulators when sync is on.
    pub fn key_on(&mut self) {
        if self.sync {
            for state in self.state.iter_mut() {
                state.phase_acc_32 = 0;
            }
        }
    }

    /// Evaluate one operator step, returning the running sum scaled to 16 bits
    ///
    /// `op_number` is the documented operator number (1..=N).
    pub fn op(&mut self, op_number: usize, route: &OpRoute) -> i32 {
        let op_index = N - op_number;
        let state = &mut self.state[op_index];

        let phase_32 = state.step_phase();
        let phase_12 = phase_32.wrapping_add((self.modulation_12 as u32) << 23) >> 20;

        let mut log_wave_14 = u32::from(log_sine_14(phase_12));
        log_wave_14 += state.eg.next_atten12() << 1;
        log_wave_14 += u32::from(route.log2_com) << 7;
        let log_wave_14 = log_wave_14.min(LOG_14_MAX);

        let mut output_14 = i32::from(exp_14(LOG_14_MAX - log_wave_14));
        if phase_12 & 0x800 != 0 {
            output_14 = -output_14;
        }

        let mut sum_15 = 0;
        if route.c {
            sum_15 = self.memory_15;
        }
        if route.d {
            sum_15 += output_14;
        }

        self.modulation_12 = match route.sel {
            ModSelect::Zero => 0,
            ModSelect::Output => output_14 >> 3,
            ModSelect::Sum => sum_15 >> 3,
            ModSelect::Memory => self.memory_15 >> 3,
            ModSelect::Feedback => self.feedback1_15 >> 3,
            ModSelect::FeedbackScaled => (self.feedback1_15 + self.feedback2_15) >> (self.fdbk + 1),
        };

        if route.a {
            self.feedback2_15 = self.feedback1_15;
            self.feedback1_15 = output_14;
        }

        if route.writes_memory() {
            self.memory_15 = sum_15;
        }

        sum_15 << 1
    }
}

impl<E: EnvelopeGenerator> Ops<NUM_OPERATORS, E> {
    /// Next sample of the selected algorithm
    pub fn sample(&mut self) -> i32 {
        let mut out = 0;
        for (i, route) in routes(self.algorithm).iter().enumerate() {
            out = self.op(NUM_OPERATORS - i, route);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATIO_1_0: u32 = 0x8CB;
    const NOTE_A4: u32 = 0x1000;

    /// Envelope that holds a fixed attenuation
    #[derive(Default)]
    struct FixedEg(u32);

    impl EnvelopeGenerator for FixedEg {
        fn key_on(&mut self) {}
        fn key_off(&mut self) {}
        fn step(&mut self) {}
        fn atten12(&self) -> u32 {
            self.0
        }
        fn is_complete(&self) -> bool {
            false
        }
    }

    const CARRIER: OpRoute = OpRoute {
        sel: ModSelect::Zero,
        a: false,
        c: false,
        d: true,
        log2_com: 0,
    };

    fn single_op(atten12: u32) -> Ops<1, FixedEg> {
        let mut ops = Ops::<1, FixedEg>::new();
        ops.eg_mut(0).0 = atten12;
        ops.set_freq(0, (NOTE_A4 + RATIO_1_0) & 0x3FFF);
        ops.key_on();
        ops
    }

    #[test]
    fn test_amplitude() {
        let mut ops = single_op(0x000);

        let first = ops.op(1, &CARRIER);
        let mut min = first;
        let mut max = first;
        for _ in 1..crate::SAMPLE_RATE {
            let sample = ops.op(1, &CARRIER);
            min = min.min(sample);
            max = max.max(sample);
        }

        assert!((0..0x800).contains(&first), "first {}", first);
        assert!(min > -0x8000 && min < -0x7FE0, "min {:#x}", min);
        assert!(max > 0x7FE0 && max < 0x8000, "max {:#x}", max);
    }

    #[test]
    fn test_attenuation_halves_every_0x200() {
        let cases = [
            (0x000, 0x8000),
            (0x200, 0x4000),
            (0x400, 0x2000),
            (0x600, 0x1000),
            (0x800, 0x0800),
            (0xA00, 0x0400),
            (0xC00, 0x0200),
            (0xE00, 0x0100),
            (0xFFE, 0x0080),
            (0xFFF, 0x0080),
        ];

        for (atten12, expected) in cases {
            let mut ops = single_op(atten12);
            let max = (0..crate::SAMPLE_RATE).map(|_| ops.op(1, &CARRIER)).max().unwrap_or(0);
            assert!((expected - max).abs() < 0x20, "atten {:#x} max {:#x}", atten12, max);
        }
    }

    #[test]
    fn test_continuity() {
        let mut ops = single_op(0x000);
        let mut last = 0;
        let mut max_delta = 0;
        for _ in 0..crate::SAMPLE_RATE {
            let sample = ops.op(1, &CARRIER);
            max_delta = max_delta.max((sample - last).abs());
            last = sample;
        }
        assert!(max_delta < 0x800, "max delta {:#x}", max_delta);
    }

    #[test]
    fn test_sync_resets_phase() {
        let mut ops = single_op(0x000);
        let first = ops.op(1, &CARRIER);
        for _ in 0..1000 {
            ops.op(1, &CARRIER);
        }
        ops.key_on();
        assert_eq!(ops.op(1, &CARRIER), first);

        ops.set_sync(false);
        ops.key_on();
        assert_ne!(ops.op(1, &CARRIER), first);
    }

    #[test]
    fn test_out_of_range_algorithm_is_ignored() {
        let mut ops = Ops::<NUM_OPERATORS, FixedEg>::new();
        ops.set_algorithm(4);
        ops.set_algorithm(32);
        ops.set_algorithm(0xFF);
        assert_eq!(ops.algorithm(), 4);
    }

    #[test]
    fn test_silent_modulators_leave_carrier_pure() {
        // Algorithm 1 with only OP1 audible matches a lone operator
        let mut ops = Ops::<NUM_OPERATORS, FixedEg>::new();
        for op_index in 0..NUM_OPERATORS {
            ops.eg_mut(op_index).0 = 0xFFF;
            ops.set_freq(op_index, (NOTE_A4 + RATIO_1_0) & 0x3FFF);
        }
        ops.eg_mut(NUM_OPERATORS - 1).0 = 0;
        ops.key_on();

        let max = (0..4096).map(|_| ops.sample()).max().unwrap_or(0);
        assert!(max > 0x3000, "max {:#x}", max);
    }
}
