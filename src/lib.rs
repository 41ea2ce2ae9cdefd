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

//! Cycle-accurate model of the Yamaha DX7 sound generation hardware.
//!
//! The DX7 splits synthesis between two chips. The EGS computes operator
//! frequencies and envelopes, and the OPS runs the six sine operators
//! through one of 32 routing algorithms. Both are driven by firmware on
//! the main CPU at a 375 Hz control rate. This crate models all three with
//! integer arithmetic matching the hardware bit widths.
//!
//! ```no_run
//! use dx7ops::{Patch, Synth};
//!
//! let mut synth: Synth<1> = Synth::new();
//! synth.program(&Patch::default());
//! synth.note_on(69, 100);
//! let sample = synth.sample();
//! # let _ = sample;
//! ```

#![warn(missing_docs)]

pub mod fm;
pub mod synth;
pub mod sysex;
pub mod wav;

/// OPS output sample rate in Hz
pub const SAMPLE_RATE: u32 = 49096;

/// Firmware control rate in Hz
pub const TICK_RATE: u32 = 375;

/// Number of operators per voice
pub const NUM_OPERATORS: usize = 6;

/// Number of operator routing algorithms
pub const NUM_ALGORITHMS: usize = 32;

pub use fm::firmware::Firmware;
pub use fm::patch::{FunctionParams, Patch, PatchBank};
pub use fm::voice::{Voice, VoiceState};
pub use synth::Synth;
