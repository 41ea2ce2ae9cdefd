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

//! FM algorithms and routing structures
//!
//! Each DX7 algorithm is a fixed sequence of six operator steps, evaluated
//! from OP6 down to OP1 once per sample. A step is described by the control
//! word the OPS chip decodes from its algorithm ROM:
//!
//! * `sel` picks the modulation input for the *next* operator evaluated,
//! * `a` latches the operator output into the two-stage feedback pipe,
//! * `c` adds the memory register into the running sum,
//! * `d` adds the operator output into the running sum,
//! * `log2_com` is a log-domain attenuation that compensates for the number
//!   of summed carriers.
//!
//! The step for OP1 selects the modulation of OP6 in the following sample,
//! which is how the feedback loop of algorithms such as 1 is closed.

use crate::{NUM_ALGORITHMS, NUM_OPERATORS};

/// Source of the phase modulation fed to the next operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModSelect {
    /// No modulation
    Zero = 0,
    /// This operator's output
    Output = 1,
    /// Running sum (memory plus output)
    Sum = 2,
    /// Memory register
    Memory = 3,
    /// Most recent feedback sample
    Feedback = 4,
    /// Average of the two feedback samples, scaled by the feedback level
    FeedbackScaled = 5,
}

/// One operator step of an algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRoute {
    /// Modulation for the next operator
    pub sel: ModSelect,
    /// Feedback latch enable
    pub a: bool,
    /// Add memory into the sum
    pub c: bool,
    /// Add output into the sum
    pub d: bool,
    /// Carrier compensation attenuation (log domain, 5 bits)
    pub log2_com: u8,
}

impl OpRoute {
    /// Whether this step writes the memory register
    #[inline]
    pub fn writes_memory(&self) -> bool {
        self.c || self.d
    }
}

const fn route(sel: ModSelect, a: bool, c: bool, d: bool, log2_com: u8) -> OpRoute {
    OpRoute {
        sel,
        a,
        c,
        d,
        log2_com,
    }
}

/// Attenuation applied to each carrier for a given carrier count (1-6)
pub const LOG2_COM: [u8; NUM_OPERATORS] = [0b00000, 0b01000, 0b01101, 0b10000, 0b10011, 0b10101];

/// Returns the routing steps for an algorithm (0-31), OP6 first
#[inline]
pub fn routes(algorithm: usize) -> &'static [OpRoute; NUM_OPERATORS] {
    &ALGORITHMS[algorithm % NUM_ALGORITHMS]
}

/// Number of operators whose output reaches the audio output
pub fn carrier_count(algorithm: usize) -> usize {
    let last = routes(algorithm)[NUM_OPERATORS - 1].log2_com;
    LOG2_COM.iter().position(|&com| com == last).map_or(1, |i| i + 1)
}

/// Checks if an operator (documented number 1-6) is a carrier
pub fn is_carrier(algorithm: usize, op_number: usize) -> bool {
    if op_number == 1 {
        return true;
    }
    routes(algorithm)[NUM_OPERATORS - op_number.clamp(1, NUM_OPERATORS)].log2_com != 0
}

/// Routing ROM for the 32 algorithms
#[rustfmt::skip]
pub static ALGORITHMS: [[OpRoute; NUM_OPERATORS]; NUM_ALGORITHMS] = [
    // 1
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 2
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01000),
    ],
    // 3
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 4
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, true, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 5
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01101),
    ],
    // 6
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, true, false, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01101),
    ],
    // 7
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 8
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b00000),
        route(ModSelect::Sum, true, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01000),
    ],
    // 9
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01000),
    ],
    // 10
    [
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01000),
    ],
    // 11
    [
        route(ModSelect::Zero, true, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 12
    [
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01000),
    ],
    // 13
    [
        route(ModSelect::Zero, true, false, true, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 14
    [
        route(ModSelect::Zero, true, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01000),
    ],
    // 15
    [
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01000),
    ],
    // 16
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b00000),
    ],
    // 17
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b00000),
        route(ModSelect::Sum, true, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b00000),
    ],
    // 18
    [
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::Output, false, false, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b00000),
        route(ModSelect::Zero, true, true, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b00000),
    ],
    // 19
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Feedback, false, false, true, 0b01101),
        route(ModSelect::Zero, false, true, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01101),
    ],
    // 20
    [
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01101),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Feedback, false, true, true, 0b01101),
        route(ModSelect::Zero, false, true, true, 0b01101),
    ],
    // 21
    [
        route(ModSelect::Output, false, false, true, 0b00000),
        route(ModSelect::Memory, false, false, true, 0b10000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Feedback, false, true, true, 0b10000),
        route(ModSelect::Zero, false, true, true, 0b10000),
    ],
    // 22
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Feedback, false, false, true, 0b10000),
        route(ModSelect::Feedback, false, true, true, 0b10000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10000),
    ],
    // 23
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Feedback, false, false, true, 0b10000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10000),
    ],
    // 24
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Feedback, false, false, true, 0b10011),
        route(ModSelect::Feedback, false, true, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10011),
    ],
    // 25
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Feedback, false, false, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10011),
    ],
    // 26
    [
        route(ModSelect::Zero, true, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01101),
        route(ModSelect::FeedbackScaled, false, true, true, 0b01101),
    ],
    // 27
    [
        route(ModSelect::Zero, false, false, true, 0b00000),
        route(ModSelect::Sum, false, true, true, 0b00000),
        route(ModSelect::FeedbackScaled, false, false, true, 0b01101),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01101),
        route(ModSelect::Zero, false, true, true, 0b01101),
    ],
    // 28
    [
        route(ModSelect::FeedbackScaled, false, false, true, 0b01101),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01101),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b01101),
    ],
    // 29
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b10000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10000),
    ],
    // 30
    [
        route(ModSelect::FeedbackScaled, false, false, true, 0b10000),
        route(ModSelect::Output, true, true, false, 0b00000),
        route(ModSelect::Output, false, true, false, 0b00000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::Zero, false, true, true, 0b10000),
        route(ModSelect::Zero, false, true, true, 0b10000),
    ],
    // 31
    [
        route(ModSelect::Output, true, false, false, 0b00000),
        route(ModSelect::Zero, false, false, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::Zero, false, true, true, 0b10011),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10011),
    ],
    // 32
    [
        route(ModSelect::Zero, true, false, true, 0b10101),
        route(ModSelect::Zero, false, true, true, 0b10101),
        route(ModSelect::Zero, false, true, true, 0b10101),
        route(ModSelect::Zero, false, true, true, 0b10101),
        route(ModSelect::Zero, false, true, true, 0b10101),
        route(ModSelect::FeedbackScaled, false, true, true, 0b10101),
    ],
];

#[cfg(test)]
mod tests {
    use super::*;

    const DX7_CARRIERS: [usize; NUM_ALGORITHMS] = [
        2, 2, 2, 2, 3, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 3, 3, 4, 4, 4, 5, 5, 3, 3, 3, 4, 4, 5, 6,
    ];

    #[test]
    fn test_carrier_counts_match_front_panel() {
        for alg in 0..NUM_ALGORITHMS {
            assert_eq!(carrier_count(alg), DX7_CARRIERS[alg], "algorithm {}", alg + 1);

            let flagged = (1..=NUM_OPERATORS).filter(|&op| is_carrier(alg, op)).count();
            assert_eq!(flagged, DX7_CARRIERS[alg], "algorithm {}", alg + 1);
        }
    }

    #[test]
    fn test_algorithm_32_all_carriers() {
        for op in 1..=NUM_OPERATORS {
            assert!(is_carrier(31, op));
        }
        for step in routes(31) {
            assert!(step.d);
            assert_eq!(step.log2_com, LOG2_COM[5]);
        }
    }

    #[test]
    fn test_every_algorithm_has_one_feedback_latch() {
        for alg in 0..NUM_ALGORITHMS {
            let latches = routes(alg).iter().filter(|step| step.a).count();
            assert_eq!(latches, 1, "algorithm {}", alg + 1);
        }
    }

    #[test]
    fn test_op1_always_ends_in_sum() {
        for alg in 0..NUM_ALGORITHMS {
            let last = routes(alg)[NUM_OPERATORS - 1];
            assert!(last.d, "algorithm {}", alg + 1);
        }
    }
}
