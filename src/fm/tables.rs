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

//! ROM tables shared by the OPS and EGS models.
//!
//! The OPS works entirely in a fixed-point log domain: a 12-bit phase indexes
//! an absolute log-sine table, attenuation is added as a log value and the
//! result is converted back to a linear sample through an exponential table.
//! The EGS uses a further exponential table to turn 6-bit rates into
//! attenuation increments.
//!
//! All tables are computed once on first use and are read-only afterwards.

use std::sync::OnceLock;

/// Number of entries in the 14-bit exponential tables
pub const EXP_14_SIZE: usize = 1 << 14;

/// Number of entries in the log-sine table (12-bit phase)
pub const LOG_SINE_14_SIZE: usize = 1 << 12;

/// Number of entries in the EG rate table (6-bit rate)
pub const EXP_19_SIZE: usize = 1 << 6;

/// Largest 14-bit log value
pub const LOG_14_MAX: u32 = 0x3FFF;

/// Mantissa shared by the exponential ROMs, Q1.11
///
/// Rounded the way the values are stored in the chip rather than the more
/// obvious `2^(i/1024) / 4`.
#[inline]
fn exp_mantissa(index_14: usize) -> u64 {
    let frac = (index_14 & 0x3FF) as f64 / 1024.0;
    (2.0_f64.powf(frac) * 2048.0 + 0.5) as u64
}

fn build_exp_14() -> Box<[u16]> {
    (0..EXP_14_SIZE)
        .map(|i| ((exp_mantissa(i) << (i >> 10)) >> 13) as u16)
        .collect()
}

fn build_log_sine_14() -> Box<[u16]> {
    (0..LOG_SINE_14_SIZE)
        .map(|i| {
            let phase = (i as f64 + 0.5) * std::f64::consts::PI / 2048.0;
            (-phase.sin().abs().log2() * 1024.0 + 0.5002) as u16
        })
        .collect()
}

fn build_exp_32() -> Box<[u32]> {
    (0..EXP_14_SIZE)
        .map(|i| {
            let exp22 = (exp_mantissa(i) << (i >> 10)) >> 5;
            // The top 0xC00 entries are reused for very low (negative octave)
            // frequencies.
            if i < 0x3400 {
                (exp22 << 13) as u32
            } else {
                (exp22 >> 3) as u32
            }
        })
        .collect()
}

fn build_exp_19() -> [u32; EXP_19_SIZE] {
    let mut table = [0; EXP_19_SIZE];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (8.0 * 2.0_f64.powf(i as f64 / 4.0)) as u32;
    }
    table
}

/// 14-bit log (Q4.10) to 14-bit linear amplitude
#[inline]
pub fn exp_14(index_14: u32) -> u16 {
    static TABLE: OnceLock<Box<[u16]>> = OnceLock::new();
    TABLE.get_or_init(build_exp_14)[(index_14 & LOG_14_MAX) as usize]
}

/// 12-bit phase to 14-bit absolute log-sine (1024 per octave of attenuation)
#[inline]
pub fn log_sine_14(phase_12: u32) -> u16 {
    static TABLE: OnceLock<Box<[u16]>> = OnceLock::new();
    TABLE.get_or_init(build_log_sine_14)[(phase_12 & 0xFFF) as usize]
}

/// 14-bit log frequency (Q4.10) to 32-bit phase increment
#[inline]
pub fn exp_32(freq_14: u32) -> u32 {
    static TABLE: OnceLock<Box<[u32]>> = OnceLock::new();
    TABLE.get_or_init(build_exp_32)[(freq_14 & LOG_14_MAX) as usize]
}

/// 6-bit rate (Q4.2) to per-sample attenuation increment (Q16.3)
#[inline]
pub fn exp_19(rate_6: u32) -> u32 {
    static TABLE: OnceLock<[u32; EXP_19_SIZE]> = OnceLock::new();
    TABLE.get_or_init(build_exp_19)[rate_6.min(EXP_19_SIZE as u32 - 1) as usize]
}
