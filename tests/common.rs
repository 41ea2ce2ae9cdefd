#![allow(dead_code)]

use rustfft::FftPlanner;
use num_complex::Complex;

use dx7ops::fm::patch::{Envelope, Operator, Patch};
use dx7ops::{Synth, SAMPLE_RATE, TICK_RATE};

/// Render `count` samples, ticking the firmware at the control rate
pub fn render<const N: usize>(synth: &mut Synth<N>, count: usize) -> Vec<i32> {
    let mut tick_phase = 0;
    (0..count)
        .map(|_| {
            tick_phase += TICK_RATE;
            if tick_phase >= SAMPLE_RATE {
                tick_phase -= SAMPLE_RATE;
                synth.tick();
            }
            synth.sample()
        })
        .collect()
}

/// Magnitude spectrum (positive frequencies) with a Hann window
pub fn spectrum(samples: &[i32]) -> Vec<f32> {
    let len = samples.len();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(len);

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / len as f32).cos();
            Complex::new(s as f32 * w, 0.0)
        })
        .collect();

    fft.process(&mut buffer);

    buffer.iter().take(len / 2).map(|c| c.norm()).collect()
}

/// Hz per spectrum bin
pub fn bin_width(len: usize) -> f32 {
    SAMPLE_RATE as f32 / len as f32
}

/// Frequency of the strongest partial, refined by parabolic interpolation
pub fn peak_frequency(samples: &[i32]) -> f32 {
    let mags = spectrum(samples);
    let (peak, _) = mags
        .iter()
        .enumerate()
        .skip(1)
        .fold((1, 0.0f32), |best, (i, &m)| if m > best.1 { (i, m) } else { best });

    let offset = if peak + 1 < mags.len() {
        let (a, b, c) = (mags[peak - 1], mags[peak], mags[peak + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > f32::EPSILON {
            0.5 * (a - c) / denom
        } else {
            0.0
        }
    } else {
        0.0
    };

    (peak as f32 + offset) * bin_width(samples.len())
}

/// Strongest magnitude within `tolerance_hz` of `freq`
pub fn magnitude_near(mags: &[f32], len: usize, freq: f32, tolerance_hz: f32) -> f32 {
    let width = bin_width(len);
    let lo = ((freq - tolerance_hz) / width).floor().max(0.0) as usize;
    let hi = (((freq + tolerance_hz) / width).ceil() as usize).min(mags.len() - 1);
    mags[lo..=hi].iter().fold(0.0f32, |a, &b| a.max(b))
}

/// Operator with a flat full-level envelope at the given ratio
pub fn sine_operator(coarse: u8, level: u8) -> Operator {
    Operator {
        envelope: Envelope {
            rate: [99, 99, 99, 99],
            level: [99, 99, 99, 0],
        },
        level,
        coarse,
        fine: 0,
        detune: 7,
        velocity_sensitivity: 0,
        ..Operator::default()
    }
}

/// Algorithm 32 patch with operator `n` at ratio `n`, feedback off
pub fn additive_patch() -> Patch {
    let mut patch = Patch::default();
    patch.algorithm = 31;
    patch.feedback = 0;
    for (i, op) in patch.op.iter_mut().enumerate() {
        let number = (6 - i) as u8;
        *op = sine_operator(number, 99);
    }
    patch
}

/// Single-voice synth holding `patch`
pub fn synth_with(patch: &Patch) -> Synth<1> {
    let mut synth = Synth::new();
    synth.program(patch);
    synth
}
