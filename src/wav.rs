//! Offline note rendering to 16-bit mono WAV

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;

use crate::synth::Synth;
use crate::{SAMPLE_RATE, TICK_RATE};

/// Note timing for [`render_note`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// MIDI note number
    pub note: u8,
    /// MIDI velocity (1-127)
    pub velocity: u8,
    /// Time the key is held, in milliseconds
    pub hold_ms: u32,
    /// Time rendered after key off, in milliseconds
    pub release_ms: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            note: 69,
            velocity: 100,
            hold_ms: 1000,
            release_ms: 1000,
        }
    }
}

fn ms_to_samples(ms: u32) -> usize {
    (u64::from(ms) * u64::from(SAMPLE_RATE) / 1000) as usize
}

/// Render samples at the OPS rate, running the control tick at 375 Hz
///
/// Ticks are spread with an accumulator so the long-run rate is exact even
/// though 49096 / 375 is not an integer.
fn render_into<const N: usize>(synth: &mut Synth<N>, count: usize, tick_phase: &mut u32, out: &mut Vec<i16>) {
    for _ in 0..count {
        *tick_phase += TICK_RATE;
        if *tick_phase >= SAMPLE_RATE {
            *tick_phase -= SAMPLE_RATE;
            synth.tick();
        }
        let sample = synth.sample().clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        out.push(sample as i16);
    }
}

/// Play one note through the synth and return the raw output samples
pub fn render_note<const N: usize>(synth: &mut Synth<N>, settings: &RenderSettings) -> Vec<i16> {
    let hold = ms_to_samples(settings.hold_ms);
    let release = ms_to_samples(settings.release_ms);
    let mut out = Vec::with_capacity(hold + release);
    let mut tick_phase = 0;

    let index = synth.note_on(settings.note, settings.velocity);
    render_into(synth, hold, &mut tick_phase, &mut out);
    synth.gate_off(index);
    render_into(synth, release, &mut tick_phase, &mut out);

    out
}

/// Write samples as a mono 16-bit WAV stream
pub fn write_wav<W: Write + Seek>(writer: W, samples: &[i16]) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut wav_writer = WavWriter::new(writer, spec).context("failed to start WAV stream")?;
    for &sample in samples {
        wav_writer.write_sample(sample)?;
    }
    wav_writer.finalize().context("failed to finalize WAV stream")?;
    Ok(())
}

/// WAV file image of the samples
pub fn wav_bytes(samples: &[i16]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, samples)?;
    Ok(cursor.into_inner())
}

/// Write samples to a WAV file
pub fn write_wav_file(path: impl AsRef<Path>, samples: &[i16]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create WAV file '{}'", path.display()))?;
    write_wav(std::io::BufWriter::new(file), samples)?;
    info!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Patch;

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(0), 0);
        assert_eq!(ms_to_samples(1000), SAMPLE_RATE as usize);
        assert_eq!(ms_to_samples(500), 24548);
    }

    #[test]
    fn test_render_length_and_signal() {
        let mut synth: Synth<1> = Synth::new();
        synth.program(&Patch::default());

        let settings = RenderSettings {
            hold_ms: 100,
            release_ms: 50,
            ..RenderSettings::default()
        };
        let samples = render_note(&mut synth, &settings);

        assert_eq!(samples.len(), ms_to_samples(100) + ms_to_samples(50));
        assert!(samples.iter().any(|&s| s.unsigned_abs() > 0x1000));
    }

    #[test]
    fn test_wav_image() {
        let samples = [0i16, 1000, -1000, i16::MAX, i16::MIN];
        let bytes = wav_bytes(&samples).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);

        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }
}
