use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use dx7ops::sysex::parse_sysex_file;
use dx7ops::wav::{render_note, write_wav_file, RenderSettings};
use dx7ops::{Patch, Synth};

/// Inspect DX7 SysEx voices and render them through the OPS/EGS model
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the voices in a SysEx file
    List {
        /// Path to a DX7 bulk dump or single voice SysEx file
        sysex_file: PathBuf,
    },
    /// Print one voice as TOML
    Show {
        /// Path to a DX7 bulk dump or single voice SysEx file
        sysex_file: PathBuf,

        /// Voice index (0-based)
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Render one note of a voice to a WAV file
    Render {
        /// Path to a DX7 bulk dump or single voice SysEx file
        sysex_file: PathBuf,

        /// Voice index (0-based)
        #[arg(long, default_value_t = 0)]
        index: usize,

        /// MIDI note
        #[arg(long, default_value_t = 69, value_parser = clap::value_parser!(u8).range(0..=127))]
        note: u8,

        /// MIDI velocity
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(1..=127))]
        velocity: u8,

        /// Key hold time in milliseconds
        #[arg(long, default_value_t = 1000)]
        hold_ms: u32,

        /// Time rendered after key off in milliseconds
        #[arg(long, default_value_t = 1000)]
        release_ms: u32,

        /// Size of the voice pool (1, 2, 4, 8 or 16); output is divided by it
        #[arg(long, default_value_t = 1)]
        voices: usize,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn load_patch(sysex_file: &Path, index: usize) -> Result<Patch> {
    let patches = parse_sysex_file(sysex_file)?;
    patches.get(index).copied().with_context(|| {
        format!(
            "voice index {} is out of range ({} has {} voices)",
            index,
            sysex_file.display(),
            patches.len()
        )
    })
}

fn render<const N: usize>(patch: &Patch, settings: &RenderSettings) -> Vec<i16> {
    let mut synth: Synth<N> = Synth::new();
    synth.program(patch);
    render_note(&mut synth, settings)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::List { sysex_file } => {
            for (i, patch) in parse_sysex_file(&sysex_file)?.iter().enumerate() {
                println!("{:2}: {}", i, patch.name());
            }
        }
        Commands::Show { sysex_file, index } => {
            let patch = load_patch(&sysex_file, index)?;
            let text = toml::to_string_pretty(&patch).context("failed to format patch as TOML")?;
            print!("{}", text);
        }
        Commands::Render {
            sysex_file,
            index,
            note,
            velocity,
            hold_ms,
            release_ms,
            voices,
            output,
        } => {
            let patch = load_patch(&sysex_file, index)?;
            let settings = RenderSettings {
                note,
                velocity,
                hold_ms,
                release_ms,
            };

            info!(
                "rendering {:?} note {} velocity {} ({} ms + {} ms)",
                patch.name(),
                note,
                velocity,
                hold_ms,
                release_ms
            );

            let samples = match voices {
                1 => render::<1>(&patch, &settings),
                2 => render::<2>(&patch, &settings),
                4 => render::<4>(&patch, &settings),
                8 => render::<8>(&patch, &settings),
                16 => render::<16>(&patch, &settings),
                _ => bail!("unsupported voice count {} (use 1, 2, 4, 8 or 16)", voices),
            };

            write_wav_file(&output, &samples)?;
        }
    }

    Ok(())
}
