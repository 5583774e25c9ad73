// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
mod audio;
mod config;
mod controller;
mod keyboard;
mod keymap;
mod notes;
mod piano;
mod playsync;
mod recorder;
mod samples;
#[cfg(test)]
mod test;
#[cfg(test)]
mod testutil;
mod ui;

use std::error::Error;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{crate_version, Parser, Subcommand};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::controller::Controller;
use crate::keyboard::Keyboard;
use crate::piano::Piano;
use crate::recorder::{Recorder, Tap};
use crate::samples::SampleLoader;
use crate::ui::TitleFade;

/// Channels of the sampler mix and of recordings.
const RECORDING_CHANNELS: u16 = 2;

/// Rate used by `verify`, which decodes without opening a device.
const VERIFY_SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A seven octave sampled piano and recorder for the terminal."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays the piano.
    Play {
        /// The path to the piano config. Defaults are used without one.
        config: Option<PathBuf>,
        /// Overrides the directory holding the piano samples.
        #[arg(short, long)]
        samples: Option<PathBuf>,
        /// Overrides the audio output device.
        #[arg(short, long)]
        device: Option<String>,
        /// Overrides where downloaded recordings are written.
        #[arg(short, long)]
        recordings: Option<PathBuf>,
        /// Writes logs to this file. The terminal is taken over by the piano,
        /// so nothing is logged without one.
        #[arg(short, long)]
        log_file: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Prints the computer key to note bindings.
    Keys {
        /// The path to the piano config.
        config: Option<PathBuf>,
    },
    /// Decodes every sample file and reports the ones that fail.
    Verify {
        /// The path to the piano config.
        config: Option<PathBuf>,
        /// Overrides the directory holding the piano samples.
        #[arg(short, long)]
        samples: Option<PathBuf>,
    },
    /// Prints the default configuration to stdout.
    DefaultConfig {},
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            samples,
            device,
            recordings,
            log_file,
        } => {
            if let Some(log_file) = log_file {
                tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::from_default_env())
                    .with_ansi(false)
                    .with_writer(Mutex::new(File::create(log_file)?))
                    .init();
            }

            let mut config = config::Piano::load(config.as_deref())?;
            if let Some(samples) = samples {
                config.samples_mut().set_directory(&samples);
            }
            if let Some(device) = device {
                config.audio_mut().set_device(&device);
            }
            if let Some(recordings) = recordings {
                config.set_recordings(&recordings);
            }
            play(&config)?;
        }
        Commands::Devices {} => {
            init_stderr_logging();
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Keys { config } => {
            init_stderr_logging();
            let config = config::Piano::load(config.as_deref())?;
            print!("{}", config.keymap()?);
        }
        Commands::Verify { config, samples } => {
            init_stderr_logging();
            let mut config = config::Piano::load(config.as_deref())?;
            if let Some(samples) = samples {
                config.samples_mut().set_directory(&samples);
            }
            verify(&config)?;
        }
        Commands::DefaultConfig {} => {
            print!("{}", config::Piano::default().to_yaml()?);
        }
    }

    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
}

/// Opens the audio device, starts loading samples and hands the terminal to
/// the controller until the user quits.
fn play(config: &config::Piano) -> Result<(), Box<dyn Error>> {
    let keymap = config.keymap()?;
    let files = config.samples().files()?;
    let title = TitleFade::new(
        config.ui().title_fade_after()?,
        config.ui().title_fade_length()?,
    );
    let key_hold = config.ui().key_hold()?;

    let device = audio::get_device(config.audio())?;
    info!(
        device = %device,
        sample_rate = device.sample_rate(),
        channels = device.channels(),
        "Using audio device"
    );
    let tap = Tap::new(RECORDING_CHANNELS, device.sample_rate());
    let (handle, engine) = samples::sampler(config.samples(), device.sample_rate(), tap.clone())?;
    let output = device.start(Box::new(engine))?;
    handle.spawn_loader(files);

    let keyboard = Keyboard::new(&keymap);
    let piano = Piano::new(handle, keymap, Recorder::new(tap), &config.recordings());
    let mut controller = Controller::new(piano, keyboard, title);

    let mut driver = controller::terminal::Driver::new(key_hold);
    driver.enter()?;
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        controller.run(&mut terminal, &mut driver)
    })();
    driver.leave()?;

    drop(output);
    result
}

/// Decodes every configured sample file and prints what happened.
fn verify(config: &config::Piano) -> Result<(), Box<dyn Error>> {
    let directory = config.samples().directory();
    let files = config.samples().files()?;
    let mut loader = SampleLoader::new(VERIFY_SAMPLE_RATE);

    println!("Samples in {} (count: {}):", directory.display(), files.len());
    let mut failed = 0;
    for (note, path) in files.iter() {
        match loader.load(path) {
            Ok(sample) => println!(
                "- {}: {} ({:.2}s, {} channel(s), {} Hz)",
                note,
                display_name(path),
                sample.duration().as_secs_f64(),
                sample.channels(),
                sample.sample_rate()
            ),
            Err(e) => {
                failed += 1;
                println!("- {}: {} FAILED: {}", note, display_name(path), e);
            }
        }
    }

    println!(
        "\n{} loaded, {} failed, {:.1} MiB decoded.",
        files.len() - failed,
        failed,
        loader.total_memory_usage() as f64 / (1024.0 * 1024.0)
    );
    if failed == files.len() {
        return Err("no sample files could be loaded".into());
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
