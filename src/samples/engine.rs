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
//! The sampler engine and the handle the piano drives it through.
//!
//! The engine lives on the audio thread. It receives commands over a channel
//! at the start of every block so that triggering a note never takes a lock
//! the audio callback also needs.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{debug, error, info, span, warn, Level};

use super::loader::{SampleBank, SampleLoader};
use super::voice::{Envelope, VoiceManager};
use crate::audio::Renderer;
use crate::config::{self, ConfigError};
use crate::notes::Note;
use crate::recorder::Tap;

/// Messages from the piano to the audio thread.
#[derive(Debug)]
pub enum Command {
    /// Start a voice for the note.
    Attack { note: Note, velocity: f32 },
    /// Release every voice of the note.
    Release { note: Note },
    /// Release every voice.
    ReleaseAll,
    /// Replace the sample bank.
    Load(Arc<SampleBank>),
}

/// Where the sample bank is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded { samples: usize, skipped: usize },
    Failed(String),
}

/// Something the piano can play.
pub trait Instrument {
    /// Starts the note.
    fn trigger_attack(&self, note: Note);

    /// Releases every sounding voice of the note.
    fn trigger_release(&self, note: Note);

    /// Releases every sounding voice.
    fn release_all(&self);

    /// Returns the state of the sample bank.
    fn load_state(&self) -> LoadState;

    /// Returns true once the instrument can make sound.
    fn is_loaded(&self) -> bool {
        matches!(self.load_state(), LoadState::Loaded { .. })
    }
}

/// Creates the two halves of the sampler: the handle the piano keeps and the
/// engine the audio device renders from.
pub fn sampler(
    config: &config::Samples,
    sample_rate: u32,
    tap: Arc<Tap>,
) -> Result<(SamplerHandle, SamplerEngine), ConfigError> {
    let envelope = Envelope::new(
        config.attack()?,
        config.release()?,
        config.curve(),
        sample_rate,
    );
    let (sender, receiver) = crossbeam_channel::unbounded();

    let handle = SamplerHandle {
        sender,
        state: Arc::new(RwLock::new(LoadState::Loading)),
        velocity: config.velocity(),
        sample_rate,
    };
    let engine = SamplerEngine {
        receiver,
        bank: None,
        voices: VoiceManager::new(config.max_voices(), envelope),
        master_gain: db_to_gain(config.volume_db()),
        tap,
        scratch: Vec::new(),
    };

    info!(
        sample_rate,
        max_voices = config.max_voices(),
        volume_db = config.volume_db(),
        "Sampler created"
    );
    Ok((handle, engine))
}

/// Converts decibels to a linear gain.
fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// The audio thread half of the sampler.
pub struct SamplerEngine {
    /// Commands from the piano.
    receiver: Receiver<Command>,
    /// The loaded samples, once loading finishes.
    bank: Option<Arc<SampleBank>>,
    /// Sounding voices.
    voices: VoiceManager,
    /// Master volume as a linear gain.
    master_gain: f32,
    /// The recorder's tap, fed with every rendered block.
    tap: Arc<Tap>,
    /// Stereo mix buffer, reused between blocks.
    scratch: Vec<f32>,
}

impl SamplerEngine {
    fn apply(&mut self, command: Command) {
        match command {
            Command::Attack { note, velocity } => {
                let Some(bank) = self.bank.as_ref() else {
                    debug!(note = %note, "Attack before samples loaded, ignoring");
                    return;
                };
                match bank.nearest(note) {
                    Some((sample, interval)) => {
                        let sample = sample.clone();
                        self.voices
                            .start(note, sample, interval, velocity * self.master_gain);
                    }
                    None => debug!(note = %note, "No sample in range"),
                }
            }
            Command::Release { note } => {
                self.voices.release(note);
            }
            Command::ReleaseAll => self.voices.release_all(),
            Command::Load(bank) => self.bank = Some(bank),
        }
    }

    /// Returns the number of sounding voices.
    #[cfg(test)]
    pub fn active_voices(&self) -> usize {
        self.voices.active_count()
    }
}

impl Renderer for SamplerEngine {
    fn render(&mut self, out: &mut [f32], channels: usize) {
        while let Ok(command) = self.receiver.try_recv() {
            self.apply(command);
        }

        let channels = channels.max(1);
        let frames = out.len() / channels;
        self.scratch.clear();
        self.scratch.resize(frames * 2, 0.0);
        self.voices.render(&mut self.scratch);
        self.scratch
            .iter_mut()
            .for_each(|sample| *sample = sample.clamp(-1.0, 1.0));
        self.tap.capture(&self.scratch);

        for (frame, stereo) in out
            .chunks_exact_mut(channels)
            .zip(self.scratch.chunks_exact(2))
        {
            if channels == 1 {
                frame[0] = (stereo[0] + stereo[1]) * 0.5;
            } else {
                frame[0] = stereo[0];
                frame[1] = stereo[1];
                frame[2..].fill(0.0);
            }
        }
    }
}

impl std::fmt::Debug for SamplerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerEngine")
            .field("samples", &self.bank.as_ref().map(|b| b.len()))
            .field("voices", &self.voices)
            .field("master_gain", &self.master_gain)
            .finish()
    }
}

/// The piano's half of the sampler.
#[derive(Clone)]
pub struct SamplerHandle {
    sender: Sender<Command>,
    state: Arc<RwLock<LoadState>>,
    velocity: f32,
    sample_rate: u32,
}

impl SamplerHandle {
    fn send(&self, command: Command) {
        // The receiver only goes away when the audio device shuts down.
        if self.sender.send(command).is_err() {
            warn!("Audio output is gone, dropping sampler command");
        }
    }

    /// Loads the sample files on a background thread. Until it finishes the
    /// load state is [`LoadState::Loading`].
    pub fn spawn_loader(&self, files: Vec<(Note, PathBuf)>) -> thread::JoinHandle<()> {
        let handle = self.clone();
        *handle.state.write() = LoadState::Loading;
        thread::spawn(move || {
            let span = span!(Level::INFO, "load samples");
            let _enter = span.enter();

            let mut loader = SampleLoader::new(handle.sample_rate);
            let state = match loader.load_bank(&files) {
                Ok(bank) => {
                    let state = LoadState::Loaded {
                        samples: bank.len(),
                        skipped: bank.skipped(),
                    };
                    handle.send(Command::Load(Arc::new(bank)));
                    state
                }
                Err(e) => {
                    error!(err = %e, "Unable to load piano samples");
                    LoadState::Failed(e.to_string())
                }
            };
            *handle.state.write() = state;
        })
    }
}

impl Instrument for SamplerHandle {
    fn trigger_attack(&self, note: Note) {
        self.send(Command::Attack {
            note,
            velocity: self.velocity,
        });
    }

    fn trigger_release(&self, note: Note) {
        self.send(Command::Release { note });
    }

    fn release_all(&self) {
        self.send(Command::ReleaseAll);
    }

    fn load_state(&self) -> LoadState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::samples::loader::LoadedSample;
    use crate::test::eventually;
    use crate::testutil::{calculate_rms, sine, write_wav};

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    fn setup() -> (SamplerHandle, SamplerEngine, Arc<Tap>) {
        let tap = Tap::new(2, 1000);
        let (handle, engine) = sampler(&config::Samples::default(), 1000, tap.clone()).unwrap();
        (handle, engine, tap)
    }

    fn loaded(handle: &SamplerHandle, engine: &mut SamplerEngine) {
        let mut bank = SampleBank::new();
        bank.insert(note("C4"), LoadedSample::new(vec![0.5; 2000], 1, 1000));
        handle.send(Command::Load(Arc::new(bank)));
        engine.render(&mut [0.0; 2], 2);
    }

    #[test]
    fn test_db_to_gain() {
        assert_eq!(db_to_gain(0.0), 1.0);
        assert!((db_to_gain(-6.0) - 0.501).abs() < 0.001);
        assert!((db_to_gain(20.0) - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_velocity_and_volume_scale_voices() {
        let samples: config::Samples =
            serde_yml::from_str("volume: -6.0\nvelocity: 0.5\n").unwrap();
        let tap = Tap::new(2, 1000);
        let (handle, mut engine) = sampler(&samples, 1000, tap).unwrap();
        loaded(&handle, &mut engine);

        handle.trigger_attack(note("C4"));
        let mut out = vec![0.0; 20];
        engine.render(&mut out, 2);
        let expected = 0.5 * 0.5 * db_to_gain(-6.0);
        assert!((expected - 0.1253).abs() < 0.001);
        assert!(out.iter().all(|s| (s - expected).abs() < 1e-6));
    }

    #[test]
    fn test_attack_before_load_is_silent() {
        let (handle, mut engine, _) = setup();
        handle.trigger_attack(note("C4"));

        let mut out = vec![0.0; 20];
        engine.render(&mut out, 2);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn test_attack_and_release() {
        let (handle, mut engine, _) = setup();
        loaded(&handle, &mut engine);

        handle.trigger_attack(note("C4"));
        let mut out = vec![0.0; 20];
        engine.render(&mut out, 2);
        assert!(out.iter().all(|s| *s == 0.5));
        assert_eq!(engine.active_voices(), 1);

        // The default release is 100ms, which is 100 frames at 1kHz.
        handle.trigger_release(note("C4"));
        let mut out = vec![0.0; 400];
        engine.render(&mut out, 2);
        assert!(out[0] > 0.4);
        assert_eq!(out[398], 0.0);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn test_polyphony_and_release_all() {
        let (handle, mut engine, _) = setup();
        loaded(&handle, &mut engine);

        handle.trigger_attack(note("C4"));
        handle.trigger_attack(note("C4"));
        handle.trigger_attack(note("E4"));
        let mut out = vec![0.0; 2];
        engine.render(&mut out, 2);
        assert_eq!(engine.active_voices(), 3);
        // Three voices at 0.5 clip at full scale.
        assert_eq!(out[0], 1.0);

        handle.release_all();
        let mut out = vec![0.0; 400];
        engine.render(&mut out, 2);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn test_channel_mapping() {
        let (handle, mut engine, _) = setup();
        loaded(&handle, &mut engine);
        handle.trigger_attack(note("C4"));

        let mut mono = vec![0.0; 4];
        engine.render(&mut mono, 1);
        assert!(mono.iter().all(|s| *s == 0.5));

        let mut surround = vec![1.0; 8];
        engine.render(&mut surround, 4);
        assert_eq!(surround, vec![0.5, 0.5, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_tap_receives_output() {
        let (handle, mut engine, tap) = setup();
        loaded(&handle, &mut engine);

        let mut recorder = crate::recorder::Recorder::new(tap);
        recorder.start().unwrap();
        engine.render(&mut [0.0; 100], 2);
        handle.trigger_attack(note("C4"));
        engine.render(&mut [0.0; 100], 2);
        let recording = recorder.stop().unwrap();

        assert_eq!(recording.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_spawn_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A4.wav");
        write_wav(&path, &sine(440.0, 1000, 1000, 0.8), 1, 1000).unwrap();

        let (handle, mut engine, _) = setup();
        assert_eq!(handle.load_state(), LoadState::Loading);
        assert!(!handle.is_loaded());

        handle
            .spawn_loader(vec![
                (note("A4"), path),
                (note("C5"), dir.path().join("missing.wav")),
            ])
            .join()
            .unwrap();
        assert_eq!(
            handle.load_state(),
            LoadState::Loaded {
                samples: 1,
                skipped: 1
            }
        );
        assert!(handle.is_loaded());

        handle.trigger_attack(note("A4"));
        let mut out = vec![0.0; 400];
        engine.render(&mut out, 2);
        assert!(calculate_rms(&out) > 0.3);
    }

    #[test]
    fn test_spawn_loader_failure() {
        let (handle, _engine, _) = setup();
        handle.spawn_loader(vec![(note("A4"), PathBuf::from("/nonexistent/A4.mp3"))]);
        eventually(
            || matches!(handle.load_state(), LoadState::Failed(_)),
            "Loader never failed",
        );
        assert!(!handle.is_loaded());
    }
}
