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
//! Records what the piano plays.
//!
//! The sampler hands every block it renders to a [`Tap`]. While the tap is
//! armed the block is appended to the take, silence included, so the
//! recording keeps the timing of the performance.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tracing::info;

/// Prefix of downloaded recording file names.
const FILE_PREFIX: &str = "piano-recording";

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("Recording not started")]
    NotRecording,

    #[error("No recording to download")]
    NoRecording,

    #[error("Unable to encode recording: {0}")]
    Encode(#[from] hound::Error),

    #[error("Unable to save recording: {0}")]
    Io(#[from] std::io::Error),
}

/// The point in the output path where the recorder listens.
pub struct Tap {
    armed: AtomicBool,
    channels: u16,
    sample_rate: u32,
    buffer: Mutex<Vec<f32>>,
}

impl Tap {
    /// Creates a disarmed tap for interleaved audio of the given shape.
    pub fn new(channels: u16, sample_rate: u32) -> Arc<Tap> {
        Arc::new(Tap {
            armed: AtomicBool::new(false),
            channels,
            sample_rate,
            buffer: Mutex::new(Vec::new()),
        })
    }

    /// Returns true while a take is being captured.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Appends a block of interleaved samples to the take if armed.
    pub fn capture(&self, block: &[f32]) {
        if self.is_armed() {
            self.buffer.lock().extend_from_slice(block);
        }
    }
}

/// Starts and stops takes on a [`Tap`].
pub struct Recorder {
    tap: Arc<Tap>,
    started: Option<Instant>,
}

impl Recorder {
    /// Creates a recorder listening on the tap.
    pub fn new(tap: Arc<Tap>) -> Recorder {
        Recorder { tap, started: None }
    }

    /// Begins a new take.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.tap.is_armed() {
            return Err(RecorderError::AlreadyRecording);
        }

        self.tap.buffer.lock().clear();
        self.tap.armed.store(true, Ordering::Release);
        self.started = Some(Instant::now());
        info!("Recording started");
        Ok(())
    }

    /// Ends the take and returns it.
    pub fn stop(&mut self) -> Result<Recording, RecorderError> {
        if !self.tap.is_armed() {
            return Err(RecorderError::NotRecording);
        }

        self.tap.armed.store(false, Ordering::Release);
        self.started = None;
        let samples = std::mem::take(&mut *self.tap.buffer.lock());
        let recording = Recording::new(samples, self.tap.channels, self.tap.sample_rate);
        info!(
            duration_ms = recording.duration().as_millis(),
            "Recording stopped"
        );
        Ok(recording)
    }

    /// Returns true while a take is being captured.
    pub fn is_recording(&self) -> bool {
        self.tap.is_armed()
    }

    /// Returns how long the current take has been running.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started.map(|started| started.elapsed())
    }
}

/// A finished take.
#[derive(Clone)]
pub struct Recording {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    created: SystemTime,
}

impl Recording {
    /// Wraps interleaved samples in a recording stamped with the current time.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Recording {
        Recording {
            samples,
            channels: channels.max(1),
            sample_rate,
            created: SystemTime::now(),
        }
    }

    /// Returns the length of the take.
    pub fn duration(&self) -> Duration {
        let frames = (self.samples.len() / self.channels as usize) as u64;
        Duration::from_nanos(frames.saturating_mul(1_000_000_000) / self.sample_rate.max(1) as u64)
    }

    /// Encodes the take as a 16-bit PCM WAV file in memory.
    pub fn to_wav(&self) -> Result<Vec<u8>, RecorderError> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for sample in &self.samples {
                let sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }

    /// Returns the file name the take is downloaded as.
    pub fn file_name(&self) -> String {
        let millis = self
            .created
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        format!("{}-{}.wav", FILE_PREFIX, millis)
    }

    /// Writes the take into the directory, creating it if needed, and returns
    /// the path of the new file.
    pub fn save_to(&self, directory: &Path) -> Result<PathBuf, RecorderError> {
        fs::create_dir_all(directory)?;
        let path = directory.join(self.file_name());
        fs::write(&path, self.to_wav()?)?;
        info!(path = %path.display(), "Recording saved");
        Ok(path)
    }
}

impl std::fmt::Debug for Recording {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recording")
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("duration", &self.duration())
            .finish()
    }
}

/// Returns a file:// URL for a saved recording.
pub fn file_url(path: &Path) -> String {
    let absolute = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}
