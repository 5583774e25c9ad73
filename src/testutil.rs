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
use std::{error::Error, f32::consts::PI, fs::File, path::Path};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::notes::Note;
use crate::samples::{Instrument, LoadState};

/// Writes 16-bit interleaved frames to a WAV file.
pub fn write_wav(
    path: &Path,
    frames: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;

    for sample in frames {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Generates a mono sine wave.
pub fn sine(frequency: f32, sample_rate: u32, frames: usize, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// A call made on a [`MockInstrument`].
#[derive(Debug, PartialEq, Eq)]
pub enum Call {
    Attack(Note),
    Release(Note),
    ReleaseAll,
}

/// An instrument that records what it was asked to play.
pub struct MockInstrument {
    state: Mutex<LoadState>,
    calls: Mutex<Vec<Call>>,
}

impl MockInstrument {
    pub fn new(state: LoadState) -> MockInstrument {
        MockInstrument {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// An instrument with a full sample bank.
    pub fn loaded() -> MockInstrument {
        MockInstrument::new(LoadState::Loaded {
            samples: 30,
            skipped: 0,
        })
    }

    pub fn set_state(&self, state: LoadState) {
        *self.state.lock() = state;
    }

    /// Returns the calls made so far and forgets them.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl Instrument for MockInstrument {
    fn trigger_attack(&self, note: Note) {
        self.calls.lock().push(Call::Attack(note));
    }

    fn trigger_release(&self, note: Note) {
        self.calls.lock().push(Call::Release(note));
    }

    fn release_all(&self) {
        self.calls.lock().push(Call::ReleaseAll);
    }

    fn load_state(&self) -> LoadState {
        self.state.lock().clone()
    }
}
