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
//! Voice management for polyphonic sample playback.
//!
//! Handles voice allocation, stealing, pitch shifting and the attack/release
//! envelope.

use std::time::Duration;

use tracing::debug;

use super::loader::LoadedSample;
use crate::config::ReleaseCurve;
use crate::notes::Note;

/// Level an exponential release reaches at its end, -60 dB.
const EXPONENTIAL_FLOOR: f32 = 0.001;

/// Attack and release timing, in frames at the output rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    attack_frames: u64,
    release_frames: u64,
    curve: ReleaseCurve,
}

impl Envelope {
    /// Creates an envelope for the given output sample rate.
    pub fn new(attack: Duration, release: Duration, curve: ReleaseCurve, sample_rate: u32) -> Self {
        let frames = |d: Duration| (d.as_secs_f64() * sample_rate as f64).round() as u64;
        Envelope {
            attack_frames: frames(attack),
            release_frames: frames(release),
            curve,
        }
    }

    /// Returns the gain `frames` into the attack.
    fn attack_level(&self, frames: u64) -> f32 {
        if frames >= self.attack_frames {
            1.0
        } else {
            frames as f32 / self.attack_frames as f32
        }
    }

    /// Returns the gain `frames` into the release, relative to the level the
    /// release started at, or None once the release is over.
    fn release_level(&self, frames: u64) -> Option<f32> {
        if frames >= self.release_frames {
            return None;
        }
        let progress = frames as f32 / self.release_frames as f32;
        Some(match self.curve {
            ReleaseCurve::Exponential => EXPONENTIAL_FLOOR.powf(progress),
            ReleaseCurve::Linear => 1.0 - progress,
        })
    }
}

/// Represents an active voice playing a sample.
struct Voice {
    /// Monotonic ID; lower IDs started earlier.
    id: u64,
    /// The note this voice plays.
    note: Note,
    /// The sample being pitch shifted.
    sample: LoadedSample,
    /// Read position in sample frames.
    position: f64,
    /// Frames of sample read per output frame.
    rate: f64,
    /// Velocity and volume.
    gain: f32,
    /// Output frames rendered so far.
    age: u64,
    /// Level and elapsed frames of the release, once released.
    release: Option<(f32, u64)>,
    /// Set once the voice has nothing left to play.
    finished: bool,
}

impl Voice {
    fn is_releasing(&self) -> bool {
        self.release.is_some()
    }

    fn release(&mut self, envelope: &Envelope) {
        if self.release.is_none() {
            self.release = Some((envelope.attack_level(self.age), 0));
        }
    }

    fn next_frame(&mut self, envelope: &Envelope) -> Option<(f32, f32)> {
        let level = match self.release {
            Some((from, elapsed)) => from * envelope.release_level(elapsed)?,
            None => envelope.attack_level(self.age),
        };
        let (left, right) = self.sample.stereo_at(self.position)?;

        self.position += self.rate;
        self.age += 1;
        if let Some((_, elapsed)) = self.release.as_mut() {
            *elapsed += 1;
        }

        let gain = level * self.gain;
        Some((left * gain, right * gain))
    }
}

/// Manages active voices for sample playback.
pub struct VoiceManager {
    /// Active voices, oldest first.
    voices: Vec<Voice>,
    /// Global maximum voices limit.
    max_voices: usize,
    /// The envelope applied to every voice.
    envelope: Envelope,
    /// ID for the next voice.
    next_id: u64,
}

impl VoiceManager {
    /// Creates a new voice manager.
    pub fn new(max_voices: usize, envelope: Envelope) -> Self {
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices: max_voices.max(1),
            envelope,
            next_id: 0,
        }
    }

    /// Starts a voice for the note, playing `sample` shifted by `interval`
    /// semitones. When the voice limit is reached, the oldest releasing voice
    /// is stolen, or the oldest voice if none is releasing.
    pub fn start(&mut self, note: Note, sample: LoadedSample, interval: i32, gain: f32) {
        if self.voices.len() >= self.max_voices {
            let victim = self
                .voices
                .iter()
                .position(|v| v.is_releasing())
                .unwrap_or(0);
            let stolen = self.voices.remove(victim);
            debug!(
                max_voices = self.max_voices,
                stolen = %stolen.note,
                "Voice limit reached, stealing"
            );
        }

        self.voices.push(Voice {
            id: self.next_id,
            note,
            sample,
            position: 0.0,
            rate: 2f64.powf(interval as f64 / 12.0),
            gain,
            age: 0,
            release: None,
            finished: false,
        });
        self.next_id += 1;
    }

    /// Begins the release of every voice playing the note. Returns the number
    /// of voices released.
    pub fn release(&mut self, note: Note) -> usize {
        let envelope = self.envelope;
        let mut released = 0;
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.note == note && !v.is_releasing())
        {
            voice.release(&envelope);
            released += 1;
        }
        released
    }

    /// Begins the release of every voice.
    pub fn release_all(&mut self) {
        let envelope = self.envelope;
        self.voices.iter_mut().for_each(|v| v.release(&envelope));
    }

    /// Returns the current number of active voices.
    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    /// Mixes every voice into an interleaved stereo buffer and drops the
    /// voices that have finished.
    pub fn render(&mut self, out: &mut [f32]) {
        let envelope = self.envelope;
        for frame in out.chunks_exact_mut(2) {
            for voice in self.voices.iter_mut().filter(|v| !v.finished) {
                match voice.next_frame(&envelope) {
                    Some((left, right)) => {
                        frame[0] += left;
                        frame[1] += right;
                    }
                    None => voice.finished = true,
                }
            }
        }
        self.voices.retain(|v| !v.finished);
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.voices.len())
            .field("max_voices", &self.max_voices)
            .field("oldest", &self.voices.first().map(|v| v.id))
            .finish()
    }
}
