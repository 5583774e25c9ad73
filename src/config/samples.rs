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
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::parse_duration;
use crate::notes::Note;

/// Default maximum number of concurrent sample voices globally.
pub const DEFAULT_MAX_SAMPLE_VOICES: usize = 32;

/// Default directory the sample files are resolved against.
const DEFAULT_DIRECTORY: &str = "samples";

/// Default master volume in decibels.
const DEFAULT_VOLUME_DB: f32 = 0.0;

/// Default attack ramp.
const DEFAULT_ATTACK: &str = "0ms";

/// Default release fade.
const DEFAULT_RELEASE: &str = "100ms";

/// Default velocity for every key press.
const DEFAULT_VELOCITY: f32 = 1.0;

/// Pitch classes sampled in every full octave: C, D#, F# and A.
const SAMPLED_PITCHES: [&str; 4] = ["C", "D#", "F#", "A"];

/// Shape of the release fade.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseCurve {
    /// Gain falls off exponentially, reaching -60 dB at the end of the release.
    #[default]
    Exponential,
    /// Gain falls off in a straight line.
    Linear,
}

/// A YAML representation of the sample bank and the sampler settings.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Samples {
    /// The directory that sample files are resolved against.
    directory: Option<PathBuf>,

    /// Note name to sample file.
    files: Option<BTreeMap<String, String>>,

    /// Master volume in decibels.
    volume: Option<f32>,

    /// Attack ramp, e.g. "5ms".
    attack: Option<String>,

    /// Release fade, e.g. "100ms".
    release: Option<String>,

    /// Release fade shape.
    curve: Option<ReleaseCurve>,

    /// Maximum number of concurrent voices.
    max_voices: Option<usize>,

    /// Velocity used for every key press, 0.0 to 1.0.
    velocity: Option<f32>,
}

impl Samples {
    /// Returns the directory that sample files are resolved against.
    pub fn directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY))
    }

    /// Overrides the sample directory.
    pub fn set_directory(&mut self, directory: &Path) {
        self.directory = Some(directory.to_path_buf());
    }

    /// Resolves the sample files to notes and absolute paths, lowest note first.
    pub fn files(&self) -> Result<Vec<(Note, PathBuf)>, ConfigError> {
        let directory = self.directory();
        let defaults;
        let files = match &self.files {
            Some(files) => files,
            None => {
                defaults = default_files();
                &defaults
            }
        };

        let mut resolved = files
            .iter()
            .map(|(name, file)| Ok((name.parse::<Note>()?, directory.join(file))))
            .collect::<Result<Vec<(Note, PathBuf)>, ConfigError>>()?;
        resolved.sort_by_key(|(note, _)| *note);
        Ok(resolved)
    }

    /// Returns the master volume in decibels (default: 0 dB).
    pub fn volume_db(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME_DB)
    }

    /// Returns the attack ramp (default: none).
    pub fn attack(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.attack.as_deref(), DEFAULT_ATTACK)
    }

    /// Returns the release fade (default: 100ms).
    pub fn release(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.release.as_deref(), DEFAULT_RELEASE)
    }

    /// Returns the release curve (default: exponential).
    pub fn curve(&self) -> ReleaseCurve {
        self.curve.unwrap_or_default()
    }

    /// Returns the global voice limit (default: 32).
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_SAMPLE_VOICES).max(1)
    }

    /// Returns the key press velocity, clamped to 0.0..=1.0 (default: 1.0).
    pub fn velocity(&self) -> f32 {
        self.velocity.unwrap_or(DEFAULT_VELOCITY).clamp(0.0, 1.0)
    }
}

impl Default for Samples {
    fn default() -> Self {
        Samples {
            directory: Some(PathBuf::from(DEFAULT_DIRECTORY)),
            files: Some(default_files()),
            volume: Some(DEFAULT_VOLUME_DB),
            attack: Some(DEFAULT_ATTACK.to_string()),
            release: Some(DEFAULT_RELEASE.to_string()),
            curve: Some(ReleaseCurve::default()),
            max_voices: Some(DEFAULT_MAX_SAMPLE_VOICES),
            velocity: Some(DEFAULT_VELOCITY),
        }
    }
}

/// The stock piano bank: A0, then C, D#, F# and A of octaves 1 to 7, then C8.
/// Sharps are spelled with an 's' in file names, so D#1 lives in Ds1.mp3.
pub fn default_files() -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert("A0".to_string(), "A0.mp3".to_string());
    for octave in 1..=7 {
        for pitch in SAMPLED_PITCHES {
            let name = format!("{}{}", pitch, octave);
            let file = format!("{}.mp3", name.replace('#', "s"));
            files.insert(name, file);
        }
    }
    files.insert("C8".to_string(), "C8.mp3".to_string());
    files
}
