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

use config::{Config, File};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::keymap::KeyMap;

mod audio;
mod error;
mod samples;
mod ui;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::samples::{ReleaseCurve, Samples};
pub use self::ui::Ui;

/// Default directory that downloaded recordings are written to.
const DEFAULT_RECORDINGS: &str = ".";

/// The configuration for the piano.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Piano {
    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,

    /// The sample bank and sampler settings.
    #[serde(default)]
    samples: Samples,

    /// Extra or replacement key bindings, from key to note name.
    #[serde(default)]
    keymap: BTreeMap<String, String>,

    /// Where downloaded recordings are written.
    recordings: Option<PathBuf>,

    /// Terminal front end settings.
    #[serde(default)]
    ui: Ui,
}

impl Piano {
    /// Deserializes a file from the path into a piano configuration struct.
    pub fn deserialize(path: &Path) -> Result<Piano, ConfigError> {
        let piano = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Piano>()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(piano)
    }

    /// Loads the configuration at the path, or the defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Piano, ConfigError> {
        match path {
            Some(path) => Piano::deserialize(path),
            None => Ok(Piano::default()),
        }
    }

    /// Renders the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns a mutable audio configuration for command line overrides.
    pub fn audio_mut(&mut self) -> &mut Audio {
        &mut self.audio
    }

    /// Returns the sampler configuration.
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Returns a mutable sampler configuration for command line overrides.
    pub fn samples_mut(&mut self) -> &mut Samples {
        &mut self.samples
    }

    /// Builds the key map: the stock layout with the configured overrides applied.
    pub fn keymap(&self) -> Result<KeyMap, ConfigError> {
        let overrides = self
            .keymap
            .iter()
            .map(|(key, note)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok((c, note.as_str())),
                    _ => Err(ConfigError::InvalidKey(key.clone())),
                }
            })
            .collect::<Result<Vec<(char, &str)>, ConfigError>>()?;

        let mut keymap = KeyMap::default();
        keymap.apply_overrides(overrides)?;
        Ok(keymap)
    }

    /// Returns the recordings directory (default: the working directory).
    pub fn recordings(&self) -> PathBuf {
        self.recordings
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDINGS))
    }

    /// Overrides the recordings directory.
    pub fn set_recordings(&mut self, recordings: &Path) {
        self.recordings = Some(recordings.to_path_buf());
    }

    /// Returns the front end configuration.
    pub fn ui(&self) -> &Ui {
        &self.ui
    }
}

impl Default for Piano {
    fn default() -> Self {
        Piano {
            audio: Audio::default(),
            samples: Samples::default(),
            keymap: BTreeMap::new(),
            recordings: Some(PathBuf::from(DEFAULT_RECORDINGS)),
            ui: Ui::default(),
        }
    }
}

/// Parses an optional human readable duration, falling back to the default.
fn parse_duration(value: Option<&str>, default: &str) -> Result<Duration, ConfigError> {
    let value = value.unwrap_or(default);
    DurationString::from_string(value.to_string())
        .map(Duration::from)
        .map_err(|e| ConfigError::Duration {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::notes::NoteError;

    #[test]
    fn test_piano_deserialize() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
audio:
  device: mock-device
samples:
  directory: /srv/piano
  release: 200ms
keymap:
  a: C2
recordings: /tmp/takes
ui:
  key_hold: 1s
"#
        )
        .unwrap();

        let piano = Piano::deserialize(file.path()).unwrap();
        assert_eq!(piano.audio().device(), "mock-device");
        assert_eq!(piano.samples().directory(), PathBuf::from("/srv/piano"));
        assert_eq!(
            piano.samples().release().unwrap(),
            Duration::from_millis(200)
        );
        assert_eq!(piano.recordings(), PathBuf::from("/tmp/takes"));
        assert_eq!(piano.ui().key_hold().unwrap(), Duration::from_secs(1));

        let keymap = piano.keymap().unwrap();
        assert_eq!(keymap.note_for('a').map(|n| n.to_string()), Some("C2".into()));
        assert_eq!(keymap.note_for('z').map(|n| n.to_string()), Some("C3".into()));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Piano::deserialize(Path::new("/nonexistent/piano.yaml")),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_load_defaults() {
        let piano = Piano::load(None).unwrap();
        assert_eq!(piano.audio().device(), "default");
        assert_eq!(piano.recordings(), PathBuf::from("."));
        assert_eq!(piano.keymap().unwrap().bindings().len(), 38);
    }

    #[test]
    fn test_invalid_keymap_key() {
        let mut piano = Piano::default();
        piano.keymap.insert("ab".to_string(), "C4".to_string());
        assert!(matches!(piano.keymap(), Err(ConfigError::InvalidKey(_))));

        let mut piano = Piano::default();
        piano.keymap.insert("a".to_string(), "Q4".to_string());
        assert!(matches!(piano.keymap(), Err(ConfigError::Note(_))));

        let mut piano = Piano::default();
        piano.keymap.insert("a".to_string(), "C5461".to_string());
        assert!(matches!(
            piano.keymap(),
            Err(ConfigError::Note(NoteError::OutOfRange(_)))
        ));
    }

    #[test]
    fn test_default_config_round_trips() {
        let yaml = Piano::default().to_yaml().unwrap();
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let piano = Piano::deserialize(file.path()).unwrap();
        assert_eq!(piano.samples().files().unwrap().len(), 30);
        assert_eq!(piano.ui().title_fade_after().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_overrides() {
        let mut piano = Piano::default();
        piano.audio_mut().set_device("mock");
        piano.samples_mut().set_directory(Path::new("/x"));
        piano.set_recordings(Path::new("/y"));
        assert_eq!(piano.audio().device(), "mock");
        assert_eq!(piano.samples().directory(), PathBuf::from("/x"));
        assert_eq!(piano.recordings(), PathBuf::from("/y"));
    }
}
