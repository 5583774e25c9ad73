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
use serde::{Deserialize, Serialize};

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_BUFFER_SIZE: u32 = 512;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Audio {
    /// The output device. "default" picks the host's default output, names
    /// starting with "mock" render without hardware.
    device: Option<String>,

    /// Output sample rate in Hz. When unset, the device's preferred rate is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,

    /// Stream buffer size in frames. Lower values mean lower latency.
    buffer_size: Option<u32>,
}

impl Audio {
    /// New will create a new Audio configuration.
    #[cfg(test)]
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            sample_rate: None,
            buffer_size: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Overrides the configured device.
    pub fn set_device(&mut self, device: &str) {
        self.device = Some(device.to_string());
    }

    /// Returns the requested sample rate, if any. Zero counts as unset.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate.filter(|rate| *rate > 0)
    }

    #[cfg(test)]
    pub fn set_sample_rate(&mut self, sample_rate: Option<u32>) {
        self.sample_rate = sample_rate;
    }

    /// Returns the stream buffer size in frames (default: 512).
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE).max(1)
    }
}

impl Default for Audio {
    fn default() -> Self {
        Audio {
            device: Some(DEFAULT_DEVICE.to_string()),
            sample_rate: None,
            buffer_size: Some(DEFAULT_BUFFER_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_audio_deserialize() {
        let yaml = r#"
            device: mock-device
            sample_rate: 48000
            buffer_size: 256
        "#;

        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(audio.device(), "mock-device");
        assert_eq!(audio.sample_rate(), Some(48000));
        assert_eq!(audio.buffer_size(), 256);
    }

    #[test]
    fn test_audio_defaults() {
        let audio: Audio = Config::builder()
            .add_source(File::from_str("sample_rate: 44100", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(audio.device(), "default");
        assert_eq!(audio.sample_rate(), Some(44100));
        assert_eq!(audio.buffer_size(), 512);
    }

    #[test]
    fn test_zero_sample_rate_is_unset() {
        let audio: Audio = Config::builder()
            .add_source(File::from_str("sample_rate: 0", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(audio.sample_rate(), None);
    }

    #[test]
    fn test_set_device() {
        let mut audio = Audio::default();
        audio.set_device("mock");
        assert_eq!(audio.device(), "mock");
        assert_eq!(Audio::new("hw:1").device(), "hw:1");
    }
}
