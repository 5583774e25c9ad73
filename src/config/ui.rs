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
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::parse_duration;

const DEFAULT_TITLE_FADE_AFTER: &str = "5s";
const DEFAULT_TITLE_FADE_LENGTH: &str = "1s";
const DEFAULT_KEY_HOLD: &str = "600ms";

/// A YAML representation of the terminal front end settings.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Ui {
    /// How long the title stays up before it starts fading.
    title_fade_after: Option<String>,

    /// How long the title takes to fade out.
    title_fade_length: Option<String>,

    /// On terminals that do not report key releases, a key is released once
    /// it has not been seen for this long.
    key_hold: Option<String>,
}

impl Ui {
    /// Returns the delay before the title fades (default: 5s).
    pub fn title_fade_after(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.title_fade_after.as_deref(), DEFAULT_TITLE_FADE_AFTER)
    }

    /// Returns the length of the title fade (default: 1s).
    pub fn title_fade_length(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.title_fade_length.as_deref(), DEFAULT_TITLE_FADE_LENGTH)
    }

    /// Returns the synthesized key release timeout (default: 600ms).
    pub fn key_hold(&self) -> Result<Duration, ConfigError> {
        parse_duration(self.key_hold.as_deref(), DEFAULT_KEY_HOLD)
    }
}

impl Default for Ui {
    fn default() -> Self {
        Ui {
            title_fade_after: Some(DEFAULT_TITLE_FADE_AFTER.to_string()),
            title_fade_length: Some(DEFAULT_TITLE_FADE_LENGTH.to_string()),
            key_hold: Some(DEFAULT_KEY_HOLD.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_defaults() {
        let ui = Ui::default();
        assert_eq!(ui.title_fade_after().unwrap(), Duration::from_secs(5));
        assert_eq!(ui.title_fade_length().unwrap(), Duration::from_secs(1));
        assert_eq!(ui.key_hold().unwrap(), Duration::from_millis(600));
    }
}
