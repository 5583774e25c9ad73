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
use std::{error::Error, fmt, thread, time::Duration};

use tracing::{info, span, Level};

use super::{Output, Renderer};
use crate::{config, playsync::CancelHandle};

/// The rate used when the configuration doesn't name one.
const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// A mock device. Pulls blocks from the renderer on a timer and throws them away.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    channels: u16,
    buffer_size: u32,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(config: &config::Audio) -> Device {
        Device {
            name: config.device().to_string(),
            sample_rate: config.sample_rate().unwrap_or(DEFAULT_SAMPLE_RATE),
            channels: 2,
            buffer_size: config.buffer_size().max(1),
        }
    }

    /// How long one block lasts at the device rate.
    fn period(&self) -> Duration {
        Duration::from_nanos(self.buffer_size as u64 * 1_000_000_000 / self.sample_rate as u64)
    }
}

impl super::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&self, mut renderer: Box<dyn Renderer>) -> Result<Output, Box<dyn Error>> {
        let span = span!(Level::INFO, "audio output (mock)");
        let _enter = span.enter();

        info!(
            device = self.name,
            sample_rate = self.sample_rate,
            buffer_size = self.buffer_size,
            "Starting mock output"
        );

        let cancel_handle = CancelHandle::new();
        let join_handle = {
            let cancel_handle = cancel_handle.clone();
            let channels = self.channels as usize;
            let period = self.period();
            let mut block = vec![0.0f32; self.buffer_size as usize * channels];
            thread::spawn(move || {
                while !cancel_handle.wait_timeout(period) {
                    block.fill(0.0);
                    renderer.render(&mut block, channels);
                }
            })
        };

        Ok(Output::new(self.to_string(), cancel_handle, join_handle))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
