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
use std::{error::Error, fmt, thread};

use tracing::info;

use crate::config;
use crate::playsync::CancelHandle;

pub mod cpal;
pub mod mock;

/// Fills output blocks on the audio thread.
pub trait Renderer: Send + 'static {
    /// Renders interleaved samples for `channels` output channels into `out`.
    fn render(&mut self, out: &mut [f32], channels: usize);
}

pub trait Device: fmt::Display + Send + Sync {
    /// The rate the device renders at. Samples are transcoded to this rate.
    fn sample_rate(&self) -> u32;

    /// The number of output channels.
    fn channels(&self) -> u16;

    /// Starts rendering from the renderer until the returned output is dropped.
    fn start(&self, renderer: Box<dyn Renderer>) -> Result<Output, Box<dyn Error>>;
}

/// A running output stream. Dropping it stops the stream and joins its thread.
pub struct Output {
    description: String,
    cancel_handle: CancelHandle,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl Output {
    fn new(
        description: String,
        cancel_handle: CancelHandle,
        join_handle: thread::JoinHandle<()>,
    ) -> Output {
        Output {
            description,
            cancel_handle,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.cancel_handle.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.join();
        }
        info!(device = self.description, "Audio output stopped");
    }
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the device named in the configuration.
pub fn get_device(config: &config::Audio) -> Result<Box<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Box::new(mock::Device::get(config)));
    };

    Ok(Box::new(cpal::Device::get(config)?))
}
