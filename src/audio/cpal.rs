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

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, warn, Level};

use super::{Output, Renderer};
use crate::{config, playsync::CancelHandle};

/// A small wrapper around a cpal::Device with the stream settings resolved
/// from the configuration.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The output channel count.
    channels: u16,
    /// The output sample rate.
    sample_rate: u32,
    /// The native sample format of the device.
    sample_format: cpal::SampleFormat,
    /// Requested buffer size in frames.
    buffer_size: u32,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.channels,
            self.host_id.name()
        )
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn super::Device> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices that can play audio.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                if let Some(device) = Device::from_cpal(host_id, device, None, None) {
                    devices.push(device);
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Wraps a cpal device, taking its default output format unless a sample
    /// rate is requested. Returns None for devices that cannot play audio.
    fn from_cpal(
        host_id: cpal::HostId,
        device: cpal::Device,
        sample_rate: Option<u32>,
        buffer_size: Option<u32>,
    ) -> Option<Device> {
        let name = device.name().ok()?;
        let default_config = device.default_output_config().ok()?;
        Some(Device {
            name,
            host_id,
            channels: default_config.channels(),
            sample_rate: sample_rate.unwrap_or(default_config.sample_rate().0),
            sample_format: default_config.sample_format(),
            buffer_size: buffer_size.unwrap_or(0),
            device,
        })
    }

    /// Gets the given cpal device. "default" is the default output of the default host.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let sample_rate = config.sample_rate();
        let buffer_size = Some(config.buffer_size());

        let device = if name == "default" {
            let _shh_stdout = shh::stdout()?;
            let _shh_stderr = shh::stderr()?;
            let host = cpal::default_host();
            host.default_output_device()
                .and_then(|device| Device::from_cpal(host.id(), device, sample_rate, buffer_size))
        } else {
            Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
                .map(|mut device| {
                    device.sample_rate = sample_rate.unwrap_or(device.sample_rate);
                    device.buffer_size = config.buffer_size();
                    device
                })
        };

        match device {
            Some(device) => {
                info!(
                    device = device.name,
                    sample_rate = device.sample_rate,
                    channels = device.channels,
                    format = ?device.sample_format,
                    "Found audio device"
                );
                Ok(device)
            }
            None => Err(format!("no device found with name {}", name).into()),
        }
    }

    fn stream_config(&self, buffer_size: cpal::BufferSize) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size,
        }
    }

    /// Builds the output stream in the device's native sample format. A fixed
    /// buffer size is tried first, then the backend default.
    fn build_stream(&self, renderer: Box<dyn Renderer>) -> Result<cpal::Stream, Box<dyn Error>> {
        let mut renderer = Some(renderer);
        let mut attempts = Vec::new();
        if self.buffer_size > 0 {
            attempts.push(cpal::BufferSize::Fixed(self.buffer_size));
        }
        attempts.push(cpal::BufferSize::Default);

        let mut last_error: Option<Box<dyn Error>> = None;
        for buffer_size in attempts {
            let config = self.stream_config(buffer_size);
            let Some(current) = renderer.take() else {
                break;
            };
            let result = match self.sample_format {
                cpal::SampleFormat::F32 => build::<f32>(&self.device, &config, current),
                cpal::SampleFormat::I16 => build::<i16>(&self.device, &config, current),
                cpal::SampleFormat::U16 => build::<u16>(&self.device, &config, current),
                cpal::SampleFormat::I32 => build::<i32>(&self.device, &config, current),
                other => return Err(format!("unsupported sample format {}", other).into()),
            };
            match result {
                Ok(stream) => return Ok(stream),
                Err((e, returned)) => {
                    warn!(
                        err = e.to_string(),
                        buffer_size = ?buffer_size,
                        "Unable to build output stream"
                    );
                    renderer = returned;
                    last_error = Some(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| "unable to build output stream".into()))
    }
}

/// Builds a stream converting the renderer's f32 output to the device format.
/// If the stream cannot be built the renderer is handed back for another try.
fn build<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    renderer: Box<dyn Renderer>,
) -> Result<cpal::Stream, (cpal::BuildStreamError, Option<Box<dyn Renderer>>)>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    // cpal consumes the callback even when building fails, so keep the
    // renderer behind a shared slot the failure path can take it back from.
    let slot = std::sync::Arc::new(parking_lot::Mutex::new(Some(renderer)));
    let callback_slot = slot.clone();
    let channels = config.channels as usize;
    let mut scratch: Vec<f32> = Vec::new();

    let result = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            scratch.fill(0.0);
            if let Some(renderer) = callback_slot.lock().as_mut() {
                renderer.render(&mut scratch, channels);
            }
            for (dst, src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(*src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    );

    result.map_err(|e| (e, slot.lock().take()))
}

impl super::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn start(&self, renderer: Box<dyn Renderer>) -> Result<Output, Box<dyn Error>> {
        let span = span!(Level::INFO, "audio output (cpal)");
        let _enter = span.enter();

        let cancel_handle = CancelHandle::new();
        let (started_tx, started_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        // cpal streams are not Send, so the stream is built and kept inside its own thread.
        let device = Device {
            name: self.name.clone(),
            host_id: self.host_id,
            device: self.device.clone(),
            channels: self.channels,
            sample_rate: self.sample_rate,
            sample_format: self.sample_format,
            buffer_size: self.buffer_size,
        };
        let thread_cancel_handle = cancel_handle.clone();
        let join_handle = thread::spawn(move || {
            let stream = match device.build_stream(renderer) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = started_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = started_tx.send(Err(e.to_string()));
                return;
            }
            let _ = started_tx.send(Ok(()));

            thread_cancel_handle.wait();
            drop(stream);
        });

        match started_rx.recv() {
            Ok(Ok(())) => {
                info!(device = self.name, "CPAL output stream started successfully");
                Ok(Output::new(self.to_string(), cancel_handle, join_handle))
            }
            Ok(Err(e)) => {
                let _ = join_handle.join();
                Err(format!("unable to start output on {}: {}", self.name, e).into())
            }
            Err(_) => {
                let _ = join_handle.join();
                Err(format!("output thread for {} exited unexpectedly", self.name).into())
            }
        }
    }
}
