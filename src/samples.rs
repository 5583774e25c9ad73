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
//! The sampled piano.
//!
//! This module provides:
//! - Sample loading and caching (in-memory for zero-latency playback)
//! - Nearest-sample lookup with pitch shifting
//! - Voice management with a global polyphony limit and release fades
//! - The engine that renders voices on the audio thread

use std::path::PathBuf;

mod engine;
mod loader;
mod voice;

pub use engine::{sampler, Instrument, LoadState};
pub use loader::SampleLoader;

/// Errors produced while loading samples.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("Unable to open sample {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to decode sample {path}: {source}")]
    Decode {
        path: PathBuf,
        source: symphonia::core::errors::Error,
    },

    #[error("No audio track found in {0}")]
    NoTrack(PathBuf),

    #[error("Sample {0} contains no audio")]
    Empty(PathBuf),

    #[error("None of the {0} piano samples could be loaded")]
    NoSamples(usize),
}
