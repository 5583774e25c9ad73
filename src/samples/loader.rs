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
//! Sample loading and caching.
//!
//! Samples are loaded entirely into memory before the piano accepts input so
//! that attacks never touch the disk.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

use super::SampleError;
use crate::notes::Note;

/// How far, in semitones, to look for a sample to pitch shift.
const MAX_INTERVAL: i16 = 96;

/// A loaded sample that can be played back.
/// The sample data is stored in an Arc for efficient sharing between voices.
#[derive(Clone)]
pub struct LoadedSample {
    /// The sample data as interleaved f32 samples.
    data: Arc<Vec<f32>>,
    /// Number of channels in the sample.
    channels: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl LoadedSample {
    /// Creates a sample from interleaved data.
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32) -> LoadedSample {
        LoadedSample {
            data: Arc::new(data),
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// Returns the length of the sample.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Reads a stereo frame at a fractional position, interpolating linearly
    /// between neighbouring frames. Mono samples are copied to both sides and
    /// channels past the second are ignored. Returns None past the end.
    pub fn stereo_at(&self, position: f64) -> Option<(f32, f32)> {
        if position < 0.0 {
            return None;
        }
        let frame = position.floor() as usize;
        let frames = self.frames();
        if frame >= frames {
            return None;
        }
        let next = (frame + 1).min(frames - 1);
        let frac = position.fract() as f32;

        let channels = self.channels as usize;
        let read = |frame: usize, channel: usize| self.data[frame * channels + channel];
        let right_channel = if channels > 1 { 1 } else { 0 };

        let left = read(frame, 0) + (read(next, 0) - read(frame, 0)) * frac;
        let right =
            read(frame, right_channel) + (read(next, right_channel) - read(frame, right_channel)) * frac;
        Some((left, right))
    }
}

impl std::fmt::Debug for LoadedSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSample")
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

/// The samples of the piano, keyed by the note they were recorded at.
#[derive(Clone, Debug, Default)]
pub struct SampleBank {
    samples: BTreeMap<Note, LoadedSample>,
    skipped: usize,
}

impl SampleBank {
    /// Creates an empty bank.
    pub fn new() -> SampleBank {
        SampleBank::default()
    }

    /// Adds a sample for the note, replacing any previous one.
    pub fn insert(&mut self, note: Note, sample: LoadedSample) {
        self.samples.insert(note, sample);
    }

    /// Returns the number of sampled notes.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no sample is loaded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the number of files that failed to load.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Returns the sampled notes, lowest first.
    #[cfg(test)]
    pub fn notes(&self) -> impl Iterator<Item = Note> + '_ {
        self.samples.keys().copied()
    }

    /// Finds the sample closest to the note along with the interval, in
    /// semitones, from the sample up to the note. Higher samples win ties, so
    /// a note halfway between two samples is pitched down.
    pub fn nearest(&self, note: Note) -> Option<(&LoadedSample, i32)> {
        let midi = i16::from(note.midi());
        for interval in 0..MAX_INTERVAL {
            for candidate in [midi + interval, midi - interval] {
                let found = u8::try_from(candidate)
                    .ok()
                    .and_then(Note::from_midi)
                    .and_then(|candidate| self.samples.get(&candidate).map(|s| (candidate, s)));
                if let Some((sampled, sample)) = found {
                    return Some((sample, sampled.interval_to(note)));
                }
            }
        }
        None
    }
}

/// Manages loading and caching of sample data.
pub struct SampleLoader {
    /// Cache of loaded samples by file path.
    cache: HashMap<PathBuf, LoadedSample>,
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Loads a sample from a file into memory.
    /// Returns a cached version if already loaded.
    pub fn load(&mut self, path: &Path) -> Result<LoadedSample, SampleError> {
        if let Some(sample) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(sample.clone());
        }

        let (samples, channels, source_sample_rate) = decode_file(path)?;
        if samples.is_empty() {
            return Err(SampleError::Empty(path.to_path_buf()));
        }

        let samples = if source_sample_rate != self.target_sample_rate {
            debug!(
                source_rate = source_sample_rate,
                target_rate = self.target_sample_rate,
                "Transcoding sample"
            );
            transcode(&samples, channels, source_sample_rate, self.target_sample_rate)
        } else {
            samples
        };

        let loaded = LoadedSample::new(samples, channels, self.target_sample_rate);
        info!(
            path = ?path,
            channels,
            sample_rate = self.target_sample_rate,
            duration_ms = loaded.duration().as_millis(),
            memory_kb = loaded.memory_size() / 1024,
            "Sample loaded"
        );

        self.cache.insert(path.to_path_buf(), loaded.clone());
        Ok(loaded)
    }

    /// Loads every file of the bank. Files that fail to load are logged and
    /// skipped; it is only an error if nothing loads at all.
    pub fn load_bank(&mut self, files: &[(Note, PathBuf)]) -> Result<SampleBank, SampleError> {
        let mut bank = SampleBank::new();
        for (note, path) in files {
            match self.load(path) {
                Ok(sample) => bank.insert(*note, sample),
                Err(e) => {
                    warn!(note = %note, path = ?path, err = %e, "Failed to load sample, skipping");
                    bank.skipped += 1;
                }
            }
        }

        if bank.is_empty() {
            return Err(SampleError::NoSamples(files.len()));
        }

        info!(
            loaded = bank.len(),
            skipped = bank.skipped(),
            memory_kb = self.total_memory_usage() / 1024,
            "Piano samples loaded"
        );
        Ok(bank)
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(|s| s.memory_size()).sum()
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes a whole file with symphonia, returning interleaved samples, the
/// channel count and the sample rate.
fn decode_file(path: &Path) -> Result<(Vec<f32>, u16, u32), SampleError> {
    let file = File::open(path).map_err(|source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decode_err = |source: SymphoniaError| SampleError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_err)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SampleError::NoTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_err)?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_err(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count() as u16;
                sample_rate = spec.rate;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // A corrupt packet costs a few milliseconds of audio, not the sample.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = ?path, err = e, "Skipping undecodable packet");
            }
            Err(e) => return Err(decode_err(e)),
        }
    }

    if channels == 0 || sample_rate == 0 {
        return Err(SampleError::Empty(path.to_path_buf()));
    }
    Ok((samples, channels, sample_rate))
}

/// Transcodes samples from one sample rate to another using linear interpolation.
fn transcode(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sine, write_wav};

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    fn bank_of(names: &[&str]) -> SampleBank {
        let mut bank = SampleBank::new();
        for name in names {
            bank.insert(note(name), LoadedSample::new(vec![0.0; 4], 1, 44100));
        }
        bank
    }

    #[test]
    fn test_transcode_samples() {
        let source_samples = sine(440.0, 44100, 4410, 1.0);
        let result = transcode(&source_samples, 1, 44100, 48000);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_transcode_stereo() {
        // Stereo: L=1.0, R=-1.0 alternating
        let source_samples = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let result = transcode(&source_samples, 2, 44100, 48000);

        assert!(result.len() >= 8);
        assert!((result[0] - 1.0).abs() < 0.1);
        assert!((result[1] - (-1.0)).abs() < 0.1);
    }

    #[test]
    fn test_nearest_exact_and_shifted() {
        let bank = bank_of(&["C4", "D#4", "F#4", "A4"]);

        let (_, interval) = bank.nearest(note("C4")).unwrap();
        assert_eq!(interval, 0);

        // C#4 is one above C4 and two below D#4.
        let (_, interval) = bank.nearest(note("C#4")).unwrap();
        assert_eq!(interval, 1);

        // D4 is equidistant; the higher sample is checked first.
        let (_, interval) = bank.nearest(note("D4")).unwrap();
        assert_eq!(interval, -1);

        // Far above the last sample.
        let (_, interval) = bank.nearest(note("C6")).unwrap();
        assert_eq!(interval, 15);
    }

    #[test]
    fn test_nearest_limits() {
        assert!(SampleBank::new().nearest(note("C4")).is_none());

        // 96 semitones away is out of reach.
        let bank = bank_of(&["C-1"]);
        assert!(bank.nearest(note("B6")).is_some());
        assert!(bank.nearest(note("C7")).is_none());
    }

    #[test]
    fn test_stereo_at_interpolates() {
        let mono = LoadedSample::new(vec![0.0, 1.0, 0.5], 1, 44100);
        assert_eq!(mono.frames(), 3);
        assert_eq!(mono.stereo_at(0.0), Some((0.0, 0.0)));
        assert_eq!(mono.stereo_at(0.5), Some((0.5, 0.5)));
        assert_eq!(mono.stereo_at(2.0), Some((0.5, 0.5)));
        assert_eq!(mono.stereo_at(3.0), None);

        let stereo = LoadedSample::new(vec![1.0, -1.0, 0.0, 0.0], 2, 44100);
        assert_eq!(stereo.stereo_at(0.5), Some((0.5, -0.5)));
    }

    #[test]
    fn test_load_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("C4.wav");
        write_wav(&path, &sine(261.63, 22050, 2205, 0.5), 1, 22050).unwrap();

        let mut loader = SampleLoader::new(44100);
        let sample = loader.load(&path).unwrap();
        assert_eq!(sample.channels(), 1);
        assert_eq!(sample.sample_rate(), 44100);
        assert!((sample.frames() as i64 - 4410).abs() <= 1);

        // Second load is served from the cache even if the file is gone.
        std::fs::remove_file(&path).unwrap();
        assert!(loader.load(&path).is_ok());
    }

    #[test]
    fn test_load_bank_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("A4.wav");
        write_wav(&good, &sine(440.0, 44100, 441, 0.5), 1, 44100).unwrap();
        let garbage = dir.path().join("C4.wav");
        std::fs::write(&garbage, b"not audio").unwrap();

        let mut loader = SampleLoader::new(44100);
        let bank = loader
            .load_bank(&[
                (note("A4"), good),
                (note("C4"), garbage),
                (note("C5"), dir.path().join("missing.wav")),
            ])
            .unwrap();

        assert_eq!(bank.len(), 1);
        assert_eq!(bank.skipped(), 2);
        assert_eq!(bank.notes().collect::<Vec<_>>(), vec![note("A4")]);
    }

    #[test]
    fn test_load_bank_nothing_loads() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = SampleLoader::new(44100);
        let result = loader.load_bank(&[(note("A4"), dir.path().join("missing.wav"))]);
        assert!(matches!(result, Err(SampleError::NoSamples(1))));
    }
}
