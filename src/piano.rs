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
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, span, warn, Level};

use crate::keymap::KeyMap;
use crate::notes::Note;
use crate::recorder::{self, Recorder, RecorderError, Recording};
use crate::samples::{Instrument, LoadState};

/// The piano maps key and mouse input to the instrument and owns the
/// recording lifecycle.
pub struct Piano<I: Instrument> {
    /// What the piano plays.
    instrument: I,
    /// Computer keys to notes.
    keymap: KeyMap,
    /// Computer keys currently held down.
    pressed: HashSet<char>,
    /// The note held with the mouse.
    mouse_note: Option<Note>,
    /// Captures the instrument output.
    recorder: Recorder,
    /// The last finished take.
    recording: Option<Recording>,
    /// Where downloads are written.
    recordings_dir: PathBuf,
    /// Location of the last download of the current take.
    last_saved: Option<String>,
    /// A message for the user.
    status: Option<String>,
}

impl<I: Instrument> Piano<I> {
    /// Creates a new piano.
    pub fn new(instrument: I, keymap: KeyMap, recorder: Recorder, recordings_dir: &Path) -> Self {
        Piano {
            instrument,
            keymap,
            pressed: HashSet::new(),
            mouse_note: None,
            recorder,
            recording: None,
            recordings_dir: recordings_dir.to_path_buf(),
            last_saved: None,
            status: None,
        }
    }

    /// Returns the state of the instrument's samples.
    pub fn load_state(&self) -> LoadState {
        self.instrument.load_state()
    }

    /// Returns true once the piano responds to input.
    pub fn is_loaded(&self) -> bool {
        self.instrument.is_loaded()
    }

    /// A computer key was pressed. Repeats of a held key and unmapped keys are
    /// ignored. Returns true if a note was started.
    pub fn key_down(&mut self, key: char) -> bool {
        if !self.is_loaded() || self.pressed.contains(&key) {
            return false;
        }
        let Some(note) = self.keymap.note_for(key) else {
            return false;
        };

        debug!(key = %key, note = %note, "Key down");
        self.instrument.trigger_attack(note);
        self.pressed.insert(key);
        true
    }

    /// A computer key was released. Returns true if a note was released.
    pub fn key_up(&mut self, key: char) -> bool {
        if !self.pressed.contains(&key) {
            return false;
        }
        let Some(note) = self.keymap.note_for(key) else {
            return false;
        };

        debug!(key = %key, note = %note, "Key up");
        self.instrument.trigger_release(note);
        self.pressed.remove(&key);
        true
    }

    /// Returns true if the computer key is held.
    #[cfg(test)]
    pub fn is_pressed(&self, key: char) -> bool {
        self.pressed.contains(&key)
    }

    /// The mouse button went down on a piano key.
    pub fn mouse_down(&mut self, note: Note) {
        if !self.is_loaded() {
            return;
        }
        debug!(note = %note, "Mouse down");
        self.instrument.trigger_attack(note);
        self.mouse_note = Some(note);
    }

    /// The mouse button went up over a piano key.
    pub fn mouse_up(&mut self, note: Note) {
        if !self.is_loaded() {
            return;
        }
        debug!(note = %note, "Mouse up");
        self.instrument.trigger_release(note);
        if self.mouse_note == Some(note) {
            self.mouse_note = None;
        }
    }

    /// The pointer left a piano key with the button down. Entering another key
    /// does not start it.
    pub fn mouse_out(&mut self, note: Note) {
        if !self.is_loaded() {
            return;
        }
        debug!(note = %note, "Mouse out");
        self.instrument.trigger_release(note);
        if self.mouse_note == Some(note) {
            self.mouse_note = None;
        }
    }

    /// Returns the note held with the mouse.
    pub fn mouse_note(&self) -> Option<Note> {
        self.mouse_note
    }

    /// Lets go of everything, as when the window loses focus.
    pub fn release_all(&mut self) {
        if self.pressed.is_empty() && self.mouse_note.is_none() {
            return;
        }
        info!(
            keys = self.pressed.len(),
            mouse = self.mouse_note.is_some(),
            "Releasing all notes"
        );
        self.pressed.clear();
        self.mouse_note = None;
        self.instrument.release_all();
    }

    /// Returns the notes currently held by keys or the mouse.
    pub fn held_notes(&self) -> BTreeSet<Note> {
        self.pressed
            .iter()
            .filter_map(|key| self.keymap.note_for(*key))
            .chain(self.mouse_note)
            .collect()
    }

    /// Starts a take, or stops the running one and keeps it as the current
    /// recording.
    pub fn toggle_recording(&mut self) -> Result<(), RecorderError> {
        let span = span!(Level::INFO, "recording");
        let _enter = span.enter();

        if self.recorder.is_recording() {
            let recording = self.recorder.stop()?;
            self.status = Some(format!(
                "Recorded {}",
                format_duration(recording.duration())
            ));
            self.recording = Some(recording);
            self.last_saved = None;
        } else {
            self.recorder.start()?;
            self.status = Some("Recording...".to_string());
        }
        Ok(())
    }

    /// Returns true while a take is running.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Returns how long the running take has been going.
    pub fn recording_elapsed(&self) -> Option<Duration> {
        self.recorder.elapsed()
    }

    /// Returns the current recording.
    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// Writes the current recording to the recordings directory and returns
    /// its path.
    pub fn download(&mut self) -> Result<PathBuf, RecorderError> {
        let Some(recording) = self.recording.as_ref() else {
            return Err(RecorderError::NoRecording);
        };

        let path = recording.save_to(&self.recordings_dir)?;
        let url = recorder::file_url(&path);
        self.status = Some(format!("Saved {}", url));
        self.last_saved = Some(url);
        Ok(path)
    }

    /// Returns where the current recording was last downloaded to.
    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    /// Throws away the current recording.
    pub fn discard(&mut self) {
        if self.recording.take().is_some() {
            info!("Recording discarded");
            self.last_saved = None;
            self.status = Some("Recording discarded".to_string());
        }
    }

    /// Returns the current status message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Replaces the status message.
    pub fn set_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        warn!(status = %status, "Piano status");
        self.status = Some(status);
    }

    #[cfg(test)]
    pub fn instrument(&self) -> &I {
        &self.instrument
    }
}

/// Formats a duration as minutes, seconds and tenths, e.g. `1:05.3`.
pub fn format_duration(duration: Duration) -> String {
    let tenths = duration.as_millis() / 100;
    format!(
        "{}:{:02}.{}",
        tenths / 600,
        (tenths / 10) % 60,
        tenths % 10
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::recorder::Tap;
    use crate::testutil::{Call, MockInstrument};

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    fn loaded() -> LoadState {
        MockInstrument::loaded().load_state()
    }

    fn piano(state: LoadState, dir: &Path) -> (Piano<MockInstrument>, Arc<Tap>) {
        let tap = Tap::new(2, 1000);
        let piano = Piano::new(
            MockInstrument::new(state),
            KeyMap::default(),
            Recorder::new(tap.clone()),
            dir,
        );
        (piano, tap)
    }

    #[test]
    fn test_key_down_and_up() {
        let (mut piano, _) = piano(loaded(), Path::new("."));

        assert!(piano.key_down('z'));
        assert!(piano.is_pressed('z'));
        assert_eq!(piano.held_notes(), BTreeSet::from([note("C3")]));
        assert!(piano.key_up('z'));
        assert!(!piano.is_pressed('z'));

        assert_eq!(
            piano.instrument().take_calls(),
            vec![Call::Attack(note("C3")), Call::Release(note("C3"))]
        );
    }

    #[test]
    fn test_auto_repeat_attacks_once() {
        let (mut piano, _) = piano(loaded(), Path::new("."));

        assert!(piano.key_down('q'));
        assert!(!piano.key_down('q'));
        assert!(!piano.key_down('q'));
        assert!(piano.key_up('q'));
        assert!(!piano.key_up('q'));

        assert_eq!(
            piano.instrument().take_calls(),
            vec![Call::Attack(note("F4")), Call::Release(note("F4"))]
        );
    }

    #[test]
    fn test_unmapped_keys_are_ignored() {
        let (mut piano, _) = piano(loaded(), Path::new("."));

        assert!(!piano.key_down('Z'));
        assert!(!piano.key_down('a'));
        assert!(!piano.key_up('a'));
        assert!(!piano.is_pressed('a'));
        assert!(piano.instrument().take_calls().is_empty());
    }

    #[test]
    fn test_input_ignored_until_loaded() {
        let dir = Path::new(".");
        for state in [LoadState::Loading, LoadState::Failed("nope".to_string())] {
            let (mut piano, _) = piano(state, dir);
            assert!(!piano.key_down('z'));
            assert!(!piano.key_up('z'));
            piano.mouse_down(note("C4"));
            piano.mouse_up(note("C4"));
            assert!(piano.held_notes().is_empty());
            assert!(piano.instrument().take_calls().is_empty());
        }

        let (mut piano, _) = piano(LoadState::Loading, dir);
        piano.instrument().set_state(loaded());
        assert!(piano.key_down('z'));
    }

    #[test]
    fn test_mouse() {
        let (mut piano, _) = piano(loaded(), Path::new("."));

        piano.mouse_down(note("A0"));
        assert_eq!(piano.mouse_note(), Some(note("A0")));
        assert_eq!(piano.held_notes(), BTreeSet::from([note("A0")]));
        piano.mouse_up(note("A0"));
        assert_eq!(piano.mouse_note(), None);

        piano.mouse_down(note("C4"));
        piano.mouse_out(note("C4"));
        assert_eq!(piano.mouse_note(), None);

        assert_eq!(
            piano.instrument().take_calls(),
            vec![
                Call::Attack(note("A0")),
                Call::Release(note("A0")),
                Call::Attack(note("C4")),
                Call::Release(note("C4")),
            ]
        );
    }

    #[test]
    fn test_key_and_mouse_on_same_note() {
        let (mut piano, _) = piano(loaded(), Path::new("."));

        piano.key_down(',');
        piano.mouse_down(note("C4"));
        assert_eq!(piano.held_notes(), BTreeSet::from([note("C4")]));
        piano.key_up(',');
        assert_eq!(piano.held_notes(), BTreeSet::from([note("C4")]));

        assert_eq!(
            piano.instrument().take_calls(),
            vec![
                Call::Attack(note("C4")),
                Call::Attack(note("C4")),
                Call::Release(note("C4")),
            ]
        );
    }

    #[test]
    fn test_release_all() {
        let (mut piano, _) = piano(loaded(), Path::new("."));

        // Nothing held, nothing to do.
        piano.release_all();
        assert!(piano.instrument().take_calls().is_empty());

        piano.key_down('z');
        piano.key_down('x');
        piano.mouse_down(note("C6"));
        piano.instrument().take_calls();

        piano.release_all();
        assert!(piano.held_notes().is_empty());
        assert_eq!(piano.instrument().take_calls(), vec![Call::ReleaseAll]);

        // The keys can be played again after a release.
        assert!(piano.key_down('z'));
    }

    #[test]
    fn test_recording_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut piano, tap) = piano(loaded(), dir.path());

        assert!(matches!(piano.download(), Err(RecorderError::NoRecording)));

        piano.toggle_recording().unwrap();
        assert!(piano.is_recording());
        assert!(piano.recording_elapsed().is_some());
        tap.capture(&[0.5; 2000]);
        piano.toggle_recording().unwrap();

        assert!(!piano.is_recording());
        let recording = piano.recording().unwrap();
        assert_eq!(recording.duration(), Duration::from_secs(1));
        assert_eq!(piano.status(), Some("Recorded 0:01.0"));

        let path = piano.download().unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
        let saved = piano.last_saved().unwrap();
        assert!(saved.starts_with("file://"));

        piano.discard();
        assert!(piano.recording().is_none());
        assert!(piano.last_saved().is_none());
        assert!(matches!(piano.download(), Err(RecorderError::NoRecording)));
    }

    #[test]
    fn test_new_take_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let (mut piano, tap) = piano(loaded(), dir.path());

        piano.toggle_recording().unwrap();
        tap.capture(&[0.1; 200]);
        piano.toggle_recording().unwrap();
        piano.download().unwrap();

        piano.toggle_recording().unwrap();
        // The previous take stays available while the next one runs.
        assert!(piano.recording().is_some());
        tap.capture(&[0.1; 1000]);
        piano.toggle_recording().unwrap();

        assert_eq!(
            piano.recording().unwrap().duration(),
            Duration::from_millis(500)
        );
        assert!(piano.last_saved().is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0:00.0");
        assert_eq!(format_duration(Duration::from_millis(1250)), "0:01.2");
        assert_eq!(format_duration(Duration::from_secs(65)), "1:05.0");
        assert_eq!(format_duration(Duration::from_secs(600)), "10:00.0");
    }
}
