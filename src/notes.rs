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

//! Note names in scientific pitch notation and their MIDI numbers.

use std::fmt;
use std::str::FromStr;

/// Sharp-based names for the twelve pitch classes, starting at C.
const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Errors produced while parsing a note name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("empty note name")]
    Empty,

    #[error("invalid note letter in '{0}'")]
    InvalidLetter(String),

    #[error("invalid octave in '{0}'")]
    InvalidOctave(String),

    #[error("note '{0}' is outside the MIDI range")]
    OutOfRange(String),
}

/// A single pitch, stored as its MIDI note number (C4 = 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note(u8);

impl Note {
    /// Creates a note from a MIDI note number. Returns None above 127.
    pub fn from_midi(midi: u8) -> Option<Note> {
        if midi <= 127 {
            Some(Note(midi))
        } else {
            None
        }
    }

    /// Creates a note from a pitch class (0 = C) and octave.
    pub fn from_parts(pitch_class: u8, octave: i8) -> Option<Note> {
        if pitch_class > 11 {
            return None;
        }
        let midi = 12 * (i16::from(octave) + 1) + i16::from(pitch_class);
        u8::try_from(midi).ok().and_then(Note::from_midi)
    }

    /// Returns the MIDI note number.
    pub fn midi(&self) -> u8 {
        self.0
    }

    /// Returns the pitch class, 0 (C) through 11 (B).
    pub fn pitch_class(&self) -> u8 {
        self.0 % 12
    }

    /// Returns the octave in scientific pitch notation.
    pub fn octave(&self) -> i8 {
        (self.0 / 12) as i8 - 1
    }

    /// Returns true for the five accidentals of each octave.
    pub fn is_black(&self) -> bool {
        matches!(self.pitch_class(), 1 | 3 | 6 | 8 | 10)
    }

    /// Returns the number of semitones from this note to the other.
    pub fn interval_to(&self, other: Note) -> i32 {
        i32::from(other.0) - i32::from(self.0)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            PITCH_NAMES[self.pitch_class() as usize],
            self.octave()
        )
    }
}

impl FromStr for Note {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let mut chars = name.chars();
        let letter = chars.next().ok_or(NoteError::Empty)?;

        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(NoteError::InvalidLetter(name.to_string())),
        };

        // Sample files spell sharps with an 's' (Ds1.mp3), so accept that too.
        let rest = chars.as_str();
        let (accidental, octave) = match rest.chars().next() {
            Some('#') | Some('s') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };

        let octave: i32 = octave
            .parse()
            .map_err(|_| NoteError::InvalidOctave(name.to_string()))?;

        octave
            .checked_add(1)
            .and_then(|octave| octave.checked_mul(12))
            .and_then(|midi| midi.checked_add(base + accidental))
            .and_then(|midi| u8::try_from(midi).ok())
            .and_then(Note::from_midi)
            .ok_or_else(|| NoteError::OutOfRange(name.to_string()))
    }
}
