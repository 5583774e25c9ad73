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

//! The fixed layout of the on-screen piano.

use crate::keymap::KeyMap;
use crate::notes::Note;

/// The number of octaves drawn on screen.
pub const NUM_OCTAVES: u8 = 7;

/// The octave of the leftmost C.
pub const FIRST_OCTAVE: i8 = 1;

/// Whether a key is drawn as a white or a black key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColor {
    White,
    Black,
}

/// A single piano key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// The note this key plays.
    pub note: Note,
    /// The key color.
    pub color: KeyColor,
    /// The computer key that plays this note, if any.
    pub label: Option<char>,
}

/// A run of octaves, each holding the twelve keys from C to B.
#[derive(Debug, Clone)]
pub struct Keyboard {
    keys: Vec<Key>,
}

impl Keyboard {
    /// Builds the keyboard, labelling keys from the given key map.
    pub fn new(keymap: &KeyMap) -> Keyboard {
        Keyboard::with_octaves(keymap, FIRST_OCTAVE, NUM_OCTAVES)
    }

    /// Builds a keyboard of `octaves` octaves starting at `first_octave`.
    pub fn with_octaves(keymap: &KeyMap, first_octave: i8, octaves: u8) -> Keyboard {
        let keys = (0..octaves)
            .flat_map(|octave| {
                (0..12).filter_map(move |pitch_class| {
                    Note::from_parts(pitch_class, first_octave + octave as i8)
                })
            })
            .map(|note| Key {
                note,
                color: if note.is_black() {
                    KeyColor::Black
                } else {
                    KeyColor::White
                },
                label: keymap.key_for(note),
            })
            .collect();

        Keyboard { keys }
    }

    /// All keys from lowest to highest.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The white keys from lowest to highest.
    pub fn white_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|k| k.color == KeyColor::White)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_octaves() {
        let keyboard = Keyboard::new(&KeyMap::default());
        assert_eq!(keyboard.keys().len(), 84);
        assert_eq!(keyboard.white_keys().count(), 49);
        assert_eq!(keyboard.keys()[0].note.to_string(), "C1");
        assert_eq!(keyboard.keys()[83].note.to_string(), "B7");
    }

    #[test]
    fn colors_follow_the_octave_pattern() {
        let keyboard = Keyboard::new(&KeyMap::default());
        let pattern: Vec<KeyColor> = keyboard.keys()[..12].iter().map(|k| k.color).collect();
        use KeyColor::*;
        assert_eq!(
            pattern,
            vec![White, Black, White, Black, White, White, Black, White, Black, White, Black, White]
        );
    }

    #[test]
    fn labels_come_from_the_keymap() {
        let keyboard = Keyboard::new(&KeyMap::default());
        let labelled: Vec<&Key> = keyboard.keys().iter().filter(|k| k.label.is_some()).collect();
        assert_eq!(labelled.len(), 38);

        let c3 = keyboard
            .keys()
            .iter()
            .find(|k| k.note.to_string() == "C3")
            .unwrap();
        assert_eq!(c3.label, Some('z'));
    }
}
