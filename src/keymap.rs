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

//! Mapping between computer keyboard characters and piano notes.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::notes::{Note, NoteError};

/// The default layout. The bottom letter row and the home row play C3 to E4,
/// the top letter row and the number row continue from F4 to D6.
const DEFAULT_KEYS: [(char, &str); 38] = [
    ('z', "C3"),
    ('s', "C#3"),
    ('x', "D3"),
    ('d', "D#3"),
    ('c', "E3"),
    ('v', "F3"),
    ('g', "F#3"),
    ('b', "G3"),
    ('h', "G#3"),
    ('n', "A3"),
    ('j', "A#3"),
    ('m', "B3"),
    (',', "C4"),
    ('l', "C#4"),
    ('.', "D4"),
    (';', "D#4"),
    ('/', "E4"),
    ('q', "F4"),
    ('2', "F#4"),
    ('w', "G4"),
    ('3', "G#4"),
    ('e', "A4"),
    ('4', "A#4"),
    ('r', "B4"),
    ('t', "C5"),
    ('6', "C#5"),
    ('y', "D5"),
    ('7', "D#5"),
    ('u', "E5"),
    ('i', "F5"),
    ('9', "F#5"),
    ('o', "G5"),
    ('0', "G#5"),
    ('p', "A5"),
    ('-', "A#5"),
    ('[', "B5"),
    (']', "C6"),
    ('\\', "D6"),
];

/// An ordered table of key to note bindings.
///
/// Order matters for [`KeyMap::key_for`]: when several keys play the same
/// note, the first binding in the table labels the piano key.
#[derive(Clone, Debug)]
pub struct KeyMap {
    bindings: Vec<(char, Note)>,
    index: HashMap<char, usize>,
}

impl KeyMap {
    /// Creates a key map from an ordered list of bindings. A later binding for
    /// the same character replaces the earlier one in place.
    pub fn new(bindings: impl IntoIterator<Item = (char, Note)>) -> KeyMap {
        let mut keymap = KeyMap {
            bindings: Vec::new(),
            index: HashMap::new(),
        };
        for (key, note) in bindings {
            keymap.bind(key, note);
        }
        keymap
    }

    /// Binds a key to a note, replacing any previous binding for that key.
    pub fn bind(&mut self, key: char, note: Note) {
        match self.index.get(&key) {
            Some(&position) => self.bindings[position].1 = note,
            None => {
                self.index.insert(key, self.bindings.len());
                self.bindings.push((key, note));
            }
        }
    }

    /// Applies overrides expressed as note names, as found in the config file.
    pub fn apply_overrides<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (char, &'a str)>,
    ) -> Result<(), NoteError> {
        for (key, name) in overrides {
            let note: Note = name.parse()?;
            debug!(key = %key, note = %note, "Key binding override");
            self.bind(key, note);
        }
        Ok(())
    }

    /// Returns the note played by the given key, if any. Matching is exact, so
    /// 'Z' does not play the note bound to 'z'.
    pub fn note_for(&self, key: char) -> Option<Note> {
        self.index.get(&key).map(|&position| self.bindings[position].1)
    }

    /// Returns the first key in table order that plays the given note.
    pub fn key_for(&self, note: Note) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, bound)| *bound == note)
            .map(|(key, _)| *key)
    }

    /// Returns the bindings in table order.
    pub fn bindings(&self) -> &[(char, Note)] {
        &self.bindings
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        KeyMap::new(DEFAULT_KEYS.iter().filter_map(|(key, name)| {
            // The default table is static and always parses.
            name.parse().ok().map(|note| (*key, note))
        }))
    }
}

impl fmt::Display for KeyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Keys (count: {}):", self.bindings().len())?;
        for (key, note) in self.bindings() {
            writeln!(f, "- {} => {}", key, note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    #[test]
    fn default_table_is_complete() {
        let keymap = KeyMap::default();
        assert_eq!(keymap.bindings().len(), 38);
        assert_eq!(keymap.note_for('z'), Some(note("C3")));
        assert_eq!(keymap.note_for(','), Some(note("C4")));
        assert_eq!(keymap.note_for('q'), Some(note("F4")));
        assert_eq!(keymap.note_for('\\'), Some(note("D6")));
    }

    #[test]
    fn default_table_is_chromatic() {
        // The bindings walk up one semitone at a time from C3 to D6.
        let keymap = KeyMap::default();
        let midis: Vec<u8> = keymap.bindings().iter().map(|(_, n)| n.midi()).collect();
        // The last key skips C#6 and lands on D6.
        let expected: Vec<u8> = (48..=86).filter(|m| *m != 85).collect();
        assert_eq!(midis, expected);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let keymap = KeyMap::default();
        assert_eq!(keymap.note_for('Z'), None);
        assert_eq!(keymap.note_for('a'), None);
        assert_eq!(keymap.note_for(' '), None);
    }

    #[test]
    fn reverse_lookup() {
        let keymap = KeyMap::default();
        assert_eq!(keymap.key_for(note("C4")), Some(','));
        assert_eq!(keymap.key_for(note("A#5")), Some('-'));
        assert_eq!(keymap.key_for(note("C1")), None);
        assert_eq!(keymap.key_for(note("C#6")), None);
    }

    #[test]
    fn overrides_replace_in_place() {
        let mut keymap = KeyMap::default();
        keymap
            .apply_overrides(vec![('z', "C2"), ('\'', "C#6")])
            .unwrap();

        assert_eq!(keymap.note_for('z'), Some(note("C2")));
        assert_eq!(keymap.note_for('\''), Some(note("C#6")));
        assert_eq!(keymap.bindings()[0].0, 'z');
        assert_eq!(keymap.bindings().len(), 39);
        assert_eq!(keymap.key_for(note("C3")), None);
    }

    #[test]
    fn first_binding_labels_duplicate_notes() {
        let mut keymap = KeyMap::default();
        keymap.apply_overrides(vec![('a', "C3")]).unwrap();
        assert_eq!(keymap.key_for(note("C3")), Some('z'));
    }

    #[test]
    fn invalid_override_is_an_error() {
        let mut keymap = KeyMap::default();
        assert!(keymap.apply_overrides(vec![('a', "X3")]).is_err());
    }
}
