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
//! Geometry and drawing of the on-screen keys.

use std::collections::BTreeSet;

use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::{Color, Style},
    widgets::Widget,
};

use crate::keyboard::{KeyColor, Keyboard};
use crate::notes::Note;

const WHITE_KEY: Color = Color::Rgb(240, 240, 232);
const BLACK_KEY: Color = Color::Rgb(20, 20, 20);
const HELD_WHITE_KEY: Color = Color::Rgb(120, 180, 255);
const HELD_BLACK_KEY: Color = Color::Rgb(40, 90, 200);
const KEY_EDGE: Color = Color::Rgb(110, 110, 110);

/// A key and where it sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRect {
    pub note: Note,
    pub color: KeyColor,
    pub label: Option<char>,
    pub rect: Rect,
}

/// Where every key of a [`Keyboard`] is drawn within an area.
///
/// White keys share the width evenly and run the full height. Black keys sit
/// on the boundary between two white keys and cover the upper three fifths.
#[derive(Debug, Clone, Default)]
pub struct KeyboardLayout {
    white: Vec<KeyRect>,
    black: Vec<KeyRect>,
}

impl KeyboardLayout {
    pub fn new(area: Rect, keyboard: &Keyboard) -> KeyboardLayout {
        let white_count = keyboard.white_keys().count() as u16;
        if white_count == 0 || area.is_empty() {
            return KeyboardLayout::default();
        }

        let key_width = (area.width / white_count).max(1);
        let used = key_width.saturating_mul(white_count);
        let left = area.x + area.width.saturating_sub(used) / 2;
        let right = area.right();
        let black_width = if key_width >= 3 {
            key_width * 2 / 3
        } else {
            1
        };
        let black_height = (area.height * 3 / 5).max(1);

        let mut layout = KeyboardLayout::default();
        let mut white_index: u16 = 0;
        for key in keyboard.keys() {
            match key.color {
                KeyColor::White => {
                    let x = left + white_index * key_width;
                    white_index += 1;
                    if x >= right {
                        continue;
                    }
                    layout.white.push(KeyRect {
                        note: key.note,
                        color: key.color,
                        label: key.label,
                        rect: Rect::new(x, area.y, key_width.min(right - x), area.height),
                    });
                }
                KeyColor::Black => {
                    // Centered on the left edge of the next white key.
                    let boundary = left + white_index * key_width;
                    let x = boundary.saturating_sub(black_width / 2).max(area.x);
                    if x >= right {
                        continue;
                    }
                    layout.black.push(KeyRect {
                        note: key.note,
                        color: key.color,
                        label: key.label,
                        rect: Rect::new(x, area.y, black_width.min(right - x), black_height),
                    });
                }
            }
        }
        layout
    }

    /// Returns the note under the cell. Black keys are on top.
    pub fn note_at(&self, column: u16, row: u16) -> Option<Note> {
        let position = Position::new(column, row);
        self.black
            .iter()
            .chain(self.white.iter())
            .find(|key| key.rect.contains(position))
            .map(|key| key.note)
    }

    /// Returns where the note is drawn.
    #[cfg(test)]
    pub fn rect_of(&self, note: Note) -> Option<Rect> {
        self.white
            .iter()
            .chain(self.black.iter())
            .find(|key| key.note == note)
            .map(|key| key.rect)
    }

    /// Returns the number of keys that fit on screen.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.white.len() + self.black.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.white.is_empty() && self.black.is_empty()
    }
}

/// Draws the keys, highlighting held notes.
pub struct KeyboardWidget<'a> {
    layout: &'a KeyboardLayout,
    held: &'a BTreeSet<Note>,
}

impl<'a> KeyboardWidget<'a> {
    pub fn new(layout: &'a KeyboardLayout, held: &'a BTreeSet<Note>) -> Self {
        KeyboardWidget { layout, held }
    }

    fn draw_key(&self, key: &KeyRect, buf: &mut Buffer) {
        let held = self.held.contains(&key.note);
        let (bg, fg) = match (key.color, held) {
            (KeyColor::White, false) => (WHITE_KEY, Color::Black),
            (KeyColor::White, true) => (HELD_WHITE_KEY, Color::Black),
            (KeyColor::Black, false) => (BLACK_KEY, Color::Gray),
            (KeyColor::Black, true) => (HELD_BLACK_KEY, Color::White),
        };
        let style = Style::default().bg(bg).fg(fg);
        let rect = key.rect;

        for y in rect.top()..rect.bottom() {
            for x in rect.left()..rect.right() {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_symbol(" ").set_style(style);
                }
            }
        }

        if key.color == KeyColor::White && rect.width >= 2 {
            let edge = rect.right() - 1;
            for y in rect.top()..rect.bottom() {
                if let Some(cell) = buf.cell_mut((edge, y)) {
                    cell.set_symbol("▕").set_fg(KEY_EDGE);
                }
            }
        }

        // Labels go at the bottom of the key: computer key, then note name.
        let text_width = if key.color == KeyColor::White && rect.width >= 2 {
            rect.width - 1
        } else {
            rect.width
        };
        let name = key.note.to_string();
        let mut row = rect.bottom().saturating_sub(1);
        if rect.height >= 2 && name.len() as u16 <= text_width {
            buf.set_string(rect.x, row, &name, style);
            row = row.saturating_sub(1);
        }
        if let Some(label) = key.label {
            if row >= rect.top() {
                buf.set_string(rect.x, row, label.to_string(), style);
            }
        }
    }
}

impl Widget for KeyboardWidget<'_> {
    fn render(self, _area: Rect, buf: &mut Buffer) {
        for key in self.layout.white.iter().chain(self.layout.black.iter()) {
            self.draw_key(key, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::KeyMap;

    fn note(name: &str) -> Note {
        name.parse().unwrap()
    }

    fn layout(width: u16, height: u16) -> KeyboardLayout {
        KeyboardLayout::new(
            Rect::new(0, 10, width, height),
            &Keyboard::new(&KeyMap::default()),
        )
    }

    #[test]
    fn test_white_keys_share_the_width() {
        let layout = layout(98, 10);
        assert_eq!(layout.len(), 84);
        assert_eq!(layout.rect_of(note("C1")), Some(Rect::new(0, 10, 2, 10)));
        assert_eq!(layout.rect_of(note("D1")), Some(Rect::new(2, 10, 2, 10)));
        assert_eq!(layout.rect_of(note("B7")), Some(Rect::new(96, 10, 2, 10)));
    }

    #[test]
    fn test_keys_are_centered() {
        let layout = layout(100, 10);
        assert_eq!(layout.rect_of(note("C1")), Some(Rect::new(1, 10, 2, 10)));
    }

    #[test]
    fn test_black_keys_on_top() {
        let layout = layout(196, 10);
        // C#1 straddles C1 and D1 in the upper rows only.
        let c_sharp = layout.rect_of(note("C#1")).unwrap();
        assert_eq!(c_sharp, Rect::new(3, 10, 2, 6));

        assert_eq!(layout.note_at(3, 10), Some(note("C#1")));
        assert_eq!(layout.note_at(4, 15), Some(note("C#1")));
        assert_eq!(layout.note_at(3, 16), Some(note("C1")));
        assert_eq!(layout.note_at(4, 16), Some(note("D1")));
        assert_eq!(layout.note_at(0, 12), Some(note("C1")));
    }

    #[test]
    fn test_misses() {
        let layout = layout(98, 10);
        assert_eq!(layout.note_at(10, 9), None);
        assert_eq!(layout.note_at(10, 20), None);
        assert_eq!(layout.note_at(98, 12), None);
    }

    #[test]
    fn test_narrow_terminal_clips() {
        let layout = layout(20, 5);
        assert!(!layout.is_empty());
        assert!(layout.len() < 84);
        assert_eq!(layout.note_at(0, 14), Some(note("C1")));
        assert_eq!(layout.rect_of(note("B7")), None);
    }

    #[test]
    fn test_empty_area() {
        let layout = layout(0, 0);
        assert!(layout.is_empty());
        assert_eq!(layout.note_at(0, 0), None);
    }

    #[test]
    fn test_render_labels_and_highlight() {
        let area = Rect::new(0, 0, 196, 10);
        let layout = KeyboardLayout::new(area, &Keyboard::new(&KeyMap::default()));
        let held = BTreeSet::from([note("C3")]);
        let mut buf = Buffer::empty(area);
        KeyboardWidget::new(&layout, &held).render(area, &mut buf);

        let c3 = layout.rect_of(note("C3")).unwrap();
        let name = &buf[(c3.x, c3.bottom() - 1)];
        assert_eq!(name.symbol(), "C");
        assert_eq!(name.bg, HELD_WHITE_KEY);
        assert_eq!(buf[(c3.x, c3.bottom() - 2)].symbol(), "z");

        let d3 = layout.rect_of(note("D3")).unwrap();
        assert_eq!(buf[(d3.x, d3.bottom() - 1)].bg, WHITE_KEY);
        assert_eq!(buf[(d3.x, d3.bottom() - 2)].symbol(), "x");

        let c_sharp = layout.rect_of(note("C#3")).unwrap();
        assert_eq!(buf[(c_sharp.x, c_sharp.y)].bg, BLACK_KEY);
    }
}
