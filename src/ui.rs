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
//! Terminal presentation of the piano.
//!
//! The screen is split top to bottom into the header (title and status), the
//! recorder panel flanked by two speaker grilles, and the keyboard. Drawing
//! returns the [`ScreenLayout`] used, so mouse positions can be resolved
//! against what is actually on screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    Frame,
};

use crate::keyboard::Keyboard;
use crate::notes::Note;
use crate::piano::Piano;
use crate::samples::Instrument;

pub mod controls;
pub mod header;
pub mod keyboard;

pub use controls::{Button, ControlsState};
pub use header::{TitleFade, TitlePhase};

use controls::{Controls, Speaker};
use header::Header;
use keyboard::{KeyboardLayout, KeyboardWidget};

const HEADER_HEIGHT: u16 = 3;
const PANEL_HEIGHT: u16 = 6;

/// What a screen cell is part of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Key(Note),
    Button(Button),
}

/// Where everything was drawn.
#[derive(Debug, Clone, Default)]
pub struct ScreenLayout {
    header: Rect,
    left_speaker: Rect,
    controls: Rect,
    right_speaker: Rect,
    keyboard_area: Rect,
    keyboard: KeyboardLayout,
    buttons: Vec<(Button, Rect)>,
}

impl ScreenLayout {
    pub fn new(area: Rect, keyboard: &Keyboard, controls: &ControlsState) -> ScreenLayout {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Length(PANEL_HEIGHT),
                Constraint::Min(0),
            ])
            .split(area);
        let panel = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(20),
                Constraint::Min(0),
                Constraint::Percentage(20),
            ])
            .split(rows[1]);

        let controls_area = panel[1];
        let buttons_area = Rect::new(
            controls_area.x + 1,
            controls_area.y + 1,
            controls_area.width.saturating_sub(2),
            controls_area.height.saturating_sub(2),
        )
        .intersection(controls_area);

        ScreenLayout {
            header: rows[0],
            left_speaker: panel[0],
            controls: controls_area,
            right_speaker: panel[2],
            keyboard_area: rows[2],
            keyboard: KeyboardLayout::new(rows[2], keyboard),
            buttons: controls::button_rects(buttons_area, controls),
        }
    }

    /// Returns what is under the cell. Buttons are checked before keys.
    pub fn hit(&self, column: u16, row: u16) -> Option<Hit> {
        let position = Position::new(column, row);
        if let Some((button, _)) = self
            .buttons
            .iter()
            .find(|(_, rect)| rect.contains(position))
        {
            return Some(Hit::Button(*button));
        }
        self.keyboard.note_at(column, row).map(Hit::Key)
    }

    #[cfg(test)]
    pub fn keyboard(&self) -> &KeyboardLayout {
        &self.keyboard
    }

    /// Returns where the button is drawn.
    #[cfg(test)]
    pub fn button_rect(&self, button: Button) -> Option<Rect> {
        self.buttons
            .iter()
            .find(|(b, _)| *b == button)
            .map(|(_, rect)| *rect)
    }
}

/// Builds what the recorder panel shows from the piano.
pub fn controls_state<I: Instrument>(piano: &Piano<I>) -> ControlsState {
    ControlsState {
        recording: piano.recording_elapsed(),
        take: piano.recording().map(|recording| recording.duration()),
        saved: piano.last_saved().map(str::to_string),
    }
}

/// Draws the whole screen and returns its layout.
pub fn draw<I: Instrument>(
    frame: &mut Frame,
    piano: &Piano<I>,
    keyboard: &Keyboard,
    title: TitlePhase,
) -> ScreenLayout {
    let state = controls_state(piano);
    let layout = ScreenLayout::new(frame.area(), keyboard, &state);
    let load_state = piano.load_state();

    frame.render_widget(
        Header::new(title, &load_state, piano.status()),
        layout.header,
    );
    frame.render_widget(Speaker, layout.left_speaker);
    frame.render_widget(Controls::new(&state, &layout.buttons), layout.controls);
    frame.render_widget(Speaker, layout.right_speaker);

    // The keys stay hidden until there is something to play.
    if piano.is_loaded() {
        let held = piano.held_notes();
        frame.render_widget(
            KeyboardWidget::new(&layout.keyboard, &held),
            layout.keyboard_area,
        );
    }
    layout
}
