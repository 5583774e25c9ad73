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
//! The recorder panel and the speaker grilles beside it.

use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::piano::format_duration;

/// A clickable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Starts or stops a take.
    Record,
    /// Saves the current take.
    Download,
    /// Throws the current take away.
    Discard,
}

impl Button {
    /// The text drawn on the button.
    pub fn label(&self, recording: bool) -> &'static str {
        match (self, recording) {
            (Button::Record, false) => "● Record (F2)",
            (Button::Record, true) => "■ Stop (F2)",
            (Button::Download, _) => "⤓ Download (F3)",
            (Button::Discard, _) => "✕ Discard (F4)",
        }
    }
}

/// What the controls show.
#[derive(Debug, Clone, Default)]
pub struct ControlsState {
    /// How long the running take has gone, if recording.
    pub recording: Option<Duration>,
    /// Length of the finished take, if there is one.
    pub take: Option<Duration>,
    /// Where the take was last downloaded to.
    pub saved: Option<String>,
}

/// Lays the buttons out on one row, separated by a space.
pub fn button_rects(area: Rect, state: &ControlsState) -> Vec<(Button, Rect)> {
    let mut buttons = vec![Button::Record];
    if state.take.is_some() && state.recording.is_none() {
        buttons.push(Button::Download);
        buttons.push(Button::Discard);
    }

    let recording = state.recording.is_some();
    let mut rects = Vec::with_capacity(buttons.len());
    let mut x = area.x;
    for button in buttons {
        let width = button.label(recording).chars().count() as u16 + 2;
        if x + width > area.right() || area.height == 0 {
            break;
        }
        rects.push((button, Rect::new(x, area.y, width, 1)));
        x += width + 1;
    }
    rects
}

/// Draws the recorder panel.
pub struct Controls<'a> {
    state: &'a ControlsState,
    buttons: &'a [(Button, Rect)],
}

impl<'a> Controls<'a> {
    pub fn new(state: &'a ControlsState, buttons: &'a [(Button, Rect)]) -> Self {
        Controls { state, buttons }
    }
}

impl Widget for Controls<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let recording = self.state.recording.is_some();
        for (button, rect) in self.buttons {
            let style = match (button, recording) {
                (Button::Record, true) => Style::default().fg(Color::White).bg(Color::Red),
                (Button::Record, false) => Style::default().fg(Color::Red).bg(Color::DarkGray),
                _ => Style::default().fg(Color::White).bg(Color::DarkGray),
            };
            buf.set_string(
                rect.x,
                rect.y,
                format!(" {} ", button.label(recording)),
                style.add_modifier(Modifier::BOLD),
            );
        }

        let Some(first) = self.buttons.first() else {
            return;
        };
        let mut lines = Vec::new();
        if let Some(elapsed) = self.state.recording {
            lines.push(Line::from(vec![
                Span::styled("● REC ", Style::default().fg(Color::Red)),
                Span::raw(format_duration(elapsed)),
            ]));
        } else if let Some(take) = self.state.take {
            lines.push(Line::from(format!("Recording {}", format_duration(take))));
            if let Some(saved) = &self.state.saved {
                lines.push(Line::styled(
                    saved.clone(),
                    Style::default().fg(Color::Cyan),
                ));
            }
        }

        let info = Rect::new(
            first.1.x,
            first.1.y + 2,
            area.right().saturating_sub(first.1.x),
            area.bottom().saturating_sub(first.1.y + 2),
        );
        Paragraph::new(lines).render(info, buf);
    }
}

/// A speaker grille.
pub struct Speaker;

impl Widget for Speaker {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = (0..inner.height)
            .map(|row| {
                let pattern = if row % 2 == 0 { "∘ " } else { " ∘" };
                Line::styled(
                    pattern.repeat(inner.width as usize / 2),
                    Style::default().fg(Color::DarkGray),
                )
            })
            .collect();
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> Rect {
        Rect::new(10, 5, 60, 4)
    }

    #[test]
    fn test_record_only_without_take() {
        let rects = button_rects(area(), &ControlsState::default());
        assert_eq!(rects, vec![(Button::Record, Rect::new(10, 5, 15, 1))]);
    }

    #[test]
    fn test_take_adds_download_and_discard() {
        let state = ControlsState {
            take: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        let rects = button_rects(area(), &state);
        let buttons: Vec<Button> = rects.iter().map(|(b, _)| *b).collect();
        assert_eq!(
            buttons,
            vec![Button::Record, Button::Download, Button::Discard]
        );
        // One space between buttons.
        assert_eq!(rects[1].1.x, rects[0].1.right() + 1);
        assert_eq!(rects[2].1.x, rects[1].1.right() + 1);
    }

    #[test]
    fn test_recording_hides_take_buttons() {
        let state = ControlsState {
            recording: Some(Duration::from_secs(1)),
            take: Some(Duration::from_secs(3)),
            saved: None,
        };
        let rects = button_rects(area(), &state);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].1.width, 13);
    }

    #[test]
    fn test_buttons_that_do_not_fit_are_dropped() {
        let state = ControlsState {
            take: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        let rects = button_rects(Rect::new(0, 0, 20, 1), &state);
        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn test_render_recording() {
        let state = ControlsState {
            recording: Some(Duration::from_millis(3200)),
            ..Default::default()
        };
        let area = area();
        let rects = button_rects(area, &state);
        let mut buf = Buffer::empty(area);
        Controls::new(&state, &rects).render(area, &mut buf);

        let row: String = (area.x..area.right())
            .map(|x| buf[(x, area.y + 2)].symbol().to_string())
            .collect();
        assert!(row.starts_with("● REC 0:03.2"));
        assert_eq!(buf[(area.x, area.y)].bg, Color::Red);
    }
}
