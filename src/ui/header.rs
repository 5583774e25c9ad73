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
use std::time::{Duration, Instant};

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Paragraph, Widget},
};

use crate::samples::LoadState;

pub const TITLE: &str = "7 Octave Digital Piano and Recorder";
pub const LOADING: &str = "Piano Audio Samples Loading...";

/// How visible the opening title is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TitlePhase {
    Shown,
    /// Fading out, with the fraction of the fade that has passed.
    Fading(f32),
    Hidden,
}

/// Times the fade of the opening title.
#[derive(Debug, Clone, Copy)]
pub struct TitleFade {
    started: Instant,
    fade_after: Duration,
    fade_length: Duration,
}

impl TitleFade {
    pub fn new(fade_after: Duration, fade_length: Duration) -> TitleFade {
        TitleFade {
            started: Instant::now(),
            fade_after,
            fade_length,
        }
    }

    /// Returns the title phase at the given instant.
    pub fn phase(&self, now: Instant) -> TitlePhase {
        title_phase(
            now.saturating_duration_since(self.started),
            self.fade_after,
            self.fade_length,
        )
    }
}

/// Returns the title phase `elapsed` after start.
pub fn title_phase(elapsed: Duration, fade_after: Duration, fade_length: Duration) -> TitlePhase {
    if elapsed < fade_after {
        return TitlePhase::Shown;
    }
    let fading = elapsed - fade_after;
    if fading >= fade_length {
        TitlePhase::Hidden
    } else {
        TitlePhase::Fading(fading.as_secs_f32() / fade_length.as_secs_f32())
    }
}

/// The title line and, under it, the loading state or the latest status.
pub struct Header<'a> {
    phase: TitlePhase,
    load_state: &'a LoadState,
    status: Option<&'a str>,
}

impl<'a> Header<'a> {
    pub fn new(phase: TitlePhase, load_state: &'a LoadState, status: Option<&'a str>) -> Self {
        Header {
            phase,
            load_state,
            status,
        }
    }

    fn title_line(&self) -> Line<'static> {
        let level = match self.phase {
            TitlePhase::Shown => 1.0,
            TitlePhase::Fading(progress) => 1.0 - progress.clamp(0.0, 1.0),
            TitlePhase::Hidden => return Line::default(),
        };
        let shade = (255.0 * level) as u8;
        Line::styled(
            TITLE,
            Style::default()
                .fg(Color::Rgb(shade, shade, shade))
                .add_modifier(Modifier::BOLD),
        )
    }

    fn message_line(&self) -> Line<'a> {
        match self.load_state {
            LoadState::Loading => Line::styled(LOADING, Style::default().fg(Color::Yellow)),
            LoadState::Failed(e) => Line::styled(
                format!("Unable to load piano samples: {}", e),
                Style::default().fg(Color::Red),
            ),
            LoadState::Loaded { .. } => match self.status {
                Some(status) => Line::styled(status, Style::default().fg(Color::Gray)),
                None => Line::default(),
            },
        }
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(vec![self.title_line(), self.message_line()])
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}
