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
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event as TerminalEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use tracing::{debug, info, warn};

use super::Event;

/// Synthesizes key releases for terminals that only report presses. A key
/// counts as held while its presses or auto-repeats keep arriving.
#[derive(Debug)]
pub struct HoldTracker {
    hold: Duration,
    seen: HashMap<char, Instant>,
}

impl HoldTracker {
    pub fn new(hold: Duration) -> HoldTracker {
        HoldTracker {
            hold,
            seen: HashMap::new(),
        }
    }

    /// Records a press of the key. Returns true if the key was not held.
    pub fn touch(&mut self, key: char, now: Instant) -> bool {
        self.seen.insert(key, now).is_none()
    }

    /// Returns the keys not seen for the hold time and forgets them.
    pub fn expire(&mut self, now: Instant) -> Vec<char> {
        let hold = self.hold;
        let mut expired: Vec<char> = self
            .seen
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) >= hold)
            .map(|(key, _)| *key)
            .collect();
        expired.sort_unstable();
        for key in expired.iter() {
            self.seen.remove(key);
        }
        expired
    }

    /// Forgets every held key.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

/// Reads piano input from the terminal.
pub struct Driver {
    /// Set when the terminal reports key releases.
    enhanced: bool,
    /// Whether the terminal is in raw mode on the alternate screen.
    entered: bool,
    holds: HoldTracker,
}

impl Driver {
    pub fn new(key_hold: Duration) -> Driver {
        Driver {
            enhanced: false,
            entered: false,
            holds: HoldTracker::new(key_hold),
        }
    }

    /// Switches the terminal to raw mode on the alternate screen and turns on
    /// mouse, focus and, where supported, key release reporting.
    pub fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        self.entered = true;

        // Must be asked before switching screens.
        let supports_enhancement = matches!(supports_keyboard_enhancement(), Ok(true));

        execute!(
            io::stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableFocusChange
        )?;

        if supports_enhancement
            && execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )
            .is_ok()
        {
            self.enhanced = true;
        }

        info!(
            key_releases = self.enhanced,
            "Terminal input started"
        );
        Ok(())
    }

    /// Restores the terminal.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;

        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
            self.enhanced = false;
        }
        disable_raw_mode()?;
        execute!(
            io::stdout(),
            DisableFocusChange,
            DisableMouseCapture,
            LeaveAlternateScreen
        )?;
        Ok(())
    }

    /// Turns one terminal event into piano events.
    fn translate(&mut self, event: TerminalEvent, now: Instant) -> Vec<Event> {
        match event {
            TerminalEvent::Key(key) => self.translate_key(key, now),
            TerminalEvent::Mouse(mouse) => translate_mouse(mouse).into_iter().collect(),
            TerminalEvent::FocusLost => {
                self.holds.clear();
                vec![Event::FocusLost]
            }
            TerminalEvent::Resize(_, _) => vec![Event::Resize],
            _ => Vec::new(),
        }
    }

    fn translate_key(&mut self, key: KeyEvent, now: Instant) -> Vec<Event> {
        let press = matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat);
        match key.code {
            // Releases pass through whatever modifiers are held by then.
            KeyCode::Char(c) if !press => vec![Event::KeyUp(c)],
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                vec![Event::Quit]
            }
            KeyCode::Char(_)
                if key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Vec::new()
            }
            KeyCode::Char(c) => {
                if !self.enhanced {
                    self.holds.touch(c, now);
                }
                vec![Event::KeyDown(c)]
            }
            _ if !press => Vec::new(),
            KeyCode::Esc => vec![Event::Quit],
            KeyCode::F(2) => vec![Event::Record],
            KeyCode::F(3) => vec![Event::Download],
            KeyCode::F(4) => vec![Event::Discard],
            other => {
                debug!(key = ?other, "Ignoring key");
                Vec::new()
            }
        }
    }
}

fn translate_mouse(mouse: MouseEvent) -> Option<Event> {
    let (column, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Event::MouseDown { column, row }),
        MouseEventKind::Drag(MouseButton::Left) => Some(Event::MouseDrag { column, row }),
        MouseEventKind::Up(MouseButton::Left) => Some(Event::MouseUp { column, row }),
        _ => None,
    }
}

impl super::Driver for Driver {
    fn poll(&mut self, timeout: Duration) -> io::Result<Vec<Event>> {
        let mut events = Vec::new();
        let mut wait = timeout;
        // Drain whatever is queued so a burst of input is handled in one frame.
        while event::poll(wait)? {
            let event = event::read()?;
            events.extend(self.translate(event, Instant::now()));
            wait = Duration::ZERO;
        }

        if !self.enhanced {
            events.extend(
                self.holds
                    .expire(Instant::now())
                    .into_iter()
                    .map(Event::KeyUp),
            );
        }
        Ok(events)
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Err(e) = self.leave() {
            warn!(err = %e, "Unable to restore the terminal");
        }
    }
}
