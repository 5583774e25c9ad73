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
use std::error::Error;
use std::io;
use std::time::{Duration, Instant};

use ratatui::{backend::Backend, Terminal};
use tracing::{debug, info, span, Level};

use crate::keyboard::Keyboard;
use crate::piano::Piano;
use crate::samples::Instrument;
use crate::ui::{self, Button, Hit, ScreenLayout, TitleFade};

pub mod terminal;

/// How long the loop waits for input between redraws, about 60 frames a second.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Controller events that will trigger behavior in the piano.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A computer key went down. Auto-repeats arrive as more of these.
    KeyDown(char),

    /// A computer key came up.
    KeyUp(char),

    /// The left mouse button went down.
    MouseDown { column: u16, row: u16 },

    /// The mouse moved with the left button down.
    MouseDrag { column: u16, row: u16 },

    /// The left mouse button came up.
    MouseUp { column: u16, row: u16 },

    /// Starts or stops a recording.
    Record,

    /// Saves the current recording.
    Download,

    /// Throws the current recording away.
    Discard,

    /// The terminal lost focus, so key releases may never arrive.
    FocusLost,

    /// The terminal changed size.
    Resize,

    /// Leaves the piano.
    Quit,
}

/// A source of controller events.
pub trait Driver {
    /// Waits up to `timeout` for input and returns the events it produced.
    fn poll(&mut self, timeout: Duration) -> io::Result<Vec<Event>>;
}

/// Drives a piano from input events and draws it.
pub struct Controller<I: Instrument> {
    piano: Piano<I>,
    keyboard: Keyboard,
    layout: ScreenLayout,
    title: TitleFade,
    quit: bool,
}

impl<I: Instrument> Controller<I> {
    pub fn new(piano: Piano<I>, keyboard: Keyboard, title: TitleFade) -> Controller<I> {
        Controller {
            piano,
            keyboard,
            layout: ScreenLayout::default(),
            title,
            quit: false,
        }
    }

    /// Draws and handles events until a quit event arrives.
    pub fn run<B: Backend, D: Driver>(
        &mut self,
        terminal: &mut Terminal<B>,
        driver: &mut D,
    ) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        info!("Controller started.");
        while !self.quit {
            let phase = self.title.phase(Instant::now());
            let piano = &self.piano;
            let keyboard = &self.keyboard;
            let mut layout = None;
            terminal.draw(|frame| layout = Some(ui::draw(frame, piano, keyboard, phase)))?;
            if let Some(layout) = layout {
                self.layout = layout;
            }

            for event in driver.poll(FRAME_INTERVAL)? {
                self.handle(event);
            }
        }
        info!("Controller closing.");
        Ok(())
    }

    /// Applies one event to the piano.
    pub fn handle(&mut self, event: Event) {
        debug!(event = ?event, "Received event.");
        match event {
            Event::KeyDown(key) => {
                self.piano.key_down(key);
            }
            Event::KeyUp(key) => {
                self.piano.key_up(key);
            }
            Event::MouseDown { column, row } => match self.layout.hit(column, row) {
                Some(Hit::Key(note)) => self.piano.mouse_down(note),
                Some(Hit::Button(button)) => self.press(button),
                None => {}
            },
            Event::MouseDrag { column, row } => {
                // Leaving the held key releases it. Entering another key does nothing.
                if let Some(held) = self.piano.mouse_note() {
                    if self.layout.hit(column, row) != Some(Hit::Key(held)) {
                        self.piano.mouse_out(held);
                    }
                }
            }
            Event::MouseUp { column, row } => {
                if let Some(Hit::Key(note)) = self.layout.hit(column, row) {
                    self.piano.mouse_up(note);
                }
                if let Some(held) = self.piano.mouse_note() {
                    self.piano.mouse_out(held);
                }
            }
            Event::Record => self.press(Button::Record),
            // The take buttons are hidden while recording.
            Event::Download | Event::Discard if self.piano.is_recording() => {}
            Event::Download => self.press(Button::Download),
            Event::Discard => self.press(Button::Discard),
            Event::FocusLost => self.piano.release_all(),
            Event::Resize => {}
            Event::Quit => {
                self.piano.release_all();
                self.quit = true;
            }
        }
    }

    fn press(&mut self, button: Button) {
        let result = match button {
            Button::Record => self.piano.toggle_recording(),
            Button::Download => self.piano.download().map(|_| ()),
            Button::Discard => {
                self.piano.discard();
                Ok(())
            }
        };
        if let Err(e) = result {
            self.piano.set_status(e.to_string());
        }
    }

    pub fn piano(&self) -> &Piano<I> {
        &self.piano
    }
}
