//! In-memory stand-ins for the device's hardware seams.
//!
//! Used by the unit tests and by the `simulate` CLI command, which runs
//! the real message-handling logic against these doubles and prints what
//! the strips would show.

use crate::color::Rgb;

use super::device::{LedDriver, StatusIndicators};

/// Records every pushed frame instead of clocking out LED data.
#[derive(Default)]
pub struct RecordingDriver {
    frames: Vec<(u8, Vec<Rgb>)>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames pushed so far.
    pub fn pushes(&self) -> usize {
        self.frames.len()
    }

    /// Data line of the most recent push.
    pub fn last_line(&self) -> Option<u8> {
        self.frames.last().map(|(line, _)| *line)
    }

    /// Most recent frame pushed to the given line.
    pub fn last_frame(&self, line: u8) -> Option<&[Rgb]> {
        self.frames
            .iter()
            .rev()
            .find(|(l, _)| *l == line)
            .map(|(_, frame)| frame.as_slice())
    }
}

impl LedDriver for RecordingDriver {
    fn push(&mut self, line: u8, frame: &[Rgb]) {
        self.frames.push((line, frame.to_vec()));
    }
}

/// Tracks indicator state and counts error pulses.
#[derive(Default)]
pub struct RecordingIndicators {
    link: bool,
    heartbeat: bool,
    error_pulses: usize,
}

impl RecordingIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self) -> bool {
        self.link
    }

    pub fn heartbeat(&self) -> bool {
        self.heartbeat
    }

    pub fn error_pulses(&self) -> usize {
        self.error_pulses
    }
}

impl StatusIndicators for RecordingIndicators {
    fn set_link(&mut self, connected: bool) {
        self.link = connected;
    }

    fn set_heartbeat(&mut self, on: bool) {
        self.heartbeat = on;
    }

    fn pulse_error(&mut self) {
        self.error_pulses += 1;
    }
}

/// Collapse a frame into runs of lit LEDs: `(start, end, colour)`,
/// inclusive on both ends. Dark LEDs are omitted.
pub fn lit_ranges(frame: &[Rgb]) -> Vec<(usize, usize, Rgb)> {
    let mut runs = Vec::new();
    let off = Rgb::new(0, 0, 0);
    let mut current: Option<(usize, usize, Rgb)> = None;
    for (offset, &led) in frame.iter().enumerate() {
        match current {
            Some((start, end, colour)) if led == colour && offset == end + 1 => {
                current = Some((start, offset, colour));
            }
            _ => {
                if let Some(run) = current.take()
                    && run.2 != off
                {
                    runs.push(run);
                }
                current = Some((offset, offset, led));
            }
        }
    }
    if let Some(run) = current
        && run.2 != off
    {
        runs.push(run);
    }
    runs
}
