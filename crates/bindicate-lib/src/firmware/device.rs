//! Message handling and frame rendering.

use std::fmt;
use std::time::Duration;

use crate::color::Rgb;
use crate::protocol::{self, DecodeError, StripCommand};

/// Cadence of the heartbeat indicator toggle.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

/// How long the error indicator stays lit after a rejected message.
pub const ERROR_PULSE: Duration = Duration::from_millis(500);

/// One physical strip output: its protocol id, LED count, and the data
/// line it hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripOutput {
    pub id: u8,
    pub length: u16,
    pub line: u8,
}

/// Pushes a rendered frame to a physical LED line.
pub trait LedDriver {
    fn push(&mut self, line: u8, frame: &[Rgb]);
}

/// The device's status LEDs.
pub trait StatusIndicators {
    /// Link indicator: lit while a central is connected.
    fn set_link(&mut self, connected: bool);
    /// Heartbeat indicator, toggled every [`HEARTBEAT_PERIOD`].
    fn set_heartbeat(&mut self, on: bool);
    /// Briefly light the error indicator ([`ERROR_PULSE`]).
    fn pulse_error(&mut self);
}

/// Why a received message was rejected.
///
/// Checks run in a fixed order: structural decoding first, then the strip
/// id, then the offset ordering. A message can only report the first
/// violation it hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareError {
    Decode(DecodeError),
    /// Strip id does not match any configured output.
    UnknownStrip(u8),
    /// End offset is less than start offset.
    InvertedRange { start: u16, end: u16 },
}

impl fmt::Display for FirmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareError::Decode(e) => e.fmt(f),
            FirmwareError::UnknownStrip(strip) => write!(f, "unknown strip {strip}"),
            FirmwareError::InvertedRange { start, end } => {
                write!(f, "end offset {end} precedes start offset {start}")
            }
        }
    }
}

impl std::error::Error for FirmwareError {}

impl From<DecodeError> for FirmwareError {
    fn from(e: DecodeError) -> Self {
        FirmwareError::Decode(e)
    }
}

/// Render a frame in the GRB byte order ws2812 strips clock in.
pub fn grb_bytes(frame: &[Rgb]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frame.len() * 3);
    for led in frame {
        bytes.push(led.g);
        bytes.push(led.r);
        bytes.push(led.b);
    }
    bytes
}

/// The strip controller: frame buffers plus the two status indicators.
///
/// Frame buffers persist across messages — a write only repaints its own
/// range, and a clear only darkens its own strip.
pub struct StripDevice<D: LedDriver, I: StatusIndicators> {
    strips: Vec<StripOutput>,
    frames: Vec<Vec<Rgb>>,
    driver: D,
    indicators: I,
    heartbeat: bool,
}

impl<D: LedDriver, I: StatusIndicators> StripDevice<D, I> {
    /// Build the device and push an all-dark frame to every output.
    pub fn new(strips: Vec<StripOutput>, driver: D, mut indicators: I) -> Self {
        indicators.set_link(false);
        let frames = strips
            .iter()
            .map(|s| vec![Rgb::new(0, 0, 0); s.length as usize])
            .collect();
        let mut device = StripDevice { strips, frames, driver, indicators, heartbeat: false };
        for index in 0..device.strips.len() {
            device.push(index);
        }
        device
    }

    /// Handle one message received on the LED characteristic.
    ///
    /// A rejected message pulses the error indicator and leaves every
    /// frame buffer untouched.
    pub fn handle_message(&mut self, message: &[u8]) -> Result<(), FirmwareError> {
        match self.apply(message) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("rejected message: {e}");
                self.indicators.pulse_error();
                Err(e)
            }
        }
    }

    fn apply(&mut self, message: &[u8]) -> Result<(), FirmwareError> {
        match protocol::decode(message)? {
            StripCommand::Clear { strip } => {
                let index = self.index_of(strip)?;
                self.frames[index].fill(Rgb::new(0, 0, 0));
                self.push(index);
                Ok(())
            }
            StripCommand::Write { strip, start, end, colour, .. } => {
                let index = self.index_of(strip)?;
                if end < start {
                    return Err(FirmwareError::InvertedRange { start, end });
                }
                let frame = &mut self.frames[index];
                // Offsets past the physical strip are clamped away rather
                // than rejected.
                for offset in start..=end {
                    if let Some(led) = frame.get_mut(offset as usize) {
                        *led = colour;
                    }
                }
                self.push(index);
                Ok(())
            }
        }
    }

    /// Toggle the heartbeat indicator; call every [`HEARTBEAT_PERIOD`].
    pub fn heartbeat_tick(&mut self) {
        self.heartbeat = !self.heartbeat;
        self.indicators.set_heartbeat(self.heartbeat);
    }

    /// Reflect central connect/disconnect on the link indicator.
    pub fn link_changed(&mut self, connected: bool) {
        log::info!(
            "central {}",
            if connected { "connected" } else { "disconnected" }
        );
        self.indicators.set_link(connected);
    }

    /// Current frame buffer for a strip id, if configured.
    pub fn frame(&self, strip: u8) -> Option<&[Rgb]> {
        let index = self.strips.iter().position(|s| s.id == strip)?;
        Some(&self.frames[index])
    }

    /// Configured outputs.
    pub fn strips(&self) -> &[StripOutput] {
        &self.strips
    }

    fn index_of(&self, strip: u8) -> Result<usize, FirmwareError> {
        self.strips
            .iter()
            .position(|s| s.id == strip)
            .ok_or(FirmwareError::UnknownStrip(strip))
    }

    fn push(&mut self, index: usize) {
        self.driver.push(self.strips[index].line, &self.frames[index]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::sim::{RecordingDriver, RecordingIndicators};

    const OFF: Rgb = Rgb::new(0, 0, 0);
    const RED: Rgb = Rgb::new(255, 0, 0);

    fn device() -> StripDevice<RecordingDriver, RecordingIndicators> {
        StripDevice::new(
            vec![
                StripOutput { id: 1, length: 100, line: 2 },
                StripOutput { id: 2, length: 60, line: 3 },
            ],
            RecordingDriver::new(),
            RecordingIndicators::new(),
        )
    }

    #[test]
    fn starts_dark_on_every_output() {
        let d = device();
        assert!(d.frame(1).unwrap().iter().all(|&led| led == OFF));
        assert!(d.frame(2).unwrap().iter().all(|&led| led == OFF));
        assert_eq!(d.driver.pushes(), 2);
        assert!(!d.indicators.link());
    }

    #[test]
    fn write_paints_inclusive_range() {
        let mut d = device();
        d.handle_message(&[0x01, 1, 0, 10, 0, 20, 255, 0, 0, 0, 100, 0])
            .unwrap();
        let frame = d.frame(1).unwrap();
        assert_eq!(frame[9], OFF);
        assert!(frame[10..=20].iter().all(|&led| led == RED));
        assert_eq!(frame[21], OFF);
    }

    #[test]
    fn clear_darkens_only_its_strip() {
        let mut d = device();
        d.handle_message(&[0x01, 1, 0, 0, 0, 5, 255, 0, 0, 0, 100, 0])
            .unwrap();
        d.handle_message(&[0x01, 2, 0, 0, 0, 5, 255, 0, 0, 0, 60, 0])
            .unwrap();
        d.handle_message(&[0x00, 2]).unwrap();
        assert!(d.frame(2).unwrap().iter().all(|&led| led == OFF));
        assert_eq!(d.frame(1).unwrap()[0], RED);
    }

    #[test]
    fn frames_persist_across_messages() {
        let mut d = device();
        d.handle_message(&[0x01, 1, 0, 0, 0, 0, 255, 0, 0, 0, 100, 0])
            .unwrap();
        d.handle_message(&[0x01, 1, 0, 50, 0, 50, 0, 0, 255, 0, 100, 0])
            .unwrap();
        let frame = d.frame(1).unwrap();
        assert_eq!(frame[0], RED);
        assert_eq!(frame[50], Rgb::new(0, 0, 255));
    }

    #[test]
    fn out_of_range_offsets_are_clamped() {
        let mut d = device();
        // Strip 2 has 60 LEDs; the range runs past the end.
        d.handle_message(&[0x01, 2, 0, 58, 0, 70, 255, 0, 0, 0, 60, 0])
            .unwrap();
        let frame = d.frame(2).unwrap();
        assert_eq!(frame.len(), 60);
        assert_eq!(frame[58], RED);
        assert_eq!(frame[59], RED);
        assert_eq!(d.indicators.error_pulses(), 0);
    }

    #[test]
    fn every_accepted_message_pushes_a_frame() {
        let mut d = device();
        let before = d.driver.pushes();
        d.handle_message(&[0x00, 1]).unwrap();
        d.handle_message(&[0x01, 1, 0, 0, 0, 0, 1, 2, 3, 0, 100, 0])
            .unwrap();
        assert_eq!(d.driver.pushes(), before + 2);
        assert_eq!(d.driver.last_line(), Some(2));
    }

    // ── rejection ──

    #[test]
    fn rejects_empty_message() {
        let mut d = device();
        let err = d.handle_message(&[]).unwrap_err();
        assert_eq!(err, FirmwareError::Decode(DecodeError::Empty));
        assert_eq!(d.indicators.error_pulses(), 1);
    }

    #[test]
    fn rejects_unknown_opcode() {
        let mut d = device();
        let err = d.handle_message(&[0x02, 1]).unwrap_err();
        assert_eq!(err, FirmwareError::Decode(DecodeError::UnknownOpcode(0x02)));
    }

    #[test]
    fn rejects_bad_length() {
        let mut d = device();
        let err = d.handle_message(&[0x01, 1, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            FirmwareError::Decode(DecodeError::BadLength { opcode: 0x01, len: 4 })
        );
    }

    #[test]
    fn rejects_unknown_strip() {
        let mut d = device();
        let err = d
            .handle_message(&[0x01, 9, 0, 0, 0, 5, 255, 0, 0, 0, 100, 0])
            .unwrap_err();
        assert_eq!(err, FirmwareError::UnknownStrip(9));
        let err = d.handle_message(&[0x00, 9]).unwrap_err();
        assert_eq!(err, FirmwareError::UnknownStrip(9));
    }

    #[test]
    fn rejects_inverted_range() {
        let mut d = device();
        let err = d
            .handle_message(&[0x01, 1, 0, 20, 0, 10, 255, 0, 0, 0, 100, 0])
            .unwrap_err();
        assert_eq!(err, FirmwareError::InvertedRange { start: 20, end: 10 });
    }

    #[test]
    fn unknown_strip_reported_before_inverted_range() {
        // Both violations present; the strip check runs first.
        let mut d = device();
        let err = d
            .handle_message(&[0x01, 9, 0, 20, 0, 10, 255, 0, 0, 0, 100, 0])
            .unwrap_err();
        assert_eq!(err, FirmwareError::UnknownStrip(9));
    }

    #[test]
    fn rejected_message_leaves_frames_untouched() {
        let mut d = device();
        let pushes = d.driver.pushes();
        let _ = d.handle_message(&[0x01, 1, 0, 20, 0, 10, 255, 0, 0, 0, 100, 0]);
        assert!(d.frame(1).unwrap().iter().all(|&led| led == OFF));
        assert_eq!(d.driver.pushes(), pushes);
        assert_eq!(d.indicators.error_pulses(), 1);
    }

    // ── indicators ──

    #[test]
    fn heartbeat_toggles() {
        let mut d = device();
        d.heartbeat_tick();
        assert!(d.indicators.heartbeat());
        d.heartbeat_tick();
        assert!(!d.indicators.heartbeat());
    }

    #[test]
    fn link_indicator_follows_connection() {
        let mut d = device();
        d.link_changed(true);
        assert!(d.indicators.link());
        d.link_changed(false);
        assert!(!d.indicators.link());
    }

    #[test]
    fn grb_byte_order() {
        let frame = [Rgb::new(1, 2, 3), Rgb::new(255, 0, 128)];
        assert_eq!(grb_bytes(&frame), vec![2, 1, 3, 0, 255, 128]);
    }
}
