//! Binary command protocol for the strip controller.
//!
//! Two commands exist, selected by the first byte:
//!
//! | Field        | CLEAR  | WRITE                          |
//! |--------------|--------|--------------------------------|
//! | byte 0       | `0x00` | `0x01`                         |
//! | byte 1       | strip  | strip                          |
//! | bytes 2-3    | —      | start offset (big-endian u16)  |
//! | bytes 4-5    | —      | end offset (big-endian u16, inclusive) |
//! | byte 6-8     | —      | R, G, B                        |
//! | bytes 9-10   | —      | strip length (big-endian u16)  |
//! | byte 11      | —      | reserved (`0x00`)              |
//! | total length | 2      | 12                             |
//!
//! The layout is fixed wire compatibility with deployed firmware — any
//! change here requires a firmware update on every strip controller.

use uuid::Uuid;

use crate::color::Rgb;

/// Clear the addressed strip's entire frame buffer.
pub const COMMAND_CLEAR_STRIP: u8 = 0x00;

/// Set an inclusive LED range on the addressed strip to one color.
pub const COMMAND_WRITE_STRIP: u8 = 0x01;

/// Exact length of a `CLEAR` command.
pub const CLEAR_COMMAND_LEN: usize = 2;

/// Exact length of a `WRITE` command.
pub const WRITE_COMMAND_LEN: usize = 12;

/// Maximum payload accepted by the LED characteristic — no fragmentation.
pub const MAX_COMMAND_LEN: usize = WRITE_COMMAND_LEN;

/// GATT service the strip controller advertises.
pub const BINDICATORS_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x4797a4e4_0484_4572_978c_ceb4f6489081);

/// Write characteristic (16-bit UUID `0x1ed5` on the Bluetooth base).
pub const LEDS_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00001ed5_0000_1000_8000_00805f9b34fb);

// ── Command value ──

/// An encoded command, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(Vec<u8>);

impl Command {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn opcode(&self) -> u8 {
        self.0[0]
    }

    pub fn strip(&self) -> u8 {
        self.0[1]
    }

    /// Hex rendering for logs and dry-run output, e.g. `0002` for a clear.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Encode a `CLEAR` for the given strip: exactly `[0x00, strip]`.
pub fn encode_clear(strip: u8) -> Command {
    Command(vec![COMMAND_CLEAR_STRIP, strip])
}

/// Encode a `WRITE` illuminating the inclusive range `[start, end]`.
///
/// `strip_length` is the strip's configured LED count, copied verbatim into
/// bytes 9-10 — it is configuration, never derived from the range.
pub fn encode_write(strip: u8, start: u16, end: u16, colour: Rgb, strip_length: u16) -> Command {
    let mut bytes = Vec::with_capacity(WRITE_COMMAND_LEN);
    bytes.push(COMMAND_WRITE_STRIP);
    bytes.push(strip);
    bytes.extend_from_slice(&start.to_be_bytes());
    bytes.extend_from_slice(&end.to_be_bytes());
    bytes.push(colour.r);
    bytes.push(colour.g);
    bytes.push(colour.b);
    bytes.extend_from_slice(&strip_length.to_be_bytes());
    bytes.push(0x00); // reserved
    Command(bytes)
}

// ── Decoder ──

/// A decoded, structurally valid strip mutation.
///
/// Semantic checks (strip id in range, then start/end ordering) are
/// deferred to the renderer, which knows the configured strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripCommand {
    Clear {
        strip: u8,
    },
    Write {
        strip: u8,
        start: u16,
        end: u16,
        colour: Rgb,
        strip_length: u16,
    },
}

/// Reasons a received message fails structural decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Zero-length message.
    Empty,
    /// First byte is not a known opcode.
    UnknownOpcode(u8),
    /// Message length does not match the opcode's fixed size.
    BadLength { opcode: u8, len: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty message"),
            DecodeError::UnknownOpcode(op) => write!(f, "unknown opcode 0x{op:02x}"),
            DecodeError::BadLength { opcode, len } => {
                write!(f, "bad length {len} for opcode 0x{opcode:02x}")
            }
        }
    }
}

/// Decode one received message into a strip mutation.
pub fn decode(message: &[u8]) -> Result<StripCommand, DecodeError> {
    if message.is_empty() {
        return Err(DecodeError::Empty);
    }
    match message[0] {
        COMMAND_CLEAR_STRIP => {
            if message.len() != CLEAR_COMMAND_LEN {
                return Err(DecodeError::BadLength {
                    opcode: COMMAND_CLEAR_STRIP,
                    len: message.len(),
                });
            }
            Ok(StripCommand::Clear { strip: message[1] })
        }
        COMMAND_WRITE_STRIP => {
            if message.len() != WRITE_COMMAND_LEN {
                return Err(DecodeError::BadLength {
                    opcode: COMMAND_WRITE_STRIP,
                    len: message.len(),
                });
            }
            Ok(StripCommand::Write {
                strip: message[1],
                start: u16::from_be_bytes([message[2], message[3]]),
                end: u16::from_be_bytes([message[4], message[5]]),
                colour: Rgb::new(message[6], message[7], message[8]),
                strip_length: u16::from_be_bytes([message[9], message[10]]),
            })
        }
        op => Err(DecodeError::UnknownOpcode(op)),
    }
}
