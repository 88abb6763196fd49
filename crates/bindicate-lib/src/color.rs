//! Color resolution for bindicator requests.
//!
//! A bindicator's `rgb` field may be a 3-element array of 0-255 integers or
//! a 6-hex-digit string. Anything else resolves to [`FALLBACK_COLOUR`] —
//! color resolution never fails, so a malformed color cannot reject an
//! otherwise valid bindicator.

use serde_json::Value;

/// An RGB color triple as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Color used when the `rgb` field is missing or malformed (all off).
pub const FALLBACK_COLOUR: Rgb = Rgb::new(0, 0, 0);

/// Resolve a bindicator `rgb` value to a color triple.
///
/// - `[r, g, b]` with integer components: used directly, clamped to 0-255.
/// - 6-hex-digit string (`"ff8000"`): parsed as two hex digits per channel.
/// - Anything else: [`FALLBACK_COLOUR`].
pub fn resolve_colour(rgb: &Value) -> Rgb {
    if let Some(items) = rgb.as_array()
        && items.len() == 3
    {
        let mut channels = [0u8; 3];
        for (slot, item) in channels.iter_mut().zip(items) {
            match item.as_i64() {
                Some(n) => *slot = n.clamp(0, 255) as u8,
                None => return FALLBACK_COLOUR,
            }
        }
        return Rgb::new(channels[0], channels[1], channels[2]);
    }

    if let Some(s) = rgb.as_str()
        && s.len() == 6
        && s.is_ascii()
        && let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&s[0..2], 16),
            u8::from_str_radix(&s[2..4], 16),
            u8::from_str_radix(&s[4..6], 16),
        )
    {
        return Rgb::new(r, g, b);
    }

    FALLBACK_COLOUR
}
