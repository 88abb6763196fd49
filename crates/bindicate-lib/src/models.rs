//! Domain types — bindicators, strips, and LED records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to illuminate the LEDs of one cart/shelf/bin in a given color.
///
/// The `rgb` field is kept as raw JSON: a malformed color falls back to the
/// fixed default during encoding rather than invalidating the bindicator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Bindicator {
    pub cart: String,
    pub shelf: u32,
    pub bin: u32,
    pub rgb: Value,
}

impl Bindicator {
    /// Parse a JSON value into a valid bindicator.
    ///
    /// Returns `None` unless all four fields are present and well typed,
    /// with `shelf` and `bin` positive integers. Callers drop invalid
    /// bindicators and carry on with the rest of the batch.
    pub fn from_value(value: &Value) -> Option<Self> {
        let bindicator: Bindicator = serde_json::from_value(value.clone()).ok()?;
        if bindicator.shelf == 0 || bindicator.bin == 0 {
            return None;
        }
        Some(bindicator)
    }
}

/// A physically addressable run of LEDs, identified by a small integer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Strip {
    pub id: u8,
    /// Count of physical LEDs on the strip.
    pub length: u16,
}

/// One LED position, resolved from the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Led {
    /// Strip the LED belongs to.
    pub strip: u8,
    /// Zero-based position within the strip's buffer.
    pub offset: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_valid_bindicator() {
        let v = json!({"cart": "A", "shelf": 1, "bin": 2, "rgb": [255, 0, 0]});
        let b = Bindicator::from_value(&v).unwrap();
        assert_eq!(b.cart, "A");
        assert_eq!(b.shelf, 1);
        assert_eq!(b.bin, 2);
    }

    #[test]
    fn parse_accepts_any_rgb_shape() {
        // A present-but-malformed rgb does not invalidate the bindicator
        for rgb in [json!(null), json!("xyz"), json!(17), json!([1, 2])] {
            let v = json!({"cart": "A", "shelf": 1, "bin": 1, "rgb": rgb});
            assert!(Bindicator::from_value(&v).is_some());
        }
    }

    #[test]
    fn reject_missing_fields() {
        assert!(Bindicator::from_value(&json!({"shelf": 1, "bin": 1, "rgb": []})).is_none());
        assert!(Bindicator::from_value(&json!({"cart": "A", "bin": 1, "rgb": []})).is_none());
        assert!(Bindicator::from_value(&json!({"cart": "A", "shelf": 1, "rgb": []})).is_none());
        assert!(Bindicator::from_value(&json!({"cart": "A", "shelf": 1, "bin": 1})).is_none());
    }

    #[test]
    fn reject_wrong_types() {
        assert!(
            Bindicator::from_value(&json!({"cart": 7, "shelf": 1, "bin": 1, "rgb": []})).is_none()
        );
        assert!(
            Bindicator::from_value(&json!({"cart": "A", "shelf": "1", "bin": 1, "rgb": []}))
                .is_none()
        );
        assert!(
            Bindicator::from_value(&json!({"cart": "A", "shelf": 1.5, "bin": 1, "rgb": []}))
                .is_none()
        );
    }

    #[test]
    fn reject_non_positive_shelf_or_bin() {
        assert!(
            Bindicator::from_value(&json!({"cart": "A", "shelf": 0, "bin": 1, "rgb": []}))
                .is_none()
        );
        assert!(
            Bindicator::from_value(&json!({"cart": "A", "shelf": 1, "bin": 0, "rgb": []}))
                .is_none()
        );
        assert!(
            Bindicator::from_value(&json!({"cart": "A", "shelf": -1, "bin": 1, "rgb": []}))
                .is_none()
        );
    }

    #[test]
    fn reject_non_object() {
        assert!(Bindicator::from_value(&json!("bindicator")).is_none());
        assert!(Bindicator::from_value(&json!(42)).is_none());
        assert!(Bindicator::from_value(&json!([1, 2, 3])).is_none());
    }
}
