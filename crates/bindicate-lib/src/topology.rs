//! Strip topology — resolving bindicators to LED records.

use crate::config::Config;
use crate::models::{Bindicator, Led};

/// Source of truth for the physical LED layout.
///
/// The core never mutates topology; it only resolves bindicators through
/// it. Implemented by [`ConfigTopology`] in production and by test doubles
/// in unit tests.
pub trait TopologyProvider {
    /// Configured strip ids, ascending.
    fn strips(&self) -> Vec<u8>;

    /// Configured LED count for a strip, if the strip exists.
    fn strip_length(&self, strip: u8) -> Option<u16>;

    /// LED records for a bindicator, ordered by strip then offset.
    /// Empty when no placement matches.
    fn lookup_leds(&self, bindicator: &Bindicator) -> Vec<Led>;
}

/// Topology backed by the TOML configuration.
#[derive(Debug, Clone)]
pub struct ConfigTopology {
    config: Config,
}

impl ConfigTopology {
    pub fn new(config: Config) -> Self {
        ConfigTopology { config }
    }

    /// Advertised address of the configured peripheral.
    pub fn peripheral_address(&self) -> &str {
        &self.config.bluetooth.address
    }
}

impl TopologyProvider for ConfigTopology {
    fn strips(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.config.strips.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn strip_length(&self, strip: u8) -> Option<u16> {
        self.config
            .strips
            .iter()
            .find(|s| s.id == strip)
            .map(|s| s.length)
    }

    fn lookup_leds(&self, bindicator: &Bindicator) -> Vec<Led> {
        let mut leds: Vec<Led> = self
            .config
            .bins
            .iter()
            .filter(|b| {
                b.cart == bindicator.cart && b.shelf == bindicator.shelf && b.bin == bindicator.bin
            })
            .flat_map(|b| b.offsets.iter().map(|&offset| Led { strip: b.strip, offset }))
            .collect();
        leds.sort_unstable_by_key(|led| (led.strip, led.offset));
        leds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BinConfig, BluetoothConfig, StripConfig};
    use serde_json::json;

    fn topology() -> ConfigTopology {
        ConfigTopology::new(Config {
            bluetooth: BluetoothConfig::default(),
            strips: vec![
                StripConfig { id: 2, length: 60, line: None },
                StripConfig { id: 1, length: 100, line: None },
            ],
            bins: vec![
                BinConfig {
                    cart: "A".into(),
                    shelf: 1,
                    bin: 1,
                    strip: 1,
                    offsets: vec![12, 10, 11],
                },
                BinConfig {
                    cart: "A".into(),
                    shelf: 1,
                    bin: 2,
                    strip: 2,
                    offsets: vec![5],
                },
            ],
        })
    }

    fn bindicator(cart: &str, shelf: u32, bin: u32) -> Bindicator {
        Bindicator {
            cart: cart.into(),
            shelf,
            bin,
            rgb: json!([255, 0, 0]),
        }
    }

    #[test]
    fn strips_sorted_ascending() {
        assert_eq!(topology().strips(), vec![1, 2]);
    }

    #[test]
    fn strip_length_lookup() {
        let t = topology();
        assert_eq!(t.strip_length(1), Some(100));
        assert_eq!(t.strip_length(2), Some(60));
        assert_eq!(t.strip_length(9), None);
    }

    #[test]
    fn lookup_leds_sorted_by_offset() {
        let leds = topology().lookup_leds(&bindicator("A", 1, 1));
        assert_eq!(
            leds,
            vec![
                Led { strip: 1, offset: 10 },
                Led { strip: 1, offset: 11 },
                Led { strip: 1, offset: 12 },
            ]
        );
    }

    #[test]
    fn lookup_leds_no_match_is_empty() {
        let t = topology();
        assert!(t.lookup_leds(&bindicator("B", 1, 1)).is_empty());
        assert!(t.lookup_leds(&bindicator("A", 9, 1)).is_empty());
        assert!(t.lookup_leds(&bindicator("A", 1, 9)).is_empty());
    }

    #[test]
    fn lookup_leds_exact_match_required() {
        // shelf and bin must both match the placement
        let leds = topology().lookup_leds(&bindicator("A", 1, 2));
        assert_eq!(leds, vec![Led { strip: 2, offset: 5 }]);
    }

    #[test]
    fn peripheral_address_from_config() {
        assert_eq!(
            topology().peripheral_address(),
            crate::config::DEFAULT_PERIPHERAL_ADDRESS
        );
    }
}
