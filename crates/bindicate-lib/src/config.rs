//! Application configuration — TOML-based, platform-aware paths.
//!
//! The config file describes the physical installation: which strips exist
//! (id, LED count, controller output line), which LED offsets belong to
//! each cart/shelf/bin, and the Bluetooth address of the strip controller.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use btleplug::api::BDAddr;
use serde::{Deserialize, Serialize};

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# Bindicate configuration — strip topology and Bluetooth target.\n\n";

/// Built-in peripheral address used when the config does not set one.
pub const DEFAULT_PERIPHERAL_ADDRESS: &str = "c1:29:2a:84:46:cd";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bluetooth: BluetoothConfig,

    /// Physical strips driven by the controller.
    #[serde(default)]
    pub strips: Vec<StripConfig>,

    /// Cart/shelf/bin placements mapped to LED offsets on a strip.
    #[serde(default)]
    pub bins: Vec<BinConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BluetoothConfig {
    /// Advertised address of the strip controller peripheral.
    #[serde(default = "default_address")]
    pub address: String,
}

fn default_address() -> String {
    DEFAULT_PERIPHERAL_ADDRESS.into()
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        BluetoothConfig {
            address: default_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    /// Strip id as addressed on the wire.
    pub id: u8,
    /// Count of physical LEDs.
    pub length: u16,
    /// Controller output line driving the strip. Defaults to the strip id.
    #[serde(default)]
    pub line: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinConfig {
    pub cart: String,
    pub shelf: u32,
    pub bin: u32,
    /// Strip the bin's LEDs live on.
    pub strip: u8,
    /// LED offsets belonging to this bin, zero-based within the strip.
    pub offsets: Vec<u16>,
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The Bluetooth address is not a parseable `aa:bb:cc:dd:ee:ff` form.
    InvalidAddress(String),
    /// Two strip entries share the same id.
    DuplicateStrip(u8),
    /// A strip has zero length.
    EmptyStrip(u8),
    /// A bin references a strip id not present in `strips`.
    UnknownStrip { cart: String, shelf: u32, bin: u32, strip: u8 },
    /// A bin offset lies outside its strip's length.
    OffsetOutOfRange { cart: String, shelf: u32, bin: u32, offset: u16, length: u16 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidAddress(a) => {
                write!(f, "Invalid Bluetooth address: {a}")
            }
            ValidationError::DuplicateStrip(id) => write!(f, "Duplicate strip id {id}"),
            ValidationError::EmptyStrip(id) => write!(f, "Strip {id} has zero length"),
            ValidationError::UnknownStrip { cart, shelf, bin, strip } => {
                write!(f, "Bin {cart}/{shelf}/{bin} references unknown strip {strip}")
            }
            ValidationError::OffsetOutOfRange { cart, shelf, bin, offset, length } => {
                write!(
                    f,
                    "Bin {cart}/{shelf}/{bin} offset {offset} exceeds strip length {length}"
                )
            }
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bindicate"))
    }

    /// Full path to the config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from the default path, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Load config from the default path, returning the config and any
    /// parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Load config from an arbitrary path, returning the config and any
    /// parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Save config to an arbitrary path atomically (write temp, then rename).
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save config to the default platform path.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Validate the entire config, collecting all errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if parse_address(&self.bluetooth.address).is_none() {
            errors.push(ValidationError::InvalidAddress(
                self.bluetooth.address.clone(),
            ));
        }

        let mut seen = Vec::new();
        for strip in &self.strips {
            if seen.contains(&strip.id) {
                errors.push(ValidationError::DuplicateStrip(strip.id));
            }
            seen.push(strip.id);
            if strip.length == 0 {
                errors.push(ValidationError::EmptyStrip(strip.id));
            }
        }

        for bin in &self.bins {
            let Some(strip) = self.strips.iter().find(|s| s.id == bin.strip) else {
                errors.push(ValidationError::UnknownStrip {
                    cart: bin.cart.clone(),
                    shelf: bin.shelf,
                    bin: bin.bin,
                    strip: bin.strip,
                });
                continue;
            };
            for &offset in &bin.offsets {
                if offset >= strip.length {
                    errors.push(ValidationError::OffsetOutOfRange {
                        cart: bin.cart.clone(),
                        shelf: bin.shelf,
                        bin: bin.bin,
                        offset,
                        length: strip.length,
                    });
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// A starter config with one strip and one placement, for `config --init`.
    pub fn example() -> Self {
        Config {
            bluetooth: BluetoothConfig::default(),
            strips: vec![StripConfig {
                id: 0,
                length: 60,
                line: None,
            }],
            bins: vec![BinConfig {
                cart: "A".into(),
                shelf: 1,
                bin: 1,
                strip: 0,
                offsets: vec![0, 1, 2],
            }],
        }
    }
}

/// Parse a configured Bluetooth address (`aa:bb:cc:dd:ee:ff`).
pub fn parse_address(s: &str) -> Option<BDAddr> {
    BDAddr::from_str(s.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults and parsing ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.bluetooth.address, DEFAULT_PERIPHERAL_ADDRESS);
        assert!(c.strips.is_empty());
        assert!(c.bins.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c.bluetooth.address, DEFAULT_PERIPHERAL_ADDRESS);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("[bluetooth]\naddress = \"aa:bb:cc:dd:ee:ff\"").unwrap();
        assert_eq!(c.bluetooth.address, "aa:bb:cc:dd:ee:ff");
        assert!(c.strips.is_empty());
    }

    #[test]
    fn full_toml_parses() {
        let toml_str = r#"
[bluetooth]
address = "c1:29:2a:84:46:cd"

[[strips]]
id = 1
length = 100

[[strips]]
id = 2
length = 60
line = 5

[[bins]]
cart = "A"
shelf = 1
bin = 1
strip = 1
offsets = [10, 11, 12]
"#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.strips.len(), 2);
        assert_eq!(c.strips[1].line, Some(5));
        assert_eq!(c.bins[0].offsets, vec![10, 11, 12]);
    }

    #[test]
    fn serialize_roundtrip() {
        let c = Config::example();
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c2.strips.len(), 1);
        assert_eq!(c2.bins.len(), 1);
        assert_eq!(c2.bins[0].offsets, vec![0, 1, 2]);
    }

    #[test]
    fn config_path_ends_with_toml() {
        let path = Config::path().unwrap();
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }

    // ── save_to / load_from ──

    #[test]
    fn save_to_load_from_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::example().save_to(&path).unwrap();
        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded.strips.len(), 1);
        assert_eq!(loaded.bins[0].cart, "A");
    }

    #[test]
    fn save_to_includes_header_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::example().save_to(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Bindicate configuration"));
    }

    #[test]
    fn save_to_cleans_up_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::example().save_to(&path).unwrap();
        assert!(!dir.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = Config::load_from(&dir.path().join("nope.toml"));
        assert!(warnings.is_empty());
        assert_eq!(config.bluetooth.address, DEFAULT_PERIPHERAL_ADDRESS);
    }

    #[test]
    fn load_from_invalid_toml_returns_defaults_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();

        let (config, warnings) = Config::load_from(&path);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
        assert!(config.strips.is_empty());
    }

    // ── validate ──

    #[test]
    fn validate_example_ok() {
        assert!(Config::example().validate().is_ok());
    }

    #[test]
    fn validate_bad_address() {
        let mut c = Config::example();
        c.bluetooth.address = "not-an-address".into();
        let errs = c.validate().unwrap_err();
        assert!(matches!(errs[0], ValidationError::InvalidAddress(_)));
    }

    #[test]
    fn validate_duplicate_strip() {
        let mut c = Config::example();
        c.strips.push(StripConfig { id: 0, length: 10, line: None });
        let errs = c.validate().unwrap_err();
        assert!(errs.contains(&ValidationError::DuplicateStrip(0)));
    }

    #[test]
    fn validate_zero_length_strip() {
        let mut c = Config::example();
        c.strips[0].length = 0;
        let errs = c.validate().unwrap_err();
        assert!(errs.contains(&ValidationError::EmptyStrip(0)));
        // offsets are now out of range too
        assert!(errs.len() >= 2);
    }

    #[test]
    fn validate_unknown_strip_reference() {
        let mut c = Config::example();
        c.bins[0].strip = 9;
        let errs = c.validate().unwrap_err();
        assert!(matches!(errs[0], ValidationError::UnknownStrip { strip: 9, .. }));
    }

    #[test]
    fn validate_offset_out_of_range() {
        let mut c = Config::example();
        c.bins[0].offsets.push(60); // length is 60, valid offsets end at 59
        let errs = c.validate().unwrap_err();
        assert!(matches!(
            errs[0],
            ValidationError::OffsetOutOfRange { offset: 60, length: 60, .. }
        ));
    }

    #[test]
    fn validation_error_display() {
        let e = ValidationError::UnknownStrip {
            cart: "A".into(),
            shelf: 1,
            bin: 2,
            strip: 7,
        };
        assert_eq!(e.to_string(), "Bin A/1/2 references unknown strip 7");
    }

    // ── parse_address ──

    #[test]
    fn parse_address_valid() {
        assert_eq!(
            parse_address("c1:29:2a:84:46:cd"),
            Some(BDAddr::from([0xc1, 0x29, 0x2a, 0x84, 0x46, 0xcd]))
        );
        assert_eq!(
            parse_address("AA:BB:CC:DD:EE:FF"),
            Some(BDAddr::from([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]))
        );
    }

    #[test]
    fn parse_address_invalid() {
        assert_eq!(parse_address(""), None);
        assert_eq!(parse_address("c1:29:2a:84:46"), None);
        assert_eq!(parse_address("c1:29:2a:84:46:cd:00"), None);
        assert_eq!(parse_address("g1:29:2a:84:46:cd"), None);
        assert_eq!(parse_address("c1-29-2a-84-46-cd"), None);
    }

    #[test]
    fn default_address_parses() {
        assert!(parse_address(DEFAULT_PERIPHERAL_ADDRESS).is_some());
    }
}
