//! Connection lifecycle for the single strip controller peripheral.
//!
//! Split into a pure state machine ([`state`]) and the btleplug-backed
//! runtime that drives it ([`manager`]). Every lifecycle decision lives in
//! the state machine so it can be tested without a Bluetooth adapter.

pub mod manager;
pub mod state;

pub use manager::{BleManager, LinkHandle};
pub use state::{Action, ConnectionEvent, ConnectionState, SCAN_RETRY_DELAY, transition};
