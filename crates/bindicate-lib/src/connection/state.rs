//! Connection state machine — pure transitions, no I/O.
//!
//! The runtime feeds [`ConnectionEvent`]s in and executes the returned
//! [`Action`]s; this module never touches the Bluetooth stack. `Scanning`
//! is the resting state: every failure path leads back to it and retries
//! indefinitely — there is no terminal failure state.

use std::fmt;
use std::time::Duration;

/// Delay before retrying after a failed scan start.
pub const SCAN_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle state of the link to the strip controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not yet started.
    Idle,
    /// Looking for the configured peripheral; the resting/retry state.
    Scanning,
    /// Connection attempt in progress.
    Connecting,
    /// Connected, locating the LED service and characteristic.
    Discovering,
    /// Characteristic established — writes are accepted.
    Ready,
    /// Link dropped; tearing down before returning to `Scanning`.
    Disconnected,
}

impl ConnectionState {
    /// Whether `write()` is currently allowed.
    pub fn is_ready(self) -> bool {
        matches!(self, ConnectionState::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Scanning => "scanning",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Discovering => "discovering",
            ConnectionState::Ready => "ready",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Events fed to the state machine by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Manager started.
    Start,
    /// Scan could not be started.
    ScanFailed,
    /// The scan retry delay elapsed.
    RetryElapsed,
    /// A scanned peripheral's address matched the configured target.
    PeripheralMatched,
    /// Connection attempt succeeded.
    ConnectSucceeded,
    /// Connection attempt failed.
    ConnectFailed,
    /// Target service and characteristic were found.
    CharacteristicFound,
    /// Service discovery failed or the characteristic is missing.
    DiscoveryFailed,
    /// The established link dropped (disconnect event or write failure).
    LinkLost,
    /// Post-disconnect teardown finished.
    CleanupComplete,
}

/// Side effects the runtime must execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartScan,
    StopScan,
    Connect,
    DiscoverTarget,
    Disconnect,
    /// Arm the scan retry timer ([`SCAN_RETRY_DELAY`]).
    ScheduleRetry,
}

/// Compute the next state and the actions it requires.
///
/// Events that make no sense in the current state are ignored: the state
/// is returned unchanged with no actions.
pub fn transition(
    state: ConnectionState,
    event: ConnectionEvent,
) -> (ConnectionState, Vec<Action>) {
    use Action::*;
    use ConnectionEvent as E;
    use ConnectionState as S;

    match (state, event) {
        (S::Idle, E::Start) => (S::Scanning, vec![StartScan]),

        (S::Scanning, E::ScanFailed) => (S::Scanning, vec![ScheduleRetry]),
        (S::Scanning, E::RetryElapsed) => (S::Scanning, vec![StartScan]),
        (S::Scanning, E::PeripheralMatched) => (S::Connecting, vec![StopScan, Connect]),

        (S::Connecting, E::ConnectSucceeded) => (S::Discovering, vec![DiscoverTarget]),
        (S::Connecting, E::ConnectFailed | E::LinkLost) => {
            (S::Scanning, vec![Disconnect, StartScan])
        }

        (S::Discovering, E::CharacteristicFound) => (S::Ready, vec![]),
        (S::Discovering, E::DiscoveryFailed | E::LinkLost) => {
            (S::Scanning, vec![Disconnect, StartScan])
        }

        (S::Ready, E::LinkLost) => (S::Disconnected, vec![Disconnect]),
        (S::Disconnected, E::CleanupComplete) => (S::Scanning, vec![StartScan]),

        (s, _) => (s, vec![]),
    }
}
