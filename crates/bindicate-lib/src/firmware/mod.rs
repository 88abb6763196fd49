//! Strip controller firmware logic.
//!
//! [`StripDevice`](device::StripDevice) is the device-side counterpart to
//! the host's encoder: it validates received messages, mutates persistent
//! per-strip frame buffers, and pushes frames out through an [`LedDriver`].
//! The hardware seams (LED output, status LEDs) are traits so the same
//! logic runs against real drivers on the microcontroller build and
//! against the in-memory doubles in [`sim`].

pub mod device;
pub mod sim;

pub use device::{
    ERROR_PULSE, FirmwareError, HEARTBEAT_PERIOD, LedDriver, StatusIndicators, StripDevice,
    StripOutput, grb_bytes,
};
