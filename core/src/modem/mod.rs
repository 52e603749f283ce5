//! u-blox cellular modem driver
//!
//! Drives a SARA-series module through an [`atat`] client and uses the
//! module's internal TCP/IP stack for DNS and sockets:
//!
//! - **`command`**: typed AT commands, responses and URCs
//! - **`error`**: `ModemError`
//! - **`hex`**: hex payload encoding used by the socket commands
//! - **`ublox`**: `UbloxModem`, implementing the `hal-abstractions` traits
//!
//! The board owns the `atat` ingress and feeds it from the UART receive
//! half; the driver only ever sees the client.

/// Re-export of the `atat` version the commands are built against
pub use atat;

pub mod command;
pub mod error;
mod hex;
pub mod ublox;

pub use error::ModemError;
pub use ublox::UbloxModem;

#[cfg(test)]
pub(crate) mod testing;
