//! Platform-agnostic core logic for the u-blox cellular sockets demo
//!
//! This crate contains everything the firmware does that is not tied to a
//! particular MCU: the demo sequence, the status LED and stop-button logic,
//! NTP decoding, and a u-blox AT-command modem driver built on an
//! `atat` client. It has NO hardware dependencies and is
//! tested on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod button;
pub mod calendar;
pub mod config;
pub mod demo;
pub mod error;
pub mod modem;
pub mod ntp;
pub mod status;

pub use button::StopSignal;
pub use config::{DemoConfig, ModemConfig};
pub use demo::Demo;
pub use error::{DemoError, SessionError};
pub use modem::UbloxModem;
pub use status::{Status, StatusLeds};
