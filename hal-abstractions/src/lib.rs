//! Hardware abstraction traits for cellular firmware
//!
//! This crate defines the traits the demo sequence is written against.
//! Modem drivers implement them; the demo never sees AT commands or UART
//! details.
//!
//! - **`cellular`**: bring-up of the packet data connection and DNS
//! - **`socket`**: UDP and TCP sockets hosted on the modem's IP stack

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod cellular;
pub mod socket;

pub use cellular::{CellularInterface, Credentials};
pub use socket::{Socket, SocketStack, TcpStack, UdpStack};
