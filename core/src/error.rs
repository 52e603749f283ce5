//! Demo error types

/// Fatal outcomes of the demo sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DemoError {
    /// Modem power-up, SIM unlock or registration failed
    InitFailed,
    /// Packet data connection could not be activated
    ConnectFailed,
    /// One of the server names did not resolve
    DnsFailed,
}

impl core::fmt::Display for DemoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InitFailed => write!(f, "Unable to initialise the interface"),
            Self::ConnectFailed => write!(f, "Unable to connect to the packet network"),
            Self::DnsFailed => write!(f, "Unable to resolve server addresses"),
        }
    }
}

impl core::error::Error for DemoError {}

/// Failure of one UDP or TCP exchange inside the loop
///
/// These never stop the demo; the loop moves on to the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// Socket could not be opened
    Open,
    /// TCP connect failed
    Connect,
    /// Send failed or accepted fewer bytes than requested
    Send,
    /// Nothing was received before the timeout
    Receive,
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Open => write!(f, "Socket open failed"),
            Self::Connect => write!(f, "Socket connect failed"),
            Self::Send => write!(f, "Socket send failed"),
            Self::Receive => write!(f, "No response received"),
        }
    }
}

impl core::error::Error for SessionError {}
