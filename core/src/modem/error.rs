//! Modem driver error types

/// Modem operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemError {
    /// No final result code before the timeout
    Timeout,
    /// Serial port read or write failed
    Serial,
    /// Modem answered `ERROR`
    CommandFailed,
    /// Modem answered `+CME ERROR` or `+CMS ERROR`
    Cme,
    /// A response was missing or did not parse
    UnexpectedResponse,
    /// Command or response did not fit the driver's buffers
    BufferOverflow,
    /// Argument cannot be sent to the modem (e.g. contains a quote)
    InvalidArgument,
    /// SIM is locked and no PIN was given
    SimPinRequired,
    /// SIM is in a state the driver does not handle (PUK, not inserted)
    SimNotReady,
    /// Network rejected the registration
    RegistrationDenied,
    /// Not registered before the registration timeout
    NotRegistered,
    /// Packet data context is not active
    NotConnected,
    /// Address is not usable with the modem's stack
    InvalidAddress,
    /// Host name did not resolve
    DnsFailed,
}

impl core::fmt::Display for ModemError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "AT command timeout"),
            Self::Serial => write!(f, "Serial port error"),
            Self::CommandFailed => write!(f, "AT command failed"),
            Self::Cme => write!(f, "Modem reported an error"),
            Self::UnexpectedResponse => write!(f, "Unexpected response"),
            Self::BufferOverflow => write!(f, "Buffer overflow"),
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::SimPinRequired => write!(f, "SIM PIN required"),
            Self::SimNotReady => write!(f, "SIM not ready"),
            Self::RegistrationDenied => write!(f, "Registration denied"),
            Self::NotRegistered => write!(f, "Not registered"),
            Self::NotConnected => write!(f, "Not connected"),
            Self::InvalidAddress => write!(f, "Invalid address"),
            Self::DnsFailed => write!(f, "DNS resolution failed"),
        }
    }
}

impl core::error::Error for ModemError {}

impl From<atat::Error> for ModemError {
    fn from(e: atat::Error) -> Self {
        match e {
            atat::Error::Timeout => Self::Timeout,
            atat::Error::Read | atat::Error::Write => Self::Serial,
            atat::Error::CmeError(_) | atat::Error::CmsError(_) => Self::Cme,
            atat::Error::Parse | atat::Error::InvalidResponse => Self::UnexpectedResponse,
            _ => Self::CommandFailed,
        }
    }
}

impl embedded_io::Error for ModemError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Timeout => embedded_io::ErrorKind::TimedOut,
            Self::Serial => embedded_io::ErrorKind::BrokenPipe,
            Self::UnexpectedResponse => embedded_io::ErrorKind::InvalidData,
            Self::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            Self::InvalidArgument | Self::InvalidAddress => embedded_io::ErrorKind::InvalidInput,
            Self::NotConnected => embedded_io::ErrorKind::NotConnected,
            Self::DnsFailed => embedded_io::ErrorKind::NotFound,
            Self::RegistrationDenied => embedded_io::ErrorKind::PermissionDenied,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}
