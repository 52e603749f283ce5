//! Cellular data interface trait

use core::future::Future;
use core::net::IpAddr;

use embedded_io::ErrorType;

/// Packet network credentials
///
/// Any field left as `None` is not sent to the modem, which then falls back
/// to whatever the network or SIM provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials<'a> {
    /// Access Point Name of the carrier network
    pub apn: Option<&'a str>,
    /// APN user name
    pub username: Option<&'a str>,
    /// APN password
    pub password: Option<&'a str>,
}

/// A cellular modem that can register on a network and bring up packet data
///
/// Mirrors the lifecycle of a modem: `init` powers it up, unlocks the SIM and
/// waits for network registration; `connect` activates the data context;
/// `disconnect` and `deinit` undo those steps.
pub trait CellularInterface: ErrorType {
    /// Power up the modem, unlock the SIM with `pin` and wait for registration
    fn init(&mut self, pin: Option<&str>) -> impl Future<Output = Result<(), Self::Error>>;

    /// Store the credentials used by the next `connect`
    fn set_credentials(&mut self, credentials: Credentials<'_>) -> Result<(), Self::Error>;

    /// Activate the packet data connection
    fn connect(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Resolve `host` to an IP address using the network's DNS
    fn gethostbyname(&mut self, host: &str) -> impl Future<Output = Result<IpAddr, Self::Error>>;

    /// Deactivate the packet data connection
    fn disconnect(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Shut the modem down
    fn deinit(&mut self) -> impl Future<Output = Result<(), Self::Error>>;
}
