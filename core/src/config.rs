//! Demo and modem configuration structures

use crate::ntp::NTP_PORT;

/// Demo sequence configuration
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// SIM PIN, needed only when PIN checking is enabled on the SIM
    pub pin: Option<&'static str>,
    /// Access Point Name; `None` leaves it to the network
    pub apn: Option<&'static str>,
    /// APN user name
    pub username: Option<&'static str>,
    /// APN password
    pub password: Option<&'static str>,
    /// NTP server queried over UDP
    pub ntp_host: &'static str,
    pub ntp_port: u16,
    /// HTTP server queried over TCP
    pub http_host: &'static str,
    pub http_port: u16,
    /// Path requested with HTTP/1.0 GET
    pub http_path: &'static str,
    /// Receive timeout applied to both sockets
    pub socket_timeout_ms: u32,
    /// Pause between loop iterations
    pub loop_interval_ms: u32,
    /// Give up connecting after this many attempts (`None` retries forever)
    pub max_connect_attempts: Option<u32>,
    /// Whether the board has a user button that can stop the loop
    pub has_user_button: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pin: Some("0000"),
            apn: None,
            username: None,
            password: None,
            ntp_host: "2.pool.ntp.org",
            ntp_port: NTP_PORT,
            http_host: "developer.mbed.org",
            http_port: 80,
            http_path: "/media/uploads/mbed_official/hello.txt",
            socket_timeout_ms: 10_000,
            loop_interval_ms: 5_000,
            max_connect_attempts: None,
            has_user_button: true,
        }
    }
}

/// u-blox modem driver configuration
///
/// Per-command timeouts are part of each AT command definition.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Number of `AT` attempts made while waiting for the modem to wake
    pub power_on_attempts: u32,
    /// Time allowed for network registration
    pub registration_timeout_ms: u32,
    /// Interval between registration status queries
    pub registration_poll_ms: u32,
    /// Interval between pending-data queries while receiving
    pub receive_poll_ms: u32,
    /// Packet switched data profile used for the connection
    pub profile: u8,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            power_on_attempts: 10,
            registration_timeout_ms: 180_000,
            registration_poll_ms: 1_000,
            receive_poll_ms: 100,
            profile: 0,
        }
    }
}
