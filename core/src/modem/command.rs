//! AT commands used by the driver
//!
//! Every command is a typed [`atat`] command: the struct serializes to the
//! command line, names the response type the reply is parsed into and
//! carries its own timeout. Framing, echo removal, final result codes and
//! URC routing are done by `atat`'s ingress and client.

use atat::atat_derive::{AtatCmd, AtatEnum, AtatResp, AtatUrc};
use heapless::String;

/// Ingress buffer; must hold the longest response (a hex read of [`MAX_CHUNK`])
pub const INGRESS_BUF_SIZE: usize = 1280;
/// Client buffer; must hold the longest command (a hex write of [`MAX_CHUNK`])
pub const CLIENT_BUF_SIZE: usize = 1280;
pub const URC_CAPACITY: usize = 128;
pub const URC_SUBSCRIBERS: usize = 2;

/// Largest payload moved by one socket read or write command
pub const MAX_CHUNK: usize = 512;
/// [`MAX_CHUNK`] bytes in hex
pub const HEX_CHUNK: usize = 2 * MAX_CHUNK;

/// Longest dotted IPv4 or IPv6 text the modem returns
pub const MAX_ADDRESS_LEN: usize = 40;

#[derive(Debug, Clone, AtatResp)]
pub struct NoResponse;

/// Attention; answered with `OK` once the module is up
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, timeout_ms = 1000)]
pub struct At;

#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse)]
pub struct DisableEcho;

/// `+CMEE`: 1 reports numeric `+CME ERROR` codes
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMEE", NoResponse)]
pub struct SetErrorReporting {
    #[at_arg(position = 0)]
    pub mode: u8,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+CPIN?", PinStatus)]
pub struct GetPinStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinStatusCode {
    #[at_arg(value = "READY")]
    Ready,
    #[at_arg(value = "SIM PIN")]
    SimPin,
    #[at_arg(value = "SIM PUK")]
    SimPuk,
    #[at_arg(value = "PH-SIM PIN")]
    PhSimPin,
    #[at_arg(value = "SIM PIN2")]
    SimPin2,
    #[at_arg(value = "SIM PUK2")]
    SimPuk2,
}

#[derive(Debug, Clone, AtatResp)]
pub struct PinStatus {
    #[at_arg(position = 0)]
    pub code: PinStatusCode,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+CPIN", NoResponse, timeout_ms = 10000)]
pub struct SetPin<'a> {
    #[at_arg(position = 0, len = 16)]
    pub pin: &'a str,
}

/// `+UDCONF=1,<enabled>`: hex mode for socket payloads
#[derive(Clone, AtatCmd)]
#[at_cmd("+UDCONF", NoResponse)]
pub struct SetHexMode {
    #[at_arg(position = 0)]
    pub op_code: u8,
    #[at_arg(position = 1)]
    pub enabled: u8,
}

impl SetHexMode {
    pub fn enabled() -> Self {
        Self {
            op_code: 1,
            enabled: 1,
        }
    }
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+CGREG?", RegistrationStatus)]
pub struct GetGprsRegistration;

#[derive(Clone, AtatCmd)]
#[at_cmd("+CEREG?", RegistrationStatus)]
pub struct GetEpsRegistration;

/// `+CGREG: <n>,<stat>` / `+CEREG: <n>,<stat>`
#[derive(Debug, Clone, AtatResp)]
pub struct RegistrationStatus {
    #[at_arg(position = 0)]
    pub n: u8,
    #[at_arg(position = 1)]
    pub stat: u8,
}

/// `+UPSD=<profile>,<param>,<value>` for numeric parameters
#[derive(Clone, AtatCmd)]
#[at_cmd("+UPSD", NoResponse)]
pub struct SetProfileNumber {
    #[at_arg(position = 0)]
    pub profile: u8,
    #[at_arg(position = 1)]
    pub param: u8,
    #[at_arg(position = 2)]
    pub value: u8,
}

/// `+UPSD=<profile>,<param>,"<value>"` for APN and credentials
#[derive(Clone, AtatCmd)]
#[at_cmd("+UPSD", NoResponse)]
pub struct SetProfileString<'a> {
    #[at_arg(position = 0)]
    pub profile: u8,
    #[at_arg(position = 1)]
    pub param: u8,
    #[at_arg(position = 2, len = 64)]
    pub value: &'a str,
}

/// `+UPSDA=<profile>,<action>`: 3 activates, 4 deactivates
#[derive(Clone, AtatCmd)]
#[at_cmd("+UPSDA", NoResponse, timeout_ms = 180000)]
pub struct SetProfileAction {
    #[at_arg(position = 0)]
    pub profile: u8,
    #[at_arg(position = 1)]
    pub action: u8,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+UPSND", ProfileNetworkData)]
pub struct GetProfileNetworkData {
    #[at_arg(position = 0)]
    pub profile: u8,
    #[at_arg(position = 1)]
    pub param: u8,
}

#[derive(Debug, Clone, AtatResp)]
pub struct ProfileNetworkData {
    #[at_arg(position = 0)]
    pub profile: u8,
    #[at_arg(position = 1)]
    pub param: u8,
    #[at_arg(position = 2)]
    pub value: String<MAX_ADDRESS_LEN>,
}

/// `+UDNSRN=0,"<host>"`: name to address
#[derive(Clone, AtatCmd)]
#[at_cmd("+UDNSRN", ResolvedAddress, timeout_ms = 70000)]
pub struct ResolveName<'a> {
    #[at_arg(position = 0)]
    pub resolution_type: u8,
    #[at_arg(position = 1, len = 128)]
    pub host: &'a str,
}

#[derive(Debug, Clone, AtatResp)]
pub struct ResolvedAddress {
    #[at_arg(position = 0)]
    pub address: String<MAX_ADDRESS_LEN>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketProtocol {
    #[at_arg(value = 6)]
    Tcp,
    #[at_arg(value = 17)]
    Udp,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+USOCR", SocketCreated, timeout_ms = 10000)]
pub struct CreateSocket {
    #[at_arg(position = 0)]
    pub protocol: SocketProtocol,
}

#[derive(Debug, Clone, AtatResp)]
pub struct SocketCreated {
    #[at_arg(position = 0)]
    pub socket: u8,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+USOCO", NoResponse, timeout_ms = 30000)]
pub struct ConnectSocket<'a> {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1, len = 15)]
    pub remote_addr: &'a str,
    #[at_arg(position = 2)]
    pub remote_port: u16,
}

/// `+USOST`: one datagram, payload in hex
#[derive(Clone, AtatCmd)]
#[at_cmd("+USOST", SocketWritten, timeout_ms = 10000)]
pub struct SendTo<'a> {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1, len = 15)]
    pub remote_addr: &'a str,
    #[at_arg(position = 2)]
    pub remote_port: u16,
    #[at_arg(position = 3)]
    pub length: usize,
    #[at_arg(position = 4, len = 1024)]
    pub data: &'a str,
}

/// `+USOWR`: stream write, payload in hex
#[derive(Clone, AtatCmd)]
#[at_cmd("+USOWR", SocketWritten, timeout_ms = 10000)]
pub struct WriteSocket<'a> {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
    #[at_arg(position = 2, len = 1024)]
    pub data: &'a str,
}

#[derive(Debug, Clone, AtatResp)]
pub struct SocketWritten {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

/// `+USORF=<socket>,0`: bytes waiting in the next datagram
#[derive(Clone, AtatCmd)]
#[at_cmd("+USORF", PendingData)]
pub struct GetUdpPending {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

/// `+USORD=<socket>,0`: bytes waiting on the stream
#[derive(Clone, AtatCmd)]
#[at_cmd("+USORD", PendingData)]
pub struct GetTcpPending {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

#[derive(Debug, Clone, AtatResp)]
pub struct PendingData {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+USORF", UdpData, timeout_ms = 10000)]
pub struct ReadUdp {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

/// `+USORF: <socket>,"<ip>",<port>,<length>,"<hex>"`
#[derive(Debug, Clone, AtatResp)]
pub struct UdpData {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub remote_addr: String<MAX_ADDRESS_LEN>,
    #[at_arg(position = 2)]
    pub remote_port: u16,
    #[at_arg(position = 3)]
    pub length: usize,
    #[at_arg(position = 4)]
    pub data: String<HEX_CHUNK>,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+USORD", TcpData, timeout_ms = 10000)]
pub struct ReadTcp {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

/// `+USORD: <socket>,<length>,"<hex>"`
#[derive(Debug, Clone, AtatResp)]
pub struct TcpData {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
    #[at_arg(position = 2)]
    pub data: String<HEX_CHUNK>,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+USOCL", NoResponse, timeout_ms = 10000)]
pub struct CloseSocket {
    #[at_arg(position = 0)]
    pub socket: u8,
}

#[derive(Clone, AtatCmd)]
#[at_cmd("+CPWROFF", NoResponse, timeout_ms = 40000)]
pub struct PowerOff;

/// `+UUSORD`/`+UUSORF`: data arrived on a socket
#[derive(Debug, Clone, AtatResp)]
pub struct SocketDataAvailable {
    #[at_arg(position = 0)]
    pub socket: u8,
    #[at_arg(position = 1)]
    pub length: usize,
}

#[derive(Debug, Clone, AtatResp)]
pub struct SocketClosed {
    #[at_arg(position = 0)]
    pub socket: u8,
}

/// Unsolicited results the ingress routes away from command responses
///
/// The driver polls for pending data, so nothing subscribes to these yet;
/// they are declared so the digester never mistakes them for a reply.
#[derive(Debug, Clone, AtatUrc)]
pub enum Urc {
    #[at_urc("+UUSORD")]
    SocketDataAvailable(SocketDataAvailable),
    #[at_urc("+UUSORF")]
    DatagramAvailable(SocketDataAvailable),
    #[at_urc("+UUSOCL")]
    SocketClosed(SocketClosed),
}
