//! NTP request encoding and transmit-timestamp decoding
//!
//! The demo speaks just enough NTP to ask a server for the time and print
//! the answer: a 48-byte client request (LI=0, VN=3, Mode=3) and the
//! transmit timestamp at offset 40 of the reply.

use crate::calendar::DateTime;

/// Well-known NTP server port
pub const NTP_PORT: u16 = 123;

/// Length of an NTP packet without extensions
pub const NTP_PACKET_LEN: usize = 48;

/// NTP epoch offset (1900-01-01 to 1970-01-01 in seconds)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// First byte of a client request: LI=0, VN=3, Mode=3 (Client)
const CLIENT_REQUEST_HEADER: u8 = 0x1B;

/// Offset of the transmit timestamp (seconds) in a server reply
const TRANSMIT_TIMESTAMP_OFFSET: usize = 40;

/// Build a client time request
pub const fn request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_REQUEST_HEADER;
    packet
}

/// Timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Unix timestamp in seconds since epoch (1970-01-01 00:00:00 UTC)
    pub unix_secs: u64,
    /// Microseconds component (0-999,999)
    pub micros: u32,
}

impl Timestamp {
    pub const fn new(unix_secs: u64, micros: u32) -> Self {
        Self { unix_secs, micros }
    }

    /// Convert from an NTP timestamp (seconds since 1900-01-01, 2^-32 fraction)
    ///
    /// Values that would fall before 1970 in era 0 are taken from era 1,
    /// which starts on 2036-02-07.
    pub fn from_ntp(ntp_secs: u32, ntp_frac: u32) -> Self {
        let secs = ntp_secs as u64;
        let unix_secs = if secs >= NTP_UNIX_OFFSET {
            secs - NTP_UNIX_OFFSET
        } else {
            secs + (1u64 << 32) - NTP_UNIX_OFFSET
        };
        let micros = ((ntp_frac as u64 * 1_000_000) >> 32) as u32;
        Self::new(unix_secs, micros)
    }

    /// Calendar view of this timestamp (UTC)
    pub fn datetime(&self) -> DateTime {
        DateTime::from_unix(self.unix_secs)
    }
}

/// Extract the transmit timestamp from a server reply
///
/// Returns `None` when the reply is too short to hold the seconds field.
/// The fraction is used only when the full 48-byte packet is present.
pub fn decode_transmit_time(reply: &[u8]) -> Option<Timestamp> {
    // All four seconds bytes (40..44) are required. A 43-byte reply is
    // rejected rather than decoded with its low seconds byte missing.
    let secs = read_u32_be(reply, TRANSMIT_TIMESTAMP_OFFSET)?;
    let frac = read_u32_be(reply, TRANSMIT_TIMESTAMP_OFFSET + 4).unwrap_or(0);
    Some(Timestamp::from_ntp(secs, frac))
}

fn read_u32_be(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
