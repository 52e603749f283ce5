//! Hex payloads for the socket commands in hex mode (`AT+UDCONF=1,1`)

use core::fmt::{self, Write};

use heapless::String;

use super::error::ModemError;

/// Renders bytes as upper-case hex without an intermediate buffer
pub(crate) struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Hex text of `bytes` for a quoted command argument
pub(crate) fn encode<const N: usize>(bytes: &[u8]) -> Result<String<N>, ModemError> {
    let mut text = String::new();
    write!(text, "{}", HexBytes(bytes)).map_err(|_| ModemError::BufferOverflow)?;
    Ok(text)
}

/// Decode `hex` into the front of `out`, returning the byte count
pub(crate) fn decode_into(hex: &str, out: &mut [u8]) -> Result<usize, ModemError> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(ModemError::UnexpectedResponse);
    }
    let len = digits.len() / 2;
    if len > out.len() {
        return Err(ModemError::BufferOverflow);
    }
    for (byte, pair) in out.iter_mut().zip(digits.chunks_exact(2)) {
        *byte = (nibble(pair[0])? << 4) | nibble(pair[1])?;
    }
    Ok(len)
}

fn nibble(digit: u8) -> Result<u8, ModemError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(ModemError::UnexpectedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_encode() {
        assert_eq!(HexBytes(&[0x1B, 0x00, 0xAF]).to_string(), "1B00AF");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }

    #[test]
    fn test_encode_into_bounded_string() {
        assert_eq!(encode::<6>(&[0x47, 0x45, 0x54]).unwrap().as_str(), "474554");
        assert_eq!(encode::<4>(&[0x47, 0x45, 0x54]), Err(ModemError::BufferOverflow));
    }

    #[test]
    fn test_decode_mixed_case() {
        let mut out = [0u8; 4];
        assert_eq!(decode_into("1b00Af", &mut out), Ok(3));
        assert_eq!(&out[..3], &[0x1B, 0x00, 0xAF]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let mut out = [0u8; 1];
        assert_eq!(decode_into("ABC", &mut out), Err(ModemError::UnexpectedResponse));
        assert_eq!(decode_into("ZZ", &mut out), Err(ModemError::UnexpectedResponse));
        assert_eq!(decode_into("ABCD", &mut out), Err(ModemError::BufferOverflow));
    }
}
