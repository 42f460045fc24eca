//! ASCIIHexDecode: pairs of hex digits, whitespace ignored, `>` ends the
//! data, an odd trailing digit is padded with zero.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() / 2);
        let mut pending: Option<u8> = None;

        for &c in input {
            if c == b'>' {
                break;
            }
            if c.is_ascii_whitespace() {
                continue;
            }
            let nibble = hex_value(c).ok_or_else(|| {
                Error::Decode(format!("ASCIIHexDecode: invalid hex digit 0x{:02x}", c))
            })?;
            match pending.take() {
                Some(high) => out.push((high << 4) | nibble),
                None => pending = Some(nibble),
            }
        }

        if let Some(high) = pending {
            out.push(high << 4);
        }

        Ok(out)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        assert_eq!(AsciiHexDecoder.decode(b"48656C6C6F").unwrap(), b"Hello");
    }

    #[test]
    fn test_whitespace_and_eod() {
        assert_eq!(AsciiHexDecoder.decode(b"48 65 6c\n6C 6F> junk").unwrap(), b"Hello");
    }

    #[test]
    fn test_odd_length_pads_zero() {
        assert_eq!(AsciiHexDecoder.decode(b"41 4").unwrap(), vec![0x41, 0x40]);
    }

    #[test]
    fn test_empty() {
        assert_eq!(AsciiHexDecoder.decode(b"").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_invalid_digit() {
        assert!(AsciiHexDecoder.decode(b"4G").is_err());
    }
}
