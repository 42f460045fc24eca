//! ASCII85Decode: 5 characters in `!`..`u` per 4 bytes, `z` shorthand for
//! four zero bytes, `~>` terminates.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCII85Decode filter.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() * 4 / 5);
        let mut group: u32 = 0;
        let mut len = 0usize;

        // Optional <~ prefix emitted by some encoders
        let body = input.strip_prefix(b"<~").unwrap_or(input);

        for &c in body {
            match c {
                b'~' => break,
                c if c.is_ascii_whitespace() => continue,
                b'z' if len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' inside a group".to_string(),
                    ))
                },
                b'!'..=b'u' => {
                    group = group
                        .checked_mul(85)
                        .and_then(|g| g.checked_add(u32::from(c - b'!')))
                        .ok_or_else(|| {
                            Error::Decode("ASCII85Decode: group overflow".to_string())
                        })?;
                    len += 1;
                    if len == 5 {
                        out.extend_from_slice(&group.to_be_bytes());
                        group = 0;
                        len = 0;
                    }
                },
                other => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid byte 0x{:02x}",
                        other
                    )))
                },
            }
        }

        // Final short group: pad with 'u' and keep len-1 bytes
        if len > 0 {
            if len == 1 {
                return Err(Error::Decode(
                    "ASCII85Decode: dangling single character".to_string(),
                ));
            }
            for _ in len..5 {
                group = group
                    .checked_mul(85)
                    .and_then(|g| g.checked_add(84))
                    .ok_or_else(|| Error::Decode("ASCII85Decode: padding overflow".to_string()))?;
            }
            out.extend_from_slice(&group.to_be_bytes()[..len - 1]);
        }

        Ok(out)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_group() {
        assert_eq!(Ascii85Decoder.decode(b"<+U,m").unwrap(), b"Test");
    }

    #[test]
    fn test_with_terminator_and_prefix() {
        assert_eq!(Ascii85Decoder.decode(b"<~<+U,m~>").unwrap(), b"Test");
    }

    #[test]
    fn test_z_shorthand() {
        assert_eq!(Ascii85Decoder.decode(b"zz").unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn test_z_mid_group_rejected() {
        assert!(Ascii85Decoder.decode(b"!z").is_err());
    }

    #[test]
    fn test_short_final_group() {
        // Decodes to some prefix of a 4-byte group; exact value checked by
        // re-deriving: "!!" -> one byte 0x00
        let out = Ascii85Decoder.decode(b"!!").unwrap();
        assert_eq!(out, vec![0u8]);
    }

    #[test]
    fn test_single_trailing_char_rejected() {
        assert!(Ascii85Decoder.decode(b"!").is_err());
    }

    #[test]
    fn test_invalid_byte_rejected() {
        assert!(Ascii85Decoder.decode(b"ab\x00cd").is_err());
    }
}
