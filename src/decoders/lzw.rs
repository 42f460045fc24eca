//! LZWDecode.
//!
//! PDF's LZW dialect uses MSB-first bit packing, 9-bit initial codes, clear
//! code 256 and EOD 257, with the EarlyChange=1 convention of widening the
//! code size one entry before the table fills. The weezl crate handles the
//! common case; a small hand implementation covers streams weezl rejects
//! (typically off-by-one EarlyChange encodings).

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use std::collections::HashMap;

const CLEAR: u16 = 256;
const EOD: u16 = 257;
const FIRST_FREE: u16 = 258;
const MAX_BITS: u8 = 12;

/// LZWDecode filter.
pub struct LzwDecoder;

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        match weezl_decode(input) {
            Ok(out) => Ok(out),
            Err(e) => {
                log::warn!("LZWDecode: weezl failed ({}), using fallback decoder", e);
                fallback_decode(input)
            },
        }
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

fn weezl_decode(input: &[u8]) -> Result<Vec<u8>> {
    use weezl::{decode::Decoder, BitOrder};
    Decoder::new(BitOrder::Msb, 8)
        .decode(input)
        .map_err(|e| Error::Decode(format!("LZWDecode: {:?}", e)))
}

fn fallback_decode(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut table: HashMap<u16, Vec<u8>> = base_table();
    let mut width: u8 = 9;
    let mut next_code = FIRST_FREE;
    let mut prev: Option<u16> = None;
    let mut bits = Bits::new(input);

    loop {
        // EarlyChange: widen when the next code to assign reaches 2^width - 1
        if width < MAX_BITS && next_code == (1 << width) - 1 {
            width += 1;
        }

        let code = match bits.take(width) {
            Some(c) => c as u16,
            None => break,
        };

        if code == EOD {
            break;
        }
        if code == CLEAR {
            table = base_table();
            width = 9;
            next_code = FIRST_FREE;
            prev = None;
            continue;
        }

        let seq = if let Some(seq) = table.get(&code) {
            seq.clone()
        } else if code == next_code {
            // KwKwK case: previous sequence plus its own first byte
            let prev_seq = prev
                .and_then(|p| table.get(&p))
                .ok_or_else(|| Error::Decode(format!("LZWDecode: orphan code {}", code)))?;
            let mut seq = prev_seq.clone();
            seq.push(prev_seq[0]);
            seq
        } else {
            return Err(Error::Decode(format!(
                "LZWDecode: code {} out of range (next {})",
                code, next_code
            )));
        };

        out.extend_from_slice(&seq);

        if let Some(p) = prev {
            if next_code < (1 << MAX_BITS) {
                if let Some(prev_seq) = table.get(&p) {
                    let mut entry = prev_seq.clone();
                    entry.push(seq[0]);
                    table.insert(next_code, entry);
                    next_code += 1;
                }
            }
        }
        prev = Some(code);
    }

    Ok(out)
}

fn base_table() -> HashMap<u16, Vec<u8>> {
    (0..=255u16).map(|i| (i, vec![i as u8])).collect()
}

/// MSB-first bit cursor.
struct Bits<'a> {
    data: &'a [u8],
    pos: usize, // absolute bit position
}

impl<'a> Bits<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: u8) -> Option<u32> {
        let n = n as usize;
        if self.pos + n > self.data.len() * 8 {
            return None;
        }
        let mut v = 0u32;
        for _ in 0..n {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            v = (v << 1) | u32::from(bit);
            self.pos += 1;
        }
        Some(v)
    }
}
