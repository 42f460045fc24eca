//! RunLengthDecode: length byte 0-127 copies N+1 literal bytes, 129-255
//! repeats the next byte 257-N times, 128 is end-of-data.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// RunLengthDecode filter.
pub struct RunLengthDecoder;

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let tag = input[i];
            i += 1;
            match tag {
                0..=127 => {
                    let n = tag as usize + 1;
                    let chunk = input.get(i..i + n).ok_or_else(|| {
                        Error::Decode(format!(
                            "RunLengthDecode: literal run of {} bytes truncated",
                            n
                        ))
                    })?;
                    out.extend_from_slice(chunk);
                    i += n;
                },
                128 => break,
                129..=255 => {
                    let n = 257 - tag as usize;
                    let &byte = input.get(i).ok_or_else(|| {
                        Error::Decode("RunLengthDecode: repeat run missing its byte".to_string())
                    })?;
                    i += 1;
                    out.resize(out.len() + n, byte);
                },
            }
        }

        Ok(out)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}
