//! Stream filter pipeline.
//!
//! Implements the filters a redaction audit must see through: FlateDecode,
//! ASCIIHexDecode, ASCII85Decode, LZWDecode and RunLengthDecode, plus the
//! PNG/TIFF predictors that Flate and LZW data may carry. Image codecs
//! (DCTDecode, JBIG2Decode, CCITTFaxDecode) are deliberately not decoded:
//! their pixels hold no operator text, and a stream using them degrades to a
//! raw-leftover scan of its undecoded bytes.

use crate::error::{Error, Result};

mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use flate::FlateDecoder;
pub use lzw::LzwDecoder;
pub use predictor::{apply_predictor, DecodeParams};
pub use runlength::RunLengthDecoder;

/// Decompression bomb guards. Adversarial inputs are this tool's normal
/// diet, so the caps are not optional.
const MAX_DECOMPRESSION_RATIO: u64 = 100;
const MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// Output below this size is exempt from the ratio check; tiny inputs
/// produce huge ratios legitimately.
const RATIO_CHECK_FLOOR: usize = 1024 * 1024;

/// A single stream filter.
pub trait StreamDecoder {
    /// Decode the input bytes.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Filter name as it appears in /Filter entries.
    fn name(&self) -> &str;
}

fn decoder_for(filter: &str) -> Result<Box<dyn StreamDecoder>> {
    match filter {
        "FlateDecode" | "Fl" => Ok(Box::new(FlateDecoder)),
        "ASCIIHexDecode" | "AHx" => Ok(Box::new(AsciiHexDecoder)),
        "ASCII85Decode" | "A85" => Ok(Box::new(Ascii85Decoder)),
        "LZWDecode" | "LZW" => Ok(Box::new(LzwDecoder)),
        "RunLengthDecode" | "RL" => Ok(Box::new(RunLengthDecoder)),
        other => Err(Error::UnsupportedFilter(other.to_string())),
    }
}

/// Apply a filter chain in declared order, then the predictor if one is
/// declared. Bomb guards run after every stage.
pub fn decode_pipeline(
    data: &[u8],
    filters: &[String],
    params: Option<&DecodeParams>,
) -> Result<Vec<u8>> {
    let compressed_size = data.len().max(1);
    let mut current = data.to_vec();

    for filter in filters {
        let decoder = decoder_for(filter)?;
        current = decoder.decode(&current)?;

        if current.len() > RATIO_CHECK_FLOOR {
            let ratio = current.len() as u64 / compressed_size as u64;
            if ratio > MAX_DECOMPRESSION_RATIO {
                return Err(Error::Decode(format!(
                    "decompression bomb: {} ratio {}:1 exceeds {}:1 ({} -> {} bytes)",
                    decoder.name(),
                    ratio,
                    MAX_DECOMPRESSION_RATIO,
                    compressed_size,
                    current.len()
                )));
            }
        }
        if current.len() > MAX_DECOMPRESSED_SIZE {
            return Err(Error::Decode(format!(
                "decompression bomb: output {} bytes exceeds {} byte cap",
                current.len(),
                MAX_DECOMPRESSED_SIZE
            )));
        }
    }

    if let Some(params) = params {
        if params.predictor != 1 {
            current = apply_predictor(&current, params)?;
        }
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_chain_is_identity() {
        let data = b"payload";
        assert_eq!(decode_pipeline(data, &[], None).unwrap(), data);
    }

    #[test]
    fn test_unsupported_filter_is_reported() {
        let result = decode_pipeline(b"x", &["DCTDecode".to_string()], None);
        match result {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "DCTDecode"),
            other => panic!("expected UnsupportedFilter, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_filters() {
        // ASCIIHex of "Hello"
        let data = b"48656C6C6F";
        let filters = vec!["ASCIIHexDecode".to_string()];
        assert_eq!(decode_pipeline(data, &filters, None).unwrap(), b"Hello");
    }

    #[test]
    fn test_abbreviated_filter_names() {
        let data = b"48656C6C6F";
        let filters = vec!["AHx".to_string()];
        assert_eq!(decode_pipeline(data, &filters, None).unwrap(), b"Hello");
    }
}
