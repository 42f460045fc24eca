//! PDF object model.
//!
//! `Object` is the tagged variant at the heart of the resolved graph. Streams
//! carry their dictionary and raw payload together; decoding happens through
//! [`decode_stream_payload`] and is memoized by the owning
//! [`Document`](crate::document::Document), never mutated afterwards.

use crate::decoders::{self, DecodeParams};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// A PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer
    Integer(i64),
    /// Real
    Real(f64),
    /// String payload as raw bytes (text encoding is a higher-level concern)
    String(Vec<u8>),
    /// Name without the leading slash
    Name(String),
    /// Array
    Array(Vec<Object>),
    /// Dictionary
    Dictionary(HashMap<String, Object>),
    /// Stream: dictionary plus raw (still-encoded) payload
    Stream {
        /// Stream dictionary
        dict: HashMap<String, Object>,
        /// Raw payload bytes, exactly as they appear in the file
        data: bytes::Bytes,
    },
    /// Indirect reference
    Reference(ObjectRef),
}

/// Identity of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Human-readable type name, without data.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as f64, accepting both integers and reals. Content
    /// stream operands use either form interchangeably.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Name value, if this is a name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// String bytes, if this is a string.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Dictionary view. Streams expose their dictionary here too.
    pub fn as_dict(&self) -> Option<&HashMap<String, Object>> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Array view.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Reference, if this is one.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// True for the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }
}

/// Extract the filter chain from a stream dictionary.
///
/// /Filter is a single name or an array of names applied in order.
pub fn filter_chain(dict: &HashMap<String, Object>) -> Vec<String> {
    match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract predictor parameters from /DecodeParms, which may be a dictionary
/// or an array of dictionaries (first non-null wins here; chained predictor
/// stacks are not seen in practice).
pub fn decode_params(dict: &HashMap<String, Object>) -> Option<DecodeParams> {
    let parms = match dict.get("DecodeParms")? {
        Object::Dictionary(d) => d,
        Object::Array(items) => items.iter().find_map(|o| o.as_dict())?,
        _ => return None,
    };

    let get = |key: &str, default: i64| parms.get(key).and_then(|o| o.as_int()).unwrap_or(default);

    Some(DecodeParams {
        predictor: get("Predictor", 1),
        columns: get("Columns", 1) as usize,
        colors: get("Colors", 1) as usize,
        bits_per_component: get("BitsPerComponent", 8) as usize,
    })
}

/// Run a stream payload through its declared filter pipeline.
///
/// Some generators leave extra whitespace between the `stream` keyword and
/// the payload; it is trimmed before filtering.
pub fn decode_stream_payload(dict: &HashMap<String, Object>, data: &[u8]) -> Result<Vec<u8>> {
    let start = data
        .iter()
        .position(|&c| !crate::lexer::is_pdf_whitespace(c))
        .unwrap_or(data.len());
    let body = &data[start..];

    let filters = filter_chain(dict);
    if filters.is_empty() {
        return Ok(body.to_vec());
    }
    decoders::decode_pipeline(body, &filters, decode_params(dict).as_ref())
}

/// Decode a PDF text string to Unicode.
///
/// Strings with a UTF-16BE byte-order mark are decoded as UTF-16; everything
/// else is treated as PDFDocEncoding, which for the printable range matches
/// Latin-1 closely enough for leak detection.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let mut out = String::with_capacity(bytes.len() / 2);
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|p| u16::from_be_bytes([p[0], p[1]]))
            .collect();
        for ch in char::decode_utf16(units.into_iter()) {
            out.push(ch.unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        out
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Error helper for "expected a stream".
pub fn expect_stream(obj: &Object) -> Result<(&HashMap<String, Object>, &bytes::Bytes)> {
    match obj {
        Object::Stream { dict, data } => Ok((dict, data)),
        other => Err(Error::InvalidPdf(format!(
            "expected stream, found {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casts() {
        assert_eq!(Object::Integer(7).as_int(), Some(7));
        assert_eq!(Object::Integer(7).as_number(), Some(7.0));
        assert_eq!(Object::Real(1.5).as_number(), Some(1.5));
        assert_eq!(Object::Name("X".into()).as_name(), Some("X"));
        assert!(Object::Null.is_null());
        assert!(Object::Boolean(true).as_bool().unwrap());
    }

    #[test]
    fn test_stream_exposes_dict() {
        let mut dict = HashMap::new();
        dict.insert("Length".to_string(), Object::Integer(5));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"hello"),
        };
        assert_eq!(obj.as_dict().unwrap().get("Length").unwrap().as_int(), Some(5));
    }

    #[test]
    fn test_filter_chain_forms() {
        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), Object::Name("FlateDecode".into()));
        assert_eq!(filter_chain(&dict), vec!["FlateDecode"]);

        dict.insert(
            "Filter".to_string(),
            Object::Array(vec![
                Object::Name("ASCII85Decode".into()),
                Object::Name("FlateDecode".into()),
            ]),
        );
        assert_eq!(filter_chain(&dict), vec!["ASCII85Decode", "FlateDecode"]);

        dict.remove("Filter");
        assert!(filter_chain(&dict).is_empty());
    }

    #[test]
    fn test_decode_payload_no_filter_trims_leading_ws() {
        let dict = HashMap::new();
        let decoded = decode_stream_payload(&dict, b"\r\nraw bytes").unwrap();
        assert_eq!(decoded, b"raw bytes");
    }

    #[test]
    fn test_decode_payload_hex_filter() {
        let mut dict = HashMap::new();
        dict.insert("Filter".to_string(), Object::Name("ASCIIHexDecode".into()));
        let decoded = decode_stream_payload(&dict, b"48656C6C6F>").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_decode_text_string_utf16() {
        // FEFF 0053 0065 0063 = "Sec"
        let bytes = [0xFE, 0xFF, 0x00, b'S', 0x00, b'e', 0x00, b'c'];
        assert_eq!(decode_text_string(&bytes), "Sec");
    }

    #[test]
    fn test_decode_text_string_latin1_fallback() {
        assert_eq!(decode_text_string(b"caf\xe9"), "caf\u{e9}");
    }

    #[test]
    fn test_object_ref_display() {
        assert_eq!(format!("{}", ObjectRef::new(10, 0)), "10 0 R");
    }

    #[test]
    fn test_decode_params_defaults() {
        let mut dict = HashMap::new();
        let mut parms = HashMap::new();
        parms.insert("Predictor".to_string(), Object::Integer(12));
        parms.insert("Columns".to_string(), Object::Integer(4));
        dict.insert("DecodeParms".to_string(), Object::Dictionary(parms));

        let p = decode_params(&dict).unwrap();
        assert_eq!(p.predictor, 12);
        assert_eq!(p.columns, 4);
        assert_eq!(p.colors, 1);
        assert_eq!(p.bits_per_component, 8);
    }
}
