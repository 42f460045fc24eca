//! Object streams (/Type /ObjStm).
//!
//! An object stream packs /N non-stream objects into one compressed payload.
//! The payload opens with /N pairs of `object-number offset` integers; the
//! offsets are relative to /First. Individual objects that fail to parse are
//! logged and skipped rather than failing the whole stream.

use crate::error::{Error, Result};
use crate::lexer::{next_token, Token};
use crate::object::{Object, ObjectRef};
use crate::parser;
use std::collections::HashMap;

/// Caps matching what real files plausibly contain. Values beyond these are
/// corruption or abuse.
const MAX_OBJECTS: i64 = 1_000_000;
const MAX_FIRST: i64 = 10_000_000;

/// Parse a decoded object stream payload into its member objects.
///
/// All members carry generation 0 by definition.
pub fn parse(dict: &HashMap<String, Object>, payload: &[u8]) -> Result<Vec<(ObjectRef, Object)>> {
    let n = dict
        .get("N")
        .and_then(|o| o.as_int())
        .ok_or_else(|| Error::InvalidPdf("object stream missing /N".to_string()))?;
    let first = dict
        .get("First")
        .and_then(|o| o.as_int())
        .ok_or_else(|| Error::InvalidPdf("object stream missing /First".to_string()))?;

    if !(0..=MAX_OBJECTS).contains(&n) {
        return Err(Error::InvalidPdf(format!("object stream /N {} out of range", n)));
    }
    if !(0..=MAX_FIRST).contains(&first) {
        return Err(Error::InvalidPdf(format!(
            "object stream /First {} out of range",
            first
        )));
    }
    let first = first as usize;
    if first > payload.len() {
        return Err(Error::TruncatedFile("object stream header".to_string()));
    }

    // Header: n pairs of "id offset"
    let mut pairs = Vec::with_capacity(n as usize);
    let mut rest = &payload[..first];
    for _ in 0..n {
        let (after_id, id_tok) = next_token(rest).map_err(|_| {
            Error::InvalidPdf("object stream pair section ended early".to_string())
        })?;
        let (after_off, off_tok) = next_token(after_id).map_err(|_| {
            Error::InvalidPdf("object stream pair section ended early".to_string())
        })?;
        match (id_tok, off_tok) {
            (Token::Int(id), Token::Int(off)) if id >= 0 && off >= 0 => {
                pairs.push((id as u32, off as usize));
            },
            _ => {
                return Err(Error::InvalidPdf(
                    "object stream pair is not two integers".to_string(),
                ))
            },
        }
        rest = after_off;
    }

    let body = &payload[first..];
    let mut objects = Vec::with_capacity(pairs.len());
    for &(id, off) in &pairs {
        if off > body.len() {
            log::warn!("object {} offset {} beyond object stream body, skipping", id, off);
            continue;
        }
        match parser::parse_value(&body[off..]) {
            Ok((_, obj)) => objects.push((ObjectRef::new(id, 0), obj)),
            Err(e) => {
                log::warn!("object {} in object stream failed to parse: {}", id, e);
            },
        }
    }

    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objstm_dict(n: i64, first: i64) -> HashMap<String, Object> {
        let mut dict = HashMap::new();
        dict.insert("Type".to_string(), Object::Name("ObjStm".into()));
        dict.insert("N".to_string(), Object::Integer(n));
        dict.insert("First".to_string(), Object::Integer(first));
        dict
    }

    #[test]
    fn test_two_member_stream() {
        let payload = b"4 0 5 9 <</A 1>> (secret)";
        let dict = objstm_dict(2, 8);
        let objs = parse(&dict, payload).unwrap();
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[0].0, ObjectRef::new(4, 0));
        assert_eq!(
            objs[0].1.as_dict().unwrap().get("A").unwrap().as_int(),
            Some(1)
        );
        assert_eq!(objs[1].0, ObjectRef::new(5, 0));
        assert_eq!(objs[1].1.as_string_bytes(), Some(&b"secret"[..]));
    }

    #[test]
    fn test_bad_offset_skips_member() {
        let payload = b"4 0 5 9999 <</A 1>>";
        let dict = objstm_dict(2, 11);
        let objs = parse(&dict, payload).unwrap();
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].0, ObjectRef::new(4, 0));
    }

    #[test]
    fn test_missing_n_is_error() {
        let mut dict = objstm_dict(1, 4);
        dict.remove("N");
        assert!(parse(&dict, b"7 0 null").is_err());
    }

    #[test]
    fn test_first_beyond_payload_is_error() {
        let dict = objstm_dict(1, 500);
        assert!(parse(&dict, b"7 0 null").is_err());
    }

    #[test]
    fn test_absurd_n_rejected() {
        let dict = objstm_dict(5_000_000, 4);
        assert!(parse(&dict, b"").is_err());
    }
}
