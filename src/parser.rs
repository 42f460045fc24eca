//! Recursive-descent parser assembling lexer tokens into [`Object`]s.
//!
//! The parser is deliberately lenient: redacted PDFs come from arbitrary
//! generators and the audit must read as much as it can. Unclosed arrays
//! and dictionaries at end of input return what was collected; only locally
//! unrecoverable constructs fail.

use crate::error::{Error, Result};
use crate::lexer::{next_token, Token};
use crate::object::{Object, ObjectRef};
use nom::IResult;
use std::collections::HashMap;

/// Decode escape sequences in a literal string body.
///
/// Handles the single-character escapes, 1-3 digit octal escapes, line
/// continuations, and keeps an unknown `\x` as the literal character per
/// the usual lenient reading.
pub fn decode_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            out.push(raw[i]);
            i += 1;
            continue;
        }

        match raw[i + 1] {
            b'n' => {
                out.push(b'\n');
                i += 2;
            },
            b'r' => {
                out.push(b'\r');
                i += 2;
            },
            b't' => {
                out.push(b'\t');
                i += 2;
            },
            b'b' => {
                out.push(0x08);
                i += 2;
            },
            b'f' => {
                out.push(0x0C);
                i += 2;
            },
            b'(' | b')' | b'\\' => {
                out.push(raw[i + 1]);
                i += 2;
            },
            // Line continuation: backslash-EOL disappears
            b'\n' => i += 2,
            b'\r' => {
                i += 2;
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            d if (b'0'..b'8').contains(&d) => {
                let mut value = 0u32;
                let mut n = 0;
                while n < 3 {
                    match raw.get(i + 1 + n) {
                        Some(&c) if (b'0'..b'8').contains(&c) => {
                            value = value * 8 + u32::from(c - b'0');
                            n += 1;
                        },
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
                i += 1 + n;
            },
            other => {
                // Unknown escape: the backslash is dropped, the char kept
                out.push(other);
                i += 2;
            },
        }
    }

    out
}

/// Decode the digit body of a hex string. Whitespace is already permitted
/// by the lexer; an odd trailing digit is padded with zero.
pub fn decode_hex_digits(digits: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(digits.len() / 2);
    let mut pending: Option<u8> = None;

    for &c in digits {
        if c.is_ascii_whitespace() {
            continue;
        }
        let nibble = (c as char).to_digit(16).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("invalid hex digit 0x{:02x} in string", c),
        })? as u8;
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

fn parse_err(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
}

/// Parse one PDF value.
///
/// An integer is disambiguated against an indirect reference by two-token
/// lookahead for `gen R`.
pub fn parse_value(input: &[u8]) -> IResult<&[u8], Object> {
    let (rest, tok) = next_token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::Bool(b) => Ok((rest, Object::Boolean(b))),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::Name(n) => Ok((rest, Object::Name(n))),

        Token::Int(n) => {
            if n >= 0 {
                if let Ok((after_gen, Token::Int(gen))) = next_token(rest) {
                    if (0..=u16::MAX as i64).contains(&gen) {
                        if let Ok((after_r, Token::RefMarker)) = next_token(after_gen) {
                            return Ok((
                                after_r,
                                Object::Reference(ObjectRef::new(n as u32, gen as u16)),
                            ));
                        }
                    }
                }
            }
            Ok((rest, Object::Integer(n)))
        },

        Token::Str(raw) => Ok((rest, Object::String(decode_string_escapes(raw)))),

        Token::Hex(digits) => match decode_hex_digits(digits) {
            Ok(bytes) => Ok((rest, Object::String(bytes))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Fail,
            ))),
        },

        Token::ArrayOpen => parse_array_body(rest),

        Token::DictOpen => {
            let (rest, dict) = parse_dict_body(rest)?;

            // A dictionary followed by `stream` is a stream object
            if let Ok((after_kw, Token::Stream)) = next_token(rest) {
                let (rest, data) = read_stream_payload(after_kw, &dict)?;
                return Ok((
                    rest,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(data),
                    },
                ));
            }

            Ok((rest, Object::Dictionary(dict)))
        },

        _ => Err(parse_err(input)),
    }
}

fn parse_array_body(mut input: &[u8]) -> IResult<&[u8], Object> {
    let mut items = Vec::new();

    loop {
        match next_token(input) {
            Ok((rest, Token::ArrayClose)) => return Ok((rest, Object::Array(items))),
            Ok(_) => match parse_value(input) {
                Ok((rest, obj)) => {
                    items.push(obj);
                    input = rest;
                },
                Err(e) => {
                    if crate::lexer::skip_ws(input).is_empty() {
                        log::warn!("unclosed array at end of input, keeping {} items", items.len());
                        return Ok((input, Object::Array(items)));
                    }
                    return Err(e);
                },
            },
            Err(_) if crate::lexer::skip_ws(input).is_empty() => {
                log::warn!("unclosed array at end of input, keeping {} items", items.len());
                return Ok((input, Object::Array(items)));
            },
            Err(e) => return Err(e),
        }
    }
}

fn parse_dict_body(mut input: &[u8]) -> IResult<&[u8], HashMap<String, Object>> {
    let mut dict = HashMap::new();

    loop {
        match next_token(input) {
            Ok((rest, Token::DictClose)) => return Ok((rest, dict)),
            Ok((rest, Token::Name(key))) => match parse_value(rest) {
                Ok((rest, value)) => {
                    dict.insert(key, value);
                    input = rest;
                },
                Err(e) => {
                    if crate::lexer::skip_ws(rest).is_empty() {
                        log::warn!("unclosed dictionary at end of input, keeping {} keys", dict.len());
                        return Ok((rest, dict));
                    }
                    return Err(e);
                },
            },
            Ok(_) => {
                // Key must be a name; anything else is unrecoverable here
                return Err(parse_err(input));
            },
            Err(_) if crate::lexer::skip_ws(input).is_empty() => {
                log::warn!("unclosed dictionary at end of input, keeping {} keys", dict.len());
                return Ok((input, dict));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Read stream payload bytes after the `stream` keyword.
///
/// The keyword must be followed by CRLF or LF; a bare CR or nothing at all
/// is tolerated with a warning. /Length gives the payload size; when it is
/// missing, indirect, or provably wrong, fall back to scanning for the
/// nearest `endstream`.
fn read_stream_payload<'a>(
    input: &'a [u8],
    dict: &HashMap<String, Object>,
) -> IResult<&'a [u8], Vec<u8>> {
    let body = if let Some(rest) = input.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\n") {
        rest
    } else if let Some(rest) = input.strip_prefix(b"\r") {
        log::warn!("stream keyword followed by bare CR");
        rest
    } else {
        log::warn!("stream keyword not followed by an EOL marker");
        input
    };

    if let Some(length) = dict.get("Length").and_then(|o| o.as_int()) {
        let length = length.max(0) as usize;
        if length <= body.len() {
            let tail = &body[length..];
            // The declared length is only trusted if endstream actually
            // follows; otherwise fall through to the scan.
            if let Ok((rest, Token::EndStream)) = next_token(tail) {
                return Ok((rest, body[..length].to_vec()));
            }
            log::warn!("/Length {} does not land on endstream, rescanning", length);
        } else {
            log::warn!(
                "/Length {} exceeds remaining {} bytes, rescanning",
                length,
                body.len()
            );
        }
    }

    match find_endstream(body) {
        Some(pos) => {
            let (rest, _) = next_token(&body[pos..])?;
            // Trim the EOL that conventionally precedes endstream
            let mut end = pos;
            if end > 0 && body[end - 1] == b'\n' {
                end -= 1;
            }
            if end > 0 && body[end - 1] == b'\r' {
                end -= 1;
            }
            Ok((rest, body[..end].to_vec()))
        },
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Eof,
        ))),
    }
}

fn find_endstream(data: &[u8]) -> Option<usize> {
    data.windows(b"endstream".len())
        .position(|w| w == b"endstream")
}

/// Parse the body of an indirect object: `N G obj <value> endobj`.
///
/// Used when following xref offsets; the trailing `endobj` is optional
/// because plenty of writers omit or misplace it.
pub fn parse_indirect_object(input: &[u8]) -> Result<(ObjectRef, Object)> {
    let (rest, id_tok) = next_token(input).map_err(|_| Error::ParseError {
        offset: 0,
        reason: "expected object number".to_string(),
    })?;
    let (rest, gen_tok) = next_token(rest).map_err(|_| Error::ParseError {
        offset: 0,
        reason: "expected generation number".to_string(),
    })?;
    let (rest, kw) = next_token(rest).map_err(|_| Error::ParseError {
        offset: 0,
        reason: "expected obj keyword".to_string(),
    })?;

    let (id, gen) = match (id_tok, gen_tok, kw) {
        (Token::Int(id), Token::Int(gen), Token::Obj) if id >= 0 && gen >= 0 => {
            (id as u32, gen as u16)
        },
        _ => {
            return Err(Error::ParseError {
                offset: 0,
                reason: "malformed indirect object header".to_string(),
            })
        },
    };

    let (_, obj) = parse_value(rest).map_err(|e| Error::ParseError {
        offset: 0,
        reason: format!("object {} {} body: {}", id, gen, e),
    })?;

    Ok((ObjectRef::new(id, gen), obj))
}
