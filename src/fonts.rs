//! Font text decoding.
//!
//! Show-operator strings are byte codes, not text. Mapping them to Unicode
//! uses, in priority order: the font's /ToUnicode CMap, the declared simple
//! encoding with /Differences applied, and finally a Latin-1 byte fallback.
//! Getting a leak's exact glyphs wrong is acceptable; dropping its letters
//! entirely is not, so every path produces something.

use crate::document::Document;
use crate::error::Result;
use crate::lexer::{next_token, Token};
use crate::object::Object;
use crate::parser;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Glyph names seen in /Differences arrays, restricted to the ones
    /// that actually occur in redacted office documents.
    static ref GLYPH_NAMES: HashMap<&'static str, char> = {
        let mut m = HashMap::new();
        for (name, ch) in [
            ("space", ' '),
            ("exclam", '!'),
            ("quotedbl", '"'),
            ("numbersign", '#'),
            ("dollar", '$'),
            ("percent", '%'),
            ("ampersand", '&'),
            ("quotesingle", '\''),
            ("parenleft", '('),
            ("parenright", ')'),
            ("asterisk", '*'),
            ("plus", '+'),
            ("comma", ','),
            ("hyphen", '-'),
            ("period", '.'),
            ("slash", '/'),
            ("zero", '0'),
            ("one", '1'),
            ("two", '2'),
            ("three", '3'),
            ("four", '4'),
            ("five", '5'),
            ("six", '6'),
            ("seven", '7'),
            ("eight", '8'),
            ("nine", '9'),
            ("colon", ':'),
            ("semicolon", ';'),
            ("less", '<'),
            ("equal", '='),
            ("greater", '>'),
            ("question", '?'),
            ("at", '@'),
            ("bracketleft", '['),
            ("backslash", '\\'),
            ("bracketright", ']'),
            ("asciicircum", '^'),
            ("underscore", '_'),
            ("grave", '`'),
            ("braceleft", '{'),
            ("bar", '|'),
            ("braceright", '}'),
            ("asciitilde", '~'),
            ("quoteleft", '\u{2018}'),
            ("quoteright", '\u{2019}'),
            ("quotedblleft", '\u{201C}'),
            ("quotedblright", '\u{201D}'),
            ("bullet", '\u{2022}'),
            ("endash", '\u{2013}'),
            ("emdash", '\u{2014}'),
            ("fi", '\u{FB01}'),
            ("fl", '\u{FB02}'),
            ("adieresis", '\u{E4}'),
            ("odieresis", '\u{F6}'),
            ("udieresis", '\u{FC}'),
            ("eacute", '\u{E9}'),
            ("egrave", '\u{E8}'),
            ("ccedilla", '\u{E7}'),
            ("germandbls", '\u{DF}'),
            ("Euro", '\u{20AC}'),
        ] {
            m.insert(name, ch);
        }
        m
    };

    /// Byte-to-char base table: Latin-1 with the WinAnsi assignments in
    /// 0x80-0x9F. Good enough for Standard, WinAnsi, and MacRoman alike at
    /// the fidelity a text audit needs.
    static ref BASE_TABLE: [char; 256] = {
        let mut table = ['\0'; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8 as char;
        }
        for (code, ch) in [
            (0x80u8, '\u{20AC}'),
            (0x82, '\u{201A}'),
            (0x83, '\u{0192}'),
            (0x84, '\u{201E}'),
            (0x85, '\u{2026}'),
            (0x86, '\u{2020}'),
            (0x87, '\u{2021}'),
            (0x88, '\u{02C6}'),
            (0x89, '\u{2030}'),
            (0x8A, '\u{0160}'),
            (0x8B, '\u{2039}'),
            (0x8C, '\u{0152}'),
            (0x8E, '\u{017D}'),
            (0x91, '\u{2018}'),
            (0x92, '\u{2019}'),
            (0x93, '\u{201C}'),
            (0x94, '\u{201D}'),
            (0x95, '\u{2022}'),
            (0x96, '\u{2013}'),
            (0x97, '\u{2014}'),
            (0x98, '\u{02DC}'),
            (0x99, '\u{2122}'),
            (0x9A, '\u{0161}'),
            (0x9B, '\u{203A}'),
            (0x9C, '\u{0153}'),
            (0x9E, '\u{017E}'),
            (0x9F, '\u{0178}'),
        ] {
            table[code as usize] = ch;
        }
        table
    };
}

fn glyph_to_char(name: &str) -> Option<char> {
    if let Some(&ch) = GLYPH_NAMES.get(name) {
        return Some(ch);
    }
    let mut chars = name.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        return Some(only);
    }
    // uniXXXX and uXXXX / uXXXXXX forms
    let hex = name
        .strip_prefix("uni")
        .or_else(|| name.strip_prefix('u').filter(|h| h.len() >= 4))?;
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

/// Parsed /ToUnicode CMap.
#[derive(Debug, Default)]
struct ToUnicode {
    /// Explicit bfchar mappings and small expanded bfranges.
    map: HashMap<u32, String>,
    /// Large bfranges kept as (lo, hi, dst_base).
    ranges: Vec<(u32, u32, u32)>,
    /// Source code width in bytes, from the bfchar/bfrange sources.
    code_bytes: usize,
}

const RANGE_EXPAND_LIMIT: u32 = 1024;

impl ToUnicode {
    fn lookup(&self, code: u32) -> Option<String> {
        if let Some(s) = self.map.get(&code) {
            return Some(s.clone());
        }
        for &(lo, hi, base) in &self.ranges {
            if (lo..=hi).contains(&code) {
                return char::from_u32(base + (code - lo)).map(String::from);
            }
        }
        None
    }
}

/// A font as the interpreter sees it: resource name plus decode tables.
#[derive(Debug)]
pub struct Font {
    /// Resource name, e.g. "F1".
    pub name: String,
    /// Per-byte overrides from /Differences.
    differences: HashMap<u8, char>,
    to_unicode: Option<ToUnicode>,
    /// Code width for show strings: 1 for simple fonts, 2 for Type0.
    code_bytes: usize,
}

impl Font {
    /// Build a font from its resolved dictionary. Never fails; a font the
    /// audit cannot understand still decodes through the byte fallback.
    pub fn from_dict(doc: &Document, name: &str, dict: &HashMap<String, Object>) -> Self {
        let subtype = dict.get("Subtype").and_then(|o| o.as_name()).unwrap_or("");
        let mut code_bytes = if subtype == "Type0" { 2 } else { 1 };

        let mut differences = HashMap::new();
        if let Some(enc) = dict.get("Encoding") {
            if let Some(enc_dict) = doc.resolve(enc).as_dict() {
                parse_differences(doc, enc_dict, &mut differences);
            }
        }

        let to_unicode = dict
            .get("ToUnicode")
            .and_then(|o| o.as_reference())
            .and_then(|r| match doc.decoded_stream(r) {
                Ok(payload) => match parse_cmap(&payload) {
                    Ok(cmap) => Some(cmap),
                    Err(e) => {
                        log::warn!("font {}: bad /ToUnicode CMap: {}", name, e);
                        None
                    },
                },
                Err(e) => {
                    log::warn!("font {}: /ToUnicode stream: {}", name, e);
                    None
                },
            });

        // Trust the CMap's own code width over the subtype guess.
        if let Some(cmap) = &to_unicode {
            if cmap.code_bytes > 0 {
                code_bytes = cmap.code_bytes;
            }
        }

        Self {
            name: name.to_string(),
            differences,
            to_unicode,
            code_bytes,
        }
    }

    /// A font with no tables at all, used when a Tf names an unknown
    /// resource.
    pub fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            differences: HashMap::new(),
            to_unicode: None,
            code_bytes: 1,
        }
    }

    /// Number of glyph codes a show string of this many bytes carries.
    pub fn glyph_count(&self, bytes: &[u8]) -> usize {
        bytes.len().div_ceil(self.code_bytes)
    }

    /// Decode a show-operator string to Unicode text.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());

        for chunk in bytes.chunks(self.code_bytes) {
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));

            if let Some(cmap) = &self.to_unicode {
                if let Some(s) = cmap.lookup(code) {
                    out.push_str(&s);
                    continue;
                }
            }

            if self.code_bytes == 1 {
                let byte = code as u8;
                if let Some(&ch) = self.differences.get(&byte) {
                    out.push(ch);
                } else {
                    out.push(BASE_TABLE[byte as usize]);
                }
            } else {
                // Unmapped multi-byte code: keep it if it happens to be a
                // valid scalar, otherwise fall back to the raw bytes.
                match char::from_u32(code) {
                    Some(ch) => out.push(ch),
                    None => out.extend(chunk.iter().map(|&b| b as char)),
                }
            }
        }

        out
    }
}

fn parse_differences(
    doc: &Document,
    enc_dict: &HashMap<String, Object>,
    out: &mut HashMap<u8, char>,
) {
    let Some(diff) = enc_dict.get("Differences") else {
        return;
    };
    let diff = doc.resolve(diff);
    let Some(items) = diff.as_array() else {
        return;
    };

    let mut code: i64 = 0;
    for item in items {
        match item {
            Object::Integer(n) => code = *n,
            Object::Name(glyph) => {
                if (0..=255).contains(&code) {
                    if let Some(ch) = glyph_to_char(glyph) {
                        out.insert(code as u8, ch);
                    }
                }
                code += 1;
            },
            _ => {},
        }
    }
}

fn hex_token_to_bytes(digits: &[u8]) -> Result<Vec<u8>> {
    parser::decode_hex_digits(digits)
}

fn bytes_to_code(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn bytes_to_utf16_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|p| u16::from_be_bytes([p[0], p[1]]))
        .collect();
    if units.is_empty() && !bytes.is_empty() {
        // Odd-length destination, read it as Latin-1
        return bytes.iter().map(|&b| b as char).collect();
    }
    String::from_utf16_lossy(&units)
}

/// Parse the bfchar and bfrange sections of a /ToUnicode CMap.
fn parse_cmap(payload: &[u8]) -> Result<ToUnicode> {
    let mut cmap = ToUnicode::default();
    let mut rest: &[u8] = payload;

    while !crate::lexer::skip_ws(rest).is_empty() {
        let trimmed = crate::lexer::skip_ws(rest);
        if trimmed.starts_with(b"beginbfchar") {
            rest = parse_bfchar(&trimmed[b"beginbfchar".len()..], &mut cmap);
        } else if trimmed.starts_with(b"beginbfrange") {
            rest = parse_bfrange(&trimmed[b"beginbfrange".len()..], &mut cmap);
        } else {
            // Skip one token; keywords the lexer does not know are skipped
            // bytewise.
            match next_token(trimmed) {
                Ok((r, _)) => rest = r,
                Err(_) => rest = &trimmed[1..],
            }
        }
    }

    Ok(cmap)
}

fn parse_bfchar<'a>(mut input: &'a [u8], cmap: &mut ToUnicode) -> &'a [u8] {
    loop {
        let trimmed = crate::lexer::skip_ws(input);
        if trimmed.is_empty() || trimmed.starts_with(b"endbfchar") {
            return trimmed
                .strip_prefix(b"endbfchar")
                .unwrap_or(trimmed);
        }

        let Ok((rest, Token::Hex(src))) = next_token(trimmed) else {
            return advance_one(trimmed);
        };
        let Ok((rest, Token::Hex(dst))) = next_token(rest) else {
            return advance_one(trimmed);
        };
        input = rest;

        let (Ok(src), Ok(dst)) = (hex_token_to_bytes(src), hex_token_to_bytes(dst)) else {
            continue;
        };
        if src.is_empty() {
            continue;
        }
        cmap.code_bytes = cmap.code_bytes.max(src.len());
        cmap.map
            .insert(bytes_to_code(&src), bytes_to_utf16_string(&dst));
    }
}

fn parse_bfrange<'a>(mut input: &'a [u8], cmap: &mut ToUnicode) -> &'a [u8] {
    loop {
        let trimmed = crate::lexer::skip_ws(input);
        if trimmed.is_empty() || trimmed.starts_with(b"endbfrange") {
            return trimmed
                .strip_prefix(b"endbfrange")
                .unwrap_or(trimmed);
        }

        let Ok((rest, Token::Hex(lo))) = next_token(trimmed) else {
            return advance_one(trimmed);
        };
        let Ok((rest, Token::Hex(hi))) = next_token(rest) else {
            return advance_one(trimmed);
        };
        let (Ok(lo_bytes), Ok(hi_bytes)) = (hex_token_to_bytes(lo), hex_token_to_bytes(hi)) else {
            return advance_one(trimmed);
        };
        if lo_bytes.is_empty() {
            return advance_one(trimmed);
        }
        cmap.code_bytes = cmap.code_bytes.max(lo_bytes.len());
        let lo = bytes_to_code(&lo_bytes);
        let hi = bytes_to_code(&hi_bytes).max(lo);

        // Destination: single hex (incrementing base) or array of hex
        // strings, one per code.
        match next_token(rest) {
            Ok((after, Token::Hex(dst))) => {
                input = after;
                let Ok(dst_bytes) = hex_token_to_bytes(dst) else {
                    continue;
                };
                let dst_text = bytes_to_utf16_string(&dst_bytes);
                if hi - lo <= RANGE_EXPAND_LIMIT {
                    let mut chars = dst_text.chars().collect::<Vec<_>>();
                    for code in lo..=hi {
                        cmap.map.insert(code, chars.iter().collect());
                        // Increment the final scalar, matching how writers
                        // emit contiguous ranges
                        if let Some(last) = chars.last_mut() {
                            if let Some(next) = char::from_u32(*last as u32 + 1) {
                                *last = next;
                            }
                        }
                    }
                } else if let Some(first) = dst_text.chars().next() {
                    cmap.ranges.push((lo, hi, first as u32));
                }
            },
            Ok((after, Token::ArrayOpen)) => {
                let mut code = lo;
                let mut cursor = after;
                loop {
                    match next_token(cursor) {
                        Ok((r, Token::Hex(dst))) => {
                            cursor = r;
                            if let Ok(dst_bytes) = hex_token_to_bytes(dst) {
                                cmap.map.insert(code, bytes_to_utf16_string(&dst_bytes));
                            }
                            code += 1;
                        },
                        Ok((r, Token::ArrayClose)) => {
                            cursor = r;
                            break;
                        },
                        Ok((r, _)) => cursor = r,
                        Err(_) => break,
                    }
                }
                input = cursor;
            },
            _ => return advance_one(trimmed),
        }
    }
}

fn advance_one(input: &[u8]) -> &[u8] {
    if input.is_empty() {
        input
    } else {
        &input[1..]
    }
}
