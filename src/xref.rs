//! Cross-reference machinery.
//!
//! Handles both the classic `xref` table and cross-reference streams,
//! following /Prev chains with the usual merge rule: entries from newer
//! sections shadow older ones. An xref stream referenced from a hybrid
//! file's /XRefStm is folded in the same way.

use crate::decoders;
use crate::error::{Error, Result};
use crate::lexer::{next_token, Token};
use crate::object::{self, Object};
use crate::parser;
use std::collections::HashMap;

/// How far back from EOF the `startxref` keyword is searched for.
const STARTXREF_TAIL: usize = 2048;

/// Cap on subsection entry counts; a count beyond this is corruption, not a
/// real document.
const MAX_SUBSECTION_ENTRIES: u64 = 1_000_000;

/// Cap on /Prev chain depth.
const MAX_PREV_DEPTH: u32 = 100;

/// Where an object's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free entry (type 0 / classic `f`)
    Free,
    /// Uncompressed object at a byte offset
    Uncompressed {
        /// Byte offset from the start of the file
        offset: u64,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the containing stream
        container: u32,
        /// Index within the stream
        index: u32,
    },
}

/// Merged cross-reference table plus the merged trailer dictionary.
#[derive(Debug, Default)]
pub struct XrefTable {
    entries: HashMap<u32, XrefEntry>,
    /// Trailer from the newest section; older trailers only contribute keys
    /// the newer ones lack.
    pub trailer: HashMap<String, Object>,
}

impl XrefTable {
    /// Look up an object number.
    pub fn get(&self, id: u32) -> Option<&XrefEntry> {
        self.entries.get(&id)
    }

    /// Number of known entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries were recovered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all known object numbers and their entries.
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &XrefEntry)> {
        self.entries.iter()
    }

    /// Insert an entry, keeping an existing one. Sections are applied
    /// newest-first, so the first writer wins.
    fn insert_if_absent(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    fn merge_trailer(&mut self, trailer: HashMap<String, Object>) {
        for (k, v) in trailer {
            self.trailer.entry(k).or_insert(v);
        }
    }
}

/// Find the byte offset announced by the `startxref` keyword near EOF.
pub fn find_startxref(data: &[u8]) -> Result<u64> {
    let tail_start = data.len().saturating_sub(STARTXREF_TAIL);
    let tail = &data[tail_start..];

    let pos = tail
        .windows(b"startxref".len())
        .rposition(|w| w == b"startxref")
        .ok_or(Error::InvalidXref)?;

    let after = &tail[pos + b"startxref".len()..];
    match next_token(after) {
        Ok((_, Token::Int(offset))) if offset >= 0 => Ok(offset as u64),
        _ => Err(Error::InvalidXref),
    }
}

/// Load the full cross-reference table starting from the given offset,
/// following /Prev links.
pub fn load(data: &[u8], start_offset: u64) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    let mut offset = Some(start_offset);
    let mut depth = 0u32;

    while let Some(off) = offset {
        depth += 1;
        if depth > MAX_PREV_DEPTH {
            return Err(Error::InvalidPdf(format!(
                "xref /Prev chain exceeds {} sections",
                MAX_PREV_DEPTH
            )));
        }

        let trailer = load_section(data, off, &mut table)?;

        let prev = trailer.get("Prev").and_then(|o| o.as_int());

        // Hybrid files point at an xref stream holding the compressed
        // entries the classic table cannot express.
        if let Some(xrefstm) = trailer.get("XRefStm").and_then(|o| o.as_int()) {
            if xrefstm >= 0 && (xrefstm as u64) < data.len() as u64 {
                if let Err(e) = load_section(data, xrefstm as u64, &mut table) {
                    log::warn!("ignoring broken /XRefStm section: {}", e);
                }
            }
        }

        table.merge_trailer(trailer);
        offset = prev.filter(|&p| p >= 0).map(|p| p as u64);
    }

    Ok(table)
}

/// Parse one section (classic table or xref stream) and fold its entries
/// into the table. Returns that section's trailer dictionary.
fn load_section(data: &[u8], offset: u64, table: &mut XrefTable) -> Result<HashMap<String, Object>> {
    let offset = offset as usize;
    if offset >= data.len() {
        return Err(Error::InvalidPdf(format!(
            "xref offset {} beyond file end {}",
            offset,
            data.len()
        )));
    }

    let section = &data[offset..];
    let rest = crate::lexer::skip_ws(section);

    if rest.starts_with(b"xref") {
        parse_classic_section(&rest[b"xref".len()..], table)
    } else {
        parse_stream_section(rest, table)
    }
}

/// Classic `xref` section: subsection headers `start count` followed by
/// 20-byte `offset gen n|f` lines. Malformed lines become free entries so
/// the surrounding numbering stays aligned.
fn parse_classic_section(
    input: &[u8],
    table: &mut XrefTable,
) -> Result<HashMap<String, Object>> {
    let mut rest = input;

    loop {
        let trimmed = crate::lexer::skip_ws(rest);
        if trimmed.starts_with(b"trailer") {
            rest = &trimmed[b"trailer".len()..];
            break;
        }

        let (after_start, start_tok) = next_token(trimmed).map_err(|_| Error::InvalidXref)?;
        let (after_count, count_tok) = next_token(after_start).map_err(|_| Error::InvalidXref)?;
        let (start, count) = match (start_tok, count_tok) {
            (Token::Int(s), Token::Int(c)) if s >= 0 && c >= 0 => (s as u64, c as u64),
            _ => return Err(Error::InvalidXref),
        };
        if count > MAX_SUBSECTION_ENTRIES {
            return Err(Error::InvalidPdf(format!(
                "xref subsection claims {} entries",
                count
            )));
        }

        rest = crate::lexer::skip_ws(after_count);
        for i in 0..count {
            let id = (start + i) as u32;
            let line_end = rest.len().min(20);
            let line = &rest[..line_end];

            match parse_classic_line(line) {
                Some(entry) => table.insert_if_absent(id, entry),
                None => {
                    log::warn!("malformed xref line for object {}, treating as free", id);
                    table.insert_if_absent(id, XrefEntry::Free);
                },
            }
            if rest.len() < 20 {
                return Err(Error::TruncatedFile("xref subsection".to_string()));
            }
            rest = &rest[20..];
        }
    }

    let (_, trailer_obj) = parser::parse_value(rest).map_err(|_| Error::InvalidXref)?;
    match trailer_obj {
        Object::Dictionary(d) => Ok(d),
        _ => Err(Error::InvalidXref),
    }
}

fn parse_classic_line(line: &[u8]) -> Option<XrefEntry> {
    let text = std::str::from_utf8(line).ok()?;
    let mut fields = text.split_ascii_whitespace();
    let offset: u64 = fields.next()?.parse().ok()?;
    let gen: u32 = fields.next()?.parse().ok()?;
    let kind = fields.next()?;

    match kind {
        "n" => Some(XrefEntry::Uncompressed {
            offset,
            gen: gen.min(u16::MAX as u32) as u16,
        }),
        "f" => Some(XrefEntry::Free),
        _ => None,
    }
}

/// Cross-reference stream: a stream object whose decoded payload packs
/// fixed-width big-endian fields per /W, covering the ranges in /Index.
/// Its dictionary doubles as the trailer.
fn parse_stream_section(
    input: &[u8],
    table: &mut XrefTable,
) -> Result<HashMap<String, Object>> {
    // This stream is decoded directly through the filter pipeline rather
    // than the document cache: the cache does not exist yet at this point.
    let (xref, obj) = parser::parse_indirect_object(input)?;
    let (dict, raw) = object::expect_stream(&obj)?;

    if dict.get("Type").and_then(|o| o.as_name()) != Some("XRef") {
        log::warn!("{} lacks /Type /XRef, parsing it as an xref stream anyway", xref);
    }

    let payload = object::decode_stream_payload(dict, raw)?;

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(|o| o.as_array())
        .ok_or(Error::InvalidXref)?
        .iter()
        .map(|o| o.as_int().unwrap_or(0).max(0) as usize)
        .collect();
    if widths.len() < 3 {
        return Err(Error::InvalidXref);
    }
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(Error::InvalidXref);
    }

    let size = dict
        .get("Size")
        .and_then(|o| o.as_int())
        .ok_or(Error::InvalidXref)?;

    // /Index defaults to [0 Size]
    let index: Vec<i64> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(items) => items.iter().filter_map(|o| o.as_int()).collect(),
        None => vec![0, size],
    };

    let mut row = 0usize;
    for pair in index.chunks(2) {
        let (start, count) = match pair {
            [s, c] if *s >= 0 && *c >= 0 => (*s as u64, *c as u64),
            _ => return Err(Error::InvalidXref),
        };
        if count > MAX_SUBSECTION_ENTRIES {
            return Err(Error::InvalidPdf(format!(
                "xref stream /Index claims {} entries",
                count
            )));
        }

        for i in 0..count {
            let at = row * row_len;
            row += 1;
            let Some(bytes) = payload.get(at..at + row_len) else {
                return Err(Error::TruncatedFile("xref stream payload".to_string()));
            };

            let mut cursor = bytes;
            // A zero-width type field defaults to type 1
            let kind = if widths[0] == 0 {
                1
            } else {
                read_be(&mut cursor, widths[0])
            };
            let f2 = read_be(&mut cursor, widths[1]);
            let f3 = read_be(&mut cursor, widths[2]);

            let id = (start + i) as u32;
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::Uncompressed {
                    offset: f2,
                    gen: f3.min(u16::MAX as u64) as u16,
                },
                2 => XrefEntry::Compressed {
                    container: f2.min(u32::MAX as u64) as u32,
                    index: f3.min(u32::MAX as u64) as u32,
                },
                other => {
                    log::warn!("xref stream entry type {} for object {}, skipping", other, id);
                    continue;
                },
            };
            table.insert_if_absent(id, entry);
        }
    }

    Ok(dict.clone())
}

fn read_be(cursor: &mut &[u8], width: usize) -> u64 {
    let mut value = 0u64;
    for &b in &cursor[..width] {
        value = (value << 8) | u64::from(b);
    }
    *cursor = &cursor[width..];
    value
}
