//! Operator scanning for content streams.
//!
//! A content stream is a flat sequence of operands followed by an operator
//! word. The scanner yields one [`Operation`] at a time and never fails:
//! a byte that fits neither grammar is skipped and counted, resuming one
//! byte later. Redaction tools leave half-edited streams behind, and a leak
//! hiding after the damage still has to be found.

use crate::object::Object;
use crate::parser;

/// One operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operands in stack order.
    pub operands: Vec<Object>,
    /// Operator word, e.g. "Tj".
    pub operator: String,
    /// Byte offset of the operator within the stream.
    pub offset: usize,
}

/// Iterator over the operations of a content stream.
pub struct ContentScanner<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bytes skipped during resynchronization.
    pub skipped_bytes: usize,
}

impl<'a> ContentScanner<'a> {
    /// Scan the given decoded content bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            skipped_bytes: 0,
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn advance_to(&mut self, rest: &[u8]) {
        self.pos = self.data.len() - rest.len();
    }

    /// Skip an inline image: everything from `ID` to the next standalone
    /// `EI`. Inline image pixels cannot carry operator text.
    fn skip_inline_image(&mut self) {
        let body = self.remaining();
        let id_pos = match find_word(body, b"ID") {
            Some(p) => p + 2,
            None => {
                self.pos = self.data.len();
                return;
            },
        };
        let after_id = &body[id_pos..];
        match find_word(after_id, b"EI") {
            Some(p) => self.pos += id_pos + p + 2,
            None => self.pos = self.data.len(),
        }
    }
}

/// Find a standalone word: preceded and followed by whitespace, a
/// delimiter, or a stream boundary.
fn find_word(data: &[u8], word: &[u8]) -> Option<usize> {
    let mut from = 0;
    while from + word.len() <= data.len() {
        let pos = data[from..]
            .windows(word.len())
            .position(|w| w == word)?
            + from;
        let before_ok = pos == 0 || !is_regular(data[pos - 1]);
        let after_ok = pos + word.len() >= data.len() || !is_regular(data[pos + word.len()]);
        if before_ok && after_ok {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

fn is_regular(c: u8) -> bool {
    !crate::lexer::is_pdf_whitespace(c) && !crate::lexer::is_pdf_delimiter(c)
}

impl<'a> Iterator for ContentScanner<'a> {
    type Item = Operation;

    fn next(&mut self) -> Option<Operation> {
        let mut operands = Vec::new();

        loop {
            let trimmed = crate::lexer::skip_ws(self.remaining());
            self.advance_to(trimmed);
            if trimmed.is_empty() {
                return None;
            }

            // Operator words start with a regular, non-operand byte. Try
            // them first so `true`/`null` operands still go through the
            // value parser below.
            if let Some((word, rest)) = take_operator_word(trimmed) {
                self.advance_to(rest);
                if word == "BI" {
                    self.skip_inline_image();
                    operands.clear();
                    continue;
                }
                return Some(Operation {
                    operands,
                    operator: word,
                    offset: self.data.len() - trimmed.len(),
                });
            }

            match parser::parse_value(trimmed) {
                Ok((rest, obj)) => {
                    operands.push(obj);
                    self.advance_to(rest);
                    // Runaway operand lists mean the stream is damaged;
                    // drop the oldest to bound memory.
                    if operands.len() > 64 {
                        operands.remove(0);
                    }
                },
                Err(_) => {
                    // Resync: skip one byte and start the operand list over
                    self.pos += 1;
                    self.skipped_bytes += 1;
                    operands.clear();
                },
            }
        }
    }
}

/// Take an operator word if the input starts with one.
///
/// Returns None when the input starts with something the value parser
/// should handle: a delimiter, a digit, a sign, or one of the keyword
/// operands (`true`, `false`, `null`).
fn take_operator_word(input: &[u8]) -> Option<(String, &[u8])> {
    let first = *input.first()?;
    if !is_regular(first) || first.is_ascii_digit() || matches!(first, b'+' | b'-' | b'.') {
        return None;
    }

    let end = input
        .iter()
        .position(|&c| !is_regular(c))
        .unwrap_or(input.len());
    let word = &input[..end];

    if matches!(word, b"true" | b"false" | b"null") {
        return None;
    }
    // Operator words are short ASCII mnemonics
    if word.len() > 3 || !word.iter().all(|&c| c.is_ascii_graphic()) {
        return None;
    }

    Some((
        String::from_utf8_lossy(word).into_owned(),
        &input[end..],
    ))
}
