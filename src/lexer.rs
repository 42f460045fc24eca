//! Low-level tokenizer for PDF syntax.
//!
//! PDF object syntax is PostScript-like: numbers, two string forms,
//! slash-prefixed names, bracketed arrays, `<< >>` dictionaries, and a
//! handful of keywords. The lexer produces one token at a time; assembling
//! tokens into objects is the parser's job.
//!
//! Whitespace (space, tab, CR, LF, NUL, FF) and `%` comments are skipped
//! before every token.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    sequence::{delimited, preceded},
    IResult,
};

/// One lexical unit of PDF syntax.
///
/// String payloads are returned raw: literal-string escape sequences and hex
/// digit pairs are decoded by the parser, not here. Name `#XX` escapes are
/// the one exception, decoded at this level because they affect how the
/// token itself is spelled.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer (42, -17, +3)
    Int(i64),
    /// Real (3.5, -.25, 6.)
    Real(f64),
    /// Raw bytes of a `(...)` literal string, escapes not yet decoded
    Str(&'a [u8]),
    /// Raw digits of a `<...>` hex string
    Hex(&'a [u8]),
    /// Name without the leading slash, `#XX` escapes decoded
    Name(String),
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
    /// `[`
    ArrayOpen,
    /// `]`
    ArrayClose,
    /// `<<`
    DictOpen,
    /// `>>`
    DictClose,
    /// `obj`
    Obj,
    /// `endobj`
    EndObj,
    /// `stream`
    Stream,
    /// `endstream`
    EndStream,
    /// `R`, the indirect-reference marker
    RefMarker,
}

/// PDF whitespace per the character classification table: NUL, tab, LF, FF,
/// CR and space.
pub(crate) fn is_pdf_whitespace(c: u8) -> bool {
    matches!(c, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// PDF delimiter characters. A name or operator token ends at any of these.
pub(crate) fn is_pdf_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Skip whitespace and `%` comments, in any interleaving.
pub(crate) fn skip_ws(mut input: &[u8]) -> &[u8] {
    loop {
        let ws_end = input
            .iter()
            .position(|&c| !is_pdf_whitespace(c))
            .unwrap_or(input.len());
        input = &input[ws_end..];

        if input.first() == Some(&b'%') {
            let line_end = input
                .iter()
                .position(|&c| c == b'\r' || c == b'\n')
                .unwrap_or(input.len());
            input = &input[line_end..];
            continue;
        }
        return input;
    }
}

fn lex_error(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Parse a number token, distinguishing integers from reals.
///
/// PDF permits a leading sign, a missing integer part (`.5`) and a missing
/// fraction (`5.`).
fn number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, sign) = opt(one_of("+-"))(input)?;
    let (rest, int_part) = opt(digit1)(rest)?;
    let (rest, frac) = opt(preceded(char('.'), opt(digit1)))(rest)?;

    if int_part.is_none() && frac.is_none() {
        return Err(lex_error(input, nom::error::ErrorKind::Digit));
    }

    let negative = sign == Some('-');

    match frac {
        Some(frac_digits) => {
            let int_str = int_part
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "0".to_string());
            let frac_str = frac_digits
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_else(|| "0".to_string());
            let mut v: f64 = format!("{}.{}", int_str, frac_str)
                .parse()
                .map_err(|_| lex_error(input, nom::error::ErrorKind::Float))?;
            if negative {
                v = -v;
            }
            Ok((rest, Token::Real(v)))
        },
        None => {
            let digits = int_part.ok_or_else(|| lex_error(input, nom::error::ErrorKind::Digit))?;
            let s = std::str::from_utf8(digits)
                .map_err(|_| lex_error(input, nom::error::ErrorKind::Digit))?;
            // Overflowing integers degrade to reals rather than failing; some
            // generators emit absurd /Length values.
            match s.parse::<i64>() {
                Ok(mut v) => {
                    if negative {
                        v = -v;
                    }
                    Ok((rest, Token::Int(v)))
                },
                Err(_) => {
                    let mut v: f64 = s
                        .parse()
                        .map_err(|_| lex_error(input, nom::error::ErrorKind::Digit))?;
                    if negative {
                        v = -v;
                    }
                    Ok((rest, Token::Real(v)))
                },
            }
        },
    }
}

/// Parse a `(...)` literal string, honoring nested balanced parentheses and
/// skipping over escape sequences so an escaped `\)` does not close the
/// string. The content is returned raw.
fn literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut i = 0usize;

    while i < body.len() {
        match body[i] {
            b'\\' => {
                // Escape: skip the backslash and whatever follows. Octal
                // escapes may span up to three digits.
                i += 1;
                if i < body.len() && body[i].is_ascii_digit() {
                    let mut digits = 0;
                    while digits < 3 && i < body.len() && body[i].is_ascii_digit() {
                        i += 1;
                        digits += 1;
                    }
                } else {
                    i += 1;
                }
            },
            b'(' => {
                depth += 1;
                i += 1;
            },
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Ok((&body[i..], Token::Str(&body[..i - 1])));
                }
            },
            _ => i += 1,
        }
    }

    // Ran out of input with unbalanced parentheses
    Err(lex_error(input, nom::error::ErrorKind::Tag))
}

/// Parse a `<...>` hex string. Must reject `<<`, which opens a dictionary.
fn hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.len() >= 2 && input[0] == b'<' && input[1] == b'<' {
        return Err(lex_error(input, nom::error::ErrorKind::Tag));
    }
    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || c.is_ascii_whitespace()),
            Token::Hex,
        ),
        char('>'),
    )(input)
}

/// Decode `#XX` escape sequences inside a name.
///
/// Invalid sequences (`#` followed by fewer than two hex digits) are kept
/// literally, which matches how most readers treat malformed names.
pub fn decode_name_escapes(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'#' {
            if let Some(pair) = bytes.get(i + 1..i + 3) {
                if let Ok(hex) = std::str::from_utf8(pair) {
                    if let Ok(v) = u8::from_str_radix(hex, 16) {
                        out.push(v as char);
                        i += 3;
                        continue;
                    }
                }
            }
        }
        // Names are byte strings in the file; non-ASCII bytes pass through
        // as their Latin-1 interpretation.
        out.push(bytes[i] as char);
        i += 1;
    }

    out
}

/// Parse a `/Name` token. The name body runs until whitespace or a delimiter
/// and may be empty (seen in the wild, tolerated).
fn name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(
            take_while(|c: u8| !is_pdf_whitespace(c) && !is_pdf_delimiter(c)),
            |bytes: &[u8]| {
                let raw: String = bytes.iter().map(|&b| b as char).collect();
                Token::Name(decode_name_escapes(&raw))
            },
        ),
    )(input)
}

/// Keywords and structural delimiters.
///
/// Order matters: `endstream` before `stream`, `<<` before `<` (the hex
/// parser handles the single bracket), and keywords before bare `R`.
fn keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::Bool(false), tag(b"false")),
        value(Token::Bool(true), tag(b"true")),
        value(Token::Null, tag(b"null")),
        value(Token::EndObj, tag(b"endobj")),
        value(Token::Obj, tag(b"obj")),
        value(Token::EndStream, tag(b"endstream")),
        value(Token::Stream, tag(b"stream")),
        value(Token::DictOpen, tag(b"<<")),
        value(Token::DictClose, tag(b">>")),
        value(Token::ArrayOpen, tag(b"[")),
        value(Token::ArrayClose, tag(b"]")),
        value(Token::RefMarker, tag(b"R")),
    ))(input)
}

/// Read one token, skipping any leading whitespace and comments.
pub fn next_token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let input = skip_ws(input);
    alt((keyword, name, number, literal_string, hex_string))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(next_token(b"42"), Ok((&b""[..], Token::Int(42))));
        assert_eq!(next_token(b"-17"), Ok((&b""[..], Token::Int(-17))));
        assert_eq!(next_token(b"+3 x"), Ok((&b" x"[..], Token::Int(3))));
    }

    #[test]
    fn test_reals() {
        assert_eq!(next_token(b"2.5"), Ok((&b""[..], Token::Real(2.5))));
        assert_eq!(next_token(b"-.25"), Ok((&b""[..], Token::Real(-0.25))));
        assert_eq!(next_token(b"6."), Ok((&b""[..], Token::Real(6.0))));
    }

    #[test]
    fn test_literal_string_balanced_parens() {
        assert_eq!(
            next_token(b"(a (nested) b)"),
            Ok((&b""[..], Token::Str(b"a (nested) b")))
        );
    }

    #[test]
    fn test_literal_string_escaped_paren_does_not_close() {
        assert_eq!(next_token(b"(a\\)b)"), Ok((&b""[..], Token::Str(b"a\\)b"))));
    }

    #[test]
    fn test_literal_string_unbalanced_is_error() {
        assert!(next_token(b"(never closed").is_err());
    }

    #[test]
    fn test_hex_string_vs_dict_open() {
        assert_eq!(next_token(b"<41 42>"), Ok((&b""[..], Token::Hex(b"41 42"))));
        assert_eq!(next_token(b"<<"), Ok((&b""[..], Token::DictOpen)));
    }

    #[test]
    fn test_name_plain_and_escaped() {
        assert_eq!(
            next_token(b"/Type "),
            Ok((&b" "[..], Token::Name("Type".to_string())))
        );
        assert_eq!(
            next_token(b"/A#20B"),
            Ok((&b""[..], Token::Name("A B".to_string())))
        );
        // Invalid escape kept literally
        assert_eq!(
            next_token(b"/A#ZZ"),
            Ok((&b""[..], Token::Name("A#ZZ".to_string())))
        );
    }

    #[test]
    fn test_empty_name_tolerated() {
        assert_eq!(next_token(b"/ 1"), Ok((&b" 1"[..], Token::Name(String::new()))));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(next_token(b"true"), Ok((&b""[..], Token::Bool(true))));
        assert_eq!(next_token(b"null"), Ok((&b""[..], Token::Null)));
        assert_eq!(next_token(b"endstream"), Ok((&b""[..], Token::EndStream)));
        assert_eq!(next_token(b"stream\n"), Ok((&b"\n"[..], Token::Stream)));
        assert_eq!(next_token(b"R"), Ok((&b""[..], Token::RefMarker)));
    }

    #[test]
    fn test_comments_and_whitespace_skipped() {
        assert_eq!(
            next_token(b"  % header comment\r\n  42"),
            Ok((&b""[..], Token::Int(42)))
        );
    }

    #[test]
    fn test_indirect_reference_token_stream() {
        let input = b"12 0 R";
        let (rest, t1) = next_token(input).unwrap();
        let (rest, t2) = next_token(rest).unwrap();
        let (rest, t3) = next_token(rest).unwrap();
        assert_eq!(t1, Token::Int(12));
        assert_eq!(t2, Token::Int(0));
        assert_eq!(t3, Token::RefMarker);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_huge_integer_degrades_to_real() {
        let (_, tok) = next_token(b"99999999999999999999").unwrap();
        assert!(matches!(tok, Token::Real(_)));
    }
}
