//! Stage 1 of the lexer: bytes to raw tokens.
//!
//! The raw token stream still represents indentation as a payload on
//! each newline token; the [`indent`](crate::indent) stage rewrites that
//! into INDENT/DEDENT tokens.

use veldc_util::{fail, CompileResult, Location};

use crate::reader::SourceReader;
use crate::token::{Keyword, Operator, Token, TokenKind};

const OPERATOR_CHARS: &[u8] = b"=<>!.,()[]{};:+-*/&";

/// Longer operators first, so that `==` does not lex as `=` `=`.
/// `===` and `!==` are recognized only to produce a targeted error.
const OPERATOR_TABLE: &[(&str, Option<Operator>)] = &[
    ("...", Some(Operator::Ellipsis)),
    ("===", None),
    ("!==", None),
    ("==", Some(Operator::EqEq)),
    ("!=", Some(Operator::NotEq)),
    ("->", Some(Operator::Arrow)),
    ("<=", Some(Operator::LessEq)),
    (">=", Some(Operator::GreaterEq)),
    ("++", Some(Operator::PlusPlus)),
    ("--", Some(Operator::MinusMinus)),
    (".", Some(Operator::Dot)),
    (",", Some(Operator::Comma)),
    (":", Some(Operator::Colon)),
    (";", Some(Operator::Semicolon)),
    ("=", Some(Operator::Assign)),
    ("(", Some(Operator::LParen)),
    (")", Some(Operator::RParen)),
    ("{", Some(Operator::LBrace)),
    ("}", Some(Operator::RBrace)),
    ("[", Some(Operator::LBracket)),
    ("]", Some(Operator::RBracket)),
    ("&", Some(Operator::Ampersand)),
    ("*", Some(Operator::Star)),
    ("/", Some(Operator::Slash)),
    ("+", Some(Operator::Plus)),
    ("-", Some(Operator::Minus)),
    ("<", Some(Operator::Less)),
    (">", Some(Operator::Greater)),
];

fn is_identifier_or_number_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

struct Tokenizer {
    reader: SourceReader,
}

impl Tokenizer {
    fn read_identifier_or_number(&mut self, first_byte: u8) -> CompileResult<String> {
        debug_assert!(is_identifier_or_number_byte(first_byte));
        let mut text = String::new();
        text.push(first_byte as char);

        loop {
            let c = self.reader.read_byte()?;
            if !is_identifier_or_number_byte(c) {
                self.reader.unread_byte(c);
                return Ok(text);
            }
            if text.len() == 99 {
                fail!(
                    self.reader.location().clone(),
                    "name is too long: {}...",
                    &text[..20]
                );
            }
            text.push(c as char);
        }
    }

    fn consume_rest_of_line(&mut self) -> CompileResult<()> {
        loop {
            let c = self.reader.read_byte()?;
            if c == b'\n' {
                self.reader.unread_byte(b'\n');
                return Ok(());
            }
            if c == 0 {
                return Ok(());
            }
        }
    }

    /// Counts the indentation of the next non-blank, non-comment line.
    /// Assumes the initial LF has been consumed already. A blank line
    /// resets the count; end of file turns the pending newline into EOF,
    /// without validating trailing spaces.
    fn read_indentation_as_newline(&mut self) -> CompileResult<TokenKind> {
        let mut indentation: u32 = 0;
        loop {
            let c = self.reader.read_byte()?;
            match c {
                b' ' => indentation += 1,
                b'\n' => indentation = 0,
                b'#' => self.consume_rest_of_line()?,
                0 => return Ok(TokenKind::Eof),
                _ => {
                    self.reader.unread_byte(c);
                    return Ok(TokenKind::Newline(indentation));
                }
            }
        }
    }

    /// Reads the rest of a string or character literal. The opening
    /// quote has been consumed already; the returned bytes exclude the
    /// closing quote.
    fn read_string(&mut self, quote: u8) -> CompileResult<Vec<u8>> {
        debug_assert!(quote == b'\'' || quote == b'"');
        let mut result = Vec::new();

        loop {
            let c = self.reader.read_byte()?;
            if c == quote {
                return Ok(result);
            }
            match c {
                b'\n' => {
                    // Report on the line where the literal is, not the next one.
                    let mut location = self.reader.location().clone();
                    location.lineno -= 1;
                    return Err(self.missing_end_quote(quote, location));
                }
                0 => {
                    return Err(self.missing_end_quote(quote, self.reader.location().clone()));
                }
                b'\\' => {
                    let after_backslash = self.reader.read_byte()?;
                    match after_backslash {
                        b'n' => result.push(b'\n'),
                        b'r' => result.push(b'\r'),
                        b'\\' | b'\'' | b'"' => result.push(after_backslash),
                        b'0'..=b'9' => {
                            if after_backslash == b'0' && quote == b'"' {
                                fail!(
                                    self.reader.location().clone(),
                                    "strings cannot contain zero bytes (\\0), because that is the special end marker byte"
                                );
                            }
                            result.push(after_backslash - b'0');
                        }
                        b'\n' => {
                            // Backslash at end of line: a string continues on
                            // the next line, a character literal cannot.
                            if quote == b'\'' {
                                let mut location = self.reader.location().clone();
                                location.lineno -= 1;
                                return Err(self.missing_end_quote(quote, location));
                            }
                        }
                        0 => {
                            return Err(
                                self.missing_end_quote(quote, self.reader.location().clone())
                            );
                        }
                        c if (0x20..0x7f).contains(&c) => {
                            fail!(
                                self.reader.location().clone(),
                                "unknown escape: '\\{}'",
                                c as char
                            );
                        }
                        _ => fail!(self.reader.location().clone(), "unknown '\\' escape"),
                    }
                }
                _ => result.push(c),
            }
        }
    }

    fn missing_end_quote(&self, quote: u8, location: Location) -> veldc_util::CompileError {
        let message = if quote == b'"' {
            "missing \" to end the string"
        } else {
            "missing ' to end the character"
        };
        veldc_util::CompileError::new(location, message)
    }

    fn read_char_literal(&mut self) -> CompileResult<u8> {
        let s = self.read_string(b'\'')?;
        match s.as_slice() {
            [] => fail!(self.reader.location().clone(), "empty character literal: ''"),
            [c] => Ok(*c),
            _ => fail!(
                self.reader.location().clone(),
                "single quotes are for a single character, maybe use double quotes to instead make a string?"
            ),
        }
    }

    fn read_operator(&mut self) -> CompileResult<Operator> {
        // Greedy read, capped at three bytes; unused bytes go back.
        let mut buf = String::new();
        while buf.len() < 3 {
            let c = self.reader.read_byte()?;
            if c == 0 {
                break;
            }
            if !OPERATOR_CHARS.contains(&c) {
                self.reader.unread_byte(c);
                break;
            }
            buf.push(c as char);
        }

        for &(text, op) in OPERATOR_TABLE {
            if buf.starts_with(text) {
                for i in (text.len()..buf.len()).rev() {
                    self.reader.unread_byte(buf.as_bytes()[i]);
                }
                match op {
                    Some(op) => return Ok(op),
                    // `===` and `!==` exist only to give a better error
                    // message to javascript people.
                    None => break,
                }
            }
        }

        fail!(
            self.reader.location().clone(),
            "there is no '{buf}' operator"
        );
    }

    fn read_token(&mut self) -> CompileResult<Token> {
        let location = self.reader.location().clone();
        loop {
            let c = self.reader.read_byte()?;
            let kind = match c {
                b'#' => {
                    self.consume_rest_of_line()?;
                    continue;
                }
                b' ' => continue,
                b'\n' => self.read_indentation_as_newline()?,
                0 => TokenKind::Eof,
                b'\'' => TokenKind::Char(self.read_char_literal()?),
                b'"' => TokenKind::Str(self.read_string(b'"')?),
                c if is_identifier_or_number_byte(c) => {
                    let text = self.read_identifier_or_number(c)?;
                    if let Some(kw) = Keyword::from_ident(&text) {
                        TokenKind::Keyword(kw)
                    } else if text.as_bytes()[0].is_ascii_digit() {
                        TokenKind::Int(parse_integer(&text, &location)?)
                    } else {
                        TokenKind::Name(text)
                    }
                }
                c if OPERATOR_CHARS.contains(&c) => {
                    self.reader.unread_byte(c);
                    TokenKind::Operator(self.read_operator()?)
                }
                c if (0x20..0x7f).contains(&c) => {
                    fail!(
                        self.reader.location().clone(),
                        "unexpected byte '{}' ({:#x})",
                        c as char,
                        c
                    );
                }
                c => fail!(self.reader.location().clone(), "unexpected byte {:#x}", c),
            };
            return Ok(Token { kind, location });
        }
    }
}

/// Parses an integer literal: decimal, `0x…` hex, or `0b…` binary.
/// Overflowing 64 bits or containing a digit invalid for the base is an
/// error, and so is a nonzero number with a leading zero.
fn parse_integer(text: &str, location: &Location) -> CompileResult<i64> {
    let (digits, base) = if let Some(hex) = text.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b") {
        (bin, 2)
    } else if text.starts_with('0') && text.len() > 1 {
        // 0777 in C actually means 511. Veld does not allow writing 0777.
        fail!(location.clone(), "unnecessary zero at start of number");
    } else {
        (text, 10)
    };

    if digits.is_empty() {
        fail!(location.clone(), "invalid number or variable name \"{text}\"");
    }
    match i64::from_str_radix(digits, base) {
        Ok(value) => Ok(value),
        Err(_) => fail!(location.clone(), "invalid number or variable name \"{text}\""),
    }
}

/// Tokenizes a source file without INDENT/DEDENT processing.
///
/// A synthetic newline is pushed in front of the file so that the first
/// line starts after a newline token like every other line: leading
/// blank lines and indentation at the start of the file then need no
/// special cases.
pub fn tokenize_raw(
    filename: impl Into<std::rc::Rc<str>>,
    bytes: Vec<u8>,
) -> CompileResult<Vec<Token>> {
    let mut reader = SourceReader::new(filename, bytes);
    reader.unread_byte(b'\n');

    let mut tokenizer = Tokenizer { reader };
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.read_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_kinds(src: &str) -> Vec<TokenKind> {
        tokenize_raw("test.veld", src.as_bytes().to_vec())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn raw_error(src: &str) -> veldc_util::CompileError {
        tokenize_raw("test.veld", src.as_bytes().to_vec()).unwrap_err()
    }

    #[test]
    fn test_keywords_and_names() {
        assert_eq!(
            raw_kinds("def foo"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Keyword(Keyword::Def),
                TokenKind::Name("foo".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_bases() {
        assert_eq!(
            raw_kinds("0x1F 0b101 255 0"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Int(31),
                TokenKind::Int(5),
                TokenKind::Int(255),
                TokenKind::Int(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_leading_zero_is_an_error() {
        assert_eq!(raw_error("0755").message, "unnecessary zero at start of number");
        assert_eq!(raw_error("01").message, "unnecessary zero at start of number");
    }

    #[test]
    fn test_bad_numbers() {
        assert_eq!(
            raw_error("0x").message,
            "invalid number or variable name \"0x\""
        );
        assert_eq!(
            raw_error("0b2").message,
            "invalid number or variable name \"0b2\""
        );
        assert_eq!(
            raw_error("123abc").message,
            "invalid number or variable name \"123abc\""
        );
        // Does not fit in 64 bits.
        assert_eq!(
            raw_error("99999999999999999999").message,
            "invalid number or variable name \"99999999999999999999\""
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            raw_kinds("== = <= < -> -"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Operator(Operator::EqEq),
                TokenKind::Operator(Operator::Assign),
                TokenKind::Operator(Operator::LessEq),
                TokenKind::Operator(Operator::Less),
                TokenKind::Operator(Operator::Arrow),
                TokenKind::Operator(Operator::Minus),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_adjacent_operators_are_split() {
        // Greedy read takes 3 bytes, then pushes the unused ones back.
        assert_eq!(
            raw_kinds("x==-1"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Name("x".to_string()),
                TokenKind::Operator(Operator::EqEq),
                TokenKind::Operator(Operator::Minus),
                TokenKind::Int(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_javascript_equality_gets_its_own_error() {
        assert_eq!(raw_error("a === b").message, "there is no '===' operator");
        assert_eq!(raw_error("a !== b").message, "there is no '!==' operator");
    }

    #[test]
    fn test_unknown_operator() {
        // '!' is only valid as part of '!='.
        assert_eq!(raw_error("a ! b").message, "there is no '!' operator");
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            raw_kinds(r#""a\nb\\c\"d\1""#),
            vec![
                TokenKind::Newline(0),
                TokenKind::Str(b"a\nb\\c\"d\x01".to_vec()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_continuation_across_lines() {
        assert_eq!(
            raw_kinds("\"ab\\\ncd\""),
            vec![
                TokenKind::Newline(0),
                TokenKind::Str(b"abcd".to_vec()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_zero_byte_escape_in_string() {
        assert_eq!(
            raw_error(r#""a\0b""#).message,
            "strings cannot contain zero bytes (\\0), because that is the special end marker byte"
        );
    }

    #[test]
    fn test_unknown_escape() {
        assert_eq!(raw_error(r#""\q""#).message, "unknown escape: '\\q'");
    }

    #[test]
    fn test_unterminated_string() {
        let err = raw_error("x = \"abc\ny = 1");
        assert_eq!(err.message, "missing \" to end the string");
        assert_eq!(err.location.lineno, 1);
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(
            raw_kinds(r"'a' '\n' '\0'"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Char(b'a'),
                TokenKind::Char(b'\n'),
                TokenKind::Char(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_char_literal() {
        assert_eq!(raw_error("''").message, "empty character literal: ''");
    }

    #[test]
    fn test_two_byte_char_literal() {
        assert_eq!(
            raw_error("'ab'").message,
            "single quotes are for a single character, maybe use double quotes to instead make a string?"
        );
    }

    #[test]
    fn test_unterminated_char() {
        assert_eq!(raw_error("'a").message, "missing ' to end the character");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            raw_kinds("x # comment\ny"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Name("x".to_string()),
                TokenKind::Newline(0),
                TokenKind::Name("y".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newline_payload_counts_next_line_indentation() {
        assert_eq!(
            raw_kinds("a\n    b"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Name("a".to_string()),
                TokenKind::Newline(4),
                TokenKind::Name("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blank_line_resets_indentation_count() {
        // The indented blank line does not matter; the count restarts at
        // the last newline before actual content.
        assert_eq!(
            raw_kinds("a\n        \n    b"),
            vec![
                TokenKind::Newline(0),
                TokenKind::Name("a".to_string()),
                TokenKind::Newline(4),
                TokenKind::Name("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_name_too_long() {
        let long = "a".repeat(150);
        let err = raw_error(&long);
        assert_eq!(err.message, format!("name is too long: {}...", "a".repeat(20)));
    }

    #[test]
    fn test_name_just_under_the_limit() {
        let name = "a".repeat(99);
        assert_eq!(
            raw_kinds(&name),
            vec![
                TokenKind::Newline(0),
                TokenKind::Name(name),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_byte() {
        assert_eq!(raw_error("a ~ b").message, "unexpected byte '~' (0x7e)");
        assert_eq!(raw_error("a \x01 b").message, "unexpected byte 0x1");
    }

    #[test]
    fn test_token_locations() {
        let tokens = tokenize_raw("test.veld", b"a\nb".to_vec()).unwrap();
        let linenos: Vec<u32> = tokens.iter().map(|t| t.location.lineno).collect();
        // synthetic newline at 0, `a` at 1, newline at 1, `b` at 2, eof at 2
        assert_eq!(linenos, vec![0, 1, 1, 2, 2]);
    }
}
