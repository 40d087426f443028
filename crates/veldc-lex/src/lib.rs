//! veldc-lex - Lexical analysis for the Veld language.
//!
//! Turns source bytes into the final token stream in two stages:
//!
//! 1. [`tokenize_raw`] reads tokens and represents indentation as a
//!    space count carried on each newline token.
//! 2. [`resolve_indentations`] rewrites the stream so indentation
//!    changes become INDENT/DEDENT tokens, synthesizes a final newline
//!    before end of file, and closes any open indentation there.
//!
//! [`tokenize`] runs both stages. The resulting stream is perfectly
//! bracketed: INDENT and DEDENT tokens balance, and in every prefix of
//! the stream at least as many INDENTs as DEDENTs have appeared.
//!
//! Veld source is ASCII. CRLF line endings are accepted and normalized;
//! everything else about the file is taken literally, byte by byte.

mod indent;
mod reader;
mod token;
mod tokenizer;

pub use indent::resolve_indentations;
pub use reader::SourceReader;
pub use token::{Keyword, Operator, Token, TokenKind};
pub use tokenizer::tokenize_raw;

use veldc_util::CompileResult;

/// Tokenizes a source file: both lexer stages, ending in exactly one
/// EOF token.
///
/// # Example
///
/// ```
/// use veldc_lex::{tokenize, TokenKind};
///
/// let tokens = tokenize("demo.veld", b"x = 1\n".to_vec()).unwrap();
/// assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
/// ```
pub fn tokenize(
    filename: impl Into<std::rc::Rc<str>>,
    bytes: Vec<u8>,
) -> CompileResult<Vec<Token>> {
    let raw = tokenize_raw(filename, bytes)?;
    resolve_indentations(raw)
}
