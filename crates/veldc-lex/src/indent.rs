//! Stage 2 of the lexer: indentation resolution.
//!
//! Rewrites the raw token stream so that indentation changes become
//! INDENT/DEDENT tokens right after the newline that carries them. The
//! downstream parser then sees a perfectly bracketed stream: every
//! INDENT is closed by a DEDENT, and end of file behaves like a newline
//! back to indentation zero.

use veldc_util::{fail, CompileResult};

use crate::token::{Token, TokenKind};

/// One INDENT or DEDENT per 4 spaces of indentation change.
const INDENT_WIDTH: u32 = 4;

/// Adds INDENT/DEDENT tokens after newline tokens that change the
/// indentation level, synthesizes the final newline and trailing
/// DEDENTs at end of file, and removes the synthetic leading newline
/// from stage 1.
pub fn resolve_indentations(raw: Vec<Token>) -> CompileResult<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::with_capacity(raw.len());
    let mut level: u32 = 0;

    for token in raw {
        if token.kind == TokenKind::Eof {
            // An extra newline before end of file, and the dedents after
            // it. This makes end of file work like every other place
            // where dedents appear: always after a newline token.
            tokens.push(Token {
                kind: TokenKind::Newline(0),
                location: token.location.clone(),
            });
            while level > 0 {
                tokens.push(Token {
                    kind: TokenKind::Dedent,
                    location: token.location.clone(),
                });
                level -= INDENT_WIDTH;
            }
            tokens.push(token);
            continue;
        }

        let newline_payload = match token.kind {
            TokenKind::Newline(n) => Some((n, token.location.next_line())),
            _ => None,
        };
        tokens.push(token);

        if let Some((n, after_newline)) = newline_payload {
            if n % INDENT_WIDTH != 0 {
                fail!(after_newline, "indentation must be a multiple of 4 spaces");
            }
            while level < n {
                tokens.push(Token {
                    kind: TokenKind::Indent,
                    location: after_newline.clone(),
                });
                level += INDENT_WIDTH;
            }
            while level > n {
                tokens.push(Token {
                    kind: TokenKind::Dedent,
                    location: after_newline.clone(),
                });
                level -= INDENT_WIDTH;
            }
        }
    }

    // Delete the synthetic newline from the beginning. If the file
    // started with an indent, it is now a separate INDENT token and
    // parsing will reject it.
    debug_assert!(matches!(tokens[0].kind, TokenKind::Newline(_)));
    tokens.remove(0);

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_raw;
    use crate::token::{Keyword, Operator};

    fn kinds(src: &str) -> Vec<TokenKind> {
        let raw = tokenize_raw("test.veld", src.as_bytes().to_vec()).unwrap();
        resolve_indentations(raw)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn error(src: &str) -> veldc_util::CompileError {
        let raw = tokenize_raw("test.veld", src.as_bytes().to_vec()).unwrap();
        resolve_indentations(raw).unwrap_err()
    }

    #[test]
    fn test_empty_file_is_a_single_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_blank_and_comment_lines_only() {
        assert_eq!(kinds("\n\n# hello\n   \n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_nested_blocks() {
        let got = kinds("def f() -> void:\n    if True:\n        return\n");
        let expected = vec![
            TokenKind::Keyword(Keyword::Def),
            TokenKind::Name("f".to_string()),
            TokenKind::Operator(Operator::LParen),
            TokenKind::Operator(Operator::RParen),
            TokenKind::Operator(Operator::Arrow),
            TokenKind::Keyword(Keyword::Void),
            TokenKind::Operator(Operator::Colon),
            TokenKind::Newline(4),
            TokenKind::Indent,
            TokenKind::Keyword(Keyword::If),
            TokenKind::Keyword(Keyword::True),
            TokenKind::Operator(Operator::Colon),
            TokenKind::Newline(8),
            TokenKind::Indent,
            TokenKind::Keyword(Keyword::Return),
            TokenKind::Newline(0),
            TokenKind::Dedent,
            TokenKind::Dedent,
            TokenKind::Eof,
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn test_missing_trailing_newline_still_closes_indents() {
        let got = kinds("def f() -> void:\n    return");
        let dedents = got.iter().filter(|k| **k == TokenKind::Dedent).count();
        let indents = got.iter().filter(|k| **k == TokenKind::Indent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
        assert_eq!(got.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_newline_is_synthesized_before_eof() {
        let got = kinds("x");
        assert_eq!(
            got,
            vec![
                TokenKind::Name("x".to_string()),
                TokenKind::Newline(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bad_indentation_width() {
        let err = error("if x:\n   y");
        assert_eq!(err.message, "indentation must be a multiple of 4 spaces");
        // Reported on the line that is badly indented, not the line before.
        assert_eq!(err.location.lineno, 2);
    }

    #[test]
    fn test_dedent_by_several_levels_at_once() {
        let got = kinds("a:\n    b:\n        c\nd\n");
        let mut depth = 0i32;
        let mut max_depth = 0;
        for kind in &got {
            match kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0);
            max_depth = max_depth.max(depth);
        }
        assert_eq!(depth, 0);
        assert_eq!(max_depth, 2);
    }

    #[test]
    fn test_indent_dedent_locations() {
        let raw = tokenize_raw("test.veld", b"a:\n    b\n".to_vec()).unwrap();
        let tokens = resolve_indentations(raw).unwrap();
        let indent = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Indent)
            .unwrap();
        // The indent belongs to the line that is indented.
        assert_eq!(indent.location.lineno, 2);
    }
}
