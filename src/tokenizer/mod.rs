//! Tokenizer for PixelBASIC source code
//!
//! Converts source text into the flat token stream consumed by the
//! control-flow core. Tokens are addressed by their index in the produced
//! vector; that index is the stable position the executor's program counter
//! and jump table work with.

use crate::error::{BasicError, PositionedError};
use serde::{Deserialize, Serialize};

/// Control-flow keywords recognized by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    Call,
    Do,
    End,
    Loop,
    Rem,
    Sub,
}

// Keyword spellings, matched case-insensitively
const KEYWORDS: &[(&str, Keyword)] = &[
    ("CALL", Keyword::Call),
    ("DO", Keyword::Do),
    ("END", Keyword::End),
    ("LOOP", Keyword::Loop),
    ("REM", Keyword::Rem),
    ("SUB", Keyword::Sub),
];

impl Keyword {
    /// Look up a word in the keyword table (case-insensitive)
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(name, _)| word.eq_ignore_ascii_case(name))
            .map(|&(_, keyword)| keyword)
    }

    /// Canonical spelling of the keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Call => "CALL",
            Keyword::Do => "DO",
            Keyword::End => "END",
            Keyword::Loop => "LOOP",
            Keyword::Rem => "REM",
            Keyword::Sub => "SUB",
        }
    }
}

/// Kind tag of a single token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Variable or subprogram name, stored uppercased
    Identifier(String),
    /// End of line marker
    Eol,
}

/// A single token in the instruction stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Source line the token came from (1-based), for diagnostics only
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// Tokenize PixelBASIC source text.
///
/// Every source line contributes one `Eol` token, including the last line
/// when the text lacks a trailing newline. Identifiers are uppercased, as
/// the console's editor stores programs uppercase. `REM` swallows the rest
/// of its line.
pub fn tokenize(source: &str) -> Result<Vec<Token>, PositionedError> {
    let mut tokens = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let line = (index + 1) as u32;
        tokenize_line(text, line, &mut tokens).map_err(|error| PositionedError {
            error,
            token: tokens.len(),
            line,
        })?;
        tokens.push(Token::new(TokenKind::Eol, line));
    }

    Ok(tokens)
}

fn tokenize_line(text: &str, line: u32, tokens: &mut Vec<Token>) -> Result<(), BasicError> {
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_whitespace() {
            chars.next();
        } else if c.is_ascii_alphabetic() {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    word.push(c.to_ascii_uppercase());
                    chars.next();
                } else {
                    break;
                }
            }
            match Keyword::lookup(&word) {
                Some(Keyword::Rem) => {
                    // Comment: keep the marker, drop the rest of the line
                    tokens.push(Token::new(TokenKind::Keyword(Keyword::Rem), line));
                    return Ok(());
                }
                Some(keyword) => {
                    tokens.push(Token::new(TokenKind::Keyword(keyword), line));
                }
                None => {
                    tokens.push(Token::new(TokenKind::Identifier(word), line));
                }
            }
        } else {
            return Err(BasicError::UnexpectedCharacter(c));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Keyword::lookup("SUB"), Some(Keyword::Sub));
        assert_eq!(Keyword::lookup("sub"), Some(Keyword::Sub));
        assert_eq!(Keyword::lookup("Loop"), Some(Keyword::Loop));
        assert_eq!(Keyword::lookup("FOO"), None);
    }

    #[test]
    fn test_tokenize_sub_declaration() {
        let tokens = tokenize("SUB Foo").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Keyword(Keyword::Sub), 1),
                Token::new(TokenKind::Identifier("FOO".to_string()), 1),
                Token::new(TokenKind::Eol, 1),
            ]
        );
    }

    #[test]
    fn test_tokenize_identifiers_uppercased() {
        let tokens = tokenize("call blink_cursor").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword(Keyword::Call));
        assert_eq!(
            tokens[1].kind,
            TokenKind::Identifier("BLINK_CURSOR".to_string())
        );
    }

    #[test]
    fn test_tokenize_eol_per_line() {
        let tokens = tokenize("SUB Foo\nEND SUB\n").unwrap();
        let eols = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Eol)
            .count();
        assert_eq!(eols, 2);
        // Last line without trailing newline still gets an Eol
        let tokens = tokenize("END").unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eol);
    }

    #[test]
    fn test_tokenize_rem_swallows_line() {
        let tokens = tokenize("REM anything at all, even $%&!").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Keyword(Keyword::Rem), 1),
                Token::new(TokenKind::Eol, 1),
            ]
        );
    }

    #[test]
    fn test_tokenize_line_numbers() {
        let tokens = tokenize("REM one\nSUB Foo\nEND SUB").unwrap();
        let sub = tokens
            .iter()
            .find(|t| t.kind == TokenKind::Keyword(Keyword::Sub))
            .unwrap();
        assert_eq!(sub.line, 2);
        assert_eq!(tokens.last().unwrap().line, 3);
    }

    #[test]
    fn test_tokenize_unexpected_character() {
        let err = tokenize("SUB Foo\nEND SUB\nCALL @oo").unwrap_err();
        assert_eq!(err.error, BasicError::UnexpectedCharacter('@'));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_tokenize_empty_lines() {
        let tokens = tokenize("\n\nEND\n").unwrap();
        assert_eq!(tokens.len(), 4); // Eol, Eol, END, Eol
        assert_eq!(tokens[2].kind, TokenKind::Keyword(Keyword::End));
    }
}
