//! Annotated program storage
//!
//! A [`PreparedProgram`] is the output of the Prepare pass: the unchanged
//! token stream plus the jump table and subprogram entry points resolved by
//! static analysis. The Run pass consumes it read-only, so jumps never
//! search for block boundaries at execution time.

use crate::error::PositionedError;
use crate::tokenizer::{tokenize, Token};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A token stream with all control-flow annotations resolved.
///
/// Built by [`crate::executor::prepare`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedProgram {
    pub(crate) tokens: Vec<Token>,
    /// Jump table: token index of an opener or closer -> destination index.
    /// Each slot is written exactly once during Prepare.
    pub(crate) jump_targets: HashMap<usize, usize>,
    /// Subprogram name -> token index of the first body statement
    pub(crate) subprograms: HashMap<String, usize>,
}

impl PreparedProgram {
    /// Tokenize and prepare source text in one step
    pub fn from_source(source: &str) -> Result<Self, PositionedError> {
        let tokens = tokenize(source)?;
        crate::executor::prepare(tokens)
    }

    /// The token stream, unchanged from what Prepare was given
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Resolved jump destination for the token at `index`, if it has one
    pub fn jump_target(&self, index: usize) -> Option<usize> {
        self.jump_targets.get(&index).copied()
    }

    /// Body entry point of a subprogram by (uppercased) name
    pub fn subprogram(&self, name: &str) -> Option<usize> {
        self.subprograms.get(name).copied()
    }

    /// Names of all declared subprograms
    pub fn subprogram_names(&self) -> impl Iterator<Item = &str> {
        self.subprograms.keys().map(String::as_str)
    }

    /// Serialize to a cartridge image
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserialize from a cartridge image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source() {
        let program = PreparedProgram::from_source("SUB Foo\nEND SUB\n").unwrap();
        assert!(program.subprogram("FOO").is_some());
        assert_eq!(program.subprogram("BAR"), None);
    }

    #[test]
    fn test_subprogram_names() {
        let program = PreparedProgram::from_source("SUB A\nEND SUB\nSUB B\nEND SUB\n").unwrap();
        let mut names: Vec<&str> = program.subprogram_names().collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_cartridge_roundtrip() {
        let program =
            PreparedProgram::from_source("SUB Blink\nREM body\nEND SUB\nCALL Blink\n").unwrap();
        let bytes = program.to_bytes().unwrap();
        let restored = PreparedProgram::from_bytes(&bytes).unwrap();
        assert_eq!(restored, program);
    }
}
