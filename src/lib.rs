//! PixelBASIC control-flow core
//!
//! The control-flow resolution and execution engine of the PixelBASIC
//! interpreter, a BASIC dialect for a constrained fantasy-console runtime.
//! Programs are a flat sequence of tokens; this crate structures that
//! sequence into nested control blocks, resolves jump targets in a Prepare
//! pass, and executes with a program counter in a Run pass using the
//! pre-resolved targets for O(1) jumps.

pub mod executor;
pub mod labels;
pub mod program;
pub mod tokenizer;

// Re-export core types for convenience
pub use crate::error::{BasicError, PositionedError, Result};
pub use executor::{prepare, Executor, Pass};
pub use labels::{BlockKind, LabelStack};
pub use program::PreparedProgram;
pub use tokenizer::{tokenize, Keyword, Token, TokenKind};

/// Core error handling types for the PixelBASIC interpreter
pub mod error {
    use std::fmt;

    /// Result type for handler-level operations
    pub type Result<T> = std::result::Result<T, BasicError>;

    /// Closed enumeration of syntax and runtime error kinds.
    ///
    /// Handlers return the first error encountered; the driving loop treats
    /// any non-success return as fatal for the current pass.
    #[derive(Debug, Clone, PartialEq)]
    pub enum BasicError {
        // Statement syntax errors
        ExpectedSubprogramName,
        ExpectedEndOfLine,

        // Block structure errors (Prepare pass)
        SubWithinSub,
        EndSubWithoutSub,
        LoopWithoutDo,
        UnexpectedEndOfProgram,
        SubprogramAlreadyDefined(String),

        // Tokenizer errors
        UnexpectedCharacter(char),

        // Run pass errors
        UnexpectedToken,
        UndefinedSubprogram(String),
        EndSubWithoutCall,
        /// An opener or closer without a resolved destination; only
        /// possible with a corrupt cartridge image, never for a program
        /// that went through Prepare
        MissingJumpTarget,
        StackOverflow,
        TooManyCycles,
    }

    impl fmt::Display for BasicError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                BasicError::ExpectedSubprogramName => write!(f, "Expected subprogram name"),
                BasicError::ExpectedEndOfLine => write!(f, "Expected end of line"),
                BasicError::SubWithinSub => write!(f, "SUB within SUB"),
                BasicError::EndSubWithoutSub => write!(f, "END SUB without SUB"),
                BasicError::LoopWithoutDo => write!(f, "LOOP without DO"),
                BasicError::UnexpectedEndOfProgram => write!(f, "Unexpected end of program"),
                BasicError::SubprogramAlreadyDefined(name) => {
                    write!(f, "Subprogram already defined: {}", name)
                }
                BasicError::UnexpectedCharacter(c) => write!(f, "Unexpected character: {:?}", c),
                BasicError::UnexpectedToken => write!(f, "Unexpected token"),
                BasicError::UndefinedSubprogram(name) => {
                    write!(f, "Undefined subprogram: {}", name)
                }
                BasicError::EndSubWithoutCall => write!(f, "END SUB without CALL"),
                BasicError::MissingJumpTarget => write!(f, "Missing jump target"),
                BasicError::StackOverflow => write!(f, "Stack overflow"),
                BasicError::TooManyCycles => write!(f, "Too many cycles"),
            }
        }
    }

    impl std::error::Error for BasicError {}

    /// An error bound to the token that caused it.
    ///
    /// Handlers report bare [`BasicError`] kinds; the driving loop attaches
    /// the offending token's index and source line before propagating.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PositionedError {
        pub error: BasicError,
        /// Index of the offending token in the stream
        pub token: usize,
        /// Source line of the offending token (1-based)
        pub line: u32,
    }

    impl fmt::Display for PositionedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "line {}: {}", self.line, self.error)
        }
    }

    impl std::error::Error for PositionedError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.error)
        }
    }
}
