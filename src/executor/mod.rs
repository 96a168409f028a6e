//! Two-pass execution engine for PixelBASIC control flow
//!
//! The interpreter traverses the token stream twice. The Prepare pass
//! matches block openers with their closers on the label stack and records
//! resolved jump destinations in the jump table; the Run pass executes
//! statement by statement, redirecting the program counter through the
//! already-resolved table so no block boundary is ever searched for at
//! execution time.
//!
//! Each command handler consumes its own tokens and validates its syntax
//! first, then branches on the current pass for the semantic work.

use crate::error::{BasicError, PositionedError, Result};
use crate::labels::{BlockKind, LabelStack};
use crate::program::PreparedProgram;
use crate::tokenizer::{Keyword, Token, TokenKind};
use std::collections::HashMap;

/// Deepest CALL nesting the console accepts
pub const MAX_CALL_STACK: usize = 64;

/// Which of the two passes is currently active.
///
/// Read-only for command handlers within one invocation; the drivers run
/// one full pass per invocation, Prepare before Run, resetting the program
/// counter in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Prepare,
    Run,
}

/// State owned by the Prepare pass: open scopes and the annotations under
/// construction.
#[derive(Debug, Default)]
struct PrepareState {
    label_stack: LabelStack,
    jump_targets: HashMap<usize, usize>,
    subprograms: HashMap<String, usize>,
}

/// State owned by the Run pass. The prepared annotations are borrowed
/// read-only; only the call-return stack, counters and trace are mutable.
#[derive(Debug)]
struct RunState<'a> {
    program: &'a PreparedProgram,
    /// Return token indices for active CALLs
    call_stack: Vec<usize>,
    stopped: bool,
    cycles: u64,
    max_cycles: Option<u64>,
    trace: Vec<usize>,
}

#[derive(Debug)]
enum Phase<'a> {
    Prepare(PrepareState),
    Run(RunState<'a>),
}

/// Execution context threaded through every command handler: the token
/// stream, the program counter, and the pass-specific state.
#[derive(Debug)]
struct Interpreter<'a> {
    tokens: &'a [Token],
    pc: usize,
    phase: Phase<'a>,
}

impl<'a> Interpreter<'a> {
    fn pass(&self) -> Pass {
        match self.phase {
            Phase::Prepare(_) => Pass::Prepare,
            Phase::Run(_) => Pass::Run,
        }
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pc + offset).map(|token| &token.kind)
    }

    /// Consume an identifier token naming a subprogram
    fn expect_subprogram_name(&mut self) -> Result<String> {
        match self.peek_kind(0) {
            Some(TokenKind::Identifier(name)) => {
                let name = name.clone();
                self.pc += 1;
                Ok(name)
            }
            _ => Err(BasicError::ExpectedSubprogramName),
        }
    }

    /// Consume the end-of-line terminating the current statement
    fn expect_eol(&mut self) -> Result<()> {
        match self.peek_kind(0) {
            Some(TokenKind::Eol) => {
                self.pc += 1;
                Ok(())
            }
            _ => Err(BasicError::ExpectedEndOfLine),
        }
    }

    /// Dispatch the statement at the program counter
    fn step(&mut self) -> Result<()> {
        match &self.tokens[self.pc].kind {
            TokenKind::Eol => {
                self.pc += 1;
                Ok(())
            }
            TokenKind::Identifier(_) => Err(BasicError::UnexpectedToken),
            TokenKind::Keyword(keyword) => {
                let keyword = *keyword;
                if self.pass() == Pass::Run {
                    self.count_statement()?;
                }
                match keyword {
                    Keyword::Sub => self.cmd_sub(),
                    Keyword::End => self.cmd_end(),
                    Keyword::Call => self.cmd_call(),
                    Keyword::Do => self.cmd_do(),
                    Keyword::Loop => self.cmd_loop(),
                    Keyword::Rem => self.cmd_rem(),
                }
            }
        }
    }

    /// Record the statement in the trace and charge one cycle (Run only)
    fn count_statement(&mut self) -> Result<()> {
        if let Phase::Run(state) = &mut self.phase {
            state.trace.push(self.pc);
            state.cycles += 1;
            if let Some(max_cycles) = state.max_cycles {
                if state.cycles > max_cycles {
                    return Err(BasicError::TooManyCycles);
                }
            }
        }
        Ok(())
    }

    /// SUB name: opens a subprogram block.
    ///
    /// Prepare pushes the scope and registers the body entry point; Run
    /// jumps straight past the matching END SUB, so a body only ever
    /// executes through CALL.
    fn cmd_sub(&mut self) -> Result<()> {
        // SUB
        let token_sub = self.pc;
        self.pc += 1;

        // Identifier
        let name = self.expect_subprogram_name()?;

        // Eol
        self.expect_eol()?;

        match &mut self.phase {
            Phase::Prepare(state) => {
                if state.label_stack.contains(BlockKind::Sub) {
                    return Err(BasicError::SubWithinSub);
                }
                if state.subprograms.contains_key(&name) {
                    return Err(BasicError::SubprogramAlreadyDefined(name));
                }
                state.label_stack.push(BlockKind::Sub, token_sub)?;
                // Body entry: the token after the declaration's Eol
                state.subprograms.insert(name, self.pc);
            }
            Phase::Run(state) => {
                // after END SUB
                match state.program.jump_target(token_sub) {
                    Some(target) => self.pc = target,
                    None => return Err(BasicError::MissingJumpTarget),
                }
            }
        }

        Ok(())
    }

    /// END SUB or plain END, selected by the token following END
    fn cmd_end(&mut self) -> Result<()> {
        if let Some(TokenKind::Keyword(Keyword::Sub)) = self.peek_kind(1) {
            return self.cmd_end_sub();
        }

        // END
        self.pc += 1;

        // Eol
        self.expect_eol()?;

        if let Phase::Run(state) = &mut self.phase {
            state.stopped = true;
        }

        Ok(())
    }

    /// END SUB: closes the innermost subprogram block.
    ///
    /// Prepare pops the scope and patches the opener's jump target to the
    /// position after this closer; Run returns to the token after the CALL
    /// that entered the body.
    fn cmd_end_sub(&mut self) -> Result<()> {
        // END SUB
        self.pc += 2;

        // Eol
        self.expect_eol()?;

        match &mut self.phase {
            Phase::Prepare(state) => match state.label_stack.pop() {
                Some(item) if item.kind == BlockKind::Sub => {
                    state.jump_targets.insert(item.opener, self.pc);
                }
                _ => return Err(BasicError::EndSubWithoutSub),
            },
            Phase::Run(state) => match state.call_stack.pop() {
                Some(return_pc) => self.pc = return_pc,
                None => return Err(BasicError::EndSubWithoutCall),
            },
        }

        Ok(())
    }

    /// CALL name: transfers control into a subprogram body.
    ///
    /// Prepare validates syntax only; calls open no scope. Run pushes the
    /// return position and jumps to the entry recorded for the name.
    fn cmd_call(&mut self) -> Result<()> {
        // CALL
        self.pc += 1;

        // Identifier
        let name = self.expect_subprogram_name()?;

        // Eol
        self.expect_eol()?;

        if let Phase::Run(state) = &mut self.phase {
            let entry = match state.program.subprogram(&name) {
                Some(entry) => entry,
                None => return Err(BasicError::UndefinedSubprogram(name)),
            };
            if state.call_stack.len() >= MAX_CALL_STACK {
                return Err(BasicError::StackOverflow);
            }
            state.call_stack.push(self.pc);
            self.pc = entry;
        }

        Ok(())
    }

    /// DO: opens a loop block. Run falls through into the body.
    fn cmd_do(&mut self) -> Result<()> {
        // DO
        let token_do = self.pc;
        self.pc += 1;

        // Eol
        self.expect_eol()?;

        if let Phase::Prepare(state) = &mut self.phase {
            state.label_stack.push(BlockKind::Do, token_do)?;
        }

        Ok(())
    }

    /// LOOP: closes the innermost DO block.
    ///
    /// Prepare patches the DO opener to the position after this LOOP and
    /// the LOOP token back to its opener; Run takes the back jump.
    fn cmd_loop(&mut self) -> Result<()> {
        // LOOP
        let token_loop = self.pc;
        self.pc += 1;

        // Eol
        self.expect_eol()?;

        match &mut self.phase {
            Phase::Prepare(state) => match state.label_stack.pop() {
                Some(item) if item.kind == BlockKind::Do => {
                    state.jump_targets.insert(item.opener, self.pc);
                    state.jump_targets.insert(token_loop, item.opener);
                }
                _ => return Err(BasicError::LoopWithoutDo),
            },
            Phase::Run(state) => match state.program.jump_target(token_loop) {
                Some(target) => self.pc = target,
                None => return Err(BasicError::MissingJumpTarget),
            },
        }

        Ok(())
    }

    /// REM: comment marker, no semantic work in either pass
    fn cmd_rem(&mut self) -> Result<()> {
        // REM
        self.pc += 1;

        // Eol
        self.expect_eol()
    }

    /// Drive one full pass over the token stream
    fn run_pass(&mut self) -> std::result::Result<(), PositionedError> {
        while self.pc < self.tokens.len() && !self.is_stopped() {
            self.step().map_err(|error| self.positioned(error))?;
        }
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        matches!(&self.phase, Phase::Run(state) if state.stopped)
    }

    /// Bind an error to the current token's position
    fn positioned(&self, error: BasicError) -> PositionedError {
        let token = self.pc.min(self.tokens.len().saturating_sub(1));
        let line = self.tokens.get(token).map(|t| t.line).unwrap_or(0);
        PositionedError { error, token, line }
    }
}

/// Run the Prepare pass over a token stream.
///
/// On success every block opener has its jump target resolved and every
/// subprogram its entry point registered; the returned program is
/// immutable from here on. Any open block at end of stream is reported as
/// [`BasicError::UnexpectedEndOfProgram`] at the opener's line.
pub fn prepare(tokens: Vec<Token>) -> std::result::Result<PreparedProgram, PositionedError> {
    let mut interpreter = Interpreter {
        tokens: &tokens,
        pc: 0,
        phase: Phase::Prepare(PrepareState::default()),
    };
    interpreter.run_pass()?;

    let Phase::Prepare(state) = interpreter.phase else {
        unreachable!()
    };

    if let Some(item) = state.label_stack.last() {
        let token = item.opener;
        return Err(PositionedError {
            error: BasicError::UnexpectedEndOfProgram,
            token,
            line: tokens[token].line,
        });
    }

    Ok(PreparedProgram {
        tokens,
        jump_targets: state.jump_targets,
        subprograms: state.subprograms,
    })
}

/// Runs prepared programs and keeps per-run observability state.
///
/// One executor value drives one run at a time; the call-return stack and
/// cycle counter are private to each run.
#[derive(Debug)]
pub struct Executor {
    max_cycles: Option<u64>,
    cycles: u64,
    trace: Vec<usize>,
}

impl Executor {
    /// Create an executor with no cycle budget
    pub fn new() -> Self {
        Self {
            max_cycles: None,
            cycles: 0,
            trace: Vec::new(),
        }
    }

    /// Create an executor that aborts with [`BasicError::TooManyCycles`]
    /// after `max_cycles` executed statements
    pub fn with_max_cycles(max_cycles: u64) -> Self {
        Self {
            max_cycles: Some(max_cycles),
            cycles: 0,
            trace: Vec::new(),
        }
    }

    /// Run the Run pass from the start of the prepared program
    pub fn run(&mut self, program: &PreparedProgram) -> std::result::Result<(), PositionedError> {
        let mut interpreter = Interpreter {
            tokens: program.tokens(),
            pc: 0,
            phase: Phase::Run(RunState {
                program,
                call_stack: Vec::new(),
                stopped: false,
                cycles: 0,
                max_cycles: self.max_cycles,
                trace: Vec::new(),
            }),
        };
        let result = interpreter.run_pass();

        let Phase::Run(state) = interpreter.phase else {
            unreachable!()
        };
        self.cycles = state.cycles;
        self.trace = state.trace;

        result
    }

    /// Token indices of the statements executed by the last run, in order
    pub fn trace(&self) -> &[usize] {
        &self.trace
    }

    /// Statements executed by the last run
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
