//! Block/label stack for open control-flow scopes
//!
//! During the Prepare pass the executor keeps one entry per currently-open
//! control block. Openers push, closers pop and patch the opener's jump
//! target. The stack exists only during Prepare; the Run pass never touches
//! it.

use crate::error::{BasicError, Result};

/// Deepest block nesting the console accepts
pub const MAX_LABEL_STACK: usize = 128;

/// Which control construct opened a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Sub,
    Do,
}

/// One open scope: the kind of block and the token index of its opener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStackItem {
    pub kind: BlockKind,
    pub opener: usize,
}

/// Stack of currently-open control-flow scopes
#[derive(Debug, Default)]
pub struct LabelStack {
    items: Vec<LabelStackItem>,
}

impl LabelStack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Open a scope for `kind` at token index `opener`
    pub fn push(&mut self, kind: BlockKind, opener: usize) -> Result<()> {
        if self.items.len() >= MAX_LABEL_STACK {
            return Err(BasicError::StackOverflow);
        }
        self.items.push(LabelStackItem { kind, opener });
        Ok(())
    }

    /// Close the innermost scope, if any
    pub fn pop(&mut self) -> Option<LabelStackItem> {
        self.items.pop()
    }

    /// True if a scope of `kind` is open anywhere on the stack
    pub fn contains(&self, kind: BlockKind) -> bool {
        self.items.iter().any(|item| item.kind == kind)
    }

    pub fn last(&self) -> Option<&LabelStackItem> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack = LabelStack::new();
        stack.push(BlockKind::Sub, 0).unwrap();
        stack.push(BlockKind::Do, 3).unwrap();

        let item = stack.pop().unwrap();
        assert_eq!(item.kind, BlockKind::Do);
        assert_eq!(item.opener, 3);

        let item = stack.pop().unwrap();
        assert_eq!(item.kind, BlockKind::Sub);
        assert_eq!(item.opener, 0);

        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_contains_any_depth() {
        let mut stack = LabelStack::new();
        assert!(!stack.contains(BlockKind::Sub));

        stack.push(BlockKind::Sub, 0).unwrap();
        stack.push(BlockKind::Do, 3).unwrap();
        stack.push(BlockKind::Do, 5).unwrap();

        // Sub is buried under two Do scopes but still found
        assert!(stack.contains(BlockKind::Sub));
    }

    #[test]
    fn test_overflow() {
        let mut stack = LabelStack::new();
        for index in 0..MAX_LABEL_STACK {
            stack.push(BlockKind::Do, index).unwrap();
        }
        assert_eq!(
            stack.push(BlockKind::Do, MAX_LABEL_STACK),
            Err(BasicError::StackOverflow)
        );
        // Failed push leaves the stack unchanged
        assert_eq!(stack.len(), MAX_LABEL_STACK);
    }
}
