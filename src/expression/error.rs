use std::time::Duration;

/// A user motion function failed to lex, parse or resolve.
///
/// `offset` is a byte offset into the submitted source.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("compile error at byte {offset}: {message}")]
pub struct CompileError {
    pub offset: usize,
    pub message: String,
}

impl CompileError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A single evaluation of a compiled motion function failed.
///
/// Callers substitute the identity transform for the affected frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The call exhausted its instruction or wall-clock budget.
    #[error("evaluation exceeded its budget after {instructions} instructions ({elapsed:?})")]
    Timeout {
        instructions: u64,
        elapsed: Duration,
    },

    /// The program raised an error (type mismatch, non-finite result, missing return).
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl EvalError {
    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}
