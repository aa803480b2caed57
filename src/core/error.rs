/// Error types shared by the evaluator, the handlers, and the session.
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("data not found: '{0}' is not registered")]
    DataNotFound(String),
    #[error("type error: {0}")]
    TypeError(String),
    #[error("value mismatch: {slots} name slots but {values} resolved values")]
    ValueMismatch { slots: usize, values: usize },
    #[error("unbalanced name quotes in statement: {0}")]
    UnbalancedQuotes(String),
    #[error("syntax error: {0}")]
    Syntax(String),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("a host command is already pending")]
    HostCommandPending,
    #[error("session is not suspended")]
    NotSuspended,
    #[error("session is suspended; resume it before starting another source")]
    AlreadySuspended,
    #[error("no choice is waiting for an answer")]
    NoPendingChoice,
    #[error("choice index {index} out of range ({count} options)")]
    ChoiceOutOfRange { index: usize, count: usize },
    #[error("script not found: {0}")]
    SourceNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Coarse condition kinds callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataNotFound,
    TypeError,
    ValueMismatch,
    InvalidInput,
    /// The host drove the session out of order.
    Protocol,
    Io,
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::Eval(EvalError::DataNotFound(_)) => ErrorKind::DataNotFound,
            ScriptError::Eval(EvalError::TypeError(_)) => ErrorKind::TypeError,
            ScriptError::Eval(EvalError::ValueMismatch { .. }) => ErrorKind::ValueMismatch,
            ScriptError::Eval(EvalError::UnbalancedQuotes(_) | EvalError::Syntax(_)) => {
                ErrorKind::InvalidInput
            }
            ScriptError::InvalidInput(_) => ErrorKind::InvalidInput,
            ScriptError::HostCommandPending
            | ScriptError::NotSuspended
            | ScriptError::AlreadySuspended
            | ScriptError::NoPendingChoice
            | ScriptError::ChoiceOutOfRange { .. } => ErrorKind::Protocol,
            ScriptError::SourceNotFound(_) => ErrorKind::DataNotFound,
            ScriptError::Io(_) | ScriptError::Ron(_) => ErrorKind::Io,
        }
    }
}
