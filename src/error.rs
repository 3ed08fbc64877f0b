// Crate-level error type
// Unifies the span, pointer, evaluator and loader errors

use thiserror::Error;

use crate::evaluator::EvaluatorError;
use crate::loader::LoadError;
use crate::pointer::PointerError;
use crate::span::SpanError;

/// Any failure of a substitution or load call
#[derive(Error, Debug)]
pub enum Error {
    /// An opened span never reaches its balancing close
    #[error("Syntax error: {0}")]
    Syntax(#[from] SpanError),

    /// A variable path is missing from the context
    #[error("Resolution error: {0}")]
    Resolution(#[from] PointerError),

    /// Expression text failed to parse or raised while running
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluatorError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

impl Error {
    /// Whether this is an explicitly requested but unsupported file format
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Error::Load(LoadError::NotImplemented(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
