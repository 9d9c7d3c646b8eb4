//! tc-program: Execute model-authored programs against registered functions.

pub mod eval;
pub mod registry;

pub use eval::Evaluator;
pub use registry::{FunctionRegistry, ProgramFunction};

use serde_json::Value;
use tc_core::program::Program;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid result reference {index}: only {completed} step(s) completed")]
    InvalidReference { index: usize, completed: usize },
    #[error("function not found: {0}")]
    FunctionNotFound(String),
    #[error("function '{name}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("unrecognized expression: {0}")]
    UnrecognizedExpression(String),
    #[error("step {step} ('{name}') failed: {message}")]
    StepFailed {
        step: usize,
        name: String,
        message: String,
    },
    #[error("cancelled")]
    Cancelled,
}

/// Evaluate a program and return one result per step.
pub async fn evaluate(
    program: &Program,
    registry: &FunctionRegistry,
    cancel: &CancellationToken,
) -> Result<Vec<Value>, EvalError> {
    Evaluator::new(registry, cancel).run(program).await
}
