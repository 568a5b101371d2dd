//! Error types for the three failure regimes: accumulated syntax errors from
//! the lexer/parser, fail-fast runtime errors from the evaluator, and the
//! hard cycle failure from the collection-level dependency check.

use crate::ast::Span;
use thiserror::Error;

/// A single lexer/parser diagnostic.
///
/// Syntax errors are collected into lists rather than raised, so a caller can
/// surface every problem in a formula at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Evaluation failure. The first error aborts the whole tree walk.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {name} expects at least {min} argument(s), got {got}")]
    TooFewArguments {
        name: String,
        min: usize,
        got: usize,
    },

    #[error("Function {name} accepts at most {max} argument(s), got {got}")]
    TooManyArguments {
        name: String,
        max: usize,
        got: usize,
    },

    #[error("Cannot convert {from} to {target}")]
    Coercion { from: String, target: &'static str },

    /// An executor failure, wrapped with the function name at the dispatch
    /// boundary so nested calls report the innermost failing function.
    #[error("Error in function {name}: {source}")]
    Function {
        name: String,
        #[source]
        source: Box<RuntimeError>,
    },

    #[error("{0}")]
    Custom(String),
}

impl RuntimeError {
    /// Wrap an executor error with the name of the function being dispatched.
    #[must_use]
    pub fn in_function(self, name: &str) -> Self {
        RuntimeError::Function {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result of the authoritative, graph-based cycle check across a collection's
/// formulas. Any detected cycle is a hard validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular dependency detected: {}", format_cycles(.cycles))]
pub struct CircularDependencyError {
    /// Every distinct cycle found, each as the chain of formula names from
    /// the first revisited node onward.
    pub cycles: Vec<Vec<String>>,
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut chain = cycle.join(" -> ");
            if let Some(first) = cycle.first() {
                chain.push_str(" -> ");
                chain.push_str(first);
            }
            chain
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level failure of the orchestrated execution pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Parse error: {}", format_syntax_errors(.0))]
    Parse(Vec<SyntaxError>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn format_syntax_errors(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(SyntaxError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_error_wraps_cause() {
        let err = RuntimeError::DivisionByZero.in_function("ROUND");
        assert_eq!(err.to_string(), "Error in function ROUND: Division by zero");
    }

    #[test]
    fn cycle_error_closes_the_loop_in_its_message() {
        let err = CircularDependencyError {
            cycles: vec![vec!["F1".to_string(), "F2".to_string()]],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: F1 -> F2 -> F1"
        );
    }
}
