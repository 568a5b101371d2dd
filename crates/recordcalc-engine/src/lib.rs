#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Formula expression engine for a record/property backend.
//!
//! A formula is a textual expression attached to a record property,
//! referencing the record's other properties by name (`[Price] * (1 +
//! [Tax])`), along with literals, operators, and built-in functions. This
//! crate covers the whole path from text to value:
//!
//! - lexing and parsing into a read-only AST ([`parse_formula`], [`parser`])
//! - static validation with type inference and "did you mean" suggestions
//!   ([`Validator`])
//! - tree-walking evaluation against an [`EvalContext`] ([`Evaluator`])
//! - the built-in function library and per-engine [`FunctionRegistry`]
//! - a dependency-snapshot result cache and the reverse dependency graph
//!   driving cascading recalculation ([`Engine`])
//!
//! The surrounding backend (record storage, HTTP surface, auth) stays
//! outside; its boundary types live in `recordcalc-model`.
//!
//! Parse- and validate-time problems accumulate into lists so callers can
//! surface everything at once; evaluation fails fast with a single
//! [`RuntimeError`].

pub mod ast;
pub mod cache;
pub mod coercion;
pub mod error;
pub mod eval;
pub mod functions;
pub mod graph;
pub mod parser;
pub mod validate;
pub mod value;

mod engine;
mod fuzzy;

pub use ast::{Ast, BinaryOp, Expr, Span, UnaryOp};
pub use cache::{CacheEntry, CacheKey, CacheStats, FormulaCache};
pub use engine::{Engine, ErrorPolicy, ExecuteOptions, SampleEvaluation};
pub use error::{CircularDependencyError, EngineError, RuntimeError, SyntaxError};
pub use eval::{EvalContext, Evaluator, ExecutionResult, SPECIAL_IDENTIFIERS};
pub use functions::{
    FunctionCategory, FunctionRegistry, FunctionSignature, ParamSpec, RegisteredFunction,
};
pub use graph::{detect_cycles, DependencyGraph};
pub use parser::{parse, tokenize, ParseOutcome, Token, TokenKind};
pub use validate::{ValidationError, ValidationErrorKind, ValidationResult, Validator};
pub use value::{DataType, Value};

/// Parse a formula into an [`Ast`], or return every syntax error found.
pub fn parse_formula(formula: &str) -> Result<Ast, Vec<SyntaxError>> {
    parser::parse_formula(formula)
}
