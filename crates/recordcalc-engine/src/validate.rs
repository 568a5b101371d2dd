//! Static validation: property and function checks, arity, type inference,
//! and complexity analysis.
//!
//! Validation never panics and never throws; malformed input comes back as
//! error entries inside the returned [`ValidationResult`], so a caller can
//! surface every problem at once.

use crate::ast::{BinaryOp, CallExpr, Expr, Span, UnaryOp};
use crate::error::SyntaxError;
use crate::eval::is_special_identifier;
use crate::functions::FunctionRegistry;
use crate::fuzzy;
use crate::parser;
use crate::value::DataType;
use recordcalc_model::{PropertyCatalog, PropertyType};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_SUGGESTIONS: usize = 3;
const CALL_COUNT_WARNING_THRESHOLD: usize = 10;
const NESTING_WARNING_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    Syntax,
    UnknownProperty,
    UnknownFunction,
    ArityMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    pub span: Option<Span>,
    /// Up to three "did you mean" candidates.
    pub suggestions: Vec<String>,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, " (did you mean {}?)", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome of a validation pass. Produced per call; never retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub dependencies: Vec<String>,
    pub return_type: DataType,
    pub complexity: u32,
}

impl ValidationResult {
    fn from_syntax_errors(errors: Vec<SyntaxError>) -> Self {
        Self {
            is_valid: false,
            errors: errors
                .into_iter()
                .map(|e| {
                    ValidationError::new(ValidationErrorKind::Syntax, e.message, Some(e.span))
                })
                .collect(),
            warnings: Vec::new(),
            dependencies: Vec::new(),
            return_type: DataType::Any,
            complexity: 0,
        }
    }
}

/// Map a declared store property type onto the formula type system.
#[must_use]
pub fn property_data_type(property_type: PropertyType) -> DataType {
    match property_type {
        PropertyType::Text
        | PropertyType::Select
        | PropertyType::Url
        | PropertyType::Email
        | PropertyType::Phone => DataType::Text,
        PropertyType::Number => DataType::Number,
        PropertyType::Checkbox => DataType::Boolean,
        PropertyType::Date | PropertyType::CreatedTime | PropertyType::UpdatedTime => {
            DataType::Date
        }
        PropertyType::MultiSelect | PropertyType::Relation => DataType::Array,
        PropertyType::Formula => DataType::Any,
    }
}

pub struct Validator<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Validate `text` against a property catalog.
    ///
    /// `max_complexity`, when supplied, turns an excessive complexity score
    /// into a warning (never an error).
    #[must_use]
    pub fn validate(
        &self,
        text: &str,
        catalog: &PropertyCatalog,
        max_complexity: Option<u32>,
    ) -> ValidationResult {
        let outcome = parser::parse(text);
        let ast = match outcome.ast {
            Some(ast) if outcome.errors.is_empty() => ast,
            _ => return ValidationResult::from_syntax_errors(outcome.errors),
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let dependencies = ast.properties();
        for name in &dependencies {
            if is_special_identifier(name) || catalog.contains(name) {
                continue;
            }
            let suggestions = fuzzy::suggestions(name, catalog.names(), MAX_SUGGESTIONS);
            errors.push(
                ValidationError::new(
                    ValidationErrorKind::UnknownProperty,
                    format!("Unknown property: {name}"),
                    None,
                )
                .with_suggestions(suggestions),
            );
        }

        let mut calls = Vec::new();
        collect_calls(&ast.root, &mut calls);
        for call in &calls {
            match self.registry.signature(&call.name) {
                None => {
                    let suggestions = self.registry.suggest(&call.name, MAX_SUGGESTIONS);
                    errors.push(
                        ValidationError::new(
                            ValidationErrorKind::UnknownFunction,
                            format!("Unknown function: {}", call.name),
                            Some(call.span),
                        )
                        .with_suggestions(suggestions),
                    );
                }
                Some(signature) => {
                    if signature.deprecated {
                        warnings.push(format!("Function {} is deprecated", signature.name));
                    }
                    let got = call.args.len();
                    let min = signature.min_args();
                    if got < min {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::ArityMismatch,
                            format!(
                                "Function {} expects at least {min} argument(s), got {got}",
                                signature.name
                            ),
                            Some(call.span),
                        ));
                    } else if let Some(max) = signature.max_args() {
                        if got > max {
                            errors.push(ValidationError::new(
                                ValidationErrorKind::ArityMismatch,
                                format!(
                                    "Function {} accepts at most {max} argument(s), got {got}",
                                    signature.name
                                ),
                                Some(call.span),
                            ));
                        }
                    }
                }
            }
        }

        let complexity = ast.complexity();
        if let Some(max) = max_complexity {
            if complexity > max {
                warnings.push(format!(
                    "Formula complexity {complexity} exceeds the recommended maximum {max}"
                ));
            }
        }
        let call_count = ast.root.call_count();
        if call_count > CALL_COUNT_WARNING_THRESHOLD {
            warnings.push(format!(
                "Formula contains {call_count} function calls; consider simplifying"
            ));
        }
        let depth = ast.root.depth();
        if depth > NESTING_WARNING_THRESHOLD {
            warnings.push(format!(
                "Formula nests {depth} levels deep; consider simplifying"
            ));
        }

        // Best-effort textual heuristic only. The authoritative cycle check
        // runs graph-based across the whole collection before a formula is
        // persisted.
        for name in &dependencies {
            let lower = name.to_lowercase();
            if lower.contains("formula") || lower.contains("calculated") {
                warnings.push(format!(
                    "Property '{name}' looks computed; check for circular dependencies"
                ));
            }
        }

        let return_type = self.infer_type(&ast.root, catalog);

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            dependencies,
            return_type,
            complexity,
        }
    }

    /// Bottom-up static type inference.
    #[must_use]
    pub fn infer_type(&self, expr: &Expr, catalog: &PropertyCatalog) -> DataType {
        match expr {
            Expr::Literal(lit) => lit.value.data_type(),
            Expr::Property(p) => match p.name.to_ascii_lowercase().as_str() {
                "now" | "today" => DataType::Date,
                "id" | "recordid" | "databaseid" | "currentuser" | "currentuserid"
                | "currentuseremail" => DataType::Text,
                _ => catalog
                    .get(&p.name)
                    .map(|d| property_data_type(d.property_type))
                    .unwrap_or(DataType::Any),
            },
            Expr::Call(c) => self
                .registry
                .signature(&c.name)
                .map(|s| s.return_type)
                .unwrap_or(DataType::Any),
            Expr::Unary(u) => match u.op {
                UnaryOp::Neg => DataType::Number,
                UnaryOp::Not => DataType::Boolean,
            },
            Expr::Binary(b) => {
                if b.op.is_arithmetic() {
                    DataType::Number
                } else if b.op.is_comparison() || b.op.is_logical() {
                    DataType::Boolean
                } else {
                    debug_assert_eq!(b.op, BinaryOp::Concat);
                    DataType::Text
                }
            }
            Expr::Array(_) => DataType::Array,
        }
    }
}

fn collect_calls<'e>(expr: &'e Expr, out: &mut Vec<&'e CallExpr>) {
    match expr {
        Expr::Literal(_) | Expr::Property(_) => {}
        Expr::Call(c) => {
            out.push(c);
            for arg in &c.args {
                collect_calls(arg, out);
            }
        }
        Expr::Unary(u) => collect_calls(&u.operand, out),
        Expr::Binary(b) => {
            collect_calls(&b.left, out);
            collect_calls(&b.right, out);
        }
        Expr::Array(a) => {
            for el in &a.elements {
                collect_calls(el, out);
            }
        }
    }
}
