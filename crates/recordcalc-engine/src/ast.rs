//! The formula abstract syntax tree and its static helpers.
//!
//! Trees are built once by the parser and read-only afterward: the evaluator
//! walks them without mutation, and the validator derives types in a separate
//! pass. Every node carries a byte [`Span`] into the source text for
//! diagnostics.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Byte range into the source formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Smallest span covering both inputs.
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Numeric negation (`-`).
    Neg,
    /// Logical negation (`!`).
    Not,
}

impl UnaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Concat => "&",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow
        )
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub value: Value,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRef {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(LiteralExpr),
    Property(PropertyRef),
    Call(CallExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Array(ArrayLiteral),
}

impl Expr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Property(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Array(e) => e.span,
        }
    }

    /// All distinct property names referenced anywhere in the tree, in
    /// first-seen order.
    #[must_use]
    pub fn properties(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Property(p) => {
                if !out.iter().any(|n| n == &p.name) {
                    out.push(p.name.clone());
                }
            }
            Expr::Call(c) => {
                for arg in &c.args {
                    arg.collect_properties(out);
                }
            }
            Expr::Unary(u) => u.operand.collect_properties(out),
            Expr::Binary(b) => {
                b.left.collect_properties(out);
                b.right.collect_properties(out);
            }
            Expr::Array(a) => {
                for el in &a.elements {
                    el.collect_properties(out);
                }
            }
        }
    }

    /// All distinct function names called anywhere in the tree, in first-seen
    /// order.
    #[must_use]
    pub fn function_calls(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_function_calls(&mut out);
        out
    }

    fn collect_function_calls(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) | Expr::Property(_) => {}
            Expr::Call(c) => {
                if !out.iter().any(|n| n == &c.name) {
                    out.push(c.name.clone());
                }
                for arg in &c.args {
                    arg.collect_function_calls(out);
                }
            }
            Expr::Unary(u) => u.operand.collect_function_calls(out),
            Expr::Binary(b) => {
                b.left.collect_function_calls(out);
                b.right.collect_function_calls(out);
            }
            Expr::Array(a) => {
                for el in &a.elements {
                    el.collect_function_calls(out);
                }
            }
        }
    }

    /// Weighted node count used as a coarse cost/readability proxy: literals
    /// weigh 1, property references 2, operators 3, function calls 5. Arrays
    /// weigh like a literal plus their elements.
    #[must_use]
    pub fn complexity(&self) -> u32 {
        match self {
            Expr::Literal(_) => 1,
            Expr::Property(_) => 2,
            Expr::Call(c) => 5 + c.args.iter().map(Expr::complexity).sum::<u32>(),
            Expr::Unary(u) => 3 + u.operand.complexity(),
            Expr::Binary(b) => 3 + b.left.complexity() + b.right.complexity(),
            Expr::Array(a) => 1 + a.elements.iter().map(Expr::complexity).sum::<u32>(),
        }
    }

    /// Nesting depth of the tree (a lone literal has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal(_) | Expr::Property(_) => 1,
            Expr::Call(c) => 1 + c.args.iter().map(Expr::depth).max().unwrap_or(0),
            Expr::Unary(u) => 1 + u.operand.depth(),
            Expr::Binary(b) => 1 + b.left.depth().max(b.right.depth()),
            Expr::Array(a) => 1 + a.elements.iter().map(Expr::depth).max().unwrap_or(0),
        }
    }

    /// Total number of function-call nodes (not distinct names).
    #[must_use]
    pub fn call_count(&self) -> usize {
        match self {
            Expr::Literal(_) | Expr::Property(_) => 0,
            Expr::Call(c) => 1 + c.args.iter().map(Expr::call_count).sum::<usize>(),
            Expr::Unary(u) => u.operand.call_count(),
            Expr::Binary(b) => b.left.call_count() + b.right.call_count(),
            Expr::Array(a) => a.elements.iter().map(Expr::call_count).sum::<usize>(),
        }
    }

    /// Render the tree back to a canonical expression string.
    ///
    /// Every binary operation is parenthesized, so the output re-parses to a
    /// tree with identical evaluation semantics regardless of the original
    /// surface precedence.
    #[must_use]
    pub fn to_formula_string(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        match self {
            Expr::Literal(lit) => render_literal(&lit.value, out),
            Expr::Property(p) => {
                out.push('[');
                out.push_str(&p.name);
                out.push(']');
            }
            Expr::Call(c) => {
                out.push_str(&c.name);
                out.push('(');
                for (i, arg) in c.args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.render(out);
                }
                out.push(')');
            }
            Expr::Unary(u) => {
                out.push_str(u.op.symbol());
                u.operand.render(out);
            }
            Expr::Binary(b) => {
                out.push('(');
                b.left.render(out);
                out.push(' ');
                out.push_str(b.op.symbol());
                out.push(' ');
                b.right.render(out);
                out.push(')');
            }
            Expr::Array(a) => {
                out.push('{');
                for (i, el) in a.elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    el.render(out);
                }
                out.push('}');
            }
        }
    }
}

fn render_literal(value: &Value, out: &mut String) {
    match value {
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        // Dates and nulls cannot be written as source literals; they only
        // appear in trees assembled programmatically. Render them as quoted
        // text so the output still lexes.
        Value::Text(_) | Value::Date(_) | Value::Null => {
            render_quoted(&value.to_string(), out);
        }
        Value::Array(items) => {
            out.push('{');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_literal(item, out);
            }
            out.push('}');
        }
    }
}

fn render_quoted(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub root: Expr,
}

impl Ast {
    #[must_use]
    pub fn new(root: Expr) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn properties(&self) -> Vec<String> {
        self.root.properties()
    }

    #[must_use]
    pub fn function_calls(&self) -> Vec<String> {
        self.root.function_calls()
    }

    #[must_use]
    pub fn complexity(&self) -> u32 {
        self.root.complexity()
    }

    #[must_use]
    pub fn to_formula_string(&self) -> String {
        self.root.to_formula_string()
    }

    /// Stable JSON serialization useful for debugging/tests.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Ast should be JSON-serializable")
    }
}
