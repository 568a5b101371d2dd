//! The tree-walking evaluator.
//!
//! Single pass, fail-fast: the first error aborts the walk and propagates.
//! The AST is never mutated.

use crate::ast::{BinaryExpr, BinaryOp, Expr, UnaryExpr, UnaryOp};
use crate::coercion;
use crate::error::RuntimeError;
use crate::eval::EvalContext;
use crate::functions::FunctionRegistry;
use crate::value::Value;
use smallvec::SmallVec;
use std::cmp::Ordering;

pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    ctx: &'a EvalContext,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(registry: &'a FunctionRegistry, ctx: &'a EvalContext) -> Self {
        Self { registry, ctx }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(lit.value.clone()),
            Expr::Property(p) => self.resolve_property(&p.name),
            Expr::Call(call) => {
                let mut args: SmallVec<[Value; 4]> = SmallVec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(self.evaluate(arg)?);
                }
                self.registry.execute(&call.name, &args, self.ctx)
            }
            Expr::Unary(unary) => self.eval_unary(unary),
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for el in &array.elements {
                    elements.push(self.evaluate(el)?);
                }
                Ok(Value::Array(elements))
            }
        }
    }

    /// Resolution order: the record's property map by exact name, then the
    /// fixed special identifiers, then free variables.
    fn resolve_property(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.ctx.properties.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.ctx.resolve_special(name) {
            return Ok(value);
        }
        if let Some(value) = self.ctx.variables.get(name) {
            return Ok(value.clone());
        }
        Err(RuntimeError::PropertyNotFound(name.to_string()))
    }

    fn eval_unary(&self, unary: &UnaryExpr) -> Result<Value, RuntimeError> {
        let operand = self.evaluate(&unary.operand)?;
        Ok(match unary.op {
            UnaryOp::Neg => Value::Number(-coercion::to_number(&operand)),
            UnaryOp::Not => Value::Bool(!coercion::to_bool(&operand)),
        })
    }

    fn eval_binary(&self, binary: &BinaryExpr) -> Result<Value, RuntimeError> {
        // Both operands are always evaluated, including for `&&`/`||`; an
        // error in the conditionally-irrelevant side still fails the formula.
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;

        let value = match binary.op {
            BinaryOp::Add => Value::Number(coercion::to_number(&left) + coercion::to_number(&right)),
            BinaryOp::Sub => Value::Number(coercion::to_number(&left) - coercion::to_number(&right)),
            BinaryOp::Mul => Value::Number(coercion::to_number(&left) * coercion::to_number(&right)),
            BinaryOp::Div => {
                let divisor = coercion::to_number(&right);
                if divisor == 0.0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                Value::Number(coercion::to_number(&left) / divisor)
            }
            BinaryOp::Mod => Value::Number(coercion::to_number(&left) % coercion::to_number(&right)),
            BinaryOp::Pow => {
                Value::Number(coercion::to_number(&left).powf(coercion::to_number(&right)))
            }
            BinaryOp::Eq => Value::Bool(compare(&left, &right) == Ordering::Equal),
            BinaryOp::Ne => Value::Bool(compare(&left, &right) != Ordering::Equal),
            BinaryOp::Lt => Value::Bool(compare(&left, &right) == Ordering::Less),
            BinaryOp::Le => Value::Bool(compare(&left, &right) != Ordering::Greater),
            BinaryOp::Gt => Value::Bool(compare(&left, &right) == Ordering::Greater),
            BinaryOp::Ge => Value::Bool(compare(&left, &right) != Ordering::Less),
            BinaryOp::And => Value::Bool(coercion::to_bool(&left) && coercion::to_bool(&right)),
            BinaryOp::Or => Value::Bool(coercion::to_bool(&left) || coercion::to_bool(&right)),
            BinaryOp::Concat => {
                let mut text = coercion::to_text(&left);
                text.push_str(&coercion::to_text(&right));
                Value::Text(text)
            }
        };
        Ok(value)
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    coercion::compare_values(a, b)
}
