//! The engine: wires parser, validator, evaluator, function registry, result
//! cache, and dependency graph into the operations callers invoke.
//!
//! Each [`Engine`] owns its registry, cache, and graph, so embedders and
//! tests construct isolated instances instead of sharing process-wide state.

use crate::ast::{ArrayLiteral, BinaryExpr, BinaryOp, CallExpr, Expr, LiteralExpr, UnaryExpr};
use crate::cache::{CacheKey, CacheStats, FormulaCache};
use crate::error::{CircularDependencyError, EngineError, RuntimeError};
use crate::eval::{self, EvalContext, Evaluator, ExecutionResult};
use crate::functions::FunctionRegistry;
use crate::graph::{detect_cycles, DependencyGraph};
use crate::parser::{self, ParseOutcome};
use crate::validate::{ValidationResult, Validator};
use crate::value::Value;
use ahash::AHashMap;
use chrono::Duration;
use recordcalc_model::{PropertyCatalog, RecordId, UserIdentity};
use std::time::Instant;
use tracing::debug;

/// What `execute` does when evaluation fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ErrorPolicy {
    /// Propagate the error to the caller.
    #[default]
    Propagate,
    /// Substitute a null result.
    ReturnNull,
    /// Substitute the given default, with its type inferred dynamically.
    ReturnDefault(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOptions {
    pub use_cache: bool,
    /// Expiry applied to the stored cache entry, on top of dependency-based
    /// staleness detection.
    pub cache_ttl: Option<Duration>,
    pub error_policy: ErrorPolicy,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_ttl: None,
            error_policy: ErrorPolicy::Propagate,
        }
    }
}

impl ExecuteOptions {
    /// Options with caching disabled entirely.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }
}

/// Outcome of a dry run against sample data.
#[derive(Debug)]
pub struct SampleEvaluation {
    pub validation: ValidationResult,
    /// Present only when validation passed.
    pub execution: Option<Result<ExecutionResult, RuntimeError>>,
}

pub struct Engine {
    registry: FunctionRegistry,
    cache: FormulaCache,
    graph: DependencyGraph,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the built-in function library.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::with_builtins())
    }

    /// An engine over a caller-assembled registry.
    #[must_use]
    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self {
            registry,
            cache: FormulaCache::new(),
            graph: DependencyGraph::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    /// Best-effort parse of `expression`.
    #[must_use]
    pub fn parse(&self, expression: &str) -> ParseOutcome {
        parser::parse(expression)
    }

    /// Static validation against a property catalog.
    #[must_use]
    pub fn validate(
        &self,
        expression: &str,
        catalog: &PropertyCatalog,
        max_complexity: Option<u32>,
    ) -> ValidationResult {
        Validator::new(&self.registry).validate(expression, catalog, max_complexity)
    }

    /// Execute `expression` against `ctx`.
    ///
    /// Pipeline: cache lookup (unless disabled), parse, dependency
    /// extraction, evaluation, cache store, dependency-graph update. The
    /// error policy in `options` decides whether evaluation failures
    /// propagate or are substituted.
    pub fn execute(
        &mut self,
        expression: &str,
        ctx: &EvalContext,
        options: &ExecuteOptions,
    ) -> Result<ExecutionResult, EngineError> {
        let started = Instant::now();

        if options.use_cache {
            let key = CacheKey::new(expression, ctx.record_id.clone());
            if let Some(entry) = self.cache.lookup(&key, &ctx.properties) {
                let mut dependencies: Vec<String> = entry.dependencies.keys().cloned().collect();
                dependencies.sort();
                debug!(record = %ctx.record_id, "formula cache hit");
                return Ok(ExecutionResult {
                    value: entry.value.clone(),
                    data_type: entry.data_type,
                    execution_time: started.elapsed(),
                    cache_hit: true,
                    dependencies,
                    warnings: Vec::new(),
                });
            }
        }

        let ast = parser::parse_formula(expression).map_err(EngineError::Parse)?;
        let dependencies = ast.properties();

        let value = match Evaluator::new(&self.registry, ctx).evaluate(&ast.root) {
            Ok(value) => value,
            Err(err) => {
                return apply_error_policy(err, dependencies, started, &options.error_policy)
            }
        };

        if options.use_cache {
            let snapshot: AHashMap<String, Value> = dependencies
                .iter()
                .map(|name| {
                    let current = ctx.properties.get(name).cloned().unwrap_or(Value::Null);
                    (name.clone(), current)
                })
                .collect();
            self.cache.store(
                CacheKey::new(expression, ctx.record_id.clone()),
                value.clone(),
                snapshot,
                options.cache_ttl,
            );
        }
        self.graph
            .update_dependencies(ctx.record_id.clone(), dependencies.iter().cloned());

        debug!(
            record = %ctx.record_id,
            elapsed_us = started.elapsed().as_micros() as u64,
            "formula evaluated"
        );
        Ok(ExecutionResult {
            data_type: value.data_type(),
            value,
            execution_time: started.elapsed(),
            cache_hit: false,
            dependencies,
            warnings: Vec::new(),
        })
    }

    /// Validate and then dry-run `expression` against sample property values,
    /// with caching disabled. Evaluation only runs when validation passes.
    #[must_use]
    pub fn test_with_sample_data(
        &self,
        expression: &str,
        sample_properties: AHashMap<String, Value>,
        catalog: &PropertyCatalog,
    ) -> SampleEvaluation {
        let validation = self.validate(expression, catalog, None);
        if !validation.is_valid {
            return SampleEvaluation {
                validation,
                execution: None,
            };
        }

        let ctx = EvalContext::new("sample-record".into(), "sample-collection".into())
            .with_user(UserIdentity::new(
                "sample-user",
                "Sample User",
                "sample@example.com",
            ))
            .with_properties(sample_properties);
        let execution = parser::parse_formula(expression)
            .ok()
            .map(|ast| eval::evaluate(&ast, &self.registry, &ctx));
        SampleEvaluation {
            validation,
            execution,
        }
    }

    /// Property names the expression reads.
    pub fn get_dependencies(&self, expression: &str) -> Result<Vec<String>, EngineError> {
        let ast = parser::parse_formula(expression).map_err(EngineError::Parse)?;
        Ok(ast.properties())
    }

    /// Distinct function names the expression calls.
    pub fn get_function_calls(&self, expression: &str) -> Result<Vec<String>, EngineError> {
        let ast = parser::parse_formula(expression).map_err(EngineError::Parse)?;
        Ok(ast.function_calls())
    }

    /// Complexity score of the expression; 0 when it does not parse.
    #[must_use]
    pub fn calculate_complexity(&self, expression: &str) -> u32 {
        parser::parse_formula(expression)
            .map(|ast| ast.complexity())
            .unwrap_or(0)
    }

    /// Canonicalize `expression`: normalize whitespace via canonical
    /// rendering and fold adjacent string-literal concatenations.
    pub fn optimize(&self, expression: &str) -> Result<String, EngineError> {
        let ast = parser::parse_formula(expression).map_err(EngineError::Parse)?;
        Ok(fold_literal_concat(ast.root).to_formula_string())
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Evict a single cached result.
    pub fn invalidate(&mut self, expression: &str, record_id: &RecordId) -> bool {
        self.cache
            .invalidate(&CacheKey::new(expression, record_id.clone()))
    }

    /// Every tracked record whose formula reads any of the changed
    /// properties.
    #[must_use]
    pub fn dependents_of(&self, changed: &[String]) -> Vec<RecordId> {
        self.graph.dependents_of(changed)
    }

    /// Recalculate every formula affected by a property change.
    ///
    /// `resolve` maps a dependent record to its formula text and evaluation
    /// context; records it cannot resolve are skipped.
    pub fn recalculate_on_change<F>(
        &mut self,
        changed: &[String],
        mut resolve: F,
        options: &ExecuteOptions,
    ) -> Vec<(RecordId, Result<ExecutionResult, EngineError>)>
    where
        F: FnMut(&RecordId) -> Option<(String, EvalContext)>,
    {
        let dependents = self.graph.dependents_of(changed);
        debug!(
            changed = changed.len(),
            dependents = dependents.len(),
            "cascading recalculation"
        );
        let mut results = Vec::with_capacity(dependents.len());
        for record_id in dependents {
            let Some((expression, ctx)) = resolve(&record_id) else {
                continue;
            };
            let result = self.execute(&expression, &ctx, options);
            results.push((record_id, result));
        }
        results
    }

    /// Stop tracking a record whose formula was deleted, evicting its cached
    /// results.
    pub fn remove_formula(&mut self, record_id: &RecordId) {
        self.graph.remove(record_id);
        self.cache.invalidate_record(record_id);
    }

    /// The authoritative cycle check across a collection's formulas, run
    /// before a formula may be saved or activated.
    ///
    /// `formulas` pairs each formula's property name with its expression
    /// text; expressions that do not parse contribute no edges.
    pub fn check_collection_cycles(
        &self,
        formulas: &[(String, String)],
    ) -> Result<(), CircularDependencyError> {
        let dep_map: Vec<(String, Vec<String>)> = formulas
            .iter()
            .map(|(name, expression)| {
                let deps = parser::parse(expression)
                    .ast
                    .map(|ast| ast.properties())
                    .unwrap_or_default();
                (name.clone(), deps)
            })
            .collect();
        let cycles = detect_cycles(&dep_map);
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(CircularDependencyError { cycles })
        }
    }
}

fn apply_error_policy(
    err: RuntimeError,
    dependencies: Vec<String>,
    started: Instant,
    policy: &ErrorPolicy,
) -> Result<ExecutionResult, EngineError> {
    let substitute = match policy {
        ErrorPolicy::Propagate => return Err(EngineError::Runtime(err)),
        ErrorPolicy::ReturnNull => Value::Null,
        ErrorPolicy::ReturnDefault(default) => default.clone(),
    };
    debug!(error = %err, "evaluation failed; substituting fallback value");
    Ok(ExecutionResult {
        data_type: substitute.data_type(),
        value: substitute,
        execution_time: started.elapsed(),
        cache_hit: false,
        dependencies,
        warnings: vec![format!("Evaluation failed: {err}")],
    })
}

/// Post-order fold of `"a" & "b"` into `"ab"`.
fn fold_literal_concat(expr: Expr) -> Expr {
    match expr {
        Expr::Binary(b) => {
            let left = fold_literal_concat(*b.left);
            let right = fold_literal_concat(*b.right);
            if b.op == BinaryOp::Concat {
                if let (Expr::Literal(l), Expr::Literal(r)) = (&left, &right) {
                    if let (Value::Text(a), Value::Text(z)) = (&l.value, &r.value) {
                        return Expr::Literal(LiteralExpr {
                            value: Value::Text(format!("{a}{z}")),
                            span: b.span,
                        });
                    }
                }
            }
            Expr::Binary(BinaryExpr {
                op: b.op,
                left: Box::new(left),
                right: Box::new(right),
                span: b.span,
            })
        }
        Expr::Unary(u) => Expr::Unary(UnaryExpr {
            op: u.op,
            operand: Box::new(fold_literal_concat(*u.operand)),
            span: u.span,
        }),
        Expr::Call(c) => Expr::Call(CallExpr {
            name: c.name,
            args: c.args.into_iter().map(fold_literal_concat).collect(),
            span: c.span,
        }),
        Expr::Array(a) => Expr::Array(ArrayLiteral {
            elements: a.elements.into_iter().map(fold_literal_concat).collect(),
            span: a.span,
        }),
        other => other,
    }
}
