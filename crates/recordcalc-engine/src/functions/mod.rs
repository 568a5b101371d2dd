//! The function registry: signatures, executors, and lookup.
//!
//! Each engine owns its registry instance, so tests and embedders can build
//! isolated registries (or swap executors) without touching process-wide
//! state. Names and aliases are keyed case-insensitively. Arity checking,
//! optional-parameter defaults, and declared-type coercion all happen before
//! dispatch, which keeps the executors themselves simple and total.

use crate::coercion;
use crate::error::RuntimeError;
use crate::eval::EvalContext;
use crate::fuzzy;
use crate::value::{DataType, Value};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod builtins_date_time;
mod builtins_logical;
mod builtins_math;
mod builtins_text;
mod builtins_validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCategory {
    Math,
    Text,
    Date,
    Logical,
    Validation,
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunctionCategory::Math => "math",
            FunctionCategory::Text => "text",
            FunctionCategory::Date => "date",
            FunctionCategory::Logical => "logical",
            FunctionCategory::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// One declared parameter of a function signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    /// Accepted types; containing [`DataType::Any`] accepts everything.
    pub types: Vec<DataType>,
    pub optional: bool,
    /// Substituted when an optional parameter is omitted by the caller.
    pub default: Option<Value>,
    pub variadic: bool,
}

impl ParamSpec {
    #[must_use]
    pub fn required(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            types: vec![ty],
            optional: false,
            default: None,
            variadic: false,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, ty: DataType, default: Value) -> Self {
        Self {
            name: name.into(),
            types: vec![ty],
            optional: true,
            default: Some(default),
            variadic: false,
        }
    }

    /// A trailing parameter accepting one or more values.
    #[must_use]
    pub fn variadic(name: impl Into<String>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            types: vec![ty],
            optional: false,
            default: None,
            variadic: true,
        }
    }
}

/// Declared shape of a registered function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub category: FunctionCategory,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub return_type: DataType,
    pub examples: Vec<String>,
    pub deprecated: bool,
    pub aliases: Vec<String>,
}

impl FunctionSignature {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: FunctionCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: description.into(),
            params: Vec::new(),
            return_type: DataType::Any,
            examples: Vec::new(),
            deprecated: false,
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn returns(mut self, ty: DataType) -> Self {
        self.return_type = ty;
        self
    }

    #[must_use]
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Minimum number of arguments a call must supply.
    #[must_use]
    pub fn min_args(&self) -> usize {
        let fixed = self
            .params
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count();
        let variadic_required = self.params.iter().any(|p| p.variadic && !p.optional);
        fixed + usize::from(variadic_required)
    }

    /// Maximum accepted argument count, or `None` for variadic signatures.
    #[must_use]
    pub fn max_args(&self) -> Option<usize> {
        if self.is_variadic() {
            None
        } else {
            Some(self.params.len())
        }
    }

    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.params.iter().any(|p| p.variadic)
    }

    /// `true` if `name` matches the primary name or any alias,
    /// case-insensitively.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

type ExecutorFn = dyn Fn(&EvalContext, &[Value]) -> Result<Value, RuntimeError> + Send + Sync;

/// A signature paired with its executor.
pub struct RegisteredFunction {
    pub signature: FunctionSignature,
    executor: Arc<ExecutorFn>,
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Case-insensitive table of registered functions, keyed by name and alias.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    entries: AHashMap<String, Arc<RegisteredFunction>>,
}

impl FunctionRegistry {
    /// An empty registry with no functions at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in function library.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins_math::register(&mut registry);
        builtins_text::register(&mut registry);
        builtins_date_time::register(&mut registry);
        builtins_logical::register(&mut registry);
        builtins_validation::register(&mut registry);
        registry
    }

    /// Insert or overwrite a function under its name and every alias.
    pub fn register<F>(&mut self, signature: FunctionSignature, executor: F)
    where
        F: Fn(&EvalContext, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        let primary = signature.name.to_uppercase();

        // Re-registration overwrites: drop alias keys left over from the
        // previous registration under this name.
        if let Some(old) = self.entries.get(&primary).cloned() {
            if old.signature.name.eq_ignore_ascii_case(&signature.name) {
                for alias in &old.signature.aliases {
                    self.entries.remove(&alias.to_uppercase());
                }
            }
        }

        let entry = Arc::new(RegisteredFunction {
            signature,
            executor: Arc::new(executor),
        });
        for alias in &entry.signature.aliases {
            self.entries.insert(alias.to_uppercase(), Arc::clone(&entry));
        }
        self.entries.insert(primary, entry);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.entries.get(&name.to_uppercase()).map(|entry| &**entry)
    }

    #[must_use]
    pub fn signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.get(name).map(|f| &f.signature)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_uppercase())
    }

    /// Look up `name` and invoke its executor.
    ///
    /// Arity is checked, omitted optional parameters take their declared
    /// defaults, and arguments are coerced to the declared parameter types
    /// before the executor runs. Executor failures are wrapped with the
    /// function name.
    pub fn execute(
        &self,
        name: &str,
        args: &[Value],
        ctx: &EvalContext,
    ) -> Result<Value, RuntimeError> {
        let Some(func) = self.entries.get(&name.to_uppercase()) else {
            return Err(RuntimeError::UnknownFunction(name.to_string()));
        };
        let prepared = prepare_args(&func.signature, args).map_err(|e| match e {
            // Arity errors already name the function.
            e @ (RuntimeError::TooFewArguments { .. } | RuntimeError::TooManyArguments { .. }) => e,
            other => other.in_function(&func.signature.name),
        })?;
        (func.executor)(ctx, &prepared).map_err(|e| e.in_function(&func.signature.name))
    }

    /// Every registered signature (aliases deduplicated), sorted by name.
    #[must_use]
    pub fn signatures(&self) -> Vec<&FunctionSignature> {
        let mut out: Vec<&FunctionSignature> = self
            .entries
            .iter()
            .filter(|(key, entry)| key.as_str() == entry.signature.name.to_uppercase())
            .map(|(_, entry)| &entry.signature)
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    #[must_use]
    pub fn by_category(&self, category: FunctionCategory) -> Vec<&FunctionSignature> {
        self.signatures()
            .into_iter()
            .filter(|s| s.category == category)
            .collect()
    }

    /// Substring search over names and aliases, for autocomplete-style
    /// tooling.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&FunctionSignature> {
        let query = query.to_uppercase();
        self.signatures()
            .into_iter()
            .filter(|s| {
                s.name.to_uppercase().contains(&query)
                    || s.aliases.iter().any(|a| a.to_uppercase().contains(&query))
            })
            .collect()
    }

    /// Closest registered names to a misspelled `name`, for diagnostics.
    #[must_use]
    pub fn suggest(&self, name: &str, limit: usize) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        for sig in self.signatures() {
            candidates.push(sig.name.clone());
            candidates.extend(sig.aliases.iter().cloned());
        }
        let matched = fuzzy::suggestions(name, candidates.iter().map(String::as_str), limit * 2);

        // Map alias hits back to primary names and deduplicate.
        let mut out: Vec<String> = Vec::new();
        for m in matched {
            let primary = self
                .get(&m)
                .map(|f| f.signature.name.clone())
                .unwrap_or(m);
            if !out.contains(&primary) {
                out.push(primary);
            }
            if out.len() == limit {
                break;
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn prepare_args(signature: &FunctionSignature, args: &[Value]) -> Result<Vec<Value>, RuntimeError> {
    let min = signature.min_args();
    if args.len() < min {
        return Err(RuntimeError::TooFewArguments {
            name: signature.name.clone(),
            min,
            got: args.len(),
        });
    }
    if let Some(max) = signature.max_args() {
        if args.len() > max {
            return Err(RuntimeError::TooManyArguments {
                name: signature.name.clone(),
                max,
                got: args.len(),
            });
        }
    }

    let mut prepared = Vec::with_capacity(args.len().max(signature.params.len()));
    for (i, param) in signature.params.iter().enumerate() {
        if param.variadic {
            for arg in args.iter().skip(i) {
                prepared.push(coerce_param(arg, param)?);
            }
            break;
        }
        match args.get(i) {
            Some(arg) => prepared.push(coerce_param(arg, param)?),
            None => match &param.default {
                Some(default) => prepared.push(default.clone()),
                None => break,
            },
        }
    }
    Ok(prepared)
}

fn coerce_param(value: &Value, param: &ParamSpec) -> Result<Value, RuntimeError> {
    if param.types.is_empty()
        || param.types.contains(&DataType::Any)
        || param.types.contains(&value.data_type())
    {
        return Ok(value.clone());
    }
    match param.types[0] {
        DataType::Number => Ok(Value::Number(coercion::to_number(value))),
        DataType::Text => Ok(Value::Text(coercion::to_text(value))),
        DataType::Boolean => Ok(Value::Bool(coercion::to_bool(value))),
        DataType::Date => coercion::to_datetime(value)
            .map(Value::Date)
            .ok_or_else(|| RuntimeError::Coercion {
                from: value.data_type().to_string(),
                target: "date",
            }),
        DataType::Array | DataType::Null | DataType::Any => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalContext;
    use pretty_assertions::assert_eq;

    fn ctx() -> EvalContext {
        EvalContext::new("rec-1".into(), "col-1".into())
    }

    #[test]
    fn builtins_cover_every_spec_category() {
        let registry = FunctionRegistry::with_builtins();
        for name in [
            "ABS", "ROUND", "SUM", "AVERAGE", "MIN", "MAX", "CONCAT", "UPPER", "LOWER", "LEN",
            "LEFT", "RIGHT", "NOW", "TODAY", "YEAR", "MONTH", "DAY", "IF", "AND", "OR", "NOT",
            "ISBLANK", "ISNUMBER",
        ] {
            assert!(registry.contains(name), "missing builtin {name}");
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_alias_aware() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.contains("sum"));
        assert!(registry.contains("Avg"));
        assert_eq!(registry.signature("avg").map(|s| s.name.as_str()), Some("AVERAGE"));
    }

    #[test]
    fn arity_is_enforced_before_dispatch() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry.execute("ABS", &[], &ctx()).unwrap_err();
        assert!(matches!(err, RuntimeError::TooFewArguments { .. }));

        let err = registry
            .execute(
                "ABS",
                &[Value::Number(1.0), Value::Number(2.0)],
                &ctx(),
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::TooManyArguments { .. }));
    }

    #[test]
    fn optional_params_take_defaults() {
        let registry = FunctionRegistry::with_builtins();
        // ROUND's decimal-places argument defaults to 0.
        let v = registry
            .execute("ROUND", &[Value::Number(2.6)], &ctx())
            .unwrap();
        assert_eq!(v, Value::Number(3.0));
    }

    #[test]
    fn declared_types_coerce_arguments() {
        let registry = FunctionRegistry::with_builtins();
        let v = registry
            .execute("ABS", &[Value::Text("-4".into())], &ctx())
            .unwrap();
        assert_eq!(v, Value::Number(4.0));
    }

    #[test]
    fn unknown_function_is_a_hard_error() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry.execute("NOTAREALFN", &[], &ctx()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown function: NOTAREALFN");
    }

    #[test]
    fn reregistration_overwrites_and_drops_stale_aliases() {
        let mut registry = FunctionRegistry::new();
        registry.register(
            FunctionSignature::new("PI", FunctionCategory::Math, "Pi.").alias("TAU_HALF"),
            |_, _| Ok(Value::Number(std::f64::consts::PI)),
        );
        assert!(registry.contains("TAU_HALF"));

        registry.register(
            FunctionSignature::new("PI", FunctionCategory::Math, "Pi, no aliases."),
            |_, _| Ok(Value::Number(std::f64::consts::PI)),
        );
        assert!(registry.contains("PI"));
        assert!(!registry.contains("TAU_HALF"));
    }

    #[test]
    fn suggestions_cover_aliases() {
        let registry = FunctionRegistry::with_builtins();
        let suggestions = registry.suggest("CONCATENAT", 3);
        assert!(suggestions.contains(&"CONCAT".to_string()));
    }

    #[test]
    fn search_filters_by_substring() {
        let registry = FunctionRegistry::with_builtins();
        let hits = registry.search("IS");
        let names: Vec<&str> = hits.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"ISBLANK"));
        assert!(names.contains(&"ISNUMBER"));
    }
}
