//! Dynamic evaluation: the runtime context and the tree-walking evaluator.

use crate::ast::Ast;
use crate::error::RuntimeError;
use crate::functions::FunctionRegistry;
use crate::value::{DataType, Value};
use ahash::AHashMap;
use chrono::{DateTime, TimeZone, Utc};
use recordcalc_model::{CollectionId, RecordId, UserIdentity};
use std::time::{Duration, Instant};

mod evaluator;

pub use evaluator::Evaluator;

/// The fixed identifiers resolvable in any formula without being declared as
/// properties. Matched case-insensitively.
pub const SPECIAL_IDENTIFIERS: [&str; 8] = [
    "id",
    "recordid",
    "databaseid",
    "currentuser",
    "currentuserid",
    "currentuseremail",
    "now",
    "today",
];

/// `true` if `name` is one of the fixed special identifiers.
#[must_use]
pub fn is_special_identifier(name: &str) -> bool {
    SPECIAL_IDENTIFIERS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(name))
}

/// Everything a single evaluation runs against. Constructed fresh per call
/// and not retained.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub record_id: RecordId,
    pub collection_id: CollectionId,
    /// The record's current property values, by exact property name.
    pub properties: AHashMap<String, Value>,
    pub user: UserIdentity,
    /// The instant `now`/`today` resolve to; fixed at construction so one
    /// recalculation pass sees one consistent time.
    pub now: DateTime<Utc>,
    /// Free variables, consulted after properties and special identifiers.
    pub variables: AHashMap<String, Value>,
    /// Property bags of related records, for cross-record function executors.
    pub related: AHashMap<String, AHashMap<String, Value>>,
}

impl EvalContext {
    #[must_use]
    pub fn new(record_id: RecordId, collection_id: CollectionId) -> Self {
        Self {
            record_id,
            collection_id,
            properties: AHashMap::new(),
            user: UserIdentity::default(),
            now: Utc::now(),
            variables: AHashMap::new(),
            related: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn with_properties<I, K>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: UserIdentity) -> Self {
        self.user = user;
        self
    }

    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_related(
        mut self,
        name: impl Into<String>,
        properties: AHashMap<String, Value>,
    ) -> Self {
        self.related.insert(name.into(), properties);
        self
    }

    /// The context instant truncated to midnight UTC.
    #[must_use]
    pub fn today(&self) -> DateTime<Utc> {
        let midnight = self
            .now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_else(|| self.now.naive_utc());
        Utc.from_utc_datetime(&midnight)
    }

    /// Resolve one of the fixed special identifiers, case-insensitively.
    #[must_use]
    pub fn resolve_special(&self, name: &str) -> Option<Value> {
        let value = match name.to_ascii_lowercase().as_str() {
            "id" | "recordid" => Value::Text(self.record_id.as_str().to_string()),
            "databaseid" => Value::Text(self.collection_id.as_str().to_string()),
            "currentuser" => Value::Text(self.user.display_name.clone()),
            "currentuserid" => Value::Text(self.user.id.clone()),
            "currentuseremail" => Value::Text(self.user.email.clone()),
            "now" => Value::Date(self.now),
            "today" => Value::Date(self.today()),
            _ => return None,
        };
        Some(value)
    }
}

/// Outcome of one formula execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub value: Value,
    pub data_type: DataType,
    pub execution_time: Duration,
    pub cache_hit: bool,
    /// Property names the formula reads.
    pub dependencies: Vec<String>,
    pub warnings: Vec<String>,
}

/// Evaluate a parsed formula against `ctx`, timing the walk.
pub fn evaluate(
    ast: &Ast,
    registry: &FunctionRegistry,
    ctx: &EvalContext,
) -> Result<ExecutionResult, RuntimeError> {
    let started = Instant::now();
    let value = Evaluator::new(registry, ctx).evaluate(&ast.root)?;
    Ok(ExecutionResult {
        data_type: value.data_type(),
        value,
        execution_time: started.elapsed(),
        cache_hit: false,
        dependencies: ast.properties(),
        warnings: Vec::new(),
    })
}
