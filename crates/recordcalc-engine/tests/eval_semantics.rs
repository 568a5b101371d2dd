//! End-to-end evaluation semantics: operator precedence, coercion rules, and
//! runtime failure modes.

use ahash::AHashMap;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use recordcalc_engine::{
    EngineError, ErrorPolicy, EvalContext, Engine, ExecuteOptions, RuntimeError, Value,
};
use recordcalc_model::UserIdentity;

fn ctx_with(props: &[(&str, Value)]) -> EvalContext {
    EvalContext::new("rec-1".into(), "db-1".into())
        .with_properties(props.iter().map(|(k, v)| (k.to_string(), v.clone())))
}

fn eval(expression: &str) -> Value {
    eval_with(expression, &[])
}

fn eval_with(expression: &str, props: &[(&str, Value)]) -> Value {
    let mut engine = Engine::new();
    engine
        .execute(expression, &ctx_with(props), &ExecuteOptions::uncached())
        .unwrap()
        .value
}

fn eval_err(expression: &str) -> EngineError {
    let mut engine = Engine::new();
    engine
        .execute(expression, &ctx_with(&[]), &ExecuteOptions::uncached())
        .unwrap_err()
}

#[test]
fn precedence_and_associativity() {
    assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
    assert_eq!(eval("(2 + 3) * 4"), Value::Number(20.0));
    assert_eq!(eval("2 ^ 3 ^ 2"), Value::Number(512.0));
    assert_eq!(eval("10 - 4 - 3"), Value::Number(3.0));
    assert_eq!(eval("7 % 4"), Value::Number(3.0));
    assert_eq!(eval("2 ** 5"), Value::Number(32.0));
}

#[test]
fn unary_operators() {
    assert_eq!(eval("-5 + 3"), Value::Number(-2.0));
    assert_eq!(eval("-2 ^ 2"), Value::Number(4.0));
    assert_eq!(eval("!true"), Value::Bool(false));
    assert_eq!(eval("!0"), Value::Bool(true));
}

#[test]
fn division_by_zero_raises() {
    let err = eval_err("10 / 0");
    assert!(err.to_string().contains("Division by zero"), "{err}");
    // A zero-coercing divisor counts too.
    let err = eval_err("10 / \"zero\"");
    assert!(err.to_string().contains("Division by zero"));
}

#[test]
fn missing_property_raises() {
    let err = eval_err("[Missing]");
    assert_eq!(err.to_string(), "Property not found: Missing");
}

#[test]
fn unknown_function_raises() {
    let err = eval_err("NOTAREALFN(1)");
    assert_eq!(err.to_string(), "Unknown function: NOTAREALFN");
}

#[test]
fn arithmetic_coercion() {
    assert_eq!(eval("\"3\" + 1"), Value::Number(4.0));
    assert_eq!(eval("\"abc\" + 1"), Value::Number(1.0));
    assert_eq!(eval("true + true"), Value::Number(2.0));
    assert_eq!(
        eval_with("[Empty] + 5", &[("Empty", Value::Null)]),
        Value::Number(5.0)
    );
}

#[test]
fn concatenation_coerces_to_text() {
    assert_eq!(eval("\"n=\" & 3"), Value::Text("n=3".into()));
    assert_eq!(eval("\"b=\" & true"), Value::Text("b=true".into()));
    assert_eq!(
        eval_with("\"x\" & [Empty]", &[("Empty", Value::Null)]),
        Value::Text("x".into())
    );

    let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(
        eval_with("\"at \" & [When]", &[("When", Value::Date(date))]),
        Value::Text("at 2024-01-02T03:04:05.000Z".into())
    );
}

#[test]
fn comparisons_use_the_total_order() {
    assert_eq!(eval("1 < 2"), Value::Bool(true));
    assert_eq!(eval("2 <= 2"), Value::Bool(true));
    assert_eq!(eval("\"apple\" < \"banana\""), Value::Bool(true));
    assert_eq!(eval("false < true"), Value::Bool(true));

    // Null sorts before any present value and equals itself.
    assert_eq!(
        eval_with("[Empty] < 0", &[("Empty", Value::Null)]),
        Value::Bool(true)
    );
    assert_eq!(
        eval_with("[A] == [B]", &[("A", Value::Null), ("B", Value::Null)]),
        Value::Bool(true)
    );

    // Mixed types fall back to lexicographic text comparison.
    assert_eq!(eval("\"10\" < 9"), Value::Bool(true));
}

#[test]
fn logical_operators_do_not_short_circuit() {
    assert_eq!(eval("true && false"), Value::Bool(false));
    assert_eq!(eval("false || 1"), Value::Bool(true));

    // Both operands are always evaluated: an error on the right side fails
    // the formula even when the left side already decides the outcome.
    let err = eval_err("true || 1 / 0 > 0");
    assert!(err.to_string().contains("Division by zero"));
    let err = eval_err("false && [Nope]");
    assert!(err.to_string().contains("Property not found"));
}

#[test]
fn property_resolution_order() {
    // Context property wins over special identifiers of the same name.
    let mut engine = Engine::new();
    let ctx = ctx_with(&[("id", Value::Text("shadowed".into()))]);
    let result = engine
        .execute("[id]", &ctx, &ExecuteOptions::uncached())
        .unwrap();
    assert_eq!(result.value, Value::Text("shadowed".into()));

    // Free variables are consulted last.
    let ctx = EvalContext::new("r".into(), "c".into())
        .with_variable("threshold", Value::Number(10.0));
    let result = engine
        .execute("[threshold] * 2", &ctx, &ExecuteOptions::uncached())
        .unwrap();
    assert_eq!(result.value, Value::Number(20.0));
}

#[test]
fn special_identifiers_resolve_from_context() {
    let mut engine = Engine::new();
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap();
    let ctx = EvalContext::new("rec-77".into(), "db-9".into())
        .with_user(UserIdentity::new("u-1", "Ada Lovelace", "ada@example.com"))
        .with_now(now);

    let opts = ExecuteOptions::uncached();
    assert_eq!(
        engine.execute("recordid", &ctx, &opts).unwrap().value,
        Value::Text("rec-77".into())
    );
    assert_eq!(
        engine.execute("[databaseid]", &ctx, &opts).unwrap().value,
        Value::Text("db-9".into())
    );
    assert_eq!(
        engine.execute("currentuseremail", &ctx, &opts).unwrap().value,
        Value::Text("ada@example.com".into())
    );
    assert_eq!(
        engine.execute("now", &ctx, &opts).unwrap().value,
        Value::Date(now)
    );
    assert_eq!(
        engine.execute("today", &ctx, &opts).unwrap().value,
        Value::Date(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap())
    );
    // `YEAR(today)` style composition works because `today` is a date value.
    assert_eq!(
        engine.execute("YEAR(today)", &ctx, &opts).unwrap().value,
        Value::Number(2024.0)
    );
}

#[test]
fn function_calls_evaluate_arguments_left_to_right() {
    assert_eq!(
        eval_with(
            "IF([Qty] > 10, \"bulk\", \"retail\")",
            &[("Qty", Value::Number(25.0))]
        ),
        Value::Text("bulk".into())
    );
    assert_eq!(eval("CONCAT(UPPER(\"a\"), LOWER(\"B\"))"), Value::Text("Ab".into()));
    assert_eq!(eval("SUM(1, 2, {3, 4})"), Value::Number(10.0));
}

#[test]
fn array_literals_evaluate_elementwise() {
    assert_eq!(
        eval_with("{[A], [A] * 2}", &[("A", Value::Number(3.0))]),
        Value::Array(vec![Value::Number(3.0), Value::Number(6.0)])
    );
}

#[test]
fn nested_function_error_carries_the_function_name() {
    let err = eval_err("ROUND(YEAR(\"not a date\"))");
    let text = err.to_string();
    assert!(text.contains("YEAR"), "{text}");
}

#[test]
fn error_policy_return_null_substitutes() {
    let mut engine = Engine::new();
    let options = ExecuteOptions {
        use_cache: false,
        cache_ttl: None,
        error_policy: ErrorPolicy::ReturnNull,
    };
    let result = engine
        .execute("[Missing] + 1", &ctx_with(&[]), &options)
        .unwrap();
    assert_eq!(result.value, Value::Null);
    assert!(result.warnings[0].contains("Property not found"));
}

#[test]
fn error_policy_return_default_substitutes() {
    let mut engine = Engine::new();
    let options = ExecuteOptions {
        use_cache: false,
        cache_ttl: None,
        error_policy: ErrorPolicy::ReturnDefault(Value::Number(0.0)),
    };
    let result = engine
        .execute("1 / 0", &ctx_with(&[]), &options)
        .unwrap();
    assert_eq!(result.value, Value::Number(0.0));
}

#[test]
fn custom_executors_can_raise_and_are_wrapped() {
    let mut engine = Engine::new();
    engine.registry_mut().register(
        recordcalc_engine::FunctionSignature::new(
            "FAIL",
            recordcalc_engine::FunctionCategory::Validation,
            "Always fails.",
        ),
        |_, _| Err(RuntimeError::Custom("intentional".into())),
    );

    let err = engine
        .execute("FAIL()", &ctx_with(&[]), &ExecuteOptions::uncached())
        .unwrap_err();
    assert_eq!(err.to_string(), "Error in function FAIL: intentional");
}

#[test]
fn related_records_are_reachable_from_executors() {
    let mut engine = Engine::new();
    engine.registry_mut().register(
        recordcalc_engine::FunctionSignature::new(
            "RELATED",
            recordcalc_engine::FunctionCategory::Validation,
            "Reads a property from a related record.",
        )
        .param(recordcalc_engine::ParamSpec::required(
            "record",
            recordcalc_engine::DataType::Text,
        ))
        .param(recordcalc_engine::ParamSpec::required(
            "property",
            recordcalc_engine::DataType::Text,
        )),
        |ctx, args| {
            let (Value::Text(record), Value::Text(property)) = (&args[0], &args[1]) else {
                return Ok(Value::Null);
            };
            Ok(ctx
                .related
                .get(record)
                .and_then(|bag| bag.get(property))
                .cloned()
                .unwrap_or(Value::Null))
        },
    );

    let mut bag = AHashMap::new();
    bag.insert("Name".to_string(), Value::Text("Project X".into()));
    let ctx = EvalContext::new("r".into(), "c".into()).with_related("parent", bag);

    let result = engine
        .execute(
            "RELATED(\"parent\", \"Name\")",
            &ctx,
            &ExecuteOptions::uncached(),
        )
        .unwrap();
    assert_eq!(result.value, Value::Text("Project X".into()));
}
