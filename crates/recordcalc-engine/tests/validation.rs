//! Engine-level validation behavior: suggestions, static analysis helpers,
//! and canonicalization.

use pretty_assertions::assert_eq;
use recordcalc_engine::{DataType, Engine, ValidationErrorKind};
use recordcalc_model::{PropertyCatalog, PropertyDescriptor, PropertyType};

fn catalog() -> PropertyCatalog {
    [
        PropertyDescriptor::new("Price", PropertyType::Number),
        PropertyDescriptor::new("Tax", PropertyType::Number),
        PropertyDescriptor::new("Name", PropertyType::Text),
    ]
    .into_iter()
    .collect()
}

#[test]
fn misspelled_property_suggests_the_real_one() {
    let engine = Engine::new();
    let result = engine.validate("[Pric]", &catalog(), None);
    assert!(!result.is_valid);
    let error = &result.errors[0];
    assert_eq!(error.kind, ValidationErrorKind::UnknownProperty);
    assert_eq!(error.message, "Unknown property: Pric");
    assert!(error.suggestions.contains(&"Price".to_string()));
}

#[test]
fn unknown_function_is_a_semantic_error_with_suggestions() {
    let engine = Engine::new();
    let result = engine.validate("NOTAREALFN(1)", &catalog(), None);
    assert!(!result.is_valid);
    let error = &result.errors[0];
    assert_eq!(error.kind, ValidationErrorKind::UnknownFunction);
    assert_eq!(error.message, "Unknown function: NOTAREALFN");
    // Fuzzy suggestions come from the registered names/aliases.
    let result = engine.validate("SUMM([Price])", &catalog(), None);
    assert!(result.errors[0].suggestions.contains(&"SUM".to_string()));
}

#[test]
fn validation_collects_every_problem_at_once() {
    let engine = Engine::new();
    let result = engine.validate("[Pric] + NOTAREALFN([Nope])", &catalog(), None);
    assert!(!result.is_valid);
    // Two unknown properties and one unknown function.
    assert_eq!(result.errors.len(), 3);
}

#[test]
fn unparseable_input_returns_a_structured_result() {
    let engine = Engine::new();
    let result = engine.validate("((((", &catalog(), None);
    assert!(!result.is_valid);
    assert_eq!(result.errors[0].kind, ValidationErrorKind::Syntax);
    assert_eq!(result.complexity, 0);
    assert!(result.dependencies.is_empty());
}

#[test]
fn inferred_types_reflect_the_catalog() {
    let engine = Engine::new();
    assert_eq!(
        engine.validate("[Price] + [Tax]", &catalog(), None).return_type,
        DataType::Number
    );
    assert_eq!(
        engine.validate("[Name] & \"!\"", &catalog(), None).return_type,
        DataType::Text
    );
    assert_eq!(
        engine.validate("[Price] > [Tax]", &catalog(), None).return_type,
        DataType::Boolean
    );
}

#[test]
fn complexity_is_monotonic_in_tree_weight() {
    let engine = Engine::new();
    let call = engine.calculate_complexity("SUM([A], [B], [C])");
    let operator = engine.calculate_complexity("[A] + [B]");
    assert!(call > operator, "{call} <= {operator}");
    assert_eq!(engine.calculate_complexity("not a ( valid formula"), 0);
}

#[test]
fn dependency_and_call_extraction() {
    let engine = Engine::new();
    assert_eq!(
        engine
            .get_dependencies("SUM([A], [B]) + [A] * [C]")
            .unwrap(),
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    );
    assert_eq!(
        engine
            .get_function_calls("SUM(ROUND([A]), ROUND([B]))")
            .unwrap(),
        vec!["SUM".to_string(), "ROUND".to_string()]
    );
    assert!(engine.get_dependencies("1 +").is_err());
}

#[test]
fn optimize_normalizes_whitespace_and_folds_literal_concat() {
    let engine = Engine::new();
    assert_eq!(
        engine.optimize("\"Hello, \"   &   \"world\"").unwrap(),
        "\"Hello, world\""
    );
    // Folding happens anywhere in the tree; non-literal operands survive.
    assert_eq!(
        engine.optimize("\"a\" & \"b\" & [Name]").unwrap(),
        "(\"ab\" & [Name])"
    );
    assert_eq!(
        engine.optimize("1+2 * [Price]").unwrap(),
        "(1 + (2 * [Price]))"
    );
}

#[test]
fn deprecated_functions_warn_but_validate() {
    let mut engine = Engine::new();
    engine.registry_mut().register(
        recordcalc_engine::FunctionSignature::new(
            "OLDSUM",
            recordcalc_engine::FunctionCategory::Math,
            "Legacy alias for SUM.",
        )
        .param(recordcalc_engine::ParamSpec::variadic(
            "values",
            DataType::Any,
        ))
        .returns(DataType::Number)
        .deprecated(),
        |_, _| Ok(recordcalc_engine::Value::Number(0.0)),
    );

    let result = engine.validate("OLDSUM([Price])", &catalog(), None);
    assert!(result.is_valid);
    assert!(result.warnings.iter().any(|w| w.contains("deprecated")));
}
