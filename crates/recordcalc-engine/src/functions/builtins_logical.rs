//! Logical built-ins: `IF`, `AND`, `OR`, `NOT`.
//!
//! Arguments are always fully evaluated before dispatch, so `IF` selects
//! between two already-computed branches rather than short-circuiting.

use super::{FunctionCategory, FunctionRegistry, FunctionSignature, ParamSpec};
use crate::coercion;
use crate::value::{DataType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionSignature::new(
            "IF",
            FunctionCategory::Logical,
            "Returns the second argument when the condition is true, else the third.",
        )
        .param(ParamSpec::required("condition", DataType::Boolean))
        .param(ParamSpec::required("then", DataType::Any))
        .param(ParamSpec::optional("else", DataType::Any, Value::Null))
        .returns(DataType::Any)
        .example("IF([Done], \"closed\", \"open\")"),
        |_, args| {
            if coercion::to_bool(&args[0]) {
                Ok(args[1].clone())
            } else {
                Ok(args[2].clone())
            }
        },
    );

    registry.register(
        FunctionSignature::new(
            "AND",
            FunctionCategory::Logical,
            "True when every argument is truthy.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Boolean)
        .example("AND([Done], [Reviewed])"),
        |_, args| Ok(Value::Bool(args.iter().all(coercion::to_bool))),
    );

    registry.register(
        FunctionSignature::new(
            "OR",
            FunctionCategory::Logical,
            "True when any argument is truthy.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Boolean)
        .example("OR([Urgent], [Overdue])"),
        |_, args| Ok(Value::Bool(args.iter().any(coercion::to_bool))),
    );

    registry.register(
        FunctionSignature::new("NOT", FunctionCategory::Logical, "Logical negation.")
            .param(ParamSpec::required("value", DataType::Boolean))
            .returns(DataType::Boolean)
            .example("NOT([Done])"),
        |_, args| Ok(Value::Bool(!coercion::to_bool(&args[0]))),
    );
}
