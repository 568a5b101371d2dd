//! Validation built-ins: `ISBLANK`, `ISNUMBER`.

use super::{FunctionCategory, FunctionRegistry, FunctionSignature, ParamSpec};
use crate::value::{DataType, Value};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionSignature::new(
            "ISBLANK",
            FunctionCategory::Validation,
            "True when the value is missing or empty text.",
        )
        .param(ParamSpec::required("value", DataType::Any))
        .returns(DataType::Boolean)
        .example("ISBLANK([Notes])"),
        |_, args| Ok(Value::Bool(args[0].is_blank())),
    );

    registry.register(
        FunctionSignature::new(
            "ISNUMBER",
            FunctionCategory::Validation,
            "True when the value is a number.",
        )
        .param(ParamSpec::required("value", DataType::Any))
        .returns(DataType::Boolean)
        .example("ISNUMBER([Price])"),
        |_, args| Ok(Value::Bool(matches!(args[0], Value::Number(_)))),
    );
}
