//! Text built-ins: `CONCAT`, `UPPER`, `LOWER`, `LEN`, `LEFT`, `RIGHT`.
//!
//! Length and slicing count Unicode scalar values, not bytes.

use super::{FunctionCategory, FunctionRegistry, FunctionSignature, ParamSpec};
use crate::coercion;
use crate::value::{DataType, Value};

fn text_arg(value: &Value) -> &str {
    match value {
        Value::Text(s) => s,
        _ => "",
    }
}

fn count_arg(value: &Value) -> usize {
    coercion::to_number(value).max(0.0) as usize
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionSignature::new(
            "CONCAT",
            FunctionCategory::Text,
            "Concatenates the text form of every argument.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Text)
        .example("CONCAT([First], \" \", [Last])")
        .alias("CONCATENATE"),
        |_, args| {
            let mut out = String::new();
            for arg in args {
                out.push_str(&coercion::to_text(arg));
            }
            Ok(Value::Text(out))
        },
    );

    registry.register(
        FunctionSignature::new("UPPER", FunctionCategory::Text, "Uppercases text.")
            .param(ParamSpec::required("text", DataType::Text))
            .returns(DataType::Text)
            .example("UPPER([Name])"),
        |_, args| Ok(Value::Text(text_arg(&args[0]).to_uppercase())),
    );

    registry.register(
        FunctionSignature::new("LOWER", FunctionCategory::Text, "Lowercases text.")
            .param(ParamSpec::required("text", DataType::Text))
            .returns(DataType::Text)
            .example("LOWER([Email])"),
        |_, args| Ok(Value::Text(text_arg(&args[0]).to_lowercase())),
    );

    registry.register(
        FunctionSignature::new("LEN", FunctionCategory::Text, "Number of characters in text.")
            .param(ParamSpec::required("text", DataType::Text))
            .returns(DataType::Number)
            .example("LEN([Title])")
            .alias("LENGTH"),
        |_, args| Ok(Value::Number(text_arg(&args[0]).chars().count() as f64)),
    );

    registry.register(
        FunctionSignature::new(
            "LEFT",
            FunctionCategory::Text,
            "Leading characters of text.",
        )
        .param(ParamSpec::required("text", DataType::Text))
        .param(ParamSpec::optional(
            "count",
            DataType::Number,
            Value::Number(1.0),
        ))
        .returns(DataType::Text)
        .example("LEFT([Code], 3)"),
        |_, args| {
            let count = count_arg(&args[1]);
            Ok(Value::Text(text_arg(&args[0]).chars().take(count).collect()))
        },
    );

    registry.register(
        FunctionSignature::new(
            "RIGHT",
            FunctionCategory::Text,
            "Trailing characters of text.",
        )
        .param(ParamSpec::required("text", DataType::Text))
        .param(ParamSpec::optional(
            "count",
            DataType::Number,
            Value::Number(1.0),
        ))
        .returns(DataType::Text)
        .example("RIGHT([Phone], 4)"),
        |_, args| {
            let text = text_arg(&args[0]);
            let count = count_arg(&args[1]);
            let total = text.chars().count();
            Ok(Value::Text(
                text.chars().skip(total.saturating_sub(count)).collect(),
            ))
        },
    );
}
