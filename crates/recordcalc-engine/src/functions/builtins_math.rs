//! Math built-ins: `ABS`, `ROUND`, `SUM`, `AVERAGE`, `MIN`, `MAX`.
//!
//! The aggregates ignore non-numeric inputs (flattening arrays first), so a
//! formula like `SUM([Price], [Notes])` sums what it can instead of failing.
//! `ABS`/`ROUND` instead coerce their single required argument.

use super::{FunctionCategory, FunctionRegistry, FunctionSignature, ParamSpec};
use crate::coercion;
use crate::value::{DataType, Value};

/// Flatten arrays and keep only numeric values.
fn numeric_values(args: &[Value]) -> Vec<f64> {
    let mut out = Vec::with_capacity(args.len());
    collect_numeric(args, &mut out);
    out
}

fn collect_numeric(values: &[Value], out: &mut Vec<f64>) {
    for value in values {
        match value {
            Value::Number(n) => out.push(*n),
            Value::Array(items) => collect_numeric(items, out),
            _ => {}
        }
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionSignature::new("ABS", FunctionCategory::Math, "Absolute value of a number.")
            .param(ParamSpec::required("value", DataType::Number))
            .returns(DataType::Number)
            .example("ABS(-5)"),
        |_, args| Ok(Value::Number(coercion::to_number(&args[0]).abs())),
    );

    registry.register(
        FunctionSignature::new(
            "ROUND",
            FunctionCategory::Math,
            "Rounds a number to the given number of decimal places.",
        )
        .param(ParamSpec::required("value", DataType::Number))
        .param(ParamSpec::optional(
            "decimals",
            DataType::Number,
            Value::Number(0.0),
        ))
        .returns(DataType::Number)
        .example("ROUND(3.456, 2)"),
        |_, args| {
            let value = coercion::to_number(&args[0]);
            let decimals = coercion::to_number(&args[1]).clamp(-12.0, 12.0) as i32;
            let factor = 10f64.powi(decimals);
            Ok(Value::Number((value * factor).round() / factor))
        },
    );

    registry.register(
        FunctionSignature::new(
            "SUM",
            FunctionCategory::Math,
            "Sum of all numeric arguments; non-numeric arguments are ignored.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Number)
        .example("SUM([Price], [Tax])"),
        |_, args| Ok(Value::Number(numeric_values(args).iter().sum())),
    );

    registry.register(
        FunctionSignature::new(
            "AVERAGE",
            FunctionCategory::Math,
            "Arithmetic mean of all numeric arguments; non-numeric arguments are ignored.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Number)
        .example("AVERAGE([Q1], [Q2], [Q3])")
        .alias("AVG")
        .alias("MEAN"),
        |_, args| {
            let nums = numeric_values(args);
            if nums.is_empty() {
                return Ok(Value::Number(0.0));
            }
            Ok(Value::Number(nums.iter().sum::<f64>() / nums.len() as f64))
        },
    );

    registry.register(
        FunctionSignature::new(
            "MIN",
            FunctionCategory::Math,
            "Smallest numeric argument; non-numeric arguments are ignored.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Number)
        .example("MIN([Low], [High])"),
        |_, args| {
            let nums = numeric_values(args);
            Ok(nums
                .into_iter()
                .reduce(f64::min)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        },
    );

    registry.register(
        FunctionSignature::new(
            "MAX",
            FunctionCategory::Math,
            "Largest numeric argument; non-numeric arguments are ignored.",
        )
        .param(ParamSpec::variadic("values", DataType::Any))
        .returns(DataType::Number)
        .example("MAX([Low], [High])"),
        |_, args| {
            let nums = numeric_values(args);
            Ok(nums
                .into_iter()
                .reduce(f64::max)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        },
    );
}
