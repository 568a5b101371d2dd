//! Date built-ins: `NOW`, `TODAY`, `YEAR`, `MONTH`, `DAY`.
//!
//! `NOW`/`TODAY` read the evaluation context's instant rather than the wall
//! clock, so a whole recalculation pass sees one consistent time.

use super::{FunctionCategory, FunctionRegistry, FunctionSignature, ParamSpec};
use crate::value::{DataType, Value};
use chrono::{DateTime, Datelike, Utc};

fn date_arg(value: &Value) -> DateTime<Utc> {
    match value {
        Value::Date(d) => *d,
        // Unreachable through the registry (the Date parameter type coerces
        // or rejects first); fall back to the epoch for hand-built calls.
        _ => DateTime::<Utc>::UNIX_EPOCH,
    }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionSignature::new(
            "NOW",
            FunctionCategory::Date,
            "The current date and time.",
        )
        .returns(DataType::Date)
        .example("NOW()"),
        |ctx, _| Ok(Value::Date(ctx.now)),
    );

    registry.register(
        FunctionSignature::new(
            "TODAY",
            FunctionCategory::Date,
            "The current date, at midnight UTC.",
        )
        .returns(DataType::Date)
        .example("TODAY()"),
        |ctx, _| Ok(Value::Date(ctx.today())),
    );

    registry.register(
        FunctionSignature::new("YEAR", FunctionCategory::Date, "Calendar year of a date.")
            .param(ParamSpec::required("date", DataType::Date))
            .returns(DataType::Number)
            .example("YEAR([Due Date])"),
        |_, args| Ok(Value::Number(f64::from(date_arg(&args[0]).year()))),
    );

    registry.register(
        FunctionSignature::new(
            "MONTH",
            FunctionCategory::Date,
            "Calendar month of a date (1-12).",
        )
        .param(ParamSpec::required("date", DataType::Date))
        .returns(DataType::Number)
        .example("MONTH([Due Date])"),
        |_, args| Ok(Value::Number(f64::from(date_arg(&args[0]).month()))),
    );

    registry.register(
        FunctionSignature::new(
            "DAY",
            FunctionCategory::Date,
            "Day of the month of a date (1-31).",
        )
        .param(ParamSpec::required("date", DataType::Date))
        .returns(DataType::Number)
        .example("DAY([Due Date])"),
        |_, args| Ok(Value::Number(f64::from(date_arg(&args[0]).day()))),
    );
}
