//! Schema contract check for generator plans.
//!
//! A plan is only compiled into a generator after it passes this check
//! against the Avro record schema it claims to implement. The check is
//! structural: every schema field must be covered by a generator whose output
//! the field's type accepts, and no generator may emit values the schema
//! cannot hold.

use apache_avro::schema::{RecordSchema, Schema};
use serde_json::Value;

use crate::generators::text::pattern_widths;
use crate::plan::{
    FieldPlan, GeneratorConfig, GeneratorPlan, TimestampUnit, MAX_GENERATED_LENGTH,
};

/// A plan that does not fit its schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Generator plan violates the schema contract: {}", violations.join("; "))]
pub struct ContractError {
    pub violations: Vec<String>,
}

/// Check a plan against a top-level record schema.
pub fn check_plan(plan: &GeneratorPlan, schema: &Schema) -> Result<(), ContractError> {
    let Schema::Record(record) = schema else {
        return Err(ContractError {
            violations: vec!["top-level schema is not a record".to_string()],
        });
    };

    if plan.record != record.name.name && plan.record != record.name.fullname(None) {
        tracing::warn!(
            "Generator plan names record '{}' but schema declares '{}'",
            plan.record,
            record.name.fullname(None)
        );
    }

    let mut violations = Vec::new();
    check_fields("", &plan.fields, record, &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ContractError { violations })
    }
}

fn check_fields(prefix: &str, plans: &[FieldPlan], record: &RecordSchema, out: &mut Vec<String>) {
    for field in &record.fields {
        let path = format!("{prefix}{}", field.name);
        let Some(plan) = plans.iter().find(|p| p.name == field.name) else {
            if field.default.is_none() {
                out.push(format!("{path}: no generator for field without default"));
            }
            continue;
        };

        if let Some(p) = plan.null_probability {
            if !(0.0..=1.0).contains(&p) {
                out.push(format!("{path}: null_probability {p} outside [0, 1]"));
            } else if p > 0.0 && !accepts_null(&field.schema) {
                out.push(format!("{path}: nullable generator on non-nullable field"));
            }
        }

        check_value(&path, &plan.generator, &field.schema, out);
    }

    for (idx, plan) in plans.iter().enumerate() {
        let path = format!("{prefix}{}", plan.name);
        if !record.fields.iter().any(|f| f.name == plan.name) {
            out.push(format!("{path}: field is not declared by the schema"));
        }
        if let GeneratorConfig::MinorUnitsFormatted { source, decimals } = &plan.generator {
            check_derivation(&path, source, *decimals, &plans[..idx], out);
        }
    }
}

fn check_derivation(
    path: &str,
    source: &str,
    decimals: u32,
    earlier: &[FieldPlan],
    out: &mut Vec<String>,
) {
    if decimals > 9 {
        out.push(format!("{path}: at most 9 decimals are supported"));
    }
    match earlier.iter().find(|p| p.name == source) {
        Some(FieldPlan {
            generator: GeneratorConfig::IntRange { .. },
            ..
        }) => {}
        Some(FieldPlan {
            generator: GeneratorConfig::Static { value },
            ..
        }) if value.is_i64() => {}
        Some(_) => out.push(format!(
            "{path}: source '{source}' does not generate integer minor units"
        )),
        None => out.push(format!(
            "{path}: source '{source}' must be generated earlier in the same record"
        )),
    }
}

fn accepts_null(schema: &Schema) -> bool {
    match schema {
        Schema::Null => true,
        Schema::Union(union) => union.is_nullable(),
        _ => false,
    }
}

fn check_value(path: &str, config: &GeneratorConfig, schema: &Schema, out: &mut Vec<String>) {
    check_bounds(path, config, out);
    check_type(path, config, schema, out);
}

/// Parameters a generator can only run with safely, independent of the schema.
fn check_bounds(path: &str, config: &GeneratorConfig, out: &mut Vec<String>) {
    match config {
        GeneratorConfig::Hex { length } => check_length(path, "hex length", *length, out),
        GeneratorConfig::Digits { length } => check_length(path, "digits length", *length, out),
        GeneratorConfig::Pattern { pattern } => {
            for width in pattern_widths(pattern) {
                check_length(path, "placeholder width", width, out);
            }
        }
        GeneratorConfig::Array {
            min_length,
            max_length,
            ..
        } => {
            check_length(path, "array min_length", *min_length, out);
            check_length(path, "array max_length", *max_length, out);
        }
        GeneratorConfig::FloatRange { min, max } => {
            if !(min.is_finite() && max.is_finite() && (max - min).is_finite()) {
                out.push(format!(
                    "{path}: float_range [{min}, {max}] needs finite bounds with a finite span"
                ));
            }
        }
        _ => {}
    }
}

fn check_length(path: &str, what: &str, length: usize, out: &mut Vec<String>) {
    if length > MAX_GENERATED_LENGTH {
        out.push(format!(
            "{path}: {what} {length} exceeds the maximum of {MAX_GENERATED_LENGTH}"
        ));
    }
}

fn check_type(path: &str, config: &GeneratorConfig, schema: &Schema, out: &mut Vec<String>) {
    if let Schema::Union(union) = schema {
        if matches!(config, GeneratorConfig::Null) {
            if !union.is_nullable() {
                out.push(format!("{path}: null generator on non-nullable union"));
            }
            return;
        }
        let accepted = union
            .variants()
            .iter()
            .filter(|v| !matches!(v, Schema::Null))
            .any(|variant| {
                let mut branch = Vec::new();
                check_type(path, config, variant, &mut branch);
                branch.is_empty()
            });
        if !accepted {
            out.push(format!(
                "{path}: no union branch accepts {} values",
                generator_name(config)
            ));
        }
        return;
    }

    let ok = match (config, schema) {
        (GeneratorConfig::Null, Schema::Null) => true,

        (GeneratorConfig::Record { fields }, Schema::Record(record)) => {
            check_fields(&format!("{path}."), fields, record, out);
            true
        }

        (GeneratorConfig::Array { items, .. }, Schema::Array(array)) => {
            check_value(&format!("{path}[]"), items, &array.items, out);
            true
        }

        (config, Schema::String) => is_string_generator(config),

        (GeneratorConfig::UuidV4, Schema::Uuid) => true,
        (GeneratorConfig::Static { value }, Schema::Uuid) => value
            .as_str()
            .is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),

        (GeneratorConfig::Pattern { .. } | GeneratorConfig::Hex { .. }, Schema::Bytes) => true,
        (GeneratorConfig::Static { value }, Schema::Bytes) => value.is_string(),

        (GeneratorConfig::OneOf { values }, Schema::Enum(e)) => {
            !values.is_empty() && values.iter().all(|v| is_symbol(v, &e.symbols))
        }
        (GeneratorConfig::Static { value }, Schema::Enum(e)) => is_symbol(value, &e.symbols),

        (GeneratorConfig::IntRange { min, max }, Schema::Int | Schema::Date | Schema::TimeMillis) => {
            i32::try_from(*min).is_ok() && i32::try_from(*max).is_ok()
        }
        (
            GeneratorConfig::IntRange { .. },
            Schema::Long | Schema::TimestampMillis | Schema::TimestampMicros | Schema::TimeMicros,
        ) => true,
        (config, Schema::Int | Schema::Date | Schema::TimeMillis) => {
            all_values(config, |v| v.as_i64().is_some_and(|i| i32::try_from(i).is_ok()))
        }
        (GeneratorConfig::TimestampNow { unit }, Schema::Long) => *unit != TimestampUnit::Iso8601,
        (GeneratorConfig::TimestampNow { unit }, Schema::TimestampMillis) => {
            *unit == TimestampUnit::Millis
        }
        (GeneratorConfig::TimestampNow { unit }, Schema::TimestampMicros) => {
            *unit == TimestampUnit::Micros
        }
        (config, Schema::Long | Schema::TimestampMillis | Schema::TimestampMicros) => {
            all_values(config, Value::is_i64)
        }

        (
            GeneratorConfig::FloatRange { .. } | GeneratorConfig::IntRange { .. },
            Schema::Float | Schema::Double,
        ) => true,
        (config, Schema::Float | Schema::Double) => all_values(config, Value::is_number),

        (GeneratorConfig::WeightedBool { true_weight }, Schema::Boolean) => {
            (0.0..=1.0).contains(true_weight)
        }
        (config, Schema::Boolean) => all_values(config, Value::is_boolean),

        (GeneratorConfig::Static { value }, Schema::Map(_)) => value.is_object(),

        (_, Schema::Ref { name }) => {
            out.push(format!(
                "{path}: named type reference '{}' is not supported",
                name.fullname(None)
            ));
            return;
        }

        _ => false,
    };

    if !ok {
        out.push(format!(
            "{path}: {} generator cannot produce {} values",
            generator_name(config),
            schema_name(schema)
        ));
    }
}

fn is_string_generator(config: &GeneratorConfig) -> bool {
    match config {
        GeneratorConfig::UuidV4
        | GeneratorConfig::Hex { .. }
        | GeneratorConfig::Digits { .. }
        | GeneratorConfig::Pattern { .. }
        | GeneratorConfig::MinorUnitsFormatted { .. } => true,
        GeneratorConfig::TimestampNow { unit } => *unit == TimestampUnit::Iso8601,
        config => all_values(config, Value::is_string),
    }
}

/// True when the config is `one_of`/`static` and every value passes `pred`.
fn all_values(config: &GeneratorConfig, pred: impl Fn(&Value) -> bool) -> bool {
    match config {
        GeneratorConfig::OneOf { values } => !values.is_empty() && values.iter().all(pred),
        GeneratorConfig::Static { value } => pred(value),
        _ => false,
    }
}

fn is_symbol(value: &Value, symbols: &[String]) -> bool {
    value
        .as_str()
        .is_some_and(|s| symbols.iter().any(|sym| sym == s))
}

fn generator_name(config: &GeneratorConfig) -> &'static str {
    match config {
        GeneratorConfig::UuidV4 => "uuid_v4",
        GeneratorConfig::Hex { .. } => "hex",
        GeneratorConfig::Digits { .. } => "digits",
        GeneratorConfig::Pattern { .. } => "pattern",
        GeneratorConfig::IntRange { .. } => "int_range",
        GeneratorConfig::FloatRange { .. } => "float_range",
        GeneratorConfig::MinorUnitsFormatted { .. } => "minor_units_formatted",
        GeneratorConfig::TimestampNow { .. } => "timestamp_now",
        GeneratorConfig::WeightedBool { .. } => "weighted_bool",
        GeneratorConfig::OneOf { .. } => "one_of",
        GeneratorConfig::Static { .. } => "static",
        GeneratorConfig::Null => "null",
        GeneratorConfig::Record { .. } => "record",
        GeneratorConfig::Array { .. } => "array",
    }
}

fn schema_name(schema: &Schema) -> String {
    match schema {
        Schema::Record(r) => format!("record '{}'", r.name.name),
        Schema::Enum(e) => format!("enum '{}'", e.name.name),
        other => format!("{:?}", apache_avro::schema::SchemaKind::from(other)).to_lowercase(),
    }
}
