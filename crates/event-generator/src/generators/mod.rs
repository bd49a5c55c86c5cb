//! Individual value generators.
//!
//! This module turns the generator configuration of a plan into values.
//! Fields of a record are generated in declaration order so that derived
//! fields can read the siblings generated before them.

pub mod numeric;
pub mod text;
pub mod timestamp;
pub mod uuid;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Map, Value};

use crate::plan::{FieldPlan, GeneratorConfig};

/// Generate a record from its field plans.
pub fn generate_record<R: Rng>(fields: &[FieldPlan], rng: &mut R) -> Map<String, Value> {
    let mut record = Map::with_capacity(fields.len());
    for field in fields {
        let value = match field.null_probability {
            Some(p) if p > 0.0 && rng.gen_bool(p.min(1.0)) => Value::Null,
            _ => generate_value(&field.generator, rng, &record),
        };
        record.insert(field.name.clone(), value);
    }
    record
}

/// Generate a value based on the generator configuration.
///
/// `siblings` holds the fields of the enclosing record generated so far.
pub fn generate_value<R: Rng>(
    config: &GeneratorConfig,
    rng: &mut R,
    siblings: &Map<String, Value>,
) -> Value {
    match config {
        GeneratorConfig::UuidV4 => uuid::generate_uuid_string(rng),

        GeneratorConfig::Hex { length } => Value::String(text::generate_hex(rng, *length)),

        GeneratorConfig::Digits { length } => Value::String(text::generate_digits(rng, *length)),

        GeneratorConfig::Pattern { pattern } => {
            Value::String(text::generate_pattern(pattern, rng))
        }

        GeneratorConfig::IntRange { min, max } => {
            Value::from(numeric::generate_int_range(rng, *min, *max))
        }

        GeneratorConfig::FloatRange { min, max } => {
            Value::from(numeric::generate_float_range(rng, *min, *max))
        }

        GeneratorConfig::MinorUnitsFormatted { source, decimals } => {
            match siblings.get(source).and_then(Value::as_i64) {
                Some(amount) => Value::String(numeric::format_minor_units(amount, *decimals)),
                // The source drew null, so there is nothing to derive from
                None => Value::Null,
            }
        }

        GeneratorConfig::TimestampNow { unit } => timestamp::generate_timestamp_now(*unit),

        GeneratorConfig::WeightedBool { true_weight } => {
            Value::Bool(rng.gen_bool(true_weight.clamp(0.0, 1.0)))
        }

        GeneratorConfig::OneOf { values } => values.choose(rng).cloned().unwrap_or(Value::Null),

        GeneratorConfig::Static { value } => value.clone(),

        GeneratorConfig::Null => Value::Null,

        GeneratorConfig::Record { fields } => Value::Object(generate_record(fields, rng)),

        GeneratorConfig::Array {
            items,
            min_length,
            max_length,
        } => {
            let len = if min_length >= max_length {
                *min_length
            } else {
                rng.gen_range(*min_length..=*max_length)
            };
            let empty = Map::new();
            Value::Array(
                (0..len)
                    .map(|_| generate_value(items, rng, &empty))
                    .collect(),
            )
        }
    }
}
