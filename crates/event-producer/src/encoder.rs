//! Value encoders: Confluent-framed Avro and plain JSON.

use std::collections::HashMap;

use apache_avro::schema::Schema;
use apache_avro::types::Value as AvroValue;
use event_generator::Event;
use schema_registry::{wire, SchemaDocument};
use serde_json::Value;

use crate::error::EncodeError;

/// Turns an event into a message payload.
pub trait EventEncoder: Send {
    fn encode(&self, event: &Event) -> Result<Vec<u8>, EncodeError>;
}

/// Avro binary datum behind the Confluent wire header.
///
/// Event fields the schema does not declare are dropped; declared fields
/// missing from the event take the schema default.
pub struct AvroEncoder {
    schema: Schema,
    schema_id: u32,
}

impl AvroEncoder {
    pub fn new(document: &SchemaDocument) -> Result<Self, EncodeError> {
        let schema_id = document
            .id()
            .ok_or_else(|| EncodeError::MissingSchemaId(document.subject().to_string()))?;
        Ok(Self {
            schema: document.schema().clone(),
            schema_id,
        })
    }

    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }
}

impl EventEncoder for AvroEncoder {
    fn encode(&self, event: &Event) -> Result<Vec<u8>, EncodeError> {
        let value = json_to_avro(&Value::Object(event.fields().clone()), &self.schema, "")?;
        let datum = apache_avro::to_avro_datum(&self.schema, value)?;
        Ok(wire::frame(self.schema_id, &datum))
    }
}

/// UTF-8 JSON object, all fields kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl EventEncoder for JsonEncoder {
    fn encode(&self, event: &Event) -> Result<Vec<u8>, EncodeError> {
        Ok(event.to_json_bytes()?)
    }
}

fn incompatible(path: &str, reason: impl Into<String>) -> EncodeError {
    EncodeError::Incompatible {
        path: if path.is_empty() {
            "<root>".to_string()
        } else {
            path.to_string()
        },
        reason: reason.into(),
    }
}

fn expected(path: &str, what: &str, value: &Value) -> EncodeError {
    incompatible(path, format!("expected {what}, got {value}"))
}

/// Convert a JSON value into an Avro value shaped by `schema`.
pub fn json_to_avro(value: &Value, schema: &Schema, path: &str) -> Result<AvroValue, EncodeError> {
    match schema {
        Schema::Null => match value {
            Value::Null => Ok(AvroValue::Null),
            other => Err(expected(path, "null", other)),
        },

        Schema::Boolean => value
            .as_bool()
            .map(AvroValue::Boolean)
            .ok_or_else(|| expected(path, "boolean", value)),

        Schema::Int => {
            let n = value
                .as_i64()
                .ok_or_else(|| expected(path, "int", value))?;
            i32::try_from(n)
                .map(AvroValue::Int)
                .map_err(|_| incompatible(path, format!("{n} out of int range")))
        }

        Schema::Long => value
            .as_i64()
            .map(AvroValue::Long)
            .ok_or_else(|| expected(path, "long", value)),

        Schema::Float => value
            .as_f64()
            .map(|f| AvroValue::Float(f as f32))
            .ok_or_else(|| expected(path, "float", value)),

        Schema::Double => value
            .as_f64()
            .map(AvroValue::Double)
            .ok_or_else(|| expected(path, "double", value)),

        Schema::String => value
            .as_str()
            .map(|s| AvroValue::String(s.to_string()))
            .ok_or_else(|| expected(path, "string", value)),

        Schema::Bytes => value
            .as_str()
            .map(|s| AvroValue::Bytes(s.as_bytes().to_vec()))
            .ok_or_else(|| expected(path, "bytes as string", value)),

        Schema::Fixed(fixed) => {
            let s = value
                .as_str()
                .ok_or_else(|| expected(path, "fixed as string", value))?;
            if s.len() != fixed.size {
                return Err(incompatible(
                    path,
                    format!("fixed size {} but got {} bytes", fixed.size, s.len()),
                ));
            }
            Ok(AvroValue::Fixed(fixed.size, s.as_bytes().to_vec()))
        }

        Schema::Uuid => {
            let s = value
                .as_str()
                .ok_or_else(|| expected(path, "uuid string", value))?;
            uuid::Uuid::parse_str(s)
                .map(AvroValue::Uuid)
                .map_err(|e| incompatible(path, e.to_string()))
        }

        Schema::Date => {
            let n = value
                .as_i64()
                .ok_or_else(|| expected(path, "date as days", value))?;
            i32::try_from(n)
                .map(AvroValue::Date)
                .map_err(|_| incompatible(path, format!("{n} out of date range")))
        }

        Schema::TimeMillis => {
            let n = value
                .as_i64()
                .ok_or_else(|| expected(path, "time-millis", value))?;
            i32::try_from(n)
                .map(AvroValue::TimeMillis)
                .map_err(|_| incompatible(path, format!("{n} out of time-millis range")))
        }

        Schema::TimeMicros => value
            .as_i64()
            .map(AvroValue::TimeMicros)
            .ok_or_else(|| expected(path, "time-micros", value)),

        Schema::TimestampMillis => {
            timestamp(value, path, |dt| dt.timestamp_millis()).map(AvroValue::TimestampMillis)
        }

        Schema::TimestampMicros => {
            timestamp(value, path, |dt| dt.timestamp_micros()).map(AvroValue::TimestampMicros)
        }

        Schema::Enum(e) => {
            let symbol = value
                .as_str()
                .ok_or_else(|| expected(path, "enum symbol", value))?;
            let index = e
                .symbols
                .iter()
                .position(|s| s == symbol)
                .ok_or_else(|| incompatible(path, format!("'{symbol}' is not a symbol of {}", e.name.name)))?;
            Ok(AvroValue::Enum(index as u32, symbol.to_string()))
        }

        Schema::Array(array) => {
            let items = value
                .as_array()
                .ok_or_else(|| expected(path, "array", value))?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| json_to_avro(item, &array.items, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(AvroValue::Array)
        }

        Schema::Map(map) => {
            let object = value
                .as_object()
                .ok_or_else(|| expected(path, "map object", value))?;
            let mut out = HashMap::with_capacity(object.len());
            for (key, item) in object {
                out.insert(key.clone(), json_to_avro(item, &map.types, &format!("{path}.{key}"))?);
            }
            Ok(AvroValue::Map(out))
        }

        Schema::Record(record) => {
            let object = value
                .as_object()
                .ok_or_else(|| expected(path, "record object", value))?;
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let field_path = if path.is_empty() {
                    field.name.clone()
                } else {
                    format!("{path}.{}", field.name)
                };
                let field_value = match (object.get(&field.name), &field.default) {
                    (Some(v), _) => json_to_avro(v, &field.schema, &field_path)?,
                    (None, Some(default)) => json_to_avro(default, &field.schema, &field_path)?,
                    (None, None) => {
                        return Err(incompatible(&field_path, "missing and has no default"))
                    }
                };
                fields.push((field.name.clone(), field_value));
            }
            Ok(AvroValue::Record(fields))
        }

        // The first branch that accepts the value wins
        Schema::Union(union) => {
            for (index, variant) in union.variants().iter().enumerate() {
                if let Ok(v) = json_to_avro(value, variant, path) {
                    return Ok(AvroValue::Union(index as u32, Box::new(v)));
                }
            }
            Err(incompatible(path, format!("no union branch accepts {value}")))
        }

        other => Err(incompatible(
            path,
            format!("unsupported schema type {:?}", apache_avro::schema::SchemaKind::from(other)),
        )),
    }
}

fn timestamp(
    value: &Value,
    path: &str,
    from_datetime: impl Fn(&chrono::DateTime<chrono::FixedOffset>) -> i64,
) -> Result<i64, EncodeError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| expected(path, "integer timestamp", value)),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| from_datetime(&dt))
            .map_err(|e| incompatible(path, format!("invalid RFC 3339 timestamp '{s}': {e}"))),
        other => Err(expected(path, "timestamp", other)),
    }
}
