//! Declarative generator plans.
//!
//! A plan is the persisted form of a generator: it binds every field of a
//! record schema to one of a fixed set of value generators. Plans are written
//! as YAML:
//!
//! ```yaml
//! record: PurchaseRequestEventV1
//! fields:
//!   - name: Details
//!     generator:
//!       type: record
//!       fields:
//!         - name: TraceId
//!           generator: { type: hex, length: 32 }
//!   - name: State
//!     generator:
//!       type: record
//!       fields:
//!         - name: Amount
//!           generator: { type: int_range, min: 100, max: 100000 }
//!         - name: AmountFormatted
//!           generator: { type: minor_units_formatted, source: Amount }
//!         - name: Info
//!           null_probability: 0.5
//!           generator: { type: pattern, pattern: "ref-{rand:6}" }
//! ```

use serde::{Deserialize, Serialize};

/// Upper bound on `hex`/`digits` lengths, pattern placeholder widths and
/// array lengths accepted by the contract check.
pub const MAX_GENERATED_LENGTH: usize = 4096;

/// Error type for plan parsing.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The text is not a valid plan document
    #[error("Failed to parse generator plan: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The plan has no fields
    #[error("Generator plan for '{0}' declares no fields")]
    Empty(String),
}

/// Generator configuration for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// Random UUID v4 in hyphenated textual form
    UuidV4,

    /// Lowercase hex string of a fixed length
    Hex { length: usize },

    /// Decimal digit string of a fixed length (leading zeros allowed)
    Digits { length: usize },

    /// Pattern string with `{uuid}`, `{rand:N}` and `{hex:N}` placeholders
    Pattern { pattern: String },

    /// Random integer in a range (inclusive)
    IntRange { min: i64, max: i64 },

    /// Random float in a range (inclusive)
    FloatRange { min: f64, max: f64 },

    /// Decimal string derived from an integer sibling holding minor units.
    ///
    /// The sibling must be generated earlier in the same record, so both
    /// values come from one draw.
    MinorUnitsFormatted {
        source: String,
        #[serde(default = "default_decimals")]
        decimals: u32,
    },

    /// Current UTC time at generation
    TimestampNow {
        #[serde(default)]
        unit: TimestampUnit,
    },

    /// Boolean with configurable true probability
    WeightedBool { true_weight: f64 },

    /// Random selection from a list of values
    OneOf { values: Vec<serde_json::Value> },

    /// Fixed value
    Static { value: serde_json::Value },

    /// Always null
    Null,

    /// Nested record
    Record { fields: Vec<FieldPlan> },

    /// Array of generated elements
    Array {
        items: Box<GeneratorConfig>,
        #[serde(default)]
        min_length: usize,
        max_length: usize,
    },
}

fn default_decimals() -> u32 {
    2
}

/// Representation of `timestamp_now` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampUnit {
    /// RFC 3339 string
    #[default]
    Iso8601,
    /// Milliseconds since the epoch
    Millis,
    /// Microseconds since the epoch
    Micros,
}

/// A single field binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPlan {
    /// Field name as declared by the schema
    pub name: String,

    /// Probability of emitting null instead of a generated value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_probability: Option<f64>,

    pub generator: GeneratorConfig,
}

impl FieldPlan {
    pub fn new(name: impl Into<String>, generator: GeneratorConfig) -> Self {
        Self {
            name: name.into(),
            null_probability: None,
            generator,
        }
    }

    pub fn nullable(mut self, probability: f64) -> Self {
        self.null_probability = Some(probability);
        self
    }
}

/// A complete plan for one top-level record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorPlan {
    /// Name of the record the plan was written for
    pub record: String,

    /// Fingerprint of the schema the plan was accepted against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_fingerprint: Option<String>,

    pub fields: Vec<FieldPlan>,
}

impl GeneratorPlan {
    /// Parse a plan from YAML (JSON is accepted too).
    pub fn from_yaml(text: &str) -> Result<Self, PlanError> {
        let plan: GeneratorPlan = serde_yaml::from_str(text)?;
        if plan.fields.is_empty() {
            return Err(PlanError::Empty(plan.record));
        }
        Ok(plan)
    }

    pub fn to_yaml(&self) -> Result<String, PlanError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.schema_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldPlan> {
        self.fields.iter().find(|f| f.name == name)
    }
}
