//! Event generators for the eventgen streaming pipeline.
//!
//! This crate provides the [`EventGenerator`] capability and its two kinds of
//! implementations:
//!
//! - **Built-in generators** written in Rust and looked up by name
//!   (`PurchaseRequestEventV1`).
//! - **Plan generators** that interpret a declarative [`GeneratorPlan`]. Plans
//!   are the persisted artifact of the synthesis pipeline; a plan is compiled
//!   only after it passes the contract check against its Avro schema.
//!
//! # Architecture
//!
//! ```text
//! GeneratorPlan (YAML)        Avro schema
//!        │                        │
//!        └──────────┬─────────────┘
//!                   ▼
//!          contract::check_plan
//!                   │
//!                   ▼
//!          ┌─────────────────┐
//!          │  PlanGenerator  │
//!          │  - plan         │
//!          │  - rng (StdRng) │
//!          └────────┬────────┘
//!                   │ generate(add_hotkey)
//!                   ▼
//!                 Event
//! ```
//!
//! # Example
//!
//! ```rust
//! use event_generator::{EventGenerator, GeneratorPlan, PlanGenerator};
//!
//! let schema = apache_avro::Schema::parse_str(r#"{
//!     "type": "record", "name": "Ping",
//!     "fields": [{"name": "Id", "type": "string"}]
//! }"#).unwrap();
//!
//! let plan = GeneratorPlan::from_yaml(r#"
//! record: Ping
//! fields:
//!   - name: Id
//!     generator:
//!       type: uuid_v4
//! "#).unwrap();
//!
//! let mut generator = PlanGenerator::compile(plan, &schema, Some(42)).unwrap();
//! let event = generator.generate(true);
//! assert!(event.hotkey_id().is_some());
//! ```

pub mod builtin;
pub mod contract;
pub mod event;
pub mod generator;
pub mod generators;
pub mod plan;

// Re-exports for convenience
pub use builtin::{builtin_generator, builtin_schema, BUILTIN_GENERATORS};
pub use contract::{check_plan, ContractError};
pub use event::{Event, HOTKEY_FIELD, HOTKEY_RANGE};
pub use generator::{EventGenerator, PlanGenerator};
pub use plan::{
    FieldPlan, GeneratorConfig, GeneratorPlan, PlanError, TimestampUnit, MAX_GENERATED_LENGTH,
};
