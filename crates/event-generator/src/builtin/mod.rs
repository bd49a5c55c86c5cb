//! Generators implemented directly in Rust, selectable by name.

mod purchase_request;

pub use purchase_request::{
    Details, PurchaseRequestEvent, PurchaseRequestGenerator, State, PURCHASE_REQUEST_V1_SCHEMA,
};

use crate::generator::EventGenerator;

/// Names of all registered built-in generators.
pub const BUILTIN_GENERATORS: &[&str] = &[PurchaseRequestGenerator::NAME];

/// Look up a built-in generator by name.
pub fn builtin_generator(name: &str, seed: Option<u64>) -> Option<Box<dyn EventGenerator>> {
    match name {
        PurchaseRequestGenerator::NAME => Some(Box::new(PurchaseRequestGenerator::new(seed))),
        _ => None,
    }
}

/// The Avro schema a built-in generator was written against.
pub fn builtin_schema(name: &str) -> Option<&'static str> {
    match name {
        PurchaseRequestGenerator::NAME => Some(PURCHASE_REQUEST_V1_SCHEMA),
        _ => None,
    }
}
