//! The event generator capability and its plan-driven implementation.

use apache_avro::Schema;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::contract::{check_plan, ContractError};
use crate::event::{Event, HOTKEY_FIELD, HOTKEY_RANGE};
use crate::generators::generate_record;
use crate::plan::GeneratorPlan;

/// Produces one structured event per call.
///
/// Each call is independent of the previous ones; the only state an
/// implementation carries is its random number generator.
pub trait EventGenerator: Send {
    /// Name of the generator, for logs.
    fn name(&self) -> &str;

    /// Generate one event, adding a `hotkeyId` in [1, 50] when asked.
    fn generate(&mut self, add_hotkey: bool) -> Event;
}

impl<G: EventGenerator + ?Sized> EventGenerator for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&mut self, add_hotkey: bool) -> Event {
        (**self).generate(add_hotkey)
    }
}

/// Insert a uniformly drawn hotkey id into the event.
pub fn inject_hotkey<R: Rng>(event: &mut Event, rng: &mut R) {
    event.insert(HOTKEY_FIELD, Value::from(rng.gen_range(HOTKEY_RANGE)));
}

/// Create an RNG from an optional seed.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Generator that interprets a declarative plan.
///
/// Construction goes through [`PlanGenerator::compile`], which refuses plans
/// that do not satisfy the schema contract.
pub struct PlanGenerator {
    plan: GeneratorPlan,
    rng: StdRng,
}

impl PlanGenerator {
    /// Check the plan against the schema and build a generator from it.
    pub fn compile(
        plan: GeneratorPlan,
        schema: &Schema,
        seed: Option<u64>,
    ) -> Result<Self, ContractError> {
        check_plan(&plan, schema)?;
        Ok(Self {
            plan,
            rng: rng_from_seed(seed),
        })
    }

    pub fn plan(&self) -> &GeneratorPlan {
        &self.plan
    }
}

impl EventGenerator for PlanGenerator {
    fn name(&self) -> &str {
        &self.plan.record
    }

    fn generate(&mut self, add_hotkey: bool) -> Event {
        let mut event = Event::new(generate_record(&self.plan.fields, &mut self.rng));
        if add_hotkey {
            inject_hotkey(&mut event, &mut self.rng);
        }
        event
    }
}
