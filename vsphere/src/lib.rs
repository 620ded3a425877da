//! vSphere custom attribute acceptance scenarios
//!
//! Resource model, configuration fixtures, the five scenarios (basic, with
//! type, rename, change type, import) and an in-memory custom fields manager
//! that stands in for vCenter.

pub mod custom_attribute;
pub mod fixtures;
pub mod scenarios;
pub mod simulator;

pub use custom_attribute::CustomAttribute;
pub use simulator::{CustomFieldsSimulator, Operation, SimulatorError};

use std::sync::Arc;
use tfacc::{Backend, HarnessConfig, StepRunner};

/// Step runner wired to `simulator` with the scenario fixtures
pub fn simulated_runner(config: HarnessConfig, simulator: CustomFieldsSimulator) -> StepRunner {
    StepRunner::new(
        config,
        Backend::from_shared(Arc::new(simulator)),
        Arc::new(fixtures::store()),
    )
}
