//! Scenario registry

use crate::context::RunContext;
use crate::error::{Result, TfaccError};
use crate::report::Report;
use crate::result::ScenarioResult;
use crate::runner::StepRunner;
use crate::scenario::Scenario;
use futures::stream::{self, StreamExt};

/// Ordered set of uniquely named scenarios
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scenario: Scenario) -> Result<()> {
        if self.get(&scenario.name).is_some() {
            return Err(TfaccError::DuplicateScenario(scenario.name));
        }
        tracing::debug!("Registered scenario '{}'", scenario.name);
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Result<Self> {
        self.register(scenario)?;
        Ok(self)
    }

    /// Scenario names in registration order. Call again to restart.
    pub fn list_scenarios(&self) -> impl Iterator<Item = &str> + '_ {
        self.scenarios.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub async fn run_all(&self, runner: &StepRunner) -> Report {
        self.run_matching(runner, &RunContext::new("batch"), |_| true)
            .await
    }

    /// Runs every scenario whose name satisfies `filter`
    ///
    /// Each scenario gets a child of `batch`, so cancelling `batch` aborts all
    /// of them. Up to `parallelism` scenarios are in flight at once; results
    /// keep registration order either way.
    pub async fn run_matching<F>(&self, runner: &StepRunner, batch: &RunContext, filter: F) -> Report
    where
        F: Fn(&str) -> bool,
    {
        let selected: Vec<&Scenario> = self
            .scenarios
            .iter()
            .filter(|s| filter(s.name.as_str()))
            .collect();
        let parallelism = runner.config().parallelism.max(1);
        tracing::info!(
            "Running {} of {} scenario(s), {} at a time",
            selected.len(),
            self.scenarios.len(),
            parallelism
        );

        let results: Vec<ScenarioResult> = stream::iter(selected)
            .map(|scenario| runner.run_scenario_with(batch.child(scenario.name.clone()), scenario))
            .buffered(parallelism)
            .collect()
            .await;

        Report::new(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    fn scenario(name: &str) -> Scenario {
        Scenario::builder(name, "terraform-test-attribute")
            .step(Step::apply("basic"))
            .build()
    }

    #[test]
    fn list_scenarios_keeps_registration_order_and_restarts() {
        let registry = ScenarioRegistry::new()
            .with_scenario(scenario("basic"))
            .and_then(|r| r.with_scenario(scenario("with type")))
            .and_then(|r| r.with_scenario(scenario("rename")))
            .unwrap();

        let first: Vec<&str> = registry.list_scenarios().collect();
        let second: Vec<&str> = registry.list_scenarios().collect();
        assert_eq!(first, vec!["basic", "with type", "rename"]);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ScenarioRegistry::new();
        registry.register(scenario("basic")).unwrap();

        let err = registry.register(scenario("basic")).unwrap_err();
        assert!(matches!(err, TfaccError::DuplicateScenario(ref name) if name == "basic"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_finds_by_name() {
        let registry = ScenarioRegistry::new()
            .with_scenario(scenario("import"))
            .unwrap();
        assert!(registry.get("import").is_some());
        assert!(registry.get("rename").is_none());
    }
}
