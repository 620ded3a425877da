//! Scenario definitions and pre-checks

use crate::assertion::Assertion;
use crate::error::{Result, TfaccError};
use crate::step::Step;
use std::sync::Arc;

type PreCheckFn = dyn Fn() -> std::result::Result<(), String> + Send + Sync;

/// Gate run before anything is applied
#[derive(Clone)]
pub enum PreCheck {
    /// Every listed environment variable must be set and non-empty
    RequireEnv(Vec<String>),
    Custom(Arc<PreCheckFn>),
}

impl PreCheck {
    pub fn require_env(vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        PreCheck::RequireEnv(vars.into_iter().map(Into::into).collect())
    }

    pub fn custom<F>(check: F) -> Self
    where
        F: Fn() -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        PreCheck::Custom(Arc::new(check))
    }

    pub fn run(&self) -> Result<()> {
        match self {
            PreCheck::RequireEnv(vars) => {
                let missing: Vec<&str> = vars
                    .iter()
                    .filter(|var| {
                        std::env::var(var.as_str())
                            .map(|v| v.trim().is_empty())
                            .unwrap_or(true)
                    })
                    .map(String::as_str)
                    .collect();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(TfaccError::PreCheckFailed(format!(
                        "{} must be set for acceptance tests",
                        missing.join(", ")
                    )))
                }
            }
            PreCheck::Custom(check) => check().map_err(TfaccError::PreCheckFailed),
        }
    }
}

impl std::fmt::Debug for PreCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreCheck::RequireEnv(vars) => f.debug_tuple("RequireEnv").field(vars).finish(),
            PreCheck::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One end-to-end flow: pre-check, steps, teardown, destroy-check
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    /// Name every step and the destroy-check use to address the remote object
    pub logical_name: String,
    pub steps: Vec<Step>,
    pub pre_check: Option<PreCheck>,
    pub destroy_check: Assertion,
}

impl Scenario {
    pub fn builder(name: impl Into<String>, logical_name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Scenario {
                name: name.into(),
                logical_name: logical_name.into(),
                steps: Vec::new(),
                pre_check: None,
                destroy_check: Assertion::exists(false),
            },
        }
    }

    /// Structural checks done before anything is applied
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TfaccError::InvalidScenario(
                "scenario name must not be empty".to_string(),
            ));
        }
        if self.logical_name.trim().is_empty() {
            return Err(TfaccError::InvalidScenario(format!(
                "scenario '{}' has no logical name",
                self.name
            )));
        }
        match self.steps.first() {
            None => Err(TfaccError::InvalidScenario(format!(
                "scenario '{}' has no steps",
                self.name
            ))),
            Some(step) if step.is_import() => Err(TfaccError::InvalidScenario(format!(
                "scenario '{}' starts with an import step; nothing to import yet",
                self.name
            ))),
            Some(_) => Ok(()),
        }
    }
}

pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    pub fn pre_check(mut self, pre_check: PreCheck) -> Self {
        self.scenario.pre_check = Some(pre_check);
        self
    }

    pub fn maybe_pre_check(mut self, pre_check: Option<PreCheck>) -> Self {
        self.scenario.pre_check = pre_check;
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.scenario.steps.push(step);
        self
    }

    pub fn destroy_check(mut self, assertion: Assertion) -> Self {
        self.scenario.destroy_check = assertion;
        self
    }

    pub fn build(self) -> Scenario {
        self.scenario
    }
}
