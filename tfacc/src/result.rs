//! Scenario outcomes: failures, warnings and per-run results

use crate::assertion::AssertionFailure;
use crate::error::TfaccError;
use crate::types::RemoteObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of the step runner state machine in which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    PreCheck,
    Apply,
    Verify,
    Destroy,
    DestroyVerify,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Init => "init",
            Phase::PreCheck => "pre_check",
            Phase::Apply => "apply",
            Phase::Verify => "verify",
            Phase::Destroy => "destroy",
            Phase::DestroyVerify => "destroy_verify",
        };
        f.write_str(s)
    }
}

/// Classification of a scenario failure
///
/// "Not found yet" is not listed: an object that has not materialized is a
/// fetch state (`RemoteObject::exists == false`), never a failure by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConfigNotFound,
    TransportError,
    AssertionFailure,
    PreCheckFailure,
    /// The resource is still visible after teardown
    DestroyVerificationFailure,
    InvalidScenario,
    Cancelled,
}

/// One entry in a scenario's ordered failure (or warning) list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Index of the step being run; `None` outside the step loop
    pub step_index: Option<usize>,
    pub phase: Phase,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub message: String,
}

impl Failure {
    pub fn from_error(phase: Phase, step_index: Option<usize>, error: &TfaccError) -> Self {
        Self {
            step_index,
            phase,
            kind: error.kind(),
            assertion: None,
            expected: None,
            actual: None,
            message: error.to_string(),
        }
    }

    pub fn from_assertion(
        phase: Phase,
        step_index: Option<usize>,
        kind: FailureKind,
        failure: AssertionFailure,
    ) -> Self {
        Self {
            step_index,
            phase,
            kind,
            assertion: Some(failure.assertion),
            expected: Some(failure.expected),
            actual: Some(failure.actual),
            message: failure.message,
        }
    }

    /// Single-line location of the failure, e.g. `step 1 [verify] exists`
    pub fn location(&self) -> String {
        let mut out = match self.step_index {
            Some(idx) => format!("step {} [{}]", idx, self.phase),
            None => format!("[{}]", self.phase),
        };
        if let Some(assertion) = &self.assertion {
            out.push(' ');
            out.push_str(assertion);
        }
        out
    }
}

/// Outcome of running one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub run_id: Uuid,
    pub passed: bool,
    pub failures: Vec<Failure>,
    /// Cleanup problems recorded after a primary failure
    pub warnings: Vec<Failure>,
    pub steps_run: usize,
    pub steps_total: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Remote object as last fetched by a step, absent when no step got that far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observed: Option<RemoteObject>,
}

impl ScenarioResult {
    /// First failure, which is always the one that aborted the scenario
    pub fn primary_failure(&self) -> Option<&Failure> {
        self.failures.first()
    }

    pub fn has_failure_kind(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }
}
