//! Step runner
//!
//! Drives one scenario through
//! `INIT -> PRECHECK -> APPLY(i) -> VERIFY(i) -> ... -> DESTROY -> DESTROY_VERIFY -> DONE`.
//!
//! - INIT validates the scenario and resolves every fixture, so a missing
//!   fixture aborts before anything is created.
//! - INIT and PRECHECK failures end the run without teardown.
//! - Any failure inside the step loop stops the remaining steps, but teardown
//!   and the destroy-check still run.
//! - Once a scenario has failed, teardown problems are recorded as warnings
//!   and never replace the primary failure.

use crate::assertion::{Assertion, AssertionFailure};
use crate::collaborator::Backend;
use crate::config::HarnessConfig;
use crate::context::RunContext;
use crate::error::{Result, TfaccError};
use crate::fetcher::RemoteFetcher;
use crate::fixture::FixtureStore;
use crate::result::{Failure, FailureKind, Phase, ScenarioResult};
use crate::scenario::Scenario;
use crate::step::{ImportDirective, Step};
use crate::types::RemoteObject;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

const IMPORT_VERIFY: &str = "import_state_verify";

/// Runs scenarios against one backend with one configuration
#[derive(Clone)]
pub struct StepRunner {
    config: HarnessConfig,
    backend: Backend,
    fixtures: Arc<FixtureStore>,
}

impl StepRunner {
    pub fn new(config: HarnessConfig, backend: Backend, fixtures: Arc<FixtureStore>) -> Self {
        Self {
            config,
            backend,
            fixtures,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn fixtures(&self) -> &FixtureStore {
        &self.fixtures
    }

    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        self.run_scenario_with(RunContext::new(scenario.name.clone()), scenario)
            .await
    }

    /// Runs under a caller-supplied context; cancel it to abort the run
    pub async fn run_scenario_with(&self, ctx: RunContext, scenario: &Scenario) -> ScenarioResult {
        let span = tracing::info_span!(
            "scenario",
            name = %scenario.name,
            run_id = %ctx.run_id()
        );
        Execution::new(self, scenario, ctx).run().instrument(span).await
    }
}

/// Mutable state of a single scenario run
struct Execution<'a> {
    runner: &'a StepRunner,
    scenario: &'a Scenario,
    ctx: RunContext,
    fetcher: RemoteFetcher,
    failures: Vec<Failure>,
    warnings: Vec<Failure>,
    steps_run: usize,
    last_applied: Option<RemoteObject>,
    /// Most recent object fetched by a step, kept for the report
    last_observed: Option<RemoteObject>,
}

impl<'a> Execution<'a> {
    fn new(runner: &'a StepRunner, scenario: &'a Scenario, ctx: RunContext) -> Self {
        let fetcher = RemoteFetcher::new(runner.backend.state.clone(), runner.config.fetch_timeout);
        Self {
            runner,
            scenario,
            ctx,
            fetcher,
            failures: Vec::new(),
            warnings: Vec::new(),
            steps_run: 0,
            last_applied: None,
            last_observed: None,
        }
    }

    async fn run(mut self) -> ScenarioResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!("Starting scenario with {} steps", self.scenario.steps.len());

        if let Some(configs) = self.init() {
            if self.pre_check() {
                self.run_steps(&configs).await;
                self.teardown().await;
            }
        }

        let passed = self.failures.is_empty();
        if passed {
            tracing::info!("Scenario passed");
        } else {
            tracing::warn!("Scenario failed with {} failure(s)", self.failures.len());
        }

        ScenarioResult {
            name: self.scenario.name.clone(),
            run_id: self.ctx.run_id(),
            passed,
            failures: self.failures,
            warnings: self.warnings,
            steps_run: self.steps_run,
            steps_total: self.scenario.steps.len(),
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            last_observed: self.last_observed,
        }
    }

    fn init(&mut self) -> Option<Vec<&'a str>> {
        let runner = self.runner;
        let scenario = self.scenario;

        if let Err(e) = scenario.validate() {
            self.fail(Failure::from_error(Phase::Init, None, &e));
            return None;
        }

        let mut configs = Vec::with_capacity(scenario.steps.len());
        for (idx, step) in scenario.steps.iter().enumerate() {
            match runner.fixtures.get(&step.config) {
                Ok(text) => configs.push(text),
                Err(e) => {
                    self.fail(Failure::from_error(Phase::Init, Some(idx), &e));
                    return None;
                }
            }
        }
        Some(configs)
    }

    fn pre_check(&mut self) -> bool {
        if self.ctx.is_cancelled() {
            self.fail(Failure::from_error(Phase::PreCheck, None, &TfaccError::Cancelled));
            return false;
        }

        let scenario = self.scenario;
        let Some(check) = &scenario.pre_check else {
            return true;
        };
        match check.run() {
            Ok(()) => true,
            Err(e) => {
                self.fail(Failure::from_error(Phase::PreCheck, None, &e));
                false
            }
        }
    }

    async fn run_steps(&mut self, configs: &[&str]) {
        let scenario = self.scenario;

        for (idx, (step, config)) in scenario.steps.iter().zip(configs).enumerate() {
            if self.ctx.is_cancelled() {
                self.fail(Failure::from_error(Phase::Apply, Some(idx), &TfaccError::Cancelled));
                return;
            }

            let completed = match &step.import {
                Some(import) => self.import_step(idx, step, import).await,
                None => self.apply_step(idx, step, config).await,
            };
            if !completed {
                tracing::warn!("Step {} failed, skipping remaining steps", idx);
                return;
            }
            self.steps_run += 1;
        }
    }

    async fn apply_step(&mut self, idx: usize, step: &Step, config: &str) -> bool {
        tracing::info!("Step {}: applying fixture '{}'", idx, step.config);

        let apply = self.runner.backend.apply.apply(self.ctx.clone(), config);
        if let Err(e) = self.cancellable(self.timed("apply", apply)).await {
            tracing::error!("Step {}: apply failed: {}", idx, e);
            self.fail(Failure::from_error(Phase::Apply, Some(idx), &e));
            return false;
        }

        let object = match self.observe(step.expects_existence(), true).await {
            Ok(object) => object,
            Err(e) => {
                self.fail(Failure::from_error(Phase::Verify, Some(idx), &e));
                return false;
            }
        };
        self.last_observed = Some(object.clone());

        if !self.verify(idx, &step.checks, &object) {
            return false;
        }
        self.last_applied = Some(object);
        true
    }

    async fn import_step(&mut self, idx: usize, step: &Step, import: &ImportDirective) -> bool {
        let scenario = self.scenario;
        let importer = self.runner.backend.importer.clone();
        tracing::info!("Step {}: importing '{}'", idx, import.resource_address);

        let resolve = importer.resolve_identity(self.ctx.clone(), &scenario.logical_name);
        let import_id = match self.cancellable(self.timed("resolve_identity", resolve)).await {
            Ok(id) => id,
            Err(e) => {
                self.fail(Failure::from_error(Phase::Apply, Some(idx), &e));
                return false;
            }
        };
        tracing::debug!("Step {}: resolved import id {:?}", idx, import_id);

        let read = importer.import(self.ctx.clone(), &scenario.logical_name, &import_id);
        let imported = match self.cancellable(self.timed("import", read)).await {
            Ok(Some(attributes)) => RemoteObject::present(scenario.logical_name.clone(), attributes),
            Ok(None) => {
                let e = TfaccError::ImportFailed(format!(
                    "{} with id {:?} does not exist",
                    import.resource_address, import_id
                ));
                self.fail(Failure::from_error(Phase::Apply, Some(idx), &e));
                return false;
            }
            Err(e) => {
                self.fail(Failure::from_error(Phase::Apply, Some(idx), &e));
                return false;
            }
        };

        let mut mismatches = Vec::new();
        if import.verify {
            if let Some(applied) = &self.last_applied {
                mismatches = import_mismatches(applied, &imported, &import.verify_ignore);
            }
        }
        let verified = mismatches.is_empty();
        for mismatch in mismatches {
            tracing::warn!("Step {}: {}", idx, mismatch.message);
            self.fail(Failure::from_assertion(
                Phase::Verify,
                Some(idx),
                FailureKind::AssertionFailure,
                mismatch,
            ));
        }

        let object = match self.observe(step.expects_existence(), true).await {
            Ok(object) => object,
            Err(e) => {
                self.fail(Failure::from_error(Phase::Verify, Some(idx), &e));
                return false;
            }
        };
        self.last_observed = Some(object.clone());
        self.verify(idx, &step.checks, &object) && verified
    }

    /// Evaluates every check and records all failures
    fn verify(&mut self, idx: usize, checks: &[Assertion], object: &RemoteObject) -> bool {
        let failures: Vec<AssertionFailure> =
            checks.iter().flat_map(|check| check.evaluate(object)).collect();
        if failures.is_empty() {
            tracing::debug!("Step {}: {} check(s) passed", idx, checks.len());
            return true;
        }

        for failure in failures {
            tracing::warn!("Step {}: {} failed: {}", idx, failure.assertion, failure.message);
            self.fail(Failure::from_assertion(
                Phase::Verify,
                Some(idx),
                FailureKind::AssertionFailure,
                failure,
            ));
        }
        false
    }

    async fn teardown(&mut self) {
        let scenario = self.scenario;
        let cleanup_ctx = self.ctx.detached();
        let primary_failed = !self.failures.is_empty();
        tracing::info!("Destroying '{}'", scenario.logical_name);

        let destroy = self
            .runner
            .backend
            .destroy
            .destroy(cleanup_ctx.clone(), &scenario.logical_name);
        if let Err(e) = self.timed("destroy", destroy).await {
            tracing::error!("Destroy of '{}' failed: {}", scenario.logical_name, e);
            self.record_teardown(primary_failed, Failure::from_error(Phase::Destroy, None, &e));
        }

        let expect = scenario.destroy_check.expects_existence();
        match self.observe_with(&cleanup_ctx, expect, false).await {
            Ok(object) => {
                for failure in scenario.destroy_check.evaluate(&object) {
                    tracing::error!(
                        "'{}' still visible after destroy: {}",
                        scenario.logical_name,
                        failure.message
                    );
                    self.record_teardown(
                        primary_failed,
                        Failure::from_assertion(
                            Phase::DestroyVerify,
                            None,
                            FailureKind::DestroyVerificationFailure,
                            failure,
                        ),
                    );
                }
            }
            Err(e) => {
                self.record_teardown(
                    primary_failed,
                    Failure::from_error(Phase::DestroyVerify, None, &e),
                );
            }
        }
    }

    async fn observe(&self, expect: Option<bool>, cancellable: bool) -> Result<RemoteObject> {
        self.observe_with(&self.ctx, expect, cancellable).await
    }

    /// Fetches the remote view, re-fetching with backoff while it disagrees
    /// with `expect` and retries remain
    async fn observe_with(
        &self,
        ctx: &RunContext,
        expect: Option<bool>,
        cancellable: bool,
    ) -> Result<RemoteObject> {
        let config = &self.runner.config;
        let logical_name = &self.scenario.logical_name;
        let mut attempt = 0;

        loop {
            let fetch = self.fetcher.fetch(ctx, logical_name);
            let object = if cancellable {
                self.cancellable(fetch).await?
            } else {
                fetch.await?
            };

            match expect {
                Some(expected) if object.exists != expected && attempt < config.consistency_retries => {
                    attempt += 1;
                    let delay = config.backoff(attempt);
                    tracing::debug!(
                        "'{}' not converged (exists={}), re-fetching in {:?} (attempt {})",
                        logical_name,
                        object.exists,
                        delay,
                        attempt
                    );
                    if cancellable {
                        self.cancellable(async {
                            tokio::time::sleep(delay).await;
                            Ok(())
                        })
                        .await?;
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                }
                _ => return Ok(object),
            }
        }
    }

    /// Bounds a collaborator call by the operation timeout
    async fn timed<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.runner.config.operation_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result.map_err(|e| e.into_transport(operation)),
            Err(_) => Err(TfaccError::Timeout {
                operation: operation.to_string(),
                logical_name: self.scenario.logical_name.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Races `call` against cancellation of the run context
    async fn cancellable<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.ctx.cancelled() => Err(TfaccError::Cancelled),
            result = call => result,
        }
    }

    fn fail(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    fn record_teardown(&mut self, primary_failed: bool, failure: Failure) {
        if primary_failed {
            tracing::warn!("Cleanup problem after failure: {}", failure.message);
            self.warnings.push(failure);
        } else {
            self.failures.push(failure);
        }
    }
}

fn import_mismatches(
    applied: &RemoteObject,
    imported: &RemoteObject,
    ignore: &[String],
) -> Vec<AssertionFailure> {
    applied
        .diff(imported, ignore)
        .into_iter()
        .map(|diff| {
            let expected = render(diff.left.as_ref());
            let actual = render(diff.right.as_ref());
            AssertionFailure {
                assertion: IMPORT_VERIFY.to_string(),
                message: format!(
                    "imported attribute {} differs: expected {}, got {}",
                    diff.key, expected, actual
                ),
                expected,
                actual,
            }
        })
        .collect()
}

fn render(value: Option<&crate::types::Dynamic>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<absent>".to_string())
}
