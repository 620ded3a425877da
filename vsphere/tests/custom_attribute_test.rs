//! Custom attribute scenarios against the simulated custom fields manager

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use serial_test::serial;
use std::time::Duration;
use tokio_test::assert_ok;
use tfacc::{FailureKind, HarnessConfig, Phase, Step, StepRunner};
use vsphere::custom_attribute::{exists, has_name, has_type};
use vsphere::fixtures::{ALT_NAME, BASIC, LOGICAL_NAME, RENAMED, TYPE, VIRTUAL_MACHINE};
use vsphere::scenarios::{self, ENV_PASSWORD, ENV_SERVER, ENV_USER};
use vsphere::{simulated_runner, CustomFieldsSimulator, Operation};

fn fast_config() -> HarnessConfig {
    HarnessConfig::default()
        .with_fetch_timeout(Duration::from_millis(500))
        .with_operation_timeout(Duration::from_secs(5))
        .with_backoff(1, 10)
}

fn runner(simulator: &CustomFieldsSimulator) -> StepRunner {
    simulated_runner(fast_config(), simulator.clone())
}

#[tokio::test]
async fn all_scenarios_pass_and_leave_nothing_behind() {
    let simulator = CustomFieldsSimulator::new();
    let registry = scenarios::registry(None).unwrap();

    let report = registry.run_all(&runner(&simulator)).await;

    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(report.passed_count(), 5);
    for result in &report.results {
        assert_eq!(result.steps_run, result.steps_total, "{}", result.name);
        assert!(result.warnings.is_empty(), "{}", result.name);
    }
    assert!(simulator.fields().await.is_empty());
}

#[tokio::test]
async fn rename_never_reports_the_old_name() {
    let simulator = CustomFieldsSimulator::new();
    let runner = runner(&simulator);
    let registry = scenarios::registry(None).unwrap();
    let rename = registry.get("rename").unwrap().clone();

    let renamed = tfacc::Scenario::builder("rename checked", LOGICAL_NAME)
        .step(rename.steps[0].clone())
        .step(rename.steps[1].clone().check(has_name(RENAMED)))
        .build();
    let result = runner.run_scenario(&renamed).await;
    assert!(result.passed, "{:?}", result.failures);

    let stale = tfacc::Scenario::builder("rename stale", LOGICAL_NAME)
        .step(Step::apply(BASIC))
        .step(Step::apply(ALT_NAME).check(has_name(LOGICAL_NAME)))
        .build();
    let result = runner.run_scenario(&stale).await;
    let failure = result.primary_failure().unwrap();
    assert_eq!(failure.step_index, Some(1));
    assert_eq!(
        failure.message,
        "expected name to be \"terraform-test-attribute\", got \"terraform-test-attribute-renamed\""
    );
    assert!(simulator.fields().await.is_empty());
}

#[tokio::test]
async fn rename_keeps_key_between_steps() {
    use tfacc::{ApplyCollaborator, RunContext};

    let simulator = CustomFieldsSimulator::new();
    let store = vsphere::fixtures::store();
    let ctx = RunContext::new("rename");

    assert_ok!(simulator.apply(ctx.clone(), store.get(BASIC).unwrap()).await);
    let before = simulator.bound_field(LOGICAL_NAME).await.unwrap();
    assert_ok!(simulator.apply(ctx, store.get(ALT_NAME).unwrap()).await);
    let after = simulator.bound_field(LOGICAL_NAME).await.unwrap();

    assert_eq!(before.key, after.key);
    assert_eq!(after.name, RENAMED);
    assert!(simulator.field_named(LOGICAL_NAME).await.is_none());
}

#[tokio::test]
async fn change_type_scenario_observes_the_latest_type() {
    let simulator = CustomFieldsSimulator::new();
    let registry = scenarios::registry(None).unwrap();
    let scenario = registry.get("change type").unwrap();

    let result = runner(&simulator).run_scenario(scenario).await;

    assert!(result.passed, "{:?}", result.failures);
    assert_eq!(result.steps_run, 2);
}

#[tokio::test]
async fn type_can_be_unset_again() {
    let simulator = CustomFieldsSimulator::new();
    let scenario = tfacc::Scenario::builder("unset type", LOGICAL_NAME)
        .step(Step::apply(TYPE).checks([exists(true), has_type(VIRTUAL_MACHINE)]))
        .step(Step::apply(BASIC).checks([exists(true), has_type("")]))
        .build();

    let result = runner(&simulator).run_scenario(&scenario).await;

    assert!(result.passed, "{:?}", result.failures);
    assert_eq!(result.steps_run, 2);
    let observed = result.last_observed.unwrap();
    assert_eq!(observed.get("managed_object_type"), Some(&tfacc::Dynamic::from("")));
    assert!(simulator.fields().await.is_empty());
}

#[tokio::test]
async fn wrong_type_expectation_reports_expected_and_actual() {
    let simulator = CustomFieldsSimulator::new();
    let scenario = tfacc::Scenario::builder("wrong type", LOGICAL_NAME)
        .step(Step::apply(BASIC).checks([exists(true), has_type("VirtualMachine")]))
        .build();

    let result = runner(&simulator).run_scenario(&scenario).await;

    assert_eq!(result.failures.len(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.kind, FailureKind::AssertionFailure);
    assert_eq!(failure.assertion.as_deref(), Some("field_equals(managed_object_type)"));
    assert_eq!(failure.expected.as_deref(), Some("\"VirtualMachine\""));
    assert_eq!(failure.actual.as_deref(), Some("\"\""));
    assert!(simulator.fields().await.is_empty());
}

#[tokio::test]
async fn import_scenario_round_trips_by_name() {
    let simulator = CustomFieldsSimulator::new();
    let registry = scenarios::registry(None).unwrap();

    let result = runner(&simulator)
        .run_scenario(registry.get("import").unwrap())
        .await;

    assert!(result.passed, "{:?}", result.failures);
    assert_eq!(result.steps_run, 2);
}

#[tokio::test]
async fn materialization_lag_is_absorbed_by_retries() {
    let simulator = CustomFieldsSimulator::with_materialization_lag(2);
    let registry = scenarios::registry(None).unwrap();

    let report = registry.run_all(&runner(&simulator)).await;
    assert!(report.passed(), "{}", report.render_text());
}

#[tokio::test]
async fn materialization_lag_beyond_retries_fails_existence() {
    let simulator = CustomFieldsSimulator::with_materialization_lag(5);
    let registry = scenarios::registry(None).unwrap();
    let runner = simulated_runner(fast_config().with_consistency_retries(1), simulator.clone());

    let result = runner.run_scenario(registry.get("basic").unwrap()).await;

    let failure = result.primary_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::AssertionFailure);
    assert_eq!(failure.message, "expected terraform-test-attribute to exist");
    assert!(simulator.fields().await.is_empty());
}

#[tokio::test]
async fn injected_apply_failure_is_a_transport_error() {
    let simulator = CustomFieldsSimulator::new();
    simulator
        .fail_next(Operation::Apply, "ServerFaultCode: NoPermission")
        .await;
    let registry = scenarios::registry(None).unwrap();

    let result = runner(&simulator)
        .run_scenario(registry.get("with type").unwrap())
        .await;

    let failure = result.primary_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::TransportError);
    assert_eq!(failure.phase, Phase::Apply);
    assert_eq!(
        failure.message,
        "Transport error during apply: apply failed: ServerFaultCode: NoPermission"
    );
}

#[tokio::test]
async fn injected_destroy_failure_fails_an_otherwise_passing_scenario() {
    let simulator = CustomFieldsSimulator::new();
    simulator
        .fail_next(Operation::Destroy, "session is not authenticated")
        .await;
    let registry = scenarios::registry(None).unwrap();
    let runner = simulated_runner(fast_config().with_consistency_retries(0), simulator.clone());

    let result = runner.run_scenario(registry.get("basic").unwrap()).await;

    let kinds: Vec<FailureKind> = result.failures.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FailureKind::TransportError,
            FailureKind::DestroyVerificationFailure
        ]
    );
    assert_eq!(simulator.fields().await.len(), 1, "the field leaked");
}

#[tokio::test]
async fn slow_simulator_trips_the_fetch_timeout() {
    let simulator = CustomFieldsSimulator::with_latency(Duration::from_millis(100));
    let registry = scenarios::registry(None).unwrap();
    let runner = simulated_runner(
        fast_config().with_fetch_timeout(Duration::from_millis(20)),
        simulator,
    );

    let result = runner.run_scenario(registry.get("basic").unwrap()).await;

    let failure = result.primary_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::TransportError);
    assert_eq!(failure.phase, Phase::Verify);
}

#[tokio::test]
#[serial]
async fn live_pre_check_blocks_every_scenario_without_credentials() {
    std::env::remove_var(ENV_USER);
    std::env::remove_var(ENV_PASSWORD);
    std::env::set_var(ENV_SERVER, "vcenter.example.com");

    let simulator = CustomFieldsSimulator::new();
    let registry = scenarios::registry(Some(scenarios::live_pre_check())).unwrap();
    let report = registry.run_all(&runner(&simulator)).await;

    assert_eq!(report.failed_count(), 5);
    for result in &report.results {
        let failure = result.primary_failure().unwrap();
        assert_eq!(failure.kind, FailureKind::PreCheckFailure);
        assert_eq!(
            failure.message,
            "Pre-check failed: VSPHERE_USER, VSPHERE_PASSWORD must be set for acceptance tests"
        );
    }
    assert!(simulator.fields().await.is_empty());

    std::env::remove_var(ENV_SERVER);
}

#[tokio::test]
#[serial]
async fn live_pre_check_passes_with_credentials() {
    std::env::set_var(ENV_USER, "administrator@vsphere.local");
    std::env::set_var(ENV_PASSWORD, "secret");
    std::env::set_var(ENV_SERVER, "vcenter.example.com");

    let simulator = CustomFieldsSimulator::new();
    let registry = scenarios::registry(Some(scenarios::live_pre_check())).unwrap();
    let report = registry.run_all(&runner(&simulator)).await;
    assert!(report.passed(), "{}", report.render_text());

    std::env::remove_var(ENV_USER);
    std::env::remove_var(ENV_PASSWORD);
    std::env::remove_var(ENV_SERVER);
}
