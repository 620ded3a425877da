//! The custom attribute acceptance scenarios

use crate::custom_attribute::{address, exists, has_name, has_type};
use crate::fixtures::{ALT_NAME, BASIC, LOGICAL_NAME, RENAMED, TYPE, VIRTUAL_MACHINE};
use tfacc::{PreCheck, Result, Scenario, ScenarioRegistry, Step};

pub const ENV_USER: &str = "VSPHERE_USER";
pub const ENV_PASSWORD: &str = "VSPHERE_PASSWORD";
pub const ENV_SERVER: &str = "VSPHERE_SERVER";

/// Credentials a run against a real vCenter needs
pub fn live_pre_check() -> PreCheck {
    PreCheck::require_env([ENV_USER, ENV_PASSWORD, ENV_SERVER])
}

/// Registers basic, with type, rename, change type and import, in that order
pub fn registry(pre_check: Option<PreCheck>) -> Result<ScenarioRegistry> {
    let scenario = |name: &str| {
        Scenario::builder(name, LOGICAL_NAME)
            .maybe_pre_check(pre_check.clone())
            .destroy_check(exists(false))
    };

    ScenarioRegistry::new()
        .with_scenario(
            scenario("basic")
                .step(Step::apply(BASIC).checks([
                    exists(true),
                    has_name(LOGICAL_NAME),
                    has_type(""),
                ]))
                .build(),
        )?
        .with_scenario(
            scenario("with type")
                .step(Step::apply(TYPE).checks([
                    exists(true),
                    has_name(LOGICAL_NAME),
                    has_type(VIRTUAL_MACHINE),
                ]))
                .build(),
        )?
        .with_scenario(
            scenario("rename")
                .step(Step::apply(BASIC).check(exists(true)))
                .step(Step::apply(ALT_NAME).checks([exists(true), has_name(RENAMED)]))
                .build(),
        )?
        .with_scenario(
            scenario("change type")
                .step(Step::apply(BASIC).checks([exists(true), has_type("")]))
                .step(Step::apply(TYPE).checks([exists(true), has_type(VIRTUAL_MACHINE)]))
                .build(),
        )?
        .with_scenario(
            scenario("import")
                .step(Step::apply(BASIC).check(exists(true)))
                .step(Step::import(BASIC, address(LOGICAL_NAME)).check(exists(true)))
                .build(),
        )
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_the_five_scenarios_in_order() {
        let registry = registry(None).unwrap();
        let names: Vec<&str> = registry.list_scenarios().collect();
        assert_eq!(
            names,
            vec!["basic", "with type", "rename", "change type", "import"]
        );
    }

    #[test]
    fn every_scenario_is_valid_and_checks_absence_after_destroy() {
        let registry = registry(Some(live_pre_check())).unwrap();
        for name in registry.list_scenarios() {
            let scenario = registry.get(name).unwrap();
            assert!(scenario.validate().is_ok(), "{}", name);
            assert_eq!(scenario.destroy_check, exists(false));
            assert!(scenario.pre_check.is_some());
        }
    }

    #[test]
    fn import_step_targets_the_resource_address() {
        let registry = registry(None).unwrap();
        let import = registry.get("import").unwrap();
        let directive = import.steps[1].import.as_ref().unwrap();
        assert_eq!(
            directive.resource_address,
            "vsphere_custom_attribute.terraform-test-attribute"
        );
        assert!(directive.verify);
    }
}
