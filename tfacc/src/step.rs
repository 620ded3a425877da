//! Scenario steps

use crate::assertion::Assertion;

/// Marks a step as import-and-verify instead of a fresh apply
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDirective {
    /// Resource address being imported, e.g. `vsphere_custom_attribute.example`
    pub resource_address: String,
    /// Compare the imported object against the last applied one
    pub verify: bool,
    /// Attribute keys skipped by the comparison
    pub verify_ignore: Vec<String>,
}

/// One configuration application plus its verification
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Fixture name resolved through the fixture store
    pub config: String,
    pub checks: Vec<Assertion>,
    pub import: Option<ImportDirective>,
}

impl Step {
    pub fn apply(config: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            checks: Vec::new(),
            import: None,
        }
    }

    /// Import step with verification enabled
    pub fn import(config: impl Into<String>, resource_address: impl Into<String>) -> Self {
        Self {
            config: config.into(),
            checks: Vec::new(),
            import: Some(ImportDirective {
                resource_address: resource_address.into(),
                verify: true,
                verify_ignore: Vec::new(),
            }),
        }
    }

    pub fn check(mut self, assertion: Assertion) -> Self {
        self.checks.push(assertion);
        self
    }

    pub fn checks(mut self, assertions: impl IntoIterator<Item = Assertion>) -> Self {
        self.checks.extend(assertions);
        self
    }

    /// Turns off import verification. No-op for apply steps.
    pub fn skip_verify(mut self) -> Self {
        if let Some(import) = self.import.as_mut() {
            import.verify = false;
        }
        self
    }

    /// No-op for apply steps
    pub fn verify_ignore(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let Some(import) = self.import.as_mut() {
            import.verify_ignore.extend(keys.into_iter().map(Into::into));
        }
        self
    }

    pub fn is_import(&self) -> bool {
        self.import.is_some()
    }

    /// Existence the step's checks rely on, if any
    pub fn expects_existence(&self) -> Option<bool> {
        self.checks.iter().find_map(Assertion::expects_existence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_step_verifies_by_default() {
        let step = Step::import("basic", "vsphere_custom_attribute.terraform-test-attribute")
            .verify_ignore(["id"]);

        let import = step.import.as_ref().unwrap();
        assert!(step.is_import());
        assert!(import.verify);
        assert_eq!(import.verify_ignore, vec!["id".to_string()]);

        let step = step.skip_verify();
        assert!(!step.import.unwrap().verify);
    }

    #[test]
    fn apply_step_ignores_import_options() {
        let step = Step::apply("basic").skip_verify().verify_ignore(["id"]);
        assert!(!step.is_import());
        assert_eq!(step.import, None);
    }

    #[test]
    fn step_collects_checks_in_order() {
        let step = Step::apply("basic")
            .check(Assertion::exists(true))
            .checks([Assertion::field_equals("name", "a")]);

        assert_eq!(step.checks.len(), 2);
        assert_eq!(step.checks[0].name(), "exists");
        assert_eq!(step.expects_existence(), Some(true));
        assert_eq!(Step::apply("basic").expects_existence(), None);
    }
}
