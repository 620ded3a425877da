//! Assertion library
//!
//! Assertions are plain data interpreted by [`Assertion::evaluate`]. Expected
//! values are captured when the assertion is built, never at evaluation time.
//!
//! Composition aggregates: every child of a [`Assertion::Compose`] is
//! evaluated and all failures are returned in declaration order.

use crate::types::{Dynamic, RemoteObject};

const ABSENT: &str = "<absent>";

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    /// The object exists (`true`) or is missing (`false`)
    Exists(bool),
    /// The named attribute equals the expected value exactly
    FieldEquals { field: String, expected: Dynamic },
    /// Logical AND of all children
    Compose(Vec<Assertion>),
}

/// Why an assertion did not hold
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionFailure {
    pub assertion: String,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl Assertion {
    pub fn exists(expected: bool) -> Self {
        Assertion::Exists(expected)
    }

    pub fn field_equals(field: impl Into<String>, expected: impl Into<Dynamic>) -> Self {
        Assertion::FieldEquals {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn compose(checks: impl IntoIterator<Item = Assertion>) -> Self {
        Assertion::Compose(checks.into_iter().collect())
    }

    /// Stable name used in reports
    pub fn name(&self) -> String {
        match self {
            Assertion::Exists(_) => "exists".to_string(),
            Assertion::FieldEquals { field, .. } => format!("field_equals({})", field),
            Assertion::Compose(_) => "compose".to_string(),
        }
    }

    /// Whether the assertion needs the object present (`Some(true)`) or
    /// absent (`Some(false)`) to have a chance of passing
    pub fn expects_existence(&self) -> Option<bool> {
        match self {
            Assertion::Exists(expected) => Some(*expected),
            Assertion::FieldEquals { .. } => Some(true),
            Assertion::Compose(checks) => checks.iter().find_map(Assertion::expects_existence),
        }
    }

    /// Runs the assertion; an empty result means it passed
    pub fn evaluate(&self, object: &RemoteObject) -> Vec<AssertionFailure> {
        let mut failures = Vec::new();
        self.evaluate_into(object, &mut failures);
        failures
    }

    fn evaluate_into(&self, object: &RemoteObject, failures: &mut Vec<AssertionFailure>) {
        match self {
            Assertion::Exists(expected) => {
                if object.exists == *expected {
                    return;
                }
                let message = if *expected {
                    format!("expected {} to exist", object.logical_name)
                } else {
                    format!("expected {} to be missing", object.logical_name)
                };
                failures.push(AssertionFailure {
                    assertion: self.name(),
                    expected: presence(*expected).to_string(),
                    actual: presence(object.exists).to_string(),
                    message,
                });
            }
            Assertion::FieldEquals { field, expected } => {
                let actual = if object.exists {
                    object.get(field)
                } else {
                    None
                };
                if actual == Some(expected) {
                    return;
                }
                let actual = actual
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| ABSENT.to_string());
                failures.push(AssertionFailure {
                    assertion: self.name(),
                    expected: expected.to_string(),
                    message: format!("expected {} to be {}, got {}", field, expected, actual),
                    actual,
                });
            }
            Assertion::Compose(checks) => {
                for check in checks {
                    check.evaluate_into(object, failures);
                }
            }
        }
    }
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "absent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Attributes;

    fn attribute(name: &str, object_type: &str) -> RemoteObject {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Dynamic::from(name));
        attrs.insert("managed_object_type".to_string(), Dynamic::from(object_type));
        RemoteObject::present("terraform-test-attribute", attrs)
    }

    #[test]
    fn exists_passes_and_fails() {
        let present = attribute("terraform-test-attribute", "");
        let absent = RemoteObject::absent("terraform-test-attribute");

        assert!(Assertion::exists(true).evaluate(&present).is_empty());
        assert!(Assertion::exists(false).evaluate(&absent).is_empty());

        let failures = Assertion::exists(false).evaluate(&present);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].assertion, "exists");
        assert_eq!(failures[0].expected, "absent");
        assert_eq!(failures[0].actual, "present");
        assert_eq!(
            failures[0].message,
            "expected terraform-test-attribute to be missing"
        );
    }

    #[test]
    fn field_equals_reports_expected_and_actual() {
        let object = attribute("terraform-test-attribute", "");

        let failures =
            Assertion::field_equals("name", "terraform-test-attribute-renamed").evaluate(&object);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].assertion, "field_equals(name)");
        assert_eq!(failures[0].expected, "\"terraform-test-attribute-renamed\"");
        assert_eq!(failures[0].actual, "\"terraform-test-attribute\"");
        assert_eq!(
            failures[0].message,
            "expected name to be \"terraform-test-attribute-renamed\", got \"terraform-test-attribute\""
        );
    }

    #[test]
    fn empty_string_is_not_the_same_as_missing_field() {
        let object = attribute("terraform-test-attribute", "");
        assert!(Assertion::field_equals("managed_object_type", "")
            .evaluate(&object)
            .is_empty());

        let failures = Assertion::field_equals("comment", "").evaluate(&object);
        assert_eq!(failures[0].actual, "<absent>");
    }

    #[test]
    fn field_check_on_absent_object_fails() {
        let failures = Assertion::field_equals("name", "x")
            .evaluate(&RemoteObject::absent("terraform-test-attribute"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].actual, "<absent>");
    }

    #[test]
    fn compose_aggregates_all_failures_in_order() {
        let object = attribute("wrong-name", "Folder");
        let check = Assertion::compose([
            Assertion::exists(true),
            Assertion::field_equals("name", "terraform-test-attribute"),
            Assertion::field_equals("managed_object_type", "VirtualMachine"),
        ]);

        let failures = check.evaluate(&object);
        let names: Vec<&str> = failures.iter().map(|f| f.assertion.as_str()).collect();
        assert_eq!(
            names,
            vec!["field_equals(name)", "field_equals(managed_object_type)"]
        );
    }

    #[test]
    fn expects_existence_follows_first_decisive_child() {
        assert_eq!(Assertion::exists(false).expects_existence(), Some(false));
        assert_eq!(
            Assertion::field_equals("name", "x").expects_existence(),
            Some(true)
        );
        assert_eq!(Assertion::compose([]).expects_existence(), None);
        assert_eq!(
            Assertion::compose([Assertion::exists(false), Assertion::exists(true)])
                .expects_existence(),
            Some(false)
        );
    }
}
