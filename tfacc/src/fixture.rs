//! Named configuration fixtures

use crate::error::{Result, TfaccError};
use std::collections::BTreeMap;

/// Holds desired-state configuration templates by name
///
/// Built once at startup and then shared read-only between scenario runs.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    templates: BTreeMap<String, String>,
}

impl FixtureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.register(name, text);
        self
    }

    /// Registers a template, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        if self.templates.insert(name.clone(), text.into()).is_some() {
            tracing::warn!("Fixture '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<&str> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TfaccError::ConfigNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Fixture names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"
resource "vsphere_custom_attribute" "terraform-test-attribute" {
  name = "terraform-test-attribute"
}
"#;

    #[test]
    fn get_returns_registered_text() {
        let store = FixtureStore::new().with_fixture("basic", BASIC);

        assert_eq!(store.get("basic").unwrap(), BASIC);
        assert!(store.contains("basic"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn get_fails_for_undeclared_fixture() {
        let store = FixtureStore::new().with_fixture("basic", BASIC);

        match store.get("missing") {
            Err(TfaccError::ConfigNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("expected ConfigNotFound, got {other:?}"),
        }
    }

    #[test]
    fn re_registering_replaces_template() {
        let mut store = FixtureStore::new().with_fixture("basic", "old");
        store.register("basic", "new");

        assert_eq!(store.get("basic").unwrap(), "new");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn names_are_sorted() {
        let store = FixtureStore::new()
            .with_fixture("type", "b")
            .with_fixture("alt_name", "c")
            .with_fixture("basic", "a");

        let names: Vec<&str> = store.names().collect();
        assert_eq!(names, vec!["alt_name", "basic", "type"]);
    }
}
