//! vSphere custom attribute resource model
//!
//! A custom attribute is a field definition held by the vCenter custom fields
//! manager: an integer key assigned by the server, a unique name, and an
//! optional managed object type restricting which inventory objects can
//! carry it. An empty type means "any object".

use tfacc::{Assertion, Attributes, Dynamic};

pub const RESOURCE_TYPE: &str = "vsphere_custom_attribute";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttribute {
    pub key: i32,
    pub name: String,
    pub managed_object_type: Option<String>,
}

impl CustomAttribute {
    pub fn new(key: i32, name: impl Into<String>, managed_object_type: Option<String>) -> Self {
        Self {
            key,
            name: name.into(),
            managed_object_type: managed_object_type.filter(|t| !t.is_empty()),
        }
    }

    /// Type as the resource reports it; unset reads back as ""
    pub fn object_type(&self) -> &str {
        self.managed_object_type.as_deref().unwrap_or("")
    }

    /// Flattened attribute view used by fetches and imports
    pub fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), Dynamic::String(self.key.to_string()));
        attrs.insert("name".to_string(), Dynamic::String(self.name.clone()));
        attrs.insert(
            "managed_object_type".to_string(),
            Dynamic::String(self.object_type().to_string()),
        );
        attrs
    }
}

/// `vsphere_custom_attribute.<label>`
pub fn address(label: &str) -> String {
    format!("{}.{}", RESOURCE_TYPE, label)
}

pub fn exists(expected: bool) -> Assertion {
    Assertion::exists(expected)
}

pub fn has_name(expected: &str) -> Assertion {
    Assertion::field_equals("name", expected)
}

pub fn has_type(expected: &str) -> Assertion {
    Assertion::field_equals("managed_object_type", expected)
}
