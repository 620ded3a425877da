//! Configuration fixtures for the custom attribute scenarios

use tfacc::FixtureStore;

/// Label and initial name shared by every scenario
pub const LOGICAL_NAME: &str = "terraform-test-attribute";
pub const RENAMED: &str = "terraform-test-attribute-renamed";
pub const VIRTUAL_MACHINE: &str = "VirtualMachine";

pub const BASIC: &str = "basic";
pub const TYPE: &str = "type";
pub const ALT_NAME: &str = "alt_name";

pub const CONFIG_BASIC: &str = r#"
resource "vsphere_custom_attribute" "terraform-test-attribute" {
  name = "terraform-test-attribute"
}
"#;

pub const CONFIG_TYPE: &str = r#"
resource "vsphere_custom_attribute" "terraform-test-attribute" {
  name                = "terraform-test-attribute"
  managed_object_type = "VirtualMachine"
}
"#;

pub const CONFIG_ALT_NAME: &str = r#"
resource "vsphere_custom_attribute" "terraform-test-attribute" {
  name = "terraform-test-attribute-renamed"
}
"#;

pub fn store() -> FixtureStore {
    FixtureStore::new()
        .with_fixture(BASIC, CONFIG_BASIC)
        .with_fixture(TYPE, CONFIG_TYPE)
        .with_fixture(ALT_NAME, CONFIG_ALT_NAME)
}
