//! In-memory vCenter custom fields manager
//!
//! Implements every collaborator the step runner needs so the scenarios can
//! run without a vCenter. Apply is declarative: each `vsphere_custom_attribute`
//! block in the configuration is created, renamed in place, or replaced when
//! its `managed_object_type` changes (the type cannot be edited on a live
//! field). Keys are assigned by the simulator and never reused.
//!
//! Faults for exercising the runner:
//! - `with_latency` delays every call.
//! - `with_materialization_lag(n)` hides a newly created field from the next
//!   `n` reads.
//! - `fail_next(op, message)` makes the next call of `op` fail once.

mod config_reader;
mod error;

pub use config_reader::{ConfigReader, ResourceBlock};
pub use error::SimulatorError;

use crate::custom_attribute::{address, CustomAttribute, RESOURCE_TYPE};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tfacc::{
    ApplyCollaborator, Attributes, DestroyCollaborator, IdentityImporter, RemoteStateAccessor,
    Result, RunContext, TfaccError,
};
use tokio::sync::RwLock;

const FIRST_KEY: i32 = 101;

/// Collaborator call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Apply,
    Destroy,
    ResolveIdentity,
    Import,
    Read,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Apply => "apply",
            Operation::Destroy => "destroy",
            Operation::ResolveIdentity => "resolve_identity",
            Operation::Import => "import",
            Operation::Read => "read",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
struct FieldsState {
    fields: BTreeMap<i32, CustomAttribute>,
    /// Configuration label -> key of the field it manages
    bindings: BTreeMap<String, i32>,
    /// Label -> reads that still miss a freshly created field
    pending: HashMap<String, u32>,
    failures: HashMap<Operation, String>,
    next_key: i32,
}

impl Default for FieldsState {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            bindings: BTreeMap::new(),
            pending: HashMap::new(),
            failures: HashMap::new(),
            next_key: FIRST_KEY,
        }
    }
}

impl FieldsState {
    fn bound(&self, label: &str) -> Option<&CustomAttribute> {
        self.bindings.get(label).and_then(|key| self.fields.get(key))
    }

    fn by_name(&self, name: &str) -> Option<&CustomAttribute> {
        self.fields.values().find(|field| field.name == name)
    }

    fn check_name_free(&self, name: &str, except: Option<i32>) -> std::result::Result<(), SimulatorError> {
        match self.by_name(name) {
            Some(field) if Some(field.key) != except => {
                Err(SimulatorError::DuplicateName(name.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn create(&mut self, label: &str, name: &str, object_type: Option<String>, lag: u32) -> i32 {
        let key = self.next_key;
        self.next_key += 1;
        self.fields
            .insert(key, CustomAttribute::new(key, name, object_type));
        self.bindings.insert(label.to_string(), key);
        if lag > 0 {
            self.pending.insert(label.to_string(), lag);
        }
        key
    }

    fn remove(&mut self, label: &str) -> Option<CustomAttribute> {
        self.pending.remove(label);
        let key = self.bindings.remove(label)?;
        self.fields.remove(&key)
    }

    /// Reconciles one block against the current fields
    fn reconcile(&mut self, block: &ResourceBlock, lag: u32) -> std::result::Result<(), SimulatorError> {
        let label = block.label.as_str();
        let name = block
            .argument("name")
            .ok_or_else(|| SimulatorError::MissingArgument {
                address: address(label),
                argument: "name".to_string(),
            })?;
        let object_type = block
            .argument("managed_object_type")
            .filter(|t| !t.is_empty())
            .map(String::from);

        let Some(existing) = self.bound(label).cloned() else {
            self.check_name_free(name, None)?;
            let key = self.create(label, name, object_type, lag);
            tracing::debug!("Created custom field {} ({}) for {}", key, name, address(label));
            return Ok(());
        };

        if existing.managed_object_type != object_type {
            self.check_name_free(name, Some(existing.key))?;
            self.remove(label);
            let key = self.create(label, name, object_type, lag);
            tracing::debug!(
                "Replaced custom field {} with {} after type change",
                existing.key,
                key
            );
        } else if existing.name != name {
            self.check_name_free(name, Some(existing.key))?;
            if let Some(field) = self.fields.get_mut(&existing.key) {
                field.name = name.to_string();
            }
            tracing::debug!(
                "Renamed custom field {} from {} to {}",
                existing.key,
                existing.name,
                name
            );
        }
        Ok(())
    }

    /// Brings the fields in line with `blocks`, all or nothing
    fn apply(&mut self, blocks: &[ResourceBlock], lag: u32) -> std::result::Result<(), SimulatorError> {
        let mut next = self.clone();
        for block in blocks {
            next.reconcile(block, lag)?;
        }

        let declared: BTreeSet<&str> = blocks.iter().map(|b| b.label.as_str()).collect();
        let stale: Vec<String> = next
            .bindings
            .keys()
            .filter(|label| !declared.contains(label.as_str()))
            .cloned()
            .collect();
        for label in stale {
            if let Some(field) = next.remove(&label) {
                tracing::debug!(
                    "Removed custom field {} ({}), {} is no longer declared",
                    field.key,
                    field.name,
                    address(&label)
                );
            }
        }

        *self = next;
        Ok(())
    }
}

/// Shared handle to one simulated custom fields manager
#[derive(Clone, Default)]
pub struct CustomFieldsSimulator {
    inner: Arc<SimulatorInner>,
}

#[derive(Default)]
struct SimulatorInner {
    state: RwLock<FieldsState>,
    latency: Duration,
    materialization_lag: u32,
}

impl CustomFieldsSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(latency: Duration, materialization_lag: u32) -> Self {
        Self {
            inner: Arc::new(SimulatorInner {
                state: RwLock::new(FieldsState::default()),
                latency,
                materialization_lag,
            }),
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self::with_options(latency, 0)
    }

    pub fn with_materialization_lag(reads: u32) -> Self {
        Self::with_options(Duration::ZERO, reads)
    }

    /// Makes the next call of `operation` fail with `message`
    pub async fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        let mut state = self.inner.state.write().await;
        state.failures.insert(operation, message.into());
    }

    /// All fields, ordered by key
    pub async fn fields(&self) -> Vec<CustomAttribute> {
        self.inner.state.read().await.fields.values().cloned().collect()
    }

    pub async fn field_named(&self, name: &str) -> Option<CustomAttribute> {
        self.inner.state.read().await.by_name(name).cloned()
    }

    /// Field currently managed under `label`, ignoring materialization lag
    pub async fn bound_field(&self, label: &str) -> Option<CustomAttribute> {
        self.inner.state.read().await.bound(label).cloned()
    }

    async fn enter(&self, operation: Operation, ctx: &RunContext) -> std::result::Result<(), SimulatorError> {
        tracing::debug!("{} requested by '{}'", operation, ctx.label());
        if !self.inner.latency.is_zero() {
            tokio::time::sleep(self.inner.latency).await;
        }
        let mut state = self.inner.state.write().await;
        match state.failures.remove(&operation) {
            Some(message) => Err(SimulatorError::Injected { operation, message }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ApplyCollaborator for CustomFieldsSimulator {
    async fn apply(&self, ctx: RunContext, config: &str) -> Result<()> {
        self.enter(Operation::Apply, &ctx).await?;

        let blocks = ConfigReader::shared()?.parse(config)?;
        if let Some(block) = blocks.iter().find(|b| b.resource_type != RESOURCE_TYPE) {
            return Err(SimulatorError::UnsupportedResource(block.resource_type.clone()).into());
        }

        let mut state = self.inner.state.write().await;
        state.apply(&blocks, self.inner.materialization_lag)?;
        Ok(())
    }
}

#[async_trait]
impl DestroyCollaborator for CustomFieldsSimulator {
    async fn destroy(&self, ctx: RunContext, logical_name: &str) -> Result<()> {
        self.enter(Operation::Destroy, &ctx).await?;

        let mut state = self.inner.state.write().await;
        match state.remove(logical_name) {
            Some(field) => tracing::debug!("Removed custom field {} ({})", field.key, field.name),
            None => tracing::debug!("Nothing to destroy for {}", address(logical_name)),
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityImporter for CustomFieldsSimulator {
    /// Custom attributes are imported by name
    async fn resolve_identity(&self, ctx: RunContext, logical_name: &str) -> Result<String> {
        self.enter(Operation::ResolveIdentity, &ctx).await?;

        let state = self.inner.state.read().await;
        state
            .bound(logical_name)
            .map(|field| field.name.clone())
            .ok_or_else(|| TfaccError::ImportFailed("custom attribute does not exist".to_string()))
    }

    async fn import(
        &self,
        ctx: RunContext,
        logical_name: &str,
        import_id: &str,
    ) -> Result<Option<Attributes>> {
        self.enter(Operation::Import, &ctx).await?;

        let mut state = self.inner.state.write().await;
        let Some(field) = state.by_name(import_id).cloned() else {
            return Ok(None);
        };
        state.bindings.insert(logical_name.to_string(), field.key);
        Ok(Some(field.to_attributes()))
    }
}

#[async_trait]
impl RemoteStateAccessor for CustomFieldsSimulator {
    async fn read(&self, ctx: RunContext, logical_name: &str) -> Result<Option<Attributes>> {
        self.enter(Operation::Read, &ctx).await?;

        let mut state = self.inner.state.write().await;
        if let Some(remaining) = state.pending.get_mut(logical_name) {
            *remaining -= 1;
            if *remaining == 0 {
                state.pending.remove(logical_name);
            }
            return Ok(None);
        }
        Ok(state.bound(logical_name).map(CustomAttribute::to_attributes))
    }
}
