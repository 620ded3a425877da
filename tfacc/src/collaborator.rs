//! Collaborator traits implemented by the system under test
//!
//! The engine never talks to a remote API itself. Applying configuration,
//! tearing it down, resolving import identities and reading remote state all
//! go through these traits. Implementations must be `Send + Sync` because a
//! single backend is shared by scenarios running concurrently.

use crate::context::RunContext;
use crate::error::Result;
use crate::types::Attributes;
use async_trait::async_trait;
use std::sync::Arc;

/// Submits desired-state configuration text
///
/// Applying the same text twice in a row MUST be a no-op.
#[async_trait]
pub trait ApplyCollaborator: Send + Sync {
    async fn apply(&self, ctx: RunContext, config: &str) -> Result<()>;
}

/// Tears down everything bound to a logical name
#[async_trait]
pub trait DestroyCollaborator: Send + Sync {
    async fn destroy(&self, ctx: RunContext, logical_name: &str) -> Result<()>;
}

/// Resolves and imports objects by their remote identity
#[async_trait]
pub trait IdentityImporter: Send + Sync {
    /// Returns the id a user would pass to `terraform import`
    async fn resolve_identity(&self, ctx: RunContext, logical_name: &str) -> Result<String>;

    /// Reads the object addressed by `import_id`; `None` if it does not exist
    async fn import(
        &self,
        ctx: RunContext,
        logical_name: &str,
        import_id: &str,
    ) -> Result<Option<Attributes>>;
}

/// Raw remote state lookup wrapped by the fetcher
#[async_trait]
pub trait RemoteStateAccessor: Send + Sync {
    /// `Ok(None)` means "not visible (yet)"; errors are transport failures
    async fn read(&self, ctx: RunContext, logical_name: &str) -> Result<Option<Attributes>>;
}

/// The full set of collaborators a step runner needs
#[derive(Clone)]
pub struct Backend {
    pub apply: Arc<dyn ApplyCollaborator>,
    pub destroy: Arc<dyn DestroyCollaborator>,
    pub importer: Arc<dyn IdentityImporter>,
    pub state: Arc<dyn RemoteStateAccessor>,
}

impl Backend {
    /// Uses one object for every collaborator role
    pub fn from_shared<T>(backend: Arc<T>) -> Self
    where
        T: ApplyCollaborator
            + DestroyCollaborator
            + IdentityImporter
            + RemoteStateAccessor
            + 'static,
    {
        Self {
            apply: backend.clone(),
            destroy: backend.clone(),
            importer: backend.clone(),
            state: backend,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
