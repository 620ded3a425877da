//! tfacc - acceptance-check engine for Terraform-style resources
//!
//! Applies desired-state configuration through pluggable collaborators,
//! verifies remote truth with named assertions, tears the resource down and
//! checks that nothing leaked.

// Core modules
pub mod context;
pub mod error;
pub mod result;
pub mod types;

// Building blocks
pub mod assertion;
pub mod collaborator;
pub mod config;
pub mod fetcher;
pub mod fixture;
pub mod scenario;
pub mod step;

// Execution
pub mod registry;
pub mod report;
pub mod runner;

// Re-exports for convenience
pub use assertion::{Assertion, AssertionFailure};
pub use collaborator::{
    ApplyCollaborator, Backend, DestroyCollaborator, IdentityImporter, RemoteStateAccessor,
};
pub use config::HarnessConfig;
pub use context::RunContext;
pub use error::{Result, TfaccError};
pub use fetcher::RemoteFetcher;
pub use fixture::FixtureStore;
pub use registry::ScenarioRegistry;
pub use report::Report;
pub use result::{Failure, FailureKind, Phase, ScenarioResult};
pub use runner::StepRunner;
pub use scenario::{PreCheck, Scenario};
pub use step::{ImportDirective, Step};
pub use types::{Attributes, Dynamic, RemoteObject};
