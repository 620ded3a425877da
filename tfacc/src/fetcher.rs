//! Remote fetcher: bounded reads of remote truth

use crate::collaborator::RemoteStateAccessor;
use crate::context::RunContext;
use crate::error::{Result, TfaccError};
use crate::types::RemoteObject;
use std::sync::Arc;
use std::time::Duration;

/// Wraps a [`RemoteStateAccessor`] with a per-fetch timeout
///
/// An object that is not visible yet comes back as `exists == false`. Only
/// transport problems, including the timeout, are errors. No retries happen
/// here; the step runner owns the retry policy.
#[derive(Clone)]
pub struct RemoteFetcher {
    accessor: Arc<dyn RemoteStateAccessor>,
    timeout: Duration,
}

impl RemoteFetcher {
    pub fn new(accessor: Arc<dyn RemoteStateAccessor>, timeout: Duration) -> Self {
        Self { accessor, timeout }
    }

    pub async fn fetch(&self, ctx: &RunContext, logical_name: &str) -> Result<RemoteObject> {
        tracing::debug!("Fetching remote state for '{}'", logical_name);

        let read = self.accessor.read(ctx.clone(), logical_name);
        match tokio::time::timeout(self.timeout, read).await {
            Err(_) => {
                tracing::error!(
                    "Fetch of '{}' timed out after {:?}",
                    logical_name,
                    self.timeout
                );
                Err(TfaccError::Timeout {
                    operation: "fetch".to_string(),
                    logical_name: logical_name.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
            Ok(Err(e)) => {
                tracing::error!("Fetch of '{}' failed: {}", logical_name, e);
                Err(e.into_transport("fetch"))
            }
            Ok(Ok(Some(attributes))) => {
                tracing::debug!(
                    "'{}' is present with {} attributes",
                    logical_name,
                    attributes.len()
                );
                Ok(RemoteObject::present(logical_name, attributes))
            }
            Ok(Ok(None)) => {
                tracing::debug!("'{}' is not visible", logical_name);
                Ok(RemoteObject::absent(logical_name))
            }
        }
    }
}
