//! Run context for scenario executions
//!
//! Every scenario run receives its own [`RunContext`]. It carries the run id
//! used in logs and reports, an optional deadline, and a cancellation signal.
//! Child contexts observe cancellation of all of their ancestors, so a batch
//! context can abort every scenario started from it.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;
use uuid::Uuid;

/// Context passed as the first argument to every collaborator call
#[derive(Clone)]
pub struct RunContext {
    inner: Arc<ContextInner>,
    ancestors: Vec<Arc<ContextInner>>,
}

struct ContextInner {
    run_id: Uuid,
    label: String,
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl ContextInner {
    fn new(run_id: Uuid, label: String, deadline: Option<Instant>) -> Arc<Self> {
        let (done_tx, done) = watch::channel(false);
        Arc::new(Self {
            run_id,
            label,
            deadline,
            done,
            done_tx,
        })
    }
}

impl RunContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: ContextInner::new(Uuid::new_v4(), label.into(), None),
            ancestors: Vec::new(),
        }
    }

    /// Derives a context with its own run id that is cancelled together with `self`
    pub fn child(&self, label: impl Into<String>) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.inner.clone());
        Self {
            inner: ContextInner::new(Uuid::new_v4(), label.into(), self.inner.deadline),
            ancestors,
        }
    }

    /// Same run id and label, but without the cancellation lineage. Teardown
    /// runs under a detached context so cleanup still reaches the remote side
    /// after an abort.
    pub fn detached(&self) -> Self {
        Self {
            inner: ContextInner::new(self.inner.run_id, self.inner.label.clone(), None),
            ancestors: Vec::new(),
        }
    }

    /// Cancels the context once `timeout` has elapsed. Must be called inside a
    /// tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let inner = ContextInner::new(self.inner.run_id, self.inner.label.clone(), Some(deadline));

        let done_tx = inner.done_tx.clone();
        tokio::spawn(async move {
            time::sleep_until(deadline.into()).await;
            let _ = done_tx.send(true);
        });

        let mut ancestors = self.ancestors;
        ancestors.push(self.inner);
        Self { inner, ancestors }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.lineage().any(|inner| *inner.done.borrow())
    }

    /// Resolves once this context or any ancestor is cancelled
    pub async fn cancelled(&self) {
        let waits = self.lineage().map(|inner| {
            let mut done = inner.done.clone();
            Box::pin(async move {
                let closed = done.wait_for(|cancelled| *cancelled).await.map(|_| ()).is_err();
                if closed {
                    std::future::pending::<()>().await;
                }
            })
        });
        futures::future::select_all(waits).await;
    }

    fn lineage(&self) -> impl Iterator<Item = &Arc<ContextInner>> {
        std::iter::once(&self.inner).chain(self.ancestors.iter())
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.inner.run_id)
            .field("label", &self.inner.label)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
