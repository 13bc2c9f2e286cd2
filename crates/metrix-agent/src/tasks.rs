//! Task group with shared cancellation.
//!
//! Every task runs until the group token is cancelled. The first task to fail
//! (or panic) cancels the token for the others; [`TaskGroup::wait`] drains
//! them all and returns that first failure.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use metrix_core::error::{MetrixError, Result};

pub struct TaskGroup {
    tasks: JoinSet<Result<()>>,
    token: CancellationToken,
}

impl TaskGroup {
    /// Group scoped under `parent`: cancelling the parent stops the group,
    /// a failing task only cancels the group.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token: parent.child_token(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(async move {
            task.await
                .map_err(|e| MetrixError::AgentTask(format!("{name}: {e}")))
        });
    }

    pub async fn wait(mut self) -> Result<()> {
        let mut first: Option<MetrixError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined
                .unwrap_or_else(|e| Err(MetrixError::AgentTask(format!("task aborted: {e}"))));

            if let Err(e) = outcome {
                if first.is_none() {
                    error!(err = %e, "task failed, cancelling group");
                    self.token.cancel();
                    first = Some(e);
                } else {
                    debug!(err = %e, "further task failure");
                }
            }
        }

        first.map_or(Ok(()), Err)
    }
}
