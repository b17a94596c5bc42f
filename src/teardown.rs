//! LIFO registry of cleanup actions.
//!
//! Every resource created while building the benchmark environment pushes
//! the action that undoes it. Disposing the stack runs those actions newest
//! first, so resources are released in reverse order of construction.

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::{BenchError, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Thunk = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// A deferred reversal step. Consumed when invoked, so it can only run once.
pub struct TeardownAction {
    description: String,
    thunk: Thunk,
}

impl TeardownAction {
    pub fn new<F, Fut>(description: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        TeardownAction {
            description: description.into(),
            thunk: Box::new(move || -> BoxFuture<'static, Result<()>> { Box::pin(action()) }),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub async fn invoke(self) -> Result<()> {
        (self.thunk)().await
    }
}

impl std::fmt::Debug for TeardownAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownAction")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct TeardownStack {
    actions: Vec<TeardownAction>,
}

impl TeardownStack {
    pub fn new() -> Self {
        TeardownStack { actions: Vec::new() }
    }

    /// Registers an action. `None` is ignored.
    pub fn push(&mut self, action: impl Into<Option<TeardownAction>>) {
        if let Some(action) = action.into() {
            debug!(action = action.description(), "registered teardown action");
            self.actions.push(action);
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Pops and invokes every action, most recent first.
    ///
    /// A failing action does not stop the unwinding: the remaining actions
    /// still run and all failures come back together as
    /// [`BenchError::Teardown`].
    pub async fn dispose_all(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        while let Some(action) = self.actions.pop() {
            let description = action.description.clone();
            if let Err(error) = action.invoke().await {
                warn!(action = %description, %error, "teardown action failed");
                failures.push(error);
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BenchError::Teardown(failures))
        }
    }
}

impl Drop for TeardownStack {
    fn drop(&mut self) {
        if !self.actions.is_empty() {
            warn!(
                pending = self.actions.len(),
                "teardown stack dropped before disposal, resources may leak"
            );
        }
    }
}
