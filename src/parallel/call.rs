//! Parallel Call Module
//!
//! Keyed operations, the batch that groups them, and their settled outcomes.

use std::collections::HashSet;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{FetchError, Result};

// == Parallel Call ==
/// One keyed asynchronous operation.
pub struct ParallelCall<T> {
    key: String,
    operation: BoxFuture<'static, anyhow::Result<T>>,
}

impl<T> ParallelCall<T> {
    /// Pairs `key` with an operation that is already constructed.
    pub fn new<Fut>(key: impl Into<String>, operation: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            key: key.into(),
            operation: operation.boxed(),
        }
    }

    /// Pairs `key` with the operation returned by `factory`. The factory is
    /// called once, right here; the batch only awaits what it returned.
    pub fn from_factory<F, Fut>(key: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self::new(key, factory())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn into_parts(self) -> (String, BoxFuture<'static, anyhow::Result<T>>) {
        (self.key, self.operation)
    }
}

// == Parallel Batch ==
/// Ordered set of calls with unique keys.
pub struct ParallelBatch<T> {
    calls: Vec<ParallelCall<T>>,
    keys: HashSet<String>,
}

impl<T> Default for ParallelBatch<T> {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            keys: HashSet::new(),
        }
    }
}

impl<T> ParallelBatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a batch, failing on the first repeated key.
    pub fn from_calls(calls: impl IntoIterator<Item = ParallelCall<T>>) -> Result<Self> {
        let mut batch = Self::new();
        for call in calls {
            batch.push(call)?;
        }
        Ok(batch)
    }

    /// Appends `call`. A key already in the batch is rejected with
    /// [`FetchError::DuplicateKey`].
    pub fn push(&mut self, call: ParallelCall<T>) -> Result<()> {
        if !self.keys.insert(call.key.clone()) {
            return Err(FetchError::DuplicateKey(call.key));
        }
        self.calls.push(call);
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, call: ParallelCall<T>) -> Result<Self> {
        self.push(call)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().map(ParallelCall::key)
    }

    pub(crate) fn into_calls(self) -> Vec<ParallelCall<T>> {
        self.calls
    }
}

// == Outcomes ==
/// How one call settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallOutcome<T> {
    Success { value: T },
    Failure { error: String },
}

impl<T> CallOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            CallOutcome::Success { value } => Some(value),
            CallOutcome::Failure { .. } => None,
        }
    }
}

/// Successes and failures of a batch, split by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport<T> {
    pub results: IndexMap<String, T>,
    pub errors: IndexMap<String, String>,
    pub has_errors: bool,
}

impl<T> BatchReport<T> {
    pub fn from_outcomes(outcomes: IndexMap<String, CallOutcome<T>>) -> Self {
        let mut results = IndexMap::new();
        let mut errors = IndexMap::new();

        for (key, outcome) in outcomes {
            match outcome {
                CallOutcome::Success { value } => {
                    results.insert(key, value);
                }
                CallOutcome::Failure { error } => {
                    errors.insert(key, error);
                }
            }
        }

        let has_errors = !errors.is_empty();
        Self {
            results,
            errors,
            has_errors,
        }
    }
}
