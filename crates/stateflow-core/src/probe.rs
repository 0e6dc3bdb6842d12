//! Capability interface implemented once per resource type
//!
//! The reconciliation core only ever talks to a resource type through a
//! [`StatusProbe`] (read one resource, report a [`PollResult`]) and a
//! [`Mutation`] (issue one side-effecting request). Request marshaling stays
//! in the [`Finder`] and mutation implementations.

use crate::classify::{ErrorClassifier, ErrorKind};
use crate::handle::ResourceHandle;
use crate::status::{PollResult, StatusSnapshot};
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;

/// Queries the control plane for one resource
///
/// Implementations perform exactly one remote query per call and never retry;
/// retrying is the poller's job. Absence is reported as
/// [`PollResult::NotFound`], never as an error.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn probe(&self, handle: &ResourceHandle) -> PollResult<Self::Error>;

    /// Classify an error returned by [`probe`](Self::probe) or by a mutation
    /// against the same resource type
    fn classify(&self, error: &Self::Error) -> ErrorKind;
}

/// Looks up one resource and derives its status label
#[async_trait]
pub trait Finder: Send + Sync {
    /// Raw resource representation
    type Resource: Serialize + Send + Sync;

    type Error: std::error::Error + Send + Sync + 'static;

    /// `Ok(None)` when the resource does not exist
    async fn lookup(&self, handle: &ResourceHandle)
    -> Result<Option<Self::Resource>, Self::Error>;

    /// Status label of a fetched resource
    fn status_of(&self, resource: &Self::Resource) -> String;
}

/// [`StatusProbe`] built from a [`Finder`] and an [`ErrorClassifier`]
pub struct FinderProbe<F, C> {
    finder: F,
    classifier: C,
}

impl<F, C> FinderProbe<F, C>
where
    F: Finder,
    C: ErrorClassifier<F::Error>,
{
    pub fn new(finder: F, classifier: C) -> Self {
        Self { finder, classifier }
    }

    pub fn finder(&self) -> &F {
        &self.finder
    }
}

#[async_trait]
impl<F, C> StatusProbe for FinderProbe<F, C>
where
    F: Finder,
    C: ErrorClassifier<F::Error>,
{
    type Error = F::Error;

    async fn probe(&self, handle: &ResourceHandle) -> PollResult<F::Error> {
        match self.finder.lookup(handle).await {
            Ok(Some(resource)) => {
                let status = self.finder.status_of(&resource);
                let attributes = serde_json::to_value(&resource).unwrap_or_else(|e| {
                    tracing::debug!("Could not serialize {} attributes: {}", handle, e);
                    serde_json::Value::Null
                });
                PollResult::Found(StatusSnapshot::new(status, attributes))
            }
            Ok(None) => PollResult::NotFound,
            Err(e) => PollResult::Error(e),
        }
    }

    fn classify(&self, error: &F::Error) -> ErrorKind {
        self.classifier.classify(error)
    }
}

/// Side-effecting request run before a reconciler phase waits
/// (create, update, disable, delete...)
#[async_trait]
pub trait Mutation: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn apply(&self, handle: &ResourceHandle) -> Result<(), Self::Error>;
}

/// [`Mutation`] backed by an async closure
pub struct MutationFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Mutation`]
///
/// The closure receives its own copy of the handle.
pub fn mutation_fn<F, Fut, E>(f: F) -> MutationFn<F>
where
    F: Fn(ResourceHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    MutationFn { f }
}

#[async_trait]
impl<F, Fut, E> Mutation for MutationFn<F>
where
    F: Fn(ResourceHandle) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    async fn apply(&self, handle: &ResourceHandle) -> Result<(), E> {
        (self.f)(handle.clone()).await
    }
}
