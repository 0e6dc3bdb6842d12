//! Stateflow reconciliation core
//!
//! Drives remote resources whose control plane converges asynchronously:
//! poll a resource until it reaches a desired state, absorb transient errors,
//! tell "not visible yet" apart from "gone", and run multi-phase transitions
//! such as disable-then-delete, all under a caller-specified timeout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │          lifecycle handler (caller)              │
//! │      wait_for(handle, spec) / reconcile(...)     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stateflow-core                     │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │  Reconciler  │─▶│ StateRefresher (poller)  │ │
//! │  │   (phases)   │  │  WaitSpec + Backoff      │ │
//! │  └──────┬───────┘  └────────────┬─────────────┘ │
//! │         │                       │               │
//! │  ┌──────▼───────┐  ┌────────────▼─────────────┐ │
//! │  │   Mutation   │  │ StatusProbe + classifier │ │
//! │  └──────────────┘  └──────────────────────────┘ │
//! └─────────┬───────────────────────┬───────────────┘
//!           │                       │
//! ┌─────────▼───────────────────────▼───────────────┐
//! │   per-resource-type finders and request code     │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stateflow_core::{wait_for, NotFoundPolicy, ResourceHandle, WaitSpec};
//! use std::time::Duration;
//!
//! let handle = ResourceHandle::new("server", "113200001");
//! let spec = WaitSpec::new(["up"])
//!     .with_pending(["migrating", "cleaning"])
//!     .with_not_found(NotFoundPolicy::ContinuePolling)
//!     .with_timeout(Duration::from_secs(600));
//!
//! let snapshot = wait_for(&probe, &handle, &spec).await?;
//! ```

pub mod backoff;
pub mod classify;
pub mod error;
pub mod handle;
pub mod poller;
pub mod probe;
pub mod reconciler;
pub mod status;
pub mod timeouts;
pub mod wait_spec;

// Re-exports
pub use backoff::Backoff;
pub use classify::{ErrorClassifier, ErrorKind, MessageRules};
pub use error::{BoxError, Result, WaitError};
pub use handle::ResourceHandle;
pub use poller::{Observation, StateRefresher, wait_for, wait_for_with_cancel};
pub use probe::{Finder, FinderProbe, Mutation, MutationFn, StatusProbe, mutation_fn};
pub use reconciler::{Phase, PhaseOutcome, PhaseRecord, ReconcileReport, Reconciler, reconcile};
pub use status::{ABSENT_STATUS, PollResult, StatusSnapshot};
pub use timeouts::{Operation, Timeouts};
pub use tokio_util::sync::CancellationToken;
pub use wait_spec::{NotFoundPolicy, StatusClass, WaitSpec};
