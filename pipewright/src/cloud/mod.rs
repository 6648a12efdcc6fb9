//! Cloud resources and the convergent reconciliation discipline.
//!
//! Every managed resource goes through a [`ResourceReconciler`], which wraps a
//! per-kind [`CloudAdapter`]. Concrete provider SDK clients are expected to
//! implement [`CloudAdapter`]; [`InMemoryCloudAdapter`] and
//! [`LocalStateCloudAdapter`] ship with the crate.

mod adapter;
mod error;
mod local;
mod memory;
mod reconciler;
mod resource;

pub use adapter::CloudAdapter;
pub use error::CloudError;
pub use local::{LocalState, LocalStateCloudAdapter, LocalStateStore};
pub use memory::{AdapterOperation, CallCounts, InMemoryCloudAdapter};
pub use reconciler::{ensure_service_role, service_policy_arn, CloudAdapters, ResourceReconciler};
pub use resource::{DeleteOutcome, Resource, ResourceKind, ResourceSpec};
