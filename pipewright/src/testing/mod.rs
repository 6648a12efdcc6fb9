//! Testing utilities for pipewright.
//!
//! This module provides:
//! - Recording and failing deployers for services and phases
//! - An in-memory cloud wired into a [`CloudContext`](crate::orchestrator::CloudContext)

mod fixtures;
mod mocks;

pub use fixtures::{environment_orchestrator, in_memory_cloud, InMemoryCloud};
pub use mocks::{
    CallPhase, CallRecord, FailingServiceDeployer, RecordingPhaseDeployer, RecordingServiceDeployer,
};
