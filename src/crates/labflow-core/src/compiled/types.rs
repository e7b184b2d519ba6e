//! Type definitions for compiled graph execution

use crate::error::{GraphError, Result};
use crate::graph::NodeId;
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::Serialize;
use std::pin::Pin;
use uuid::Uuid;

/// Default upper bound on node invocations per run
pub const DEFAULT_STEP_CEILING: usize = 3000;

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of node invocations before the run is aborted
    pub step_ceiling: usize,
    /// Identifier attached to every snapshot; generated when absent
    pub run_id: Option<Uuid>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_ceiling: DEFAULT_STEP_CEILING,
            run_id: None,
        }
    }
}

impl RunConfig {
    /// Override the step ceiling
    pub fn with_step_ceiling(mut self, ceiling: usize) -> Self {
        self.step_ceiling = ceiling;
        self
    }

    /// Fix the run identifier
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

/// Full copy of the state after one node invocation
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot<S> {
    /// Run this snapshot belongs to
    pub run_id: Uuid,
    /// 1-based invocation count
    pub step: usize,
    /// Node that just completed
    pub node: NodeId,
    /// State after merging the node's updates
    pub state: S,
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
}

/// Stream of snapshots; ends after END or after the first error
pub type SnapshotStream<S> = Pin<Box<dyn Stream<Item = Result<StateSnapshot<S>>> + Send>>;

/// Outcome of a collected run
///
/// Snapshots emitted before a failure are kept so callers can inspect how far
/// the pipeline got.
#[derive(Debug)]
pub struct RunReport<S> {
    /// Identifier shared by every snapshot
    pub run_id: Uuid,
    /// Snapshots in execution order
    pub snapshots: Vec<StateSnapshot<S>>,
    /// Why the run stopped early, if it did
    pub error: Option<GraphError>,
}

impl<S> RunReport<S> {
    /// True when the run reached END
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// State after the last completed node
    pub fn final_state(&self) -> Option<&S> {
        self.snapshots.last().map(|snapshot| &snapshot.state)
    }

    /// Number of node invocations that completed
    pub fn steps(&self) -> usize {
        self.snapshots.len()
    }

    /// Names of the nodes that ran, in order
    pub fn path(&self) -> Vec<&str> {
        self.snapshots.iter().map(|s| s.node.as_str()).collect()
    }

    /// Final state on success, the stopping error otherwise
    pub fn into_result(mut self) -> Result<S> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.snapshots
            .pop()
            .map(|snapshot| snapshot.state)
            .ok_or_else(|| GraphError::Execution("run completed without executing a node".to_string()))
    }
}
