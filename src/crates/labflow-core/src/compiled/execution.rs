//! Step-by-step execution
//!
//! [`Driver`] owns the state for the duration of a run and advances it one
//! node at a time. Both the streaming and the collecting entry points are thin
//! wrappers around [`Driver::advance`].

use super::graph::{CompiledGraph, GraphInner};
use super::types::{RunConfig, RunReport, StateSnapshot};
use crate::error::{GraphError, Result};
use crate::graph::{Edge, NodeId, END};
use crate::state::GraphState;
use chrono::Utc;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub(crate) struct Driver<S: GraphState> {
    graph: Arc<GraphInner<S>>,
    state: S,
    current: Option<NodeId>,
    steps: usize,
    ceiling: usize,
    run_id: Uuid,
    deferred: Option<GraphError>,
}

impl<S: GraphState> Driver<S> {
    pub(crate) fn new(graph: Arc<GraphInner<S>>, input: S, config: RunConfig) -> Self {
        let run_id = config.run_id.unwrap_or_else(Uuid::new_v4);
        let current = Some(graph.entry.clone());
        tracing::info!(
            run_id = %run_id,
            entry = %graph.entry,
            step_ceiling = config.step_ceiling,
            "run started"
        );
        Self {
            graph,
            state: input,
            current,
            steps: 0,
            ceiling: config.step_ceiling,
            run_id,
            deferred: None,
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run the next node
    ///
    /// Returns `Ok(None)` once END has been reached. After an error the
    /// driver is finished and keeps returning `Ok(None)`.
    pub(crate) async fn advance(&mut self) -> Result<Option<StateSnapshot<S>>> {
        if let Some(error) = self.deferred.take() {
            self.current = None;
            return Err(self.abort(error));
        }
        let Some(current) = self.current.take() else {
            return Ok(None);
        };

        if self.steps >= self.ceiling {
            return Err(self.abort(GraphError::NonConvergence {
                limit: self.ceiling,
                pending_node: current,
            }));
        }

        let node = match self.graph.nodes.get(&current) {
            Some(node) => Arc::clone(node),
            None => {
                return Err(self.abort(GraphError::Execution(format!(
                    "node '{}' is not part of the graph",
                    current
                ))))
            }
        };

        let step = self.steps + 1;
        let span = tracing::info_span!("node", node = %current, step);
        let output = match node.execute(&self.state).instrument(span).await {
            Ok(output) => output,
            Err(source) => return Err(self.abort(GraphError::from_node_failure(&current, source))),
        };
        self.steps = step;

        let update_count = output.updates.len();
        self.state.apply_all(output.updates);
        self.state.record_sender(&output.sender);
        tracing::debug!(node = %current, step, updates = update_count, sender = %output.sender, "state merged");

        let snapshot = StateSnapshot {
            run_id: self.run_id,
            step,
            node: current.clone(),
            state: self.state.clone(),
            created_at: Utc::now(),
        };

        match self.next_node(&current) {
            Ok(next) if next == END => {
                tracing::info!(run_id = %self.run_id, steps = step, "run reached END");
            }
            Ok(next) => self.current = Some(next),
            Err(error) => self.deferred = Some(error),
        }

        Ok(Some(snapshot))
    }

    fn next_node(&self, from: &str) -> Result<NodeId> {
        let edge = self.graph.edges.get(from).ok_or_else(|| {
            GraphError::Execution(format!("node '{}' has no outgoing edge", from))
        })?;
        match edge {
            Edge::Direct(target) => Ok(target.clone()),
            Edge::Conditional(router) => {
                let next = router.route(&self.state);
                if !router.targets().contains(&next) {
                    return Err(GraphError::configuration(format!(
                        "router '{}' at node '{}' returned '{}', which is not one of its declared targets",
                        router.name(),
                        from,
                        next
                    )));
                }
                tracing::debug!(from = %from, to = %next, router = router.name(), "routed");
                Ok(next)
            }
        }
    }

    fn abort(&self, error: GraphError) -> GraphError {
        tracing::error!(run_id = %self.run_id, steps = self.steps, error = %error, "run aborted");
        error
    }
}

impl<S: GraphState> CompiledGraph<S> {
    /// Run to completion and collect every snapshot
    ///
    /// Never returns early: a failure is recorded in [`RunReport::error`]
    /// alongside the snapshots emitted before it.
    pub async fn run(&self, input: S, config: RunConfig) -> RunReport<S> {
        let mut driver = Driver::new(Arc::clone(&self.inner), input, config);
        let mut snapshots = Vec::new();
        let error = loop {
            match driver.advance().await {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => break None,
                Err(error) => break Some(error),
            }
        };
        RunReport {
            run_id: driver.run_id(),
            snapshots,
            error,
        }
    }

    /// Run to completion and return the final state
    pub async fn invoke(&self, input: S, config: RunConfig) -> Result<S> {
        self.run(input, config).await.into_result()
    }
}
