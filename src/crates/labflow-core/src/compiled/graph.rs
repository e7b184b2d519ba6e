//! CompiledGraph struct and introspection

use crate::graph::{Edge, NodeId};
use crate::node::{Node, NodeKind};
use crate::state::GraphState;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct GraphInner<S: GraphState> {
    pub(crate) order: Vec<NodeId>,
    pub(crate) nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    pub(crate) edges: HashMap<NodeId, Edge<S>>,
    pub(crate) entry: NodeId,
}

/// Validated graph ready for execution
///
/// Cloning is cheap: the structure is shared.
pub struct CompiledGraph<S: GraphState> {
    pub(crate) inner: Arc<GraphInner<S>>,
}

impl<S: GraphState> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(
        order: Vec<NodeId>,
        nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
        edges: HashMap<NodeId, Edge<S>>,
        entry: NodeId,
    ) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                order,
                nodes,
                edges,
                entry,
            }),
        }
    }

    /// Entry node
    pub fn entry(&self) -> &str {
        &self.inner.entry
    }

    /// Node names in declaration order
    pub fn node_names(&self) -> Vec<&str> {
        self.inner.order.iter().map(String::as_str).collect()
    }

    /// Every node `node` may hand control to
    pub fn successors(&self, node: &str) -> Vec<NodeId> {
        self.inner
            .edges
            .get(node)
            .map(Edge::targets)
            .unwrap_or_default()
    }

    /// Outgoing edge of `node`
    pub fn edge(&self, node: &str) -> Option<&Edge<S>> {
        self.inner.edges.get(node)
    }

    /// Whether `node` runs automatically or waits for a decision
    pub fn node_kind(&self, node: &str) -> Option<NodeKind> {
        self.inner.nodes.get(node).map(|n| n.kind())
    }
}

impl<S: GraphState> std::fmt::Debug for CompiledGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.inner.entry)
            .field("nodes", &self.inner.order)
            .finish()
    }
}
