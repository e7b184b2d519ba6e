//! Graph assembly
//!
//! [`StateGraph`] is the mutable builder: declare nodes, wire edges, pick the
//! entry point, then [`compile`](StateGraph::compile) it into an immutable
//! [`CompiledGraph`]. All structural checks happen at compile time so a graph
//! that compiles can only fail at run time because of its nodes, its routers
//! or its step ceiling.
//!
//! # Validation
//!
//! | Check | Error |
//! |-------|-------|
//! | Entry point set and declared | `Validation` |
//! | Node names unique, not `__start__`/`__end__` | `Validation` |
//! | Every node has exactly one outgoing edge | `Validation` |
//! | Every edge source and target declared (or `END`) | `Validation` |
//! | Conditional edges declare at least one target | `Validation` |
//! | Nodes unreachable from the entry | logged, not fatal |
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_core::{FnRouter, NodeOutput, StateGraph, END};
//!
//! let mut graph = StateGraph::<Counter>::new();
//! graph
//!     .add_fn_node("increment", |state: Counter| async move {
//!         Ok(NodeOutput::new("increment").with(CounterUpdate::Add(1)))
//!     })
//!     .set_entry("increment")
//!     .add_conditional_edge(
//!         "increment",
//!         FnRouter::new("until_ten", ["increment", END], |s: &Counter| {
//!             if s.value < 10 { "increment".into() } else { END.into() }
//!         }),
//!     );
//!
//! let compiled = graph.compile()?;
//! ```

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, NodeError, Result};
use crate::graph::{is_reserved, Edge, NodeId, END, START};
use crate::node::{FnNode, Node, NodeOutput};
use crate::router::Router;
use crate::state::GraphState;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

/// Builder for a state graph
pub struct StateGraph<S: GraphState> {
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    edges: Vec<(NodeId, Edge<S>)>,
    entry: Option<NodeId>,
    problems: Vec<String>,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> StateGraph<S> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            entry: None,
            problems: Vec::new(),
        }
    }

    /// Declare a node
    ///
    /// Duplicate and reserved names are reported by [`compile`](Self::compile).
    pub fn add_node<N>(&mut self, name: impl Into<NodeId>, node: N) -> &mut Self
    where
        N: Node<S> + 'static,
    {
        self.add_shared_node(name, Arc::new(node))
    }

    /// Declare a node that is already behind an `Arc`
    pub fn add_shared_node(&mut self, name: impl Into<NodeId>, node: Arc<dyn Node<S>>) -> &mut Self {
        let name = name.into();
        if is_reserved(&name) {
            self.problems
                .push(format!("Node name '{}' is reserved", name));
            return self;
        }
        if self.nodes.contains_key(&name) {
            self.problems
                .push(format!("Node '{}' is declared more than once", name));
            return self;
        }
        self.order.push(name.clone());
        self.nodes.insert(name, node);
        self
    }

    /// Declare a node from an async closure
    pub fn add_fn_node<F, Fut>(&mut self, name: impl Into<NodeId>, func: F) -> &mut Self
    where
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<NodeOutput<S::Update>, NodeError>> + Send + 'static,
    {
        self.add_node(name, FnNode::new(func))
    }

    /// Add an unconditional edge
    ///
    /// An edge from `START` is equivalent to [`set_entry`](Self::set_entry).
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            return self.set_entry(to);
        }
        self.edges.push((from, Edge::Direct(to)));
        self
    }

    /// Add an edge whose target is chosen by `router`
    pub fn add_conditional_edge<R>(&mut self, from: impl Into<NodeId>, router: R) -> &mut Self
    where
        R: Router<S> + 'static,
    {
        self.edges.push((from.into(), Edge::Conditional(Arc::new(router))));
        self
    }

    /// Set the entry point of the graph
    pub fn set_entry(&mut self, node: impl Into<NodeId>) -> &mut Self {
        let node = node.into();
        if let Some(previous) = &self.entry {
            if previous != &node {
                self.problems.push(format!(
                    "Entry point set twice ('{}' and '{}')",
                    previous, node
                ));
            }
        }
        self.entry = Some(node);
        self
    }

    /// Add an edge from `node` to END
    pub fn add_finish(&mut self, node: impl Into<NodeId>) -> &mut Self {
        self.add_edge(node, END)
    }

    /// Validate the structure and produce an executable graph
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        if let Some(problem) = self.problems.first() {
            return Err(GraphError::Validation(problem.clone()));
        }

        let entry = self
            .entry
            .clone()
            .ok_or_else(|| GraphError::Validation("No entry point set".to_string()))?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::Validation(format!(
                "Entry point '{}' is not a declared node",
                entry
            )));
        }

        let mut edges: HashMap<NodeId, Edge<S>> = HashMap::new();
        for (from, edge) in self.edges {
            if !self.nodes.contains_key(&from) {
                return Err(GraphError::Validation(format!(
                    "Edge source '{}' is not a declared node",
                    from
                )));
            }

            let targets = edge.targets();
            if targets.is_empty() {
                return Err(GraphError::Validation(format!(
                    "Conditional edge from '{}' declares no targets",
                    from
                )));
            }
            for target in &targets {
                if target != END && !self.nodes.contains_key(target) {
                    return Err(GraphError::Validation(format!(
                        "Edge target '{}' (from '{}') is not a declared node",
                        target, from
                    )));
                }
            }

            if edges.contains_key(&from) {
                return Err(GraphError::Validation(format!(
                    "Node '{}' has more than one outgoing edge",
                    from
                )));
            }
            edges.insert(from, edge);
        }

        if let Some(missing) = self.order.iter().find(|name| !edges.contains_key(*name)) {
            return Err(GraphError::Validation(format!(
                "Node '{}' has no outgoing edge",
                missing
            )));
        }

        let reachable = reachable_from(&entry, &edges);
        for name in self.order.iter().filter(|name| !reachable.contains(*name)) {
            tracing::warn!(node = %name, "node is unreachable from the entry point");
        }

        tracing::debug!(
            nodes = self.order.len(),
            entry = %entry,
            "graph compiled"
        );

        Ok(CompiledGraph::new(self.order, self.nodes, edges, entry))
    }
}

fn reachable_from<S: GraphState>(entry: &str, edges: &HashMap<NodeId, Edge<S>>) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([entry.to_string()]);
    while let Some(name) = queue.pop_front() {
        if name == END || !seen.insert(name.clone()) {
            continue;
        }
        if let Some(edge) = edges.get(&name) {
            queue.extend(edge.targets());
        }
    }
    seen
}
