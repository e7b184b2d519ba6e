//! Core graph data structures
//!
//! This module defines the building blocks that [`StateGraph`](crate::StateGraph)
//! assembles and [`CompiledGraph`](crate::CompiledGraph) executes.
//!
//! # Graph Structure
//!
//! ```text
//!   START ──► Node A ──────────────► Node B          Direct edge
//!                                      │
//!                                      │ router(state)
//!                          ┌───────────┼───────────┐  Conditional edge
//!                          ▼           ▼           ▼
//!                       Node C      Node B        END
//! ```
//!
//! Every node has exactly one outgoing edge. A direct edge always leads to the
//! same successor; a conditional edge asks a [`Router`](crate::Router) to pick
//! one of its statically declared targets from the current state. Cycles are
//! allowed: the driver's step ceiling bounds them.

use crate::router::Router;
use crate::state::GraphState;
use std::fmt;
use std::sync::Arc;

/// Node identifier, unique within a graph
pub type NodeId = String;

/// Virtual node marking where execution begins
pub const START: &str = "__start__";

/// Virtual node marking successful completion
pub const END: &str = "__end__";

/// True for the virtual START and END names
pub fn is_reserved(name: &str) -> bool {
    name == START || name == END
}

/// Outgoing transition of a node
pub enum Edge<S: GraphState> {
    /// Unconditional transition
    Direct(NodeId),

    /// State-dependent transition chosen by a router
    Conditional(Arc<dyn Router<S>>),
}

impl<S: GraphState> Edge<S> {
    /// Every node this edge may lead to
    pub fn targets(&self) -> Vec<NodeId> {
        match self {
            Self::Direct(target) => vec![target.clone()],
            Self::Conditional(router) => router.targets(),
        }
    }

    /// True for conditional edges
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Conditional(_))
    }
}

impl<S: GraphState> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct(target) => Self::Direct(target.clone()),
            Self::Conditional(router) => Self::Conditional(Arc::clone(router)),
        }
    }
}

impl<S: GraphState> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(target) => f.debug_tuple("Direct").field(target).finish(),
            Self::Conditional(router) => f
                .debug_struct("Conditional")
                .field("router", &router.name())
                .field("targets", &router.targets())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::FnRouter;

    #[derive(Debug, Clone)]
    struct Flag(bool);

    impl GraphState for Flag {
        type Update = bool;
        fn apply(&mut self, update: bool) {
            self.0 = update;
        }
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved(START));
        assert!(is_reserved(END));
        assert!(!is_reserved("Process"));
    }

    #[test]
    fn test_edge_targets() {
        let direct: Edge<Flag> = Edge::Direct("b".to_string());
        assert_eq!(direct.targets(), vec!["b"]);
        assert!(!direct.is_conditional());

        let router = FnRouter::new("flag", ["yes", END], |s: &Flag| {
            if s.0 { "yes".to_string() } else { END.to_string() }
        });
        let conditional: Edge<Flag> = Edge::Conditional(Arc::new(router));
        assert_eq!(conditional.targets(), vec!["yes", END]);
        assert!(conditional.is_conditional());
    }
}
