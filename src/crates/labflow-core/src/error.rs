//! Error types and error handling for graph operations
//!
//! This module defines every error that can end a graph run or reject a graph
//! at assembly time. All errors implement `std::error::Error` via the
//! `thiserror` crate.
//!
//! # Error Hierarchy
//!
//! ```text
//! GraphError
//! ├── Validation           - Graph structure errors (compile time)
//! ├── Configuration        - Out-of-set routes, missing capabilities
//! ├── NodeExecution        - A node (agent or tool) failed
//! ├── NonConvergence       - Step ceiling reached before END
//! ├── DecisionUnavailable  - A human checkpoint could not obtain a decision
//! ├── Backend              - Generation backend failure (raised inside nodes)
//! ├── Execution            - Driver-level failure without node context
//! └── Serialization        - JSON errors
//! ```
//!
//! # Distinguishing outcomes
//!
//! Callers usually care about three classes of failure: the graph was wired
//! wrong (`Validation`, `Configuration`), a component errored
//! (`NodeExecution`, `DecisionUnavailable`), or the pipeline never settled
//! (`NonConvergence`). [`GraphError::is_non_convergence`] and
//! [`GraphError::is_configuration`] make that split explicit.
//!
//! ```rust,ignore
//! use labflow_core::GraphError;
//!
//! match report.error {
//!     None => println!("completed"),
//!     Some(GraphError::NonConvergence { limit, pending_node }) => {
//!         eprintln!("no convergence after {} steps (next: {})", limit, pending_node);
//!     }
//!     Some(GraphError::NodeExecution { node, source }) => {
//!         eprintln!("node '{}' failed: {}", node, source);
//!     }
//!     Some(other) => eprintln!("run aborted: {}", other),
//! }
//! ```

use thiserror::Error;

/// Error type returned by node implementations.
///
/// Nodes wrap arbitrary agent and tool failures; the driver attaches the node
/// name when it converts this into [`GraphError::NodeExecution`].
pub type NodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience result type using [`GraphError`]
pub type Result<T> = std::result::Result<T, GraphError>;

/// Comprehensive error type for graph assembly and execution
///
/// # Examples
///
/// ```rust,ignore
/// use labflow_core::GraphError;
///
/// let err = GraphError::node_execution("Search", "web search timed out");
/// assert_eq!(err.to_string(), "Node 'Search' execution failed: web search timed out");
/// ```
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure validation failed
    ///
    /// Raised by `StateGraph::compile` when the declared structure cannot be
    /// executed: missing entry point, undeclared edge endpoints, nodes without
    /// an outgoing edge, or nodes with more than one.
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// Graph or node configuration error
    ///
    /// Fatal at assembly or first use. Covers a router returning a node name
    /// outside its declared targets and a node whose bound capabilities are
    /// missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Node execution failed
    ///
    /// The node's agent or tool raised. The run aborts with the failure
    /// surfaced unchanged; the engine never retries.
    #[error("Node '{node}' execution failed: {source}")]
    NodeExecution {
        /// Name of the node that failed
        node: String,
        /// Underlying failure reported by the node
        #[source]
        source: NodeError,
    },

    /// The step ceiling was reached before the graph reached END
    ///
    /// Reported separately from component failures so callers can tell
    /// "the pipeline never settled" apart from "a component errored".
    #[error("Graph did not converge within {limit} steps (next node: '{pending_node}')")]
    NonConvergence {
        /// Configured step ceiling
        limit: usize,
        /// Node that would have run next
        pending_node: String,
    },

    /// A human checkpoint could not obtain a decision
    ///
    /// The decision source was closed or exhausted while the run was
    /// suspended at `node`.
    #[error("No decision available at checkpoint '{node}': {reason}")]
    DecisionUnavailable {
        /// Checkpoint node that was waiting
        node: String,
        /// Why no decision could be obtained
        reason: String,
    },

    /// Generation backend failure
    ///
    /// Returned by [`ChatModel`](crate::llm::ChatModel) implementations.
    /// When raised inside a node it is wrapped into
    /// [`GraphError::NodeExecution`].
    #[error("Backend '{provider}' failed: {message}")]
    Backend {
        /// Provider or model identifier
        provider: String,
        /// Error description
        message: String,
    },

    /// Generic execution error without node context
    #[error("Execution failed: {0}")]
    Execution(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Create a node execution error from any displayable failure
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        let message: String = error.into();
        Self::NodeExecution {
            node: node.into(),
            source: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a backend error
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a decision-unavailable error
    pub fn decision_unavailable(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecisionUnavailable {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// True when the run hit the step ceiling
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, Self::NonConvergence { .. })
    }

    /// True for wiring mistakes (assembly validation or out-of-set routing)
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Configuration(_))
    }

    /// Convert a failure raised by a node into the error reported by the driver.
    ///
    /// Engine errors that already carry their own context (configuration
    /// mistakes, unavailable decisions) pass through unchanged; everything
    /// else is attributed to `node`.
    pub(crate) fn from_node_failure(node: &str, error: NodeError) -> Self {
        match error.downcast::<GraphError>() {
            Ok(graph_error) => match *graph_error {
                err @ (GraphError::Configuration(_) | GraphError::DecisionUnavailable { .. }) => {
                    err
                }
                other => Self::NodeExecution {
                    node: node.to_string(),
                    source: Box::new(other),
                },
            },
            Err(source) => Self::NodeExecution {
                node: node.to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_execution_display() {
        let err = GraphError::node_execution("Search", "timeout");
        assert_eq!(err.to_string(), "Node 'Search' execution failed: timeout");
    }

    #[test]
    fn test_non_convergence_is_distinct() {
        let err = GraphError::NonConvergence {
            limit: 10,
            pending_node: "Process".to_string(),
        };
        assert!(err.is_non_convergence());
        assert!(!err.is_configuration());
        assert!(!GraphError::node_execution("a", "b").is_non_convergence());
    }

    #[test]
    fn test_from_node_failure_passes_through_decision_errors() {
        let raised: NodeError = Box::new(GraphError::decision_unavailable("HumanReview", "closed"));
        let err = GraphError::from_node_failure("HumanReview", raised);
        assert!(matches!(err, GraphError::DecisionUnavailable { .. }));
    }

    #[test]
    fn test_from_node_failure_wraps_backend_errors() {
        let raised: NodeError = Box::new(GraphError::backend("openai", "HTTP 500"));
        let err = GraphError::from_node_failure("Coder", raised);
        match err {
            GraphError::NodeExecution { node, source } => {
                assert_eq!(node, "Coder");
                assert!(source.to_string().contains("HTTP 500"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_node_failure_wraps_foreign_errors() {
        let raised: NodeError = "disk full".into();
        let err = GraphError::from_node_failure("Report", raised);
        assert_eq!(err.to_string(), "Node 'Report' execution failed: disk full");
    }
}
