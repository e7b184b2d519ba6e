//! Execution units
//!
//! A node is one step of a graph: it reads the current state and returns the
//! updates it wants merged plus the tag recorded as the latest sender.
//!
//! ```text
//!   &state ──► Node::execute ──► NodeOutput { updates, sender }
//!                                     │
//!                       driver merges updates, records sender
//! ```
//!
//! Nodes may perform arbitrary I/O (model calls, tools); the engine only sees
//! the returned [`NodeOutput`]. A node that fails returns an error and the run
//! aborts: the engine never retries.

use crate::error::NodeError;
use crate::state::GraphState;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Kind of node, used for logging and visualization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Runs automatically
    Task,
    /// Suspends until an external decision arrives
    Checkpoint,
}

/// Result of a single node invocation
#[derive(Debug)]
pub struct NodeOutput<U> {
    /// Partial updates, applied in order
    pub updates: Vec<U>,
    /// Tag recorded as the state's latest sender
    pub sender: String,
}

impl<U> NodeOutput<U> {
    /// Output with no updates yet
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            updates: Vec::new(),
            sender: sender.into(),
        }
    }

    /// Add an update
    pub fn with(mut self, update: U) -> Self {
        self.updates.push(update);
        self
    }

    /// Add an update only when one is present
    pub fn with_opt(mut self, update: Option<U>) -> Self {
        if let Some(update) = update {
            self.updates.push(update);
        }
        self
    }
}

/// One step in a graph
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use labflow_core::{Node, NodeError, NodeOutput};
///
/// struct Shout;
///
/// #[async_trait]
/// impl Node<Notes> for Shout {
///     async fn execute(&self, state: &Notes) -> Result<NodeOutput<NotesUpdate>, NodeError> {
///         Ok(NodeOutput::new("shout").with(NotesUpdate::Topic(state.topic.to_uppercase())))
///     }
/// }
/// ```
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    /// Run the node against a read-only view of the state
    async fn execute(&self, state: &S) -> Result<NodeOutput<S::Update>, NodeError>;

    /// Whether this node runs automatically or waits for a decision
    fn kind(&self) -> NodeKind {
        NodeKind::Task
    }
}

/// Node built from an async closure
///
/// The closure receives an owned clone of the state, which keeps the
/// `|state| async move { ... }` style usable without lifetime gymnastics.
pub struct FnNode<S, F> {
    func: F,
    _state: PhantomData<fn() -> S>,
}

impl<S, F> FnNode<S, F> {
    /// Wrap a closure
    pub fn new(func: F) -> Self {
        Self {
            func,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<S, F>
where
    S: GraphState,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NodeOutput<S::Update>, NodeError>> + Send + 'static,
{
    async fn execute(&self, state: &S) -> Result<NodeOutput<S::Update>, NodeError> {
        (self.func)(state.clone()).await
    }
}
