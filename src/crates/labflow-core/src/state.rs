//! Shared state records and their merge rules
//!
//! A graph run threads exactly one state value through every node. Nodes
//! never mutate that value directly: they return a list of tagged partial
//! updates, and the driver merges them into the record with
//! [`GraphState::apply`]. Making the update type an enum (one variant per
//! field a node may write) keeps the merge exhaustive and statically
//! checked.
//!
//! # Merge rules
//!
//! | Rule | Behavior | Use Case |
//! |------|----------|----------|
//! | Overwrite | Last write wins | Hypothesis, routing directives, specialist results |
//! | Append | Push to the end, never remove | Conversation history |
//!
//! Implementors choose the rule per variant inside `apply`. Fields a node does
//! not mention are left untouched, so a node that produces nothing for a field
//! can never null it out.
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_core::{GraphState, Message};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Notes {
//!     history: Vec<Message>,
//!     topic: String,
//!     last_sender: String,
//! }
//!
//! #[derive(Debug, Clone)]
//! enum NotesUpdate {
//!     Append(Message),
//!     Topic(String),
//! }
//!
//! impl GraphState for Notes {
//!     type Update = NotesUpdate;
//!
//!     fn apply(&mut self, update: NotesUpdate) {
//!         match update {
//!             NotesUpdate::Append(msg) => self.history.push(msg),
//!             NotesUpdate::Topic(topic) => self.topic = topic,
//!         }
//!     }
//!
//!     fn record_sender(&mut self, sender: &str) {
//!         self.last_sender = sender.to_string();
//!     }
//! }
//! ```

use std::fmt::Debug;

/// A state record that can be threaded through a graph
///
/// The driver owns the record between node invocations, hands each node a
/// shared reference, and merges the node's updates back in. No locking is
/// involved because only one node runs at a time.
pub trait GraphState: Clone + Debug + Send + Sync + 'static {
    /// Tagged partial update produced by nodes
    type Update: Debug + Send + Sync + 'static;

    /// Merge a single update into the record
    fn apply(&mut self, update: Self::Update);

    /// Record which node produced the most recent update
    ///
    /// Called once per node invocation, after the node's updates have been
    /// applied. The default implementation ignores the tag.
    fn record_sender(&mut self, _sender: &str) {}

    /// Merge several updates in order
    fn apply_all<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = Self::Update>,
        Self: Sized,
    {
        for update in updates {
            self.apply(update);
        }
    }
}
