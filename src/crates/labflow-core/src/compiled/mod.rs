//! Executable graphs
//!
//! A [`CompiledGraph`] is produced by [`StateGraph::compile`](crate::StateGraph::compile)
//! and can be run any number of times against different initial states.
//!
//! # Execution model
//!
//! ```text
//!   current = entry
//!   loop:
//!     steps == ceiling ?  ──► NonConvergence { limit, pending_node: current }
//!     execute(current, &state)      (one node at a time)
//!     merge updates, record sender
//!     emit StateSnapshot
//!     next = edge(current)          (direct, or router validated against its targets)
//!     next == END ?  ──► done
//! ```
//!
//! # Execution modes
//!
//! - [`CompiledGraph::stream`] yields one [`StateSnapshot`] per completed node
//!   invocation; the first error ends the stream.
//! - [`CompiledGraph::run`] collects the snapshots into a [`RunReport`], which
//!   keeps every snapshot emitted before a failure.
//! - [`CompiledGraph::invoke`] returns only the final state.

mod execution;
mod graph;
mod streaming;
mod types;

pub use graph::CompiledGraph;
pub use types::{RunConfig, RunReport, SnapshotStream, StateSnapshot, DEFAULT_STEP_CEILING};
