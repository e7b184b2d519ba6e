//! # labflow-core - Typed state graphs with human checkpoints
//!
//! `labflow-core` runs a directed graph of named nodes over a single shared
//! state record. It is the orchestration engine underneath the research team
//! in `labflow-team`, but knows nothing about agents or research: any state
//! type implementing [`GraphState`] can be driven through it.
//!
//! ## Core Concepts
//!
//! - **State**: one value per run, merged from tagged partial updates
//!   ([`GraphState`]). Nodes never mutate it directly.
//! - **Nodes**: async units returning updates plus a sender tag ([`Node`]).
//! - **Edges**: every node has exactly one outgoing edge, either direct or
//!   chosen by a [`Router`] from a fixed set of targets.
//! - **Checkpoints**: nodes that suspend the run until an external decision
//!   arrives ([`interrupt`]).
//! - **Step ceiling**: a hard bound on node invocations; reaching it ends the
//!   run with [`GraphError::NonConvergence`].
//!
//! ## Execution guarantees
//!
//! - Exactly one node is active at a time.
//! - Updates of one invocation are merged before anything else observes the
//!   state.
//! - A snapshot is emitted after every completed invocation.
//! - A router returning a name outside its declared targets aborts the run
//!   with [`GraphError::Configuration`].
//! - Node failures abort the run unchanged; nothing is retried.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use labflow_core::{FnRouter, GraphState, NodeOutput, RunConfig, StateGraph, END};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Counter { value: u32 }
//!
//! impl GraphState for Counter {
//!     type Update = u32;
//!     fn apply(&mut self, update: u32) { self.value += update; }
//! }
//!
//! let mut graph = StateGraph::<Counter>::new();
//! graph
//!     .add_fn_node("tick", |_state| async move { Ok(NodeOutput::new("tick").with(1)) })
//!     .set_entry("tick")
//!     .add_conditional_edge("tick", FnRouter::new("until_three", ["tick", END], |s: &Counter| {
//!         if s.value < 3 { "tick".into() } else { END.into() }
//!     }));
//!
//! let final_state = graph.compile()?.invoke(Counter::default(), RunConfig::default()).await?;
//! assert_eq!(final_state.value, 3);
//! ```

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod interrupt;
pub mod llm;
pub mod messages;
pub mod node;
pub mod router;
pub mod state;
pub mod visualization;

pub use builder::StateGraph;
pub use compiled::{
    CompiledGraph, RunConfig, RunReport, SnapshotStream, StateSnapshot, DEFAULT_STEP_CEILING,
};
pub use error::{GraphError, NodeError, Result};
pub use graph::{is_reserved, Edge, NodeId, END, START};
pub use interrupt::{
    decision_channel, ChannelDecisions, CheckpointNode, DecisionInbox, DecisionProvider,
    DecisionRequest, PendingDecision, ScriptedDecisions,
};
pub use llm::{
    ChatConfig, ChatModel, ChatRequest, ChatResponse, ResponseFormat, ToolDefinition,
    ToolExecutor, UsageMetadata,
};
pub use messages::{get_last_message, Message, MessageRole, ToolCall};
pub use node::{FnNode, Node, NodeKind, NodeOutput};
pub use router::{Directive, DirectiveRouter, FnRouter, Router};
pub use state::GraphState;
