//! Human-in-the-loop checkpoints
//!
//! A checkpoint is a node that cannot complete on its own: it suspends the run
//! until an externally supplied decision arrives, then turns that decision
//! into state updates. Checkpoints are the only suspension points of a graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Driver                                                      │
//! │                                                              │
//! │  ┌──────────┐     ┌──────────────────────┐    ┌──────────┐  │
//! │  │  Node A  │ ──► │  CheckpointNode<S,D> │ ──►│  Router  │  │
//! │  └──────────┘     └─────────┬────────────┘    └──────────┘  │
//! │                             │ decide(DecisionRequest<S>)    │
//! │                             ▼                               │
//! │                 ┌────────────────────────┐                  │
//! │                 │ DecisionProvider<S, D> │ (awaits, no poll)│
//! │                 └─────────┬──────────────┘                  │
//! └───────────────────────────┼─────────────────────────────────┘
//!                             ▼
//!        console prompt │ channel (API, queue) │ scripted queue
//! ```
//!
//! The driver only depends on the "await a decision of type `D`" contract.
//! Which interface delivers the decision is a deployment choice:
//!
//! - [`decision_channel`] returns a provider plus a [`DecisionInbox`]; any task
//!   holding the inbox (an HTTP handler, a queue consumer, a UI) receives each
//!   [`PendingDecision`] and answers it. The run stays suspended until then.
//! - [`ScriptedDecisions`] answers from a pre-filled queue, for tests and
//!   unattended runs.
//!
//! If the decision source goes away (inbox dropped, queue exhausted) the run
//! aborts with [`GraphError::DecisionUnavailable`].
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_core::interrupt::{decision_channel, CheckpointNode};
//!
//! let (provider, mut inbox) = decision_channel::<MyState, bool>(1);
//! let gate = CheckpointNode::new("approve", "Approve the draft?", provider, |approved, _state| {
//!     NodeOutput::new("approve").with(MyUpdate::Approved(approved))
//! });
//!
//! tokio::spawn(async move {
//!     while let Some(pending) = inbox.next().await {
//!         println!("waiting at {}", pending.request().node);
//!         pending.respond(true).ok();
//!     }
//! });
//! ```

use crate::error::{GraphError, NodeError, Result};
use crate::graph::NodeId;
use crate::node::{Node, NodeKind, NodeOutput};
use crate::state::GraphState;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

/// What a checkpoint exposes while it waits
#[derive(Debug, Clone)]
pub struct DecisionRequest<S> {
    /// Checkpoint node asking for the decision
    pub node: NodeId,
    /// Question shown to the decider
    pub prompt: String,
    /// Snapshot of the state at suspension time
    pub state: S,
}

/// Source of external decisions
#[async_trait]
pub trait DecisionProvider<S, D>: Send + Sync
where
    S: Send + 'static,
    D: Send + 'static,
{
    /// Wait until a decision is available
    async fn decide(&self, request: DecisionRequest<S>) -> Result<D>;
}

type ApplyFn<S, D> =
    dyn Fn(D, &S) -> NodeOutput<<S as GraphState>::Update> + Send + Sync;

/// Node that suspends the run until a decision arrives
pub struct CheckpointNode<S: GraphState, D> {
    name: NodeId,
    prompt: String,
    provider: Arc<dyn DecisionProvider<S, D>>,
    apply: Arc<ApplyFn<S, D>>,
}

impl<S, D> CheckpointNode<S, D>
where
    S: GraphState,
    D: Send + 'static,
{
    /// Create a checkpoint
    ///
    /// * `provider` - where decisions come from
    /// * `apply` - converts a decision into state updates
    pub fn new<P, F>(name: impl Into<NodeId>, prompt: impl Into<String>, provider: P, apply: F) -> Self
    where
        P: DecisionProvider<S, D> + 'static,
        F: Fn(D, &S) -> NodeOutput<S::Update> + Send + Sync + 'static,
    {
        Self::with_shared_provider(name, prompt, Arc::new(provider), apply)
    }

    /// Create a checkpoint around an already shared provider
    pub fn with_shared_provider<F>(
        name: impl Into<NodeId>,
        prompt: impl Into<String>,
        provider: Arc<dyn DecisionProvider<S, D>>,
        apply: F,
    ) -> Self
    where
        F: Fn(D, &S) -> NodeOutput<S::Update> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            provider,
            apply: Arc::new(apply),
        }
    }
}

#[async_trait]
impl<S, D> Node<S> for CheckpointNode<S, D>
where
    S: GraphState,
    D: Send + 'static,
{
    async fn execute(&self, state: &S) -> std::result::Result<NodeOutput<S::Update>, NodeError> {
        tracing::info!(node = %self.name, "run suspended, awaiting external decision");
        let request = DecisionRequest {
            node: self.name.clone(),
            prompt: self.prompt.clone(),
            state: state.clone(),
        };
        let decision = self.provider.decide(request).await?;
        tracing::info!(node = %self.name, "decision received, resuming");
        Ok((self.apply)(decision, state))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Checkpoint
    }
}

/// A decision waiting for an answer
pub struct PendingDecision<S, D> {
    request: DecisionRequest<S>,
    responder: oneshot::Sender<D>,
}

impl<S, D> PendingDecision<S, D> {
    /// What the checkpoint is asking
    pub fn request(&self) -> &DecisionRequest<S> {
        &self.request
    }

    /// Answer the checkpoint and resume the run
    ///
    /// Fails when the run is no longer waiting (it was dropped or aborted).
    pub fn respond(self, decision: D) -> Result<()> {
        let node = self.request.node;
        self.responder
            .send(decision)
            .map_err(|_| GraphError::decision_unavailable(node, "run is no longer waiting"))
    }
}

/// Receiving side of [`decision_channel`]
pub struct DecisionInbox<S, D> {
    rx: mpsc::Receiver<PendingDecision<S, D>>,
}

impl<S, D> DecisionInbox<S, D> {
    /// Wait for the next checkpoint to suspend
    ///
    /// Returns `None` once every provider handle has been dropped.
    pub async fn next(&mut self) -> Option<PendingDecision<S, D>> {
        self.rx.recv().await
    }
}

/// Provider that forwards each request through a channel
pub struct ChannelDecisions<S, D> {
    tx: mpsc::Sender<PendingDecision<S, D>>,
}

impl<S, D> Clone for ChannelDecisions<S, D> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Create a suspend/resume boundary
///
/// The provider half goes into a [`CheckpointNode`]; the inbox half is given
/// to whatever delivers decisions.
pub fn decision_channel<S, D>(capacity: usize) -> (ChannelDecisions<S, D>, DecisionInbox<S, D>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelDecisions { tx }, DecisionInbox { rx })
}

#[async_trait]
impl<S, D> DecisionProvider<S, D> for ChannelDecisions<S, D>
where
    S: Send + 'static,
    D: Send + 'static,
{
    async fn decide(&self, request: DecisionRequest<S>) -> Result<D> {
        let node = request.node.clone();
        let (responder, answer) = oneshot::channel();
        self.tx
            .send(PendingDecision { request, responder })
            .await
            .map_err(|_| GraphError::decision_unavailable(&node, "decision inbox closed"))?;
        answer
            .await
            .map_err(|_| GraphError::decision_unavailable(&node, "decision dropped without an answer"))
    }
}

/// Provider that answers from a pre-filled queue
pub struct ScriptedDecisions<D> {
    queue: Mutex<VecDeque<D>>,
}

impl<D> ScriptedDecisions<D> {
    /// Queue decisions in the order they will be handed out
    pub fn new(decisions: impl IntoIterator<Item = D>) -> Self {
        Self {
            queue: Mutex::new(decisions.into_iter().collect()),
        }
    }

    /// Number of decisions not yet handed out
    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl<S, D> DecisionProvider<S, D> for ScriptedDecisions<D>
where
    S: Send + 'static,
    D: Send + 'static,
{
    async fn decide(&self, request: DecisionRequest<S>) -> Result<D> {
        self.queue
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| GraphError::decision_unavailable(request.node, "scripted decisions exhausted"))
    }
}
