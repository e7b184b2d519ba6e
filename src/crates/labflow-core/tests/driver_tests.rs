//! Integration tests for the execution driver
//!
//! These tests exercise compiled graphs end to end: routing, snapshots,
//! the step ceiling, node failures and human checkpoints.

use futures::StreamExt;
use labflow_core::{
    decision_channel, CheckpointNode, FnRouter, GraphError, GraphState, Message, NodeError,
    NodeOutput, RunConfig, ScriptedDecisions, StateGraph, END,
};

#[derive(Debug, Clone, Default, PartialEq)]
struct Ledger {
    history: Vec<Message>,
    total: i64,
    approved: bool,
    last_sender: String,
}

#[derive(Debug, Clone)]
enum LedgerUpdate {
    Note(Message),
    Add(i64),
    Approved(bool),
}

impl GraphState for Ledger {
    type Update = LedgerUpdate;

    fn apply(&mut self, update: LedgerUpdate) {
        match update {
            LedgerUpdate::Note(message) => self.history.push(message),
            LedgerUpdate::Add(amount) => self.total += amount,
            LedgerUpdate::Approved(approved) => self.approved = approved,
        }
    }

    fn record_sender(&mut self, sender: &str) {
        self.last_sender = sender.to_string();
    }
}

fn adder(amount: i64) -> impl Fn(Ledger) -> futures::future::Ready<Result<NodeOutput<LedgerUpdate>, NodeError>> {
    move |_state| {
        futures::future::ready(Ok(NodeOutput::new("adder")
            .with(LedgerUpdate::Add(amount))
            .with(LedgerUpdate::Note(Message::assistant(format!("added {}", amount))))))
    }
}

/// add -> (total < 3 ? add : END)
fn counting_graph() -> StateGraph<Ledger> {
    let mut graph = StateGraph::new();
    graph
        .add_fn_node("add", adder(1))
        .set_entry("add")
        .add_conditional_edge(
            "add",
            FnRouter::new("until_three", ["add", END], |s: &Ledger| {
                if s.total < 3 { "add".to_string() } else { END.to_string() }
            }),
        );
    graph
}

#[tokio::test]
async fn test_cycle_runs_until_router_ends() {
    let compiled = counting_graph().compile().unwrap();
    let report = compiled.run(Ledger::default(), RunConfig::default()).await;

    assert!(report.is_complete());
    assert_eq!(report.steps(), 3);
    assert_eq!(report.path(), vec!["add", "add", "add"]);
    let state = report.final_state().unwrap();
    assert_eq!(state.total, 3);
    assert_eq!(state.last_sender, "adder");
}

#[tokio::test]
async fn test_snapshots_are_numbered_and_history_grows() {
    let compiled = counting_graph().compile().unwrap();
    let snapshots: Vec<_> = compiled
        .stream(Ledger::default(), RunConfig::default())
        .collect()
        .await;

    let snapshots: Vec<_> = snapshots.into_iter().map(Result::unwrap).collect();
    assert_eq!(snapshots.len(), 3);
    let run_id = snapshots[0].run_id;
    let mut previous = 0;
    for (index, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.step, index + 1);
        assert_eq!(snapshot.run_id, run_id);
        assert!(snapshot.state.history.len() >= previous);
        previous = snapshot.state.history.len();
    }
}

#[tokio::test]
async fn test_non_convergence_at_exact_ceiling() {
    let mut graph = StateGraph::<Ledger>::new();
    graph
        .add_fn_node("deliberate", adder(1))
        .set_entry("deliberate")
        .add_conditional_edge(
            "deliberate",
            FnRouter::new("always_again", ["deliberate", END], |_: &Ledger| "deliberate".to_string()),
        );
    let compiled = graph.compile().unwrap();

    let report = compiled
        .run(Ledger::default(), RunConfig::default().with_step_ceiling(5))
        .await;

    assert_eq!(report.steps(), 5);
    assert_eq!(report.final_state().unwrap().total, 5);
    match report.error {
        Some(GraphError::NonConvergence { limit, pending_node }) => {
            assert_eq!(limit, 5);
            assert_eq!(pending_node, "deliberate");
        }
        other => panic!("expected non-convergence, got {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_ceiling_runs_nothing() {
    let compiled = counting_graph().compile().unwrap();
    let report = compiled
        .run(Ledger::default(), RunConfig::default().with_step_ceiling(0))
        .await;
    assert_eq!(report.steps(), 0);
    assert!(report.error.unwrap().is_non_convergence());
}

#[tokio::test]
async fn test_node_failure_keeps_earlier_snapshots() {
    let mut graph = StateGraph::<Ledger>::new();
    graph
        .add_fn_node("first", adder(10))
        .add_fn_node("broken", |_state: Ledger| async move {
            Err::<NodeOutput<LedgerUpdate>, NodeError>("search tool unreachable".into())
        })
        .set_entry("first")
        .add_edge("first", "broken")
        .add_finish("broken");

    let report = graph.compile().unwrap().run(Ledger::default(), RunConfig::default()).await;

    assert_eq!(report.path(), vec!["first"]);
    match report.error {
        Some(GraphError::NodeExecution { node, source }) => {
            assert_eq!(node, "broken");
            assert_eq!(source.to_string(), "search tool unreachable");
        }
        other => panic!("expected node failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_out_of_set_route_is_configuration_error() {
    let mut graph = StateGraph::<Ledger>::new();
    graph
        .add_fn_node("start", adder(1))
        .set_entry("start")
        .add_conditional_edge(
            "start",
            FnRouter::new("rogue", [END], |_: &Ledger| "nowhere".to_string()),
        );

    let report = graph.compile().unwrap().run(Ledger::default(), RunConfig::default()).await;

    // the node ran and its snapshot was emitted before routing failed
    assert_eq!(report.steps(), 1);
    let error = report.error.unwrap();
    assert!(error.is_configuration());
    assert!(error.to_string().contains("nowhere"));
}

#[tokio::test]
async fn test_stream_ends_after_error() {
    let mut graph = StateGraph::<Ledger>::new();
    graph
        .add_fn_node("broken", |_state: Ledger| async move {
            Err::<NodeOutput<LedgerUpdate>, NodeError>("boom".into())
        })
        .set_entry("broken")
        .add_finish("broken");

    let items: Vec<_> = graph
        .compile()
        .unwrap()
        .stream(Ledger::default(), RunConfig::default())
        .collect()
        .await;
    assert_eq!(items.len(), 1);
    assert!(items[0].is_err());
}

fn approval_graph(checkpoint: CheckpointNode<Ledger, bool>) -> StateGraph<Ledger> {
    let mut graph = StateGraph::new();
    graph
        .add_fn_node("draft", adder(1))
        .add_node("approve", checkpoint)
        .set_entry("draft")
        .add_edge("draft", "approve")
        .add_conditional_edge(
            "approve",
            FnRouter::new("approved", ["draft", END], |s: &Ledger| {
                if s.approved { END.to_string() } else { "draft".to_string() }
            }),
        );
    graph
}

fn approval(decision: bool, _state: &Ledger) -> NodeOutput<LedgerUpdate> {
    NodeOutput::new("approve").with(LedgerUpdate::Approved(decision))
}

#[tokio::test]
async fn test_scripted_checkpoint_loops_until_approved() {
    let checkpoint = CheckpointNode::new(
        "approve",
        "Approve the draft?",
        ScriptedDecisions::new([false, true]),
        approval,
    );
    let compiled = approval_graph(checkpoint).compile().unwrap();

    let state = compiled.invoke(Ledger::default(), RunConfig::default()).await.unwrap();
    assert_eq!(state.total, 2);
    assert!(state.approved);
    assert_eq!(state.last_sender, "approve");
}

#[tokio::test]
async fn test_exhausted_decisions_abort_distinctly() {
    let checkpoint = CheckpointNode::new("approve", "Approve?", ScriptedDecisions::new([false]), approval);
    let compiled = approval_graph(checkpoint).compile().unwrap();

    let report = compiled.run(Ledger::default(), RunConfig::default()).await;
    assert_eq!(report.path(), vec!["draft", "approve", "draft"]);
    assert!(matches!(
        report.error,
        Some(GraphError::DecisionUnavailable { ref node, .. }) if node == "approve"
    ));
}

#[tokio::test]
async fn test_channel_checkpoint_suspends_and_resumes() {
    let (provider, mut inbox) = decision_channel::<Ledger, bool>(1);
    let checkpoint = CheckpointNode::new("approve", "Approve?", provider, approval);
    let compiled = approval_graph(checkpoint).compile().unwrap();

    let run = tokio::spawn(async move { compiled.invoke(Ledger::default(), RunConfig::default()).await });

    let pending = inbox.next().await.expect("run should suspend at the checkpoint");
    assert_eq!(pending.request().node, "approve");
    assert_eq!(pending.request().state.total, 1);
    assert!(!run.is_finished());
    pending.respond(true).unwrap();

    let state = run.await.unwrap().unwrap();
    assert!(state.approved);
    assert_eq!(state.total, 1);
}
