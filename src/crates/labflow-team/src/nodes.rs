//! Workflow nodes
//!
//! Every node maps one agent reply (or one human decision) into
//! [`StateUpdate`]s. All of them append to `history`; the table below lists
//! the other fields each one writes.
//!
//! | Node | Writes |
//! |------|--------|
//! | [`AgentNode`] (Hypothesis) | `hypothesis` |
//! | [`AgentNode`] (Process) | `process_decision` |
//! | [`AgentNode`] (specialist) | its result field, `review_target` |
//! | [`AgentNode`] (QualityReview) | `quality_review` |
//! | [`NoteNode`] | result fields restored from the note |
//! | [`RefinerNode`] | `report_section` |
//! | [`human_choice_node`] | `choice_directive` |
//! | [`human_review_node`] | `needs_revision` |
//!
//! Both checkpoints record the decision in `history` as a human message.

use crate::agent::Agent;
use crate::directives::{strip_code_fence, ChoiceDirective};
use crate::error::TeamError;
use crate::roster::{Member, Specialist};
use crate::state::{ResearchState, StateUpdate};
use async_trait::async_trait;
use labflow_core::{CheckpointNode, DecisionProvider, Message, Node, NodeError, NodeOutput};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which field an agent's reply is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMapping {
    Hypothesis,
    ProcessDecision,
    Specialist(Specialist),
    QualityReview,
}

/// Node wrapping a plain agent
pub struct AgentNode {
    agent: Agent,
    mapping: OutputMapping,
}

impl AgentNode {
    pub fn new(agent: Agent, mapping: OutputMapping) -> Self {
        Self { agent, mapping }
    }

    fn task(&self, state: &ResearchState) -> Option<String> {
        match self.mapping {
            OutputMapping::Hypothesis => None,
            OutputMapping::ProcessDecision => {
                let options = Specialist::ALL
                    .iter()
                    .map(|s| s.as_str())
                    .chain([Member::Process.as_str(), "FINISH"])
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!(
                    "Given the conversation above, who should act next? Select one of: {}. \
                     Reply with a JSON object of the form {{\"next\": \"<choice>\"}}.",
                    options
                ))
            }
            OutputMapping::Specialist(_) if !state.hypothesis.trim().is_empty() => {
                Some(format!("Current hypothesis: {}", state.hypothesis.trim()))
            }
            OutputMapping::Specialist(_) => None,
            OutputMapping::QualityReview => {
                let target = state
                    .review_target
                    .map(|s| s.as_str())
                    .unwrap_or("the latest contributor");
                Some(format!(
                    "Review the most recent output of {}. Reply ACCEPT or REVISE with instructions.",
                    target
                ))
            }
        }
    }
}

#[async_trait]
impl Node<ResearchState> for AgentNode {
    async fn execute(&self, state: &ResearchState) -> Result<NodeOutput<StateUpdate>, NodeError> {
        let reply = self.agent.invoke(&state.history, self.task(state)).await?;
        let text = reply.content.clone();
        let output = NodeOutput::new(self.agent.member().sender_tag()).with(StateUpdate::AppendMessage(reply));

        Ok(match self.mapping {
            OutputMapping::Hypothesis => output.with(StateUpdate::Hypothesis(text)),
            OutputMapping::ProcessDecision => {
                output.with(StateUpdate::ProcessDecision(text.trim().to_string()))
            }
            OutputMapping::Specialist(specialist) => output
                .with(StateUpdate::SpecialistResult {
                    specialist,
                    content: text,
                })
                .with(StateUpdate::ReviewTarget(specialist)),
            OutputMapping::QualityReview => output.with(StateUpdate::QualityReview(text)),
        })
    }
}

/// Structured note produced by the note agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteRecord {
    pub summary: String,
    pub hypothesis: String,
    pub visualization_state: String,
    pub searcher_state: String,
    pub code_state: String,
    pub report_section: String,
}

impl NoteRecord {
    /// Parse a reply, tolerating a surrounding markdown code fence
    pub fn parse(raw: &str) -> Result<Self, TeamError> {
        let body = strip_code_fence(raw.trim());
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| TeamError::InvalidNote(e.to_string()))?;
        if !value.is_object() {
            return Err(TeamError::InvalidNote("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| TeamError::InvalidNote(e.to_string()))
    }

    fn into_updates(self) -> Vec<StateUpdate> {
        vec![
            StateUpdate::Hypothesis(self.hypothesis),
            StateUpdate::SpecialistResult {
                specialist: Specialist::Visualization,
                content: self.visualization_state,
            },
            StateUpdate::SpecialistResult {
                specialist: Specialist::Search,
                content: self.searcher_state,
            },
            StateUpdate::SpecialistResult {
                specialist: Specialist::Coder,
                content: self.code_state,
            },
            StateUpdate::ReportSection(self.report_section),
        ]
    }
}

/// Node compressing accepted work into a [`NoteRecord`]
///
/// A reply that is not a valid note fails the node.
pub struct NoteNode {
    agent: Agent,
}

impl NoteNode {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Node<ResearchState> for NoteNode {
    async fn execute(&self, state: &ResearchState) -> Result<NodeOutput<StateUpdate>, NodeError> {
        let reply = self
            .agent
            .invoke(
                &state.history,
                Some("Record the notes for the work accepted so far.".to_string()),
            )
            .await?;
        let note = NoteRecord::parse(&reply.content)?;
        tracing::debug!(summary_len = note.summary.len(), "note recorded");

        let mut output =
            NodeOutput::new(Member::NoteTaker.sender_tag()).with(StateUpdate::AppendMessage(reply));
        output.updates.extend(note.into_updates());
        Ok(output)
    }
}

/// Node producing the final deliverable from the working directory's materials
pub struct RefinerNode {
    agent: Agent,
    working_directory: PathBuf,
}

impl RefinerNode {
    pub fn new(agent: Agent, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            working_directory: working_directory.into(),
        }
    }
}

/// File names in `dir`, sorted; empty when the directory cannot be read
pub async fn list_materials(dir: &Path) -> Vec<String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), error = %err, "no materials directory");
            return Vec::new();
        }
    };
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    names
}

#[async_trait]
impl Node<ResearchState> for RefinerNode {
    async fn execute(&self, state: &ResearchState) -> Result<NodeOutput<StateUpdate>, NodeError> {
        let materials = list_materials(&self.working_directory).await;
        let listing = if materials.is_empty() {
            "none".to_string()
        } else {
            materials.join(", ")
        };
        let task = format!(
            "Materials in {}: {}.\nRefine the research into the final report.",
            self.working_directory.display(),
            listing
        );

        let reply = self.agent.invoke(&state.history, Some(task)).await?;
        let text = reply.content.clone();
        Ok(NodeOutput::new(Member::Refiner.sender_tag())
            .with(StateUpdate::AppendMessage(reply))
            .with(StateUpdate::ReportSection(text)))
    }
}

/// Prompt shown at the HumanChoice checkpoint
pub const CHOICE_PROMPT: &str =
    "Review the hypothesis. Enter 1 (retry) to regenerate it or 2 (proceed) to continue research.";

/// Prompt shown at the HumanReview checkpoint
pub const REVIEW_PROMPT: &str =
    "Review the refined report. Approve it, or request a revision with optional feedback.";

/// Checkpoint after Hypothesis
pub fn human_choice_node(
    provider: Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>>,
) -> CheckpointNode<ResearchState, ChoiceDirective> {
    CheckpointNode::with_shared_provider(
        Member::HumanChoice.as_str(),
        CHOICE_PROMPT,
        provider,
        |choice: ChoiceDirective, _state: &ResearchState| {
            let tag = Member::HumanChoice.sender_tag();
            NodeOutput::new(tag)
                .with(StateUpdate::ChoiceDirective(choice.as_str().to_string()))
                .with(StateUpdate::AppendMessage(
                    Message::human(format!("Hypothesis decision: {}", choice.as_str())).with_name(tag),
                ))
        },
    )
}

/// Decision taken at the HumanReview checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Revise { feedback: Option<String> },
}

impl ReviewDecision {
    pub fn revise(feedback: impl Into<String>) -> Self {
        Self::Revise {
            feedback: Some(feedback.into()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Revise { .. } => "revise",
        }
    }
}

/// Checkpoint after Refiner
pub fn human_review_node(
    provider: Arc<dyn DecisionProvider<ResearchState, ReviewDecision>>,
) -> CheckpointNode<ResearchState, ReviewDecision> {
    CheckpointNode::with_shared_provider(
        Member::HumanReview.as_str(),
        REVIEW_PROMPT,
        provider,
        |decision: ReviewDecision, _state: &ResearchState| {
            let tag = Member::HumanReview.sender_tag();
            let output = NodeOutput::new(tag).with(StateUpdate::AppendMessage(
                Message::human(format!("Report decision: {}", decision.as_str())).with_name(tag),
            ));
            match decision {
                ReviewDecision::Approve => output.with(StateUpdate::NeedsRevision(false)),
                ReviewDecision::Revise { feedback } => {
                    let feedback = feedback
                        .filter(|text| !text.trim().is_empty())
                        .map(|text| StateUpdate::AppendMessage(Message::human(text).with_name(tag)));
                    output.with(StateUpdate::NeedsRevision(true)).with_opt(feedback)
                }
            }
        },
    )
}
