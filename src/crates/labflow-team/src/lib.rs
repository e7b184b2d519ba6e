//! # labflow-team - A multi-agent research team
//!
//! Wires hypothesis generation, a supervising process agent, four
//! specialists, quality review, note taking and refinement into a single
//! [`labflow_core`] state graph with two human checkpoints:
//!
//! - **HumanChoice** after the hypothesis: retry it or proceed.
//! - **HumanReview** after refinement: approve the report or send it back
//!   to the supervisor with feedback.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use labflow_team::{ChoiceDirective, ConfigLoader, ResearchTeam, ReviewDecision};
//! use labflow_core::ScriptedDecisions;
//! use std::sync::Arc;
//!
//! let config = ConfigLoader::new().load().await?;
//! let team = ResearchTeam::from_config(
//!     &config,
//!     Arc::new(ScriptedDecisions::new([ChoiceDirective::Proceed])),
//!     Arc::new(ScriptedDecisions::new([ReviewDecision::Approve])),
//! )
//! .await?;
//!
//! let state = team.invoke("Does caffeine improve reaction time?").await?;
//! println!("{}", state.report_section);
//! ```

pub mod agent;
pub mod config;
pub mod directives;
pub mod error;
pub mod nodes;
pub mod prompts;
pub mod roster;
pub mod state;
pub mod testing;
pub mod workflow;

pub use agent::{Agent, AgentSpec, BackendRegistry, Tier, ToolKind, MAX_TOOL_ROUNDS};
pub use config::{
    backends_from_config, expand_env_vars, ConfigLoader, LogFormat, LoggingConfig, ModelConfig, ModelsConfig,
    TeamConfig, WorkflowConfig,
};
pub use directives::{
    hypothesis_router, process_router, quality_router, review_router, ChoiceDirective, ProcessDirective,
    QualityVerdict,
};
pub use error::{Result, TeamError};
pub use nodes::{
    human_choice_node, human_review_node, AgentNode, NoteNode, NoteRecord, OutputMapping, RefinerNode,
    ReviewDecision, CHOICE_PROMPT, REVIEW_PROMPT,
};
pub use prompts::{PromptSet, Role};
pub use roster::{Member, Specialist};
pub use state::{ResearchState, StateUpdate};
pub use workflow::{agent_spec, build_workflow, ResearchTeam, WorkflowDeps};
