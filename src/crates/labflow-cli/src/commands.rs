//! Subcommand handlers

use crate::console::{AutoDecision, Console};
use async_trait::async_trait;
use colored::Colorize;
use futures::StreamExt;
use labflow_core::{ChatModel, ChatRequest, ChatResponse, DecisionProvider, GraphError, StateSnapshot};
use labflow_team::{
    BackendRegistry, ChoiceDirective, ResearchState, ResearchTeam, ReviewDecision, TeamConfig, WorkflowDeps,
};
use std::sync::Arc;

/// Options of the `run` subcommand
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub auto_approve: bool,
    pub max_steps: Option<usize>,
    pub json: bool,
}

type Providers = (
    Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>>,
    Arc<dyn DecisionProvider<ResearchState, ReviewDecision>>,
);

fn providers(auto_approve: bool) -> Providers {
    if auto_approve {
        return (
            Arc::new(AutoDecision::new(ChoiceDirective::Proceed)),
            Arc::new(AutoDecision::new(ReviewDecision::Approve)),
        );
    }
    let console = Arc::new(Console::stdin());
    let choices: Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>> = console.clone();
    (choices, console)
}

/// One line of human-readable output for a snapshot
pub fn render_snapshot(snapshot: &StateSnapshot<ResearchState>) -> String {
    let last = snapshot
        .state
        .last_message()
        .map(|m| m.content.trim().to_string())
        .unwrap_or_default();
    format!("{} {}\n{}", format!("[{}]", snapshot.step).dimmed(), snapshot.node.bold(), last)
}

/// Stream a research run, printing every step
pub async fn run(config: TeamConfig, prompt: String, options: RunOptions) -> anyhow::Result<()> {
    let (choices, reviews) = providers(options.auto_approve);
    let mut team = ResearchTeam::from_config(&config, choices, reviews).await?;
    if let Some(max_steps) = options.max_steps {
        anyhow::ensure!(max_steps > 0, "--max-steps must be greater than zero");
        team = team.with_step_ceiling(max_steps);
    }

    tracing::info!(step_ceiling = team.step_ceiling(), "research run starting");
    let mut stream = team.stream(prompt);
    let mut last: Option<StateSnapshot<ResearchState>> = None;
    while let Some(item) = stream.next().await {
        let snapshot = item?;
        if options.json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            println!("{}\n", render_snapshot(&snapshot));
        }
        last = Some(snapshot);
    }

    if !options.json {
        let steps = last.as_ref().map(|s| s.step).unwrap_or_default();
        println!("{} after {} steps", "✓ Research complete".green().bold(), steps);
        if let Some(snapshot) = last {
            println!("\n{}\n{}", "Final report".bold().underline(), snapshot.state.report_section.trim());
        }
    }
    Ok(())
}

/// Backend for assembling the graph without calling a model
struct Unwired;

#[async_trait]
impl ChatModel for Unwired {
    async fn chat(&self, _request: ChatRequest) -> labflow_core::Result<ChatResponse> {
        Err(GraphError::backend("unwired", "graph rendering does not call models"))
    }

    fn model_name(&self) -> &str {
        "unwired"
    }
}

/// Mermaid rendering of the workflow
pub fn graph() -> anyhow::Result<String> {
    let deps = WorkflowDeps::new(
        BackendRegistry::uniform(Arc::new(Unwired)),
        Arc::new(AutoDecision::new(ChoiceDirective::Proceed)),
        Arc::new(AutoDecision::new(ReviewDecision::Approve)),
    );
    Ok(ResearchTeam::new(deps)?.graph().to_mermaid())
}

/// Effective configuration as TOML, with API keys masked
pub fn config(config: &TeamConfig) -> anyhow::Result<String> {
    let mut masked = config.clone();
    for model in [
        &mut masked.models.light,
        &mut masked.models.power,
        &mut masked.models.structured,
    ] {
        if !model.api_key.is_empty() && !model.api_key.starts_with("${") {
            model.api_key = "********".to_string();
        }
    }
    Ok(masked.to_toml()?)
}

/// True when the run stopped at the step ceiling
pub fn is_non_convergence(err: &anyhow::Error) -> bool {
    if let Some(err) = err.downcast_ref::<GraphError>() {
        return err.is_non_convergence();
    }
    err.downcast_ref::<labflow_team::TeamError>()
        .map(|err| err.is_non_convergence())
        .unwrap_or(false)
}
