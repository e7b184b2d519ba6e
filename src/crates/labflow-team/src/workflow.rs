//! Research workflow assembly
//!
//! ```text
//! START -> Hypothesis -> HumanChoice
//! HumanChoice  -(hypothesis_router)-> {Hypothesis, Process}
//! Process      -(process_router)->    {Coder, Search, Visualization, Report, Process, Refiner}
//! specialists  -> QualityReview
//! QualityReview -(quality_router)->   {Coder, Search, Visualization, Report, NoteTaker}
//! NoteTaker -> Process
//! Refiner -> HumanReview
//! HumanReview  -(review_router)->     {Process, END}
//! ```

use crate::agent::{Agent, AgentSpec, BackendRegistry, Tier, ToolKind};
use crate::config::{backends_from_config, TeamConfig};
use crate::directives::{hypothesis_router, process_router, quality_router, review_router, ChoiceDirective};
use crate::error::Result;
use crate::nodes::{
    human_choice_node, human_review_node, AgentNode, NoteNode, OutputMapping, RefinerNode, ReviewDecision,
};
use crate::prompts::{PromptSet, Role};
use crate::roster::{Member, Specialist};
use crate::state::ResearchState;
use labflow_core::{
    CompiledGraph, DecisionProvider, ResponseFormat, Result as GraphResult, RunConfig, RunReport, SnapshotStream,
    StateGraph, ToolExecutor, DEFAULT_STEP_CEILING,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything needed to assemble the workflow
pub struct WorkflowDeps {
    pub backends: BackendRegistry,
    pub prompts: PromptSet,
    pub working_directory: PathBuf,
    pub choices: Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>>,
    pub reviews: Arc<dyn DecisionProvider<ResearchState, ReviewDecision>>,
    /// Runs agent tool calls; without one, agents work without tools
    pub tools: Option<Arc<dyn ToolExecutor>>,
}

impl WorkflowDeps {
    /// Built-in prompts and the default working directory
    pub fn new(
        backends: BackendRegistry,
        choices: Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>>,
        reviews: Arc<dyn DecisionProvider<ResearchState, ReviewDecision>>,
    ) -> Self {
        Self {
            backends,
            prompts: PromptSet::builtin(),
            working_directory: PathBuf::from("./data_storage/"),
            choices,
            reviews,
            tools: None,
        }
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn with_tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(executor);
        self
    }
}

const RESEARCH_TOOLS: [ToolKind; 5] = [
    ToolKind::CollectData,
    ToolKind::Encyclopedia,
    ToolKind::WebSearch,
    ToolKind::ScrapeWebpage,
    ToolKind::Arxiv,
];

/// Tier, tools and instructions of an agent member
///
/// Returns `None` for the human checkpoints.
pub fn agent_spec(member: Member, prompts: &PromptSet) -> Option<AgentSpec> {
    use ToolKind::*;

    let (tier, role, tools): (Tier, Role, Vec<ToolKind>) = match member {
        Member::Hypothesis => (Tier::Light, Role::Hypothesis, RESEARCH_TOOLS.to_vec()),
        Member::Process => (Tier::Power, Role::Supervisor, Vec::new()),
        Member::Visualization => (
            Tier::Light,
            Role::Visualization,
            vec![ReadDocument, ExecuteCode, ExecuteCommand],
        ),
        Member::Coder => (Tier::Power, Role::Code, vec![ReadDocument, ExecuteCode, ExecuteCommand]),
        Member::Search => (
            Tier::Light,
            Role::Search,
            std::iter::once(ReadDocument).chain(RESEARCH_TOOLS).collect(),
        ),
        Member::Report => (Tier::Power, Role::Report, vec![CreateDocument, ReadDocument, EditDocument]),
        Member::QualityReview => (
            Tier::Light,
            Role::QualityReview,
            vec![CreateDocument, ReadDocument, EditDocument],
        ),
        Member::NoteTaker => (Tier::Structured, Role::Note, vec![ReadDocument]),
        Member::Refiner => (
            Tier::Power,
            Role::Refiner,
            [ReadDocument, EditDocument, CreateDocument]
                .into_iter()
                .chain(RESEARCH_TOOLS)
                .collect(),
        ),
        Member::HumanChoice | Member::HumanReview => return None,
    };
    let spec = AgentSpec::new(member, tier, prompts.get(role)).with_tools(tools);
    // the supervisor answers with {"next": ...}
    Some(match member {
        Member::Process => spec.with_format(ResponseFormat::Json),
        _ => spec,
    })
}

fn build_agent(member: Member, deps: &WorkflowDeps) -> GraphResult<Agent> {
    let spec = agent_spec(member, &deps.prompts)
        .ok_or_else(|| labflow_core::GraphError::configuration(format!("'{}' is not an agent", member)))?
        .with_working_directory(&deps.working_directory);
    let agent = Agent::new(spec, &deps.backends)?;
    Ok(match &deps.tools {
        Some(executor) => agent.with_tool_executor(Arc::clone(executor)),
        None => agent,
    })
}

/// Declare every node and edge of the research workflow
///
/// Fails with a configuration error when a tier has no backend.
pub fn build_workflow(deps: WorkflowDeps) -> GraphResult<StateGraph<ResearchState>> {
    let mut graph = StateGraph::new();

    graph.add_node(
        Member::Hypothesis.as_str(),
        AgentNode::new(build_agent(Member::Hypothesis, &deps)?, OutputMapping::Hypothesis),
    );
    graph.add_node(Member::HumanChoice.as_str(), human_choice_node(deps.choices.clone()));
    graph.add_node(
        Member::Process.as_str(),
        AgentNode::new(build_agent(Member::Process, &deps)?, OutputMapping::ProcessDecision),
    );
    for specialist in Specialist::ALL {
        let member = specialist.member();
        graph.add_node(
            member.as_str(),
            AgentNode::new(build_agent(member, &deps)?, OutputMapping::Specialist(specialist)),
        );
    }
    graph.add_node(
        Member::QualityReview.as_str(),
        AgentNode::new(build_agent(Member::QualityReview, &deps)?, OutputMapping::QualityReview),
    );
    graph.add_node(Member::NoteTaker.as_str(), NoteNode::new(build_agent(Member::NoteTaker, &deps)?));
    graph.add_node(
        Member::Refiner.as_str(),
        RefinerNode::new(build_agent(Member::Refiner, &deps)?, deps.working_directory.clone()),
    );
    graph.add_node(Member::HumanReview.as_str(), human_review_node(deps.reviews.clone()));

    graph
        .set_entry(Member::Hypothesis.as_str())
        .add_edge(Member::Hypothesis.as_str(), Member::HumanChoice.as_str())
        .add_conditional_edge(Member::HumanChoice.as_str(), hypothesis_router())
        .add_conditional_edge(Member::Process.as_str(), process_router());
    for specialist in Specialist::ALL {
        graph.add_edge(specialist.as_str(), Member::QualityReview.as_str());
    }
    graph
        .add_conditional_edge(Member::QualityReview.as_str(), quality_router())
        .add_edge(Member::NoteTaker.as_str(), Member::Process.as_str())
        .add_edge(Member::Refiner.as_str(), Member::HumanReview.as_str())
        .add_conditional_edge(Member::HumanReview.as_str(), review_router());

    Ok(graph)
}

/// Compiled research workflow plus its run settings
#[derive(Debug, Clone)]
pub struct ResearchTeam {
    graph: CompiledGraph<ResearchState>,
    step_ceiling: usize,
}

impl ResearchTeam {
    /// Assemble and compile the workflow
    pub fn new(deps: WorkflowDeps) -> Result<Self> {
        let graph = build_workflow(deps)?.compile()?;
        Ok(Self {
            graph,
            step_ceiling: DEFAULT_STEP_CEILING,
        })
    }

    /// Assemble from configuration, with remote backends for every tier
    pub async fn from_config(
        config: &TeamConfig,
        choices: Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>>,
        reviews: Arc<dyn DecisionProvider<ResearchState, ReviewDecision>>,
    ) -> Result<Self> {
        Self::from_config_with_backends(config, backends_from_config(&config.models)?, choices, reviews).await
    }

    /// Assemble from configuration with caller-supplied backends
    pub async fn from_config_with_backends(
        config: &TeamConfig,
        backends: BackendRegistry,
        choices: Arc<dyn DecisionProvider<ResearchState, ChoiceDirective>>,
        reviews: Arc<dyn DecisionProvider<ResearchState, ReviewDecision>>,
    ) -> Result<Self> {
        config.validate()?;
        let prompts = match &config.workflow.prompts_dir {
            Some(dir) => PromptSet::load(dir).await?,
            None => PromptSet::builtin(),
        };
        let deps = WorkflowDeps::new(backends, choices, reviews)
            .with_prompts(prompts)
            .with_working_directory(&config.workflow.working_directory);
        Ok(Self::new(deps)?.with_step_ceiling(config.workflow.step_ceiling))
    }

    pub fn with_step_ceiling(mut self, ceiling: usize) -> Self {
        self.step_ceiling = ceiling;
        self
    }

    pub fn graph(&self) -> &CompiledGraph<ResearchState> {
        &self.graph
    }

    pub fn step_ceiling(&self) -> usize {
        self.step_ceiling
    }

    fn run_config(&self) -> RunConfig {
        RunConfig::default().with_step_ceiling(self.step_ceiling)
    }

    /// Snapshots of a run, one per completed step
    pub fn stream(&self, request: impl Into<String>) -> SnapshotStream<ResearchState> {
        self.graph.stream(ResearchState::seeded(request), self.run_config())
    }

    /// Run to completion, keeping every snapshot
    pub async fn run(&self, request: impl Into<String>) -> RunReport<ResearchState> {
        let request = request.into();
        info!(request_len = request.len(), step_ceiling = self.step_ceiling, "research run starting");
        self.graph.run(ResearchState::seeded(request), self.run_config()).await
    }

    /// Run to completion, returning only the final state
    pub async fn invoke(&self, request: impl Into<String>) -> Result<ResearchState> {
        Ok(self.run(request).await.into_result()?)
    }
}
