//! Role instructions
//!
//! Each agent role has built-in instructions. A prompts directory can
//! override any of them with a `<role>.txt` file; roles without a file keep
//! the built-in text.

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Agent roles that take instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Hypothesis,
    Supervisor,
    Visualization,
    Code,
    Search,
    Report,
    QualityReview,
    Note,
    Refiner,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Hypothesis,
        Role::Supervisor,
        Role::Visualization,
        Role::Code,
        Role::Search,
        Role::Report,
        Role::QualityReview,
        Role::Note,
        Role::Refiner,
    ];

    /// File name looked up in the prompts directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Role::Hypothesis => "hypothesis.txt",
            Role::Supervisor => "supervisor.txt",
            Role::Visualization => "visualization.txt",
            Role::Code => "code.txt",
            Role::Search => "search.txt",
            Role::Report => "report.txt",
            Role::QualityReview => "quality_review.txt",
            Role::Note => "note.txt",
            Role::Refiner => "refiner.txt",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            Role::Hypothesis => HYPOTHESIS,
            Role::Supervisor => SUPERVISOR,
            Role::Visualization => VISUALIZATION,
            Role::Code => CODE,
            Role::Search => SEARCH,
            Role::Report => REPORT,
            Role::QualityReview => QUALITY_REVIEW,
            Role::Note => NOTE,
            Role::Refiner => REFINER,
        }
    }
}

const HYPOTHESIS: &str = "\
Study the user's request and any data in the working directory, then propose one \
specific, testable research hypothesis. State the hypothesis first, followed by the \
evidence that motivates it and the analyses that would test it.";

const SUPERVISOR: &str = "\
You coordinate the specialists. Given the conversation so far, decide who acts next: \
Search gathers literature and data, Coder runs analyses, Visualization produces charts, \
Report writes up results. Choose Process to think again, or FINISH when the research is \
complete and ready for refinement.";

const VISUALIZATION: &str = "\
Produce clear charts that support the hypothesis. Save every figure to the working \
directory and describe what each one shows.";

const CODE: &str = "\
Write and run the analysis code the task requires. Save scripts and outputs to the working \
directory and summarize the results, including any errors you hit.";

const SEARCH: &str = "\
Search the literature and the web for evidence bearing on the hypothesis. Cite every \
source and save a summary of findings to the working directory.";

const REPORT: &str = "\
Write the research report from the work done so far: introduction, methods, results and \
discussion. Save it to the working directory.";

const QUALITY_REVIEW: &str = "\
Review the most recent specialist output for accuracy and completeness. Start your reply \
with ACCEPT if it is good enough, or REVISE followed by concrete instructions if it is not.";

const NOTE: &str = "\
Compress the conversation into durable notes. Reply with a single JSON object with the \
fields: summary, hypothesis, visualization_state, searcher_state, code_state, \
report_section. Use empty strings for fields with nothing to record.";

const REFINER: &str = "\
Refine the research into a final, polished report. Use the materials in the working \
directory, resolve inconsistencies, and return the complete refined report.";

/// Instructions for every role
#[derive(Debug, Clone)]
pub struct PromptSet {
    overrides: HashMap<Role, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptSet {
    /// Built-in instructions only
    pub fn builtin() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Built-in instructions, overridden by files found in `dir`
    pub async fn load(dir: &Path) -> Result<Self> {
        let mut prompts = Self::builtin();
        for role in Role::ALL {
            let path = dir.join(role.file_name());
            if !path.exists() {
                continue;
            }
            let text = fs::read_to_string(&path).await?;
            debug!(path = %path.display(), ?role, "loaded role instructions");
            prompts.overrides.insert(role, text);
        }
        Ok(prompts)
    }

    /// Override one role in code
    pub fn with_override(mut self, role: Role, text: impl Into<String>) -> Self {
        self.overrides.insert(role, text.into());
        self
    }

    /// Instructions for `role`
    pub fn get(&self, role: Role) -> &str {
        self.overrides
            .get(&role)
            .map(String::as_str)
            .unwrap_or_else(|| role.builtin())
    }
}
