//! Human decisions at the terminal
//!
//! [`Console`] asks on stderr and reads answers line by line. It answers both
//! checkpoints of the workflow, so one instance can back both providers.
//! [`AutoDecision`] answers without asking.

use async_trait::async_trait;
use colored::Colorize;
use labflow_core::{DecisionProvider, DecisionRequest, Directive, GraphError, Result};
use labflow_team::{ChoiceDirective, ResearchState, ReviewDecision};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;

/// Parse an answer at the HumanChoice checkpoint
pub fn parse_choice(line: &str) -> Option<ChoiceDirective> {
    ChoiceDirective::parse(line)
}

/// Parse an answer at the HumanReview checkpoint
///
/// `approve` (or `a`, `y`, `yes`) approves. `revise` (or `r`, `n`, `no`)
/// requests a revision; anything after it, optionally separated by a colon,
/// is the feedback.
pub fn parse_review(line: &str) -> Option<ReviewDecision> {
    let line = line.trim();
    let (head, rest) = match line.char_indices().find(|&(_, c)| c == ':' || c.is_whitespace()) {
        Some((at, sep)) => (&line[..at], line[at + sep.len_utf8()..].trim_start_matches(':').trim()),
        None => (line, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "a" | "approve" | "approved" | "y" | "yes" if rest.is_empty() => Some(ReviewDecision::Approve),
        "r" | "revise" | "n" | "no" => Some(ReviewDecision::Revise {
            feedback: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        _ => None,
    }
}

fn excerpt(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut)
}

/// Interactive decision source
pub struct Console<R> {
    lines: Mutex<Lines<BufReader<R>>>,
}

impl<R> Console<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(BufReader::new(reader).lines()),
        }
    }

    /// Ask until `parse` accepts an answer; end of input makes the decision unavailable
    async fn ask<D>(&self, node: &str, question: &str, parse: impl Fn(&str) -> Option<D>) -> Result<D> {
        let mut lines = self.lines.lock().await;
        loop {
            eprint!("{} ", question.cyan().bold());
            let line = lines
                .next_line()
                .await
                .map_err(|e| GraphError::decision_unavailable(node, format!("failed to read input: {}", e)))?
                .ok_or_else(|| GraphError::decision_unavailable(node, "input closed"))?;
            if let Some(decision) = parse(&line) {
                return Ok(decision);
            }
            eprintln!("{} {}", "Unrecognized answer:".yellow(), line.trim());
        }
    }
}

impl Console<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

#[async_trait]
impl<R> DecisionProvider<ResearchState, ChoiceDirective> for Console<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn decide(&self, request: DecisionRequest<ResearchState>) -> Result<ChoiceDirective> {
        eprintln!("\n{}", "Hypothesis".bold().underline());
        eprintln!("{}\n", excerpt(&request.state.hypothesis, 1200));
        eprintln!("{}", request.prompt);
        self.ask(&request.node, "[1/retry, 2/proceed]>", parse_choice).await
    }
}

#[async_trait]
impl<R> DecisionProvider<ResearchState, ReviewDecision> for Console<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn decide(&self, request: DecisionRequest<ResearchState>) -> Result<ReviewDecision> {
        eprintln!("\n{}", "Refined report".bold().underline());
        eprintln!("{}\n", excerpt(&request.state.report_section, 2000));
        eprintln!("{}", request.prompt);
        self.ask(&request.node, "[approve | revise: <feedback>]>", parse_review).await
    }
}

/// Provider that always returns the same decision
#[derive(Debug, Clone)]
pub struct AutoDecision<D> {
    decision: D,
}

impl<D> AutoDecision<D> {
    pub fn new(decision: D) -> Self {
        Self { decision }
    }
}

#[async_trait]
impl<D> DecisionProvider<ResearchState, D> for AutoDecision<D>
where
    D: Clone + std::fmt::Debug + Send + Sync + 'static,
{
    async fn decide(&self, request: DecisionRequest<ResearchState>) -> Result<D> {
        tracing::info!(node = %request.node, decision = ?self.decision, "checkpoint answered automatically");
        Ok(self.decision.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(node: &str) -> DecisionRequest<ResearchState> {
        DecisionRequest {
            node: node.to_string(),
            prompt: "?".to_string(),
            state: ResearchState::seeded("caffeine"),
        }
    }

    #[test]
    fn test_parse_review() {
        assert_eq!(parse_review("approve"), Some(ReviewDecision::Approve));
        assert_eq!(parse_review(" Y "), Some(ReviewDecision::Approve));
        assert_eq!(parse_review("revise"), Some(ReviewDecision::Revise { feedback: None }));
        assert_eq!(
            parse_review("revise: expand methodology"),
            Some(ReviewDecision::revise("expand methodology"))
        );
        assert_eq!(parse_review("r add a limitations section"), Some(ReviewDecision::revise("add a limitations section")));
        assert_eq!(parse_review("approve but shorter"), None);
        assert_eq!(parse_review(""), None);
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("2"), Some(ChoiceDirective::Proceed));
        assert_eq!(parse_choice("retry"), Some(ChoiceDirective::Retry));
        assert_eq!(parse_choice("later"), None);
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("  short  ", 10), "short");
        assert_eq!(excerpt("ééééé", 3), "ééé...");
    }

    #[tokio::test]
    async fn test_console_reprompts_until_valid() {
        let console = Console::new(&b"maybe\nproceed\n"[..]);
        let choice = DecisionProvider::<ResearchState, ChoiceDirective>::decide(&console, request("HumanChoice"))
            .await
            .unwrap();
        assert_eq!(choice, ChoiceDirective::Proceed);
    }

    #[tokio::test]
    async fn test_console_answers_both_checkpoints_in_order() {
        let console = Console::new(&b"1\nrevise: more data\n"[..]);
        let choice = DecisionProvider::<ResearchState, ChoiceDirective>::decide(&console, request("HumanChoice"))
            .await
            .unwrap();
        let review = DecisionProvider::<ResearchState, ReviewDecision>::decide(&console, request("HumanReview"))
            .await
            .unwrap();
        assert_eq!(choice, ChoiceDirective::Retry);
        assert_eq!(review, ReviewDecision::revise("more data"));
    }

    #[tokio::test]
    async fn test_closed_input_is_decision_unavailable() {
        let console = Console::new(&b"hmm\n"[..]);
        let result = DecisionProvider::<ResearchState, ReviewDecision>::decide(&console, request("HumanReview")).await;
        assert!(matches!(result, Err(GraphError::DecisionUnavailable { ref node, .. }) if node == "HumanReview"));
    }

    #[tokio::test]
    async fn test_auto_decision() {
        let auto = AutoDecision::new(ReviewDecision::Approve);
        assert_eq!(auto.decide(request("HumanReview")).await.unwrap(), ReviewDecision::Approve);
    }
}
