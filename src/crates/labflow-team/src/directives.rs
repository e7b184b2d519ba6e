//! Routing directives and the workflow's routers
//!
//! Agents and humans answer in free text. Each conditional edge of the
//! workflow parses the relevant state field into an enumerated directive and
//! maps the directive to a node. Unparseable input never fails the run: it
//! resolves to the directive's fallback and is logged as a warning.
//!
//! | Router | Field | Directive | Fallback |
//! |--------|-------|-----------|----------|
//! | [`hypothesis_router`] | `choice_directive` | [`ChoiceDirective`] | `Retry` (back to Hypothesis) |
//! | [`process_router`] | `process_decision` | [`ProcessDirective`] | `Deliberate` (Process again) |
//! | [`quality_router`] | `quality_review` | [`QualityVerdict`] | `Accept` (NoteTaker) |
//! | [`review_router`] | `needs_revision` | `bool` | n/a |

use crate::roster::{Member, Specialist};
use crate::state::ResearchState;
use labflow_core::{Directive, DirectiveRouter, FnRouter, NodeId, END};
use regex::Regex;
use std::sync::OnceLock;

/// Body of a markdown code fence, or the trimmed text when there is none
///
/// Models often wrap JSON in ```` ```json ```` fences even when asked not to.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (```json, ```JSON, ...) when the fence has one
    let rest = match rest.split_once('\n') {
        Some((info, body)) if !info.contains('{') => body,
        _ => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Decision taken at the HumanChoice checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceDirective {
    /// Regenerate the hypothesis
    Retry,
    /// Hand the hypothesis to the supervisor
    Proceed,
}

impl ChoiceDirective {
    /// Canonical text stored in `choice_directive`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Proceed => "proceed",
        }
    }
}

impl Directive for ChoiceDirective {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "retry" | "regenerate" | "regenerate hypothesis" | "retry hypothesis" => Some(Self::Retry),
            "2" | "proceed" | "continue" | "continue research" | "proceed to supervisor" => {
                Some(Self::Proceed)
            }
            _ => None,
        }
    }

    /// Without explicit consent the hypothesis is regenerated
    fn fallback() -> Self {
        Self::Retry
    }
}

/// Next step chosen by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDirective {
    /// Dispatch work to a specialist
    Delegate(Specialist),
    /// Think again before dispatching
    Deliberate,
    /// Work is complete, move to refinement
    Finish,
}

impl ProcessDirective {
    fn from_word(word: &str) -> Option<Self> {
        let word = word
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`');
        if let Some(specialist) = Specialist::from_name(word) {
            return Some(Self::Delegate(specialist));
        }
        match word.to_ascii_lowercase().as_str() {
            "process" => Some(Self::Deliberate),
            "finish" | "refiner" => Some(Self::Finish),
            _ => None,
        }
    }
}

impl Directive for ProcessDirective {
    /// Accepts a bare member name or a JSON object with a `next` field,
    /// either of them optionally inside a code fence
    fn parse(raw: &str) -> Option<Self> {
        let raw = strip_code_fence(raw);
        if raw.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(raw).ok()?;
            return value
                .get("next")
                .and_then(|next| next.as_str())
                .and_then(Self::from_word);
        }
        Self::from_word(raw)
    }

    fn fallback() -> Self {
        Self::Deliberate
    }
}

/// Verdict of the quality reviewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityVerdict {
    /// Work is good enough, take notes
    Accept,
    /// Send the work back to its producer
    Revise,
}

fn revise_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)\b(revise|revision|rejected?|redo|rework|insufficient|unsatisfactory|unacceptable|incomplete)\b",
            r"|\b(not|isn't|is not|never)\s+(yet\s+)?(accept(ed|able)?|approved?|satisfactory|sufficient|complete|good enough|ready)\b",
            r"|\bneeds?\s+(some\s+|more\s+|further\s+|additional\s+)?(work|changes|improvement)\b",
        ))
        .expect("static pattern is valid")
    })
}

fn accept_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(accept(ed|able)?|approved?|pass(ed)?|satisfactory|complete|good enough)\b")
            .expect("static pattern is valid")
    })
}

impl QualityVerdict {
    /// Verdict announced by the first word of the reply, if any
    fn leading(raw: &str) -> Option<Self> {
        let word: String = raw
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .chars()
            .take_while(|c| c.is_alphanumeric())
            .collect();
        match word.to_ascii_lowercase().as_str() {
            "accept" | "accepted" | "approve" | "approved" | "pass" | "passed" | "lgtm" => Some(Self::Accept),
            "revise" | "revision" | "reject" | "rejected" | "redo" | "rework" => Some(Self::Revise),
            _ => None,
        }
    }
}

impl Directive for QualityVerdict {
    /// A leading ACCEPT or REVISE decides. Otherwise revision wording,
    /// negated approval included, wins over acceptance wording.
    fn parse(raw: &str) -> Option<Self> {
        if let Some(verdict) = Self::leading(raw) {
            return Some(verdict);
        }
        if revise_pattern().is_match(raw) {
            Some(Self::Revise)
        } else if accept_pattern().is_match(raw) {
            Some(Self::Accept)
        } else {
            None
        }
    }

    fn fallback() -> Self {
        Self::Accept
    }
}

fn choice_field(state: &ResearchState) -> &str {
    &state.choice_directive
}

fn process_field(state: &ResearchState) -> &str {
    &state.process_decision
}

fn quality_field(state: &ResearchState) -> &str {
    &state.quality_review
}

/// HumanChoice -> {Hypothesis, Process}
pub fn hypothesis_router() -> DirectiveRouter<ResearchState, ChoiceDirective> {
    DirectiveRouter::new(
        "hypothesis_router",
        [Member::Hypothesis.as_str(), Member::Process.as_str()],
        choice_field,
        |directive, _state: &ResearchState| match directive {
            ChoiceDirective::Retry => Member::Hypothesis.as_str().to_string(),
            ChoiceDirective::Proceed => Member::Process.as_str().to_string(),
        },
    )
}

/// Process -> {Coder, Search, Visualization, Report, Process, Refiner}
pub fn process_router() -> DirectiveRouter<ResearchState, ProcessDirective> {
    let targets = Specialist::ALL
        .iter()
        .map(|s| s.as_str())
        .chain([Member::Process.as_str(), Member::Refiner.as_str()]);
    DirectiveRouter::new(
        "process_router",
        targets,
        process_field,
        |directive, _state: &ResearchState| match directive {
            ProcessDirective::Delegate(specialist) => specialist.as_str().to_string(),
            ProcessDirective::Deliberate => Member::Process.as_str().to_string(),
            ProcessDirective::Finish => Member::Refiner.as_str().to_string(),
        },
    )
}

/// QualityReview -> {Coder, Search, Visualization, Report, NoteTaker}
///
/// A rejection returns to the specialist recorded in `review_target`.
pub fn quality_router() -> DirectiveRouter<ResearchState, QualityVerdict> {
    let targets = Specialist::ALL
        .iter()
        .map(|s| s.as_str())
        .chain([Member::NoteTaker.as_str()]);
    DirectiveRouter::new(
        "quality_router",
        targets,
        quality_field,
        |verdict, state: &ResearchState| match (verdict, state.review_target) {
            (QualityVerdict::Revise, Some(producer)) => producer.as_str().to_string(),
            (QualityVerdict::Revise, None) => {
                tracing::warn!("revision requested but no producer is under review");
                Member::NoteTaker.as_str().to_string()
            }
            (QualityVerdict::Accept, _) => Member::NoteTaker.as_str().to_string(),
        },
    )
}

/// HumanReview -> {Process, END}
pub fn review_router() -> FnRouter<ResearchState> {
    FnRouter::new(
        "review_router",
        [Member::Process.as_str(), END],
        |state: &ResearchState| -> NodeId {
            if state.needs_revision {
                Member::Process.as_str().to_string()
            } else {
                END.to_string()
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_core::Router;

    fn with_choice(raw: &str) -> ResearchState {
        ResearchState {
            choice_directive: raw.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hypothesis_router() {
        let router = hypothesis_router();
        assert_eq!(router.route(&with_choice("retry")), "Hypothesis");
        assert_eq!(router.route(&with_choice("  Proceed ")), "Process");
        assert_eq!(router.route(&with_choice("2")), "Process");
    }

    #[test]
    fn test_hypothesis_router_fallback_never_raises() {
        let router = hypothesis_router();
        for raw in ["", "maybe?", "proceed please", "🙂"] {
            let next = router.route(&with_choice(raw));
            assert_eq!(next, "Hypothesis");
            assert!(router.targets().contains(&next));
        }
    }

    #[test]
    fn test_process_directive_parsing() {
        assert_eq!(ProcessDirective::parse("Search"), Some(ProcessDirective::Delegate(Specialist::Search)));
        assert_eq!(ProcessDirective::parse("\"coder\""), Some(ProcessDirective::Delegate(Specialist::Coder)));
        assert_eq!(ProcessDirective::parse("FINISH"), Some(ProcessDirective::Finish));
        assert_eq!(ProcessDirective::parse("Process"), Some(ProcessDirective::Deliberate));
        assert_eq!(
            ProcessDirective::parse(r#"{"next": "Visualization", "reason": "need a chart"}"#),
            Some(ProcessDirective::Delegate(Specialist::Visualization))
        );
        assert_eq!(ProcessDirective::parse(r#"{"next": 3}"#), None);
        assert_eq!(ProcessDirective::parse("{not json"), None);
        assert_eq!(ProcessDirective::parse("NoteTaker"), None);
    }

    #[test]
    fn test_process_router_targets_and_fallback() {
        let router = process_router();
        let state = |raw: &str| ResearchState {
            process_decision: raw.to_string(),
            ..Default::default()
        };
        assert_eq!(router.route(&state("Report")), "Report");
        assert_eq!(router.route(&state("FINISH")), "Refiner");
        assert_eq!(router.route(&state("I am not sure")), "Process");
        assert_eq!(router.route(&state("")), "Process");
        assert_eq!(router.targets().len(), 6);
    }

    #[test]
    fn test_quality_verdict_parsing() {
        assert_eq!(QualityVerdict::parse("Accepted. Good sources."), Some(QualityVerdict::Accept));
        assert_eq!(QualityVerdict::parse("Revision needed: cite the 2019 study"), Some(QualityVerdict::Revise));
        assert_eq!(QualityVerdict::parse("Not accepted, please revise"), Some(QualityVerdict::Revise));
        assert_eq!(QualityVerdict::parse("**REVISE** the axis labels"), Some(QualityVerdict::Revise));
        assert_eq!(QualityVerdict::parse("The analysis is complete and correct."), Some(QualityVerdict::Accept));
        assert_eq!(QualityVerdict::parse("The analysis is incomplete."), Some(QualityVerdict::Revise));
        assert_eq!(QualityVerdict::parse("hmm"), None);
    }

    #[test]
    fn test_leading_verdict_wins_over_later_wording() {
        assert_eq!(
            QualityVerdict::parse("ACCEPT. The issues from the earlier revision are resolved."),
            Some(QualityVerdict::Accept)
        );
        assert_eq!(
            QualityVerdict::parse("REVISE: the results are accepted practice but unsupported here"),
            Some(QualityVerdict::Revise)
        );
    }

    #[test]
    fn test_quality_router_reads_everyday_verdicts() {
        let router = quality_router();
        let review = |raw: &str| ResearchState {
            quality_review: raw.to_string(),
            review_target: Some(Specialist::Search),
            ..Default::default()
        };
        let cases = [
            ("ACCEPT. The issues from the earlier revision are resolved.", "NoteTaker"),
            ("Not accepted.", "Search"),
            ("Needs more work on the search results: only one source is peer reviewed.", "Search"),
            ("This is not satisfactory.", "Search"),
            ("needs work", "Search"),
            ("Please rework the summary.", "Search"),
            ("Looks good enough to me.", "NoteTaker"),
        ];
        for (raw, expected) in cases {
            assert_eq!(router.route(&review(raw)), expected, "verdict: {raw}");
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"next\": \"Search\"}\n```"), r#"{"next": "Search"}"#);
        assert_eq!(strip_code_fence("  ```JSON\n{}\n```  "), "{}");
        assert_eq!(strip_code_fence("```{\"a\": 1}```"), r#"{"a": 1}"#);
        assert_eq!(strip_code_fence("```\nSearch\n```"), "Search");
        assert_eq!(strip_code_fence(" plain "), "plain");
    }

    #[test]
    fn test_fenced_supervisor_reply_is_not_deliberation() {
        assert_eq!(
            ProcessDirective::resolve("```json\n{\"next\": \"Search\"}\n```"),
            (ProcessDirective::Delegate(Specialist::Search), false)
        );
        assert_eq!(
            ProcessDirective::parse("```\nFINISH\n```"),
            Some(ProcessDirective::Finish)
        );
        let router = process_router();
        let state = ResearchState {
            process_decision: "```json\n{\"next\": \"Report\"}\n```".into(),
            ..Default::default()
        };
        assert_eq!(router.route(&state), "Report");
    }

    #[test]
    fn test_quality_rejection_returns_to_producer() {
        let router = quality_router();
        for producer in Specialist::ALL {
            let state = ResearchState {
                quality_review: "REVISE: missing error bars".into(),
                review_target: Some(producer),
                ..Default::default()
            };
            assert_eq!(router.route(&state), producer.as_str());
        }
    }

    #[test]
    fn test_quality_accept_and_fallback_go_to_notes() {
        let router = quality_router();
        let accepted = ResearchState {
            quality_review: "approved".into(),
            review_target: Some(Specialist::Coder),
            ..Default::default()
        };
        let garbled = ResearchState {
            quality_review: "¯\\_(ツ)_/¯".into(),
            review_target: Some(Specialist::Coder),
            ..Default::default()
        };
        assert_eq!(router.route(&accepted), "NoteTaker");
        assert_eq!(router.route(&garbled), "NoteTaker");
    }

    #[test]
    fn test_review_router() {
        let router = review_router();
        let revise = ResearchState {
            needs_revision: true,
            ..Default::default()
        };
        assert_eq!(router.route(&revise), "Process");
        assert_eq!(router.route(&ResearchState::default()), END);
    }
}
