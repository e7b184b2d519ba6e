//! The research team's shared state record
//!
//! One [`ResearchState`] is threaded through the whole workflow. Nodes write
//! to it only through [`StateUpdate`] variants, which makes the set of
//! writable fields and their merge rules explicit:
//!
//! | Field | Written by | Rule |
//! |-------|------------|------|
//! | `history` | every node | append |
//! | `hypothesis` | Hypothesis, NoteTaker | overwrite, blank ignored |
//! | `choice_directive` | HumanChoice | overwrite |
//! | `process_decision` | Process | overwrite |
//! | `visualization_state` / `searcher_state` / `code_state` | matching specialist, NoteTaker | overwrite, blank ignored |
//! | `report_section` | Report, Refiner, NoteTaker | overwrite, blank ignored |
//! | `quality_review` | QualityReview | overwrite |
//! | `needs_revision` | HumanReview | overwrite |
//! | `review_target` | specialists | overwrite |
//! | `last_sender` | driver, after every node | overwrite |
//!
//! Result fields keep their previous value when an agent produces blank
//! output. Directive fields (`choice_directive`, `process_decision`,
//! `quality_review`) always take the latest value so a blank directive falls
//! through to the router's fallback instead of replaying a stale one.

use crate::roster::Specialist;
use labflow_core::{GraphState, Message};
use serde::{Deserialize, Serialize};

/// Shared state of one research run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    pub history: Vec<Message>,
    pub hypothesis: String,
    pub choice_directive: String,
    pub process_decision: String,
    pub visualization_state: String,
    pub searcher_state: String,
    pub code_state: String,
    pub report_section: String,
    pub quality_review: String,
    pub needs_revision: bool,
    pub last_sender: String,
    pub review_target: Option<Specialist>,
}

impl ResearchState {
    /// Initial state for a run: the request seeds the history
    ///
    /// An empty request is accepted and still produces one history entry.
    pub fn seeded(request: impl Into<String>) -> Self {
        Self {
            history: vec![Message::human(request)],
            ..Default::default()
        }
    }

    /// Result blob of a specialist
    pub fn specialist_state(&self, specialist: Specialist) -> &str {
        match specialist {
            Specialist::Coder => &self.code_state,
            Specialist::Search => &self.searcher_state,
            Specialist::Visualization => &self.visualization_state,
            Specialist::Report => &self.report_section,
        }
    }

    /// Most recent history entry
    pub fn last_message(&self) -> Option<&Message> {
        labflow_core::get_last_message(&self.history)
    }
}

/// Tagged partial update of [`ResearchState`]
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// Append to `history`
    AppendMessage(Message),
    Hypothesis(String),
    ChoiceDirective(String),
    ProcessDecision(String),
    /// Result of a specialist, stored in that specialist's field
    SpecialistResult {
        specialist: Specialist,
        content: String,
    },
    ReportSection(String),
    QualityReview(String),
    NeedsRevision(bool),
    ReviewTarget(Specialist),
}

fn overwrite_unless_blank(field: &mut String, value: String) {
    if value.trim().is_empty() {
        tracing::debug!("blank result ignored, keeping previous value");
        return;
    }
    *field = value;
}

impl GraphState for ResearchState {
    type Update = StateUpdate;

    fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::AppendMessage(message) => self.history.push(message),
            StateUpdate::Hypothesis(text) => overwrite_unless_blank(&mut self.hypothesis, text),
            StateUpdate::ChoiceDirective(text) => self.choice_directive = text,
            StateUpdate::ProcessDecision(text) => self.process_decision = text,
            StateUpdate::SpecialistResult { specialist, content } => {
                let field = match specialist {
                    Specialist::Coder => &mut self.code_state,
                    Specialist::Search => &mut self.searcher_state,
                    Specialist::Visualization => &mut self.visualization_state,
                    Specialist::Report => &mut self.report_section,
                };
                overwrite_unless_blank(field, content);
            }
            StateUpdate::ReportSection(text) => overwrite_unless_blank(&mut self.report_section, text),
            StateUpdate::QualityReview(text) => self.quality_review = text,
            StateUpdate::NeedsRevision(flag) => self.needs_revision = flag,
            StateUpdate::ReviewTarget(specialist) => self.review_target = Some(specialist),
        }
    }

    fn record_sender(&mut self, sender: &str) {
        self.last_sender = sender.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_seeded_state() {
        let state = ResearchState::seeded("Does caffeine improve reaction time?");
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0], Message::human("Does caffeine improve reaction time?"));
        assert!(state.hypothesis.is_empty());
        assert!(!state.needs_revision);
        assert!(state.review_target.is_none());
    }

    #[test]
    fn test_empty_seed_still_has_history() {
        let state = ResearchState::seeded("");
        assert_eq!(state.history.len(), 1);
        assert!(state.history[0].is_blank());
    }

    #[test]
    fn test_specialist_result_lands_in_its_field() {
        let mut state = ResearchState::default();
        state.apply(StateUpdate::SpecialistResult {
            specialist: Specialist::Search,
            content: "three papers found".into(),
        });
        assert_eq!(state.searcher_state, "three papers found");
        assert_eq!(state.specialist_state(Specialist::Search), "three papers found");
        assert!(state.code_state.is_empty());
    }

    #[test]
    fn test_blank_result_never_clears() {
        let mut state = ResearchState::default();
        state.apply(StateUpdate::Hypothesis("caffeine helps".into()));
        state.apply(StateUpdate::Hypothesis("   ".into()));
        state.apply(StateUpdate::ReportSection("draft".into()));
        state.apply(StateUpdate::ReportSection(String::new()));
        assert_eq!(state.hypothesis, "caffeine helps");
        assert_eq!(state.report_section, "draft");
    }

    #[test]
    fn test_directives_always_overwrite() {
        let mut state = ResearchState::default();
        state.apply(StateUpdate::ProcessDecision("Search".into()));
        state.apply(StateUpdate::ProcessDecision(String::new()));
        assert!(state.process_decision.is_empty());
    }

    #[test]
    fn test_scalar_merge_is_idempotent_history_is_not() {
        let scalar = StateUpdate::QualityReview("accepted".into());
        let mut once = ResearchState::default();
        once.apply(scalar.clone());
        let mut twice = once.clone();
        twice.apply(scalar);
        assert_eq!(once, twice);

        let append = StateUpdate::AppendMessage(Message::assistant("note"));
        let mut once = ResearchState::default();
        once.apply(append.clone());
        let mut twice = once.clone();
        twice.apply(append);
        assert_ne!(once, twice);
        assert_eq!(twice.history.len(), 2);
    }

    fn any_update() -> impl Strategy<Value = StateUpdate> {
        let specialist = prop_oneof![
            Just(Specialist::Coder),
            Just(Specialist::Search),
            Just(Specialist::Visualization),
            Just(Specialist::Report),
        ];
        prop_oneof![
            ".*".prop_map(|t| StateUpdate::AppendMessage(Message::assistant(t))),
            ".*".prop_map(StateUpdate::Hypothesis),
            ".*".prop_map(StateUpdate::ChoiceDirective),
            ".*".prop_map(StateUpdate::ProcessDecision),
            (specialist.clone(), ".*")
                .prop_map(|(specialist, content)| StateUpdate::SpecialistResult { specialist, content }),
            ".*".prop_map(StateUpdate::ReportSection),
            ".*".prop_map(StateUpdate::QualityReview),
            any::<bool>().prop_map(StateUpdate::NeedsRevision),
            specialist.prop_map(StateUpdate::ReviewTarget),
        ]
    }

    proptest! {
        #[test]
        fn prop_history_is_append_only(updates in proptest::collection::vec(any_update(), 0..40)) {
            let mut state = ResearchState::seeded("seed");
            let mut previous = state.history.clone();
            for update in updates {
                state.apply(update);
                prop_assert!(state.history.len() >= previous.len());
                prop_assert_eq!(&state.history[..previous.len()], &previous[..]);
                previous = state.history.clone();
            }
        }

        #[test]
        fn prop_non_blank_results_are_never_lost(text in "[a-z]{1,20}", blank in "[ \t]{0,5}") {
            let mut state = ResearchState::default();
            state.apply(StateUpdate::SpecialistResult { specialist: Specialist::Coder, content: text.clone() });
            state.apply(StateUpdate::SpecialistResult { specialist: Specialist::Coder, content: blank });
            prop_assert_eq!(state.code_state, text);
        }
    }
}
