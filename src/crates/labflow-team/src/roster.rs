//! Team roster
//!
//! Every node of the research workflow is a [`Member`]. Four of them are
//! [`Specialist`]s: the supervisor dispatches work to them and the quality
//! reviewer can send their work back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node of the research workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Member {
    Hypothesis,
    HumanChoice,
    Process,
    Visualization,
    Search,
    Coder,
    Report,
    QualityReview,
    NoteTaker,
    Refiner,
    HumanReview,
}

impl Member {
    /// Every member, in wiring order
    pub const ALL: [Member; 11] = [
        Member::Hypothesis,
        Member::HumanChoice,
        Member::Process,
        Member::Visualization,
        Member::Search,
        Member::Coder,
        Member::Report,
        Member::QualityReview,
        Member::NoteTaker,
        Member::Refiner,
        Member::HumanReview,
    ];

    /// Members announced to agents as their peers
    pub const PEERS: [Member; 8] = [
        Member::Hypothesis,
        Member::Process,
        Member::Visualization,
        Member::Search,
        Member::Coder,
        Member::Report,
        Member::QualityReview,
        Member::Refiner,
    ];

    /// Node name in the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hypothesis => "Hypothesis",
            Self::HumanChoice => "HumanChoice",
            Self::Process => "Process",
            Self::Visualization => "Visualization",
            Self::Search => "Search",
            Self::Coder => "Coder",
            Self::Report => "Report",
            Self::QualityReview => "QualityReview",
            Self::NoteTaker => "NoteTaker",
            Self::Refiner => "Refiner",
            Self::HumanReview => "HumanReview",
        }
    }

    /// Tag recorded as `last_sender` and as the author of history entries
    pub fn sender_tag(&self) -> &'static str {
        match self {
            Self::Hypothesis => "hypothesis_agent",
            Self::HumanChoice => "human_choice",
            Self::Process => "process_agent",
            Self::Visualization => "visualization_agent",
            Self::Search => "searcher_agent",
            Self::Coder => "code_agent",
            Self::Report => "report_agent",
            Self::QualityReview => "quality_review_agent",
            Self::NoteTaker => "note_agent",
            Self::Refiner => "refiner_agent",
            Self::HumanReview => "human_review",
        }
    }

    /// The specialist this member is, if any
    pub fn specialist(&self) -> Option<Specialist> {
        match self {
            Self::Coder => Some(Specialist::Coder),
            Self::Search => Some(Specialist::Search),
            Self::Visualization => Some(Specialist::Visualization),
            Self::Report => Some(Specialist::Report),
            _ => None,
        }
    }

    /// Peer node names as strings
    pub fn peer_names() -> Vec<String> {
        Self::PEERS.iter().map(|m| m.as_str().to_string()).collect()
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member the supervisor can delegate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialist {
    Coder,
    Search,
    Visualization,
    Report,
}

impl Specialist {
    pub const ALL: [Specialist; 4] = [
        Specialist::Coder,
        Specialist::Search,
        Specialist::Visualization,
        Specialist::Report,
    ];

    /// The workflow node running this specialist
    pub fn member(&self) -> Member {
        match self {
            Self::Coder => Member::Coder,
            Self::Search => Member::Search,
            Self::Visualization => Member::Visualization,
            Self::Report => Member::Report,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.member().as_str()
    }

    /// Case-insensitive lookup by node name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
