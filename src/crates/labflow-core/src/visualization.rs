//! Graph visualization
//!
//! Renders a compiled graph as a Mermaid flowchart, suitable for pasting into
//! markdown:
//!
//! ```text
//! graph TD
//!     __start__((START))
//!     __end__((END))
//!     Hypothesis["Hypothesis"]
//!     HumanChoice{{"HumanChoice"}}
//!     __start__ --> Hypothesis
//!     Hypothesis --> HumanChoice
//!     HumanChoice -.->|hypothesis_router| Hypothesis
//! ```
//!
//! Checkpoints are drawn as hexagons, task nodes as rectangles, and
//! conditional transitions as dotted arrows labelled with the router name.

use crate::compiled::CompiledGraph;
use crate::graph::{Edge, END, START};
use crate::node::NodeKind;
use crate::state::GraphState;
use std::fmt::Write;

impl<S: GraphState> CompiledGraph<S> {
    /// Render the graph as a Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        let _ = writeln!(out, "    {}((START))", START);
        let _ = writeln!(out, "    {}((END))", END);

        for name in self.node_names() {
            let label = escape(name);
            match self.node_kind(name) {
                Some(NodeKind::Checkpoint) => {
                    let _ = writeln!(out, "    {}{{{{\"{}\"}}}}", sanitize_id(name), label);
                }
                _ => {
                    let _ = writeln!(out, "    {}[\"{}\"]", sanitize_id(name), label);
                }
            }
        }

        let _ = writeln!(out, "    {} --> {}", START, sanitize_id(self.entry()));

        for name in self.node_names() {
            match self.edge(name) {
                Some(Edge::Direct(target)) => {
                    let _ = writeln!(out, "    {} --> {}", sanitize_id(name), sanitize_id(target));
                }
                Some(Edge::Conditional(router)) => {
                    for target in router.targets() {
                        let _ = writeln!(
                            out,
                            "    {} -.->|{}| {}",
                            sanitize_id(name),
                            escape(router.name()),
                            sanitize_id(&target)
                        );
                    }
                }
                None => {}
            }
        }

        let _ = writeln!(out, "    style {} fill:#90EE90,stroke:#228B22", START);
        let _ = writeln!(out, "    style {} fill:#FFB6C1,stroke:#DC143C", END);
        out
    }
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('"', "#quot;").replace('|', "#124;")
}
