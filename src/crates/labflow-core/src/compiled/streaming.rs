//! Streaming execution

use super::execution::Driver;
use super::graph::CompiledGraph;
use super::types::{RunConfig, SnapshotStream};
use crate::state::GraphState;
use std::sync::Arc;

impl<S: GraphState> CompiledGraph<S> {
    /// Stream one snapshot per completed node invocation
    ///
    /// The stream is lazy: nothing runs until it is polled. It ends after the
    /// graph reaches END, or right after yielding the first error.
    ///
    /// ```rust,ignore
    /// use futures::StreamExt;
    ///
    /// let mut snapshots = compiled.stream(ResearchState::seeded(prompt), RunConfig::default());
    /// while let Some(snapshot) = snapshots.next().await {
    ///     let snapshot = snapshot?;
    ///     println!("step {} ran {}", snapshot.step, snapshot.node);
    /// }
    /// ```
    pub fn stream(&self, input: S, config: RunConfig) -> SnapshotStream<S> {
        let graph = Arc::clone(&self.inner);
        let stream = async_stream::stream! {
            let mut driver = Driver::new(graph, input, config);
            loop {
                match driver.advance().await {
                    Ok(Some(snapshot)) => yield Ok(snapshot),
                    Ok(None) => break,
                    Err(error) => {
                        yield Err(error);
                        break;
                    }
                }
            }
        };
        Box::pin(stream)
    }
}
