use criterion::{black_box, criterion_group, criterion_main, Criterion};
use labflow_core::{FnRouter, GraphState, NodeOutput, RunConfig, StateGraph, END};

#[derive(Debug, Clone, Default)]
struct Tally {
    count: usize,
    log: Vec<String>,
}

impl GraphState for Tally {
    type Update = usize;

    fn apply(&mut self, update: usize) {
        self.count += update;
        self.log.push(format!("step {}", self.count));
    }
}

fn looping_graph(limit: usize) -> StateGraph<Tally> {
    let mut graph = StateGraph::new();
    graph
        .add_fn_node("tick", |_state| async move { Ok(NodeOutput::new("tick").with(1)) })
        .set_entry("tick")
        .add_conditional_edge(
            "tick",
            FnRouter::new("until_limit", ["tick", END], move |s: &Tally| {
                if s.count < limit { "tick".to_string() } else { END.to_string() }
            }),
        );
    graph
}

fn driver_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let compiled = looping_graph(100).compile().unwrap();

    c.bench_function("run 100 steps", |b| {
        b.iter(|| {
            runtime
                .block_on(compiled.run(black_box(Tally::default()), RunConfig::default()))
                .steps()
        });
    });

    let endless = looping_graph(usize::MAX).compile().unwrap();
    c.bench_function("abort at ceiling 100", |b| {
        b.iter(|| {
            runtime
                .block_on(endless.run(Tally::default(), RunConfig::default().with_step_ceiling(black_box(100))))
                .error
                .is_some()
        });
    });
}

criterion_group!(benches, driver_benchmark);
criterion_main!(benches);
