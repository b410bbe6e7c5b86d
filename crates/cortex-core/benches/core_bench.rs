//! Criterion benchmarks for cortex-core.
//!
//! ## Benchmark groups
//!
//! 1. **extraction**: structural and pattern symbol/import extraction.
//! 2. **pagerank**: both backends on synthetic import graphs.
//! 3. **ranking**: heuristic scoring plus rendering under a byte budget.
//! 4. **similarity**: graveyard scoring over an in-memory window.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/cortex-core/Cargo.toml
//! cargo bench --manifest-path crates/cortex-core/Cargo.toml -- pagerank
//! ```

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cortex_core::config::GraveyardConfig;
use cortex_core::graveyard::similarity::{idf_weights, rank_matches, FailureQuery, ScoringParams};
use cortex_core::graveyard::Graveyard;
use cortex_core::models::FileAnalysis;
use cortex_core::repomap::extract::extract;
use cortex_core::repomap::imports::DependencyEdge;
use cortex_core::repomap::pagerank::{pagerank_scores, PagerankBackendImpl, SimplePagerank};
use cortex_core::repomap::ranking::rank_files;
use cortex_core::repomap::render::render_text;
use cortex_core::store::{FailureStore, MemoryFailureStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn python_source(classes: usize) -> String {
    let mut out = String::from("import os\nfrom .helpers import load\nfrom ..core import db\n\n");
    for i in 0..classes {
        out.push_str(&format!(
            "class Service{i}:\n    def run(self):\n        return load({i})\n\n    async def stop(self):\n        pass\n\n"
        ));
    }
    out
}

fn ts_source(functions: usize) -> String {
    let mut out = String::from("import { a } from './a';\nimport b from '../b';\nconst c = require('./c');\n");
    for i in 0..functions {
        out.push_str(&format!("export function handler{i}(req) {{\n  return a(req);\n}}\n"));
    }
    out
}

/// Chain plus hub graph: every node imports its successor and node 0.
fn synthetic_graph(n: usize) -> (Vec<String>, Vec<DependencyEdge>) {
    let nodes: Vec<String> = (0..n).map(|i| format!("src/mod_{i}.py")).collect();
    let mut edges = Vec::with_capacity(n * 2);
    for i in 1..n {
        edges.push((nodes[i].clone(), nodes[0].clone()));
        if i + 1 < n {
            edges.push((nodes[i].clone(), nodes[i + 1].clone()));
        }
    }
    (nodes, edges)
}

fn synthetic_analyses(n: usize) -> Vec<FileAnalysis> {
    (0..n)
        .map(|i| FileAnalysis {
            path: format!("src/pkg_{}/module_{i}.py", i % 7),
            byte_size: 1200,
            line_count: 40 + i % 90,
            symbols: vec![format!("class Model{i}"), format!("def helper_{i}")],
            symbol_count: 2 + i % 5,
            imports: vec![],
        })
        .collect()
}

fn seeded_graveyard(n: usize) -> Graveyard<MemoryFailureStore> {
    let graveyard = Graveyard::new(MemoryFailureStore::new(), GraveyardConfig::default());
    let topics = ["redis timeout", "parser crash", "flaky test", "connection pool", "slow query"];
    for i in 0..n {
        let topic = topics[i % topics.len()];
        let files = vec![format!("src/area_{}/file_{}.py", i % 9, i % 13)];
        graveyard
            .record_failure(None, &format!("{topic} in job {i}"), "retried twice then gave up", &files)
            .unwrap();
    }
    graveyard
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    for size in [10, 100] {
        let py = python_source(size);
        let ts = ts_source(size);
        group.bench_with_input(BenchmarkId::new("python", size), &py, |b, text| {
            b.iter(|| extract(black_box("src/app.py"), black_box(text)))
        });
        group.bench_with_input(BenchmarkId::new("typescript", size), &ts, |b, text| {
            b.iter(|| extract(black_box("src/app.ts"), black_box(text)))
        });
    }
    group.finish();
}

fn bench_pagerank(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagerank");
    for size in [50, 400, 2000] {
        let (nodes, edges) = synthetic_graph(size);
        group.bench_with_input(BenchmarkId::new("default", size), &size, |b, _| {
            b.iter(|| pagerank_scores(black_box(&nodes), black_box(&edges)))
        });
        group.bench_with_input(BenchmarkId::new("simple", size), &size, |b, _| {
            let backend = SimplePagerank::default();
            b.iter(|| backend.rank(black_box(&nodes), black_box(&edges)))
        });
    }
    group.finish();
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    let analyses = synthetic_analyses(500);
    let graph: BTreeMap<String, f64> = analyses
        .iter()
        .enumerate()
        .map(|(i, a)| (a.path.clone(), 1.0 / (i + 1) as f64))
        .collect();
    let focus = vec!["src/pkg_3/module_10.py".to_string()];
    group.bench_function("rank_500", |b| {
        b.iter(|| rank_files(black_box(&analyses), black_box(&focus), 20, black_box(&graph)))
    });
    let ranked = rank_files(&analyses, &focus, 200, &graph);
    for budget in [256, 8192] {
        group.bench_with_input(BenchmarkId::new("render", budget), &budget, |b, &budget| {
            b.iter(|| render_text(black_box(&ranked), budget))
        });
    }
    group.finish();
}

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");
    let graveyard = seeded_graveyard(200);
    let window = graveyard.store().recent_failures(200).unwrap();
    let query = FailureQuery::new("redis latency during checkout", &["src/area_1/file_1.py"]);
    let params = ScoringParams {
        similarity_threshold: 0.35,
        min_keyword_overlap: 1,
    };
    group.bench_function("score_window_200", |b| {
        b.iter(|| {
            let idf = idf_weights(&query.keywords, &window);
            rank_matches(black_box(&query), black_box(&window), &idf, params, 5)
        })
    });
    let files = vec!["src/area_1/file_1.py".to_string()];
    group.bench_function("find_similar_200", |b| {
        b.iter(|| graveyard.find_similar(black_box("redis latency during checkout"), &files, None))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_pagerank,
    bench_ranking,
    bench_similarity
);
criterion_main!(benches);
