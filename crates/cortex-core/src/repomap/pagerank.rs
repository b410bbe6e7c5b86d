//! PageRank over file dependency edges.
//!
//! Backends implement `PagerankBackendImpl` and are tried in order; an
//! empty result means "unavailable, try the next one". Scores returned by
//! `pagerank_scores` are rescaled so the top node is exactly 1.0.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::guards::{PAGERANK_DAMPING, PAGERANK_MAX_ITER, PAGERANK_TOLERANCE};
use crate::models::PagerankBackend;
use crate::repomap::imports::DependencyEdge;

pub trait PagerankBackendImpl {
    fn kind(&self) -> PagerankBackend;

    /// Raw (sum-to-one) ranks keyed by node, or an empty map when the
    /// backend cannot handle this graph.
    fn rank(&self, nodes: &[String], edges: &[DependencyEdge]) -> HashMap<String, f64>;
}

// ---------------------------------------------------------------------------
// Library backend
// ---------------------------------------------------------------------------

#[cfg(feature = "graph")]
pub struct PetgraphPagerank;

#[cfg(feature = "graph")]
impl PagerankBackendImpl for PetgraphPagerank {
    fn kind(&self) -> PagerankBackend {
        PagerankBackend::Petgraph
    }

    fn rank(&self, nodes: &[String], edges: &[DependencyEdge]) -> HashMap<String, f64> {
        use petgraph::graph::{DiGraph, NodeIndex};

        use crate::guards::LIBRARY_PAGERANK_MAX_NODES;

        if nodes.is_empty() || nodes.len() > LIBRARY_PAGERANK_MAX_NODES {
            return HashMap::new();
        }
        let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            index.insert(node.as_str(), graph.add_node(()));
        }
        let mut seen: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
        for (src, dst) in edges {
            if let (Some(&a), Some(&b)) = (index.get(src.as_str()), index.get(dst.as_str())) {
                if a != b && seen.insert((a, b)) {
                    graph.add_edge(a, b, ());
                }
            }
        }

        let ranks = petgraph::algo::page_rank(&graph, PAGERANK_DAMPING, PAGERANK_MAX_ITER);
        if ranks.len() != nodes.len() || ranks.iter().any(|r| !r.is_finite()) {
            return HashMap::new();
        }
        nodes
            .iter()
            .map(|node| (node.clone(), ranks[index[node.as_str()].index()]))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Power-iteration backend
// ---------------------------------------------------------------------------

/// Dependency-free power iteration with dangling-mass redistribution.
pub struct SimplePagerank {
    pub alpha: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for SimplePagerank {
    fn default() -> Self {
        Self {
            alpha: PAGERANK_DAMPING,
            max_iter: PAGERANK_MAX_ITER,
            tolerance: PAGERANK_TOLERANCE,
        }
    }
}

impl PagerankBackendImpl for SimplePagerank {
    fn kind(&self) -> PagerankBackend {
        PagerankBackend::Simple
    }

    fn rank(&self, nodes: &[String], edges: &[DependencyEdge]) -> HashMap<String, f64> {
        let n = nodes.len();
        if n == 0 {
            return HashMap::new();
        }
        let position: HashMap<&str, usize> =
            nodes.iter().enumerate().map(|(i, p)| (p.as_str(), i)).collect();
        let mut outgoing: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut incoming: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        for (src, dst) in edges {
            if let (Some(&a), Some(&b)) = (position.get(src.as_str()), position.get(dst.as_str())) {
                outgoing[a].insert(b);
                incoming[b].insert(a);
            }
        }

        let nf = n as f64;
        let base = (1.0 - self.alpha) / nf;
        let mut rank = vec![1.0 / nf; n];
        for _ in 0..self.max_iter {
            let dangling: f64 = (0..n).filter(|&i| outgoing[i].is_empty()).map(|i| rank[i]).sum();
            let mut next = vec![0.0; n];
            let mut diff = 0.0;
            for node in 0..n {
                let inbound: f64 = incoming[node]
                    .iter()
                    .map(|&src| rank[src] / outgoing[src].len() as f64)
                    .sum();
                next[node] = base + self.alpha * (inbound + dangling / nf);
                diff += (next[node] - rank[node]).abs();
            }
            rank = next;
            if diff <= self.tolerance {
                break;
            }
        }

        let total: f64 = rank.iter().sum();
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let value = if total > 0.0 { rank[i] / total } else { 0.0 };
                (node.clone(), value)
            })
            .collect()
    }
}

/// Backends in trial order for this build.
pub fn default_backends() -> Vec<Box<dyn PagerankBackendImpl>> {
    let mut backends: Vec<Box<dyn PagerankBackendImpl>> = Vec::new();
    #[cfg(feature = "graph")]
    backends.push(Box::new(PetgraphPagerank));
    backends.push(Box::new(SimplePagerank::default()));
    backends
}

/// Max-normalized scores plus the backend that produced them.
pub fn pagerank_scores(
    nodes: &[String],
    edges: &[DependencyEdge],
) -> (BTreeMap<String, f64>, PagerankBackend) {
    pagerank_scores_with(&default_backends(), nodes, edges)
}

pub fn pagerank_scores_with(
    backends: &[Box<dyn PagerankBackendImpl>],
    nodes: &[String],
    edges: &[DependencyEdge],
) -> (BTreeMap<String, f64>, PagerankBackend) {
    if nodes.is_empty() {
        return (BTreeMap::new(), PagerankBackend::None);
    }
    let mut chosen: Option<(HashMap<String, f64>, PagerankBackend)> = None;
    for backend in backends {
        let ranks = backend.rank(nodes, edges);
        if ranks.is_empty() {
            debug!("PageRank backend {} unavailable; trying next", backend.kind().as_str());
            continue;
        }
        chosen = Some((ranks, backend.kind()));
        break;
    }
    let Some((ranks, kind)) = chosen else {
        return (nodes.iter().map(|n| (n.clone(), 0.0)).collect(), PagerankBackend::None);
    };

    let peak = ranks.values().copied().fold(0.0_f64, f64::max);
    let scores = nodes
        .iter()
        .map(|node| {
            let raw = ranks.get(node).copied().unwrap_or(0.0);
            let scaled = if peak > 0.0 { raw / peak } else { 0.0 };
            (node.clone(), scaled)
        })
        .collect();
    (scores, kind)
}
