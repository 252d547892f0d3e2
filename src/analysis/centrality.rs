//! Centrality metrics for interaction graphs.
//!
//! Computes degree, betweenness, closeness, eigenvector and PageRank
//! centrality. Degree and betweenness always cover the full graph.
//! Closeness, eigenvector and PageRank are only computed on the largest
//! connected component (the first one found on ties); every node outside it
//! scores 0.0 for those three. Iterative metrics that fail to converge, or
//! that are undefined because the component has no edges, also score 0.0.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

use super::graph::InteractionGraph;
use super::options::EdgeWeight;
use super::types::CentralityScores;

/// Iteration cap for eigenvector and PageRank power iteration
pub const MAX_ITERATIONS: usize = 1000;

/// PageRank damping factor
pub const DAMPING: f64 = 0.85;

/// Per-node convergence tolerance; the stopping threshold is `n * TOLERANCE`
pub const TOLERANCE: f64 = 1e-6;

/// Relative slack when comparing weighted path lengths for equality
const PATH_EPSILON: f64 = 1e-9;

/// Index-based adjacency list: node -> [(neighbor, weight)]
pub type Adjacency = Vec<Vec<(usize, u32)>>;

/// Find connected components with BFS, in node order.
///
/// Components are returned in the order of their lowest node index, and the
/// nodes of each component in BFS order from that node.
pub fn connected_components(adjacency: &Adjacency) -> Vec<Vec<usize>> {
    let mut visited = vec![false; adjacency.len()];
    let mut components = Vec::new();

    for start in 0..adjacency.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(node) = queue.pop_front() {
            component.push(node);
            for &(neighbor, _) in &adjacency[node] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        components.push(component);
    }

    components
}

/// Pick the largest component; the first one found wins ties
pub fn largest_component(components: &[Vec<usize>]) -> Option<&Vec<usize>> {
    components
        .iter()
        .fold(None, |best: Option<&Vec<usize>>, c| match best {
            Some(b) if b.len() >= c.len() => Some(b),
            _ => Some(c),
        })
}

/// Restrict an adjacency list to a set of nodes, re-indexed in the given order
pub fn subgraph(adjacency: &Adjacency, nodes: &[usize]) -> Adjacency {
    let local: HashMap<usize, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    nodes
        .iter()
        .map(|&n| {
            adjacency[n]
                .iter()
                .filter_map(|&(m, w)| local.get(&m).map(|&j| (j, w)))
                .collect()
        })
        .collect()
}

fn edge_count(adjacency: &Adjacency) -> usize {
    adjacency.iter().map(Vec::len).sum::<usize>() / 2
}

/// Degree centrality: neighbor count / (n - 1), 0 for graphs with fewer than 2 nodes
pub fn degree_centrality(adjacency: &Adjacency) -> Vec<f64> {
    let n = adjacency.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;
    adjacency.iter().map(|nbrs| nbrs.len() as f64 * scale).collect()
}

/// Dijkstra frontier entry ordered as a min-heap on cost
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frontier {
    cost: f64,
    node: usize,
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn same_length(a: f64, b: f64) -> bool {
    (a - b).abs() <= PATH_EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Weighted shortest-path betweenness (Brandes), normalized for undirected graphs
pub fn betweenness_centrality(adjacency: &Adjacency, edge_weight: EdgeWeight) -> Vec<f64> {
    let n = adjacency.len();
    let mut betweenness = vec![0.0; n];
    if n <= 2 {
        return betweenness;
    }

    for source in 0..n {
        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![f64::INFINITY; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();

        sigma[source] = 1.0;
        dist[source] = 0.0;
        heap.push(Frontier { cost: 0.0, node: source });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if settled[node] {
                continue;
            }
            settled[node] = true;
            order.push(node);

            for &(next, weight) in &adjacency[node] {
                if settled[next] {
                    continue;
                }
                let candidate = cost + edge_weight.cost(weight);
                if dist[next].is_infinite() || (candidate < dist[next] && !same_length(candidate, dist[next])) {
                    dist[next] = candidate;
                    sigma[next] = sigma[node];
                    preds[next] = vec![node];
                    heap.push(Frontier { cost: candidate, node: next });
                } else if same_length(candidate, dist[next]) {
                    sigma[next] += sigma[node];
                    preds[next].push(node);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        for &w in order.iter().rev() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                betweenness[w] += delta[w];
            }
        }
    }

    // Each unordered pair was counted from both endpoints
    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    betweenness.iter_mut().for_each(|b| *b *= scale);
    betweenness
}

/// Hop-distance closeness for a connected adjacency list
pub fn closeness_centrality(adjacency: &Adjacency) -> Vec<f64> {
    let n = adjacency.len();
    (0..n)
        .map(|source| {
            let mut dist: Vec<Option<usize>> = vec![None; n];
            dist[source] = Some(0);
            let mut queue = VecDeque::from([source]);
            let mut total = 0usize;
            let mut reached = 0usize;

            while let Some(node) = queue.pop_front() {
                let d = dist[node].unwrap_or(0);
                for &(next, _) in &adjacency[node] {
                    if dist[next].is_none() {
                        dist[next] = Some(d + 1);
                        total += d + 1;
                        reached += 1;
                        queue.push_back(next);
                    }
                }
            }

            if total == 0 {
                0.0
            } else {
                let raw = reached as f64 / total as f64;
                // Scale by the reachable share of the graph
                raw * reached as f64 / (n - 1) as f64
            }
        })
        .collect()
}

/// Weighted eigenvector centrality by power iteration.
///
/// Iterates `x <- (A + I) x` from a uniform start with L2 normalization.
/// Returns `None` when the graph has no edges or the iteration does not
/// converge within `max_iterations`.
pub fn eigenvector_centrality(adjacency: &Adjacency, max_iterations: usize) -> Option<Vec<f64>> {
    let n = adjacency.len();
    if n == 0 || edge_count(adjacency) == 0 {
        return None;
    }

    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..max_iterations {
        let last = x.clone();
        for (node, nbrs) in adjacency.iter().enumerate() {
            for &(next, weight) in nbrs {
                x[next] += last[node] * f64::from(weight);
            }
        }

        let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        x.iter_mut().for_each(|v| *v /= norm);

        let err: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if err < n as f64 * TOLERANCE {
            return Some(x);
        }
    }

    log::warn!(
        "Eigenvector centrality did not converge after {} iterations",
        max_iterations
    );
    None
}

/// Weighted PageRank by power iteration.
///
/// Returns `None` when the graph has no edges or the iteration does not
/// converge within `max_iterations`.
pub fn pagerank(adjacency: &Adjacency, damping: f64, max_iterations: usize) -> Option<Vec<f64>> {
    let n = adjacency.len();
    if n == 0 || edge_count(adjacency) == 0 {
        return None;
    }

    let strength: Vec<f64> = adjacency
        .iter()
        .map(|nbrs| nbrs.iter().map(|&(_, w)| f64::from(w)).sum())
        .collect();
    let uniform = 1.0 / n as f64;

    let mut x = vec![uniform; n];
    for _ in 0..max_iterations {
        let last = x.clone();
        let dangling: f64 = damping
            * (0..n)
                .filter(|&i| strength[i] == 0.0)
                .map(|i| last[i])
                .sum::<f64>();

        x.iter_mut().for_each(|v| *v = dangling * uniform + (1.0 - damping) * uniform);
        for (node, nbrs) in adjacency.iter().enumerate() {
            if strength[node] == 0.0 {
                continue;
            }
            for &(next, weight) in nbrs {
                x[next] += damping * last[node] * f64::from(weight) / strength[node];
            }
        }

        let err: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if err < n as f64 * TOLERANCE {
            return Some(x);
        }
    }

    log::warn!("PageRank did not converge after {} iterations", max_iterations);
    None
}

/// Computes all five metrics under the disconnected-graph policy
#[derive(Debug, Clone, Copy)]
pub struct CentralityEngine {
    pub edge_weight: EdgeWeight,
    pub damping: f64,
    pub max_iterations: usize,
}

impl Default for CentralityEngine {
    fn default() -> Self {
        Self {
            edge_weight: EdgeWeight::default(),
            damping: DAMPING,
            max_iterations: MAX_ITERATIONS,
        }
    }
}

impl CentralityEngine {
    pub fn new(edge_weight: EdgeWeight) -> Self {
        Self {
            edge_weight,
            ..Self::default()
        }
    }

    /// Compute unrounded scores for every node of the graph
    pub fn compute(&self, graph: &InteractionGraph) -> HashMap<String, CentralityScores> {
        let nodes = graph.nodes();
        let adjacency = graph.adjacency();
        let mut scores = vec![CentralityScores::default(); nodes.len()];

        for (score, degree) in scores.iter_mut().zip(degree_centrality(&adjacency)) {
            score.degree = degree;
        }
        for (score, b) in scores
            .iter_mut()
            .zip(betweenness_centrality(&adjacency, self.edge_weight))
        {
            score.betweenness = b;
        }

        let components = connected_components(&adjacency);
        if let Some(core) = largest_component(&components) {
            if components.len() > 1 {
                log::info!(
                    "Graph has {} components; closeness, eigenvector and PageRank use the largest ({} nodes)",
                    components.len(),
                    core.len()
                );
            }

            let sub = subgraph(&adjacency, core);
            let closeness = closeness_centrality(&sub);
            let eigenvector = eigenvector_centrality(&sub, self.max_iterations);
            let pagerank = pagerank(&sub, self.damping, self.max_iterations);

            for (local, &node) in core.iter().enumerate() {
                let score = &mut scores[node];
                score.closeness = closeness[local];
                score.eigenvector = eigenvector.as_ref().map_or(0.0, |v| v[local]);
                score.pagerank = pagerank.as_ref().map_or(0.0, |v| v[local]);
            }
        }

        nodes.iter().cloned().zip(scores).collect()
    }
}
