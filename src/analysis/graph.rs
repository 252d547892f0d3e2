//! Interaction graph built from turn-taking adjacency.
//!
//! Two participants are linked each time one speaks right after the other.
//! The graph is undirected: pairs are stored canonically sorted, so A→B and
//! B→A transitions add to the same edge.

use std::collections::{BTreeMap, HashMap};

use super::filter::FilteredTranscript;
use super::types::{LabeledMessage, Link};

/// Undirected weighted graph over participant labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionGraph {
    /// Node labels in first-encounter order
    nodes: Vec<String>,
    /// Label -> position in `nodes`
    index: HashMap<String, usize>,
    /// Canonically sorted pair -> number of transitions
    edges: BTreeMap<(String, String), u32>,
}

fn edge_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl InteractionGraph {
    /// Create a graph with the given nodes and no edges
    pub fn with_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::default();
        for node in nodes {
            let node: String = node.into();
            if !graph.index.contains_key(&node) {
                graph.index.insert(node.clone(), graph.nodes.len());
                graph.nodes.push(node);
            }
        }
        graph
    }

    /// Build the graph from filtered messages.
    ///
    /// `previous` advances on every message; an edge is counted only when
    /// both speakers are in the final node set and differ.
    pub fn from_messages(messages: &[LabeledMessage], nodes: &[String]) -> Self {
        let mut graph = Self::with_nodes(nodes.iter().cloned());

        let mut previous: Option<&str> = None;
        for message in messages {
            let current = message.label.as_str();
            if let Some(prev) = previous {
                if prev != current && graph.contains(prev) && graph.contains(current) {
                    graph.add_interaction(prev, current);
                }
            }
            previous = Some(current);
        }

        log::debug!(
            "Built interaction graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Build the graph from the output of the filter pipeline
    pub fn from_filtered(filtered: &FilteredTranscript) -> Self {
        Self::from_messages(&filtered.messages, &filtered.nodes)
    }

    /// Add one transition between two distinct nodes.
    ///
    /// Unknown endpoints and self-transitions are ignored.
    pub fn add_interaction(&mut self, a: &str, b: &str) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        *self.edges.entry(edge_key(a, b)).or_insert(0) += 1;
    }

    pub fn contains(&self, node: &str) -> bool {
        self.index.contains_key(node)
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Weight of the edge between two nodes (0 if none)
    pub fn weight(&self, a: &str, b: &str) -> u32 {
        self.edges.get(&edge_key(a, b)).copied().unwrap_or(0)
    }

    /// Iterate edges as (a, b, weight) with a < b
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.edges.iter().map(|((a, b), w)| (a.as_str(), b.as_str(), *w))
    }

    /// Index-based adjacency list aligned with [`nodes`](Self::nodes)
    pub fn adjacency(&self) -> Vec<Vec<(usize, u32)>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for (a, b, w) in self.edges() {
            if let (Some(&i), Some(&j)) = (self.index.get(a), self.index.get(b)) {
                adjacency[i].push((j, w));
                adjacency[j].push((i, w));
            }
        }
        adjacency
    }

    /// Edges as output links
    pub fn links(&self) -> Vec<Link> {
        self.edges()
            .map(|(source, target, weight)| Link {
                source: source.to_string(),
                target: target.to_string(),
                weight,
            })
            .collect()
    }
}
