//! Core data types for conversation network analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single turn of a conversation after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Absolute time of the turn, if the source carried one
    pub timestamp: Option<DateTime<Utc>>,
    pub sender: String,
    pub content: String,
}

impl Message {
    pub fn new(timestamp: Option<DateTime<Utc>>, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            sender: sender.into(),
            content: content.into(),
        }
    }
}

/// A message that survived the per-message filters, tagged with the label
/// (raw sender or pseudonym) it contributes to the graph under
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMessage {
    pub label: String,
    pub message: Message,
}

/// Per-participant accumulation built during filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantStats {
    /// Sender as it appeared in the transcript
    pub raw_id: String,
    /// Node id used in the graph (pseudonym when anonymizing)
    pub label: String,
    pub message_count: usize,
    /// Index of the participant in first-encounter order
    pub first_seen: usize,
}

/// Five centrality scores for a single node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralityScores {
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub eigenvector: f64,
    pub pagerank: f64,
}

impl CentralityScores {
    /// Round every score to 4 decimal places
    pub fn rounded(self) -> Self {
        Self {
            degree: round4(self.degree),
            betweenness: round4(self.betweenness),
            closeness: round4(self.closeness),
            eigenvector: round4(self.eigenvector),
            pagerank: round4(self.pagerank),
        }
    }
}

/// Round to 4 decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Output node: participant plus its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub id: String,
    pub messages: usize,
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub eigenvector: f64,
    pub pagerank: f64,
}

/// Output link between two participants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

/// Final result of one analysis invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub nodes: Vec<NodeMetrics>,
    pub links: Vec<Link>,
}

impl NetworkGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&NodeMetrics> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up the link between two nodes regardless of direction
    pub fn link(&self, a: &str, b: &str) -> Option<&Link> {
        self.links.iter().find(|l| {
            (l.source == a && l.target == b) || (l.source == b && l.target == a)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
        assert_eq!(round4(0.33333333), 0.3333);
    }

    #[test]
    fn test_node_metrics_serialize_field_names() {
        let graph = NetworkGraph {
            nodes: vec![NodeMetrics {
                id: "A".to_string(),
                messages: 2,
                degree: 1.0,
                betweenness: 0.0,
                closeness: 1.0,
                eigenvector: 0.7071,
                pagerank: 0.5,
            }],
            links: vec![Link {
                source: "A".to_string(),
                target: "B".to_string(),
                weight: 2,
            }],
        };

        let json = serde_json::to_value(&graph).unwrap();
        let node = &json["nodes"][0];
        for key in ["id", "messages", "degree", "betweenness", "closeness", "eigenvector", "pagerank"] {
            assert!(node.get(key).is_some(), "missing node field {}", key);
        }
        assert_eq!(json["links"][0]["weight"], 2);
        assert!(graph.link("B", "A").is_some());
    }
}
