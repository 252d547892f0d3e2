//! Result assembly and report output.
//!
//! Joins the filtered participants, the interaction graph and the centrality
//! scores into a [`NetworkGraph`], and writes it out as JSON or a short
//! human-readable digest.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::filter::FilteredTranscript;
use super::graph::InteractionGraph;
use super::types::{CentralityScores, NetworkGraph, NodeMetrics};

/// Build the final result; scores are rounded to 4 decimals here
pub fn assemble(
    filtered: &FilteredTranscript,
    graph: &InteractionGraph,
    scores: &HashMap<String, CentralityScores>,
) -> NetworkGraph {
    let nodes = graph
        .nodes()
        .iter()
        .map(|id| {
            let s = scores.get(id).copied().unwrap_or_default().rounded();
            NodeMetrics {
                id: id.clone(),
                messages: filtered.message_count(id),
                degree: s.degree,
                betweenness: s.betweenness,
                closeness: s.closeness,
                eigenvector: s.eigenvector,
                pagerank: s.pagerank,
            }
        })
        .collect();

    NetworkGraph {
        nodes,
        links: graph.links(),
    }
}

/// Generate JSON report
pub fn generate_json_report(graph: &NetworkGraph, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(graph).context("Failed to serialize network graph to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Format a short digest: sizes plus the most central participants
pub fn format_summary(name: &str, graph: &NetworkGraph) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("=== {} ===", name));
    lines.push(format!("Participants: {}", graph.nodes.len()));
    lines.push(format!("Links: {}", graph.links.len()));
    lines.push(format!(
        "Interactions: {}",
        graph.links.iter().map(|l| u64::from(l.weight)).sum::<u64>()
    ));

    if graph.is_empty() {
        lines.push("No participants matched the filters.".to_string());
        return lines.join("\n");
    }

    let mut ranked: Vec<_> = graph.nodes.iter().collect();
    ranked.sort_by(|a, b| b.pagerank.total_cmp(&a.pagerank));

    lines.push(String::new());
    lines.push(format!(
        "  {:<20} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "id", "msgs", "degree", "between", "close", "eigen", "pagerank"
    ));
    for node in ranked.iter().take(10) {
        lines.push(format!(
            "  {:<20} {:>8} {:>8.4} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            node.id, node.messages, node.degree, node.betweenness, node.closeness, node.eigenvector, node.pagerank
        ));
    }
    if ranked.len() > 10 {
        lines.push(format!("  ... and {} more", ranked.len() - 10));
    }

    lines.join("\n")
}

/// Print summary to stdout
pub fn print_summary(name: &str, graph: &NetworkGraph) {
    println!("\n{}\n", format_summary(name, graph));
}
