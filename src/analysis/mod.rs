//! Conversation network analysis.
//!
//! Turns a transcript into a participant interaction network: normalize the
//! raw transcript, filter and optionally anonymize it, link participants who
//! speak in adjacent turns, then score every node with five centrality
//! metrics.

pub mod types;
pub mod transcript;
pub mod options;
pub mod anonymize;
pub mod filter;
pub mod graph;
pub mod centrality;
pub mod report;

use rayon::prelude::*;

use crate::source::{SourceError, TranscriptSource};

pub use types::*;
pub use transcript::RawTranscript;
pub use options::{AnalysisOptions, AnalysisRequest, EdgeWeight};
pub use filter::apply_filters;
pub use graph::InteractionGraph;
pub use centrality::CentralityEngine;
pub use report::{generate_json_report, print_summary};

/// Run the full pipeline on one transcript.
///
/// Never fails: malformed input degrades to fewer messages, and an empty
/// selection yields an empty graph.
pub fn analyze(transcript: &RawTranscript, options: &AnalysisOptions) -> NetworkGraph {
    let filtered = apply_filters(transcript.messages(), options);
    if filtered.nodes.is_empty() {
        log::info!("No participants left after filtering");
        return NetworkGraph::default();
    }

    let graph = InteractionGraph::from_filtered(&filtered);
    let scores = CentralityEngine::new(options.edge_weight).compute(&graph);
    let result = report::assemble(&filtered, &graph, &scores);

    log::info!(
        "Analysis complete: {} nodes, {} links",
        result.nodes.len(),
        result.links.len()
    );
    result
}

/// Load a transcript from a source and analyze it
pub fn analyze_source(
    source: &dyn TranscriptSource,
    options: &AnalysisOptions,
) -> Result<NetworkGraph, SourceError> {
    log::info!("Analyzing {}", source.name());
    let transcript = source.load()?;
    Ok(analyze(&transcript, options))
}

/// Analyze independent (source, options) jobs in parallel.
///
/// Results come back in input order, paired with the source name.
pub fn analyze_batch<S>(jobs: &[(S, AnalysisOptions)]) -> Vec<(String, Result<NetworkGraph, SourceError>)>
where
    S: TranscriptSource,
{
    log::info!("Analyzing {} transcripts in parallel...", jobs.len());

    jobs.par_iter()
        .map(|(source, options)| {
            let result = analyze_source(source, options);
            if let Err(e) = &result {
                log::warn!("Failed to analyze {}: {}", source.name(), e);
            }
            (source.name(), result)
        })
        .collect()
}
