//! # Talkgraph - conversation network analysis
//!
//! This library turns conversation transcripts into participant interaction
//! networks and scores every participant with five centrality metrics.
//!
//! ## Overview
//!
//! Two participants are linked each time one of them speaks right after the
//! other. Edge weights count those turn-taking transitions. The resulting
//! undirected graph is scored with degree, betweenness, closeness,
//! eigenvector and PageRank centrality.
//!
//! ## Key Features
//!
//! - **Three transcript shapes**: line-oriented chat exports, talk-page
//!   wikitext split by signatures, and pre-structured thread records
//! - **Filters**: time window, first/last N, message length, keywords,
//!   username, message-count bounds, top-K active, explicit participant set
//! - **Anonymization**: stable per-run pseudonyms (`User_n`, `Phone_n`)
//! - **Deterministic**: the same transcript and options always give the same result
//!
//! ## Architecture
//!
//! - `analysis::transcript`: raw transcript shapes and normalization into messages
//! - `analysis::options`: typed analysis options and the query-parameter request form
//! - `analysis::filter`: the staged filter pipeline
//! - `analysis::anonymize`: pseudonym assignment
//! - `analysis::graph`: turn-taking interaction graph
//! - `analysis::centrality`: the five centrality metrics
//! - `analysis::report`: result assembly and report output
//! - `source`: transcript sources and the source error type
//! - `config_loader`: loading analysis options from YAML or JSON files
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use talkgraph::analysis::{self, AnalysisRequest};
//! use talkgraph::source::FileSource;
//!
//! let request = AnalysisRequest {
//!     min_messages: Some(2),
//!     anonymize: true,
//!     ..Default::default()
//! };
//!
//! let graph = analysis::analyze_source(&FileSource::new("chat.txt"), &request.to_options())?;
//! for node in &graph.nodes {
//!     println!("{}: pagerank {}", node.id, node.pagerank);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! The only hard error is [`source::SourceError`], raised when a transcript
//! cannot be obtained. Malformed lines, records and option values are
//! skipped or treated as absent and logged through the `log` facade.

pub mod analysis;
pub mod config_loader;
pub mod source;
