//! Conversation network analysis CLI.
//!
//! Builds participant interaction networks from transcripts and reports
//! per-participant centrality metrics.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, Context, Result};

use talkgraph::analysis::{self, AnalysisRequest, EdgeWeight, Message};
use talkgraph::config_loader::{self, RequestOverrides};
use talkgraph::source::{FileSource, TranscriptFormat, TranscriptSource};

#[derive(Parser)]
#[command(name = "talkgraph")]
#[command(about = "Social-interaction graphs and centrality metrics from conversation transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the interaction network and centrality metrics for each file
    Analyze {
        /// Transcript files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Transcript format (auto, chat, talk, records)
        #[arg(long, default_value = "auto")]
        format: TranscriptFormat,

        /// YAML or JSON file with analysis options
        #[arg(long)]
        options: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output directory for JSON reports (prints JSON to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the normalized messages of a transcript as JSON
    Parse {
        /// Transcript file
        file: PathBuf,

        /// Transcript format (auto, chat, talk, records)
        #[arg(long, default_value = "auto")]
        format: TranscriptFormat,
    },
}

/// Filter flags; each one overrides the same key from --options
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Start time (HH:MM or HH:MM:SS)
    #[arg(long)]
    start_time: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<String>,

    /// End time (HH:MM or HH:MM:SS)
    #[arg(long)]
    end_time: Option<String>,

    /// Keep only the first or last N messages
    #[arg(long)]
    limit: Option<usize>,

    /// Which end the limit keeps (first, last)
    #[arg(long)]
    limit_type: Option<String>,

    /// Minimum message length in characters
    #[arg(long)]
    min_length: Option<usize>,

    /// Maximum message length in characters
    #[arg(long)]
    max_length: Option<usize>,

    /// Comma-separated keywords; a message must contain one of them
    #[arg(long)]
    keywords: Option<String>,

    /// Minimum messages per participant
    #[arg(long)]
    min_messages: Option<usize>,

    /// Maximum messages per participant
    #[arg(long)]
    max_messages: Option<usize>,

    /// Keep only the K most active participants
    #[arg(long)]
    active_users: Option<usize>,

    /// Comma-separated participant ids to keep
    #[arg(long)]
    selected_users: Option<String>,

    /// Keep only messages from this sender
    #[arg(long)]
    username: Option<String>,

    /// Replace participant names with pseudonyms
    #[arg(long)]
    anonymize: bool,

    /// How betweenness reads interaction counts (strength, cost)
    #[arg(long)]
    edge_weight: Option<EdgeWeight>,
}

impl From<FilterArgs> for RequestOverrides {
    fn from(args: FilterArgs) -> Self {
        RequestOverrides {
            start_date: args.start_date,
            start_time: args.start_time,
            end_date: args.end_date,
            end_time: args.end_time,
            limit: args.limit,
            limit_type: args.limit_type,
            min_length: args.min_length,
            max_length: args.max_length,
            keywords: args.keywords,
            min_messages: args.min_messages,
            max_messages: args.max_messages,
            active_users: args.active_users,
            selected_users: args.selected_users,
            username: args.username,
            anonymize: args.anonymize,
            edge_weight: args.edge_weight,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    // Set thread pool size
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Analyze {
            files,
            format,
            options,
            filters,
            output,
        } => run_analyze(files, format, options.as_deref(), filters, output.as_deref()),
        Commands::Parse { file, format } => run_parse(file, format),
    }
}

fn run_analyze(
    files: Vec<PathBuf>,
    format: TranscriptFormat,
    options_path: Option<&Path>,
    filters: FilterArgs,
    output: Option<&Path>,
) -> Result<()> {
    let mut request = match options_path {
        Some(path) => config_loader::load_request(path)?,
        None => AnalysisRequest::default(),
    };
    config_loader::apply_overrides(&mut request, &filters.into());
    let options = request.to_options();

    if let Some(dir) = output {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let jobs: Vec<(FileSource, _)> = files
        .into_iter()
        .map(|path| (FileSource::new(path).with_format(format), options.clone()))
        .collect();

    let results = analysis::analyze_batch(&jobs);

    let mut failed = 0usize;
    for ((source, _), (name, result)) in jobs.iter().zip(results) {
        let graph = match result {
            Ok(graph) => graph,
            Err(e) => {
                log::error!("{}", e);
                failed += 1;
                continue;
            }
        };

        match output {
            Some(dir) => {
                analysis::generate_json_report(&graph, &dir.join(report_file_name(&source.path)))?;
                analysis::print_summary(&name, &graph);
            }
            None => {
                let json = serde_json::to_string_pretty(&graph).context("Failed to serialize network graph")?;
                println!("{}", json);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} transcripts could not be analyzed", failed, jobs.len());
    }
    Ok(())
}

fn run_parse(file: PathBuf, format: TranscriptFormat) -> Result<()> {
    let source = FileSource::new(file).with_format(format);
    let transcript = source
        .load()
        .with_context(|| format!("Failed to load {}", source.name()))?;

    let messages: Vec<Message> = transcript.messages().collect();
    log::info!("Parsed {} messages from {}", messages.len(), source.name());

    let json = serde_json::to_string_pretty(&messages).context("Failed to serialize messages")?;
    println!("{}", json);
    Ok(())
}

/// `chat.txt` -> `chat.network.json`
fn report_file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string());
    format!("{}.network.json", stem)
}
