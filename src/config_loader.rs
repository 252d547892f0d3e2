use crate::analysis::options::{AnalysisRequest, EdgeWeight};
use color_eyre::eyre::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::path::Path;

/// Load an analysis request from a YAML or JSON file (chosen by extension)
pub fn load_request(path: &Path) -> Result<AnalysisRequest> {
    info!("Loading analysis options from: {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open options file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let request: AnalysisRequest = if is_json {
        serde_json::from_reader(file).with_context(|| format!("Failed to parse JSON options {}", path.display()))?
    } else {
        serde_yaml::from_reader(file).with_context(|| format!("Failed to parse YAML options {}", path.display()))?
    };

    check_request(&request);
    Ok(request)
}

/// CLI arguments that can override values from an options file
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
    pub limit_type: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub keywords: Option<String>,
    pub min_messages: Option<usize>,
    pub max_messages: Option<usize>,
    pub active_users: Option<usize>,
    pub selected_users: Option<String>,
    pub username: Option<String>,
    /// Only ever switches anonymization on
    pub anonymize: bool,
    pub edge_weight: Option<EdgeWeight>,
}

/// Apply CLI overrides to a loaded request; set values win
pub fn apply_overrides(request: &mut AnalysisRequest, overrides: &RequestOverrides) {
    fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            slot.clone_from(value);
        }
    }

    set(&mut request.start_date, &overrides.start_date);
    set(&mut request.start_time, &overrides.start_time);
    set(&mut request.end_date, &overrides.end_date);
    set(&mut request.end_time, &overrides.end_time);
    set(&mut request.limit, &overrides.limit);
    set(&mut request.limit_type, &overrides.limit_type);
    set(&mut request.min_length, &overrides.min_length);
    set(&mut request.max_length, &overrides.max_length);
    set(&mut request.keywords, &overrides.keywords);
    set(&mut request.min_messages, &overrides.min_messages);
    set(&mut request.max_messages, &overrides.max_messages);
    set(&mut request.active_users, &overrides.active_users);
    set(&mut request.selected_users, &overrides.selected_users);
    set(&mut request.username, &overrides.username);
    set(&mut request.edge_weight, &overrides.edge_weight);
    if overrides.anonymize {
        request.anonymize = true;
    }

    check_request(request);
}

/// Warn about combinations that will select nothing
fn check_request(request: &AnalysisRequest) {
    if let (Some(min), Some(max)) = (request.min_messages, request.max_messages) {
        if min > 0 && max > 0 && min > max {
            warn!("min_messages ({}) is greater than max_messages ({}); no participant can match", min, max);
        }
    }
    if let (Some(min), Some(max)) = (request.min_length, request.max_length) {
        if min > 0 && max > 0 && min > max {
            warn!("min_length ({}) is greater than max_length ({}); no message can match", min, max);
        }
    }
}
