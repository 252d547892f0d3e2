//! Analysis options.
//!
//! [`AnalysisOptions`] is the typed, immutable configuration consumed by the
//! filter pipeline. [`AnalysisRequest`] is the loose, query-parameter shaped
//! form callers collect from users; converting it never fails, malformed
//! values are logged and treated as absent.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors produced while interpreting a single option value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidOption {
    #[error("Invalid date '{value}' (expected YYYY-MM-DD)")]
    Date { value: String },

    #[error("Invalid time '{value}' (expected HH:MM or HH:MM:SS)")]
    Time { value: String },

    #[error("Unknown limit type '{value}' (expected 'first' or 'last')")]
    LimitType { value: String },

    #[error("Time '{value}' given without a date")]
    TimeWithoutDate { value: String },

    #[error("Unknown edge weight '{value}' (expected 'strength' or 'cost')")]
    EdgeWeight { value: String },
}

/// Inclusive time range; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Check whether a message timestamp falls in the window.
    ///
    /// Messages without a timestamp only pass an unbounded window.
    pub fn contains(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(ts) = timestamp else {
            return false;
        };
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts <= end)
    }
}

/// Which end of the sequence a selection limit keeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionEdge {
    #[default]
    First,
    Last,
}

impl std::str::FromStr for SelectionEdge {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(SelectionEdge::First),
            "last" => Ok(SelectionEdge::Last),
            _ => Err(InvalidOption::LimitType { value: s.to_string() }),
        }
    }
}

/// Keep only the first or last `count` messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimit {
    pub count: usize,
    pub edge: SelectionEdge,
}

/// Inclusive bounds on message length in characters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthBounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl LengthBounds {
    pub fn contains(&self, len: usize) -> bool {
        self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max)
    }
}

/// Inclusive bounds on a participant's kept-message count
pub type CountBounds = LengthBounds;

/// How betweenness turns interaction counts into path costs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeWeight {
    /// More interactions make two participants closer (cost = 1 / weight)
    #[default]
    Strength,
    /// Interaction count is used directly as the traversal cost
    Cost,
}

impl EdgeWeight {
    /// Traversal cost of an edge with the given interaction count
    pub fn cost(self, weight: u32) -> f64 {
        let w = f64::from(weight.max(1));
        match self {
            EdgeWeight::Strength => 1.0 / w,
            EdgeWeight::Cost => w,
        }
    }
}

impl std::str::FromStr for EdgeWeight {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strength" => Ok(EdgeWeight::Strength),
            "cost" => Ok(EdgeWeight::Cost),
            _ => Err(InvalidOption::EdgeWeight { value: s.to_string() }),
        }
    }
}

/// Typed configuration for one analysis run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOptions {
    pub time_window: TimeWindow,
    pub selection_limit: Option<SelectionLimit>,
    pub content_length: LengthBounds,
    /// Lowercase substrings; a message is kept if it contains any
    pub keyword_set: Option<BTreeSet<String>>,
    pub username_filter: Option<String>,
    pub message_count_bounds: CountBounds,
    pub top_active_count: Option<usize>,
    /// Node ids (raw or pseudonymous, whichever is active) to keep
    pub explicit_participants: Option<BTreeSet<String>>,
    pub anonymize: bool,
    pub edge_weight: EdgeWeight,
}

/// Query-parameter shaped analysis request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
    pub limit_type: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Comma-separated keywords
    pub keywords: Option<String>,
    pub min_messages: Option<usize>,
    pub max_messages: Option<usize>,
    pub active_users: Option<usize>,
    /// Comma-separated participant ids
    pub selected_users: Option<String>,
    pub username: Option<String>,
    pub anonymize: bool,
    pub edge_weight: Option<EdgeWeight>,
}

impl AnalysisRequest {
    /// Convert into typed options, degrading malformed values to "absent"
    pub fn to_options(&self) -> AnalysisOptions {
        let time_window = TimeWindow {
            start: resolve_bound("start", self.start_date.as_deref(), self.start_time.as_deref()),
            end: resolve_bound("end", self.end_date.as_deref(), self.end_time.as_deref()),
        };

        let selection_limit = match self.limit.filter(|&n| n > 0) {
            Some(count) => {
                let edge = match self.limit_type.as_deref() {
                    None => Ok(SelectionEdge::First),
                    Some(raw) => raw.parse::<SelectionEdge>(),
                };
                match edge {
                    Ok(edge) => Some(SelectionLimit { count, edge }),
                    Err(e) => {
                        log::warn!("Ignoring limit: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        AnalysisOptions {
            time_window,
            selection_limit,
            content_length: LengthBounds {
                min: positive(self.min_length),
                max: positive(self.max_length),
            },
            keyword_set: split_list(self.keywords.as_deref()),
            username_filter: self
                .username
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            message_count_bounds: CountBounds {
                min: positive(self.min_messages),
                max: positive(self.max_messages),
            },
            top_active_count: positive(self.active_users),
            explicit_participants: split_list(self.selected_users.as_deref()),
            anonymize: self.anonymize,
            edge_weight: self.edge_weight.unwrap_or_default(),
        }
    }
}

fn positive(value: Option<usize>) -> Option<usize> {
    value.filter(|&n| n > 0)
}

/// Split a comma-separated list into trimmed, lowercased, non-empty entries
pub fn split_list(raw: Option<&str>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = raw?
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Parse a date (`YYYY-MM-DD`) and optional time (`HH:MM[:SS]`).
///
/// A missing time means midnight.
pub fn parse_datetime(date: &str, time: Option<&str>) -> Result<DateTime<Utc>, InvalidOption> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| InvalidOption::Date {
        value: date.to_string(),
    })?;

    let naive = match time.map(str::trim).filter(|t| !t.is_empty()) {
        None => date.and_hms_opt(0, 0, 0),
        Some(t) => {
            let time = NaiveTime::parse_from_str(t, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
                .map_err(|_| InvalidOption::Time { value: t.to_string() })?;
            Some(date.and_time(time))
        }
    };

    naive
        .map(|dt| dt.and_utc())
        .ok_or_else(|| InvalidOption::Date { value: date.to_string() })
}

fn resolve_bound(which: &str, date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = date.map(str::trim).filter(|d| !d.is_empty());
    let Some(date) = date else {
        if let Some(t) = time.filter(|t| !t.trim().is_empty()) {
            log::warn!(
                "Ignoring {} bound: {}",
                which,
                InvalidOption::TimeWithoutDate { value: t.to_string() }
            );
        }
        return None;
    };

    match parse_datetime(date, time) {
        Ok(dt) => Some(dt),
        Err(e) => {
            log::warn!("Ignoring {} bound: {}", which, e);
            None
        }
    }
}
