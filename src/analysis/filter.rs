//! Filter pipeline.
//!
//! Stages run in a fixed order and each one only sees what the previous
//! stage kept:
//!
//! 1. time window
//! 2. selection limit (first/last N)
//! 3. per-message content filters (length, username, keywords)
//! 4. participant accumulation, with pseudonyms assigned on first sight
//! 5. aggregate participant filters (message count bounds, top-K, explicit set)

use std::collections::{BTreeSet, HashMap};

use super::anonymize::PseudonymMap;
use super::options::{AnalysisOptions, SelectionEdge, SelectionLimit};
use super::types::{LabeledMessage, Message, ParticipantStats};

/// Output of the filter pipeline
#[derive(Debug, Clone, Default)]
pub struct FilteredTranscript {
    /// Messages that passed stages 1-3, in transcript order
    pub messages: Vec<LabeledMessage>,
    /// Every participant accumulated in stage 4, in first-encounter order
    pub participants: Vec<ParticipantStats>,
    /// Final node set after stage 5, in first-encounter order
    pub nodes: Vec<String>,
    pub pseudonyms: PseudonymMap,
}

impl FilteredTranscript {
    /// Message count for a node label
    pub fn message_count(&self, label: &str) -> usize {
        self.participants
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.message_count)
            .unwrap_or(0)
    }
}

/// Run every filter stage over a message sequence
pub fn apply_filters<I>(messages: I, options: &AnalysisOptions) -> FilteredTranscript
where
    I: IntoIterator<Item = Message>,
{
    let windowed: Vec<Message> = messages
        .into_iter()
        .filter(|m| options.time_window.contains(m.timestamp))
        .collect();
    let windowed_count = windowed.len();

    let selected = apply_selection_limit(windowed, options.selection_limit);

    let mut pseudonyms = PseudonymMap::new();
    let mut participants: Vec<ParticipantStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<LabeledMessage> = Vec::with_capacity(selected.len());

    for message in selected {
        if !passes_message_filters(&message, options) {
            continue;
        }

        let label = if options.anonymize {
            pseudonyms.pseudonym_for(&message.sender).to_string()
        } else {
            message.sender.clone()
        };

        match index.get(&message.sender).copied() {
            Some(i) => participants[i].message_count += 1,
            None => {
                index.insert(message.sender.clone(), participants.len());
                participants.push(ParticipantStats {
                    raw_id: message.sender.clone(),
                    label: label.clone(),
                    message_count: 1,
                    first_seen: participants.len(),
                });
            }
        }

        kept.push(LabeledMessage { label, message });
    }

    let nodes = select_participants(&participants, options);

    log::info!(
        "Filtered transcript: {} in time window, {} kept messages, {} participants, {} nodes",
        windowed_count,
        kept.len(),
        participants.len(),
        nodes.len()
    );

    FilteredTranscript {
        messages: kept,
        participants,
        nodes,
        pseudonyms,
    }
}

/// Keep only the first or last N messages of an already time-filtered sequence
pub fn apply_selection_limit(mut messages: Vec<Message>, limit: Option<SelectionLimit>) -> Vec<Message> {
    let Some(limit) = limit else {
        return messages;
    };
    if messages.len() <= limit.count {
        return messages;
    }

    match limit.edge {
        SelectionEdge::First => {
            messages.truncate(limit.count);
            messages
        }
        SelectionEdge::Last => messages.split_off(messages.len() - limit.count),
    }
}

/// Per-message filters: content length, username, keywords
pub fn passes_message_filters(message: &Message, options: &AnalysisOptions) -> bool {
    if !options.content_length.contains(message.content.chars().count()) {
        return false;
    }

    if let Some(username) = &options.username_filter {
        if message.sender.to_lowercase() != username.to_lowercase() {
            return false;
        }
    }

    if let Some(keywords) = &options.keyword_set {
        let content = message.content.to_lowercase();
        if !keywords.iter().any(|kw| content.contains(kw.to_lowercase().as_str())) {
            return false;
        }
    }

    true
}

/// Aggregate participant filters; returns the final node labels
pub fn select_participants(participants: &[ParticipantStats], options: &AnalysisOptions) -> Vec<String> {
    let mut selected: Vec<&ParticipantStats> = participants
        .iter()
        .filter(|p| options.message_count_bounds.contains(p.message_count))
        .collect();

    if let Some(k) = options.top_active_count {
        // Stable sort keeps first-encounter order among equal counts
        selected.sort_by(|a, b| b.message_count.cmp(&a.message_count));
        selected.truncate(k);
        selected.sort_by_key(|p| p.first_seen);
    }

    if let Some(explicit) = &options.explicit_participants {
        let wanted: BTreeSet<String> = explicit.iter().map(|s| s.to_lowercase()).collect();
        selected.retain(|p| wanted.contains(&p.label.to_lowercase()));
    }

    selected.into_iter().map(|p| p.label.clone()).collect()
}
