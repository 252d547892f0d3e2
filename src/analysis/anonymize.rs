//! Session-scoped pseudonym assignment.
//!
//! Pseudonyms are handed out lazily, in the order senders are first seen
//! among the messages that survive per-message filtering. A sender that never
//! reaches accumulation never consumes a number.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Directional mark some chat clients put in front of phone numbers
const LTR_EMBEDDING: char = '\u{202A}';

/// Match: leading international calling-code prefix ("+972 ...", "+1-555...")
static PHONE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{1,3}").expect("Invalid phone prefix regex"));

/// Check whether a sender looks like a phone number rather than a display name
pub fn is_phone_sender(sender: &str) -> bool {
    PHONE_PREFIX.is_match(sender.trim_start_matches(LTR_EMBEDDING).trim_start())
}

/// Injective raw id -> pseudonym mapping for one analysis run
#[derive(Debug, Default, Clone)]
pub struct PseudonymMap {
    assigned: HashMap<String, String>,
    order: Vec<String>,
}

impl PseudonymMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pseudonym for `raw_id`, assigning the next one on first use
    pub fn pseudonym_for(&mut self, raw_id: &str) -> &str {
        if !self.assigned.contains_key(raw_id) {
            let n = self.assigned.len() + 1;
            let label = if is_phone_sender(raw_id) {
                format!("Phone_{}", n)
            } else {
                format!("User_{}", n)
            };
            self.assigned.insert(raw_id.to_string(), label);
            self.order.push(raw_id.to_string());
        }
        &self.assigned[raw_id]
    }

    /// Look up an existing pseudonym without assigning one
    pub fn get(&self, raw_id: &str) -> Option<&str> {
        self.assigned.get(raw_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Iterate (raw id, pseudonym) pairs in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .map(|raw| (raw.as_str(), self.assigned[raw].as_str()))
    }
}
