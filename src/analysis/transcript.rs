//! Transcript normalization.
//!
//! Turns the three raw transcript shapes (line-oriented chat exports,
//! talk-page wikitext, and pre-shaped thread records) into an ordered
//! sequence of [`Message`]s. Parsing anomalies are skipped locally and
//! never abort the whole transcript.

use std::str::Lines;
use std::sync::LazyLock;

use chrono::{DateTime, Month, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::Message;

/// Compiled regex patterns for transcript parsing
pub struct TranscriptPatterns {
    /// Match: "[01.01.2024, 10:00:00] rest-of-line"
    pub chat_header: Regex,
    /// Match: "== Section title =="
    pub section_heading: Regex,
    /// Match a trailing talk-page signature:
    /// "[[User:Name|Name]] ([[User talk:Name|talk]]) 12:34, 5 March 2024 (UTC)",
    /// or a lone "[[User talk:Name|...]]" link; namespaces match in any case
    pub signature: Regex,
    /// Match: "~~~~" at end of line (unexpanded signature)
    pub bare_signature: Regex,
    /// Match: "12:34, 5 March 2024 (UTC)"
    pub signature_timestamp: Regex,
}

impl TranscriptPatterns {
    pub fn new() -> Self {
        Self {
            chat_header: Regex::new(
                r"^\[([^\]]+)\]\s?(.*)$"
            ).expect("Invalid chat_header regex"),
            section_heading: Regex::new(
                r"^==[^=].*==\s*$"
            ).expect("Invalid section_heading regex"),
            signature: Regex::new(
                r"(?i)\[\[(?:User:|User[ _]talk:|Special:Contributions/)(?P<user>[^|\]]+)(?:\|[^\]]*)?\]\](?:\s*\(?\[\[User[ _]talk:[^\]]*\]\]\)?)?\s*(?P<ts>\d{1,2}:\d{2}, \d{1,2} [A-Za-z]+ \d{4} \(UTC\))?\s*$"
            ).expect("Invalid signature regex"),
            bare_signature: Regex::new(
                r"~~~~\s*$"
            ).expect("Invalid bare_signature regex"),
            signature_timestamp: Regex::new(
                r"^(\d{1,2}):(\d{2}), (\d{1,2}) ([A-Za-z]+) (\d{4}) \(UTC\)$"
            ).expect("Invalid signature_timestamp regex"),
        }
    }
}

impl Default for TranscriptPatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global patterns instance
pub static PATTERNS: LazyLock<TranscriptPatterns> = LazyLock::new(TranscriptPatterns::new);

/// Timestamp layouts accepted inside the brackets of a chat export line
const CHAT_TIMESTAMP_FORMATS: &[&str] = &[
    "%d.%m.%Y, %H:%M:%S",
    "%d.%m.%Y, %H:%M",
    "%d/%m/%Y, %H:%M:%S",
    "%d/%m/%Y, %H:%M",
];

/// Directional and formatting control characters that chat clients wrap
/// around names and phone numbers
const FORMAT_CONTROLS: &[char] = &[
    '\u{200E}', '\u{200F}', '\u{202A}', '\u{202B}', '\u{202C}', '\u{202D}', '\u{202E}',
    '\u{2066}', '\u{2067}', '\u{2068}', '\u{2069}', '\u{FEFF}',
];

/// Sender used for talk-page turns signed without a resolvable user
pub const UNKNOWN_SENDER: &str = "Unknown";

/// A thread record as exported by a discussion-thread collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A transcript as handed over by a source, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawTranscript {
    /// Line-oriented chat export ("[date, time] sender: content")
    ChatExport(String),
    /// Talk-page wikitext split into turns by signatures
    TalkPage {
        wikitext: String,
        /// Fallback timestamp for turns without a signature timestamp
        ingested_at: DateTime<Utc>,
    },
    /// Records already in (timestamp, sender, content) shape
    Records(Vec<ThreadRecord>),
}

impl RawTranscript {
    /// Lazily iterate the normalized messages in transcript order.
    ///
    /// Every call starts a fresh pass over the raw data.
    pub fn messages(&self) -> Box<dyn Iterator<Item = Message> + '_> {
        match self {
            RawTranscript::ChatExport(text) => Box::new(ChatMessages::new(text)),
            RawTranscript::TalkPage { wikitext, ingested_at } => {
                Box::new(TalkPageMessages::new(wikitext, *ingested_at))
            }
            RawTranscript::Records(records) => {
                Box::new(records.iter().filter_map(normalize_record))
            }
        }
    }
}

/// Remove directional marks, surrounding whitespace and the leading `~`
/// some chat clients put in front of contacts not in the address book
pub fn clean_sender(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !FORMAT_CONTROLS.contains(c)).collect();
    stripped.trim().trim_start_matches('~').trim().to_string()
}

/// Parse the bracketed timestamp of a chat export line
pub fn parse_chat_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    CHAT_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Parse an ISO-8601 timestamp, with or without an offset.
///
/// Naive timestamps are taken as UTC.
pub fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Parse a talk-page signature timestamp such as "12:34, 5 March 2024 (UTC)"
pub fn parse_signature_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let caps = PATTERNS.signature_timestamp.captures(s.trim())?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    let month: Month = caps.get(4)?.as_str().parse().ok()?;
    let year: i32 = caps.get(5)?.as_str().parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), day)?;
    Some(date.and_hms_opt(hour, minute, 0)?.and_utc())
}

/// Outcome of classifying a single chat export line
enum ChatLine {
    Header(Message),
    Continuation,
    Skip,
}

fn classify_chat_line(line: &str) -> ChatLine {
    let trimmed = line.trim_start_matches(FORMAT_CONTROLS);
    if !trimmed.starts_with('[') {
        return ChatLine::Continuation;
    }

    let Some(caps) = PATTERNS.chat_header.captures(trimmed) else {
        return ChatLine::Continuation;
    };

    let Some(timestamp) = caps.get(1).and_then(|m| parse_chat_timestamp(m.as_str())) else {
        log::debug!("Skipping chat line with malformed timestamp: {}", line);
        return ChatLine::Skip;
    };

    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let Some((raw_sender, content)) = rest.split_once(':') else {
        // System notice ("Messages are end-to-end encrypted", "X joined")
        return ChatLine::Skip;
    };

    let sender = clean_sender(raw_sender);
    if sender.is_empty() {
        return ChatLine::Skip;
    }

    ChatLine::Header(Message::new(Some(timestamp), sender, content.trim()))
}

/// Lazy message iterator over a chat export
pub struct ChatMessages<'a> {
    lines: Lines<'a>,
    pending: Option<Message>,
    /// Set after a skipped header; its continuation lines are dropped too
    skipping: bool,
}

impl<'a> ChatMessages<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            pending: None,
            skipping: false,
        }
    }
}

impl Iterator for ChatMessages<'_> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        for line in self.lines.by_ref() {
            match classify_chat_line(line) {
                ChatLine::Header(message) => {
                    self.skipping = false;
                    if let Some(done) = self.pending.replace(message) {
                        return Some(done);
                    }
                }
                ChatLine::Continuation if self.skipping => {
                    log::debug!("Dropping continuation of skipped line: {}", line);
                }
                ChatLine::Continuation => {
                    let text = line.trim();
                    match self.pending.as_mut() {
                        Some(prev) if !text.is_empty() => {
                            if !prev.content.is_empty() {
                                prev.content.push('\n');
                            }
                            prev.content.push_str(text);
                        }
                        Some(_) => {}
                        None => log::debug!("Dropping line before first message: {}", line),
                    }
                }
                ChatLine::Skip => self.skipping = true,
            }
        }
        self.pending.take()
    }
}

/// Lazy message iterator over talk-page wikitext
pub struct TalkPageMessages<'a> {
    lines: Lines<'a>,
    ingested_at: DateTime<Utc>,
    buffer: Vec<&'a str>,
}

impl<'a> TalkPageMessages<'a> {
    pub fn new(wikitext: &'a str, ingested_at: DateTime<Utc>) -> Self {
        Self {
            lines: wikitext.lines(),
            ingested_at,
            buffer: Vec::new(),
        }
    }

    fn take_content(&mut self, last: &str) -> String {
        let mut parts: Vec<&str> = self
            .buffer
            .drain(..)
            .map(strip_indentation)
            .filter(|l| !l.is_empty())
            .collect();
        let last = strip_indentation(last);
        if !last.is_empty() {
            parts.push(last);
        }
        parts.join("\n")
    }
}

fn strip_indentation(line: &str) -> &str {
    line.trim().trim_start_matches([':', '*', '#']).trim()
}

impl Iterator for TalkPageMessages<'_> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        while let Some(line) = self.lines.next() {
            if PATTERNS.section_heading.is_match(line) {
                if self.buffer.iter().any(|l| !l.trim().is_empty()) {
                    log::debug!("Dropping unsigned text at end of section");
                }
                self.buffer.clear();
                continue;
            }

            let (before, sender, timestamp) = if let Some(caps) = PATTERNS.signature.captures(line) {
                let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
                let sender = caps
                    .name("user")
                    .map(|m| m.as_str().trim().replace('_', " "))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
                let timestamp = caps.name("ts").and_then(|m| parse_signature_timestamp(m.as_str()));
                (&line[..whole], sender, timestamp)
            } else if let Some(m) = PATTERNS.bare_signature.find(line) {
                (&line[..m.start()], UNKNOWN_SENDER.to_string(), None)
            } else {
                self.buffer.push(line);
                continue;
            };

            let content = self.take_content(before);
            if content.is_empty() {
                log::debug!("Skipping signature without content for {}", sender);
                continue;
            }

            let timestamp = timestamp.unwrap_or(self.ingested_at);
            return Some(Message::new(Some(timestamp), sender, content));
        }
        None
    }
}

/// Validate a thread record once, at the normalization boundary
fn normalize_record(record: &ThreadRecord) -> Option<Message> {
    let sender = record.sender.as_deref().map(clean_sender).unwrap_or_default();
    if sender.is_empty() {
        log::debug!("Skipping thread record without sender");
        return None;
    }

    let timestamp = match record.timestamp.as_deref() {
        Some(raw) => {
            let parsed = parse_iso_timestamp(raw);
            if parsed.is_none() {
                log::debug!("Unparsable record timestamp '{}' for {}", raw, sender);
            }
            parsed
        }
        None => None,
    };

    Some(Message::new(
        timestamp,
        sender,
        record.content.clone().unwrap_or_default(),
    ))
}
