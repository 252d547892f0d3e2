//! Transcript sources.
//!
//! A [`TranscriptSource`] hands the analysis a [`RawTranscript`]. Failing to
//! obtain one is the only hard error the library reports; everything after
//! that point degrades instead of failing.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::analysis::transcript::{RawTranscript, ThreadRecord};

/// The transcript could not be obtained
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Transcript not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read transcript {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode transcript {path}: {reason}")]
    Decode { path: String, reason: String },
}

/// Anything that can produce a raw transcript
pub trait TranscriptSource: Send + Sync {
    /// Human-readable name used in logs and reports
    fn name(&self) -> String;

    /// Fetch the transcript
    fn load(&self) -> Result<RawTranscript, SourceError>;
}

/// An in-memory transcript is always available
impl TranscriptSource for RawTranscript {
    fn name(&self) -> String {
        match self {
            RawTranscript::ChatExport(_) => "chat export".to_string(),
            RawTranscript::TalkPage { .. } => "talk page".to_string(),
            RawTranscript::Records(_) => "thread records".to_string(),
        }
    }

    fn load(&self) -> Result<RawTranscript, SourceError> {
        Ok(self.clone())
    }
}

/// On-disk transcript format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranscriptFormat {
    /// Pick by file extension
    #[default]
    Auto,
    Chat,
    Talk,
    Records,
}

impl TranscriptFormat {
    /// Resolve `Auto` from the file extension
    pub fn resolve(self, path: &Path) -> Self {
        if self != TranscriptFormat::Auto {
            return self;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => TranscriptFormat::Records,
            Some("wiki" | "wikitext" | "mediawiki") => TranscriptFormat::Talk,
            _ => TranscriptFormat::Chat,
        }
    }
}

impl FromStr for TranscriptFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(TranscriptFormat::Auto),
            "chat" => Ok(TranscriptFormat::Chat),
            "talk" => Ok(TranscriptFormat::Talk),
            "records" => Ok(TranscriptFormat::Records),
            other => Err(format!(
                "unknown format '{}' (expected auto, chat, talk or records)",
                other
            )),
        }
    }
}

impl fmt::Display for TranscriptFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TranscriptFormat::Auto => "auto",
            TranscriptFormat::Chat => "chat",
            TranscriptFormat::Talk => "talk",
            TranscriptFormat::Records => "records",
        };
        f.write_str(s)
    }
}

/// Record files are either a bare array or an object with a `messages` array
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    List(Vec<ThreadRecord>),
    Wrapped { messages: Vec<ThreadRecord> },
}

/// A transcript stored in a local file
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub format: TranscriptFormat,
    /// Fallback timestamp for unsigned talk-page turns; defaults to load time
    pub ingested_at: Option<DateTime<Utc>>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: TranscriptFormat::Auto,
            ingested_at: None,
        }
    }

    pub fn with_format(mut self, format: TranscriptFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_ingested_at(mut self, ingested_at: DateTime<Utc>) -> Self {
        self.ingested_at = Some(ingested_at);
        self
    }

    fn read_text(&self) -> Result<String, SourceError> {
        let path = self.path.display().to_string();
        let bytes = fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SourceError::NotFound { path: path.clone() },
            _ => SourceError::Io {
                path: path.clone(),
                source: e,
            },
        })?;
        String::from_utf8(bytes).map_err(|e| SourceError::Decode {
            path,
            reason: e.to_string(),
        })
    }
}

impl TranscriptSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RawTranscript, SourceError> {
        let format = self.format.resolve(&self.path);
        log::debug!("Loading {} as {}", self.path.display(), format);

        let text = self.read_text()?;
        let transcript = match format {
            TranscriptFormat::Records => {
                let file: RecordFile = serde_json::from_str(&text).map_err(|e| SourceError::Decode {
                    path: self.name(),
                    reason: e.to_string(),
                })?;
                let records = match file {
                    RecordFile::List(records) => records,
                    RecordFile::Wrapped { messages } => messages,
                };
                RawTranscript::Records(records)
            }
            TranscriptFormat::Talk => RawTranscript::TalkPage {
                wikitext: text,
                ingested_at: self.ingested_at.unwrap_or_else(Utc::now),
            },
            TranscriptFormat::Chat | TranscriptFormat::Auto => RawTranscript::ChatExport(text),
        };
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution() {
        let auto = TranscriptFormat::Auto;
        assert_eq!(auto.resolve(Path::new("thread.json")), TranscriptFormat::Records);
        assert_eq!(auto.resolve(Path::new("Talk.WIKI")), TranscriptFormat::Talk);
        assert_eq!(auto.resolve(Path::new("_chat.txt")), TranscriptFormat::Chat);
        assert_eq!(auto.resolve(Path::new("noext")), TranscriptFormat::Chat);
        assert_eq!(
            TranscriptFormat::Talk.resolve(Path::new("thread.json")),
            TranscriptFormat::Talk
        );
        assert_eq!("Records".parse::<TranscriptFormat>(), Ok(TranscriptFormat::Records));
        assert!("csv".parse::<TranscriptFormat>().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = FileSource::new("/nonexistent/transcript.txt").load().unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn test_records_file_shapes() {
        let dir = tempfile::tempdir().unwrap();

        let bare = dir.path().join("bare.json");
        fs::write(&bare, r#"[{"timestamp": null, "sender": "A", "content": "hi"}]"#).unwrap();
        match FileSource::new(&bare).load().unwrap() {
            RawTranscript::Records(records) => assert_eq!(records.len(), 1),
            other => panic!("unexpected transcript {:?}", other),
        }

        let wrapped = dir.path().join("wrapped.json");
        fs::write(&wrapped, r#"{"messages": [{"sender": "A"}, {"sender": "B"}]}"#).unwrap();
        match FileSource::new(&wrapped).load().unwrap() {
            RawTranscript::Records(records) => assert_eq!(records.len(), 2),
            other => panic!("unexpected transcript {:?}", other),
        }

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            FileSource::new(&broken).load(),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            FileSource::new(&path).load(),
            Err(SourceError::Decode { .. })
        ));
    }

    #[test]
    fn test_talk_page_uses_ingestion_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.wiki");
        fs::write(&path, "== Topic ==\nHello ~~~~\n").unwrap();

        let at = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        match FileSource::new(&path).with_ingested_at(at).load().unwrap() {
            RawTranscript::TalkPage { ingested_at, .. } => assert_eq!(ingested_at, at),
            other => panic!("unexpected transcript {:?}", other),
        }
    }
}
