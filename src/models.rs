//! Core data models used throughout Chat Harness.
//!
//! These types represent the messages, attached sources, and ingestion
//! status flags that flow through the coordination layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in the conversation. Immutable once appended; the history is
/// an append-only chronological sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Content category of an attached source. Determines which extraction
/// path runs and which context slot the result occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Image,
    Youtube,
    Document,
}

impl SourceKind {
    /// All kinds, in the fixed order used for status listings.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Pdf,
        SourceKind::Image,
        SourceKind::Youtube,
        SourceKind::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Image => "image",
            SourceKind::Youtube => "youtube",
            SourceKind::Document => "document",
        }
    }

    /// Human-readable label used to mark this kind's section in composed
    /// prompts.
    pub fn context_label(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "PDF document",
            SourceKind::Image => "Image",
            SourceKind::Youtube => "YouTube transcript",
            SourceKind::Document => "Web page",
        }
    }

    /// Kinds attached by uploading a file.
    pub fn is_file(&self) -> bool {
        matches!(self, SourceKind::Pdf | SourceKind::Image)
    }

    /// Kinds attached by submitting a URL.
    pub fn is_url(&self) -> bool {
        matches!(self, SourceKind::Youtube | SourceKind::Document)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(SourceKind::Pdf),
            "image" => Ok(SourceKind::Image),
            "youtube" => Ok(SourceKind::Youtube),
            "document" => Ok(SourceKind::Document),
            other => Err(format!(
                "unknown source kind: '{}'. Available: pdf, image, youtube, document",
                other
            )),
        }
    }
}

/// An attached content source. Created only on successful ingestion,
/// removed only by explicit deletion; re-submitting the same key replaces
/// the entry.
///
/// Files are unique by `name`, URLs by `address`. The raw bytes of an
/// uploaded file are not retained after extraction; only their length and
/// a SHA-256 hash are kept for display and deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    File {
        name: String,
        kind: SourceKind,
        bytes_len: usize,
        dedup_hash: String,
    },
    Url {
        address: String,
        kind: SourceKind,
        content_hash: String,
    },
}

impl Source {
    /// The identity key: file name or URL address.
    pub fn key(&self) -> &str {
        match self {
            Source::File { name, .. } => name,
            Source::Url { address, .. } => address,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Source::File { kind, .. } | Source::Url { kind, .. } => *kind,
        }
    }
}

/// Reply shape shared by the extraction endpoints:
/// `{ "success": bool, "message": text, "data": text }`, with `data`
/// present only on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

impl IngestReply {
    pub fn ok(data: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data.into()),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Per-kind ingestion status. Transitions:
/// `idle → pending → (completed | idle)`; a completed kind may re-enter
/// `pending` on re-submit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStatus {
    pub pending: bool,
    pub completed: bool,
}
