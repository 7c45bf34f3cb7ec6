//! Ingestion coordination.
//!
//! Drives the per-kind pipeline: validate input → mark the kind pending →
//! call the external endpoint → apply the outcome. Each kind is an
//! independent state machine (`idle → pending → completed | idle`); exactly
//! one ingestion may be in flight per kind, while different kinds overlap
//! freely. The coordinator is the sole writer into the conversation context
//! and the source registry, and the pending flag is cleared on every exit
//! path — success, logical rejection, or transport failure.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::ConversationContext;
use crate::ingest_client::IngestApi;
use crate::models::{IngestReply, IngestionStatus, Source, SourceKind};
use crate::registry::SourceRegistry;
use crate::validate::{extract_video_id, is_valid_url};

/// Failure taxonomy for ingestion. Validation variants are raised before
/// any state mutation or network call; the rest after the call, always with
/// the pending flag already cleared.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IngestError {
    #[error("please enter a valid URL")]
    InvalidUrl,
    #[error("no file provided")]
    EmptyFile,
    #[error("could not find a video id in the URL")]
    MissingVideoId,
    #[error("{0} content is attached by file upload, not by URL")]
    NotAUrlKind(SourceKind),
    #[error("{0} content is attached by URL, not by file upload")]
    NotAFileKind(SourceKind),
    #[error("an ingestion for {0} content is already in progress")]
    AlreadyPending(SourceKind),
    #[error("failed to ingest {kind} content: {message}")]
    Rejected { kind: SourceKind, message: String },
    #[error("the {0} endpoint is not configured")]
    NotConfigured(&'static str),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl IngestError {
    /// `true` for errors raised by input validation, before any state
    /// change or network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IngestError::InvalidUrl
                | IngestError::EmptyFile
                | IngestError::MissingVideoId
                | IngestError::NotAUrlKind(_)
                | IngestError::NotAFileKind(_)
        )
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Coordinates ingestion across all content kinds.
///
/// Shares the context and registry with the owning session via `Arc`; the
/// coordinator is the only component that writes to either. No lock is held
/// across the endpoint call, so unrelated operations proceed while an
/// ingestion is outstanding.
pub struct IngestionCoordinator {
    api: Arc<dyn IngestApi>,
    statuses: Mutex<HashMap<SourceKind, IngestionStatus>>,
    context: Arc<Mutex<ConversationContext>>,
    registry: Arc<Mutex<SourceRegistry>>,
    active_video: Mutex<Option<String>>,
}

impl IngestionCoordinator {
    pub fn new(
        api: Arc<dyn IngestApi>,
        context: Arc<Mutex<ConversationContext>>,
        registry: Arc<Mutex<SourceRegistry>>,
    ) -> Self {
        Self {
            api,
            statuses: Mutex::new(HashMap::new()),
            context,
            registry,
            active_video: Mutex::new(None),
        }
    }

    /// Submit a URL for ingestion (`youtube` or `document`).
    ///
    /// Validation failures reject the submission before any state change.
    /// A second submission for a kind that is still pending is rejected
    /// with [`IngestError::AlreadyPending`].
    pub async fn submit_url(&self, kind: SourceKind, url: &str) -> Result<(), IngestError> {
        if !kind.is_url() {
            return Err(IngestError::NotAUrlKind(kind));
        }
        let address = url.trim().to_string();
        if !is_valid_url(&address) {
            return Err(IngestError::InvalidUrl);
        }
        let video_id = if kind == SourceKind::Youtube {
            Some(extract_video_id(&address).ok_or(IngestError::MissingVideoId)?)
        } else {
            None
        };

        self.begin(kind)?;
        debug!(%kind, %address, "ingestion started");

        let outcome = match video_id {
            Some(id) => self.api.youtube_transcript(&id).await,
            None => self.api.fetch_page(&address).await,
        };

        match accept(kind, outcome) {
            Ok(text) => {
                let content_hash = sha256_hex(text.as_bytes());
                self.context.lock().unwrap().set(kind, text);
                self.registry.lock().unwrap().add_url(Source::Url {
                    address: address.clone(),
                    kind,
                    content_hash,
                });
                if kind == SourceKind::Youtube {
                    *self.active_video.lock().unwrap() = Some(address.clone());
                }
                self.settle(kind, true);
                debug!(%kind, %address, "ingestion completed");
                Ok(())
            }
            Err(err) => {
                self.settle(kind, false);
                warn!(%kind, %address, error = %err, "ingestion failed");
                Err(err)
            }
        }
    }

    /// Submit an uploaded file for ingestion (`pdf` or `image`).
    pub async fn submit_file(
        &self,
        kind: SourceKind,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), IngestError> {
        if !kind.is_file() {
            return Err(IngestError::NotAFileKind(kind));
        }
        let name = name.trim().to_string();
        if name.is_empty() || bytes.is_empty() {
            return Err(IngestError::EmptyFile);
        }
        let bytes_len = bytes.len();
        let dedup_hash = sha256_hex(&bytes);

        self.begin(kind)?;
        debug!(%kind, %name, bytes_len, "ingestion started");

        let outcome = self.api.extract_file(&name, bytes).await;

        match accept(kind, outcome) {
            Ok(text) => {
                self.context.lock().unwrap().set(kind, text);
                self.registry.lock().unwrap().add_file(Source::File {
                    name: name.clone(),
                    kind,
                    bytes_len,
                    dedup_hash,
                });
                self.settle(kind, true);
                debug!(%kind, %name, "ingestion completed");
                Ok(())
            }
            Err(err) => {
                self.settle(kind, false);
                warn!(%kind, %name, error = %err, "ingestion failed");
                Err(err)
            }
        }
    }

    /// Remove a file source by name. Idempotent; returns whether an entry
    /// was removed.
    pub fn remove_file(&self, name: &str) -> bool {
        let removed = self.registry.lock().unwrap().remove_file(name);
        match removed {
            Some(source) => {
                self.retract(&source);
                true
            }
            None => false,
        }
    }

    /// Remove a URL source by address. Idempotent like
    /// [`remove_file`](IngestionCoordinator::remove_file).
    pub fn remove_url(&self, address: &str) -> bool {
        let removed = self.registry.lock().unwrap().remove_url(address);
        match removed {
            Some(source) => {
                self.retract(&source);
                true
            }
            None => false,
        }
    }

    /// Drop the context a removed source contributed, unless another source
    /// of the same kind is still attached. Already-sent messages are never
    /// touched.
    fn retract(&self, source: &Source) {
        let kind = source.kind();
        if !self.registry.lock().unwrap().by_kind(kind).is_empty() {
            return;
        }
        self.context.lock().unwrap().clear(kind);
        if let Some(entry) = self.statuses.lock().unwrap().get_mut(&kind) {
            entry.completed = false;
        }
        if kind == SourceKind::Youtube {
            let mut active = self.active_video.lock().unwrap();
            if active.as_deref() == Some(source.key()) {
                *active = None;
            }
        }
    }

    pub fn status(&self, kind: SourceKind) -> IngestionStatus {
        self.statuses
            .lock()
            .unwrap()
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    /// All kinds with their current status, in the fixed
    /// [`SourceKind::ALL`] order.
    pub fn statuses(&self) -> Vec<(SourceKind, IngestionStatus)> {
        let statuses = self.statuses.lock().unwrap();
        SourceKind::ALL
            .iter()
            .map(|kind| (*kind, statuses.get(kind).copied().unwrap_or_default()))
            .collect()
    }

    /// Address of the most recently ingested YouTube source, for display.
    pub fn active_video(&self) -> Option<String> {
        self.active_video.lock().unwrap().clone()
    }

    /// Check-and-set the pending flag for a kind. Runs entirely under the
    /// status lock, so two concurrent submissions for the same kind cannot
    /// both pass.
    fn begin(&self, kind: SourceKind) -> Result<(), IngestError> {
        let mut statuses = self.statuses.lock().unwrap();
        let entry = statuses.entry(kind).or_default();
        if entry.pending {
            return Err(IngestError::AlreadyPending(kind));
        }
        entry.pending = true;
        Ok(())
    }

    /// Clear the pending flag and record the outcome. Failure returns the
    /// kind to idle, matching the per-kind state machine.
    fn settle(&self, kind: SourceKind, success: bool) {
        let mut statuses = self.statuses.lock().unwrap();
        let entry = statuses.entry(kind).or_default();
        entry.pending = false;
        entry.completed = success;
    }
}

/// Collapse an endpoint outcome into extracted text or a single error:
/// transport failures pass through, logical failures (`success: false` or
/// a success reply without content) become [`IngestError::Rejected`] with
/// the remote message when one was provided.
fn accept(kind: SourceKind, outcome: Result<IngestReply, IngestError>) -> Result<String, IngestError> {
    let reply = outcome?;
    if !reply.success {
        return Err(IngestError::Rejected {
            kind,
            message: reply
                .message
                .unwrap_or_else(|| "the endpoint reported a failure".to_string()),
        });
    }
    reply.data.ok_or_else(|| IngestError::Rejected {
        kind,
        message: "the endpoint reported success without content".to_string(),
    })
}
