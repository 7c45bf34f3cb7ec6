//! Top-level session state.
//!
//! A [`Session`] composes the four owned-state components — source
//! registry, conversation context, ingestion coordinator, and chat engine —
//! behind one object the outward surfaces (HTTP server, CLI) drive. There
//! are no ambient singletons; collaborators (the ingestion endpoints and
//! the model backend) are injected as trait objects, which is also how the
//! test suites substitute mocks.
//!
//! All state is session-lifetime: a new process starts from a greeting and
//! an empty registry.

use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::backend::{create_backend, ModelBackend};
use crate::chat::{ChatEngine, ChatError};
use crate::config::Config;
use crate::context::ConversationContext;
use crate::ingest::{IngestError, IngestionCoordinator};
use crate::ingest_client::{HttpIngestClient, IngestApi};
use crate::models::{IngestionStatus, Message, Source, SourceKind};
use crate::registry::SourceRegistry;

pub struct Session {
    id: Uuid,
    context: Arc<Mutex<ConversationContext>>,
    registry: Arc<Mutex<SourceRegistry>>,
    coordinator: IngestionCoordinator,
    engine: ChatEngine,
}

impl Session {
    /// Build a session around injected collaborators.
    pub fn new(api: Arc<dyn IngestApi>, backend: Arc<dyn ModelBackend>) -> Self {
        let context = Arc::new(Mutex::new(ConversationContext::new()));
        let registry = Arc::new(Mutex::new(SourceRegistry::new()));
        let coordinator = IngestionCoordinator::new(api, context.clone(), registry.clone());
        let engine = ChatEngine::new(backend, context.clone());

        Self {
            id: Uuid::new_v4(),
            context,
            registry,
            coordinator,
            engine,
        }
    }

    /// Build a session with the HTTP ingestion client and the configured
    /// model backend.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api: Arc<dyn IngestApi> = Arc::new(HttpIngestClient::from_config(&config.ingestion)?);
        let backend: Arc<dyn ModelBackend> = create_backend(&config.model)?.into();
        Ok(Self::new(api, backend))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // ============ Ingestion operations ============

    pub async fn submit_url(&self, kind: SourceKind, url: &str) -> Result<(), IngestError> {
        self.coordinator.submit_url(kind, url).await
    }

    pub async fn submit_file(
        &self,
        kind: SourceKind,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), IngestError> {
        self.coordinator.submit_file(kind, name, bytes).await
    }

    pub fn remove_file(&self, name: &str) -> bool {
        self.coordinator.remove_file(name)
    }

    pub fn remove_url(&self, address: &str) -> bool {
        self.coordinator.remove_url(address)
    }

    // ============ Chat operations ============

    /// Submit one user turn: append the user message, then exchange with
    /// the backend. A successful cycle grows the history by exactly two
    /// messages; empty content is rejected before anything is appended.
    pub async fn send_chat(&self, content: &str) -> Result<(), ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.engine.add_message(Message::user(content));
        self.engine.send_message(content).await
    }

    // ============ Read surface for the view layer ============

    pub fn messages(&self) -> Vec<Message> {
        self.engine.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.engine.is_loading()
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        self.engine.suggestions()
    }

    pub fn statuses(&self) -> Vec<(SourceKind, IngestionStatus)> {
        self.coordinator.statuses()
    }

    pub fn status(&self, kind: SourceKind) -> IngestionStatus {
        self.coordinator.status(kind)
    }

    pub fn sources(&self) -> Vec<Source> {
        self.registry.lock().unwrap().sources().to_vec()
    }

    /// Extracted text currently attached for a kind, if any.
    pub fn context_text(&self, kind: SourceKind) -> Option<String> {
        self.context.lock().unwrap().get(kind).map(str::to_string)
    }

    pub fn active_video(&self) -> Option<String> {
        self.coordinator.active_video()
    }
}
