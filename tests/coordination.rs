//! End-to-end coordination tests over the library API, with mock
//! collaborators standing in for the extraction endpoints and the model
//! backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chat_harness::backend::{DisabledBackend, ModelBackend};
use chat_harness::chat::{FAILURE_REPLY, UNCONFIGURED_REPLY};
use chat_harness::ingest::IngestError;
use chat_harness::ingest_client::IngestApi;
use chat_harness::models::{IngestReply, Role, Source, SourceKind};
use chat_harness::session::Session;

/// Records every call and replies with fixed per-path content.
#[derive(Default)]
struct RecordingApi {
    video_ids: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl IngestApi for RecordingApi {
    async fn extract_file(&self, _name: &str, _bytes: Vec<u8>) -> Result<IngestReply, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(IngestReply::ok("pdf text", "PDF uploaded successfully"))
    }

    async fn youtube_transcript(&self, video_id: &str) -> Result<IngestReply, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.video_ids.lock().unwrap().push(video_id.to_string());
        Ok(IngestReply::ok(
            "transcript text",
            "YouTube transcript extracted successfully!",
        ))
    }

    async fn fetch_page(&self, _url: &str) -> Result<IngestReply, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(IngestReply::ok("page text", "Web page content extracted"))
    }
}

/// Blocks inside the endpoint call until released, to hold a kind in the
/// pending state from a test.
struct BlockingApi {
    started: tokio::sync::Notify,
    release: tokio::sync::Notify,
    calls: AtomicUsize,
}

impl BlockingApi {
    fn new() -> Self {
        Self {
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    async fn serve(&self) -> Result<IngestReply, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(IngestReply::ok("transcript text", "ok"))
    }
}

#[async_trait]
impl IngestApi for BlockingApi {
    async fn extract_file(&self, _name: &str, _bytes: Vec<u8>) -> Result<IngestReply, IngestError> {
        Ok(IngestReply::ok("pdf text", "ok"))
    }

    /// Only the transcript path blocks; the other paths reply immediately
    /// so cross-kind independence can be observed on one session.
    async fn youtube_transcript(&self, _video_id: &str) -> Result<IngestReply, IngestError> {
        self.serve().await
    }

    async fn fetch_page(&self, _url: &str) -> Result<IngestReply, IngestError> {
        Ok(IngestReply::ok("page text", "ok"))
    }
}

/// Captures every composed prompt and echoes a fixed reply.
#[derive(Default)]
struct EchoBackend {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("model reply".to_string())
    }
}

/// Always fails the generate call.
struct FailingBackend;

#[async_trait]
impl ModelBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("simulated backend outage")
    }
}

const WATCH_URL: &str = "https://youtube.com/watch?v=abc123";

#[tokio::test]
async fn youtube_scenario_end_to_end() {
    let api = Arc::new(RecordingApi::default());
    let session = Session::new(api.clone(), Arc::new(EchoBackend::default()));

    session
        .submit_url(SourceKind::Youtube, WATCH_URL)
        .await
        .unwrap();

    assert_eq!(*api.video_ids.lock().unwrap(), vec!["abc123".to_string()]);

    let sources = session.sources();
    assert_eq!(sources.len(), 1);
    match &sources[0] {
        Source::Url { address, kind, .. } => {
            assert_eq!(address, WATCH_URL);
            assert_eq!(*kind, SourceKind::Youtube);
        }
        other => panic!("unexpected source: {:?}", other),
    }

    assert_eq!(
        session.context_text(SourceKind::Youtube).as_deref(),
        Some("transcript text")
    );
    assert_eq!(session.active_video().as_deref(), Some(WATCH_URL));

    let status = session.status(SourceKind::Youtube);
    assert!(status.completed);
    assert!(!status.pending);
}

#[tokio::test]
async fn malformed_url_makes_no_call_and_mutates_nothing() {
    let api = Arc::new(RecordingApi::default());
    let session = Session::new(api.clone(), Arc::new(EchoBackend::default()));

    let err = session
        .submit_url(SourceKind::Youtube, "not a url")
        .await
        .unwrap_err();

    assert_eq!(err, IngestError::InvalidUrl);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    assert!(session.sources().is_empty());
    assert!(session.context_text(SourceKind::Youtube).is_none());
    let status = session.status(SourceKind::Youtube);
    assert!(!status.pending);
    assert!(!status.completed);
}

#[tokio::test]
async fn resubmit_while_pending_is_rejected() {
    let api = Arc::new(BlockingApi::new());
    let session = Arc::new(Session::new(api.clone(), Arc::new(EchoBackend::default())));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.submit_url(SourceKind::Youtube, WATCH_URL).await })
    };

    // Wait until the first submission is inside the endpoint call.
    api.started.notified().await;
    assert!(session.status(SourceKind::Youtube).pending);

    let second = session.submit_url(SourceKind::Youtube, WATCH_URL).await;
    assert_eq!(
        second.unwrap_err(),
        IngestError::AlreadyPending(SourceKind::Youtube)
    );

    api.release.notify_one();
    first.await.unwrap().unwrap();

    // Exactly one endpoint call and one context write happened.
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.sources().len(), 1);
    assert!(session.status(SourceKind::Youtube).completed);
    assert!(!session.status(SourceKind::Youtube).pending);
}

#[tokio::test]
async fn different_kinds_do_not_block_each_other() {
    let api = Arc::new(BlockingApi::new());
    let session = Arc::new(Session::new(api.clone(), Arc::new(EchoBackend::default())));

    let youtube = {
        let session = session.clone();
        tokio::spawn(async move { session.submit_url(SourceKind::Youtube, WATCH_URL).await })
    };
    api.started.notified().await;
    assert!(session.status(SourceKind::Youtube).pending);
    assert!(!session.status(SourceKind::Document).pending);

    // A different kind completes while youtube is still in flight.
    session
        .submit_url(SourceKind::Document, "https://example.com/page")
        .await
        .unwrap();
    assert!(session.status(SourceKind::Document).completed);
    assert!(session.status(SourceKind::Youtube).pending);

    api.release.notify_one();
    youtube.await.unwrap().unwrap();
    assert!(session.status(SourceKind::Youtube).completed);
}

#[tokio::test]
async fn prompt_carries_ingested_context() {
    let api = Arc::new(RecordingApi::default());
    let backend = Arc::new(EchoBackend::default());
    let session = Session::new(api, backend.clone());

    session
        .submit_url(SourceKind::Youtube, WATCH_URL)
        .await
        .unwrap();
    session.send_chat("question").await.unwrap();

    let prompts = backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(
        prompts[0],
        "question\n\n[YouTube transcript]\ntranscript text"
    );
}

#[tokio::test]
async fn successful_cycle_grows_history_by_two() {
    let session = Session::new(
        Arc::new(RecordingApi::default()),
        Arc::new(EchoBackend::default()),
    );

    let before = session.messages().len();
    session.send_chat("hello").await.unwrap();
    let messages = session.messages();

    assert_eq!(messages.len(), before + 2);
    assert_eq!(messages[before].role, Role::User);
    assert_eq!(messages[before].content, "hello");
    assert_eq!(messages[before + 1].role, Role::Assistant);
    assert_eq!(messages[before + 1].content, "model reply");
    assert!(!session.is_loading());
}

#[tokio::test]
async fn unconfigured_backend_resolves_immediately_with_fixed_reply() {
    let session = Session::new(Arc::new(RecordingApi::default()), Arc::new(DisabledBackend));

    session.send_chat("hello").await.unwrap();

    let messages = session.messages();
    assert_eq!(messages.last().unwrap().content, UNCONFIGURED_REPLY);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn backend_failure_is_swallowed_into_fallback_reply() {
    let session = Session::new(Arc::new(RecordingApi::default()), Arc::new(FailingBackend));

    // The error does not propagate; the reply is the fixed fallback.
    session.send_chat("hello").await.unwrap();

    let messages = session.messages();
    assert_eq!(messages.last().unwrap().content, FAILURE_REPLY);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn removal_clears_context_but_not_sent_messages() {
    let api = Arc::new(RecordingApi::default());
    let backend = Arc::new(EchoBackend::default());
    let session = Session::new(api, backend.clone());

    session
        .submit_file(SourceKind::Pdf, "notes.pdf", b"%PDF-1.4".to_vec())
        .await
        .unwrap();
    session.send_chat("first question").await.unwrap();
    let history_before = session.messages();

    assert!(session.remove_file("notes.pdf"));
    assert!(!session.remove_file("notes.pdf"));

    // Already-sent messages are untouched.
    assert_eq!(session.messages(), history_before);

    // New prompts no longer carry the removed content.
    session.send_chat("second question").await.unwrap();
    let prompts = backend.prompts.lock().unwrap();
    assert!(prompts[0].contains("pdf text"));
    assert_eq!(prompts[1], "second question");
}

#[tokio::test]
async fn resubmit_after_completion_replaces_source() {
    let api = Arc::new(RecordingApi::default());
    let session = Session::new(api.clone(), Arc::new(EchoBackend::default()));

    session
        .submit_url(SourceKind::Youtube, WATCH_URL)
        .await
        .unwrap();
    session
        .submit_url(SourceKind::Youtube, WATCH_URL)
        .await
        .unwrap();

    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.sources().len(), 1);
    assert!(session.status(SourceKind::Youtube).completed);
}
