//! HTTP client for the external extraction endpoints.
//!
//! Three paths, one per attachment flavor:
//! - file extraction (PDF/image): multipart POST, reply
//!   `{ success, message, data }`
//! - YouTube transcript: JSON POST `{ "videoId", "isTimeRequired" }`,
//!   same reply shape
//! - web page: direct GET, HTML converted to plain text in-process
//!
//! Everything sits behind the [`IngestApi`] trait so the coordinator and
//! its tests can substitute mock implementations.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::IngestionConfig;
use crate::ingest::IngestError;
use crate::models::IngestReply;

/// The external ingestion surface the coordinator depends on.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Upload a file to the extraction endpoint and return its reply.
    async fn extract_file(&self, name: &str, bytes: Vec<u8>) -> Result<IngestReply, IngestError>;

    /// Fetch the transcript for a YouTube video id.
    async fn youtube_transcript(&self, video_id: &str) -> Result<IngestReply, IngestError>;

    /// Fetch a web page and reduce it to readable text.
    async fn fetch_page(&self, url: &str) -> Result<IngestReply, IngestError>;
}

/// [`IngestApi`] implementation over HTTP, configured from the
/// `[ingestion]` config section. Endpoints left unconfigured fail with
/// [`IngestError::NotConfigured`] without any network activity.
pub struct HttpIngestClient {
    client: reqwest::Client,
    extract_endpoint: Option<String>,
    transcript_endpoint: Option<String>,
    with_timestamps: bool,
}

impl HttpIngestClient {
    pub fn from_config(config: &IngestionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            extract_endpoint: config.extract_endpoint.clone(),
            transcript_endpoint: config.transcript_endpoint.clone(),
            with_timestamps: config.with_timestamps,
        })
    }
}

fn transport(err: reqwest::Error) -> IngestError {
    IngestError::Transport(err.to_string())
}

#[async_trait]
impl IngestApi for HttpIngestClient {
    async fn extract_file(&self, name: &str, bytes: Vec<u8>) -> Result<IngestReply, IngestError> {
        let endpoint = self
            .extract_endpoint
            .as_ref()
            .ok_or(IngestError::NotConfigured("extraction"))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(IngestError::Transport(format!(
                "extraction endpoint returned {}",
                response.status()
            )));
        }
        response.json::<IngestReply>().await.map_err(transport)
    }

    async fn youtube_transcript(&self, video_id: &str) -> Result<IngestReply, IngestError> {
        let endpoint = self
            .transcript_endpoint
            .as_ref()
            .ok_or(IngestError::NotConfigured("transcript"))?;

        let body = serde_json::json!({
            "videoId": video_id,
            "isTimeRequired": self.with_timestamps,
        });

        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(IngestError::Transport(format!(
                "transcript endpoint returned {}",
                response.status()
            )));
        }
        response.json::<IngestReply>().await.map_err(transport)
    }

    async fn fetch_page(&self, url: &str) -> Result<IngestReply, IngestError> {
        let response = self.client.get(url).send().await.map_err(transport)?;

        if !response.status().is_success() {
            return Err(IngestError::Transport(format!(
                "page fetch returned {}",
                response.status()
            )));
        }

        let html = response.text().await.map_err(transport)?;
        let text = html2md::parse_html(&html);
        let text = text.trim();
        if text.is_empty() {
            return Ok(IngestReply::rejected("the page contained no readable text"));
        }
        Ok(IngestReply::ok(
            text,
            "Web page content extracted successfully",
        ))
    }
}
