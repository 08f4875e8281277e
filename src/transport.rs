//! Streaming transport for report generation
//!
//! Report generation is the one remote call whose response body is consumed
//! incrementally, so it gets its own trait seam: the generator pumps a byte
//! stream and never touches HTTP directly. Tests substitute a scripted
//! transport; production uses reqwest.

use async_trait::async_trait;
use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Failures below the HTTP status level.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("stream interrupted: {0}")]
    Stream(String),
}

/// Body of a generation request, as the service expects it on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratePayload {
    pub transcription: String,

    #[serde(rename = "reportType")]
    pub report_type: String,
}

/// Chunked response body.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// An open streaming response: status first, then the body as it arrives.
pub struct StreamingResponse {
    pub status: u16,
    pub body: ChunkStream,
}

/// Opens a streaming connection to the report service.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn open_stream(
        &self,
        payload: &GeneratePayload,
        token: Option<&str>,
    ) -> Result<StreamingResponse, TransportError>;
}

/// Production transport over the `/generate-report` endpoint.
pub struct HttpReportTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpReportTransport {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}/generate-report", endpoint.trim_end_matches('/')),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Stream(e.to_string())
    }
}

#[async_trait]
impl ReportTransport for HttpReportTransport {
    async fn open_stream(
        &self,
        payload: &GeneratePayload,
        token: Option<&str>,
    ) -> Result<StreamingResponse, TransportError> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(map_reqwest_error)
            })
            .boxed();

        Ok(StreamingResponse { status, body })
    }
}
