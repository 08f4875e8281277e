//! Audio transcription client
//!
//! Uploads recorded audio to the dictation service's `/transcribe` endpoint
//! as a multipart form and returns the raw transcript with timing metadata.

use crate::error::ServiceError;
use crate::session::SessionProvider;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Audio container formats accepted by the transcription endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Webm,
    Mp4,
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Webm => "webm",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()?
            .to_str()?
            .to_ascii_lowercase()
            .as_str()
        {
            "webm" => Some(AudioFormat::Webm),
            "mp4" | "m4a" => Some(AudioFormat::Mp4),
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }
}

/// One timed segment of the transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Successful transcription response.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptResult {
    pub text: String,

    #[serde(rename = "duration", default)]
    pub duration_secs: Option<f64>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Client for the `/transcribe` endpoint.
pub struct TranscriptionClient {
    client: reqwest::Client,
    endpoint: String,
    session: Arc<dyn SessionProvider>,
}

impl TranscriptionClient {
    pub fn new(
        endpoint: &str,
        timeout_secs: u64,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, ServiceError> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ServiceError::Config(format!(
                "Service endpoint must be an http(s) URL, got: {}",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Upload audio and return the transcript.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        format: AudioFormat,
        language: &str,
    ) -> Result<TranscriptResult, ServiceError> {
        if audio.is_empty() {
            return Err(ServiceError::EmptyAudio);
        }

        tracing::debug!(
            "Uploading {} bytes of {} audio for transcription",
            audio.len(),
            format.extension()
        );

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(format!("recording.{}", format.extension()))
            .mime_str(format.mime_type())
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("audio", part)
            .text("language", language.to_string());

        let mut request = self
            .client
            .post(format!("{}/transcribe", self.endpoint))
            .multipart(form);

        if let Some(token) = self.session.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout
            } else {
                ServiceError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::warn!("Transcription request failed: {} ({})", message, status);
            return Err(ServiceError::from_status(status, message));
        }

        let result: TranscriptResult = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        if result.text.trim().is_empty() {
            return Err(ServiceError::EmptyTranscription);
        }

        tracing::info!(
            "Transcribed {} characters ({} segments)",
            result.text.len(),
            result.segments.len()
        );
        Ok(result)
    }
}
