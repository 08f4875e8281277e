//! Transcript enhancement and diarization client
//!
//! Sends a raw transcript to the `/process-transcription` endpoint, which
//! corrects medical terminology and optionally rewrites the conversation as
//! labeled DOCTOR:/PATIENT: turns. The speaker list is also recomputed
//! locally from the labeled text so callers are not dependent on the service
//! including it.

use crate::error::ServiceError;
use crate::session::SessionProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Minimum transcript length for diarization requests.
const MIN_LEN_DIARIZATION: usize = 10;

/// Minimum transcript length for plain terminology enhancement.
const MIN_LEN_ENHANCEMENT: usize = 3;

/// A speaker identified in a diarized transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeakerLabel {
    Doctor,
    Patient,
}

impl std::fmt::Display for SpeakerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeakerLabel::Doctor => write!(f, "DOCTOR"),
            SpeakerLabel::Patient => write!(f, "PATIENT"),
        }
    }
}

/// Result of enhancing a transcript.
#[derive(Debug, Clone)]
pub struct EnhancedTranscript {
    /// The corrected (and possibly diarized) transcript text.
    pub text: String,
    /// Speakers present in the text, in order of first appearance.
    pub speakers: Vec<SpeakerLabel>,
}

/// What to ask the enhancement service for.
#[derive(Debug, Clone, Copy)]
pub struct EnhancementOptions {
    pub diarization: bool,
    pub terminology: bool,
}

impl Default for EnhancementOptions {
    fn default() -> Self {
        Self {
            diarization: true,
            terminology: true,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnhanceRequest<'a> {
    transcription: &'a str,
    enable_diarization: bool,
    enhance_terminology: bool,
}

#[derive(Deserialize)]
struct EnhanceResponse {
    processed: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Scan a diarized transcript for DOCTOR:/PATIENT: turn labels, returning
/// each speaker once in order of first appearance.
pub fn extract_speakers(text: &str) -> Vec<SpeakerLabel> {
    let mut speakers = Vec::new();
    for line in text.lines() {
        let line = line.trim_start();
        let label = if line.starts_with("DOCTOR:") {
            SpeakerLabel::Doctor
        } else if line.starts_with("PATIENT:") {
            SpeakerLabel::Patient
        } else {
            continue;
        };
        if !speakers.contains(&label) {
            speakers.push(label);
        }
    }
    speakers
}

/// Client for the `/process-transcription` endpoint.
pub struct EnhancementClient {
    client: reqwest::Client,
    endpoint: String,
    session: Arc<dyn SessionProvider>,
}

impl EnhancementClient {
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

    /// Enhance a raw transcript.
    ///
    /// Diarization needs enough text to segment into turns, so the minimum
    /// input length is higher when it is enabled.
    pub async fn enhance(
        &self,
        transcription: &str,
        options: EnhancementOptions,
    ) -> Result<EnhancedTranscript, ServiceError> {
        let trimmed = transcription.trim();
        let min_len = if options.diarization {
            MIN_LEN_DIARIZATION
        } else {
            MIN_LEN_ENHANCEMENT
        };
        if trimmed.len() < min_len {
            return Err(ServiceError::TooShort);
        }

        tracing::debug!(
            "Enhancing {} character transcript (diarization: {})",
            trimmed.len(),
            options.diarization
        );

        let body = EnhanceRequest {
            transcription: trimmed,
            enable_diarization: options.diarization,
            enhance_terminology: options.terminology,
        };

        let mut request = self
            .client
            .post(format!("{}/process-transcription", self.endpoint))
            .json(&body);

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
            tracing::warn!("Enhancement request failed: {} ({})", message, status);
            return Err(ServiceError::from_status(status, message));
        }

        let parsed: EnhanceResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        let speakers = extract_speakers(&parsed.processed);
        tracing::info!(
            "Enhanced transcript: {} characters, {} speakers",
            parsed.processed.len(),
            speakers.len()
        );

        Ok(EnhancedTranscript {
            text: parsed.processed,
            speakers,
        })
    }
}
