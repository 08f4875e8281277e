//! Streaming report generation
//!
//! The generator drives the full lifecycle of one report: enrich the
//! transcript with patient/physician context, open the streaming connection,
//! pump SSE events into a sanitized accumulator, and route outages to the
//! local fallback builder. Callers observe progress through a callback that
//! always receives the complete accumulated text.
//!
//! Error partitioning on the initial status:
//! - 2xx: consume the stream
//! - 429 / 402: terminal, no fallback (the user must act)
//! - 404 / 5xx: local fallback
//! - other 4xx: terminal generation failure
//!
//! Transport failures (connect, timeout, mid-stream drop) also route to the
//! fallback: the dictated content must never be lost to an outage.

use crate::error::ServiceError;
use crate::fallback;
use crate::sanitize;
use crate::session::SessionProvider;
use crate::sse::{SseEvent, SseLineParser};
use crate::transport::{GeneratePayload, ReportTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Report formats the service knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    General,
    Soap,
    Diagnostic,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::General => "general",
            ReportType::Soap => "soap",
            ReportType::Diagnostic => "diagnostic",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(ReportType::General),
            "soap" => Ok(ReportType::Soap),
            "diagnostic" => Ok(ReportType::Diagnostic),
            other => Err(format!(
                "unknown report type '{}' (expected: general, soap, diagnostic)",
                other
            )),
        }
    }
}

/// Everything needed to generate one report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub transcription: String,
    pub report_type: ReportType,
    pub patient_id: Option<String>,
    pub doctor_name: Option<String>,
}

impl ReportRequest {
    /// The transcript as sent to the service: patient and physician context
    /// lines prepended so both the model and the fallback builder can use
    /// them.
    pub fn enriched_transcription(&self) -> String {
        let mut text = self.transcription.clone();
        if let Some(ref patient) = self.patient_id {
            text = format!("Patient ID: {}\n\n{}", patient, text);
        }
        if let Some(ref doctor) = self.doctor_name {
            text = format!("Attending Physician: {}\n\n{}", doctor, text);
        }
        text
    }
}

/// How a finished generation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Remote stream consumed to completion.
    Complete,
    /// Service unavailable; report built locally.
    FallbackUsed,
    /// Stopped by `cancel()`; text holds what had accumulated.
    Cancelled,
}

/// A finished report.
#[derive(Debug, Clone)]
pub struct ReportResult {
    pub text: String,
    pub status: ReportStatus,
}

/// Typed view of one streamed event payload.
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Drives report generation over a pluggable transport.
pub struct ReportGenerator {
    transport: Arc<dyn ReportTransport>,
    session: Arc<dyn SessionProvider>,
    fallback_delay: Duration,
    in_flight: AtomicBool,
    cancelled: AtomicBool,
}

/// Clears the in-flight flag when generation exits by any path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ReportGenerator {
    pub fn new(
        transport: Arc<dyn ReportTransport>,
        session: Arc<dyn SessionProvider>,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            transport,
            session,
            fallback_delay,
            in_flight: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request that an in-progress generation stop after the current chunk.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Generate a report, invoking `on_update` with the full accumulated text
    /// after every content delta.
    ///
    /// Only one generation may run per generator at a time; a second call
    /// while one is in flight fails immediately with `InProgress`.
    pub async fn generate<F>(
        &self,
        request: &ReportRequest,
        mut on_update: F,
    ) -> Result<ReportResult, ServiceError>
    where
        F: FnMut(&str),
    {
        if request.transcription.trim().is_empty() {
            return Err(ServiceError::EmptyInput);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ServiceError::InProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);
        self.cancelled.store(false, Ordering::SeqCst);

        let enriched = request.enriched_transcription();
        let payload = GeneratePayload {
            transcription: enriched.clone(),
            report_type: request.report_type.to_string(),
        };

        tracing::info!("Requesting {} report from service", request.report_type);

        let token = self.session.bearer_token();
        let response = match self.transport.open_stream(&payload, token.as_deref()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Report service unreachable ({}), using local fallback", e);
                return self.run_fallback(&enriched, request.report_type, &mut on_update).await;
            }
        };

        match response.status {
            status if (200..300).contains(&status) => {
                self.pump_stream(response.body, &enriched, request.report_type, &mut on_update)
                    .await
            }
            429 => Err(ServiceError::RateLimited),
            402 => Err(ServiceError::QuotaExceeded),
            status if status == 404 || status >= 500 => {
                tracing::warn!(
                    "Report service returned {}, using local fallback",
                    status
                );
                self.run_fallback(&enriched, request.report_type, &mut on_update).await
            }
            status => Err(ServiceError::Generation(status)),
        }
    }

    /// Consume the SSE body, accumulating sanitized content deltas.
    async fn pump_stream<F>(
        &self,
        mut body: crate::transport::ChunkStream,
        enriched: &str,
        report_type: ReportType,
        on_update: &mut F,
    ) -> Result<ReportResult, ServiceError>
    where
        F: FnMut(&str),
    {
        use futures_util::StreamExt;

        let mut parser = SseLineParser::new();
        let mut accumulated = String::new();
        let mut done = false;

        'stream: while let Some(chunk) = body.next().await {
            if self.cancelled.load(Ordering::SeqCst) {
                tracing::info!("Report generation cancelled");
                return Ok(ReportResult {
                    text: accumulated,
                    status: ReportStatus::Cancelled,
                });
            }

            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // A drop mid-stream abandons the partial remote text; the
                    // fallback produces a complete report instead.
                    tracing::warn!("Stream interrupted ({}), using local fallback", e);
                    return self.run_fallback(enriched, report_type, on_update).await;
                }
            };

            for event in parser.feed(&chunk) {
                match event {
                    SseEvent::Done => {
                        done = true;
                        break 'stream;
                    }
                    SseEvent::Data(value) => {
                        apply_delta(value, &mut accumulated, on_update);
                    }
                    SseEvent::Skip => {}
                }
            }
        }

        if !done {
            if let Some(SseEvent::Data(value)) = parser.flush() {
                apply_delta(value, &mut accumulated, on_update);
            }
        }

        if accumulated.trim().is_empty() {
            tracing::warn!("Stream ended with no content, using local fallback");
            return self.run_fallback(enriched, report_type, on_update).await;
        }

        tracing::info!("Report complete ({} characters)", accumulated.len());
        Ok(ReportResult {
            text: accumulated,
            status: ReportStatus::Complete,
        })
    }

    async fn run_fallback<F>(
        &self,
        enriched: &str,
        report_type: ReportType,
        on_update: &mut F,
    ) -> Result<ReportResult, ServiceError>
    where
        F: FnMut(&str),
    {
        let report = fallback::build_report(enriched, report_type);
        fallback::stream_words(&report, self.fallback_delay, |text| on_update(text)).await;
        Ok(ReportResult {
            text: report,
            status: ReportStatus::FallbackUsed,
        })
    }
}

/// Extract the content delta from one streamed payload, sanitize it, and
/// append. The callback only fires when the delta actually adds text.
fn apply_delta<F>(value: serde_json::Value, accumulated: &mut String, on_update: &mut F)
where
    F: FnMut(&str),
{
    let chunk: StreamChunk = match serde_json::from_value(value) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!("Dropping unrecognized stream payload: {}", e);
            return;
        }
    };

    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            let cleaned = sanitize::clean(&content);
            if !cleaned.is_empty() {
                accumulated.push_str(&cleaned);
                on_update(accumulated);
            }
        }
    }
}
