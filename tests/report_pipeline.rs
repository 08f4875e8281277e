//! End-to-end tests for the report generation pipeline: streaming,
//! sanitization, error partitioning, and the local fallback path.

use futures_util::StreamExt;
use medivoice::error::ServiceError;
use medivoice::report::{ReportGenerator, ReportRequest, ReportStatus, ReportType};
use medivoice::session::{SessionProvider, StaticSession};
use medivoice::transport::{
    GeneratePayload, ReportTransport, StreamingResponse, TransportError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Transport that replays a scripted status and body, counting calls.
struct MockTransport {
    status: u16,
    chunks: Vec<Vec<u8>>,
    fail_connect: bool,
    fail_mid_stream: bool,
    hang: bool,
    calls: AtomicUsize,
}

impl MockTransport {
    fn with_stream(status: u16, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            chunks,
            fail_connect: false,
            fail_mid_stream: false,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_status(status: u16) -> Self {
        Self::with_stream(status, Vec::new())
    }

    fn unreachable_service() -> Self {
        Self {
            status: 0,
            chunks: Vec::new(),
            fail_connect: true,
            fail_mid_stream: false,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn hanging() -> Self {
        let mut transport = Self::with_status(200);
        transport.hang = true;
        transport
    }

    fn dropping_mid_stream(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status: 200,
            chunks,
            fail_connect: false,
            fail_mid_stream: true,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReportTransport for MockTransport {
    async fn open_stream(
        &self,
        _payload: &GeneratePayload,
        _token: Option<&str>,
    ) -> Result<StreamingResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_connect {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        if self.hang {
            return Ok(StreamingResponse {
                status: self.status,
                body: futures_util::stream::pending().boxed(),
            });
        }

        let mut items: Vec<Result<Vec<u8>, TransportError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        if self.fail_mid_stream {
            items.push(Err(TransportError::Stream("connection reset".to_string())));
        }

        Ok(StreamingResponse {
            status: self.status,
            body: futures_util::stream::iter(items).boxed(),
        })
    }
}

fn generator(transport: Arc<MockTransport>) -> ReportGenerator {
    let session: Arc<dyn SessionProvider> = Arc::new(StaticSession::new(Some("tok".into())));
    ReportGenerator::new(transport, session, Duration::ZERO)
}

fn request(transcription: &str) -> ReportRequest {
    ReportRequest {
        transcription: transcription.to_string(),
        report_type: ReportType::General,
        patient_id: None,
        doctor_name: None,
    }
}

fn sse(content: &str) -> Vec<u8> {
    format!(
        "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n\n",
        serde_json::to_string(content).unwrap()
    )
    .into_bytes()
}

const DONE: &[u8] = b"data: [DONE]\n\n";

#[tokio::test]
async fn streamed_report_is_sanitized_and_accumulated() {
    let transport = Arc::new(MockTransport::with_stream(
        200,
        vec![
            sse("**Diagnosis**"),
            sse(": migraine, "),
            sse("## likely tension-type"),
            DONE.to_vec(),
        ],
    ));
    let generator = generator(transport.clone());

    let mut updates: Vec<String> = Vec::new();
    let result = generator
        .generate(&request("Patient reports headache for two days."), |text| {
            updates.push(text.to_string())
        })
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::Complete);
    assert_eq!(result.text, "Diagnosis: migraine,  likely tension-type");
    assert!(!result.text.contains('*'));
    assert!(!result.text.contains('#'));
    assert_eq!(updates.last().unwrap(), &result.text);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn updates_are_monotonic_prefixes() {
    let transport = Arc::new(MockTransport::with_stream(
        200,
        vec![sse("Chief "), sse("complaint: "), sse("headache."), DONE.to_vec()],
    ));
    let generator = generator(transport);

    let mut updates: Vec<String> = Vec::new();
    generator
        .generate(&request("Patient reports headache."), |text| {
            updates.push(text.to_string())
        })
        .await
        .unwrap();

    assert_eq!(updates.len(), 3);
    for pair in updates.windows(2) {
        assert!(pair[1].starts_with(pair[0].as_str()));
        assert!(pair[1].len() >= pair[0].len());
    }
}

#[tokio::test]
async fn chunk_boundaries_inside_events_do_not_corrupt_output() {
    // One event split at arbitrary byte offsets across three transport chunks.
    let event = sse("Assessment: naïve reading of symptoms");
    let chunks = vec![
        event[..7].to_vec(),
        event[7..29].to_vec(),
        event[29..].to_vec(),
        DONE.to_vec(),
    ];
    let transport = Arc::new(MockTransport::with_stream(200, chunks));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    assert_eq!(result.text, "Assessment: naïve reading of symptoms");
    assert_eq!(result.status, ReportStatus::Complete);
}

#[tokio::test]
async fn malformed_events_are_skipped_without_losing_the_stream() {
    let transport = Arc::new(MockTransport::with_stream(
        200,
        vec![
            sse("Plan: "),
            b"data: {not json at all\n\n".to_vec(),
            sse("rest and hydration."),
            DONE.to_vec(),
        ],
    ));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    assert_eq!(result.text, "Plan: rest and hydration.");
    assert_eq!(result.status, ReportStatus::Complete);
}

#[tokio::test]
async fn empty_transcript_fails_without_calling_the_service() {
    let transport = Arc::new(MockTransport::with_status(200));
    let generator = generator(transport.clone());

    let result = generator.generate(&request("   "), |_| {}).await;

    assert!(matches!(result, Err(ServiceError::EmptyInput)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn server_error_routes_to_local_fallback() {
    let transport = Arc::new(MockTransport::with_status(500));
    let generator = generator(transport);

    let mut updates: Vec<String> = Vec::new();
    let result = generator
        .generate(
            &ReportRequest {
                transcription: "Patient ID: MV-001\n\nPatient reports mild headache.".to_string(),
                report_type: ReportType::General,
                patient_id: None,
                doctor_name: None,
            },
            |text| updates.push(text.to_string()),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::FallbackUsed);
    assert!(result.text.contains("COMPREHENSIVE DIAGNOSTIC REPORT"));
    assert!(result.text.contains("MV-001"));
    assert!(result.text.contains("mild headache"));
    // Fallback replays word by word; the final update is the whole report.
    assert!(updates.len() > 1);
    assert_eq!(updates.last().unwrap(), &result.text);
}

#[tokio::test]
async fn missing_endpoint_routes_to_local_fallback() {
    let transport = Arc::new(MockTransport::with_status(404));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::FallbackUsed);
    assert!(!result.text.is_empty());
}

#[tokio::test]
async fn connect_failure_routes_to_local_fallback() {
    let transport = Arc::new(MockTransport::unreachable_service());
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::FallbackUsed);
    assert!(result.text.contains("generated locally"));
}

#[tokio::test]
async fn mid_stream_drop_routes_to_local_fallback() {
    let transport = Arc::new(MockTransport::dropping_mid_stream(vec![sse("Partial ")]));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    // The partial remote text is abandoned for a complete local report.
    assert_eq!(result.status, ReportStatus::FallbackUsed);
    assert!(result.text.contains("generated locally"));
}

#[tokio::test]
async fn rate_limit_is_terminal_with_no_fallback() {
    let transport = Arc::new(MockTransport::with_status(429));
    let generator = generator(transport);

    let mut updates = 0;
    let result = generator
        .generate(&request("Patient reports headache."), |_| updates += 1)
        .await;

    assert!(matches!(result, Err(ServiceError::RateLimited)));
    assert_eq!(updates, 0);
}

#[tokio::test]
async fn quota_exhaustion_is_terminal_with_no_fallback() {
    let transport = Arc::new(MockTransport::with_status(402));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await;

    assert!(matches!(result, Err(ServiceError::QuotaExceeded)));
}

#[tokio::test]
async fn other_client_errors_are_terminal_generation_failures() {
    let transport = Arc::new(MockTransport::with_status(422));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await;

    assert!(matches!(result, Err(ServiceError::Generation(422))));
}

#[tokio::test]
async fn empty_stream_body_routes_to_local_fallback() {
    let transport = Arc::new(MockTransport::with_stream(200, vec![DONE.to_vec()]));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::FallbackUsed);
}

#[tokio::test]
async fn stream_without_done_sentinel_still_completes() {
    let transport = Arc::new(MockTransport::with_stream(
        200,
        vec![sse("Full report text.")],
    ));
    let generator = generator(transport);

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::Complete);
    assert_eq!(result.text, "Full report text.");
}

#[tokio::test]
async fn cancel_stops_the_stream_and_keeps_partial_text() {
    let transport = Arc::new(MockTransport::with_stream(
        200,
        vec![sse("First "), sse("second "), sse("third"), DONE.to_vec()],
    ));
    let generator = generator(transport);

    // Request cancellation as soon as the first delta lands; the check runs
    // before the next chunk is consumed.
    let result = generator
        .generate(&request("Patient reports headache."), |_| generator.cancel())
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::Cancelled);
    assert_eq!(result.text, "First ");
}

#[tokio::test]
async fn second_generate_while_in_flight_is_rejected() {
    let transport = Arc::new(MockTransport::hanging());
    let session: Arc<dyn SessionProvider> = Arc::new(StaticSession::new(None));
    let generator = Arc::new(ReportGenerator::new(transport, session, Duration::ZERO));

    let first = {
        let generator = generator.clone();
        tokio::spawn(async move {
            generator
                .generate(&request("Patient reports headache."), |_| {})
                .await
        })
    };
    // Let the first run reach the stream before trying again.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = generator
        .generate(&request("Patient reports headache."), |_| {})
        .await;
    assert!(matches!(result, Err(ServiceError::InProgress)));

    first.abort();
}

#[tokio::test]
async fn context_lines_reach_the_fallback_report() {
    let transport = Arc::new(MockTransport::with_status(503));
    let generator = generator(transport);

    let result = generator
        .generate(
            &ReportRequest {
                transcription: "Patient reports mild headache.".to_string(),
                report_type: ReportType::Soap,
                patient_id: Some("MV-042".to_string()),
                doctor_name: Some("Dr. Osei".to_string()),
            },
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(result.status, ReportStatus::FallbackUsed);
    assert!(result.text.contains("Patient ID: MV-042"));
    assert!(result.text.contains("Dr. Osei"));
    assert!(result.text.contains("SUBJECTIVE"));
}
