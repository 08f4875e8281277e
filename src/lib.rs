//! Medivoice: medical dictation to structured clinical reports
//!
//! This library provides the core functionality for:
//! - Transcribing dictated audio via the remote dictation service
//! - Enhancing transcripts (medical terminology, DOCTOR:/PATIENT: diarization)
//! - Streaming report generation over SSE with sanitized accumulation
//! - Deterministic local fallback reports when the service is unavailable
//! - Report history in a local SQLite database
//!
//! # Pipeline
//!
//! ```text
//!   audio file
//!       │
//!       ▼
//!  ┌──────────────┐   multipart    ┌─────────────────────┐
//!  │ Transcription │ ────────────▶ │  /transcribe        │
//!  │    Client     │ ◀──────────── │  (remote service)   │
//!  └──────────────┘   transcript   └─────────────────────┘
//!       │
//!       ▼ raw text
//!  ┌──────────────┐     JSON       ┌─────────────────────┐
//!  │ Enhancement  │ ────────────▶  │ /process-           │
//!  │    Client    │ ◀────────────  │   transcription     │
//!  └──────────────┘  diarized text └─────────────────────┘
//!       │
//!       ▼ enhanced text (+ patient/physician context)
//!  ┌──────────────┐   SSE stream   ┌─────────────────────┐
//!  │    Report    │ ────────────▶  │ /generate-report    │
//!  │  Generator   │ ◀────────────  │                     │
//!  └──────────────┘  content deltas└─────────────────────┘
//!       │                    │
//!       │ 2xx: sanitize +    │ 404/5xx/network:
//!       │ accumulate         ▼
//!       │            ┌──────────────┐
//!       │            │   Fallback   │ (local template,
//!       │            │   Builder    │  word-by-word replay)
//!       │            └──────────────┘
//!       ▼
//!  finished report ──▶ ReportStore (SQLite history)
//! ```

pub mod cli;
pub mod config;
pub mod enhance;
pub mod error;
pub mod fallback;
pub mod report;
pub mod sanitize;
pub mod session;
pub mod sse;
pub mod store;
pub mod transcribe;
pub mod transport;

pub use cli::{Cli, Commands, HistoryAction};
pub use config::Config;
pub use error::{MedivoiceError, Result};
pub use report::{ReportGenerator, ReportRequest, ReportResult, ReportStatus, ReportType};
