//! Medivoice - medical dictation to structured clinical reports
//!
//! Use `medivoice transcribe <file>` to transcribe an audio recording.
//! Use `medivoice enhance <file>` to correct terminology and label speakers.
//! Use `medivoice generate <file>` to stream a clinical report to stdout.
//! Use `medivoice history` to browse saved reports.

use anyhow::{anyhow, Context};
use clap::Parser;
use medivoice::cli::{Cli, Commands, HistoryAction};
use medivoice::config::{self, Config};
use medivoice::enhance::{EnhancementClient, EnhancementOptions};
use medivoice::report::{ReportGenerator, ReportRequest, ReportStatus, ReportType};
use medivoice::session::StaticSession;
use medivoice::store::{self, ReportStore, StoredReport};
use medivoice::transcribe::{AudioFormat, TranscriptionClient};
use medivoice::transport::HttpReportTransport;
use medivoice::{fallback, session::SessionProvider};
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("medivoice={},warn", log_level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(endpoint) = cli.endpoint {
        config.service.endpoint = Some(endpoint);
    }

    // Run the appropriate command
    match cli.command {
        Commands::Transcribe { file, language } => {
            run_transcribe(&config, &file, language.as_deref()).await?;
        }

        Commands::Enhance {
            file,
            no_diarization,
            no_terminology,
        } => {
            run_enhance(&config, file.as_deref(), no_diarization, no_terminology).await?;
        }

        Commands::Generate {
            file,
            report_type,
            patient,
            doctor,
            save,
        } => {
            run_generate(&config, file.as_deref(), report_type, patient, doctor, save).await?;
        }

        Commands::History { action } => {
            run_history(&config, action)?;
        }

        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

fn session_for(config: &Config) -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::from_config(&config.service))
}

fn require_endpoint(config: &Config) -> anyhow::Result<&str> {
    config.service.endpoint.as_deref().ok_or_else(|| {
        anyhow!(
            "No service endpoint configured. Set [service] endpoint in the \
             config file, MEDIVOICE_ENDPOINT, or pass --endpoint."
        )
    })
}

/// Read a transcript from a file or stdin.
fn read_transcript(path: Option<&std::path::Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read transcript from {:?}", path)),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read transcript from stdin")?;
            Ok(text)
        }
    }
}

/// Transcribe an audio file
async fn run_transcribe(
    config: &Config,
    path: &std::path::Path,
    language: Option<&str>,
) -> anyhow::Result<()> {
    let format = AudioFormat::from_path(path).ok_or_else(|| {
        anyhow!(
            "Unrecognized audio format for {:?} (expected webm, mp4, m4a, mp3, wav, or ogg)",
            path
        )
    })?;
    let audio = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;

    let endpoint = require_endpoint(config)?;
    let client = TranscriptionClient::new(endpoint, config.service.timeout_secs, session_for(config))?;

    let language = language.unwrap_or(&config.transcription.language);
    let result = client.transcribe(audio, format, language).await?;

    if let Some(duration) = result.duration_secs {
        tracing::info!("Audio duration: {:.1}s", duration);
    }
    println!("{}", result.text);
    Ok(())
}

/// Enhance a transcript
async fn run_enhance(
    config: &Config,
    path: Option<&std::path::Path>,
    no_diarization: bool,
    no_terminology: bool,
) -> anyhow::Result<()> {
    let transcript = read_transcript(path)?;

    let endpoint = require_endpoint(config)?;
    let client = EnhancementClient::new(endpoint, config.service.timeout_secs, session_for(config))?;

    let options = EnhancementOptions {
        diarization: config.enhancement.diarization && !no_diarization,
        terminology: config.enhancement.terminology && !no_terminology,
    };

    let enhanced = client.enhance(&transcript, options).await?;
    if !enhanced.speakers.is_empty() {
        let labels: Vec<String> = enhanced.speakers.iter().map(|s| s.to_string()).collect();
        tracing::info!("Speakers: {}", labels.join(", "));
    }
    println!("{}", enhanced.text);
    Ok(())
}

/// Prints the growing report text incrementally. When a mid-stream failure
/// hands off to the fallback builder the accumulated text restarts from
/// scratch, so the printer re-syncs instead of assuming a prefix.
struct IncrementalPrinter {
    shown: String,
}

impl IncrementalPrinter {
    fn new() -> Self {
        Self {
            shown: String::new(),
        }
    }

    fn update(&mut self, text: &str) {
        if !text.starts_with(&self.shown) {
            println!();
            self.shown.clear();
        }
        print!("{}", &text[self.shown.len()..]);
        let _ = std::io::stdout().flush();
        self.shown = text.to_string();
    }
}

/// Generate a report, streaming it to stdout as it arrives
async fn run_generate(
    config: &Config,
    path: Option<&std::path::Path>,
    report_type: Option<String>,
    patient: Option<String>,
    doctor: Option<String>,
    save: bool,
) -> anyhow::Result<()> {
    let transcript = read_transcript(path)?;

    let report_type = match report_type {
        Some(s) => s.parse::<ReportType>().map_err(|e| anyhow!(e))?,
        None => config.report.default_type,
    };

    let request = ReportRequest {
        transcription: transcript,
        report_type,
        patient_id: patient.clone(),
        doctor_name: doctor.clone(),
    };

    let delay = Duration::from_millis(config.report.fallback_word_delay_ms);

    // Without an endpoint there is nothing remote to try; build locally.
    let result = match config.service.endpoint.as_deref() {
        Some(endpoint) => {
            let transport = Arc::new(HttpReportTransport::new(
                endpoint,
                config.service.timeout_secs,
            )?);
            let generator = ReportGenerator::new(transport, session_for(config), delay);

            let mut printer = IncrementalPrinter::new();
            let result = generator
                .generate(&request, |text| printer.update(text))
                .await?;
            println!();
            result
        }
        None => {
            tracing::warn!("No service endpoint configured, building report locally");
            let report = fallback::build_report(&request.enriched_transcription(), report_type);
            let mut printer = IncrementalPrinter::new();
            fallback::stream_words(&report, delay, |text| printer.update(text)).await;
            println!();
            medivoice::report::ReportResult {
                text: report,
                status: ReportStatus::FallbackUsed,
            }
        }
    };

    match result.status {
        ReportStatus::FallbackUsed => {
            eprintln!("\nNote: the report service was unavailable; this report was built locally.");
        }
        ReportStatus::Cancelled => {
            eprintln!("\nReport generation was cancelled before completion.");
        }
        ReportStatus::Complete => {}
    }

    if save {
        let dir = config
            .resolve_storage_dir()
            .ok_or_else(|| anyhow!("Report history is disabled in the config ([storage] path)"))?;
        let store = ReportStore::open(&dir)?;
        let report = StoredReport {
            id: store::generate_id(),
            transcription: request.transcription.clone(),
            report_content: result.text.clone(),
            report_type: report_type.to_string(),
            created_at: chrono::Utc::now(),
            duration_secs: None,
            word_count: result.text.split_whitespace().count(),
            patient_id: patient,
            doctor_name: doctor,
            audio_url: None,
        };
        store.save(&report)?;
        eprintln!("Saved report {}", report.id);
    }

    Ok(())
}

/// Browse saved reports
fn run_history(config: &Config, action: HistoryAction) -> anyhow::Result<()> {
    let dir = config
        .resolve_storage_dir()
        .ok_or_else(|| anyhow!("Report history is disabled in the config ([storage] path)"))?;
    let store = ReportStore::open(&dir)?;

    match action {
        HistoryAction::List { limit } => {
            let reports = store.list(limit)?;
            if reports.is_empty() {
                println!("No saved reports.");
                return Ok(());
            }
            for report in reports {
                println!(
                    "{}  {}  {:<10}  {} words  {}",
                    report.id,
                    report.created_at.format("%Y-%m-%d %H:%M"),
                    report.report_type,
                    report.word_count,
                    report.patient_id.as_deref().unwrap_or("-"),
                );
            }
        }

        HistoryAction::Show { id } => {
            let report = store.get(&id)?;
            println!("{}", report.report_content);
        }

        HistoryAction::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted report {}", id);
        }

        HistoryAction::Search { query } => {
            let reports = store.search(&query)?;
            if reports.is_empty() {
                println!("No reports match {:?}.", query);
                return Ok(());
            }
            for report in reports {
                println!(
                    "{}  {}  {}",
                    report.id,
                    report.created_at.format("%Y-%m-%d %H:%M"),
                    report.report_type,
                );
            }
        }
    }

    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[service]");
    println!("  endpoint = {:?}", config.service.endpoint);
    println!(
        "  api_key = {}",
        if config.service.api_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!("  timeout_secs = {}", config.service.timeout_secs);

    println!("\n[transcription]");
    println!("  language = {:?}", config.transcription.language);

    println!("\n[enhancement]");
    println!("  diarization = {}", config.enhancement.diarization);
    println!("  terminology = {}", config.enhancement.terminology);

    println!("\n[report]");
    println!("  default_type = {:?}", config.report.default_type.to_string());
    println!(
        "  fallback_word_delay_ms = {}",
        config.report.fallback_word_delay_ms
    );

    println!("\n[storage]");
    println!("  path = {:?}", config.storage.path);
    match config.resolve_storage_dir() {
        Some(dir) => println!("  (resolved to {:?})", dir),
        None => println!("  (history disabled)"),
    }

    if let Some(path) = Config::default_path() {
        println!("\nConfig file: {:?}", path);
    }

    Ok(())
}
