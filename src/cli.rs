// Command-line interface definitions for medivoice
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages. It must stay self-contained:
// build.rs pulls it in with include!, outside the crate.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "medivoice")]
#[command(author, version, about = "Medical dictation: transcribe, enhance, and generate clinical reports")]
#[command(long_about = "
Medivoice turns dictated audio into structured clinical reports.

A recording is transcribed by the remote dictation service, optionally
enhanced (medical terminology correction and DOCTOR:/PATIENT: speaker
labeling), and then streamed through the report generator into a general,
SOAP, or diagnostic report. When the report service is unavailable the
report is built locally from a template so dictated content is never lost.

SETUP:
  1. Set the service endpoint in ~/.config/medivoice/config.toml
     (or via MEDIVOICE_ENDPOINT)
  2. Export MEDIVOICE_API_KEY or set api_key in the config file
  3. Run: medivoice generate --type soap visit.txt

USAGE:
  medivoice transcribe visit.webm > transcript.txt
  medivoice enhance transcript.txt > enhanced.txt
  medivoice generate --type general --patient MV-001 enhanced.txt
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the service endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe an audio file (webm, mp4/m4a, mp3, wav, ogg)
    Transcribe {
        /// Path to audio file
        file: std::path::PathBuf,

        /// Language hint (overrides config)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,
    },

    /// Enhance a transcript: fix medical terminology, label speaker turns
    Enhance {
        /// Path to transcript file (reads stdin when omitted)
        file: Option<std::path::PathBuf>,

        /// Skip DOCTOR:/PATIENT: speaker labeling
        #[arg(long)]
        no_diarization: bool,

        /// Skip medical terminology correction
        #[arg(long)]
        no_terminology: bool,
    },

    /// Generate a clinical report from a transcript, streaming to stdout
    Generate {
        /// Path to transcript file (reads stdin when omitted)
        file: Option<std::path::PathBuf>,

        /// Report format: general, soap, or diagnostic
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        report_type: Option<String>,

        /// Patient identifier to include in the report
        #[arg(long, value_name = "ID")]
        patient: Option<String>,

        /// Attending physician name to include in the report
        #[arg(long, value_name = "NAME")]
        doctor: Option<String>,

        /// Save the finished report to history
        #[arg(long)]
        save: bool,
    },

    /// Browse saved reports
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List saved reports, newest first
    List {
        /// Maximum number of reports to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print one saved report
    Show {
        /// Report ID
        id: String,
    },

    /// Delete a saved report
    Delete {
        /// Report ID
        id: String,
    },

    /// Search transcripts and report bodies
    Search {
        /// Substring to look for
        query: String,
    },
}
