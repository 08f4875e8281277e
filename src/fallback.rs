//! Local fallback report builder
//!
//! When the remote generator is unreachable (404, 5xx, network failure, or a
//! mid-stream drop) the pipeline still has to produce a report. This module
//! builds one deterministically from the transcript and a fixed template per
//! report type, then replays it word by word so the caller's streaming UI
//! behaves the same either way.

use crate::report::ReportType;
use chrono::Local;
use std::time::Duration;
use tokio::time::sleep;

/// Pull `Patient ID:` and `Attending Physician:` values out of an enriched
/// transcript, defaulting to "Not specified". The remaining lines become the
/// clinical body.
fn extract_metadata(transcription: &str) -> (String, String, String) {
    let patient_re = regex::Regex::new(r"Patient ID:\s*([^\n]+)").unwrap();
    let doctor_re = regex::Regex::new(r"Attending Physician:\s*([^\n]+)").unwrap();

    let patient_id = patient_re
        .captures(transcription)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "Not specified".to_string());
    let doctor_name = doctor_re
        .captures(transcription)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "Not specified".to_string());

    let body: String = transcription
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !line.starts_with("Patient ID:") && !line.starts_with("Attending Physician:")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    (patient_id, doctor_name, body)
}

/// Build a complete fallback report. Pure apart from the date stamp: the same
/// transcript and type always produce the same structure and content.
pub fn build_report(transcription: &str, report_type: ReportType) -> String {
    let (patient_id, doctor_name, body) = extract_metadata(transcription);
    let date = Local::now().format("%Y-%m-%d").to_string();

    tracing::info!("Building local {} report", report_type);

    let report = match report_type {
        ReportType::General => format!(
            "MEDIVOICE HOSPITAL\n\
             COMPREHENSIVE DIAGNOSTIC REPORT\n\
             \n\
             Date: {date}\n\
             \n\
             PATIENT INFORMATION\n\
             Patient ID: {patient_id}\n\
             \n\
             ATTENDING PHYSICIAN\n\
             {doctor_name}\n\
             \n\
             BACKGROUND & MANIFESTATIONS\n\
             {body}\n\
             \n\
             TESTS & RESULTS\n\
             Clinical evaluation performed during the visit. Additional \
             diagnostic testing to be ordered as clinically indicated.\n\
             \n\
             OBSERVATIONS\n\
             Findings as documented in the clinical narrative above.\n\
             \n\
             SUMMARY / DIAGNOSIS\n\
             Assessment based on the documented history and examination. \
             Formal diagnosis pending physician review.\n\
             \n\
             RECOMMENDATION\n\
             Physician to review this report and finalize the plan of care. \
             Follow-up as clinically appropriate."
        ),
        ReportType::Soap => format!(
            "SOAP NOTE\n\
             \n\
             Date: {date}\n\
             Patient ID: {patient_id}\n\
             Attending Physician: {doctor_name}\n\
             \n\
             SUBJECTIVE\n\
             {body}\n\
             \n\
             OBJECTIVE\n\
             Examination findings as documented during the encounter.\n\
             \n\
             ASSESSMENT\n\
             Assessment pending physician review of the documented history.\n\
             \n\
             PLAN\n\
             Plan of care to be finalized by the attending physician. \
             Follow-up as clinically appropriate."
        ),
        ReportType::Diagnostic => format!(
            "DIAGNOSTIC REPORT\n\
             \n\
             Date: {date}\n\
             Patient ID: {patient_id}\n\
             Attending Physician: {doctor_name}\n\
             \n\
             SPECIMEN / STUDY\n\
             As described in the clinical narrative.\n\
             \n\
             GROSS DESCRIPTION\n\
             {body}\n\
             \n\
             MICROSCOPIC / DETAILED FINDINGS\n\
             Detailed findings pending further review.\n\
             \n\
             DIAGNOSIS\n\
             Pending physician interpretation.\n\
             \n\
             COMMENT\n\
             Correlation with clinical findings is recommended."
        ),
    };

    format!(
        "{report}\n\
         \n\
         ---\n\
         Note: This report was generated locally from the dictated \
         transcript because the report service was unavailable. Please \
         review before signing."
    )
}

/// Replay a finished report as a growing sequence of prefixes, one word at a
/// time, mirroring how the remote stream is delivered. The final call always
/// carries the complete text.
pub async fn stream_words<F>(report: &str, delay: Duration, mut on_update: F)
where
    F: FnMut(&str),
{
    let mut end = 0;
    let mut chars = report.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        // Skip to the end of this word.
        let mut word_end = idx + c.len_utf8();
        while let Some(&(next_idx, next_c)) = chars.peek() {
            if next_c.is_whitespace() {
                break;
            }
            word_end = next_idx + next_c.len_utf8();
            chars.next();
        }
        end = word_end;
        on_update(&report[..end]);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    if end < report.len() {
        on_update(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "Patient ID: MV-001\n\
        Attending Physician: Dr. Osei\n\
        \n\
        Patient reports mild headache for two days. No fever.";

    #[test]
    fn test_metadata_extraction() {
        let (patient, doctor, body) = extract_metadata(TRANSCRIPT);
        assert_eq!(patient, "MV-001");
        assert_eq!(doctor, "Dr. Osei");
        assert!(body.contains("mild headache"));
        assert!(!body.contains("Patient ID:"));
        assert!(!body.contains("Attending Physician:"));
    }

    #[test]
    fn test_metadata_defaults() {
        let (patient, doctor, body) = extract_metadata("Just a plain narrative.");
        assert_eq!(patient, "Not specified");
        assert_eq!(doctor, "Not specified");
        assert_eq!(body, "Just a plain narrative.");
    }

    #[test]
    fn test_general_report_structure() {
        let report = build_report(TRANSCRIPT, ReportType::General);
        assert!(report.starts_with("MEDIVOICE HOSPITAL"));
        assert!(report.contains("COMPREHENSIVE DIAGNOSTIC REPORT"));
        assert!(report.contains("Patient ID: MV-001"));
        assert!(report.contains("Dr. Osei"));
        assert!(report.contains("BACKGROUND & MANIFESTATIONS"));
        assert!(report.contains("mild headache"));
        assert!(report.contains("generated locally"));
    }

    #[test]
    fn test_soap_report_sections() {
        let report = build_report(TRANSCRIPT, ReportType::Soap);
        for section in ["SUBJECTIVE", "OBJECTIVE", "ASSESSMENT", "PLAN"] {
            assert!(report.contains(section), "missing {}", section);
        }
        assert!(report.contains("mild headache"));
    }

    #[test]
    fn test_diagnostic_report_sections() {
        let report = build_report(TRANSCRIPT, ReportType::Diagnostic);
        for section in ["SPECIMEN", "GROSS DESCRIPTION", "DIAGNOSIS", "COMMENT"] {
            assert!(report.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let a = build_report(TRANSCRIPT, ReportType::General);
        let b = build_report(TRANSCRIPT, ReportType::General);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_markdown_markers() {
        for report_type in [ReportType::General, ReportType::Soap, ReportType::Diagnostic] {
            let report = build_report(TRANSCRIPT, report_type);
            assert!(!report.contains('*'));
            assert!(!report.contains('#'));
        }
    }

    #[tokio::test]
    async fn test_stream_words_prefixes_grow_to_full_text() {
        let report = "SOAP NOTE\n\nSUBJECTIVE\nHeadache for two days.";
        let mut updates: Vec<String> = Vec::new();
        stream_words(report, Duration::ZERO, |text| {
            updates.push(text.to_string());
        })
        .await;

        assert!(!updates.is_empty());
        for pair in updates.windows(2) {
            assert!(pair[1].len() > pair[0].len());
            assert!(pair[1].starts_with(pair[0].as_str()));
        }
        assert_eq!(updates.last().unwrap(), report);
    }

    #[tokio::test]
    async fn test_stream_words_updates_end_on_word_boundaries() {
        let mut updates: Vec<String> = Vec::new();
        stream_words("alpha beta gamma", Duration::ZERO, |text| {
            updates.push(text.to_string());
        })
        .await;
        assert_eq!(updates, vec!["alpha", "alpha beta", "alpha beta gamma"]);
    }

    #[tokio::test]
    async fn test_stream_words_empty_input() {
        let mut count = 0;
        stream_words("", Duration::ZERO, |_| count += 1).await;
        assert_eq!(count, 0);
    }
}
