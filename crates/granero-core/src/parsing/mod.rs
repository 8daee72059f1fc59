pub mod header;
pub mod row;
pub mod tokens;
pub mod values;

use crate::model::{MuestreoGrano, ReportHeader, Sample};
use header::parse_header;
use row::{is_silo_code, parse_row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const REPORT_NUMBER_WEIGHT: u8 = 20;
const CLIENT_WEIGHT: u8 = 20;
const SAMPLES_WEIGHT: u8 = 60;

/// A row candidate that could not be parsed into a sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedLine {
    /// 1-based line number in the extracted text.
    pub line_number: usize,
    pub text: String,
}

/// Everything recovered from one report's extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub header: ReportHeader,
    pub samples: Vec<Sample>,
    /// 0-100, for a human reviewer deciding whether to trust the parse.
    pub confidence: u8,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_lines: Vec<SkippedLine>,
}

impl ExtractionResult {
    pub fn into_report(self) -> MuestreoGrano {
        MuestreoGrano::new(self.header, self.samples)
    }
}

/// Recover the sample grid and report header from extracted report text.
///
/// Lines starting with a silo code are row candidates; every other line is
/// read for header fields. A row that fails to parse is recorded and skipped,
/// it never aborts the report.
pub fn extract_table(text: &str) -> ExtractionResult {
    let mut header_lines: Vec<&str> = Vec::new();
    let mut samples = Vec::new();
    let mut skipped_lines = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if !tokens.first().is_some_and(|t| is_silo_code(t)) {
            header_lines.push(trimmed);
            continue;
        }

        match parse_row(&tokens) {
            Some(sample) => samples.push(sample),
            None => {
                debug!(line = idx + 1, "skipping unparseable row");
                skipped_lines.push(SkippedLine {
                    line_number: idx + 1,
                    text: trimmed.to_string(),
                });
            }
        }
    }

    let header = parse_header(&header_lines);

    let mut confidence = 0;
    let mut warnings = Vec::new();

    if header.report_number.is_some() {
        confidence += REPORT_NUMBER_WEIGHT;
    } else {
        warnings.push("report number not found".to_string());
    }

    if header.client.is_some() {
        confidence += CLIENT_WEIGHT;
    } else {
        warnings.push("client not found".to_string());
    }

    if samples.is_empty() {
        warnings.push("no rows extracted: document may be a scanned image".to_string());
    } else {
        confidence += SAMPLES_WEIGHT;
    }

    info!(
        samples = samples.len(),
        skipped = skipped_lines.len(),
        confidence,
        "extracted sample table"
    );

    ExtractionResult {
        header,
        samples,
        confidence,
        warnings,
        skipped_lines,
    }
}
