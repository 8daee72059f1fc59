use crate::model::ReportHeader;
use crate::parsing::values::parse_date_loose;

const REPORT_NUMBER_LABELS: &[&str] = &[
    "número de informe",
    "numero de informe",
    "informe n°",
    "informe nº",
    "informe no.",
    "informe no",
    "reporte n°",
    "reporte no",
    "report no.",
    "report no",
];

const CLIENT_LABELS: &[&str] = &["cliente", "client"];

const SERVICE_DATE_LABELS: &[&str] = &[
    "fecha de servicio",
    "fecha servicio",
    "fecha de muestreo",
    "service date",
];

const REPORT_DATE_LABELS: &[&str] = &[
    "fecha de informe",
    "fecha informe",
    "fecha de emisión",
    "fecha de emision",
    "report date",
];

/// Extract the report-level fields from the text lines of a report.
///
/// The first occurrence of each field wins, so repeated page headers do not
/// overwrite what the first page said.
pub fn parse_header(lines: &[&str]) -> ReportHeader {
    let mut header = ReportHeader::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if header.report_number.is_none() {
            header.report_number = first_label_value(line, REPORT_NUMBER_LABELS);
        }

        if header.client.is_none() {
            header.client = first_label_value(line, CLIENT_LABELS);
        }

        if header.service_date.is_none() {
            header.service_date =
                first_label_value(line, SERVICE_DATE_LABELS).and_then(|v| parse_date_loose(&v));
        }

        if header.report_date.is_none() {
            header.report_date =
                first_label_value(line, REPORT_DATE_LABELS).and_then(|v| parse_date_loose(&v));
        }
    }

    header
}

/// Only the first label present in the line is tried, so "Cliente:" with no
/// value is not re-read through the shorter "client" label.
fn first_label_value(line: &str, labels: &[&str]) -> Option<String> {
    let lower = line.to_lowercase();
    let label = labels.iter().find(|label| lower.contains(**label))?;
    extract_after_label(line, label)
}

/// Extract a value appearing after a label (case-insensitive).
/// Handles "Label: value" and "Label    value". The value stops at the next
/// gap of 3+ spaces, where the next column of the header starts.
fn extract_after_label(line: &str, label: &str) -> Option<String> {
    let lower = line.to_lowercase();
    let idx = lower.find(label)?;
    // Lowercasing can shift byte offsets for some scripts; give up rather than
    // slice mid-character.
    let after = line.get(idx + label.len()..)?;
    let trimmed = after.trim_start_matches(|c: char| {
        c == ':' || c == '.' || c == '°' || c == 'º' || c == '#' || c.is_whitespace()
    });
    let value = match trimmed.find("   ") {
        Some(gap_pos) => trimmed[..gap_pos].trim(),
        None => trimmed.trim(),
    };
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
