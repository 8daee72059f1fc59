use granero_core::form::FormMapping;
use granero_core::ingest::IngestOutcome;
use granero_core::loss::BatchLossSummary;
use granero_core::model::{HistorialPerdidaSilo, ReportHeader, Sample};
use granero_core::parsing::ExtractionResult;

pub fn format_extraction(result: &ExtractionResult) -> String {
    let mut out = Vec::new();
    header_lines(&result.header, &mut out);
    out.push(format!("  Confidence: {}/100", result.confidence));
    out.push(String::new());
    sample_lines(&result.samples, &mut out);
    warning_lines(&result.warnings, &mut out);
    if !result.skipped_lines.is_empty() {
        out.push(format!(
            "  {} line(s) skipped during parsing:",
            result.skipped_lines.len()
        ));
        for skipped in &result.skipped_lines {
            out.push(format!("    {:>4}: {}", skipped.line_number, skipped.text));
        }
    }
    out.join("\n")
}

pub fn format_form(mapping: &FormMapping) -> String {
    let mut out = Vec::new();
    header_lines(&mapping.header, &mut out);
    out.push(String::new());
    sample_lines(&mapping.samples, &mut out);
    warning_lines(&mapping.warnings, &mut out);
    out.join("\n")
}

pub fn format_outcome(outcome: &IngestOutcome) -> String {
    let report = &outcome.report;
    let mut out = Vec::new();
    out.push(format!(
        "Report {}: {} sample(s) in {} silo(s), risk {}",
        report.report_number.as_deref().unwrap_or("-"),
        report.samples.len(),
        outcome.silos,
        outcome.risk_level
    ));
    if let Some(confidence) = outcome.confidence {
        out.push(format!("  Confidence: {}/100", confidence));
    }
    out.push(String::new());

    if outcome.ledger.is_empty() {
        out.push("  No loss rows recorded.".to_string());
    } else {
        out.push(format!(
            "  {:<8} {:<14} {:<10} {:>10} {:>10} {:>12} {:>12}",
            "Silo", "Batch", "Week", "Tons", "Weevils", "Damage kg", "Loss"
        ));
        for row in &outcome.ledger {
            out.push(ledger_row(row));
        }
    }
    out.push(String::new());
    warning_lines(&outcome.warnings, &mut out);
    out.join("\n")
}

pub fn format_ledger(summary: &BatchLossSummary, entries: &[HistorialPerdidaSilo]) -> String {
    let mut out = Vec::new();
    out.push(format!("Batch {}", summary.batch_id));
    if summary.entries == 0 {
        out.push("  No loss rows recorded for this batch.".to_string());
        return out.join("\n");
    }

    let weeks = match (summary.first_week, summary.last_week) {
        (Some(first), Some(last)) => format!("{} .. {}", first, last),
        _ => "-".to_string(),
    };
    out.push(format!("  Entries: {} ({})", summary.entries, weeks));
    out.push(format!("  Silos: {}", summary.silos.join(", ")));
    out.push(format!(
        "  Total damage: {} kg",
        summary.damage_total_pest_kg.round_dp(3)
    ));
    out.push(format!(
        "  Total economic loss: {}",
        summary.economic_loss.round_dp(2)
    ));
    out.push(String::new());

    out.push(format!(
        "  {:<8} {:<14} {:<10} {:>10} {:>10} {:>12} {:>12}",
        "Silo", "Batch", "Week", "Tons", "Weevils", "Damage kg", "Loss"
    ));
    for row in entries {
        out.push(ledger_row(row));
    }
    out.join("\n")
}

fn ledger_row(row: &HistorialPerdidaSilo) -> String {
    format!(
        "  {:<8} {:<14} {:<10} {:>10} {:>10} {:>12} {:>12}",
        row.silo,
        row.batch_id.as_deref().unwrap_or("(unmatched)"),
        row.week_date.to_string(),
        row.total_tons.round_dp(2).to_string(),
        row.avg_live_weevils.round_dp(1).to_string(),
        row.damage_total_pest_kg.round_dp(3).to_string(),
        row.weekly_economic_loss.round_dp(2).to_string(),
    )
}

fn header_lines(header: &ReportHeader, out: &mut Vec<String>) {
    out.push(format!(
        "Report: {}",
        header.report_number.as_deref().unwrap_or("-")
    ));
    out.push(format!("  Client: {}", header.client.as_deref().unwrap_or("-")));
    if let Some(date) = header.service_date {
        out.push(format!("  Service date: {}", date));
    }
    if let Some(date) = header.report_date {
        out.push(format!("  Report date: {}", date));
    }
}

fn sample_lines(samples: &[Sample], out: &mut Vec<String>) {
    if samples.is_empty() {
        out.push("  No samples.".to_string());
        out.push(String::new());
        return;
    }

    let ship_width = samples
        .iter()
        .map(|s| s.ship.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    out.push(format!(
        "  {:<8} {:<7} {:<sw$} {:<8} {:<10} {:>4} {:>5} {:>5} {:>10}",
        "Silo",
        "Pos",
        "Ship",
        "Grain",
        "Stored",
        "Days",
        "Alive",
        "Dead",
        "Tons",
        sw = ship_width
    ));
    for s in samples {
        let stored = s
            .storage_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push(format!(
            "  {:<8} {:<7} {:<sw$} {:<8} {:<10} {:>4} {:>5} {:>5} {:>10}",
            s.silo,
            s.muestra.to_string(),
            s.ship,
            s.grain_type,
            stored,
            s.days_stored,
            s.total_alive(),
            s.total_dead(),
            s.observation.to_string(),
            sw = ship_width
        ));
    }
    out.push(String::new());
}

fn warning_lines(warnings: &[String], out: &mut Vec<String>) {
    for w in warnings {
        out.push(format!("  warning: {}", w));
    }
}
