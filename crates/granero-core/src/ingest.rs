//! Report ingestion: parse, group by silo, match batches, record losses.

use crate::config::EngineConfig;
use crate::error::GraneroError;
use crate::extraction::layout::assemble_text;
use crate::extraction::{PositionedToken, TextExtractor};
use crate::form::map_form;
use crate::loss::compute_loss;
use crate::matching::silo::SiloResolver;
use crate::matching::BatchMatcher;
use crate::model::{HistorialPerdidaSilo, MuestreoGrano, RiskLevel, Sample};
use crate::parsing::{extract_table, SkippedLine};
use crate::repository::Repository;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Result of ingesting one report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub report: MuestreoGrano,
    /// Silo groups the samples fell into, one ledger row each.
    pub silos: usize,
    pub risk_level: RiskLevel,
    /// Only set for extracted documents; form submissions have no score.
    pub confidence: Option<u8>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_lines: Vec<SkippedLine>,
    /// Loss rows appended to the ledger, one per silo.
    pub ledger: Vec<HistorialPerdidaSilo>,
}

/// Ingest already-extracted report text.
///
/// `fallback_week` files the loss rows when the report carries neither a
/// service date nor a report date.
pub async fn ingest_text(
    text: &str,
    repo: &dyn Repository,
    config: &EngineConfig,
    fallback_week: NaiveDate,
) -> Result<IngestOutcome, GraneroError> {
    let extraction = extract_table(text);
    let confidence = extraction.confidence;
    let warnings = extraction.warnings.clone();
    let skipped_lines = extraction.skipped_lines.clone();
    let report = extraction.into_report();

    let ledger = record(&report, repo, config, fallback_week).await?;

    Ok(IngestOutcome {
        silos: ledger.len(),
        risk_level: report.risk_level(ledger.len()),
        report,
        confidence: Some(confidence),
        warnings,
        skipped_lines,
        ledger,
    })
}

/// Ingest positioned words, assembled into lines with `config.line_gap`.
pub async fn ingest_tokens(
    tokens: &[PositionedToken],
    repo: &dyn Repository,
    config: &EngineConfig,
    fallback_week: NaiveDate,
) -> Result<IngestOutcome, GraneroError> {
    let text = assemble_text(tokens, config.line_gap);
    ingest_text(&text, repo, config, fallback_week).await
}

/// Extract and ingest a document. Extraction failures are returned as-is.
pub async fn ingest_document(
    document: &[u8],
    extractor: &dyn TextExtractor,
    repo: &dyn Repository,
    config: &EngineConfig,
    fallback_week: NaiveDate,
) -> Result<IngestOutcome, GraneroError> {
    let tokens = extractor.extract_tokens(document)?;
    info!(
        backend = extractor.backend_name(),
        words = tokens.len(),
        "extracted document"
    );
    ingest_tokens(&tokens, repo, config, fallback_week).await
}

/// Ingest a structured form submission.
pub async fn ingest_form(
    submission: &Value,
    repo: &dyn Repository,
    config: &EngineConfig,
    fallback_week: NaiveDate,
) -> Result<IngestOutcome, GraneroError> {
    let mapping = map_form(submission);
    let report = MuestreoGrano::new(mapping.header, mapping.samples);

    let ledger = record(&report, repo, config, fallback_week).await?;

    Ok(IngestOutcome {
        silos: ledger.len(),
        risk_level: report.risk_level(ledger.len()),
        report,
        confidence: None,
        warnings: mapping.warnings,
        skipped_lines: Vec::new(),
        ledger,
    })
}

/// Persist the report and append one loss row per silo group.
///
/// A report without samples is not persisted.
async fn record(
    report: &MuestreoGrano,
    repo: &dyn Repository,
    config: &EngineConfig,
    fallback_week: NaiveDate,
) -> Result<Vec<HistorialPerdidaSilo>, GraneroError> {
    if report.samples.is_empty() {
        warn!(
            report = report.report_number.as_deref().unwrap_or("-"),
            "report has no samples; nothing recorded"
        );
        return Ok(Vec::new());
    }

    for sample in &report.samples {
        if sample.storage_date.is_none() && sample.grain_type.is_empty() {
            warn!(
                silo = %sample.silo,
                muestra = %sample.muestra,
                "sample has neither grain type nor storage date"
            );
        }
    }

    let silos = repo.silos().await?;
    let ships = repo.ships().await?;
    let batches = repo.batches().await?;
    let costs = repo.grain_costs().await?;

    let resolver = SiloResolver::new(&silos, config);
    let matcher = BatchMatcher::new(&resolver, &batches, &ships);
    let week = report.week_date().unwrap_or(fallback_week);
    let report_number = report.report_number.as_deref();

    let mut rows = Vec::new();
    for (silo, samples) in group_by_silo(&report.samples, &resolver) {
        let ship = first_non_empty(&samples, |s| &s.ship);
        let grain = first_non_empty(&samples, |s| &s.grain_type);
        let batch = matcher.find(&silo, ship, grain, Some(week));
        rows.push(compute_loss(
            &silo,
            &samples,
            batch.as_ref(),
            &costs,
            week,
            report_number,
        ));
    }

    repo.upsert_report(report).await?;
    for row in &rows {
        repo.append_loss_entry(row).await?;
    }

    info!(
        report = report_number.unwrap_or("-"),
        week = %week,
        silos = rows.len(),
        matched = rows.iter().filter(|r| r.batch_id.is_some()).count(),
        "recorded report"
    );

    Ok(rows)
}

/// Group samples under the silo id they resolve to, or their canonical code
/// when the silo is unknown.
fn group_by_silo(samples: &[Sample], resolver: &SiloResolver) -> BTreeMap<String, Vec<Sample>> {
    let mut groups: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        let key = match resolver.resolve(&sample.silo) {
            Some(id) => id.to_string(),
            None => resolver.canonical(&sample.silo),
        };
        groups.entry(key).or_default().push(sample.clone());
    }
    groups
}

fn first_non_empty<'a>(samples: &'a [Sample], field: impl Fn(&'a Sample) -> &'a String) -> &'a str {
    samples
        .iter()
        .map(|s| field(s).trim())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}
