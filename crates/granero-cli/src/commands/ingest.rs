use chrono::{Local, NaiveDate};
use granero_core::error::GraneroError;
use granero_core::extraction::pdftotext::PdftotextExtractor;
use granero_core::ingest::{ingest_document, ingest_form, ingest_text};
use granero_core::repository::memory::{InMemoryRepository, StoreSnapshot};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{engine_config, has_extension};
use crate::output;

pub async fn run(
    input_file: PathBuf,
    store_file: &Path,
    config_file: Option<&Path>,
    week: Option<NaiveDate>,
    output_format: &str,
) -> Result<(), GraneroError> {
    let config = engine_config(config_file)?;
    let fallback_week = week.unwrap_or_else(|| Local::now().date_naive());

    let snapshot = if store_file.exists() {
        StoreSnapshot::load(store_file)?
    } else {
        warn!(store = %store_file.display(), "store file not found, starting empty");
        StoreSnapshot::default()
    };
    let repo = InMemoryRepository::new(snapshot);

    let outcome = if has_extension(&input_file, "json") {
        let content = std::fs::read_to_string(&input_file)?;
        let submission: serde_json::Value = serde_json::from_str(&content)?;
        ingest_form(&submission, &repo, &config, fallback_week).await?
    } else if has_extension(&input_file, "txt") {
        let text = std::fs::read_to_string(&input_file)?;
        ingest_text(&text, &repo, &config, fallback_week).await?
    } else {
        let bytes = std::fs::read(&input_file)?;
        let extractor = PdftotextExtractor::new();
        ingest_document(&bytes, &extractor, &repo, &config, fallback_week).await?
    };

    repo.snapshot()?.save(store_file)?;

    match output_format {
        "json" => output::json::print(&outcome)?,
        _ => println!("{}", output::table::format_outcome(&outcome)),
    }
    Ok(())
}
