use granero_core::error::GraneroError;
use granero_core::loss::summarize_batch;
use granero_core::repository::memory::{InMemoryRepository, StoreSnapshot};
use granero_core::repository::Repository;
use serde_json::json;
use std::path::Path;

use crate::output;

pub async fn run(batch_id: &str, store_file: &Path, output_format: &str) -> Result<(), GraneroError> {
    let repo = InMemoryRepository::new(StoreSnapshot::load(store_file)?);
    let entries = repo.loss_entries_for_batch(batch_id).await?;
    let summary = summarize_batch(batch_id, &entries);

    match output_format {
        "json" => output::json::print(&json!({ "summary": summary, "entries": entries }))?,
        _ => println!("{}", output::table::format_ledger(&summary, &entries)),
    }
    Ok(())
}
