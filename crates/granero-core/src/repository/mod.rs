//! Storage collaborator for ingestion.
//!
//! Silos, ships, batches and grain costs are read-only here. Loss rows are
//! only ever appended.

pub mod memory;

use crate::error::GraneroError;
use crate::loss::GrainCosts;
use crate::model::{GrainBatch, HistorialPerdidaSilo, MuestreoGrano, Ship, Silo};
use async_trait::async_trait;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn silos(&self) -> Result<Vec<Silo>, GraneroError>;

    async fn ships(&self) -> Result<Vec<Ship>, GraneroError>;

    async fn batches(&self) -> Result<Vec<GrainBatch>, GraneroError>;

    /// Cost per kilogram for every known grain type.
    async fn grain_costs(&self) -> Result<GrainCosts, GraneroError>;

    /// Store a report with its samples, replacing any earlier copy with the
    /// same report number.
    async fn upsert_report(&self, report: &MuestreoGrano) -> Result<(), GraneroError>;

    /// Add a loss row to the ledger. Never replaces an existing row.
    async fn append_loss_entry(&self, entry: &HistorialPerdidaSilo) -> Result<(), GraneroError>;

    async fn loss_entries_for_batch(
        &self,
        batch_id: &str,
    ) -> Result<Vec<HistorialPerdidaSilo>, GraneroError>;
}
