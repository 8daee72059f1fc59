use super::Repository;
use crate::error::GraneroError;
use crate::loss::GrainCosts;
use crate::model::{GrainBatch, HistorialPerdidaSilo, MuestreoGrano, Ship, Silo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Everything the in-memory repository holds, as stored in a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub silos: Vec<Silo>,
    #[serde(default)]
    pub ships: Vec<Ship>,
    #[serde(default)]
    pub batches: Vec<GrainBatch>,
    #[serde(default)]
    pub grain_costs: GrainCosts,
    #[serde(default)]
    pub reports: Vec<MuestreoGrano>,
    #[serde(default)]
    pub ledger: Vec<HistorialPerdidaSilo>,
}

impl StoreSnapshot {
    pub fn load(path: &Path) -> Result<StoreSnapshot, GraneroError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GraneroError::Repository(format!("cannot read store {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), GraneroError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Repository over a [`StoreSnapshot`] kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: Mutex<StoreSnapshot>,
}

impl InMemoryRepository {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        InMemoryRepository {
            store: Mutex::new(snapshot),
        }
    }

    /// Copy of the current contents, e.g. to write back to disk.
    pub fn snapshot(&self) -> Result<StoreSnapshot, GraneroError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreSnapshot>, GraneroError> {
        self.store
            .lock()
            .map_err(|_| GraneroError::Repository("store lock poisoned".into()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn silos(&self) -> Result<Vec<Silo>, GraneroError> {
        Ok(self.lock()?.silos.clone())
    }

    async fn ships(&self) -> Result<Vec<Ship>, GraneroError> {
        Ok(self.lock()?.ships.clone())
    }

    async fn batches(&self) -> Result<Vec<GrainBatch>, GraneroError> {
        Ok(self.lock()?.batches.clone())
    }

    async fn grain_costs(&self) -> Result<GrainCosts, GraneroError> {
        Ok(self.lock()?.grain_costs.clone())
    }

    async fn upsert_report(&self, report: &MuestreoGrano) -> Result<(), GraneroError> {
        let mut store = self.lock()?;
        let existing = report.report_number.as_ref().and_then(|number| {
            store
                .reports
                .iter()
                .position(|r| r.report_number.as_ref() == Some(number))
        });
        match existing {
            Some(i) => store.reports[i] = report.clone(),
            None => store.reports.push(report.clone()),
        }
        Ok(())
    }

    async fn append_loss_entry(&self, entry: &HistorialPerdidaSilo) -> Result<(), GraneroError> {
        self.lock()?.ledger.push(entry.clone());
        Ok(())
    }

    async fn loss_entries_for_batch(
        &self,
        batch_id: &str,
    ) -> Result<Vec<HistorialPerdidaSilo>, GraneroError> {
        Ok(self
            .lock()?
            .ledger
            .iter()
            .filter(|e| e.batch_id.as_deref() == Some(batch_id))
            .cloned()
            .collect())
    }
}
