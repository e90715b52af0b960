use crate::error::{AppError, AppResult};
use crate::stats::SummaryRecord;
use crate::table::Table;
use std::sync::{Arc, RwLock};

/// A parsed table together with its summary
#[derive(Debug)]
pub struct Dataset {
    pub table: Table,
    pub summary: SummaryRecord,
}

/// Holder of the current dataset
///
/// Uploads swap in a whole new snapshot; readers clone the `Arc` and drop the
/// lock straight away, so a slow page render never blocks an upload and
/// never sees a half-replaced table.
#[derive(Debug, Default)]
pub struct DataStore {
    current: RwLock<Option<Arc<Dataset>>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `dataset` the current one, returning the shared snapshot
    pub fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        let snapshot = Arc::new(dataset);
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// The current dataset, if anything has been uploaded
    pub fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The current dataset, or `NotFound`
    pub fn require(&self) -> AppResult<Arc<Dataset>> {
        self.snapshot().ok_or_else(AppError::no_data)
    }
}
