use std::marker::PhantomData;
use std::path::Path;

use anyhow::Result;

use crate::domain::entities::record::EditableRecord;
use crate::infra::export::csv::export_records_to_csv;

pub struct ExportService<R: EditableRecord> {
    _record: PhantomData<R>,
}

impl<R: EditableRecord> Default for ExportService<R> {
    fn default() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R: EditableRecord> ExportService<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports the rows as shown, pending edits included.
    pub fn export_csv(&self, path: &Path, rows: &[R]) -> Result<usize> {
        let count = export_records_to_csv(path, rows)?;
        tracing::info!(count, path = %path.display(), "rows exported");
        Ok(count)
    }
}
