use crate::domain::entities::edit::RowChanges;
use crate::domain::entities::record::{EditableRecord, FieldError, FieldValue, RecordField, RowId};

/// Pending edits for every row of one table, kept in first-edited order.
#[derive(Debug, Clone)]
pub struct RowChangeTracker<R: EditableRecord> {
    rows: Vec<RowChanges<R::Field>>,
}

impl<R: EditableRecord> Default for RowChangeTracker<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: EditableRecord> RowChangeTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, row_id: &RowId) -> Option<usize> {
        self.rows.iter().position(|entry| &entry.row_id == row_id)
    }

    /// Merges one field edit into the row's pending entry. Setting a field back
    /// to its server value drops the key, and an emptied entry is removed.
    pub fn update_row_data(
        &mut self,
        record: &R,
        field: R::Field,
        value: FieldValue,
    ) -> Result<(), FieldError> {
        field.check(&value)?;
        let row_id = record.row_id();
        let unchanged = record.get(field) == value;

        match self.position(row_id) {
            Some(idx) => {
                let entry = &mut self.rows[idx];
                if unchanged {
                    entry.changes.remove(&field);
                } else {
                    entry.changes.insert(field, value);
                }
                if entry.is_empty() {
                    self.rows.remove(idx);
                }
            }
            None if unchanged => {}
            None => {
                let mut entry = RowChanges::new(row_id.clone());
                entry.changes.insert(field, value);
                self.rows.push(entry);
            }
        }
        Ok(())
    }

    pub fn undo_row_changes(&mut self, row_id: &RowId) -> Option<RowChanges<R::Field>> {
        let idx = self.position(row_id)?;
        Some(self.rows.remove(idx))
    }

    /// `fallback` with every pending override for `row_id` applied.
    pub fn get_row_data(&self, row_id: &RowId, fallback: &R) -> R {
        let mut effective = fallback.clone();
        if let Some(entry) = self.row_changes(row_id) {
            for (field, value) in &entry.changes {
                if let Err(err) = effective.set(*field, value.clone()) {
                    tracing::warn!(%row_id, "skipping pending value: {err}");
                }
            }
        }
        effective
    }

    pub fn has_row_changes(&self, row_id: &RowId) -> bool {
        self.position(row_id).is_some()
    }

    pub fn has_changes(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn pending_row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_changes(&self, row_id: &RowId) -> Option<&RowChanges<R::Field>> {
        self.rows.iter().find(|entry| &entry.row_id == row_id)
    }

    pub fn get_all_changes(&self) -> Vec<RowChanges<R::Field>> {
        self.rows.clone()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Drops the fields of a persisted row whose pending value is still the one
    /// that was submitted. Edits made while the save was in flight survive.
    /// Returns true when nothing is left pending for the row.
    pub fn settle_row(&mut self, submitted: &RowChanges<R::Field>) -> bool {
        let Some(idx) = self.position(&submitted.row_id) else {
            return true;
        };
        let entry = &mut self.rows[idx];
        entry.changes.retain(|field, value| submitted.changes.get(field) != Some(&*value));
        if entry.is_empty() {
            self.rows.remove(idx);
            true
        } else {
            false
        }
    }
}
