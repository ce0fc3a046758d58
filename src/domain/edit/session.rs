use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::domain::edit::mode::{EditModeController, ModeError};
use crate::domain::edit::tracker::RowChangeTracker;
use crate::domain::entities::edit::{Confirmation, EditMode, RowChanges};
use crate::domain::entities::record::{EditableRecord, FieldError, FieldValue, RowId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error(transparent)]
    Mode(#[from] ModeError),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("row {0} is not loaded")]
    UnknownRow(RowId),
}

/// Edit state of one table instance: the last known server rows, the current
/// mode and every pending row.
#[derive(Debug, Clone)]
pub struct EditSession<R: EditableRecord> {
    records: Vec<R>,
    tracker: RowChangeTracker<R>,
    controller: EditModeController,
}

pub type SharedSession<R> = Arc<Mutex<EditSession<R>>>;

/// Every mutation completes inside one lock scope, so a poisoned lock still
/// holds consistent state.
pub fn lock_session<R: EditableRecord>(session: &SharedSession<R>) -> MutexGuard<'_, EditSession<R>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: EditableRecord> Default for EditSession<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            tracker: RowChangeTracker::new(),
            controller: EditModeController::new(),
        }
    }
}

impl<R: EditableRecord> EditSession<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession<R> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Replaces the server snapshot, e.g. after a refetch. Pending edits stay.
    pub fn set_records(&mut self, records: Vec<R>) {
        self.records = records;
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn record(&self, row_id: &RowId) -> Option<&R> {
        self.records.iter().find(|record| record.row_id() == row_id)
    }

    /// Every loaded row with its pending edits applied, in display order.
    pub fn effective_records(&self) -> Vec<R> {
        self.records
            .iter()
            .map(|record| self.tracker.get_row_data(record.row_id(), record))
            .collect()
    }

    pub fn edit_mode(&self) -> &EditMode {
        self.controller.mode()
    }

    pub fn editing_row_id(&self) -> Option<&RowId> {
        self.controller.mode().editing_row_id()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker.has_changes()
    }

    pub fn pending_row_count(&self) -> usize {
        self.tracker.pending_row_count()
    }

    pub fn get_row_data(&self, row_id: &RowId, fallback: &R) -> R {
        self.tracker.get_row_data(row_id, fallback)
    }

    pub fn has_row_changes(&self, row_id: &RowId) -> bool {
        self.tracker.has_row_changes(row_id)
    }

    pub fn row_changes(&self, row_id: &RowId) -> Option<&RowChanges<R::Field>> {
        self.tracker.row_changes(row_id)
    }

    pub fn get_all_changes(&self) -> Vec<RowChanges<R::Field>> {
        self.tracker.get_all_changes()
    }

    pub fn enter_all_edit(&mut self) -> Result<(), ModeError> {
        self.controller.enter_all_edit()
    }

    pub fn toggle_single_edit(
        &mut self,
        row_id: &RowId,
        confirmation: Confirmation,
    ) -> Result<(), ModeError> {
        self.controller
            .toggle_single_edit(row_id, &mut self.tracker, confirmation)
    }

    pub fn exit_edit(&mut self, confirmation: Confirmation) -> Result<(), ModeError> {
        self.controller.exit_edit(&mut self.tracker, confirmation)
    }

    /// Records an edit to `record`. Refused while viewing, and in quick edit
    /// for any row other than the one being edited.
    pub fn update_row_data(
        &mut self,
        record: &R,
        field: R::Field,
        value: FieldValue,
    ) -> Result<(), EditError> {
        self.controller.ensure_editable(record.row_id())?;
        self.tracker.update_row_data(record, field, value)?;
        Ok(())
    }

    /// `update_row_data` against the loaded server row with id `row_id`.
    pub fn edit_field(
        &mut self,
        row_id: &RowId,
        field: R::Field,
        value: FieldValue,
    ) -> Result<(), EditError> {
        let idx = self
            .records
            .iter()
            .position(|record| record.row_id() == row_id)
            .ok_or_else(|| EditError::UnknownRow(row_id.clone()))?;
        self.controller.ensure_editable(row_id)?;
        self.tracker.update_row_data(&self.records[idx], field, value)?;
        Ok(())
    }

    pub fn undo_row_changes(&mut self, row_id: &RowId) -> Option<RowChanges<R::Field>> {
        self.tracker.undo_row_changes(row_id)
    }

    pub fn settle_row(&mut self, submitted: &RowChanges<R::Field>) -> bool {
        self.tracker.settle_row(submitted)
    }

    /// Writes persisted values into the server snapshot.
    pub fn apply_persisted(&mut self, persisted: &RowChanges<R::Field>) {
        let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.row_id() == &persisted.row_id)
        else {
            return;
        };
        for (field, value) in &persisted.changes {
            if let Err(err) = record.set(*field, value.clone()) {
                tracing::warn!(row_id = %persisted.row_id, "persisted value not applied: {err}");
            }
        }
    }

    pub fn replace_record(&mut self, updated: R) {
        match self
            .records
            .iter_mut()
            .find(|record| record.row_id() == updated.row_id())
        {
            Some(record) => *record = updated,
            None => self.records.push(updated),
        }
    }

    /// Drops rows that no longer exist, along with their pending edits.
    pub fn forget_rows<'a>(&mut self, row_ids: impl IntoIterator<Item = &'a RowId>) {
        for row_id in row_ids {
            self.tracker.undo_row_changes(row_id);
            self.records.retain(|record| record.row_id() != row_id);
        }
    }
}
