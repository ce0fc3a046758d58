use std::sync::Arc;

use anyhow::anyhow;

use crate::config::settings::EditSettings;
use crate::domain::edit::editable_value::{save_callback, EditableValue, SaveCallback, ValueTiming};
use crate::domain::edit::mode::ModeError;
use crate::domain::edit::session::{lock_session, EditError, EditSession, SharedSession};
use crate::domain::entities::edit::{Confirmation, EditMode};
use crate::domain::entities::record::{EditableRecord, FieldValue, RowId};
use crate::usecase::ports::repo::RecordRepository;
use crate::usecase::ports::validator::RecordValidator;
use crate::usecase::services::save_coordinator::{BatchSaveCoordinator, SaveError, SaveOutcome};

/// Everything the table view needs to edit one record type: mode changes,
/// pending edits, per-field autosave and the batch saves.
pub struct EditService<R: EditableRecord> {
    session: SharedSession<R>,
    coordinator: BatchSaveCoordinator<R>,
    timing: ValueTiming,
}

impl<R: EditableRecord> Clone for EditService<R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            coordinator: self.coordinator.clone(),
            timing: self.timing,
        }
    }
}

impl<R: EditableRecord> EditService<R> {
    pub fn new(
        repo: Arc<dyn RecordRepository<R>>,
        validator: Arc<dyn RecordValidator<R>>,
        settings: &EditSettings,
    ) -> Self {
        let session = EditSession::shared();
        let coordinator = BatchSaveCoordinator::new(
            session.clone(),
            repo,
            validator,
            settings.backstop_interval(),
        );
        Self {
            session,
            coordinator,
            timing: settings.value_timing(),
        }
    }

    pub fn session(&self) -> &SharedSession<R> {
        &self.session
    }

    pub fn coordinator(&self) -> &BatchSaveCoordinator<R> {
        &self.coordinator
    }

    pub fn edit_mode(&self) -> EditMode {
        lock_session(&self.session).edit_mode().clone()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        lock_session(&self.session).has_unsaved_changes()
    }

    pub fn pending_row_count(&self) -> usize {
        lock_session(&self.session).pending_row_count()
    }

    pub fn has_row_changes(&self, row_id: &RowId) -> bool {
        lock_session(&self.session).has_row_changes(row_id)
    }

    /// Loaded rows with pending edits applied.
    pub fn rows(&self) -> Vec<R> {
        lock_session(&self.session).effective_records()
    }

    pub fn enter_all_edit(&self) -> Result<(), ModeError> {
        lock_session(&self.session).enter_all_edit()?;
        self.coordinator.sync_backstop();
        Ok(())
    }

    pub fn toggle_single_edit(
        &self,
        row_id: &RowId,
        confirmation: Confirmation,
    ) -> Result<(), ModeError> {
        lock_session(&self.session).toggle_single_edit(row_id, confirmation)
    }

    pub fn exit_edit(&self, confirmation: Confirmation) -> Result<(), ModeError> {
        let result = lock_session(&self.session).exit_edit(confirmation);
        self.coordinator.sync_backstop();
        result
    }

    pub fn update_field(
        &self,
        row_id: &RowId,
        field: R::Field,
        value: FieldValue,
    ) -> Result<(), EditError> {
        lock_session(&self.session).edit_field(row_id, field, value)?;
        self.coordinator.sync_backstop();
        Ok(())
    }

    pub fn undo_row(&self, row_id: &RowId) -> bool {
        let undone = lock_session(&self.session)
            .undo_row_changes(row_id)
            .is_some();
        self.coordinator.sync_backstop();
        undone
    }

    pub async fn save_row(&self, row_id: &RowId) -> Result<SaveOutcome, SaveError> {
        self.coordinator.save_row(row_id).await
    }

    pub async fn save_all(&self) -> Result<SaveOutcome, SaveError> {
        self.coordinator.save_all().await
    }

    /// Saver for a quick-edit field: records the value as a pending change
    /// and saves the row straight away.
    pub fn field_saver(&self, row_id: &RowId, field: R::Field) -> SaveCallback {
        let service = self.clone();
        let row_id = row_id.clone();
        save_callback(move |value: FieldValue| {
            let service = service.clone();
            let row_id = row_id.clone();
            async move { service.save_field(&row_id, field, value).await }
        })
    }

    async fn save_field(
        &self,
        row_id: &RowId,
        field: R::Field,
        value: FieldValue,
    ) -> anyhow::Result<Option<FieldValue>> {
        self.update_field(row_id, field, value)?;
        match self.save_row(row_id).await? {
            SaveOutcome::Saved { .. } | SaveOutcome::NothingPending => {}
            SaveOutcome::Skipped => return Err(anyhow!("row {row_id} save skipped")),
        }
        let session = lock_session(&self.session);
        let stored = session
            .record(row_id)
            .map(|record| record.get(field))
            .ok_or_else(|| anyhow!("row {row_id} is no longer loaded"))?;
        Ok(Some(stored))
    }

    /// Cell state for one field. In quick edit of `row_id` the cell saves
    /// itself; otherwise edits only reach the pending changes.
    pub fn field_value(&self, row_id: &RowId, field: R::Field) -> Option<EditableValue> {
        let (server, mode) = {
            let session = lock_session(&self.session);
            let server = session.record(row_id)?.get(field);
            (server, session.edit_mode().clone())
        };
        let quick_edit_row = mode.editing_row_id() == Some(row_id);
        let value = EditableValue::new(server, mode, self.timing);
        Some(if quick_edit_row {
            value.with_saver(self.field_saver(row_id, field))
        } else {
            value
        })
    }

    /// Stops background saving. Pending changes are left as they are.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }
}
