use thiserror::Error;

use crate::domain::edit::tracker::RowChangeTracker;
use crate::domain::entities::edit::{Confirmation, EditMode};
use crate::domain::entities::record::{EditableRecord, RowId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("row {row_id} is in quick edit; finish it before editing all rows")]
    QuickEditActive { row_id: RowId },
    #[error("all rows are being edited")]
    BulkEditActive,
    #[error("{pending_rows} row(s) have unsaved changes")]
    UnsavedChanges { pending_rows: usize },
    #[error("the table is not in an edit mode")]
    NotEditing,
    #[error("row {row_id} is not editable in the current mode")]
    RowNotEditable { row_id: RowId },
}

/// Owns the table's edit mode. Transitions that would drop pending edits
/// only go through once the caller passes `Confirmation::Confirmed`.
#[derive(Debug, Clone, Default)]
pub struct EditModeController {
    mode: EditMode,
}

impl EditModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn enter_all_edit(&mut self) -> Result<(), ModeError> {
        match &self.mode {
            EditMode::Viewing => {
                self.set_mode(EditMode::BulkEdit);
                Ok(())
            }
            EditMode::BulkEdit => Ok(()),
            EditMode::QuickEdit(row_id) => Err(ModeError::QuickEditActive {
                row_id: row_id.clone(),
            }),
        }
    }

    pub fn toggle_single_edit<R: EditableRecord>(
        &mut self,
        row_id: &RowId,
        tracker: &mut RowChangeTracker<R>,
        confirmation: Confirmation,
    ) -> Result<(), ModeError> {
        let next = match &self.mode {
            EditMode::Viewing => EditMode::QuickEdit(row_id.clone()),
            EditMode::BulkEdit => return Err(ModeError::BulkEditActive),
            EditMode::QuickEdit(current) => {
                let current = current.clone();
                guard_discard(tracker.has_row_changes(&current), confirmation)?;
                tracker.undo_row_changes(&current);
                if &current == row_id {
                    EditMode::Viewing
                } else {
                    EditMode::QuickEdit(row_id.clone())
                }
            }
        };
        self.set_mode(next);
        Ok(())
    }

    /// Leaves any edit mode, discarding the pending rows that mode owned.
    pub fn exit_edit<R: EditableRecord>(
        &mut self,
        tracker: &mut RowChangeTracker<R>,
        confirmation: Confirmation,
    ) -> Result<(), ModeError> {
        match &self.mode {
            EditMode::Viewing => return Ok(()),
            EditMode::BulkEdit => {
                guard_discard(tracker.has_changes(), confirmation).map_err(|_| {
                    ModeError::UnsavedChanges {
                        pending_rows: tracker.pending_row_count(),
                    }
                })?;
                tracker.clear();
            }
            EditMode::QuickEdit(row_id) => {
                let row_id = row_id.clone();
                guard_discard(tracker.has_row_changes(&row_id), confirmation)?;
                tracker.undo_row_changes(&row_id);
            }
        }
        self.set_mode(EditMode::Viewing);
        Ok(())
    }

    pub fn ensure_editable(&self, row_id: &RowId) -> Result<(), ModeError> {
        match &self.mode {
            EditMode::Viewing => Err(ModeError::NotEditing),
            mode if mode.can_edit_row(row_id) => Ok(()),
            _ => Err(ModeError::RowNotEditable {
                row_id: row_id.clone(),
            }),
        }
    }

    fn set_mode(&mut self, next: EditMode) {
        tracing::debug!(from = self.mode.label(), to = next.label(), "edit mode transition");
        self.mode = next;
    }
}

fn guard_discard(has_pending: bool, confirmation: Confirmation) -> Result<(), ModeError> {
    if has_pending && confirmation == Confirmation::Unconfirmed {
        Err(ModeError::UnsavedChanges { pending_rows: 1 })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::supplier::{Supplier, SupplierField};

    fn pending_tracker(records: &[&Supplier]) -> RowChangeTracker<Supplier> {
        let mut tracker = RowChangeTracker::new();
        for record in records {
            tracker
                .update_row_data(*record, SupplierField::Notes, "edited".into())
                .unwrap();
        }
        tracker
    }

    #[test]
    fn toggle_enters_and_leaves_quick_edit() {
        let s1 = RowId::from("S1");
        let mut tracker = RowChangeTracker::<Supplier>::new();
        let mut controller = EditModeController::new();

        controller
            .toggle_single_edit(&s1, &mut tracker, Confirmation::Unconfirmed)
            .unwrap();
        assert_eq!(controller.mode(), &EditMode::QuickEdit(s1.clone()));
        assert_eq!(controller.mode().editing_row_id(), Some(&s1));

        controller
            .toggle_single_edit(&s1, &mut tracker, Confirmation::Unconfirmed)
            .unwrap();
        assert_eq!(controller.mode(), &EditMode::Viewing);
    }

    #[test]
    fn switching_rows_with_pending_changes_needs_confirmation() {
        let s1 = Supplier::new("S1", "One");
        let s2 = RowId::from("S2");
        let mut tracker = pending_tracker(&[&s1]);
        let mut controller = EditModeController::new();
        controller
            .toggle_single_edit(&s1.id, &mut tracker, Confirmation::Unconfirmed)
            .unwrap();

        let refused = controller.toggle_single_edit(&s2, &mut tracker, Confirmation::Unconfirmed);
        assert!(matches!(refused, Err(ModeError::UnsavedChanges { .. })));
        assert_eq!(controller.mode(), &EditMode::QuickEdit(s1.id.clone()));
        assert!(tracker.has_row_changes(&s1.id));

        controller
            .toggle_single_edit(&s2, &mut tracker, Confirmation::Confirmed)
            .unwrap();
        assert_eq!(controller.mode(), &EditMode::QuickEdit(s2));
        assert!(!tracker.has_row_changes(&s1.id));
    }

    #[test]
    fn bulk_and_quick_edit_exclude_each_other() {
        let s1 = RowId::from("S1");
        let mut tracker = RowChangeTracker::<Supplier>::new();
        let mut controller = EditModeController::new();

        controller.enter_all_edit().unwrap();
        assert_eq!(
            controller.toggle_single_edit(&s1, &mut tracker, Confirmation::Confirmed),
            Err(ModeError::BulkEditActive)
        );

        controller
            .exit_edit(&mut tracker, Confirmation::Unconfirmed)
            .unwrap();
        controller
            .toggle_single_edit(&s1, &mut tracker, Confirmation::Unconfirmed)
            .unwrap();
        assert_eq!(
            controller.enter_all_edit(),
            Err(ModeError::QuickEditActive { row_id: s1 })
        );
    }

    #[test]
    fn exit_from_bulk_edit_discards_every_row_once_confirmed() {
        let s1 = Supplier::new("S1", "One");
        let s2 = Supplier::new("S2", "Two");
        let mut tracker = pending_tracker(&[&s1, &s2]);
        let mut controller = EditModeController::new();
        controller.enter_all_edit().unwrap();

        assert_eq!(
            controller.exit_edit(&mut tracker, Confirmation::Unconfirmed),
            Err(ModeError::UnsavedChanges { pending_rows: 2 })
        );
        assert!(controller.mode().is_bulk_edit());

        controller
            .exit_edit(&mut tracker, Confirmation::Confirmed)
            .unwrap();
        assert!(controller.mode().is_viewing());
        assert!(!tracker.has_changes());
    }

    #[test]
    fn exit_from_quick_edit_only_discards_the_editing_row() {
        let s1 = Supplier::new("S1", "One");
        let s2 = Supplier::new("S2", "Two");
        let mut tracker = pending_tracker(&[&s1, &s2]);
        let mut controller = EditModeController::new();
        controller
            .toggle_single_edit(&s1.id, &mut tracker, Confirmation::Confirmed)
            .unwrap();

        controller
            .exit_edit(&mut tracker, Confirmation::Confirmed)
            .unwrap();
        assert!(!tracker.has_row_changes(&s1.id));
        assert!(tracker.has_row_changes(&s2.id));
    }

    #[test]
    fn editability_follows_mode() {
        let s1 = RowId::from("S1");
        let s2 = RowId::from("S2");
        let mut tracker = RowChangeTracker::<Supplier>::new();
        let mut controller = EditModeController::new();
        assert_eq!(controller.ensure_editable(&s1), Err(ModeError::NotEditing));

        controller
            .toggle_single_edit(&s1, &mut tracker, Confirmation::Unconfirmed)
            .unwrap();
        assert!(controller.ensure_editable(&s1).is_ok());
        assert_eq!(
            controller.ensure_editable(&s2),
            Err(ModeError::RowNotEditable { row_id: s2.clone() })
        );

        controller
            .exit_edit(&mut tracker, Confirmation::Unconfirmed)
            .unwrap();
        controller.enter_all_edit().unwrap();
        assert!(controller.ensure_editable(&s2).is_ok());
    }
}
