use std::collections::BTreeMap;

use crate::domain::entities::record::{FieldValue, RecordField, RowId};

/// Pending values for one row. A field missing from `changes` is unchanged
/// from the server value.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChanges<F: RecordField> {
    pub row_id: RowId,
    pub changes: BTreeMap<F, FieldValue>,
}

impl<F: RecordField> RowChanges<F> {
    pub fn new(row_id: RowId) -> Self {
        Self {
            row_id,
            changes: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Viewing,
    QuickEdit(RowId),
    BulkEdit,
}

impl EditMode {
    pub fn editing_row_id(&self) -> Option<&RowId> {
        match self {
            EditMode::QuickEdit(row_id) => Some(row_id),
            _ => None,
        }
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self, EditMode::Viewing)
    }

    pub fn is_quick_edit(&self) -> bool {
        matches!(self, EditMode::QuickEdit(_))
    }

    pub fn is_bulk_edit(&self) -> bool {
        matches!(self, EditMode::BulkEdit)
    }

    pub fn can_edit_row(&self, row_id: &RowId) -> bool {
        match self {
            EditMode::Viewing => false,
            EditMode::QuickEdit(editing) => editing == row_id,
            EditMode::BulkEdit => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EditMode::Viewing => "viewing",
            EditMode::QuickEdit(_) => "quickEdit",
            EditMode::BulkEdit => "bulkEdit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// Cell address over the currently visible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub row: usize,
    pub col: usize,
}

impl CursorPosition {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Whether the caller already asked the user before discarding unsaved changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Unconfirmed,
    Confirmed,
}
