use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::entities::record::{EditableRecord, FieldValue, RowId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("row {row_id}: {field} is required")]
    Required { row_id: RowId, field: &'static str },
    #[error("row {row_id}: {field} \"{value}\" is already used")]
    Duplicate {
        row_id: RowId,
        field: &'static str,
        value: String,
    },
    #[error("row {row_id}: {field} {message}")]
    Invalid {
        row_id: RowId,
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    pub fn row_id(&self) -> &RowId {
        match self {
            ValidationError::Required { row_id, .. }
            | ValidationError::Duplicate { row_id, .. }
            | ValidationError::Invalid { row_id, .. } => row_id,
        }
    }
}

/// Checks pending changes before they are submitted.
///
/// `changes` may be rewritten in place to the normalised form that will be
/// stored. `others` holds every other loaded row, pending edits applied.
pub trait RecordValidator<R: EditableRecord>: Send + Sync {
    fn validate(
        &self,
        record: &R,
        changes: &mut BTreeMap<R::Field, FieldValue>,
        others: &[R],
    ) -> Result<(), ValidationError>;
}
