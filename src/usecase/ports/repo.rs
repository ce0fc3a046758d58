use thiserror::Error;

use crate::domain::entities::record::{
    EditableRecord, FieldKind, FieldValue, RowId, DATE_FORMAT,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("{0}")]
    Message(String),
    #[error("record {0} not found")]
    NotFound(RowId),
}

impl From<anyhow::Error> for RepoError {
    fn from(err: anyhow::Error) -> Self {
        RepoError::Message(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub include_archived: bool,
    /// Case-insensitive substring match against the record's text columns.
    pub search: String,
}

/// A field value in the shape storage expects. Dates travel as
/// `YYYY-MM-DD` text; cleared dates and numbers become `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistedValue {
    Null,
    Text(String),
    Bool(bool),
    Number(f64),
}

impl PersistedValue {
    pub fn from_field_value(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => PersistedValue::Text(text.clone()),
            FieldValue::Boolean(flag) => PersistedValue::Bool(*flag),
            FieldValue::Date(Some(date)) => {
                PersistedValue::Text(date.format(DATE_FORMAT).to_string())
            }
            FieldValue::Number(Some(number)) => PersistedValue::Number(*number),
            FieldValue::Date(None) | FieldValue::Number(None) => PersistedValue::Null,
        }
    }

    /// Reads a stored value back as a field of `kind`. Returns `None` when
    /// the stored shape cannot represent that kind.
    pub fn to_field_value(&self, kind: FieldKind) -> Option<FieldValue> {
        match (kind, self) {
            (FieldKind::Text, PersistedValue::Text(text)) => Some(FieldValue::Text(text.clone())),
            (FieldKind::Text, PersistedValue::Null) => Some(FieldValue::Text(String::new())),
            (FieldKind::Boolean, PersistedValue::Bool(flag)) => Some(FieldValue::Boolean(*flag)),
            (FieldKind::Boolean, PersistedValue::Number(number)) => {
                Some(FieldValue::Boolean(*number != 0.0))
            }
            (FieldKind::Date, PersistedValue::Null) => Some(FieldValue::Date(None)),
            (FieldKind::Date, PersistedValue::Text(text)) => {
                FieldValue::parse(FieldKind::Date, text).ok()
            }
            (FieldKind::Number, PersistedValue::Null) => Some(FieldValue::Number(None)),
            (FieldKind::Number, PersistedValue::Number(number)) => {
                Some(FieldValue::Number(Some(*number)))
            }
            _ => None,
        }
    }
}

/// One row's field-level changes, already normalised for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate<F> {
    pub id: RowId,
    pub changes: Vec<(F, PersistedValue)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpdateResult {
    pub updated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedRecord {
    pub id: RowId,
    pub reason: String,
}

/// Outcome of a bulk delete. Blocked rows are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_ids: Vec<RowId>,
    pub blocked: Vec<BlockedRecord>,
    /// Set when some rows were blocked; archiving them is the usual way out.
    pub suggest_archive: bool,
}

impl DeleteResult {
    pub fn deleted_count(&self) -> usize {
        self.deleted_ids.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }

    pub fn blocked_reason(&self, id: &RowId) -> Option<&str> {
        self.blocked
            .iter()
            .find(|blocked| &blocked.id == id)
            .map(|blocked| blocked.reason.as_str())
    }
}

/// Storage for one record type. Calls are blocking; async callers run them
/// on the blocking pool.
pub trait RecordRepository<R: EditableRecord>: Send + Sync {
    fn init(&self) -> Result<(), RepoError>;

    fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<R>, RepoError>;
    /// Applies one row's changes and returns the stored row.
    fn update_record(&self, update: &RecordUpdate<R::Field>) -> Result<R, RepoError>;
    /// Applies every update or none of them.
    fn bulk_update_records(
        &self,
        updates: &[RecordUpdate<R::Field>],
    ) -> Result<BulkUpdateResult, RepoError>;
    fn bulk_archive_records(&self, ids: &[RowId]) -> Result<usize, RepoError>;
    fn bulk_unarchive_records(&self, ids: &[RowId]) -> Result<usize, RepoError>;
    fn bulk_delete_records(&self, ids: &[RowId]) -> Result<DeleteResult, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn dates_are_stored_as_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            PersistedValue::from_field_value(&FieldValue::Date(Some(date))),
            PersistedValue::Text("2024-03-09".to_string())
        );
        assert_eq!(
            PersistedValue::Text("2024-03-09".to_string()).to_field_value(FieldKind::Date),
            Some(FieldValue::Date(Some(date)))
        );
    }

    #[test]
    fn cleared_values_become_null() {
        assert_eq!(
            PersistedValue::from_field_value(&FieldValue::Number(None)),
            PersistedValue::Null
        );
        assert_eq!(
            PersistedValue::from_field_value(&FieldValue::Date(None)),
            PersistedValue::Null
        );
        assert_eq!(
            PersistedValue::Null.to_field_value(FieldKind::Text),
            Some(FieldValue::text(""))
        );
    }

    #[test]
    fn mismatched_storage_shape_is_rejected() {
        assert_eq!(
            PersistedValue::Text("many".to_string()).to_field_value(FieldKind::Number),
            None
        );
    }

    #[test]
    fn delete_result_reports_blocked_reasons() {
        let result = DeleteResult {
            deleted_ids: vec![RowId::from("S1")],
            blocked: vec![BlockedRecord {
                id: RowId::from("S2"),
                reason: "has active purchases".to_string(),
            }],
            suggest_archive: true,
        };
        assert_eq!(result.deleted_count(), 1);
        assert_eq!(result.blocked_count(), 1);
        assert_eq!(
            result.blocked_reason(&RowId::from("S2")),
            Some("has active purchases")
        );
        assert_eq!(result.blocked_reason(&RowId::from("S1")), None);
    }
}
