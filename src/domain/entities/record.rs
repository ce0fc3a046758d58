use std::fmt;
use std::hash::Hash;

use chrono::NaiveDate;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        RowId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Boolean,
    Date,
    Number,
}

/// A single cell value. Dates and numbers may be empty.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Boolean(bool),
    Date(Option<NaiveDate>),
    Number(Option<f64>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("field `{field}` expects a {expected:?} value, got {actual:?}")]
    KindMismatch {
        field: &'static str,
        expected: FieldKind,
        actual: FieldKind,
    },
    #[error("`{input}` is not a valid {kind:?} value")]
    Parse { input: String, kind: FieldKind },
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Number(_) => FieldKind::Number,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Parses raw input from a table cell into a value of `kind`.
    /// Blank input clears dates and numbers.
    pub fn parse(kind: FieldKind, input: &str) -> Result<Self, FieldError> {
        let trimmed = input.trim();
        let parse_error = || FieldError::Parse {
            input: input.to_string(),
            kind,
        };
        match kind {
            FieldKind::Text => Ok(FieldValue::Text(input.to_string())),
            FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(FieldValue::Boolean(true)),
                "false" | "no" | "0" | "" => Ok(FieldValue::Boolean(false)),
                _ => Err(parse_error()),
            },
            FieldKind::Date if trimmed.is_empty() => Ok(FieldValue::Date(None)),
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(|date| FieldValue::Date(Some(date)))
                .map_err(|_| parse_error()),
            FieldKind::Number if trimmed.is_empty() => Ok(FieldValue::Number(None)),
            FieldKind::Number => trimmed
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(|number| FieldValue::Number(Some(number)))
                .ok_or_else(parse_error),
        }
    }

    pub fn to_display(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Boolean(flag) => flag.to_string(),
            FieldValue::Date(Some(date)) => date.format(DATE_FORMAT).to_string(),
            FieldValue::Number(Some(number)) => number.to_string(),
            FieldValue::Date(None) | FieldValue::Number(None) => String::new(),
        }
    }

    fn mismatch(&self, field: &'static str, expected: FieldKind) -> FieldError {
        FieldError::KindMismatch {
            field,
            expected,
            actual: self.kind(),
        }
    }

    pub fn into_text(self, field: &'static str) -> Result<String, FieldError> {
        match self {
            FieldValue::Text(text) => Ok(text),
            other => Err(other.mismatch(field, FieldKind::Text)),
        }
    }

    pub fn into_bool(self, field: &'static str) -> Result<bool, FieldError> {
        match self {
            FieldValue::Boolean(flag) => Ok(flag),
            other => Err(other.mismatch(field, FieldKind::Boolean)),
        }
    }

    pub fn into_date(self, field: &'static str) -> Result<Option<NaiveDate>, FieldError> {
        match self {
            FieldValue::Date(date) => Ok(date),
            other => Err(other.mismatch(field, FieldKind::Date)),
        }
    }

    pub fn into_number(self, field: &'static str) -> Result<Option<f64>, FieldError> {
        match self {
            FieldValue::Number(number) => Ok(number),
            other => Err(other.mismatch(field, FieldKind::Number)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(Some(value))
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(Some(value))
    }
}

/// Column of an editable table.
pub trait RecordField: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    fn all() -> &'static [Self];
    /// Storage column name.
    fn key(self) -> &'static str;
    fn label(self) -> &'static str;
    fn kind(self) -> FieldKind;
    /// The boolean column behind `ArchiveStatus`.
    fn is_archive_flag(self) -> bool;

    fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|field| field.key() == key)
    }

    fn archive_flag() -> Option<Self> {
        Self::all().iter().copied().find(|field| field.is_archive_flag())
    }

    fn check(self, value: &FieldValue) -> Result<(), FieldError> {
        if value.kind() == self.kind() {
            Ok(())
        } else {
            Err(value.mismatch(self.key(), self.kind()))
        }
    }
}

/// A row with a stable identity whose fields can be read and written generically.
pub trait EditableRecord: Clone + fmt::Debug + Send + Sync + 'static {
    type Field: RecordField;

    fn row_id(&self) -> &RowId;
    fn get(&self, field: Self::Field) -> FieldValue;
    fn set(&mut self, field: Self::Field, value: FieldValue) -> Result<(), FieldError>;
    fn is_archived(&self) -> bool;
}

/// The displayed "Active/Archived" choice behind an `is_archived` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveStatus {
    #[default]
    Active,
    Archived,
}

impl ArchiveStatus {
    pub fn from_archived(is_archived: bool) -> Self {
        if is_archived {
            ArchiveStatus::Archived
        } else {
            ArchiveStatus::Active
        }
    }

    pub fn is_archived(self) -> bool {
        matches!(self, ArchiveStatus::Archived)
    }

    pub fn label(self) -> &'static str {
        match self {
            ArchiveStatus::Active => "Active",
            ArchiveStatus::Archived => "Archived",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "active" => Some(ArchiveStatus::Active),
            "archived" => Some(ArchiveStatus::Archived),
            _ => None,
        }
    }
}
