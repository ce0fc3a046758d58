use std::collections::BTreeMap;

use crate::domain::entities::item::{Item, ItemField};
use crate::domain::entities::record::{EditableRecord, FieldValue, RecordField, RowId};
use crate::domain::entities::supplier::{Supplier, SupplierField};
use crate::usecase::ports::validator::{RecordValidator, ValidationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SupplierValidator;

impl RecordValidator<Supplier> for SupplierValidator {
    fn validate(
        &self,
        record: &Supplier,
        changes: &mut BTreeMap<SupplierField, FieldValue>,
        others: &[Supplier],
    ) -> Result<(), ValidationError> {
        let row_id = record.row_id();
        for (field, value) in changes.iter_mut() {
            match (field, value) {
                (SupplierField::Email, FieldValue::Text(text)) => {
                    *text = text.trim().to_lowercase();
                    if !text.is_empty() && !looks_like_email(text) {
                        return Err(invalid(row_id, *field, "is not an email address"));
                    }
                }
                (SupplierField::Phone, FieldValue::Text(text)) => *text = normalize_phone(text),
                (SupplierField::Website, FieldValue::Text(text)) => {
                    *text = normalize_website(text)
                }
                (_, FieldValue::Text(text)) => *text = text.trim().to_string(),
                (SupplierField::LeadTimeDays, FieldValue::Number(Some(days))) if *days < 0.0 => {
                    return Err(invalid(row_id, *field, "cannot be negative"));
                }
                _ => {}
            }
        }

        if let Some(FieldValue::Text(name)) = changes.get(&SupplierField::Name) {
            require(row_id, SupplierField::Name, name)?;
            ensure_unique(
                record,
                SupplierField::Name,
                name,
                others.iter().map(|other| (other.row_id(), other.name.as_str())),
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ItemValidator;

impl RecordValidator<Item> for ItemValidator {
    fn validate(
        &self,
        record: &Item,
        changes: &mut BTreeMap<ItemField, FieldValue>,
        others: &[Item],
    ) -> Result<(), ValidationError> {
        let row_id = record.row_id();
        for (field, value) in changes.iter_mut() {
            match (field, value) {
                (ItemField::Sku, FieldValue::Text(text)) => *text = text.trim().to_uppercase(),
                (_, FieldValue::Text(text)) => *text = text.trim().to_string(),
                (ItemField::UnitCost | ItemField::ReorderLevel, FieldValue::Number(Some(n)))
                    if *n < 0.0 =>
                {
                    return Err(invalid(row_id, *field, "cannot be negative"));
                }
                _ => {}
            }
        }

        if let Some(FieldValue::Text(sku)) = changes.get(&ItemField::Sku) {
            require(row_id, ItemField::Sku, sku)?;
            ensure_unique(
                record,
                ItemField::Sku,
                sku,
                others.iter().map(|other| (other.row_id(), other.sku.as_str())),
            )?;
        }
        if let Some(FieldValue::Text(name)) = changes.get(&ItemField::Name) {
            require(row_id, ItemField::Name, name)?;
        }
        Ok(())
    }
}

fn invalid(row_id: &RowId, field: impl RecordField, message: &str) -> ValidationError {
    ValidationError::Invalid {
        row_id: row_id.clone(),
        field: field.label(),
        message: message.to_string(),
    }
}

fn require(row_id: &RowId, field: impl RecordField, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            row_id: row_id.clone(),
            field: field.label(),
        });
    }
    Ok(())
}

fn ensure_unique<'a, R: EditableRecord>(
    record: &R,
    field: R::Field,
    value: &str,
    others: impl Iterator<Item = (&'a RowId, &'a str)>,
) -> Result<(), ValidationError> {
    let taken = others
        .filter(|(id, _)| *id != record.row_id())
        .any(|(_, existing)| existing.trim().eq_ignore_ascii_case(value));
    if taken {
        return Err(ValidationError::Duplicate {
            row_id: record.row_id().clone(),
            field: field.label(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Keeps digits and the usual separators, collapsing runs of whitespace.
pub fn normalize_phone(value: &str) -> String {
    let kept: String = value
        .chars()
        .map(|ch| if ch == '.' { '-' } else { ch })
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, '+' | '(' | ')' | '-' | ' '))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_website(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
