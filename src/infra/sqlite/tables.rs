use anyhow::{anyhow, Result};
use rusqlite::types::Value;

use crate::domain::entities::item::{Item, ItemField};
use crate::domain::entities::record::{EditableRecord, RecordField, RowId};
use crate::domain::entities::supplier::{Supplier, SupplierField};
use crate::usecase::ports::repo::PersistedValue;

/// Maps a record type onto its table. Columns are named after the field keys
/// and read in `RecordField::all()` order after the id.
pub trait SqlTable: EditableRecord {
    const TABLE: &'static str;
    /// Column in `purchase` that points at this table.
    const PURCHASE_REF: &'static str;
    /// Fields matched by the search box.
    const SEARCH_FIELDS: &'static [Self::Field];
    /// Field used for the default ordering.
    const ORDER_FIELD: Self::Field;

    fn with_id(id: RowId) -> Self;
}

impl SqlTable for Supplier {
    const TABLE: &'static str = "supplier";
    const PURCHASE_REF: &'static str = "supplier_id";
    const SEARCH_FIELDS: &'static [SupplierField] = &[
        SupplierField::Name,
        SupplierField::ContactName,
        SupplierField::Email,
        SupplierField::Notes,
    ];
    const ORDER_FIELD: SupplierField = SupplierField::Name;

    fn with_id(id: RowId) -> Self {
        Supplier {
            id,
            ..Supplier::default()
        }
    }
}

impl SqlTable for Item {
    const TABLE: &'static str = "item";
    const PURCHASE_REF: &'static str = "item_id";
    const SEARCH_FIELDS: &'static [ItemField] = &[ItemField::Sku, ItemField::Name];
    const ORDER_FIELD: ItemField = ItemField::Sku;

    fn with_id(id: RowId) -> Self {
        Item {
            id,
            ..Item::default()
        }
    }
}

pub fn select_columns<R: SqlTable>() -> String {
    std::iter::once("id")
        .chain(R::Field::all().iter().map(|field| field.key()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn to_sql_value(value: &PersistedValue) -> Value {
    match value {
        PersistedValue::Null => Value::Null,
        PersistedValue::Text(text) => Value::Text(text.clone()),
        PersistedValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        PersistedValue::Number(number) => Value::Real(*number),
    }
}

pub fn from_sql_value(value: Value) -> Result<PersistedValue> {
    match value {
        Value::Null => Ok(PersistedValue::Null),
        Value::Integer(int) => Ok(PersistedValue::Number(int as f64)),
        Value::Real(real) => Ok(PersistedValue::Number(real)),
        Value::Text(text) => Ok(PersistedValue::Text(text)),
        Value::Blob(_) => Err(anyhow!("unexpected blob column")),
    }
}

/// Builds a record from a row selected with `select_columns`.
pub fn record_from_row<R: SqlTable>(row: &rusqlite::Row<'_>) -> Result<R> {
    let id: String = row.get(0)?;
    let mut record = R::with_id(RowId::new(id));
    for (idx, field) in R::Field::all().iter().enumerate() {
        let raw: Value = row.get(idx + 1)?;
        let persisted = from_sql_value(raw)?;
        let value = persisted.to_field_value(field.kind()).ok_or_else(|| {
            anyhow!(
                "column {}.{} holds {persisted:?}, not a {:?}",
                R::TABLE,
                field.key(),
                field.kind()
            )
        })?;
        record.set(*field, value)?;
    }
    Ok(record)
}

pub fn insert_values<R: SqlTable>(record: &R) -> Vec<Value> {
    std::iter::once(Value::Text(record.row_id().to_string()))
        .chain(
            R::Field::all()
                .iter()
                .map(|field| to_sql_value(&PersistedValue::from_field_value(&record.get(*field)))),
        )
        .collect()
}
