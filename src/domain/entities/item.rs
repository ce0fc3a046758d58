use crate::domain::entities::record::{
    EditableRecord, FieldError, FieldKind, FieldValue, RecordField, RowId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemField {
    Sku,
    Name,
    Unit,
    UnitCost,
    ReorderLevel,
    IsArchived,
}

const ITEM_FIELDS: [ItemField; 6] = [
    ItemField::Sku,
    ItemField::Name,
    ItemField::Unit,
    ItemField::UnitCost,
    ItemField::ReorderLevel,
    ItemField::IsArchived,
];

impl RecordField for ItemField {
    fn all() -> &'static [Self] {
        &ITEM_FIELDS
    }

    fn key(self) -> &'static str {
        match self {
            ItemField::Sku => "sku",
            ItemField::Name => "name",
            ItemField::Unit => "unit",
            ItemField::UnitCost => "unit_cost",
            ItemField::ReorderLevel => "reorder_level",
            ItemField::IsArchived => "is_archived",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ItemField::Sku => "SKU",
            ItemField::Name => "Name",
            ItemField::Unit => "Unit",
            ItemField::UnitCost => "Unit cost",
            ItemField::ReorderLevel => "Reorder level",
            ItemField::IsArchived => "Status",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            ItemField::UnitCost | ItemField::ReorderLevel => FieldKind::Number,
            ItemField::IsArchived => FieldKind::Boolean,
            _ => FieldKind::Text,
        }
    }

    fn is_archive_flag(self) -> bool {
        self == ItemField::IsArchived
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    pub id: RowId,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub unit_cost: Option<f64>,
    pub reorder_level: Option<f64>,
    pub is_archived: bool,
}

impl Item {
    pub fn new(id: impl Into<RowId>, sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

impl EditableRecord for Item {
    type Field = ItemField;

    fn row_id(&self) -> &RowId {
        &self.id
    }

    fn get(&self, field: ItemField) -> FieldValue {
        match field {
            ItemField::Sku => FieldValue::text(&self.sku),
            ItemField::Name => FieldValue::text(&self.name),
            ItemField::Unit => FieldValue::text(&self.unit),
            ItemField::UnitCost => FieldValue::Number(self.unit_cost),
            ItemField::ReorderLevel => FieldValue::Number(self.reorder_level),
            ItemField::IsArchived => FieldValue::Boolean(self.is_archived),
        }
    }

    fn set(&mut self, field: ItemField, value: FieldValue) -> Result<(), FieldError> {
        let key = field.key();
        match field {
            ItemField::Sku => self.sku = value.into_text(key)?,
            ItemField::Name => self.name = value.into_text(key)?,
            ItemField::Unit => self.unit = value.into_text(key)?,
            ItemField::UnitCost => self.unit_cost = value.into_number(key)?,
            ItemField::ReorderLevel => self.reorder_level = value.into_number(key)?,
            ItemField::IsArchived => self.is_archived = value.into_bool(key)?,
        }
        Ok(())
    }

    fn is_archived(&self) -> bool {
        self.is_archived
    }
}
