use chrono::NaiveDate;

use crate::domain::entities::record::{
    EditableRecord, FieldError, FieldKind, FieldValue, RecordField, RowId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SupplierField {
    Name,
    ContactName,
    Email,
    Phone,
    Website,
    Address,
    PaymentTerms,
    LeadTimeDays,
    LastOrderDate,
    Notes,
    IsArchived,
}

const SUPPLIER_FIELDS: [SupplierField; 11] = [
    SupplierField::Name,
    SupplierField::ContactName,
    SupplierField::Email,
    SupplierField::Phone,
    SupplierField::Website,
    SupplierField::Address,
    SupplierField::PaymentTerms,
    SupplierField::LeadTimeDays,
    SupplierField::LastOrderDate,
    SupplierField::Notes,
    SupplierField::IsArchived,
];

impl RecordField for SupplierField {
    fn all() -> &'static [Self] {
        &SUPPLIER_FIELDS
    }

    fn key(self) -> &'static str {
        match self {
            SupplierField::Name => "name",
            SupplierField::ContactName => "contact_name",
            SupplierField::Email => "email",
            SupplierField::Phone => "phone",
            SupplierField::Website => "website",
            SupplierField::Address => "address",
            SupplierField::PaymentTerms => "payment_terms",
            SupplierField::LeadTimeDays => "lead_time_days",
            SupplierField::LastOrderDate => "last_order_date",
            SupplierField::Notes => "notes",
            SupplierField::IsArchived => "is_archived",
        }
    }

    fn label(self) -> &'static str {
        match self {
            SupplierField::Name => "Name",
            SupplierField::ContactName => "Contact",
            SupplierField::Email => "Email",
            SupplierField::Phone => "Phone",
            SupplierField::Website => "Website",
            SupplierField::Address => "Address",
            SupplierField::PaymentTerms => "Payment terms",
            SupplierField::LeadTimeDays => "Lead time (days)",
            SupplierField::LastOrderDate => "Last order",
            SupplierField::Notes => "Notes",
            SupplierField::IsArchived => "Status",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            SupplierField::LeadTimeDays => FieldKind::Number,
            SupplierField::LastOrderDate => FieldKind::Date,
            SupplierField::IsArchived => FieldKind::Boolean,
            _ => FieldKind::Text,
        }
    }

    fn is_archive_flag(self) -> bool {
        self == SupplierField::IsArchived
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Supplier {
    pub id: RowId,
    pub name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    pub payment_terms: String,
    pub lead_time_days: Option<f64>,
    pub last_order_date: Option<NaiveDate>,
    pub notes: String,
    pub is_archived: bool,
}

impl Supplier {
    pub fn new(id: impl Into<RowId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

impl EditableRecord for Supplier {
    type Field = SupplierField;

    fn row_id(&self) -> &RowId {
        &self.id
    }

    fn get(&self, field: SupplierField) -> FieldValue {
        match field {
            SupplierField::Name => FieldValue::text(&self.name),
            SupplierField::ContactName => FieldValue::text(&self.contact_name),
            SupplierField::Email => FieldValue::text(&self.email),
            SupplierField::Phone => FieldValue::text(&self.phone),
            SupplierField::Website => FieldValue::text(&self.website),
            SupplierField::Address => FieldValue::text(&self.address),
            SupplierField::PaymentTerms => FieldValue::text(&self.payment_terms),
            SupplierField::LeadTimeDays => FieldValue::Number(self.lead_time_days),
            SupplierField::LastOrderDate => FieldValue::Date(self.last_order_date),
            SupplierField::Notes => FieldValue::text(&self.notes),
            SupplierField::IsArchived => FieldValue::Boolean(self.is_archived),
        }
    }

    fn set(&mut self, field: SupplierField, value: FieldValue) -> Result<(), FieldError> {
        let key = field.key();
        match field {
            SupplierField::Name => self.name = value.into_text(key)?,
            SupplierField::ContactName => self.contact_name = value.into_text(key)?,
            SupplierField::Email => self.email = value.into_text(key)?,
            SupplierField::Phone => self.phone = value.into_text(key)?,
            SupplierField::Website => self.website = value.into_text(key)?,
            SupplierField::Address => self.address = value.into_text(key)?,
            SupplierField::PaymentTerms => self.payment_terms = value.into_text(key)?,
            SupplierField::LeadTimeDays => self.lead_time_days = value.into_number(key)?,
            SupplierField::LastOrderDate => self.last_order_date = value.into_date(key)?,
            SupplierField::Notes => self.notes = value.into_text(key)?,
            SupplierField::IsArchived => self.is_archived = value.into_bool(key)?,
        }
        Ok(())
    }

    fn is_archived(&self) -> bool {
        self.is_archived
    }
}
