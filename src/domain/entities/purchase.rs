use crate::domain::entities::record::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurchaseStatus {
    #[default]
    Draft,
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseStatus {
    pub const ACTIVE: [PurchaseStatus; 2] = [PurchaseStatus::Draft, PurchaseStatus::Ordered];

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Draft => "draft",
            PurchaseStatus::Ordered => "ordered",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PurchaseStatus::Draft),
            "ordered" => Some(PurchaseStatus::Ordered),
            "received" => Some(PurchaseStatus::Received),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }

    /// Still open; the supplier and item it references must stay.
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

/// A purchase order line. Only read by the delete checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub id: RowId,
    pub supplier_id: RowId,
    pub item_id: RowId,
    pub quantity: f64,
    pub status: PurchaseStatus,
}
