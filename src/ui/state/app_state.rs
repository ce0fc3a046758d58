use std::collections::{BTreeMap, BTreeSet};

use dioxus::prelude::*;

use crate::domain::edit::navigator::SpreadsheetNavigator;
use crate::domain::entities::edit::EditMode;
use crate::domain::entities::record::{RecordField, RowId};
use crate::domain::entities::supplier::{Supplier, SupplierField};
use crate::usecase::services::edit_service::EditService;
use crate::usecase::services::record_service::SelectionSet;

/// Supplier columns shown as editable cells, in display order.
pub fn grid_fields() -> Vec<SupplierField> {
    SupplierField::all()
        .iter()
        .copied()
        .filter(|field| *field != SupplierField::IsArchived)
        .collect()
}

/// Signals shared by the table components. Must be created during render.
#[derive(Clone, Copy)]
pub struct AppState {
    pub rows: Signal<Vec<Supplier>>,
    pub mode: Signal<EditMode>,
    pub pending_rows: Signal<BTreeSet<RowId>>,
    pub selection: Signal<SelectionSet>,
    pub blocked: Signal<BTreeMap<RowId, String>>,
    pub navigator: Signal<SpreadsheetNavigator>,
    pub search: Signal<String>,
    pub show_archived: Signal<bool>,
    pub busy: Signal<bool>,
    pub status: Signal<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rows: use_signal(Vec::<Supplier>::new),
            mode: use_signal(EditMode::default),
            pending_rows: use_signal(BTreeSet::<RowId>::new),
            selection: use_signal(SelectionSet::new),
            blocked: use_signal(BTreeMap::<RowId, String>::new),
            navigator: use_signal(|| SpreadsheetNavigator::new(0, grid_fields().len())),
            search: use_signal(String::new),
            show_archived: use_signal(|| false),
            busy: use_signal(|| false),
            status: use_signal(|| "Ready".to_string()),
        }
    }

    /// Copies the engine state into the signals the view reads.
    pub fn sync(&mut self, service: &EditService<Supplier>) {
        let rows = service.rows();
        let pending: BTreeSet<RowId> = rows
            .iter()
            .filter(|row| service.has_row_changes(&row.id))
            .map(|row| row.id.clone())
            .collect();
        let mode = service.edit_mode();

        self.selection.write().retain_loaded(&rows);
        self.blocked
            .write()
            .retain(|id, _| rows.iter().any(|row| &row.id == id));
        {
            let before: Vec<RowId> = self.rows.peek().iter().map(|row| row.id.clone()).collect();
            let after: Vec<RowId> = rows.iter().map(|row| row.id.clone()).collect();
            let mut navigator = self.navigator.write();
            navigator.follow_rows(&before, &after, grid_fields().len());
            if mode.is_viewing() {
                navigator.clear();
            }
        }
        self.pending_rows.set(pending);
        self.rows.set(rows);
        self.mode.set(mode);
    }
}
