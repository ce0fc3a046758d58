use std::rc::Rc;
use std::sync::Arc;

use dioxus::prelude::*;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

use crate::config::settings::AppSettings;
use crate::domain::edit::editable_value::EditableValue;
use crate::domain::edit::mode::ModeError;
use crate::domain::edit::navigator::{NavAction, NavKey};
use crate::domain::entities::edit::{Confirmation, CursorPosition, EditMode, SaveStatus};
use crate::domain::entities::record::{
    ArchiveStatus, EditableRecord, FieldKind, FieldValue, RecordField, RowId,
};
use crate::domain::entities::supplier::{Supplier, SupplierField};
use crate::infra::sqlite::repo::SqliteRepo;
use crate::infra::validation::SupplierValidator;
use crate::ui::state::app_state::{grid_fields, AppState};
use crate::usecase::ports::repo::{RecordFilter, RecordRepository};
use crate::usecase::services::edit_service::EditService;
use crate::usecase::services::export_service::ExportService;
use crate::usecase::services::record_service::{RecordService, SelectionSet};
use crate::usecase::services::save_coordinator::SaveOutcome;

#[derive(Clone)]
struct Services {
    repo: Arc<SqliteRepo>,
    edit: EditService<Supplier>,
    records: RecordService<Supplier>,
    export: Arc<ExportService<Supplier>>,
    confirm_discard: bool,
}

impl Services {
    fn build(settings: &AppSettings) -> anyhow::Result<Self> {
        let repo = Arc::new(SqliteRepo::new(settings.resolved_db_path()?));
        let edit = EditService::new(repo.clone(), Arc::new(SupplierValidator), &settings.edit);
        let records = RecordService::new(repo.clone(), edit.session().clone());
        Ok(Self {
            repo,
            edit,
            records,
            export: Arc::new(ExportService::new()),
            confirm_discard: settings.edit.confirm_discard,
        })
    }

    fn filter(state: &AppState) -> RecordFilter {
        RecordFilter {
            include_archived: (state.show_archived)(),
            search: (state.search)(),
        }
    }
}

fn ask(title: &str, description: &str) -> bool {
    MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::YesNo)
        .show()
        == MessageDialogResult::Yes
}

fn alert(title: &str, description: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Runs a mode change, asking before it throws away unsaved rows.
fn with_discard_prompt(
    services: &Services,
    change: impl Fn(Confirmation) -> Result<(), ModeError>,
) -> Result<(), ModeError> {
    match change(Confirmation::Unconfirmed) {
        Err(ModeError::UnsavedChanges { pending_rows }) => {
            let confirmed = !services.confirm_discard
                || ask(
                    "Discard changes",
                    &format!("{pending_rows} row(s) have unsaved changes. Discard them?"),
                );
            if confirmed {
                change(Confirmation::Confirmed)
            } else {
                Ok(())
            }
        }
        other => other,
    }
}

fn exit_edit(services: &Services, mut state: AppState) {
    if let Err(err) = with_discard_prompt(services, |c| services.edit.exit_edit(c)) {
        state.status.set(err.to_string());
    }
    state.sync(&services.edit);
}

fn reload(services: Services, mut state: AppState) {
    spawn(async move {
        state.busy.set(true);
        match services.records.fetch(Services::filter(&state)).await {
            Ok(rows) => state.status.set(format!("{} supplier(s)", rows.len())),
            Err(err) => state.status.set(format!("Failed to load suppliers: {err}")),
        }
        state.sync(&services.edit);
        state.busy.set(false);
    });
}

fn nav_key(event: &KeyboardEvent) -> Option<NavKey> {
    match event.key() {
        Key::ArrowUp => Some(NavKey::ArrowUp),
        Key::ArrowDown => Some(NavKey::ArrowDown),
        Key::Tab if event.modifiers().contains(Modifiers::SHIFT) => Some(NavKey::ShiftTab),
        Key::Tab => Some(NavKey::Tab),
        Key::Enter => Some(NavKey::Enter),
        Key::Escape => Some(NavKey::Escape),
        _ => None,
    }
}

fn status_marker(status: SaveStatus) -> &'static str {
    match status {
        SaveStatus::Idle => "",
        SaveStatus::Saving => "…",
        SaveStatus::Saved => "✓",
        SaveStatus::Error => "!",
    }
}

#[component]
pub fn App() -> Element {
    let services = use_hook(|| {
        let settings = AppSettings::load().unwrap_or_else(|err| {
            tracing::warn!("using default settings: {err:#}");
            AppSettings::default()
        });
        Services::build(&settings).map_err(|err| format!("{err:#}"))
    });
    let services = match services {
        Ok(services) => services,
        Err(err) => {
            return rsx! {
                div {
                    p { "Unable to open the database: {err}" }
                }
            };
        }
    };
    use_context_provider(|| services.clone());
    let state = AppState::new();
    use_context_provider(|| state);

    {
        let services = services.clone();
        use_drop(move || services.edit.shutdown());
    }

    let services_for_init = services.clone();
    use_effect(move || {
        let services = services_for_init.clone();
        let mut state = state;
        if let Err(err) = RecordRepository::<Supplier>::init(services.repo.as_ref()) {
            state.status.set(format!("Failed to initialise database: {err}"));
            return;
        }
        reload(services, state);
    });

    rsx! {
        div {
            style: "font-family: sans-serif; padding: 12px;",
            Toolbar {}
            SupplierTable {}
            p { style: "color: #555; margin-top: 8px;", "{state.status}" }
        }
    }
}

#[component]
fn Toolbar() -> Element {
    let services = use_context::<Services>();
    let mut state = use_context::<AppState>();
    let mode = (state.mode)();
    let pending = state.pending_rows.read().len();
    let selected = state.selection.read().len();
    let busy = (state.busy)();

    let services_for_edit_all = services.clone();
    let services_for_save = services.clone();
    let services_for_exit = services.clone();
    let services_for_archive = services.clone();
    let services_for_unarchive = services.clone();
    let services_for_delete = services.clone();
    let services_for_export = services.clone();
    let services_for_search = services.clone();
    let services_for_archived = services.clone();

    rsx! {
        div {
            style: "display: flex; gap: 8px; align-items: center; margin-bottom: 8px;",
            if mode.is_viewing() {
                button {
                    disabled: busy,
                    onclick: move |_| {
                        if let Err(err) = services_for_edit_all.edit.enter_all_edit() {
                            state.status.set(err.to_string());
                        }
                        state.sync(&services_for_edit_all.edit);
                    },
                    "Edit all"
                }
            } else {
                if mode.is_bulk_edit() {
                    button {
                        disabled: busy || pending == 0,
                        onclick: move |_| {
                            let services = services_for_save.clone();
                            spawn(async move {
                                state.busy.set(true);
                                match services.edit.save_all().await {
                                    Ok(SaveOutcome::Saved { updated_count }) => {
                                        state.status.set(format!("Saved {updated_count} row(s)"));
                                    }
                                    Ok(SaveOutcome::NothingPending) => state.status.set("Nothing to save".to_string()),
                                    Ok(SaveOutcome::Skipped) => state.status.set("Save already running".to_string()),
                                    Err(err) => {
                                        state.status.set(format!("Save failed: {err}"));
                                        alert("Save failed", &format!("{err}\n\nYour changes are still pending."));
                                    }
                                }
                                state.sync(&services.edit);
                                state.busy.set(false);
                            });
                        },
                        "Save all ({pending})"
                    }
                }
                button {
                    disabled: busy,
                    onclick: move |_| exit_edit(&services_for_exit, state),
                    "Exit"
                }
                span { style: "color: #777;", "{mode.label()}" }
            }
            span { style: "flex: 1;" }
            input {
                placeholder: "Search",
                value: "{state.search}",
                oninput: move |event| {
                    state.search.set(event.value());
                    reload(services_for_search.clone(), state);
                }
            }
            label {
                input {
                    r#type: "checkbox",
                    checked: (state.show_archived)(),
                    onchange: move |event| {
                        state.show_archived.set(event.checked());
                        reload(services_for_archived.clone(), state);
                    }
                }
                " Show archived"
            }
            button {
                disabled: busy || selected == 0,
                onclick: move |_| {
                    let services = services_for_archive.clone();
                    let selection = state.selection.read().clone();
                    spawn(async move {
                        match services.records.archive(&selection).await {
                            Ok(count) => state.status.set(format!("Archived {count} supplier(s)")),
                            Err(err) => state.status.set(format!("Archive failed: {err}")),
                        }
                        reload(services, state);
                    });
                },
                "Archive"
            }
            button {
                disabled: busy || selected == 0,
                onclick: move |_| {
                    let services = services_for_unarchive.clone();
                    let selection = state.selection.read().clone();
                    spawn(async move {
                        match services.records.unarchive(&selection).await {
                            Ok(count) => state.status.set(format!("Restored {count} supplier(s)")),
                            Err(err) => state.status.set(format!("Restore failed: {err}")),
                        }
                        reload(services, state);
                    });
                },
                "Unarchive"
            }
            button {
                disabled: busy || selected == 0,
                onclick: move |_| {
                    if !ask("Delete suppliers", &format!("Delete {selected} supplier(s)?")) {
                        return;
                    }
                    let services = services_for_delete.clone();
                    spawn(async move {
                        let mut selection = state.selection.read().clone();
                        match services.records.delete(&mut selection).await {
                            Ok(result) => {
                                state.blocked.set(
                                    result
                                        .blocked
                                        .iter()
                                        .map(|blocked| (blocked.id.clone(), blocked.reason.clone()))
                                        .collect(),
                                );
                                state.status.set(format!(
                                    "Deleted {}, blocked {}",
                                    result.deleted_count(),
                                    result.blocked_count()
                                ));
                                state.selection.set(selection.clone());
                                if result.suggest_archive
                                    && ask(
                                        "Some suppliers were not deleted",
                                        "Suppliers with purchases cannot be deleted. Archive them instead?",
                                    )
                                {
                                    let blocked: SelectionSet =
                                        result.blocked.iter().map(|blocked| blocked.id.clone()).collect();
                                    if let Err(err) = services.records.archive(&blocked).await {
                                        state.status.set(format!("Archive failed: {err}"));
                                    }
                                }
                            }
                            Err(err) => state.status.set(format!("Delete failed: {err}")),
                        }
                        reload(services, state);
                    });
                },
                "Delete"
            }
            button {
                onclick: move |_| {
                    let Some(path) = FileDialog::new()
                        .add_filter("CSV", &["csv"])
                        .set_file_name("suppliers.csv")
                        .save_file()
                    else {
                        return;
                    };
                    let rows = services_for_export.edit.rows();
                    match services_for_export.export.export_csv(&path, &rows) {
                        Ok(count) => state.status.set(format!("Exported {count} row(s)")),
                        Err(err) => state.status.set(format!("Export failed: {err:#}")),
                    }
                },
                "Export CSV"
            }
        }
    }
}

#[component]
fn SupplierTable() -> Element {
    let state = use_context::<AppState>();
    let fields = grid_fields();
    let rows = state.rows.read().clone();
    let mode = (state.mode)();

    rsx! {
        table {
            style: "border-collapse: collapse; width: 100%;",
            thead {
                tr {
                    th { "" }
                    th { "" }
                    for field in fields.iter() {
                        th {
                            style: "border: 1px solid #bbb; padding: 4px; background: #f3f3f3;",
                            "{field.label()}"
                        }
                    }
                    th { style: "border: 1px solid #bbb; padding: 4px;", "{SupplierField::IsArchived.label()}" }
                }
            }
            tbody {
                for (row_idx, supplier) in rows.into_iter().enumerate() {
                    SupplierRow {
                        key: "{supplier.id}",
                        row_idx,
                        supplier: supplier.clone(),
                        editable: mode.can_edit_row(&supplier.id),
                    }
                }
            }
        }
    }
}

#[component]
fn SupplierRow(row_idx: usize, supplier: Supplier, editable: bool) -> Element {
    let services = use_context::<Services>();
    let mut state = use_context::<AppState>();
    let row_id = supplier.id.clone();
    let mode = (state.mode)();
    let pending = state.pending_rows.read().contains(&row_id);
    let selected = state.selection.read().contains(&row_id);
    let blocked = state.blocked.read().get(&row_id).cloned();
    let quick_editing = mode.editing_row_id() == Some(&row_id);
    let background = if pending { "#fff8dc" } else { "#fff" };

    let row_id_for_select = row_id.clone();
    let row_id_for_toggle = row_id.clone();
    let row_id_for_undo = row_id.clone();
    let services_for_toggle = services.clone();
    let services_for_undo = services.clone();

    rsx! {
        tr {
            style: "background: {background};",
            td {
                input {
                    r#type: "checkbox",
                    checked: selected,
                    onchange: move |_| {
                        state.selection.write().toggle(&row_id_for_select);
                    }
                }
            }
            td {
                style: "white-space: nowrap;",
                if !mode.is_bulk_edit() {
                    button {
                        onclick: move |_| {
                            let services = &services_for_toggle;
                            let result = with_discard_prompt(services, |c| {
                                services.edit.toggle_single_edit(&row_id_for_toggle, c)
                            });
                            if let Err(err) = result {
                                state.status.set(err.to_string());
                            }
                            state.sync(&services.edit);
                        },
                        if quick_editing { "Done" } else { "Edit" }
                    }
                }
                if pending {
                    button {
                        onclick: move |_| {
                            services_for_undo.edit.undo_row(&row_id_for_undo);
                            state.sync(&services_for_undo.edit);
                        },
                        "Undo"
                    }
                }
                if let Some(reason) = blocked {
                    span { style: "color: #b00; margin-left: 4px;", "{reason}" }
                }
            }
            for (col_idx, field) in grid_fields().into_iter().enumerate() {
                if editable {
                    CellEditor {
                        key: "{row_id}-{field.key()}",
                        row_id: row_id.clone(),
                        field,
                        position: CursorPosition::new(row_idx, col_idx),
                        value: supplier.get(field),
                    }
                } else {
                    td {
                        style: "border: 1px solid #ddd; padding: 4px;",
                        "{supplier.get(field).to_display()}"
                    }
                }
            }
            td {
                style: "border: 1px solid #ddd; padding: 4px;",
                "{ArchiveStatus::from_archived(supplier.is_archived).label()}"
            }
        }
    }
}

#[component]
fn CellEditor(
    row_id: RowId,
    field: SupplierField,
    position: CursorPosition,
    value: FieldValue,
) -> Element {
    let services = use_context::<Services>();
    let mut state = use_context::<AppState>();
    let mut text = use_signal(|| value.to_display());
    let mut save_status = use_signal(|| SaveStatus::Idle);
    let mut mounted = use_signal(|| None::<Rc<MountedData>>);
    let cell: Option<EditableValue> = use_hook({
        let services = services.clone();
        let row_id = row_id.clone();
        move || services.edit.field_value(&row_id, field)
    });

    {
        let cell = cell.clone();
        use_drop(move || {
            if let Some(cell) = cell {
                cell.set_mode(EditMode::Viewing);
            }
        });
    }

    use_hook({
        let cell = cell.clone();
        let services = services.clone();
        move || {
            let Some(cell) = cell else {
                return;
            };
            let mut changes = cell.subscribe();
            spawn(async move {
                while changes.changed().await.is_ok() {
                    let snapshot = changes.borrow_and_update().clone();
                    let shown = FieldValue::parse(field.kind(), &text.peek()).ok();
                    if shown.as_ref() != Some(&snapshot.value) {
                        text.set(snapshot.value.to_display());
                    }
                    let settled = matches!(snapshot.status, SaveStatus::Saved | SaveStatus::Error);
                    if *save_status.peek() != snapshot.status {
                        save_status.set(snapshot.status);
                        if settled {
                            state.sync(&services.edit);
                        }
                    }
                }
            });
        }
    });

    {
        let cell = cell.clone();
        use_effect(use_reactive((&value,), move |(value,)| match &cell {
            Some(cell) => cell.sync_server_value(value),
            None => text.set(value.to_display()),
        }));
    }

    use_effect(move || {
        let is_cursor = state.navigator.read().cursor() == Some(position);
        if let (true, Some(element)) = (is_cursor, mounted()) {
            spawn(async move {
                let _ = element.set_focus(true).await;
            });
        }
    });

    let input_type = match field.kind() {
        FieldKind::Date => "date",
        FieldKind::Number => "number",
        _ => "text",
    };

    let services_for_input = services.clone();
    let services_for_blur = services.clone();
    let services_for_keys = services.clone();
    let cell_for_input = cell.clone();
    let cell_for_focus = cell.clone();
    let cell_for_blur = cell.clone();
    let cell_for_keys = cell.clone();
    let row_id_for_input = row_id.clone();

    rsx! {
        td {
            style: "border: 1px solid #ddd; padding: 2px; white-space: nowrap;",
            input {
                r#type: input_type,
                value: "{text}",
                style: "width: 100%; box-sizing: border-box;",
                onmounted: move |event| mounted.set(Some(event.data())),
                oninput: move |event| {
                    let raw = event.value();
                    text.set(raw.clone());
                    let parsed = match FieldValue::parse(field.kind(), &raw) {
                        Ok(parsed) => parsed,
                        Err(err) => {
                            state.status.set(err.to_string());
                            return;
                        }
                    };
                    match &cell_for_input {
                        Some(cell) if (state.mode)().is_quick_edit() => cell.update_value(parsed),
                        _ => {
                            if let Err(err) =
                                services_for_input.edit.update_field(&row_id_for_input, field, parsed)
                            {
                                state.status.set(err.to_string());
                            }
                            state.sync(&services_for_input.edit);
                        }
                    }
                },
                onfocus: move |_| {
                    state.navigator.write().handle_cell_click(position.row, position.col);
                    if let Some(cell) = cell_for_focus.clone() {
                        spawn(async move {
                            cell.set_focused(true).await;
                        });
                    }
                },
                onblur: move |_| {
                    let Some(cell) = cell_for_blur.clone() else {
                        return;
                    };
                    let services = services_for_blur.clone();
                    spawn(async move {
                        if cell.set_focused(false).await.is_some() {
                            state.sync(&services.edit);
                        }
                    });
                },
                onkeydown: move |event| {
                    let Some(key) = nav_key(&event) else {
                        return;
                    };
                    if matches!(key, NavKey::Tab | NavKey::ShiftTab) {
                        event.prevent_default();
                    }
                    let mode = (state.mode)();
                    let action = state.navigator.write().handle_key(key, &mode);
                    match action {
                        NavAction::Commit(_) => {
                            if let Some(cell) = cell_for_keys.clone() {
                                spawn(async move {
                                    cell.flush().await;
                                });
                            }
                        }
                        NavAction::Exit => {
                            if let Some(cell) = &cell_for_keys {
                                cell.revert_value();
                            }
                            exit_edit(&services_for_keys, state);
                        }
                        NavAction::Move(_) | NavAction::None => {}
                    }
                },
            }
            span { style: "color: #888; margin-left: 2px;", "{status_marker(save_status())}" }
        }
    }
}
