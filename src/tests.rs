use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use tempfile::TempDir;

use crate::config::settings::EditSettings;
use crate::domain::entities::edit::{Confirmation, EditMode};
use crate::domain::entities::item::{Item, ItemField};
use crate::domain::entities::purchase::{Purchase, PurchaseStatus};
use crate::domain::entities::record::{EditableRecord, FieldValue, RowId};
use crate::domain::entities::supplier::{Supplier, SupplierField};
use crate::infra::export::csv::write_records;
use crate::infra::sqlite::queries::{ACTIVE_PURCHASES_REASON, PURCHASE_HISTORY_REASON};
use crate::infra::sqlite::repo::SqliteRepo;
use crate::infra::validation::{ItemValidator, SupplierValidator};
use crate::usecase::ports::repo::{
    PersistedValue, RecordFilter, RecordRepository, RecordUpdate, RepoError,
};
use crate::usecase::ports::validator::ValidationError;
use crate::usecase::services::edit_service::EditService;
use crate::usecase::services::record_service::{RecordService, SelectionSet};
use crate::usecase::services::save_coordinator::{SaveError, SaveOutcome};

fn test_db() -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("data").join("inventory.sqlite");
    (temp_dir, db_path)
}

fn supplier(id: &str, name: &str) -> Supplier {
    Supplier {
        email: format!("{}@example.com", id),
        ..Supplier::new(id, name)
    }
}

fn seeded_repo(db_path: &Path) -> SqliteRepo {
    let repo = SqliteRepo::new(db_path);
    RecordRepository::<Supplier>::init(&repo).expect("init should succeed");
    for record in [
        supplier("s1", "Acme Metals"),
        supplier("s2", "Bolt Supply"),
        Supplier {
            is_archived: true,
            ..supplier("s3", "Crate Co")
        },
    ] {
        repo.insert(&record).expect("should insert supplier");
    }
    repo
}

fn fetch_suppliers(repo: &SqliteRepo, filter: &RecordFilter) -> Vec<Supplier> {
    repo.fetch_records(filter).expect("fetch should succeed")
}

fn names(records: &[Supplier]) -> Vec<&str> {
    records.iter().map(|record| record.name.as_str()).collect()
}

fn ids(values: &[&str]) -> Vec<RowId> {
    values.iter().map(|value| RowId::new(*value)).collect()
}

#[test]
fn init_db_creates_required_tables() {
    let (_temp_dir, db_path) = test_db();
    seeded_repo(&db_path);

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('supplier','item','purchase')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 3, "required tables should exist");
}

#[test]
fn fetch_hides_archived_rows_and_matches_search() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);

    let active = fetch_suppliers(&repo, &RecordFilter::default());
    assert_eq!(names(&active), vec!["Acme Metals", "Bolt Supply"]);

    let everything = fetch_suppliers(
        &repo,
        &RecordFilter {
            include_archived: true,
            ..RecordFilter::default()
        },
    );
    assert_eq!(everything.len(), 3);
    assert!(everything[2].is_archived);

    let searched = fetch_suppliers(
        &repo,
        &RecordFilter {
            include_archived: false,
            search: "  BOLT ".to_string(),
        },
    );
    assert_eq!(names(&searched), vec!["Bolt Supply"]);
}

#[test]
fn update_record_round_trips_dates_and_numbers() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);
    let order_date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");

    let stored: Supplier = repo
        .update_record(&RecordUpdate {
            id: RowId::new("s1"),
            changes: vec![
                (SupplierField::LeadTimeDays, PersistedValue::Number(12.5)),
                (
                    SupplierField::LastOrderDate,
                    PersistedValue::from_field_value(&FieldValue::Date(Some(order_date))),
                ),
                (SupplierField::Notes, PersistedValue::Text("net 30".to_string())),
            ],
        })
        .expect("update should succeed");

    assert_eq!(stored.lead_time_days, Some(12.5));
    assert_eq!(stored.last_order_date, Some(order_date));
    assert_eq!(stored.notes, "net 30");

    let cleared: Supplier = repo
        .update_record(&RecordUpdate {
            id: RowId::new("s1"),
            changes: vec![(SupplierField::LeadTimeDays, PersistedValue::Null)],
        })
        .expect("update should succeed");
    assert_eq!(cleared.lead_time_days, None);
    assert_eq!(cleared.last_order_date, Some(order_date));
}

#[test]
fn update_of_unknown_record_is_not_found() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);

    let result: Result<Supplier, RepoError> = repo.update_record(&RecordUpdate {
        id: RowId::new("missing"),
        changes: vec![(SupplierField::Name, PersistedValue::Text("Ghost".to_string()))],
    });

    assert_eq!(result.expect_err("should fail"), RepoError::NotFound(RowId::new("missing")));
}

#[test]
fn bulk_update_is_all_or_nothing() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);
    let rename = |id: &str, name: &str| RecordUpdate {
        id: RowId::new(id),
        changes: vec![(SupplierField::Name, PersistedValue::Text(name.to_string()))],
    };

    let err = RecordRepository::<Supplier>::bulk_update_records(
        &repo,
        &[rename("s1", "Acme Renamed"), rename("missing", "Ghost")],
    )
    .expect_err("unknown id should fail the batch");
    assert!(err.to_string().contains("missing"), "unexpected error: {err}");

    let after = fetch_suppliers(&repo, &RecordFilter::default());
    assert_eq!(names(&after), vec!["Acme Metals", "Bolt Supply"]);

    let result = RecordRepository::<Supplier>::bulk_update_records(
        &repo,
        &[rename("s1", "Acme Renamed"), rename("s2", "Bolt Renamed")],
    )
    .expect("bulk update should succeed");
    assert_eq!(result.updated_count, 2);
    assert_eq!(
        names(&fetch_suppliers(&repo, &RecordFilter::default())),
        vec!["Acme Renamed", "Bolt Renamed"]
    );
}

#[test]
fn archive_and_unarchive_count_changed_rows() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);

    let archived =
        RecordRepository::<Supplier>::bulk_archive_records(&repo, &ids(&["s1", "s3"]))
            .expect("archive should succeed");
    assert_eq!(archived, 1, "s3 was already archived");

    let restored =
        RecordRepository::<Supplier>::bulk_unarchive_records(&repo, &ids(&["s1", "s3", "s9"]))
            .expect("unarchive should succeed");
    assert_eq!(restored, 2);
    assert_eq!(fetch_suppliers(&repo, &RecordFilter::default()).len(), 3);
}

#[test]
fn delete_reports_rows_still_referenced_by_purchases() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);
    repo.insert(&supplier("s4", "Dyn Parts"))
        .expect("should insert supplier");
    repo.insert(&Item::new("i1", "bolt-10", "Bolt 10mm"))
        .expect("should insert item");
    for (id, supplier_id, status) in [
        ("p1", "s1", PurchaseStatus::Ordered),
        ("p2", "s2", PurchaseStatus::Received),
    ] {
        repo.insert_purchase(&Purchase {
            id: RowId::new(id),
            supplier_id: RowId::new(supplier_id),
            item_id: RowId::new("i1"),
            quantity: 4.0,
            status,
        })
        .expect("should insert purchase");
    }

    let result = RecordRepository::<Supplier>::bulk_delete_records(
        &repo,
        &ids(&["s1", "s2", "s4"]),
    )
    .expect("delete should succeed");

    assert_eq!(result.deleted_ids, ids(&["s4"]));
    assert_eq!(result.blocked_count(), 2);
    assert_eq!(result.blocked_reason(&RowId::new("s1")), Some(ACTIVE_PURCHASES_REASON));
    assert_eq!(result.blocked_reason(&RowId::new("s2")), Some(PURCHASE_HISTORY_REASON));
    assert!(result.suggest_archive);

    repo.set_purchase_status(&RowId::new("p1"), PurchaseStatus::Cancelled)
        .expect("should update purchase");
    let retry = RecordRepository::<Supplier>::bulk_delete_records(&repo, &ids(&["s1"]))
        .expect("delete should succeed");
    assert_eq!(retry.blocked_reason(&RowId::new("s1")), Some(PURCHASE_HISTORY_REASON));

    let items = RecordRepository::<Item>::bulk_delete_records(&repo, &ids(&["i1"]))
        .expect("delete should succeed");
    assert_eq!(items.deleted_count(), 0);
    assert_eq!(items.blocked_reason(&RowId::new("i1")), Some(PURCHASE_HISTORY_REASON));
}

#[test]
fn items_share_the_generic_repository() {
    let (_temp_dir, db_path) = test_db();
    let repo = seeded_repo(&db_path);
    repo.insert(&Item::new("i2", "NUT-5", "Nut 5mm"))
        .expect("should insert item");
    repo.insert(&Item::new("i1", "BOLT-10", "Bolt 10mm"))
        .expect("should insert item");

    let stored: Item = repo
        .update_record(&RecordUpdate {
            id: RowId::new("i2"),
            changes: vec![(ItemField::UnitCost, PersistedValue::Number(0.25))],
        })
        .expect("update should succeed");
    assert_eq!(stored.unit_cost, Some(0.25));

    let items: Vec<Item> = repo
        .fetch_records(&RecordFilter::default())
        .expect("fetch should succeed");
    let skus: Vec<&str> = items.iter().map(|item| item.sku.as_str()).collect();
    assert_eq!(skus, vec!["BOLT-10", "NUT-5"]);
}

#[test]
fn csv_export_writes_labels_and_status() {
    let records = vec![
        Supplier {
            lead_time_days: Some(7.0),
            ..supplier("s1", "Acme Metals")
        },
        Supplier {
            is_archived: true,
            ..supplier("s2", "Bolt, Supply")
        },
    ];
    let mut output = Vec::new();

    let count = write_records(&mut output, &records).expect("export should succeed");

    let text = String::from_utf8(output).expect("csv should be utf-8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(count, 2);
    assert_eq!(
        lines[0],
        "Name,Contact,Email,Phone,Website,Address,Payment terms,Lead time (days),Last order,Notes,Status"
    );
    assert!(lines[1].starts_with("Acme Metals,,s1@example.com,"));
    assert!(lines[1].ends_with(",Active"));
    assert!(lines[2].starts_with("\"Bolt, Supply\""));
    assert!(lines[2].ends_with(",Archived"));
}

fn services(repo: Arc<SqliteRepo>) -> (EditService<Supplier>, RecordService<Supplier>) {
    let edit = EditService::new(repo.clone(), Arc::new(SupplierValidator), &EditSettings::default());
    let records = RecordService::new(repo, edit.session().clone());
    (edit, records)
}

#[tokio::test]
async fn quick_edit_saves_a_normalised_field() {
    let (_temp_dir, db_path) = test_db();
    let repo = Arc::new(seeded_repo(&db_path));
    let (edit, records) = services(repo.clone());
    records
        .fetch(RecordFilter::default())
        .await
        .expect("fetch should succeed");
    let s1 = RowId::new("s1");

    edit.toggle_single_edit(&s1, Confirmation::Unconfirmed)
        .expect("should enter quick edit");
    let cell = edit
        .field_value(&s1, SupplierField::Email)
        .expect("row should be loaded");
    cell.update_value(FieldValue::text("  Sales@ACME.com "));

    assert_eq!(cell.flush().await, Some(true));
    assert!(!edit.has_unsaved_changes());
    assert_eq!(edit.edit_mode(), EditMode::QuickEdit(s1.clone()));

    let stored = fetch_suppliers(&repo, &RecordFilter::default());
    assert_eq!(stored[0].email, "sales@acme.com");
    assert_eq!(edit.rows()[0].email, "sales@acme.com");
}

#[tokio::test]
async fn bulk_edit_saves_every_row_in_one_batch() {
    let (_temp_dir, db_path) = test_db();
    let repo = Arc::new(seeded_repo(&db_path));
    let (edit, records) = services(repo.clone());
    records
        .fetch(RecordFilter::default())
        .await
        .expect("fetch should succeed");

    edit.enter_all_edit().expect("should enter bulk edit");
    edit.update_field(&RowId::new("s1"), SupplierField::Phone, FieldValue::text("555.123.4567"))
        .expect("should record change");
    edit.update_field(&RowId::new("s2"), SupplierField::Website, FieldValue::text("bolt.example"))
        .expect("should record change");
    assert_eq!(edit.pending_row_count(), 2);

    let outcome = edit.save_all().await.expect("save should succeed");

    assert_eq!(outcome, SaveOutcome::Saved { updated_count: 2 });
    assert_eq!(edit.edit_mode(), EditMode::Viewing);
    assert!(!edit.has_unsaved_changes());
    let stored = fetch_suppliers(&repo, &RecordFilter::default());
    assert_eq!(stored[0].phone, "555-123-4567");
    assert_eq!(stored[1].website, "https://bolt.example");
    edit.shutdown();
}

#[tokio::test]
async fn bulk_save_with_a_duplicate_name_writes_nothing() {
    let (_temp_dir, db_path) = test_db();
    let repo = Arc::new(seeded_repo(&db_path));
    let (edit, records) = services(repo.clone());
    records
        .fetch(RecordFilter::default())
        .await
        .expect("fetch should succeed");

    edit.enter_all_edit().expect("should enter bulk edit");
    edit.update_field(&RowId::new("s1"), SupplierField::Notes, FieldValue::text("priority"))
        .expect("should record change");
    edit.update_field(&RowId::new("s2"), SupplierField::Name, FieldValue::text("acme metals"))
        .expect("should record change");

    let err = edit.save_all().await.expect_err("duplicate should be rejected");

    assert!(matches!(
        err,
        SaveError::Validation(ValidationError::Duplicate { .. })
    ));
    assert_eq!(edit.edit_mode(), EditMode::BulkEdit);
    assert_eq!(edit.pending_row_count(), 2);
    let stored = fetch_suppliers(&repo, &RecordFilter::default());
    assert_eq!(stored[0].notes, "");
    assert_eq!(names(&stored), vec!["Acme Metals", "Bolt Supply"]);
    edit.shutdown();
}

#[tokio::test]
async fn deleting_a_selection_keeps_blocked_rows_selected() {
    let (_temp_dir, db_path) = test_db();
    let repo = Arc::new(seeded_repo(&db_path));
    repo.insert(&Item::new("i1", "BOLT-10", "Bolt 10mm"))
        .expect("should insert item");
    repo.insert_purchase(&Purchase {
        id: RowId::new("p1"),
        supplier_id: RowId::new("s1"),
        item_id: RowId::new("i1"),
        quantity: 1.0,
        status: PurchaseStatus::Draft,
    })
    .expect("should insert purchase");
    let (edit, records) = services(repo.clone());
    records
        .fetch(RecordFilter::default())
        .await
        .expect("fetch should succeed");
    let mut selection: SelectionSet = ids(&["s1", "s2"]).into_iter().collect();

    let result = records
        .delete(&mut selection)
        .await
        .expect("delete should succeed");

    assert_eq!(result.deleted_ids, ids(&["s2"]));
    assert_eq!(selection.ids(), ids(&["s1"]));
    assert_eq!(names(&edit.rows()), vec!["Acme Metals"]);
    assert!(edit.rows().iter().all(|row| row.row_id() != &RowId::new("s2")));
}

#[tokio::test]
async fn items_run_through_the_same_edit_engine() {
    let (_temp_dir, db_path) = test_db();
    let repo = Arc::new(seeded_repo(&db_path));
    repo.insert(&Item::new("i1", "BOLT-10", "Bolt 10mm"))
        .expect("should insert item");
    repo.insert(&Item::new("i2", "NUT-5", "Nut 5mm"))
        .expect("should insert item");
    let edit: EditService<Item> =
        EditService::new(repo.clone(), Arc::new(ItemValidator), &EditSettings::default());
    let records = RecordService::new(repo.clone(), edit.session().clone());
    records
        .fetch(RecordFilter::default())
        .await
        .expect("fetch should succeed");

    edit.enter_all_edit().expect("should enter bulk edit");
    edit.update_field(&RowId::new("i2"), ItemField::Sku, FieldValue::text(" bolt-10 "))
        .expect("should record change");
    let err = edit.save_all().await.expect_err("duplicate sku should be rejected");
    assert!(matches!(
        err,
        SaveError::Validation(ValidationError::Duplicate { .. })
    ));

    edit.update_field(&RowId::new("i2"), ItemField::Sku, FieldValue::text(" nut-6 "))
        .expect("should record change");
    edit.update_field(&RowId::new("i1"), ItemField::UnitCost, FieldValue::Number(Some(0.4)))
        .expect("should record change");
    let outcome = edit.save_all().await.expect("save should succeed");

    assert_eq!(outcome, SaveOutcome::Saved { updated_count: 2 });
    assert_eq!(edit.edit_mode(), EditMode::Viewing);
    let stored: Vec<Item> = repo
        .fetch_records(&RecordFilter::default())
        .expect("fetch should succeed");
    assert_eq!(stored[0].unit_cost, Some(0.4));
    assert_eq!(stored[1].sku, "NUT-6");

    let i1 = RowId::new("i1");
    edit.toggle_single_edit(&i1, Confirmation::Unconfirmed)
        .expect("should enter quick edit");
    let cell = edit
        .field_value(&i1, ItemField::Name)
        .expect("row should be loaded");
    cell.update_value(FieldValue::text("  Bolt 10mm zinc "));
    assert_eq!(cell.flush().await, Some(true));
    assert_eq!(cell.value(), FieldValue::text("Bolt 10mm zinc"));
    edit.shutdown();
}
