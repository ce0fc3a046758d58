use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Transaction};

use crate::domain::entities::purchase::{Purchase, PurchaseStatus};
use crate::domain::entities::record::{RecordField, RowId};
use crate::infra::sqlite::schema::open_connection;
use crate::infra::sqlite::tables::{
    insert_values, record_from_row, select_columns, to_sql_value, SqlTable,
};
use crate::usecase::ports::repo::{BlockedRecord, DeleteResult, RecordFilter, RecordUpdate};

pub const ACTIVE_PURCHASES_REASON: &str = "has active purchases";
pub const PURCHASE_HISTORY_REASON: &str = "has purchase history";

pub fn fetch_records<R: SqlTable>(db_path: &Path, filter: &RecordFilter) -> Result<Vec<R>> {
    let conn = open_connection(db_path)?;
    let search = filter.search.trim().to_lowercase();
    let search_clause = if search.is_empty() {
        "?2 = '%%'".to_string()
    } else {
        R::SEARCH_FIELDS
            .iter()
            .map(|field| format!("lower({}) LIKE ?2", field.key()))
            .collect::<Vec<_>>()
            .join(" OR ")
    };
    let sql = format!(
        "SELECT {columns}
         FROM {table}
         WHERE (?1 OR is_archived = 0) AND ({search_clause})
         ORDER BY {order} COLLATE NOCASE ASC, id ASC",
        columns = select_columns::<R>(),
        table = R::TABLE,
        order = R::ORDER_FIELD.key(),
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("failed to prepare {} query", R::TABLE))?;

    let pattern = format!("%{search}%");
    let mut rows = stmt
        .query(params![filter.include_archived, pattern])
        .with_context(|| format!("failed to query {}", R::TABLE))?;

    let mut records = Vec::new();
    while let Some(row) = rows
        .next()
        .with_context(|| format!("failed to read {} row", R::TABLE))?
    {
        records.push(record_from_row::<R>(row)?);
    }
    Ok(records)
}

fn fetch_record<R: SqlTable>(tx: &Transaction<'_>, id: &RowId) -> Result<Option<R>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        select_columns::<R>(),
        R::TABLE
    );
    let mut stmt = tx
        .prepare(&sql)
        .with_context(|| format!("failed to prepare {} lookup", R::TABLE))?;
    let mut rows = stmt
        .query([id.as_str()])
        .with_context(|| format!("failed to look up {} {id}", R::TABLE))?;
    match rows.next().context("failed to read row")? {
        Some(row) => Ok(Some(record_from_row::<R>(row)?)),
        None => Ok(None),
    }
}

/// Returns the number of rows touched: 0 when the id is unknown.
fn apply_update<R: SqlTable>(tx: &Transaction<'_>, update: &RecordUpdate<R::Field>) -> Result<usize> {
    if update.changes.is_empty() {
        let exists = tx
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", R::TABLE),
                [update.id.as_str()],
                |_| Ok(()),
            )
            .optional()
            .context("failed to check record")?;
        return Ok(usize::from(exists.is_some()));
    }

    let assignments = update
        .changes
        .iter()
        .map(|(field, _)| format!("{} = ?", field.key()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {assignments}, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        R::TABLE
    );
    let values = update
        .changes
        .iter()
        .map(|(_, value)| to_sql_value(value))
        .chain(std::iter::once(Value::Text(update.id.to_string())));

    tx.execute(&sql, params_from_iter(values))
        .with_context(|| format!("failed to update {} {}", R::TABLE, update.id))
}

pub fn update_record<R: SqlTable>(db_path: &Path, update: &RecordUpdate<R::Field>) -> Result<Option<R>> {
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start update transaction")?;

    if apply_update::<R>(&tx, update)? == 0 {
        return Ok(None);
    }
    let stored = fetch_record::<R>(&tx, &update.id)?;
    tx.commit().context("failed to commit update")?;
    Ok(stored)
}

/// All updates land together or not at all.
pub fn bulk_update_records<R: SqlTable>(
    db_path: &Path,
    updates: &[RecordUpdate<R::Field>],
) -> Result<usize> {
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start bulk update transaction")?;

    for update in updates {
        if apply_update::<R>(&tx, update)? == 0 {
            bail!("{} {} not found", R::TABLE, update.id);
        }
    }

    tx.commit().context("failed to commit bulk update")?;
    Ok(updates.len())
}

pub fn set_archived<R: SqlTable>(db_path: &Path, ids: &[RowId], archived: bool) -> Result<usize> {
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start archive transaction")?;

    let mut count = 0;
    {
        let mut stmt = tx
            .prepare(&format!(
                "UPDATE {} SET is_archived = ?1, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?2 AND is_archived != ?1",
                R::TABLE
            ))
            .context("failed to prepare archive update")?;
        for id in ids {
            count += stmt
                .execute(params![archived, id.as_str()])
                .with_context(|| format!("failed to archive {} {id}", R::TABLE))?;
        }
    }

    tx.commit().context("failed to commit archive update")?;
    Ok(count)
}

fn purchase_reference<R: SqlTable>(tx: &Transaction<'_>, id: &RowId) -> Result<Option<&'static str>> {
    let active = PurchaseStatus::ACTIVE.map(PurchaseStatus::as_str);
    let (active_count, total_count): (i64, i64) = tx
        .query_row(
            &format!(
                "SELECT
                    COALESCE(SUM(CASE WHEN status IN (?2, ?3) THEN 1 ELSE 0 END), 0),
                    COUNT(*)
                 FROM purchase WHERE {} = ?1",
                R::PURCHASE_REF
            ),
            params![id.as_str(), active[0], active[1]],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .with_context(|| format!("failed to check purchases for {id}"))?;

    Ok(if active_count > 0 {
        Some(ACTIVE_PURCHASES_REASON)
    } else if total_count > 0 {
        Some(PURCHASE_HISTORY_REASON)
    } else {
        None
    })
}

/// Deletes unreferenced rows. Rows still referenced by purchases are left in
/// place and reported as blocked.
pub fn delete_records<R: SqlTable>(db_path: &Path, ids: &[RowId]) -> Result<DeleteResult> {
    let mut conn = open_connection(db_path)?;
    let tx = conn.transaction().context("failed to start delete transaction")?;

    let mut result = DeleteResult::default();
    for id in ids {
        if let Some(reason) = purchase_reference::<R>(&tx, id)? {
            result.blocked.push(BlockedRecord {
                id: id.clone(),
                reason: reason.to_string(),
            });
            continue;
        }
        let deleted = tx
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1", R::TABLE),
                [id.as_str()],
            )
            .with_context(|| format!("failed to delete {} {id}", R::TABLE))?;
        if deleted > 0 {
            result.deleted_ids.push(id.clone());
        }
    }

    tx.commit().context("failed to commit delete")?;
    result.suggest_archive = !result.blocked.is_empty();
    Ok(result)
}

pub fn insert_record<R: SqlTable>(db_path: &Path, record: &R) -> Result<()> {
    let conn = open_connection(db_path)?;
    let values = insert_values(record);
    let placeholders = vec!["?"; values.len()].join(", ");
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            R::TABLE,
            select_columns::<R>()
        ),
        params_from_iter(values),
    )
    .with_context(|| format!("failed to insert {} {}", R::TABLE, record.row_id()))?;
    Ok(())
}

pub fn insert_purchase(db_path: &Path, purchase: &Purchase) -> Result<()> {
    let conn = open_connection(db_path)?;
    conn.execute(
        "INSERT INTO purchase(id, supplier_id, item_id, quantity, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            purchase.id.as_str(),
            purchase.supplier_id.as_str(),
            purchase.item_id.as_str(),
            purchase.quantity,
            purchase.status.as_str(),
        ],
    )
    .with_context(|| format!("failed to insert purchase {}", purchase.id))?;
    Ok(())
}

pub fn set_purchase_status(db_path: &Path, id: &RowId, status: PurchaseStatus) -> Result<()> {
    let conn = open_connection(db_path)?;
    let updated = conn
        .execute(
            "UPDATE purchase SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.as_str()],
        )
        .with_context(|| format!("failed to update purchase {id}"))?;
    if updated == 0 {
        bail!("purchase {id} not found");
    }
    Ok(())
}
