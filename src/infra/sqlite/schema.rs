use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;
    Ok(conn)
}

pub fn init_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }

    let conn = open_connection(db_path)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS supplier (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            contact_name    TEXT NOT NULL DEFAULT '',
            email           TEXT NOT NULL DEFAULT '',
            phone           TEXT NOT NULL DEFAULT '',
            website         TEXT NOT NULL DEFAULT '',
            address         TEXT NOT NULL DEFAULT '',
            payment_terms   TEXT NOT NULL DEFAULT '',
            lead_time_days  REAL,
            last_order_date TEXT,
            notes           TEXT NOT NULL DEFAULT '',
            is_archived     INTEGER NOT NULL DEFAULT 0,
            updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS item (
            id            TEXT PRIMARY KEY,
            sku           TEXT NOT NULL,
            name          TEXT NOT NULL,
            unit          TEXT NOT NULL DEFAULT '',
            unit_cost     REAL,
            reorder_level REAL,
            is_archived   INTEGER NOT NULL DEFAULT 0,
            updated_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS purchase (
            id          TEXT PRIMARY KEY,
            supplier_id TEXT NOT NULL,
            item_id     TEXT NOT NULL,
            quantity    REAL NOT NULL DEFAULT 0,
            status      TEXT NOT NULL
                CHECK (status IN ('draft', 'ordered', 'received', 'cancelled')),
            created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (supplier_id) REFERENCES supplier(id),
            FOREIGN KEY (item_id) REFERENCES item(id)
        );

        CREATE INDEX IF NOT EXISTS idx_purchase_supplier_status
            ON purchase(supplier_id, status);

        CREATE INDEX IF NOT EXISTS idx_purchase_item_status
            ON purchase(item_id, status);
        ",
    )
    .context("failed to initialize schema")?;

    Ok(())
}
