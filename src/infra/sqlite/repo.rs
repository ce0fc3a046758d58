use std::path::PathBuf;

use anyhow::Result;

use crate::domain::entities::purchase::{Purchase, PurchaseStatus};
use crate::domain::entities::record::RowId;
use crate::infra::sqlite::queries::{
    bulk_update_records, delete_records, fetch_records, insert_purchase, insert_record,
    set_archived, set_purchase_status, update_record,
};
use crate::infra::sqlite::schema::init_db;
use crate::infra::sqlite::tables::SqlTable;
use crate::usecase::ports::repo::{
    BulkUpdateResult, DeleteResult, RecordFilter, RecordRepository, RecordUpdate, RepoError,
};

/// One SQLite file holding every table. Each call opens its own connection.
#[derive(Debug, Clone)]
pub struct SqliteRepo {
    pub db_path: PathBuf,
}

impl SqliteRepo {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn insert<R: SqlTable>(&self, record: &R) -> Result<()> {
        insert_record(&self.db_path, record)
    }

    pub fn insert_purchase(&self, purchase: &Purchase) -> Result<()> {
        insert_purchase(&self.db_path, purchase)
    }

    pub fn set_purchase_status(&self, id: &RowId, status: PurchaseStatus) -> Result<()> {
        set_purchase_status(&self.db_path, id, status)
    }
}

impl<R: SqlTable> RecordRepository<R> for SqliteRepo {
    fn init(&self) -> Result<(), RepoError> {
        init_db(&self.db_path).map_err(RepoError::from)
    }

    fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<R>, RepoError> {
        fetch_records::<R>(&self.db_path, filter).map_err(RepoError::from)
    }

    fn update_record(&self, update: &RecordUpdate<R::Field>) -> Result<R, RepoError> {
        tracing::debug!(table = R::TABLE, id = %update.id, "update record");
        update_record::<R>(&self.db_path, update)?
            .ok_or_else(|| RepoError::NotFound(update.id.clone()))
    }

    fn bulk_update_records(
        &self,
        updates: &[RecordUpdate<R::Field>],
    ) -> Result<BulkUpdateResult, RepoError> {
        tracing::debug!(table = R::TABLE, rows = updates.len(), "bulk update");
        let updated_count = bulk_update_records::<R>(&self.db_path, updates)?;
        Ok(BulkUpdateResult { updated_count })
    }

    fn bulk_archive_records(&self, ids: &[RowId]) -> Result<usize, RepoError> {
        set_archived::<R>(&self.db_path, ids, true).map_err(RepoError::from)
    }

    fn bulk_unarchive_records(&self, ids: &[RowId]) -> Result<usize, RepoError> {
        set_archived::<R>(&self.db_path, ids, false).map_err(RepoError::from)
    }

    fn bulk_delete_records(&self, ids: &[RowId]) -> Result<DeleteResult, RepoError> {
        tracing::debug!(table = R::TABLE, rows = ids.len(), "bulk delete");
        delete_records::<R>(&self.db_path, ids).map_err(RepoError::from)
    }
}
