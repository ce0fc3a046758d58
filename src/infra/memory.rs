use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::entities::record::{EditableRecord, RecordField, RowId};
use crate::usecase::ports::repo::{
    BlockedRecord, BulkUpdateResult, DeleteResult, RecordFilter, RecordRepository, RecordUpdate,
    RepoError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable in-memory store used by the engine tests.
pub struct MemoryRepo<R: EditableRecord> {
    records: Mutex<Vec<R>>,
    delete_blocks: Mutex<HashMap<RowId, String>>,
    failures: Mutex<VecDeque<RepoError>>,
    hold: Mutex<Option<Receiver<()>>>,
    calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<RecordUpdate<R::Field>>>,
}

impl<R: EditableRecord> MemoryRepo<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: Mutex::new(records),
            delete_blocks: Mutex::new(HashMap::new()),
            failures: Mutex::new(VecDeque::new()),
            hold: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// The next write call fails with `err`.
    pub fn fail_next(&self, err: RepoError) {
        lock(&self.failures).push_back(err);
    }

    pub fn block_delete(&self, id: impl Into<RowId>, reason: &str) {
        lock(&self.delete_blocks).insert(id.into(), reason.to_string());
    }

    /// Write calls wait until `release` receives a value.
    pub fn hold_writes(&self, release: Receiver<()>) {
        *lock(&self.hold) = Some(release);
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn submitted(&self) -> Vec<RecordUpdate<R::Field>> {
        lock(&self.submitted).clone()
    }

    pub fn snapshot(&self) -> Vec<R> {
        lock(&self.records).clone()
    }

    fn begin_write(&self, call: &str) -> Result<(), RepoError> {
        lock(&self.calls).push(call.to_string());
        if let Some(release) = lock(&self.hold).take() {
            let _ = release.recv();
        }
        match lock(&self.failures).pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply(records: &mut [R], update: &RecordUpdate<R::Field>) -> Result<R, RepoError> {
        let record = records
            .iter_mut()
            .find(|record| record.row_id() == &update.id)
            .ok_or_else(|| RepoError::NotFound(update.id.clone()))?;
        for (field, persisted) in &update.changes {
            let value = persisted.to_field_value(field.kind()).ok_or_else(|| {
                RepoError::Message(format!("bad stored value for {}", field.key()))
            })?;
            record
                .set(*field, value)
                .map_err(|err| RepoError::Message(err.to_string()))?;
        }
        Ok(record.clone())
    }

    fn set_archived(&self, call: &str, ids: &[RowId], archived: bool) -> Result<usize, RepoError> {
        self.begin_write(call)?;
        let mut records = lock(&self.records);
        let mut count = 0;
        for record in records.iter_mut().filter(|record| ids.contains(record.row_id())) {
            if record.is_archived() != archived {
                let field = R::Field::archive_flag()
                    .ok_or_else(|| RepoError::Message("record has no archive flag".to_string()))?;
                record
                    .set(field, archived.into())
                    .map_err(|err| RepoError::Message(err.to_string()))?;
                count += 1;
            }
        }
        Ok(count)
    }
}

impl<R: EditableRecord> RecordRepository<R> for MemoryRepo<R> {
    fn init(&self) -> Result<(), RepoError> {
        Ok(())
    }

    fn fetch_records(&self, filter: &RecordFilter) -> Result<Vec<R>, RepoError> {
        lock(&self.calls).push("fetch".to_string());
        Ok(lock(&self.records)
            .iter()
            .filter(|record| filter.include_archived || !record.is_archived())
            .cloned()
            .collect())
    }

    fn update_record(&self, update: &RecordUpdate<R::Field>) -> Result<R, RepoError> {
        self.begin_write("update")?;
        lock(&self.submitted).push(update.clone());
        Self::apply(&mut lock(&self.records), update)
    }

    fn bulk_update_records(
        &self,
        updates: &[RecordUpdate<R::Field>],
    ) -> Result<BulkUpdateResult, RepoError> {
        self.begin_write("bulk_update")?;
        lock(&self.submitted).extend(updates.iter().cloned());
        let mut records = lock(&self.records);
        let mut staged = records.clone();
        for update in updates {
            Self::apply(&mut staged, update)?;
        }
        *records = staged;
        Ok(BulkUpdateResult {
            updated_count: updates.len(),
        })
    }

    fn bulk_archive_records(&self, ids: &[RowId]) -> Result<usize, RepoError> {
        self.set_archived("archive", ids, true)
    }

    fn bulk_unarchive_records(&self, ids: &[RowId]) -> Result<usize, RepoError> {
        self.set_archived("unarchive", ids, false)
    }

    fn bulk_delete_records(&self, ids: &[RowId]) -> Result<DeleteResult, RepoError> {
        self.begin_write("delete")?;
        let blocks = lock(&self.delete_blocks);
        let mut records = lock(&self.records);
        let mut result = DeleteResult::default();
        for id in ids {
            match blocks.get(id) {
                Some(reason) => result.blocked.push(BlockedRecord {
                    id: id.clone(),
                    reason: reason.clone(),
                }),
                None => {
                    let before = records.len();
                    records.retain(|record| record.row_id() != id);
                    if records.len() < before {
                        result.deleted_ids.push(id.clone());
                    }
                }
            }
        }
        result.suggest_archive = !result.blocked.is_empty();
        Ok(result)
    }
}
