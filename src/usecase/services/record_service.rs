use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::edit::session::{lock_session, SharedSession};
use crate::domain::entities::record::{EditableRecord, RowId};
use crate::platform::desktop::blocking::run_blocking;
use crate::usecase::ports::repo::{DeleteResult, RecordFilter, RecordRepository, RepoError};

/// Rows ticked for a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<RowId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the row is selected afterwards.
    pub fn toggle(&mut self, id: &RowId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    pub fn select(&mut self, id: RowId) {
        self.ids.insert(id);
    }

    pub fn deselect(&mut self, id: &RowId) {
        self.ids.remove(id);
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.ids.iter().cloned().collect()
    }

    /// Drops ids that are no longer among `records`.
    pub fn retain_loaded<R: EditableRecord>(&mut self, records: &[R]) {
        self.ids
            .retain(|id| records.iter().any(|record| record.row_id() == id));
    }
}

impl FromIterator<RowId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = RowId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Loading and the bulk row actions: archive, unarchive and delete.
pub struct RecordService<R: EditableRecord> {
    repo: Arc<dyn RecordRepository<R>>,
    session: SharedSession<R>,
}

impl<R: EditableRecord> Clone for RecordService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            session: self.session.clone(),
        }
    }
}

impl<R: EditableRecord> RecordService<R> {
    pub fn new(repo: Arc<dyn RecordRepository<R>>, session: SharedSession<R>) -> Self {
        Self { repo, session }
    }

    /// Fetches rows and makes them the server snapshot edits compare against.
    pub async fn fetch(&self, filter: RecordFilter) -> Result<Vec<R>, RepoError> {
        let repo = self.repo.clone();
        let records = run_blocking(move || repo.fetch_records(&filter)).await?;
        tracing::debug!(rows = records.len(), "records fetched");
        let mut session = lock_session(&self.session);
        session.set_records(records);
        Ok(session.effective_records())
    }

    pub async fn archive(&self, selection: &SelectionSet) -> Result<usize, RepoError> {
        if selection.is_empty() {
            return Ok(0);
        }
        let repo = self.repo.clone();
        let ids = selection.ids();
        let count = run_blocking(move || repo.bulk_archive_records(&ids)).await?;
        tracing::info!(count, "records archived");
        Ok(count)
    }

    pub async fn unarchive(&self, selection: &SelectionSet) -> Result<usize, RepoError> {
        if selection.is_empty() {
            return Ok(0);
        }
        let repo = self.repo.clone();
        let ids = selection.ids();
        let count = run_blocking(move || repo.bulk_unarchive_records(&ids)).await?;
        tracing::info!(count, "records unarchived");
        Ok(count)
    }

    /// Deletes the selected rows. Deleted rows leave the selection and lose
    /// any pending edits; blocked rows stay selected so they can be archived.
    pub async fn delete(&self, selection: &mut SelectionSet) -> Result<DeleteResult, RepoError> {
        if selection.is_empty() {
            return Ok(DeleteResult::default());
        }
        let repo = self.repo.clone();
        let ids = selection.ids();
        let result = run_blocking(move || repo.bulk_delete_records(&ids)).await?;

        lock_session(&self.session).forget_rows(&result.deleted_ids);
        for id in &result.deleted_ids {
            selection.deselect(id);
        }
        if result.blocked_count() > 0 {
            tracing::info!(
                deleted = result.deleted_count(),
                blocked = result.blocked_count(),
                "delete partially blocked"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edit::session::EditSession;
    use crate::domain::entities::supplier::{Supplier, SupplierField};
    use crate::infra::memory::MemoryRepo;
    use pretty_assertions::assert_eq;

    fn fixture() -> (Arc<MemoryRepo<Supplier>>, RecordService<Supplier>) {
        let repo = Arc::new(MemoryRepo::new(vec![
            Supplier::new("S1", "One"),
            Supplier::new("S2", "Two"),
            Supplier::new("S3", "Three"),
        ]));
        let service = RecordService::new(repo.clone(), EditSession::shared());
        (repo, service)
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = SelectionSet::new();
        let s1 = RowId::from("S1");

        assert!(selection.toggle(&s1));
        assert!(selection.contains(&s1));
        assert!(!selection.toggle(&s1));
        assert!(selection.is_empty());
    }

    #[test]
    fn retain_loaded_drops_missing_rows() {
        let mut selection: SelectionSet =
            [RowId::from("S1"), RowId::from("S9")].into_iter().collect();
        selection.retain_loaded(&[Supplier::new("S1", "One")]);

        assert_eq!(selection.ids(), vec![RowId::from("S1")]);
    }

    #[tokio::test]
    async fn partial_delete_keeps_blocked_rows_selected() {
        let (repo, service) = fixture();
        repo.block_delete("S2", "has active purchases");
        service.fetch(RecordFilter::default()).await.unwrap();
        {
            let mut session = lock_session(&service.session);
            session.enter_all_edit().unwrap();
            session
                .edit_field(&RowId::from("S1"), SupplierField::Notes, "x".into())
                .unwrap();
        }
        let mut selection: SelectionSet =
            [RowId::from("S1"), RowId::from("S2")].into_iter().collect();

        let result = service.delete(&mut selection).await.unwrap();

        assert_eq!(result.deleted_count(), 1);
        assert_eq!(result.blocked_count(), 1);
        assert_eq!(
            result.blocked_reason(&RowId::from("S2")),
            Some("has active purchases")
        );
        assert!(result.suggest_archive);
        assert_eq!(selection.ids(), vec![RowId::from("S2")]);
        let session = lock_session(&service.session);
        assert!(!session.has_unsaved_changes());
        assert!(session.record(&RowId::from("S1")).is_none());
    }

    #[tokio::test]
    async fn archive_hides_rows_from_default_fetch() {
        let (_repo, service) = fixture();
        let selection: SelectionSet = [RowId::from("S3")].into_iter().collect();

        assert_eq!(service.archive(&selection).await.unwrap(), 1);
        let visible = service.fetch(RecordFilter::default()).await.unwrap();
        assert_eq!(visible.len(), 2);

        let all = service
            .fetch(RecordFilter {
                include_archived: true,
                ..RecordFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        assert_eq!(service.unarchive(&selection).await.unwrap(), 1);
        assert_eq!(service.unarchive(&selection).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_selection_skips_storage() {
        let (repo, service) = fixture();
        let mut selection = SelectionSet::new();

        assert_eq!(service.archive(&selection).await.unwrap(), 0);
        assert_eq!(
            service.delete(&mut selection).await.unwrap(),
            DeleteResult::default()
        );
        assert!(repo.calls().is_empty());
    }
}
