use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::domain::edit::session::{lock_session, EditSession, SharedSession};
use crate::domain::entities::edit::{Confirmation, RowChanges};
use crate::domain::entities::record::{EditableRecord, RecordField, RowId};
use crate::platform::desktop::blocking::run_blocking;
use crate::platform::timer::IntervalTimer;
use crate::usecase::ports::repo::{PersistedValue, RecordRepository, RecordUpdate, RepoError};
use crate::usecase::ports::validator::{RecordValidator, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("save failed: {0}")]
    Persistence(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    NothingPending,
    Saved { updated_count: usize },
    /// A bulk save was already running; this request was dropped.
    Skipped,
}

/// A validated submission: what the tracker held, and what storage gets.
struct Submission<F: RecordField> {
    pending: RowChanges<F>,
    normalized: RowChanges<F>,
}

impl<F: RecordField> Submission<F> {
    fn update(&self) -> RecordUpdate<F> {
        RecordUpdate {
            id: self.normalized.row_id.clone(),
            changes: self
                .normalized
                .changes
                .iter()
                .map(|(field, value)| (*field, PersistedValue::from_field_value(value)))
                .collect(),
        }
    }
}

struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sends pending rows to storage, one row at a time or all at once, and runs
/// the periodic auto-save while bulk edit has unsaved rows.
pub struct BatchSaveCoordinator<R: EditableRecord> {
    session: SharedSession<R>,
    repo: Arc<dyn RecordRepository<R>>,
    validator: Arc<dyn RecordValidator<R>>,
    in_flight: Arc<AtomicBool>,
    backstop: Arc<Mutex<IntervalTimer>>,
    backstop_interval: Duration,
}

impl<R: EditableRecord> Clone for BatchSaveCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            repo: self.repo.clone(),
            validator: self.validator.clone(),
            in_flight: self.in_flight.clone(),
            backstop: self.backstop.clone(),
            backstop_interval: self.backstop_interval,
        }
    }
}

impl<R: EditableRecord> BatchSaveCoordinator<R> {
    pub fn new(
        session: SharedSession<R>,
        repo: Arc<dyn RecordRepository<R>>,
        validator: Arc<dyn RecordValidator<R>>,
        backstop_interval: Duration,
    ) -> Self {
        Self {
            session,
            repo,
            validator,
            in_flight: Arc::new(AtomicBool::new(false)),
            backstop: Arc::new(Mutex::new(IntervalTimer::new())),
            backstop_interval,
        }
    }

    pub fn session(&self) -> &SharedSession<R> {
        &self.session
    }

    pub fn repo(&self) -> &Arc<dyn RecordRepository<R>> {
        &self.repo
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn backstop_running(&self) -> bool {
        self.lock_backstop().is_running()
    }

    fn lock_backstop(&self) -> MutexGuard<'_, IntervalTimer> {
        self.backstop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves one row's pending changes. On failure the pending changes stay
    /// so the user can retry or fix them.
    pub async fn save_row(&self, row_id: &RowId) -> Result<SaveOutcome, SaveError> {
        let submission = {
            let session = lock_session(&self.session);
            match session.row_changes(row_id) {
                Some(pending) => self.prepare(&session, pending.clone())?,
                None => return Ok(SaveOutcome::NothingPending),
            }
        };

        tracing::debug!(row_id = %row_id, fields = submission.pending.changes.len(), "saving row");
        let repo = self.repo.clone();
        let update = submission.update();
        match run_blocking(move || repo.update_record(&update)).await {
            Ok(stored) => {
                let mut session = lock_session(&self.session);
                session.settle_row(&submission.pending);
                session.replace_record(stored);
                drop(session);
                self.sync_backstop();
                tracing::info!(row_id = %row_id, "row saved");
                Ok(SaveOutcome::Saved { updated_count: 1 })
            }
            Err(err) => {
                tracing::warn!(row_id = %row_id, "row save failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Saves every pending row in one all-or-nothing request. While a bulk
    /// save is running, further calls return `Skipped`.
    pub async fn save_all(&self) -> Result<SaveOutcome, SaveError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("bulk save already in flight");
            return Ok(SaveOutcome::Skipped);
        }
        let _in_flight = InFlight(self.in_flight.clone());

        let submissions = {
            let mut session = lock_session(&self.session);
            let pending = session.get_all_changes();
            if pending.is_empty() {
                if session.edit_mode().is_bulk_edit() {
                    session.exit_edit(Confirmation::Confirmed).ok();
                }
                drop(session);
                self.sync_backstop();
                return Ok(SaveOutcome::NothingPending);
            }
            pending
                .into_iter()
                .map(|row| self.prepare(&session, row))
                .collect::<Result<Vec<_>, _>>()?
        };

        tracing::info!(rows = submissions.len(), "saving all pending rows");
        let repo = self.repo.clone();
        let updates: Vec<_> = submissions.iter().map(Submission::update).collect();
        match run_blocking(move || repo.bulk_update_records(&updates)).await {
            Ok(result) => {
                let mut session = lock_session(&self.session);
                for submission in &submissions {
                    session.apply_persisted(&submission.normalized);
                    session.settle_row(&submission.pending);
                }
                // The user may have left bulk edit while the request was out.
                if session.edit_mode().is_bulk_edit() && !session.has_unsaved_changes() {
                    session.exit_edit(Confirmation::Confirmed).ok();
                }
                drop(session);
                self.sync_backstop();
                tracing::info!(updated = result.updated_count, "bulk save finished");
                Ok(SaveOutcome::Saved {
                    updated_count: result.updated_count,
                })
            }
            Err(err) => {
                tracing::warn!(rows = submissions.len(), "bulk save failed: {err}");
                Err(err.into())
            }
        }
    }

    fn prepare(
        &self,
        session: &EditSession<R>,
        pending: RowChanges<R::Field>,
    ) -> Result<Submission<R::Field>, ValidationError> {
        let row_id = &pending.row_id;
        let others: Vec<R> = session
            .effective_records()
            .into_iter()
            .filter(|record| record.row_id() != row_id)
            .collect();
        let mut normalized = pending.clone();
        if let Some(record) = session.record(row_id) {
            self.validator
                .validate(record, &mut normalized.changes, &others)?;
        }
        Ok(Submission {
            pending,
            normalized,
        })
    }

    /// Starts the auto-save timer while bulk edit holds unsaved rows and
    /// stops it otherwise. Call after anything that changes either.
    pub fn sync_backstop(&self) {
        let wanted = {
            let session = lock_session(&self.session);
            session.edit_mode().is_bulk_edit() && session.has_unsaved_changes()
        };
        let mut timer = self.lock_backstop();
        if !wanted {
            timer.cancel();
            return;
        }
        if timer.is_running() {
            return;
        }
        let this = self.clone();
        timer.start(self.backstop_interval, move || {
            let this = this.clone();
            async move { this.run_backstop().await }
        });
        tracing::debug!(interval = ?self.backstop_interval, "auto-save backstop started");
    }

    async fn run_backstop(&self) {
        match self.save_all().await {
            Ok(outcome) => tracing::debug!(?outcome, "auto-save tick"),
            Err(err) => tracing::warn!("auto-save failed, retrying next tick: {err}"),
        }
    }

    /// Stops the auto-save timer. Called when the table goes away.
    pub fn shutdown(&self) {
        self.lock_backstop().cancel();
    }
}
