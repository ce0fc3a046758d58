use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::entities::edit::{EditMode, SaveStatus};
use crate::domain::entities::record::FieldValue;
use crate::platform::timer::DebounceTimer;

pub type SaveFuture = Pin<Box<dyn Future<Output = anyhow::Result<Option<FieldValue>>> + Send>>;

/// Persists one field value and returns what was stored, which may be a
/// normalised form of the submission. `Ok(None)` and `Err` both count as a
/// failed save.
pub type SaveCallback = Arc<dyn Fn(FieldValue) -> SaveFuture + Send + Sync>;

pub fn save_callback<F, Fut>(save: F) -> SaveCallback
where
    F: Fn(FieldValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<FieldValue>>> + Send + 'static,
{
    Arc::new(move |value: FieldValue| -> SaveFuture { Box::pin(save(value)) })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTiming {
    pub debounce: Duration,
    /// How long `Saved` stays visible before falling back to `Idle`.
    pub saved_reset: Duration,
}

impl Default for ValueTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            saved_reset: Duration::from_millis(2000),
        }
    }
}

/// What a view needs to redraw one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSnapshot {
    pub value: FieldValue,
    pub status: SaveStatus,
    pub dirty: bool,
}

#[derive(Debug)]
struct ValueState {
    server: FieldValue,
    local: FieldValue,
    /// Server value that arrived while the field was busy.
    deferred_server: Option<FieldValue>,
    dirty: bool,
    focused: bool,
    status: SaveStatus,
    mode: EditMode,
    debounce: DebounceTimer,
    reset: DebounceTimer,
}

impl ValueState {
    fn is_busy(&self) -> bool {
        self.dirty || self.focused || self.status == SaveStatus::Saving
    }

    fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            value: self.local.clone(),
            status: self.status,
            dirty: self.dirty,
        }
    }
}

/// Editing lifecycle of one cell, independent of how often the table redraws.
#[derive(Clone)]
pub struct EditableValue {
    state: Arc<Mutex<ValueState>>,
    changes: Arc<watch::Sender<CellSnapshot>>,
    on_save: Option<SaveCallback>,
    timing: ValueTiming,
}

impl EditableValue {
    pub fn new(server_value: FieldValue, mode: EditMode, timing: ValueTiming) -> Self {
        let state = ValueState {
            local: server_value.clone(),
            server: server_value,
            deferred_server: None,
            dirty: false,
            focused: false,
            status: SaveStatus::Idle,
            mode,
            debounce: DebounceTimer::new(),
            reset: DebounceTimer::new(),
        };
        let (changes, _) = watch::channel(state.snapshot());
        Self {
            state: Arc::new(Mutex::new(state)),
            changes: Arc::new(changes),
            on_save: None,
            timing,
        }
    }

    pub fn with_saver(mut self, on_save: SaveCallback) -> Self {
        self.on_save = Some(on_save);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ValueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ValueState) {
        let snapshot = state.snapshot();
        self.changes.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Receives a snapshot whenever the value, status or dirty flag changes,
    /// including changes made by background saves.
    pub fn subscribe(&self) -> watch::Receiver<CellSnapshot> {
        self.changes.subscribe()
    }

    pub fn value(&self) -> FieldValue {
        self.lock().local.clone()
    }

    pub fn server_value(&self) -> FieldValue {
        self.lock().server.clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.lock().status
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn is_focused(&self) -> bool {
        self.lock().focused
    }

    pub fn set_mode(&self, mode: EditMode) {
        let mut state = self.lock();
        if !mode.is_quick_edit() {
            state.debounce.cancel();
        }
        state.mode = mode;
    }

    /// Sets the local value. In quick edit with a saver attached, a save is
    /// scheduled once input pauses for the debounce window.
    pub fn update_value(&self, value: FieldValue) {
        let mut state = self.lock();
        state.local = value;
        state.dirty = state.local != state.server;
        state.reset.cancel();
        if state.status != SaveStatus::Saving {
            state.status = SaveStatus::Idle;
        }

        if !state.dirty {
            state.debounce.cancel();
        } else if self.on_save.is_some() && state.mode.is_quick_edit() {
            self.schedule_save(&mut state);
        }
        self.publish(&state);
    }

    fn schedule_save(&self, state: &mut ValueState) {
        let this = self.clone();
        state
            .debounce
            .schedule(self.timing.debounce, move || async move {
                this.flush().await;
            });
    }

    /// Drops local edits and shows the server value again.
    pub fn revert_value(&self) {
        let mut state = self.lock();
        state.debounce.cancel();
        state.reset.cancel();
        if let Some(server) = state.deferred_server.take() {
            state.server = server;
        }
        state.local = state.server.clone();
        state.dirty = false;
        state.status = SaveStatus::Idle;
        self.publish(&state);
    }

    /// Losing focus in quick edit with an unsaved value saves immediately
    /// instead of waiting for the debounce window. Returns the save outcome
    /// when one was attempted.
    pub async fn set_focused(&self, focused: bool) -> Option<bool> {
        let flush_now = {
            let mut state = self.lock();
            state.focused = focused;
            let flush_now = !focused
                && state.dirty
                && state.mode.is_quick_edit()
                && state.status != SaveStatus::Saving
                && self.on_save.is_some();
            if flush_now {
                state.debounce.cancel();
            } else if !focused && !state.is_busy() {
                if let Some(server) = state.deferred_server.take() {
                    state.local = server.clone();
                    state.server = server;
                    self.publish(&state);
                }
            }
            flush_now
        };
        if flush_now {
            self.flush().await
        } else {
            None
        }
    }

    /// Takes a new authoritative value, e.g. after a refetch. While the user
    /// is typing or a save is in flight the value is held back.
    pub fn sync_server_value(&self, server: FieldValue) {
        let mut state = self.lock();
        if state.is_busy() {
            state.deferred_server = Some(server);
            return;
        }
        state.local = server.clone();
        state.server = server;
        self.publish(&state);
    }

    /// Saves the current local value now. Returns `None` when there was
    /// nothing to save, no saver, or a save already in flight.
    pub async fn flush(&self) -> Option<bool> {
        let (value, on_save) = self.begin_save()?;
        let stored = match on_save(value.clone()).await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!("field save failed: {err:#}");
                None
            }
        };
        let saved = stored.is_some();
        self.finish_save(value, stored);
        Some(saved)
    }

    fn begin_save(&self) -> Option<(FieldValue, SaveCallback)> {
        let on_save = self.on_save.clone()?;
        let mut state = self.lock();
        if !state.dirty || state.status == SaveStatus::Saving {
            return None;
        }
        state.debounce.cancel();
        state.status = SaveStatus::Saving;
        self.publish(&state);
        Some((state.local.clone(), on_save))
    }

    fn finish_save(&self, submitted: FieldValue, stored: Option<FieldValue>) {
        let mut state = self.lock();
        let Some(stored) = stored else {
            state.status = SaveStatus::Error;
            self.publish(&state);
            return;
        };

        // show the stored form unless the user typed on meanwhile
        if state.local == submitted {
            state.local = stored.clone();
        }
        state.server = stored;
        state.deferred_server = None;
        state.dirty = state.local != state.server;
        state.status = SaveStatus::Saved;
        let this = self.clone();
        state
            .reset
            .schedule(self.timing.saved_reset, move || async move {
                this.clear_saved();
            });

        // typed on while the previous value was in flight
        if state.dirty && state.mode.is_quick_edit() {
            self.schedule_save(&mut state);
        }
        self.publish(&state);
    }

    fn clear_saved(&self) {
        let mut state = self.lock();
        if state.status == SaveStatus::Saved {
            state.status = SaveStatus::Idle;
            self.publish(&state);
        }
    }
}
