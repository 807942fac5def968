//! Per-chart edit sessions (optimistic inline editing).
//!
//! Each chart identity moves through
//! `Viewing -> Editing(draft) -> Saving(draft) -> Viewing`, returning to
//! `Editing(draft)` when a save fails so the operator keeps their input.
//!
//! [`EditState::apply`] is the pure reducer. [`EditSessionManager`] drives
//! it against a [`PriceChartStore`], enforcing a single writer per identity:
//! a second `begin_edit` on an identity that is already editing or saving is
//! rejected with [`CoreError::Conflict`]. The session lock is never held
//! across store I/O, so sessions on other identities stay responsive while a
//! save is in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::price_chart::{ChartDraft, PriceChart, PriceChartPatch};
use crate::store::PriceChartStore;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The identity an edit session is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SessionKey {
    /// Editing an existing chart.
    Chart(DbId),
    /// Creating a new chart under the given package (one draft per package).
    NewChart(DbId),
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chart(id) => write!(f, "price chart {id}"),
            Self::NewChart(package_id) => write!(f, "new price chart for package {package_id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Edit state of one chart identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditState {
    Viewing,
    Editing {
        draft: ChartDraft,
        /// Last validation or save failure, shown inline.
        error: Option<String>,
    },
    Saving {
        draft: ChartDraft,
    },
}

/// Inputs to the edit state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum EditEvent {
    BeginEdit(ChartDraft),
    FieldChange(ChartDraft),
    Cancel,
    Submit,
    SaveSucceeded,
    SaveFailed(String),
}

impl EditEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::BeginEdit(_) => "begin edit",
            Self::FieldChange(_) => "change fields",
            Self::Cancel => "cancel",
            Self::Submit => "submit",
            Self::SaveSucceeded | Self::SaveFailed(_) => "complete save",
        }
    }
}

impl EditState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Viewing => "viewing",
            Self::Editing { .. } => "editing",
            Self::Saving { .. } => "saving",
        }
    }

    /// `true` while the identity is held by a session.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Viewing)
    }

    /// The working draft, if any.
    pub fn draft(&self) -> Option<&ChartDraft> {
        match self {
            Self::Viewing => None,
            Self::Editing { draft, .. } | Self::Saving { draft } => Some(draft),
        }
    }

    /// The error shown alongside an `Editing` draft.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Editing { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    /// Apply `event` in place.
    ///
    /// On an illegal transition the state is left untouched and a
    /// `Conflict` is returned. A `Submit` whose draft fails validation stays
    /// in `Editing`, records the message, and returns the `Validation` error.
    pub fn apply(&mut self, event: EditEvent) -> Result<(), CoreError> {
        let current = std::mem::replace(self, Self::Viewing);
        let (next, outcome) = current.step(event);
        *self = next;
        outcome
    }

    fn step(self, event: EditEvent) -> (Self, Result<(), CoreError>) {
        match (self, event) {
            (Self::Viewing, EditEvent::BeginEdit(draft)) => {
                (Self::Editing { draft, error: None }, Ok(()))
            }
            (Self::Editing { .. }, EditEvent::FieldChange(draft)) => {
                (Self::Editing { draft, error: None }, Ok(()))
            }
            (Self::Editing { .. }, EditEvent::Cancel) => (Self::Viewing, Ok(())),
            (Self::Editing { draft, .. }, EditEvent::Submit) => match draft.check() {
                Ok(()) => (Self::Saving { draft }, Ok(())),
                Err(err) => (
                    Self::Editing {
                        draft,
                        error: Some(err.to_string()),
                    },
                    Err(err),
                ),
            },
            (Self::Saving { .. }, EditEvent::SaveSucceeded) => (Self::Viewing, Ok(())),
            (Self::Saving { draft }, EditEvent::SaveFailed(reason)) => (
                Self::Editing {
                    draft,
                    error: Some(reason),
                },
                Ok(()),
            ),
            (state, event) => {
                let err = CoreError::Conflict(format!(
                    "Cannot {} while {}",
                    event.name(),
                    state.name()
                ));
                (state, Err(err))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// A save that has left `Editing` and awaits its store result.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub key: SessionKey,
    pub draft: ChartDraft,
}

#[derive(Debug)]
struct Session {
    state: EditState,
    /// Set when the operator navigated away mid-save.
    abandoned: bool,
    /// Placeholder holding the identity while its chart is being deleted.
    deleting: bool,
}

impl Session {
    fn editing(state: EditState) -> Self {
        Self {
            state,
            abandoned: false,
            deleting: false,
        }
    }

    fn deleting() -> Self {
        Self {
            state: EditState::Viewing,
            abandoned: false,
            deleting: true,
        }
    }

    fn describe(&self) -> &'static str {
        if self.deleting {
            "deleting"
        } else {
            self.state.name()
        }
    }
}

/// Coordinates edit sessions for every chart identity.
///
/// Share via `Arc` between every surface that can edit a chart (list row,
/// inline editor, manager panel). Wrap the store in an invalidating
/// decorator so successful saves refresh every read-side consumer.
pub struct EditSessionManager<S: PriceChartStore + ?Sized> {
    store: Arc<S>,
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl<S: PriceChartStore + ?Sized> EditSessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of `key`; identities without a session are `Viewing`.
    pub async fn state(&self, key: SessionKey) -> EditState {
        self.sessions
            .lock()
            .await
            .get(&key)
            .map(|s| s.state.clone())
            .unwrap_or(EditState::Viewing)
    }

    /// Number of identities currently editing or saving.
    pub async fn open_sessions(&self) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| !s.deleting)
            .count()
    }

    /// Start editing an existing chart from a copy of its fields.
    pub async fn begin_edit(&self, chart: &PriceChart) -> Result<ChartDraft, CoreError> {
        let draft = chart.to_draft();
        self.open(SessionKey::Chart(chart.id), draft.clone()).await?;
        Ok(draft)
    }

    /// Start a create draft for `package_id`.
    pub async fn begin_create(&self, package_id: DbId, draft: ChartDraft) -> Result<(), CoreError> {
        self.open(SessionKey::NewChart(package_id), draft).await
    }

    async fn open(&self, key: SessionKey, draft: ChartDraft) -> Result<(), CoreError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(&key) {
            tracing::warn!(%key, state = existing.describe(), "Rejected second edit session");
            return Err(CoreError::Conflict(format!(
                "{key} already has an open session ({})",
                existing.describe()
            )));
        }

        let mut state = EditState::Viewing;
        state.apply(EditEvent::BeginEdit(draft))?;
        sessions.insert(key, Session::editing(state));
        tracing::debug!(%key, "Edit session opened");
        Ok(())
    }

    /// Replace the working draft. Local only; nothing is sent to the store.
    pub async fn change(&self, key: SessionKey, draft: ChartDraft) -> Result<(), CoreError> {
        self.with_session(key, |state| state.apply(EditEvent::FieldChange(draft)))
            .await
    }

    /// Edit the working draft in place.
    pub async fn edit_draft<F>(&self, key: SessionKey, edit: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut ChartDraft),
    {
        self.with_session(key, |state| {
            let mut draft = state
                .draft()
                .cloned()
                .ok_or_else(|| CoreError::Conflict(format!("{key} has no draft")))?;
            edit(&mut draft);
            state.apply(EditEvent::FieldChange(draft))
        })
        .await
    }

    /// Discard the draft. Only valid while `Editing`.
    pub async fn cancel(&self, key: SessionKey) -> Result<(), CoreError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&key)
            .ok_or_else(|| no_session(key))?;
        session.state.apply(EditEvent::Cancel)?;
        sessions.remove(&key);
        tracing::debug!(%key, "Edit session cancelled");
        Ok(())
    }

    /// Leave the editor. An `Editing` draft is discarded; a `Saving` session
    /// is detached so its result only reaches the store.
    pub async fn abandon(&self, key: SessionKey) {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&key) {
            Some(session) if matches!(session.state, EditState::Saving { .. }) => {
                session.abandoned = true;
                tracing::debug!(%key, "Edit session detached while saving");
            }
            Some(session) if session.deleting => {}
            Some(_) => {
                sessions.remove(&key);
                tracing::debug!(%key, "Edit session abandoned");
            }
            None => {}
        }
    }

    /// Validate the draft and move to `Saving`.
    ///
    /// Fails without touching the store when the draft is invalid or a save
    /// for the same identity is already in flight.
    pub async fn begin_submit(&self, key: SessionKey) -> Result<PendingSave, CoreError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&key)
            .ok_or_else(|| no_session(key))?;
        if let Err(err) = session.state.apply(EditEvent::Submit) {
            tracing::debug!(%key, error = %err, "Submit rejected");
            return Err(err);
        }
        let draft = session
            .state
            .draft()
            .cloned()
            .ok_or_else(|| CoreError::Internal(format!("{key} is saving without a draft")))?;
        Ok(PendingSave { key, draft })
    }

    /// Apply a store result to whatever state the session is now in.
    ///
    /// Success closes the session (`Viewing`) and returns the stored record.
    /// Failure returns the session to `Editing` with the draft intact. A
    /// session abandoned mid-save is dropped either way.
    pub async fn complete_save(
        &self,
        pending: PendingSave,
        result: Result<PriceChart, CoreError>,
    ) -> Result<PriceChart, CoreError> {
        let key = pending.key;
        let mut sessions = self.sessions.lock().await;

        let Some(session) = sessions.get_mut(&key) else {
            tracing::debug!(%key, "Save completed with no open session");
            return result;
        };

        if session.abandoned {
            sessions.remove(&key);
            match &result {
                Ok(chart) => tracing::info!(%key, chart_id = chart.id, "Detached save stored"),
                Err(err) => tracing::warn!(%key, error = %err, "Detached save failed"),
            }
            return result;
        }

        match &result {
            Ok(chart) => {
                session.state.apply(EditEvent::SaveSucceeded)?;
                sessions.remove(&key);
                tracing::info!(%key, chart_id = chart.id, "Price chart saved");
            }
            Err(err) => {
                session
                    .state
                    .apply(EditEvent::SaveFailed(err.to_string()))?;
                tracing::warn!(%key, error = %err, "Price chart save failed, draft kept");
            }
        }
        result
    }

    /// Validate, persist, and settle the session in one call.
    pub async fn submit(&self, key: SessionKey) -> Result<PriceChart, CoreError> {
        let pending = self.begin_submit(key).await?;
        let result = self.persist(&pending).await;
        self.complete_save(pending, result).await
    }

    /// Delete a chart that is not currently held by an edit session.
    ///
    /// The identity stays reserved until the store call returns, so no edit
    /// session can open on a chart that is being deleted.
    pub async fn delete(&self, id: DbId) -> Result<(), CoreError> {
        let key = SessionKey::Chart(id);
        {
            let mut sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get(&key) {
                return Err(CoreError::Conflict(format!(
                    "{key} cannot be deleted while it has an open session ({})",
                    session.describe()
                )));
            }
            sessions.insert(key, Session::deleting());
        }

        let result = self.store.delete(id).await;
        self.sessions.lock().await.remove(&key);
        result?;
        tracing::info!(chart_id = id, "Price chart deleted");
        Ok(())
    }

    async fn persist(&self, pending: &PendingSave) -> Result<PriceChart, CoreError> {
        match pending.key {
            SessionKey::Chart(id) => {
                self.store
                    .update(id, &PriceChartPatch::from_draft(&pending.draft))
                    .await
            }
            SessionKey::NewChart(package_id) => self.store.create(package_id, &pending.draft).await,
        }
    }

    async fn with_session<F>(&self, key: SessionKey, f: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut EditState) -> Result<(), CoreError>,
    {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&key)
            .ok_or_else(|| no_session(key))?;
        f(&mut session.state)
    }
}

fn no_session(key: SessionKey) -> CoreError {
    CoreError::Conflict(format!("{key} has no open edit session"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
