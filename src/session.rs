//! Session controller: owns the mutable session state and wires user actions
//! to validation and the transcription request.
//!
//! Two async operations may overlap: the duration probe started by a
//! selection and the transcription request. Neither can be cancelled, so each
//! captures a token when it starts and only writes back if the token is still
//! current when it resolves.
//!
//! * `session_token` changes on `stop`/`reset` and guards transcription results.
//! * `selection_token` changes on every accepted selection and on reset, and
//!   guards duration estimates.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

use crate::client::{Transcribe, TranscriptionOutcome};
use crate::clipboard::ClipboardSink;
use crate::error::RejectReason;
use crate::media::{self, MediaFile};
use crate::validate::validate;

#[derive(Debug, Default, Clone)]
pub struct SessionState {
    pub selected_file: Option<Arc<MediaFile>>,
    pub text: Option<String>,
    pub in_flight: bool,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SessionSnapshot {
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub duration: Option<String>,
    pub text: Option<String>,
    pub in_flight: bool,
}

/// Result of asking the session to transcribe.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// No file selected, or a request is already pending.
    Skipped,
    /// The session was reset before the response arrived.
    Discarded(TranscriptionOutcome),
    Completed(TranscriptionOutcome),
}

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error(transparent)]
    Rejected(#[from] RejectReason),
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    session_token: u64,
    selection_token: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag when dropped, unless the session has been reset
/// since the request started. Dropping covers every exit path, including a
/// cancelled or panicking request future.
struct InFlight {
    inner: Arc<Mutex<Inner>>,
    token: u64,
}

impl InFlight {
    fn start(inner: &Arc<Mutex<Inner>>) -> Option<(Self, Arc<MediaFile>)> {
        let mut guard = lock(inner);
        if guard.state.in_flight {
            debug!("Transcription already in flight, ignoring");
            return None;
        }
        let file = guard.state.selected_file.clone()?;

        guard.state.in_flight = true;
        guard.state.text = None;
        let token = guard.session_token;
        drop(guard);

        Some((
            Self {
                inner: inner.clone(),
                token,
            },
            file,
        ))
    }

    /// Stores the outcome text. Returns `false` if the session moved on.
    fn resolve(&self, outcome: &TranscriptionOutcome) -> bool {
        let mut guard = lock(&self.inner);
        if guard.session_token != self.token {
            return false;
        }
        guard.state.text = Some(outcome.display_text());
        true
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut guard = lock(&self.inner);
        if guard.session_token == self.token {
            guard.state.in_flight = false;
        }
    }
}

pub struct SessionController<T> {
    inner: Arc<Mutex<Inner>>,
    transport: Arc<T>,
}

impl<T> Clone for SessionController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            transport: self.transport.clone(),
        }
    }
}

impl<T: Transcribe> SessionController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            transport: Arc::new(transport),
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let guard = lock(&self.inner);
        let state = &guard.state;
        SessionSnapshot {
            file_name: state.selected_file.as_ref().map(|f| f.name.clone()),
            size_bytes: state.selected_file.as_ref().map(|f| f.size_bytes),
            duration: state
                .selected_file
                .as_ref()
                .map(|_| media::format_duration(state.duration)),
            text: state.text.clone(),
            in_flight: state.in_flight,
        }
    }

    /// Validates and installs `file`, clearing any previous text and duration.
    /// On rejection the state is left untouched. The returned task fills in
    /// the duration estimate once probing finishes; awaiting it is optional.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn select_file(&self, file: MediaFile) -> Result<JoinHandle<()>, RejectReason> {
        validate(&file.name, file.size_bytes).into_result()?;

        let file = Arc::new(file);
        let token = {
            let mut guard = lock(&self.inner);
            guard.selection_token += 1;
            guard.state.selected_file = Some(file.clone());
            guard.state.text = None;
            guard.state.duration = None;
            guard.selection_token
        };
        info!("Selected {} ({} bytes)", file.name, file.size_bytes);

        let inner = self.inner.clone();
        Ok(tokio::spawn(async move {
            let probe_file = file.clone();
            let duration = tokio::task::spawn_blocking(move || {
                media::probe_duration(&probe_file.name, &probe_file.content)
            })
            .await
            .ok()
            .flatten();

            let Some(duration) = duration else {
                debug!("No duration available for {}", file.name);
                return;
            };

            let mut guard = lock(&inner);
            if guard.selection_token == token {
                guard.state.duration = Some(duration);
            } else {
                debug!("Discarding stale duration for {}", file.name);
            }
        }))
    }

    /// Checks name and size from the filesystem before reading the file.
    pub async fn select_path(&self, path: &Path) -> Result<JoinHandle<()>, SelectError> {
        let (name, size_bytes) = media::stat(path).await?;
        validate(&name, size_bytes).into_result()?;

        let file = MediaFile::load(path).await?;
        Ok(self.select_file(file)?)
    }

    pub async fn transcribe(&self) -> Attempt {
        let Some((in_flight, file)) = InFlight::start(&self.inner) else {
            return Attempt::Skipped;
        };

        let outcome = self.transport.transcribe(&file).await;

        if in_flight.resolve(&outcome) {
            info!("Transcription finished: {}", outcome_label(&outcome));
            Attempt::Completed(outcome)
        } else {
            info!("Session was reset, discarding transcription result");
            Attempt::Discarded(outcome)
        }
    }

    /// Clears everything. A pending request keeps running but its result
    /// will be discarded.
    pub fn reset(&self) {
        let mut guard = lock(&self.inner);
        guard.session_token += 1;
        guard.selection_token += 1;
        guard.state = SessionState::default();
        debug!("Session reset");
    }

    pub fn stop(&self) {
        self.reset();
    }

    /// Exports the current text. Failures are logged and returned but never
    /// change the session.
    pub fn copy_transcript(&self, sink: &dyn ClipboardSink) -> Result<()> {
        let text = lock(&self.inner).state.text.clone().unwrap_or_default();
        sink.set_text(&text).inspect_err(|e| {
            warn!("Failed to copy: {e}");
        })
    }
}

fn outcome_label(outcome: &TranscriptionOutcome) -> &'static str {
    if outcome.is_success() {
        "success"
    } else {
        "failure"
    }
}
