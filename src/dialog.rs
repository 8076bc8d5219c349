//! Generate-firewall dialog — the state machine the UI renders from.
//!
//! DESIGN
//! ======
//! ```text
//! Prompt   --submit--> Progress(0)
//! Progress --ok------> Success(firewall)
//! Progress --err-----> Error(message)
//! Error    --submit--> Progress(0)
//! any      --close---> Prompt
//! ```
//!
//! State is published through a `watch` channel so renderers can follow it.
//! Requests in flight are never cancelled. Instead every submit and every
//! close bumps a generation counter, and results from an attempt whose
//! generation is no longer current are dropped. The generation check and
//! the state write happen under one lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::Firewall;
use crate::error::ErrorCode;
use crate::provision::{ProvisionError, Provisioner};

// =============================================================================
// STATE
// =============================================================================

/// Exactly one of these is active per dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    Prompt,
    Progress { percent: u8 },
    Success { firewall: Firewall },
    Error { message: String },
}

impl DialogState {
    #[must_use]
    pub fn kind(&self) -> DialogKind {
        match self {
            Self::Prompt => DialogKind::Prompt,
            Self::Progress { .. } => DialogKind::Progress,
            Self::Success { .. } => DialogKind::Success,
            Self::Error { .. } => DialogKind::Error,
        }
    }
}

/// Discriminant used by renderers to pick a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogKind {
    Prompt,
    Progress,
    Success,
    Error,
}

impl DialogKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for DialogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("a firewall is already being generated")]
    AlreadyInProgress,

    #[error("a firewall has already been generated; close the dialog first")]
    AlreadyGenerated,

    #[error("the dialog was closed before the attempt finished")]
    Superseded,

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl ErrorCode for DialogError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyInProgress => "E_DIALOG_BUSY",
            Self::AlreadyGenerated => "E_DIALOG_DONE",
            Self::Superseded => "E_DIALOG_SUPERSEDED",
            Self::Provision(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Provision(e) if e.retryable())
    }
}

// =============================================================================
// CALLBACKS
// =============================================================================

type GeneratedCallback = Arc<dyn Fn(&Firewall) + Send + Sync>;
type CloseCallback = Arc<dyn Fn() + Send + Sync>;

/// Host hooks. Both are optional.
#[derive(Clone, Default)]
pub struct DialogCallbacks {
    on_resource_generated: Option<GeneratedCallback>,
    on_close: Option<CloseCallback>,
}

impl DialogCallbacks {
    /// Fired once per successful attempt, after the `Success` transition.
    #[must_use]
    pub fn on_resource_generated(mut self, f: impl Fn(&Firewall) + Send + Sync + 'static) -> Self {
        self.on_resource_generated = Some(Arc::new(f));
        self
    }

    /// Fired on every `close()`.
    #[must_use]
    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Cheaply cloneable handle; clones share one dialog.
#[derive(Clone)]
pub struct DialogController {
    inner: Arc<DialogInner>,
}

struct DialogInner {
    provisioner: Provisioner,
    callbacks: DialogCallbacks,
    /// Current attempt id. Guards every write to `state`.
    generation: Mutex<u64>,
    state: watch::Sender<DialogState>,
}

impl DialogController {
    #[must_use]
    pub fn new(provisioner: Provisioner, callbacks: DialogCallbacks) -> Self {
        let (state, _rx) = watch::channel(DialogState::Prompt);
        Self { inner: Arc::new(DialogInner { provisioner, callbacks, generation: Mutex::new(0), state }) }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> DialogState {
        self.inner.state.borrow().clone()
    }

    /// Follow state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DialogState> {
        self.inner.state.subscribe()
    }

    /// Start (or retry) generation. Valid from `Prompt` and `Error`.
    ///
    /// # Errors
    ///
    /// - [`DialogError::AlreadyInProgress`] / [`DialogError::AlreadyGenerated`]
    ///   when called from `Progress` / `Success`; state is left untouched.
    /// - [`DialogError::Provision`] when the attempt fails; state is `Error`.
    /// - [`DialogError::Superseded`] when the dialog was closed (or a newer
    ///   attempt started) before this one finished; its result is discarded.
    pub async fn submit(&self) -> Result<Firewall, DialogError> {
        let generation = self.begin_attempt()?;
        info!(generation, "dialog: submit");

        let result = self
            .inner
            .provisioner
            .provision(|percent| self.apply_progress(generation, percent))
            .await;

        match result {
            Ok(firewall) => {
                let next = DialogState::Success { firewall: firewall.clone() };
                if !self.finish_attempt(generation, next) {
                    warn!(generation, id = firewall.id, "dialog: firewall created after close; result discarded");
                    return Err(DialogError::Superseded);
                }
                if let Some(cb) = &self.inner.callbacks.on_resource_generated {
                    cb(&firewall);
                }
                Ok(firewall)
            }
            Err(e) => {
                let next = DialogState::Error { message: e.to_string() };
                if !self.finish_attempt(generation, next) {
                    return Err(DialogError::Superseded);
                }
                Err(e.into())
            }
        }
    }

    /// Dismiss the dialog from any state and reset it to `Prompt`.
    ///
    /// An attempt still in flight keeps running but can no longer touch
    /// the state or fire `on_resource_generated`.
    pub fn close(&self) {
        {
            let mut generation = self.lock_generation();
            *generation += 1;
            self.inner.state.send_replace(DialogState::Prompt);
            info!(generation = *generation, "dialog: closed");
        }
        if let Some(cb) = &self.inner.callbacks.on_close {
            cb();
        }
    }

    fn begin_attempt(&self) -> Result<u64, DialogError> {
        let mut generation = self.lock_generation();
        let kind = self.inner.state.borrow().kind();
        match kind {
            DialogKind::Progress => return Err(DialogError::AlreadyInProgress),
            DialogKind::Success => return Err(DialogError::AlreadyGenerated),
            DialogKind::Prompt | DialogKind::Error => {}
        }
        *generation += 1;
        self.inner.state.send_replace(DialogState::Progress { percent: 0 });
        Ok(*generation)
    }

    /// Raise the progress percentage; never lowers it.
    fn apply_progress(&self, generation: u64, percent: u8) {
        let current = self.lock_generation();
        if *current != generation {
            return;
        }
        let percent = percent.min(100);
        self.inner.state.send_if_modified(|state| match state {
            DialogState::Progress { percent: shown } if percent > *shown => {
                *shown = percent;
                true
            }
            _ => false,
        });
    }

    /// Apply a terminal state if `generation` is still current.
    fn finish_attempt(&self, generation: u64, next: DialogState) -> bool {
        let current = self.lock_generation();
        if *current != generation {
            return false;
        }
        info!(generation, state = %next.kind(), "dialog: attempt finished");
        self.inner.state.send_replace(next);
        true
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.inner.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "dialog_test.rs"]
mod tests;
