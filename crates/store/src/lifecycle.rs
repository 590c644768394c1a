//! Adapter lifecycle state machine.
//!
//! ```text
//!                 init              init ok
//! Uninitialized ───────► Initializing ───────► Ready
//!       ▲                    │                   │
//!       └────── init fails ──┘                   │ close
//!                            │ close             ▼
//!                            └───────────────► Closed
//! ```
//!
//! The state lives behind a single [`parking_lot::RwLock`]. Operations take
//! the read lock just long enough to clone the ready handle; `init` and
//! `close` take the write lock only to swap states. No guard is ever held
//! across an `.await`.

use std::{fmt, sync::Arc};

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{ConfigError, StoreError, StoreResult};

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// `init` has not run, or failed.
    Uninitialized,
    /// `init` is connecting.
    Initializing,
    /// Operations are accepted.
    Ready,
    /// `close` has run. Terminal.
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

enum State<R> {
    Uninitialized,
    Initializing,
    Ready(Arc<R>),
    Closed,
}

/// Lifecycle guard around the resources `R` a ready adapter owns.
pub(crate) struct Lifecycle<R> {
    state: RwLock<State<R>>,
}

impl<R> Lifecycle<R> {
    pub(crate) fn new() -> Self {
        Self { state: RwLock::new(State::Uninitialized) }
    }

    pub(crate) fn phase(&self) -> Phase {
        match &*self.state.read() {
            State::Uninitialized => Phase::Uninitialized,
            State::Initializing => Phase::Initializing,
            State::Ready(_) => Phase::Ready,
            State::Closed => Phase::Closed,
        }
    }

    /// Claims the right to initialize.
    pub(crate) fn begin_init(&self) -> StoreResult<()> {
        let mut state = self.state.write();
        match &*state {
            State::Uninitialized => {
                *state = State::Initializing;
                Ok(())
            },
            State::Initializing | State::Ready(_) => Err(ConfigError::AlreadyInitialized.into()),
            State::Closed => Err(StoreError::Closed),
        }
    }

    /// Installs the ready resources.
    ///
    /// Hands them back if `close` ran while initializing, so the caller can
    /// release them.
    pub(crate) fn complete_init(&self, ready: Arc<R>) -> Result<(), Arc<R>> {
        let mut state = self.state.write();
        match &*state {
            State::Initializing => {
                *state = State::Ready(ready);
                Ok(())
            },
            _ => Err(ready),
        }
    }

    /// Returns to `Uninitialized` after a failed `init`, unless closed meanwhile.
    pub(crate) fn abort_init(&self) {
        let mut state = self.state.write();
        if matches!(&*state, State::Initializing) {
            *state = State::Uninitialized;
        }
    }

    /// Returns the ready handle, or the lifecycle error for the current phase.
    pub(crate) fn ready(&self) -> StoreResult<Arc<R>> {
        match &*self.state.read() {
            State::Ready(ready) => Ok(Arc::clone(ready)),
            State::Uninitialized | State::Initializing => Err(StoreError::NotReady),
            State::Closed => Err(StoreError::Closed),
        }
    }

    /// Moves to `Closed`, returning the ready handle if there was one.
    pub(crate) fn close(&self) -> Option<Arc<R>> {
        let previous = std::mem::replace(&mut *self.state.write(), State::Closed);
        match previous {
            State::Ready(ready) => Some(ready),
            _ => None,
        }
    }
}
