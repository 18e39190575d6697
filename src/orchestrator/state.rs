//! Request lifecycle states and the transitions the orchestrator allows.
//!
//! Two things are tracked separately: the load outcome, which is assigned at
//! most once, and the reported [`RequestState`]. Presentation calls never
//! touch the load outcome, so a `show()` or click that races ahead of the
//! adapter's load result cannot swallow it.

use std::fmt;

/// Lifecycle of a single custom event request.
///
/// `Invalidated` is reachable from every state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Created,
    Loading,
    Loaded,
    Failed,
    TimedOut,
    Showing,
    Shown,
    Clicked,
    Dismissed,
    Invalidated,
}

impl RequestState {
    pub fn is_invalidated(self) -> bool {
        self == RequestState::Invalidated
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestState::Created => "CREATED",
            RequestState::Loading => "LOADING",
            RequestState::Loaded => "LOADED",
            RequestState::Failed => "FAILED",
            RequestState::TimedOut => "TIMED_OUT",
            RequestState::Showing => "SHOWING",
            RequestState::Shown => "SHOWN",
            RequestState::Clicked => "CLICKED",
            RequestState::Dismissed => "DISMISSED",
            RequestState::Invalidated => "INVALIDATED",
        };
        f.write_str(label)
    }
}

/// Result of the adapter load. Leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOutcome {
    Pending,
    Loaded,
    Failed,
    TimedOut,
}

/// State gate guarded by the orchestrator mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lifecycle {
    state: RequestState,
    outcome: LoadOutcome,
    load_started: bool,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: RequestState::Created,
            outcome: LoadOutcome::Pending,
            load_started: false,
        }
    }

    pub(crate) fn state(&self) -> RequestState {
        self.state
    }

    pub(crate) fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    pub(crate) fn is_invalidated(&self) -> bool {
        self.state.is_invalidated()
    }

    /// Only the first load is accepted, whatever was shown beforehand.
    pub(crate) fn begin_load(&mut self) -> bool {
        if self.is_invalidated() || self.load_started || self.outcome != LoadOutcome::Pending {
            return false;
        }
        self.load_started = true;
        self.state = RequestState::Loading;
        true
    }

    pub(crate) fn mark_loaded(&mut self) -> bool {
        self.resolve_load(LoadOutcome::Loaded, RequestState::Loaded)
    }

    /// Adapter failures are accepted from any live state.
    pub(crate) fn mark_failed(&mut self) -> bool {
        if self.is_invalidated() {
            return false;
        }
        if self.outcome == LoadOutcome::Pending {
            self.outcome = LoadOutcome::Failed;
        }
        self.state = RequestState::Failed;
        true
    }

    /// The timer only wins while a started load is still outstanding.
    pub(crate) fn mark_timed_out(&mut self) -> bool {
        if !self.load_started {
            return false;
        }
        self.resolve_load(LoadOutcome::TimedOut, RequestState::TimedOut)
    }

    /// Record a presentation step. The reported state only moves once the
    /// ad has loaded; before that the call is still allowed through.
    pub(crate) fn present(&mut self, next: RequestState) -> bool {
        if self.is_invalidated() {
            return false;
        }
        if self.outcome == LoadOutcome::Loaded {
            self.state = next;
        }
        true
    }

    /// One-way; returns `false` when already invalidated.
    pub(crate) fn invalidate(&mut self) -> bool {
        if self.is_invalidated() {
            return false;
        }
        self.state = RequestState::Invalidated;
        true
    }

    fn resolve_load(&mut self, outcome: LoadOutcome, state: RequestState) -> bool {
        if self.is_invalidated() || self.outcome != LoadOutcome::Pending {
            return false;
        }
        self.outcome = outcome;
        self.state = state;
        true
    }
}
