//! Custom event request orchestration.
//!
//! An [`InterstitialAdapter`] owns exactly one resolved custom event for the
//! lifetime of one load + show cycle. It arms the load timeout, forwards
//! `load`/`show` to the adapter and funnels the adapter's callbacks into a
//! single [`InterstitialAdapterListener`].
//!
//! Every callback path checks the request state under one mutex before doing
//! anything, so whichever of {adapter success, adapter failure, timer fire}
//! lands first wins and everything after invalidation is dropped.

mod context;
mod state;
mod timeout;

pub use context::{RequestContext, RequestContextBuilder};
pub use state::{LoadOutcome, RequestState};

use state::Lifecycle;
pub use timeout::TimeoutTimer;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use chrono::Utc;

use crate::adapters::{CustomEventInterstitial, CustomEventInterstitialListener};
use crate::error_code::AdErrorCode;
use crate::modules::events::{
    EventDispatcher, FailureEvent, Interaction, InteractionEvent, InvalidatedEvent, LoadEvent,
    LoadedEvent, MediationEvent,
};

/// Downstream receiver of a request's outcome.
pub trait InterstitialAdapterListener: Send + Sync {
    fn on_custom_event_interstitial_loaded(&self);
    fn on_custom_event_interstitial_failed(&self, error: AdErrorCode);
    fn on_custom_event_interstitial_shown(&self);
    fn on_custom_event_interstitial_clicked(&self);
    fn on_custom_event_interstitial_dismissed(&self);
}

struct Inner {
    lifecycle: Lifecycle,
    /// `None` while lent out to a running adapter call, or after teardown.
    adapter: Option<Box<dyn CustomEventInterstitial>>,
    context: Option<Arc<RequestContext>>,
    listener: Option<Arc<dyn InterstitialAdapterListener>>,
    timer: Option<TimeoutTimer>,
    load_started: Option<Instant>,
}

impl Inner {
    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

struct Shared {
    adapter_name: String,
    events: Arc<EventDispatcher>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate(&self) {
        let (adapter, context, listener, timer) = {
            let mut inner = self.lock();
            if !inner.lifecycle.invalidate() {
                return;
            }
            (
                inner.adapter.take(),
                inner.context.take(),
                inner.listener.take(),
                inner.timer.take(),
            )
        };

        // A lent adapter is torn down by its borrower once returned.
        if let Some(mut adapter) = adapter {
            adapter.on_invalidate();
        }
        drop(context);
        drop(listener);
        if let Some(timer) = timer {
            timer.cancel();
        }

        self.events.dispatch(MediationEvent::Invalidated(InvalidatedEvent {
            adapter: self.adapter_name.clone(),
            timestamp: Utc::now(),
        }));
    }

    fn return_adapter(&self, mut adapter: Box<dyn CustomEventInterstitial>) {
        let mut inner = self.lock();
        if inner.lifecycle.is_invalidated() {
            drop(inner);
            adapter.on_invalidate();
        } else {
            inner.adapter = Some(adapter);
        }
    }

    fn handle_loaded(&self) {
        let (listener, latency) = {
            let mut inner = self.lock();
            if inner.lifecycle.is_invalidated() {
                return;
            }
            if !inner.lifecycle.mark_loaded() {
                log::debug!(
                    "dropping loaded callback from {}, load already resolved as {:?}",
                    self.adapter_name,
                    inner.lifecycle.outcome()
                );
                return;
            }
            inner.disarm_timer();
            (
                inner.listener.clone(),
                inner.load_started.map(|started| started.elapsed()),
            )
        };

        self.events.dispatch(MediationEvent::Loaded(LoadedEvent {
            adapter: self.adapter_name.clone(),
            latency,
            timestamp: Utc::now(),
        }));
        if let Some(listener) = listener {
            listener.on_custom_event_interstitial_loaded();
        }
    }

    fn handle_failed(&self, error: Option<AdErrorCode>) {
        let error = error.unwrap_or(AdErrorCode::Unspecified);
        let listener = {
            let mut inner = self.lock();
            if !inner.lifecycle.mark_failed() {
                return;
            }
            inner.disarm_timer();
            inner.listener.clone()
        };

        self.events.dispatch(MediationEvent::Failed(FailureEvent {
            adapter: self.adapter_name.clone(),
            error,
            timestamp: Utc::now(),
        }));
        if let Some(listener) = listener {
            listener.on_custom_event_interstitial_failed(error);
        }
        self.invalidate();
    }

    fn handle_timeout(&self) {
        let listener = {
            let mut inner = self.lock();
            if !inner.lifecycle.mark_timed_out() {
                return;
            }
            // Running inside the timer task; aborting it here is pointless.
            if let Some(timer) = inner.timer.take() {
                timer.release();
            }
            inner.listener.clone()
        };

        self.events.dispatch(MediationEvent::TimedOut(FailureEvent {
            adapter: self.adapter_name.clone(),
            error: AdErrorCode::NetworkTimeout,
            timestamp: Utc::now(),
        }));
        if let Some(listener) = listener {
            listener.on_custom_event_interstitial_failed(AdErrorCode::NetworkTimeout);
        }
        self.invalidate();
    }

    fn handle_interaction(&self, interaction: Interaction) {
        let listener = {
            let mut inner = self.lock();
            let next = match interaction {
                Interaction::Shown => RequestState::Shown,
                Interaction::Clicked => RequestState::Clicked,
                Interaction::Dismissed => RequestState::Dismissed,
            };
            if !inner.lifecycle.present(next) {
                return;
            }
            inner.listener.clone()
        };

        self.events.dispatch(MediationEvent::Interaction(InteractionEvent {
            adapter: self.adapter_name.clone(),
            interaction,
            timestamp: Utc::now(),
        }));
        let Some(listener) = listener else {
            return;
        };
        match interaction {
            Interaction::Shown => listener.on_custom_event_interstitial_shown(),
            Interaction::Clicked => listener.on_custom_event_interstitial_clicked(),
            Interaction::Dismissed => listener.on_custom_event_interstitial_dismissed(),
        }
    }
}

/// Callback handle given to the adapter. Holds no ownership of the request.
struct AdapterCallbacks {
    shared: Weak<Shared>,
}

impl AdapterCallbacks {
    fn with_shared<F: FnOnce(&Shared)>(&self, f: F) {
        if let Some(shared) = self.shared.upgrade() {
            f(&shared);
        }
    }
}

impl CustomEventInterstitialListener for AdapterCallbacks {
    fn on_interstitial_loaded(&self) {
        self.with_shared(Shared::handle_loaded);
    }

    fn on_interstitial_failed(&self, error: Option<AdErrorCode>) {
        self.with_shared(|shared| shared.handle_failed(error));
    }

    fn on_interstitial_shown(&self) {
        self.with_shared(|shared| shared.handle_interaction(Interaction::Shown));
    }

    fn on_interstitial_clicked(&self) {
        self.with_shared(|shared| shared.handle_interaction(Interaction::Clicked));
    }

    fn on_leave_application(&self) {
        self.on_interstitial_clicked();
    }

    fn on_interstitial_dismissed(&self) {
        self.with_shared(|shared| shared.handle_interaction(Interaction::Dismissed));
    }
}

/// Orchestrates one resolved custom event through load, show and teardown.
///
/// Calls on one instance must be serialized by the caller; adapter callbacks
/// may arrive from any thread. Dropping the orchestrator invalidates it.
pub struct InterstitialAdapter {
    shared: Arc<Shared>,
}

impl InterstitialAdapter {
    pub fn new(
        adapter_name: impl Into<String>,
        adapter: Box<dyn CustomEventInterstitial>,
        context: RequestContext,
        listener: Arc<dyn InterstitialAdapterListener>,
        events: Arc<EventDispatcher>,
    ) -> Self {
        let inner = Inner {
            lifecycle: Lifecycle::new(),
            adapter: Some(adapter),
            context: Some(Arc::new(context)),
            listener: Some(listener),
            timer: None,
            load_started: None,
        };

        Self {
            shared: Arc::new(Shared {
                adapter_name: adapter_name.into(),
                events,
                inner: Mutex::new(inner),
            }),
        }
    }

    pub fn adapter_name(&self) -> &str {
        &self.shared.adapter_name
    }

    pub fn state(&self) -> RequestState {
        self.shared.lock().lifecycle.state()
    }

    /// How the load resolved, or `Pending` while it is outstanding.
    pub fn load_outcome(&self) -> LoadOutcome {
        self.shared.lock().lifecycle.outcome()
    }

    pub fn is_invalidated(&self) -> bool {
        self.state().is_invalidated()
    }

    /// Replace the downstream listener. Ignored once invalidated.
    pub fn set_listener(&self, listener: Arc<dyn InterstitialAdapterListener>) {
        let mut inner = self.shared.lock();
        if !inner.lifecycle.is_invalidated() {
            inner.listener = Some(listener);
        }
    }

    /// Arm the timeout and hand the load to the adapter.
    pub fn load(&self) {
        let (mut adapter, context) = {
            let mut inner = self.shared.lock();
            if inner.lifecycle.is_invalidated() {
                return;
            }
            let Some(context) = inner.context.clone() else {
                return;
            };
            if inner.adapter.is_none() {
                log::debug!("{} has no adapter to load", self.shared.adapter_name);
                return;
            }
            if !inner.lifecycle.begin_load() {
                log::debug!(
                    "ignoring repeated load for {} in state {}",
                    self.shared.adapter_name,
                    inner.lifecycle.state()
                );
                return;
            }

            let timeout = context.timeout();
            if !timeout.is_zero() {
                let weak = Arc::downgrade(&self.shared);
                inner.timer = TimeoutTimer::arm(timeout, move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.handle_timeout();
                    }
                });
            }
            inner.load_started = Some(Instant::now());

            let Some(adapter) = inner.adapter.take() else {
                return;
            };
            (adapter, context)
        };

        self.shared.events.dispatch(MediationEvent::LoadStarted(LoadEvent {
            adapter: self.shared.adapter_name.clone(),
            placement_id: context.placement_id().to_string(),
            timeout: (!context.timeout().is_zero()).then(|| context.timeout()),
            timestamp: Utc::now(),
        }));

        let callbacks: Arc<dyn CustomEventInterstitialListener> = Arc::new(AdapterCallbacks {
            shared: Arc::downgrade(&self.shared),
        });
        adapter.load_interstitial(
            context.host(),
            callbacks,
            context.local_extras(),
            context.server_extras(),
        );
        drop(context);

        self.shared.return_adapter(adapter);
    }

    /// Ask the adapter to present. No timeout applies.
    pub fn show(&self) {
        let mut adapter = {
            let mut inner = self.shared.lock();
            if inner.lifecycle.is_invalidated() {
                return;
            }
            let Some(adapter) = inner.adapter.take() else {
                log::debug!("{} has no adapter to show", self.shared.adapter_name);
                return;
            };
            inner.lifecycle.present(RequestState::Showing);
            adapter
        };

        adapter.show_interstitial();
        self.shared.return_adapter(adapter);
    }

    /// Tear the request down. The adapter's `on_invalidate` runs at most once.
    pub fn invalidate(&self) {
        self.shared.invalidate();
    }
}

impl Drop for InterstitialAdapter {
    fn drop(&mut self) {
        self.shared.invalidate();
    }
}

impl fmt::Debug for InterstitialAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterstitialAdapter")
            .field("adapter", &self.shared.adapter_name)
            .field("state", &self.state())
            .finish()
    }
}
