//! Event system for the mediation core.
//!
//! Provides hooks for metrics, logging, and custom reactions around the
//! custom event lifecycle.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::metrics::MetricsCollector;
use crate::error_code::AdErrorCode;

/// Adapter identifier could not be turned into an instance.
#[derive(Debug, Clone)]
pub struct ResolutionEvent {
    pub adapter: String,
    pub timestamp: DateTime<Utc>,
}

/// Adapter load was handed off.
#[derive(Debug, Clone)]
pub struct LoadEvent {
    pub adapter: String,
    pub placement_id: String,
    pub timeout: Option<Duration>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoadedEvent {
    pub adapter: String,
    pub latency: Option<Duration>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub adapter: String,
    pub error: AdErrorCode,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Shown,
    Clicked,
    Dismissed,
}

#[derive(Debug, Clone)]
pub struct InteractionEvent {
    pub adapter: String,
    pub interaction: Interaction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InvalidatedEvent {
    pub adapter: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum MediationEvent {
    ResolutionFailed(ResolutionEvent),
    LoadStarted(LoadEvent),
    Loaded(LoadedEvent),
    Failed(FailureEvent),
    TimedOut(FailureEvent),
    Interaction(InteractionEvent),
    Invalidated(InvalidatedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &MediationEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: MediationEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &MediationEvent) {
        match event {
            MediationEvent::ResolutionFailed(resolution) => {
                log::debug!("couldn't locate or instantiate custom event: {}", resolution.adapter);
            }
            MediationEvent::LoadStarted(load) => {
                log::debug!(
                    "-> {} load for placement {} (timeout {:?})",
                    load.adapter,
                    load.placement_id,
                    load.timeout
                );
            }
            MediationEvent::Loaded(loaded) => match loaded.latency {
                Some(latency) => log::debug!(
                    "<- {} loaded ({:.2}s)",
                    loaded.adapter,
                    latency.as_secs_f64()
                ),
                None => log::debug!("<- {} loaded", loaded.adapter),
            },
            MediationEvent::Failed(failure) => {
                log::info!("custom event {} failed: {}", failure.adapter, failure.error);
            }
            MediationEvent::TimedOut(failure) => {
                log::info!("third-party network {} timed out", failure.adapter);
            }
            MediationEvent::Interaction(interaction) => {
                log::debug!("{} {:?}", interaction.adapter, interaction.interaction);
            }
            MediationEvent::Invalidated(invalidated) => {
                log::debug!("custom event {} invalidated", invalidated.adapter);
            }
        }
    }
}

/// Metrics handler that feeds the metrics collector.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    metrics: MetricsCollector,
}

impl MetricsHandler {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self { metrics }
    }
}

impl EventHandler for MetricsHandler {
    fn handle(&self, event: &MediationEvent) {
        match event {
            MediationEvent::ResolutionFailed(_) => {
                self.metrics.record_resolution_failure();
            }
            MediationEvent::LoadStarted(load) => {
                self.metrics.record_request(&load.adapter);
            }
            MediationEvent::Loaded(loaded) => {
                self.metrics.record_fill(&loaded.adapter, loaded.latency);
            }
            MediationEvent::Failed(failure) => {
                self.metrics.record_failure(&failure.adapter);
            }
            MediationEvent::TimedOut(failure) => {
                self.metrics.record_timeout(&failure.adapter);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &MediationEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher.dispatch(MediationEvent::TimedOut(FailureEvent {
            adapter: "com.example.Network".into(),
            error: AdErrorCode::NetworkTimeout,
            timestamp: Utc::now(),
        }));
        assert_eq!(*counter.0.lock().unwrap(), 1);
    }

    #[test]
    fn metrics_handler_counts_outcomes() {
        let metrics = MetricsCollector::new();
        let handler = MetricsHandler::new(metrics.clone());
        handler.handle(&MediationEvent::LoadStarted(LoadEvent {
            adapter: "net".into(),
            placement_id: "slot".into(),
            timeout: Some(Duration::from_secs(30)),
            timestamp: Utc::now(),
        }));
        handler.handle(&MediationEvent::Loaded(LoadedEvent {
            adapter: "net".into(),
            latency: Some(Duration::from_millis(120)),
            timestamp: Utc::now(),
        }));

        let stats = metrics.snapshot().adapter("net").cloned().unwrap();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.fills, 1);
    }
}
