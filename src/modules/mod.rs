//! Cross-cutting services module
//!
//! Observes the custom event lifecycle for logging and metrics.

pub mod events;
pub mod metrics;

// Re-export commonly used types
pub use events::{
    EventDispatcher, EventHandler, FailureEvent, Interaction, InteractionEvent, InvalidatedEvent,
    LoadEvent, LoadedEvent, LoggingHandler, MediationEvent, MetricsHandler, ResolutionEvent,
};
pub use metrics::{AdapterStats, GlobalStats, MetricsCollector, MetricsSnapshot};
