//! # mediation-rs
//!
//! Interstitial ad mediation core: resolves third-party custom event
//! adapters by name, drives them through one load + show cycle under a
//! timeout, and builds the ad request URL the ad server expects.
//!
//! Rendering, permission prompts and HTTP transport stay with the host; the
//! crate reaches them only through the traits in [`adapters`] and
//! [`collector`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mediation_rs::{
//!     AdErrorCode, InterstitialAdapterListener, InterstitialRequest, Mediator,
//! };
//!
//! struct PrintListener;
//!
//! impl InterstitialAdapterListener for PrintListener {
//!     fn on_custom_event_interstitial_loaded(&self) {
//!         println!("loaded");
//!     }
//!     fn on_custom_event_interstitial_failed(&self, error: AdErrorCode) {
//!         println!("failed: {error}");
//!     }
//!     fn on_custom_event_interstitial_shown(&self) {}
//!     fn on_custom_event_interstitial_clicked(&self) {}
//!     fn on_custom_event_interstitial_dismissed(&self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mediator = Mediator::new()?;
//!     let request = InterstitialRequest::new("com.example.NetworkInterstitial", "placement")
//!         .with_server_params_json(r#"{"app_id":"1234"}"#);
//!     let interstitial = mediator.request_interstitial(request, Arc::new(PrintListener))?;
//!     interstitial.load();
//!     Ok(())
//! }
//! ```

mod mediator;

pub mod ad_url;
pub mod adapters;
pub mod collector;
pub mod config;
pub mod error_code;
pub mod modules;
pub mod orchestrator;

pub use crate::mediator::{
    InterstitialRequest,
    MediationError,
    MediationResult,
    Mediator,
    MediatorBuilder,
};

pub use crate::ad_url::{
    DeviceDescriptor,
    DeviceIdentifier,
    InstallStatus,
    Location,
    NetworkType,
    UrlParameters,
    build_ad_url,
};

pub use crate::adapters::{
    AdapterRegistry,
    CustomEventInterstitial,
    CustomEventInterstitialListener,
    HostContext,
    LocalExtras,
    ResolutionError,
    ServerExtras,
};

pub use crate::collector::{AdUrlGenerator, CollectorError, InstallStatusCache, ParameterCollector};

pub use crate::config::{LocationAwareness, MediatorConfig};

pub use crate::error_code::AdErrorCode;

pub use crate::modules::{
    EventDispatcher,
    EventHandler,
    LoggingHandler,
    MediationEvent,
    MetricsCollector,
    MetricsHandler,
    MetricsSnapshot,
};

pub use crate::orchestrator::{
    InterstitialAdapter,
    InterstitialAdapterListener,
    LoadOutcome,
    RequestContext,
    RequestState,
};

/// Crate version reported as the SDK version in ad request URLs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
