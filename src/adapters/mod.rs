//! Custom event adapter contracts.
//!
//! Third-party networks plug into the mediation core by implementing
//! [`CustomEventInterstitial`]. The core never calls anything beyond the
//! three methods of that trait, and adapters report back exclusively through
//! the [`CustomEventInterstitialListener`] handle they receive on load.

mod registry;

pub use registry::{AdapterConstructionError, AdapterFactory, AdapterRegistry, ResolutionError};

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error_code::AdErrorCode;

/// Values constructed by the host application and handed to the adapter.
pub type LocalExtras = HashMap<String, Value>;

/// Values decoded from the server-supplied configuration payload.
pub type ServerExtras = HashMap<String, String>;

/// Local extras key carrying the request location, when known.
pub const LOCATION_KEY: &str = "location";

/// Local extras key carrying the ad configuration snapshot.
pub const AD_CONFIGURATION_KEY: &str = "Ad-Configuration";

/// Host-side information passed to adapters on load.
#[derive(Clone, Default)]
pub struct HostContext {
    pub placement_id: String,
    handle: Option<Arc<dyn Any + Send + Sync>>,
}

impl HostContext {
    pub fn new(placement_id: impl Into<String>) -> Self {
        Self {
            placement_id: placement_id.into(),
            handle: None,
        }
    }

    /// Attach an opaque host object (activity, window, app handle…).
    pub fn with_handle(mut self, handle: Arc<dyn Any + Send + Sync>) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Downcast the host object to a concrete type.
    pub fn handle<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.handle.as_deref().and_then(|handle| handle.downcast_ref::<T>())
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("placement_id", &self.placement_id)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

/// Capability set every third-party interstitial adapter implements.
pub trait CustomEventInterstitial: Send {
    /// Begin loading. Completion is reported asynchronously through `listener`,
    /// possibly from another thread, possibly before this method returns.
    fn load_interstitial(
        &mut self,
        context: &HostContext,
        listener: Arc<dyn CustomEventInterstitialListener>,
        local_extras: &LocalExtras,
        server_extras: &ServerExtras,
    );

    fn show_interstitial(&mut self);

    /// Release network resources. Called at most once per adapter instance.
    fn on_invalidate(&mut self);
}

/// Callbacks an adapter emits while loading and presenting an interstitial.
pub trait CustomEventInterstitialListener: Send + Sync {
    fn on_interstitial_loaded(&self);

    /// `None` is reported upward as [`AdErrorCode::Unspecified`].
    fn on_interstitial_failed(&self, error: Option<AdErrorCode>);

    fn on_interstitial_shown(&self);

    fn on_interstitial_clicked(&self);

    /// The user left the application from the ad; handled as a click.
    fn on_leave_application(&self);

    fn on_interstitial_dismissed(&self);
}

/// Decode the server parameter blob into string extras.
///
/// The payload is a flat JSON object. String values are taken verbatim and
/// other scalars keep their JSON text. Anything that does not decode yields an
/// empty map.
pub fn parse_server_extras(json: &str) -> ServerExtras {
    if json.trim().is_empty() {
        return ServerExtras::new();
    }

    match serde_json::from_str::<serde_json::Map<String, Value>>(json) {
        Ok(object) => object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
        Err(err) => {
            log::debug!("failed to create map from JSON {json:?}: {err}");
            ServerExtras::new()
        }
    }
}
