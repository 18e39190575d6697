use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use super::CustomEventInterstitial;
use crate::error_code::AdErrorCode;

/// Constructor registered for an adapter identifier.
pub type AdapterFactory = Arc<
    dyn Fn() -> Result<Box<dyn CustomEventInterstitial>, AdapterConstructionError> + Send + Sync,
>;

/// Raised by a factory that cannot build its adapter.
#[derive(Debug, Error)]
#[error("adapter construction failed: {0}")]
pub struct AdapterConstructionError(pub String);

impl AdapterConstructionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// The only failure resolution reports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("couldn't locate or instantiate custom event: {0}")]
    AdapterNotFound(String),
}

impl ResolutionError {
    pub fn kind(&self) -> AdErrorCode {
        match self {
            ResolutionError::AdapterNotFound(_) => AdErrorCode::AdapterNotFound,
        }
    }
}

/// Name → factory table used to instantiate custom events.
#[derive(Default)]
pub struct AdapterRegistry {
    factories: RwLock<HashMap<String, AdapterFactory>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn CustomEventInterstitial>, AdapterConstructionError>
            + Send
            + Sync
            + 'static,
    {
        let mut guard = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(name.into(), Arc::new(factory));
    }

    /// Register a type that builds itself through [`Default`].
    pub fn register_default<T>(&self, name: impl Into<String>)
    where
        T: CustomEventInterstitial + Default + 'static,
    {
        self.register(name, || Ok(Box::new(T::default()) as Box<dyn CustomEventInterstitial>));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Instantiate the adapter registered under `name`.
    ///
    /// Unknown names, factory errors and factory panics all collapse into
    /// [`ResolutionError::AdapterNotFound`]. No retry is attempted.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn CustomEventInterstitial>, ResolutionError> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        let Some(factory) = factory else {
            log::debug!("no custom event registered under {name}");
            return Err(ResolutionError::AdapterNotFound(name.to_string()));
        };

        match panic::catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(adapter)) => Ok(adapter),
            Ok(Err(err)) => {
                log::debug!("custom event {name} failed to construct: {err}");
                Err(ResolutionError::AdapterNotFound(name.to_string()))
            }
            Err(_) => {
                log::debug!("custom event {name} panicked during construction");
                Err(ResolutionError::AdapterNotFound(name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        CustomEventInterstitialListener, HostContext, LocalExtras, ServerExtras,
    };

    #[derive(Default)]
    struct NoopInterstitial;

    impl CustomEventInterstitial for NoopInterstitial {
        fn load_interstitial(
            &mut self,
            _context: &HostContext,
            _listener: Arc<dyn CustomEventInterstitialListener>,
            _local_extras: &LocalExtras,
            _server_extras: &ServerExtras,
        ) {
        }

        fn show_interstitial(&mut self) {}

        fn on_invalidate(&mut self) {}
    }

    #[test]
    fn resolves_registered_adapter() {
        let registry = AdapterRegistry::new();
        registry.register_default::<NoopInterstitial>("noop");
        assert!(registry.contains("noop"));
        assert!(registry.resolve("noop").is_ok());
    }

    #[test]
    fn every_failure_collapses_to_not_found() {
        let registry = AdapterRegistry::new();
        registry.register("broken", || Err(AdapterConstructionError::new("missing sdk")));
        registry.register(
            "panicky",
            || -> Result<Box<dyn CustomEventInterstitial>, AdapterConstructionError> {
                panic!("constructor exploded")
            },
        );

        for name in ["unknown", "broken", "panicky"] {
            let err = registry.resolve(name).err().unwrap();
            assert_eq!(err, ResolutionError::AdapterNotFound(name.to_string()));
            assert_eq!(err.kind(), AdErrorCode::AdapterNotFound);
        }
    }
}
