//! Error kinds surfaced to interstitial listeners.

use thiserror::Error;

/// Failure reasons reported through the listener chain.
///
/// `AdapterNotFound` and `NetworkTimeout` are produced locally by the
/// mediation core; every other kind originates from a custom event adapter
/// and is forwarded unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdErrorCode {
    #[error("no ads found")]
    NoFill,
    #[error("unable to connect to the ad server")]
    ServerError,
    #[error("unable to serve ad due to invalid internal state")]
    InternalError,
    #[error("ad request was cancelled")]
    Cancelled,
    #[error("unable to find or instantiate the custom event adapter")]
    AdapterNotFound,
    #[error("custom event adapter is misconfigured")]
    AdapterConfigurationError,
    #[error("third-party network failed to respond in a timely manner")]
    NetworkTimeout,
    #[error("third-party network failed to provide an ad")]
    NetworkNoFill,
    #[error("third-party network failed due to invalid internal state")]
    NetworkInvalidState,
    #[error("unspecified error")]
    Unspecified,
}

impl AdErrorCode {
    /// Whether the kind was synthesised by the mediation core rather than an adapter.
    pub fn is_local(self) -> bool {
        matches!(self, AdErrorCode::AdapterNotFound | AdErrorCode::NetworkTimeout)
    }
}
