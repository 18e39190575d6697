//! Builder that pairs a [`ParameterCollector`] with per-request targeting.

use url::Url;

use super::{InstallStatusCache, ParameterCollector, RequestTargeting};
use crate::ad_url::{Location, UrlParameters, build_ad_url};

/// Produces ad request URLs for one ad unit.
///
/// ```
/// use mediation_rs::collector::{AdUrlGenerator, ParameterCollector};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let url = AdUrlGenerator::new(ParameterCollector::new("1.17.0")?)
///     .with_ad_unit_id("unit")
///     .with_keywords("key:value")
///     .generate_url_string("ads.mopub.com");
/// assert!(url.contains("&id=unit&"));
/// assert!(url.contains("&q=key%3Avalue&"));
/// # Ok(())
/// # }
/// ```
pub struct AdUrlGenerator<'a> {
    collector: ParameterCollector,
    targeting: RequestTargeting,
    install_status: &'a InstallStatusCache,
}

impl AdUrlGenerator<'static> {
    pub fn new(collector: ParameterCollector) -> Self {
        Self::with_install_status_cache(collector, InstallStatusCache::global())
    }
}

impl<'a> AdUrlGenerator<'a> {
    pub fn with_install_status_cache(
        collector: ParameterCollector,
        install_status: &'a InstallStatusCache,
    ) -> Self {
        Self {
            collector,
            targeting: RequestTargeting::default(),
            install_status,
        }
    }

    pub fn with_ad_unit_id(mut self, ad_unit_id: impl Into<String>) -> Self {
        self.targeting.ad_unit_id = Some(ad_unit_id.into());
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.targeting.keywords = Some(keywords.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.targeting.location = Some(location);
        self
    }

    /// Collect the current parameter set, install status included.
    pub fn parameters(&self) -> UrlParameters {
        let mut params = self.collector.collect(&self.targeting);
        params.install_status = self
            .install_status
            .resolve(|| self.collector.companion_app_status());
        params
    }

    pub fn generate_url_string(&self, host: &str) -> String {
        build_ad_url(host, &self.parameters())
    }

    pub fn generate_url(&self, host: &str) -> Result<Url, url::ParseError> {
        Url::parse(&self.generate_url_string(host))
    }
}
