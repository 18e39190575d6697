//! Per-request data handed to the custom event adapter.

use std::time::Duration;

use serde_json::Value;

use crate::adapters::{
    AD_CONFIGURATION_KEY, HostContext, LOCATION_KEY, LocalExtras, ServerExtras,
    parse_server_extras,
};
use crate::ad_url::Location;
use crate::config::DEFAULT_INTERSTITIAL_TIMEOUT;

/// Immutable bag of everything one adapter load needs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    host: HostContext,
    local_extras: LocalExtras,
    server_extras: ServerExtras,
    timeout: Duration,
}

impl RequestContext {
    pub fn builder(placement_id: impl Into<String>) -> RequestContextBuilder {
        RequestContextBuilder::new(HostContext::new(placement_id))
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn placement_id(&self) -> &str {
        &self.host.placement_id
    }

    pub fn local_extras(&self) -> &LocalExtras {
        &self.local_extras
    }

    pub fn server_extras(&self) -> &ServerExtras {
        &self.server_extras
    }

    /// Zero means the load runs without a timer.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Fluent builder for [`RequestContext`].
pub struct RequestContextBuilder {
    host: HostContext,
    local_extras: LocalExtras,
    server_extras: ServerExtras,
    location: Option<Location>,
    ad_configuration: Option<Value>,
    timeout: Duration,
}

impl RequestContextBuilder {
    pub fn new(host: HostContext) -> Self {
        Self {
            host,
            local_extras: LocalExtras::new(),
            server_extras: ServerExtras::new(),
            location: None,
            ad_configuration: None,
            timeout: DEFAULT_INTERSTITIAL_TIMEOUT,
        }
    }

    pub fn with_host(mut self, host: HostContext) -> Self {
        self.host = host;
        self
    }

    pub fn with_local_extras(mut self, extras: LocalExtras) -> Self {
        self.local_extras = extras;
        self
    }

    pub fn insert_local_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.local_extras.insert(key.into(), value);
        self
    }

    pub fn with_server_extras(mut self, extras: ServerExtras) -> Self {
        self.server_extras = extras;
        self
    }

    /// Decode server extras from the configuration payload; bad JSON yields none.
    pub fn with_server_params_json(mut self, json: &str) -> Self {
        self.server_extras = parse_server_extras(json);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_ad_configuration(mut self, configuration: Value) -> Self {
        self.ad_configuration = Some(configuration);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> RequestContext {
        let mut local_extras = self.local_extras;
        if let Some(location) = self.location {
            local_extras.insert(LOCATION_KEY.to_string(), location.to_json());
        }
        if let Some(configuration) = self.ad_configuration {
            local_extras.insert(AD_CONFIGURATION_KEY.to_string(), configuration);
        }

        RequestContext {
            host: self.host,
            local_extras,
            server_extras: self.server_extras,
            timeout: self.timeout,
        }
    }
}
