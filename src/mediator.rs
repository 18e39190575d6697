//! High level mediation facade.
//!
//! Wires the adapter registry, configuration and event system together to
//! turn an interstitial request into a ready-to-load [`InterstitialAdapter`],
//! and hands out ad request URL generators bound to the same configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::ad_url::Location;
use crate::adapters::{
	AdapterConstructionError, AdapterRegistry, CustomEventInterstitial, HostContext, LocalExtras,
	ResolutionError,
};
use crate::collector::{AdUrlGenerator, ParameterCollector};
use crate::config::{ConfigError, MediatorConfig, ad_timeout};
use crate::error_code::AdErrorCode;
use crate::modules::events::{
	EventDispatcher, EventHandler, LoggingHandler, MediationEvent, MetricsHandler, ResolutionEvent,
};
use crate::modules::metrics::{MetricsCollector, MetricsSnapshot};
use crate::orchestrator::{InterstitialAdapter, InterstitialAdapterListener, RequestContext};

/// Convenience result type for mediator operations.
pub type MediationResult<T> = Result<T, MediationError>;

/// Errors surfaced by the mediator.
#[derive(Debug, Error)]
pub enum MediationError {
	#[error("adapter resolution failed: {0}")]
	AdapterNotFound(#[from] ResolutionError),
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
}

impl MediationError {
	/// Error kind reported to listeners for this failure.
	pub fn kind(&self) -> AdErrorCode {
		match self {
			MediationError::AdapterNotFound(err) => err.kind(),
			MediationError::Config(_) => AdErrorCode::AdapterConfigurationError,
		}
	}
}

/// Everything the server and host supply for one interstitial request.
#[derive(Debug, Clone, Default)]
pub struct InterstitialRequest {
	pub adapter_name: String,
	pub placement_id: String,
	/// Raw JSON object of adapter-specific server parameters.
	pub server_params_json: Option<String>,
	pub host: Option<HostContext>,
	pub local_extras: LocalExtras,
	pub location: Option<Location>,
	pub ad_configuration: Option<Value>,
	/// Overrides the configured load timeout, in seconds.
	pub timeout_secs: Option<i64>,
}

impl InterstitialRequest {
	pub fn new(adapter_name: impl Into<String>, placement_id: impl Into<String>) -> Self {
		Self {
			adapter_name: adapter_name.into(),
			placement_id: placement_id.into(),
			..Self::default()
		}
	}

	pub fn with_server_params_json(mut self, json: impl Into<String>) -> Self {
		self.server_params_json = Some(json.into());
		self
	}

	pub fn with_host(mut self, host: HostContext) -> Self {
		self.host = Some(host);
		self
	}

	pub fn with_local_extra(mut self, key: impl Into<String>, value: Value) -> Self {
		self.local_extras.insert(key.into(), value);
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

	pub fn with_timeout_secs(mut self, seconds: i64) -> Self {
		self.timeout_secs = Some(seconds);
		self
	}
}

/// Builder for [`Mediator`].
pub struct MediatorBuilder {
	config: MediatorConfig,
	registry: Arc<AdapterRegistry>,
	handlers: Vec<Arc<dyn EventHandler>>,
}

impl MediatorBuilder {
	pub fn new() -> Self {
		Self {
			config: MediatorConfig::default(),
			registry: Arc::new(AdapterRegistry::new()),
			handlers: Vec::new(),
		}
	}

	pub fn with_config(mut self, config: MediatorConfig) -> Self {
		self.config = config;
		self
	}

	/// Load configuration from a JSON file.
	pub fn with_config_path(mut self, path: impl AsRef<Path>) -> MediationResult<Self> {
		self.config = MediatorConfig::from_path(path)?;
		Ok(self)
	}

	/// Share an existing registry instead of starting from an empty one.
	pub fn with_registry(mut self, registry: Arc<AdapterRegistry>) -> Self {
		self.registry = registry;
		self
	}

	pub fn register_adapter<F>(self, name: impl Into<String>, factory: F) -> Self
	where
		F: Fn() -> Result<Box<dyn CustomEventInterstitial>, AdapterConstructionError>
			+ Send
			+ Sync
			+ 'static,
	{
		self.registry.register(name, factory);
		self
	}

	pub fn with_ad_host(mut self, host: impl Into<String>) -> Self {
		self.config.ad_host = host.into();
		self
	}

	pub fn with_ad_timeout_secs(mut self, seconds: i64) -> Self {
		self.config.ad_timeout_secs = Some(seconds);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	pub fn disable_metrics(mut self) -> Self {
		self.config.enable_metrics = false;
		self
	}

	pub fn build(self) -> MediationResult<Mediator> {
		Mediator::with_parts(self.config, self.registry, self.handlers)
	}
}

impl Default for MediatorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Entry point for interstitial mediation.
pub struct Mediator {
	config: MediatorConfig,
	registry: Arc<AdapterRegistry>,
	metrics: Option<MetricsCollector>,
	events: Arc<EventDispatcher>,
}

impl Mediator {
	/// Construct a mediator with default configuration and no adapters.
	pub fn new() -> MediationResult<Self> {
		MediatorBuilder::new().build()
	}

	pub fn builder() -> MediatorBuilder {
		MediatorBuilder::new()
	}

	fn with_parts(
		config: MediatorConfig,
		registry: Arc<AdapterRegistry>,
		handlers: Vec<Arc<dyn EventHandler>>,
	) -> MediationResult<Self> {
		config.validate()?;

		let metrics = config.enable_metrics.then(MetricsCollector::new);

		let mut events = EventDispatcher::new();
		events.register_handler(Arc::new(LoggingHandler));
		if let Some(ref collector) = metrics {
			events.register_handler(Arc::new(MetricsHandler::new(collector.clone())));
		}
		for handler in handlers {
			events.register_handler(handler);
		}

		Ok(Self {
			config,
			registry,
			metrics,
			events: Arc::new(events),
		})
	}

	pub fn config(&self) -> &MediatorConfig {
		&self.config
	}

	pub fn registry(&self) -> &Arc<AdapterRegistry> {
		&self.registry
	}

	/// Counters gathered so far, when metrics are enabled.
	pub fn metrics(&self) -> Option<MetricsSnapshot> {
		self.metrics.as_ref().map(MetricsCollector::snapshot)
	}

	/// Resolve the named adapter and prepare a request around it.
	///
	/// When the adapter cannot be resolved, `listener` receives exactly one
	/// `AdapterNotFound` failure and no request is created.
	pub fn request_interstitial(
		&self,
		request: InterstitialRequest,
		listener: Arc<dyn InterstitialAdapterListener>,
	) -> MediationResult<InterstitialAdapter> {
		let adapter = match self.registry.resolve(&request.adapter_name) {
			Ok(adapter) => adapter,
			Err(err) => {
				self.events.dispatch(MediationEvent::ResolutionFailed(ResolutionEvent {
					adapter: request.adapter_name.clone(),
					timestamp: Utc::now(),
				}));
				listener.on_custom_event_interstitial_failed(err.kind());
				return Err(err.into());
			}
		};

		let timeout = request
			.timeout_secs
			.map(|seconds| ad_timeout(Some(seconds)))
			.unwrap_or_else(|| self.config.ad_timeout());
		let context = self.request_context(&request, timeout);

		Ok(InterstitialAdapter::new(
			request.adapter_name,
			adapter,
			context,
			listener,
			self.events.clone(),
		))
	}

	/// URL generator using this mediator's SDK version and location policy.
	pub fn ad_url_generator(&self, collector: ParameterCollector) -> AdUrlGenerator<'static> {
		AdUrlGenerator::new(
			collector
				.with_sdk_version(self.config.sdk_version.clone())
				.with_location_awareness(
					self.config.location_awareness,
					self.config.location_precision,
				),
		)
	}

	/// Build the ad request URL against the configured host.
	pub fn ad_url(&self, generator: &AdUrlGenerator<'_>) -> String {
		generator.generate_url_string(&self.config.ad_host)
	}

	fn request_context(&self, request: &InterstitialRequest, timeout: Duration) -> RequestContext {
		let host = request
			.host
			.clone()
			.unwrap_or_else(|| HostContext::new(request.placement_id.clone()));

		let mut builder = RequestContext::builder(request.placement_id.clone())
			.with_host(host)
			.with_local_extras(request.local_extras.clone())
			.with_server_params_json(request.server_params_json.as_deref().unwrap_or_default())
			.with_timeout(timeout);
		if let Some(location) = request.location {
			builder = builder.with_location(location);
		}
		if let Some(configuration) = request.ad_configuration.clone() {
			builder = builder.with_ad_configuration(configuration);
		}
		builder.build()
	}
}
