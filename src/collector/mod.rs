//! Device, network and locale signal collection.
//!
//! The collector reads from narrow provider traits implemented by the host
//! platform. Each read is independent: a denied permission or missing
//! service blanks that one field and collection carries on.

mod generator;
mod install_status;

pub use generator::AdUrlGenerator;
pub use install_status::InstallStatusCache;

use std::sync::Arc;

use thiserror::Error;

use crate::ad_url::{
    DeviceDescriptor, DeviceIdentifier, InstallStatus, Location, NetworkType, UrlParameters,
    split_operator_code,
};
use crate::config::{DEFAULT_LOCATION_PRECISION, LocationAwareness};

/// Why a platform signal could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectorError {
    #[error("sdk version must not be empty")]
    EmptySdkVersion,
}

/// Platform connectivity types, numbered as the platform reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Mobile,
    Wifi,
    MobileMms,
    MobileSupl,
    MobileDun,
    MobileHipri,
    Wimax,
    Bluetooth,
    Dummy,
    Ethernet,
    Other(i32),
}

impl ConnectionKind {
    pub fn from_platform_code(code: i32) -> Self {
        match code {
            0 => ConnectionKind::Mobile,
            1 => ConnectionKind::Wifi,
            2 => ConnectionKind::MobileMms,
            3 => ConnectionKind::MobileSupl,
            4 => ConnectionKind::MobileDun,
            5 => ConnectionKind::MobileHipri,
            6 => ConnectionKind::Wimax,
            7 => ConnectionKind::Bluetooth,
            8 => ConnectionKind::Dummy,
            9 => ConnectionKind::Ethernet,
            other => ConnectionKind::Other(other),
        }
    }
}

impl From<ConnectionKind> for NetworkType {
    fn from(kind: ConnectionKind) -> Self {
        match kind {
            ConnectionKind::Ethernet => NetworkType::Ethernet,
            ConnectionKind::Wifi => NetworkType::Wifi,
            ConnectionKind::Mobile
            | ConnectionKind::MobileMms
            | ConnectionKind::MobileSupl
            | ConnectionKind::MobileDun
            | ConnectionKind::MobileHipri => NetworkType::Mobile,
            _ => NetworkType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneType {
    None,
    Gsm,
    Cdma,
    Sip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Unknown,
    Absent,
    PinRequired,
    PukRequired,
    NetworkLocked,
    Ready,
}

/// Advertising identifier plus the user's tracking preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingInfo {
    pub id: String,
    pub limit_ad_tracking: bool,
}

pub trait LocationProvider: Send + Sync {
    fn last_known_location(&self) -> ProviderResult<Option<Location>>;
}

pub trait ConnectivityProvider: Send + Sync {
    /// `Ok(None)` when there is no active network.
    fn active_network(&self) -> ProviderResult<Option<ConnectionKind>>;
}

pub trait TelephonyProvider: Send + Sync {
    fn phone_type(&self) -> ProviderResult<PhoneType>;
    fn sim_state(&self) -> ProviderResult<SimState>;
    fn network_operator(&self) -> ProviderResult<String>;
    fn sim_operator(&self) -> ProviderResult<String>;
    fn network_country_iso(&self) -> ProviderResult<String>;
    fn network_operator_name(&self) -> ProviderResult<String>;
}

pub trait DeviceProvider: Send + Sync {
    fn descriptor(&self) -> DeviceDescriptor;

    fn device_id(&self) -> ProviderResult<Option<String>>;

    fn advertising_info(&self) -> ProviderResult<Option<AdvertisingInfo>> {
        Ok(None)
    }

    fn has_external_storage_permission(&self) -> ProviderResult<bool>;

    /// Check whether the companion app is installed.
    fn companion_app_status(&self) -> InstallStatus {
        InstallStatus::Unknown
    }
}

/// Per-request values chosen by the caller rather than the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestTargeting {
    pub ad_unit_id: Option<String>,
    pub keywords: Option<String>,
    /// Overrides the provider's last known location.
    pub location: Option<Location>,
}

/// Gathers [`UrlParameters`] from the platform providers.
#[derive(Clone)]
pub struct ParameterCollector {
    sdk_version: String,
    location_awareness: LocationAwareness,
    location_precision: u32,
    location: Option<Arc<dyn LocationProvider>>,
    connectivity: Option<Arc<dyn ConnectivityProvider>>,
    telephony: Option<Arc<dyn TelephonyProvider>>,
    device: Option<Arc<dyn DeviceProvider>>,
}

impl ParameterCollector {
    /// The SDK version is a fixed URL field, so it must not be blank.
    pub fn new(sdk_version: impl Into<String>) -> Result<Self, CollectorError> {
        let sdk_version = sdk_version.into();
        if sdk_version.trim().is_empty() {
            return Err(CollectorError::EmptySdkVersion);
        }

        Ok(Self {
            sdk_version,
            location_awareness: LocationAwareness::Normal,
            location_precision: DEFAULT_LOCATION_PRECISION,
            location: None,
            connectivity: None,
            telephony: None,
            device: None,
        })
    }

    /// Callers pass an already validated version.
    pub(crate) fn with_sdk_version(mut self, sdk_version: impl Into<String>) -> Self {
        self.sdk_version = sdk_version.into();
        self
    }

    pub fn with_location_awareness(mut self, awareness: LocationAwareness, precision: u32) -> Self {
        self.location_awareness = awareness;
        self.location_precision = precision;
        self
    }

    pub fn with_location_provider(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.location = Some(provider);
        self
    }

    pub fn with_connectivity_provider(mut self, provider: Arc<dyn ConnectivityProvider>) -> Self {
        self.connectivity = Some(provider);
        self
    }

    pub fn with_telephony_provider(mut self, provider: Arc<dyn TelephonyProvider>) -> Self {
        self.telephony = Some(provider);
        self
    }

    pub fn with_device_provider(mut self, provider: Arc<dyn DeviceProvider>) -> Self {
        self.device = Some(provider);
        self
    }

    /// Collect everything except the install status, which is left `Unknown`.
    pub fn collect(&self, targeting: &RequestTargeting) -> UrlParameters {
        let (udid, do_not_track) = self.identifier();
        let (mcc, mnc) = self.operator_codes();

        UrlParameters {
            ad_unit_id: targeting.ad_unit_id.clone(),
            sdk_version: self.sdk_version.clone(),
            device: self
                .device
                .as_ref()
                .map(|device| device.descriptor())
                .unwrap_or_default(),
            udid,
            do_not_track,
            keywords: targeting.keywords.clone(),
            location: self.location(targeting.location),
            mcc,
            mnc,
            country_iso: self
                .telephony_read("network country iso", |t| t.network_country_iso())
                .map(|iso| iso.to_lowercase()),
            carrier_name: self.telephony_read("network operator name", |t| t.network_operator_name()),
            network_type: self.network_type(),
            external_storage_permission: self.external_storage_permission(),
            install_status: InstallStatus::Unknown,
        }
    }

    /// Ask the device provider whether the companion app is installed.
    pub fn companion_app_status(&self) -> InstallStatus {
        self.device
            .as_ref()
            .map(|device| device.companion_app_status())
            .unwrap_or_default()
    }

    fn location(&self, explicit: Option<Location>) -> Option<Location> {
        if self.location_awareness == LocationAwareness::Disabled {
            return None;
        }

        let location = explicit.or_else(|| {
            let provider = self.location.as_ref()?;
            degrade("last known location", provider.last_known_location()).flatten()
        })?;

        match self.location_awareness {
            LocationAwareness::Truncated => Some(location.truncated(self.location_precision)),
            _ => Some(location),
        }
    }

    fn identifier(&self) -> (DeviceIdentifier, bool) {
        let Some(device) = self.device.as_ref() else {
            return (DeviceIdentifier::Absent, false);
        };

        if let Some(info) = degrade("advertising info", device.advertising_info()).flatten() {
            return (DeviceIdentifier::advertising(info.id), info.limit_ad_tracking);
        }

        let identifier = degrade("device id", device.device_id())
            .flatten()
            .filter(|id| !id.is_empty())
            .map(|id| DeviceIdentifier::from_device_id(&id))
            .unwrap_or_default();
        (identifier, false)
    }

    fn operator_codes(&self) -> (Option<String>, Option<String>) {
        let Some(telephony) = self.telephony.as_ref() else {
            return (None, None);
        };

        let sim_ready = degrade("phone type", telephony.phone_type()) == Some(PhoneType::Cdma)
            && degrade("sim state", telephony.sim_state()) == Some(SimState::Ready);
        let operator = if sim_ready {
            degrade("sim operator", telephony.sim_operator())
        } else {
            degrade("network operator", telephony.network_operator())
        };

        match operator {
            Some(code) => {
                let (mcc, mnc) = split_operator_code(&code);
                (non_empty(mcc), non_empty(mnc))
            }
            None => (None, None),
        }
    }

    fn network_type(&self) -> NetworkType {
        self.connectivity
            .as_ref()
            .and_then(|provider| degrade("active network", provider.active_network()))
            .flatten()
            .map(NetworkType::from)
            .unwrap_or_default()
    }

    fn external_storage_permission(&self) -> bool {
        self.device
            .as_ref()
            .and_then(|device| {
                degrade(
                    "external storage permission",
                    device.has_external_storage_permission(),
                )
            })
            .unwrap_or(false)
    }

    fn telephony_read<F>(&self, signal: &str, read: F) -> Option<String>
    where
        F: FnOnce(&dyn TelephonyProvider) -> ProviderResult<String>,
    {
        let telephony = self.telephony.as_deref()?;
        degrade(signal, read(telephony)).and_then(non_empty)
    }
}

fn degrade<T>(signal: &str, result: ProviderResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("skipping {signal}: {err}");
            None
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}
