//! Ad request URL serialization.
//!
//! [`build_ad_url`] turns a flat [`UrlParameters`] set into the query string
//! the ad server expects. Field order is fixed, optional fields vanish
//! entirely when empty, and the output depends on nothing but the inputs.

mod carrier;
mod encoding;

pub use carrier::split_operator_code;
pub use encoding::{encode_component, format_coordinate, round_accuracy, round_half_down};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha1::{Digest, Sha1};

/// Path of the ad handler on the ad server.
pub const AD_HANDLER_PATH: &str = "/m/ad";

const API_VERSION: &str = "6";
const TIMEZONE_OFFSET: &str = "-0700";
const ORIENTATION: &str = "u";
const SCALE_FACTOR: &str = "1.0";
const MULTI_AD_REQUEST: &str = "1";
const APP_VERSION: &str = "1.0";

/// A device position with horizontal accuracy in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, accuracy: f32) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
        }
    }

    /// Coarsen latitude/longitude to `precision` decimal places.
    pub fn truncated(self, precision: u32) -> Self {
        Self {
            latitude: round_half_down(self.latitude, precision),
            longitude: round_half_down(self.longitude, precision),
            accuracy: self.accuracy,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "latitude": self.latitude,
            "longitude": self.longitude,
            "accuracy": self.accuracy,
        })
    }
}

/// Manufacturer, model and product strings of the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub manufacturer: String,
    pub model: String,
    pub product: String,
}

impl DeviceDescriptor {
    pub fn new(
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            product: product.into(),
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.manufacturer, self.model, self.product)
    }
}

/// Identifier reported in the `udid` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceIdentifier {
    /// Resettable advertising identifier, sent as-is.
    Advertising(String),
    /// Lowercase hex SHA-1 digest of the platform device id.
    Hashed(String),
    #[default]
    Absent,
}

impl DeviceIdentifier {
    pub fn advertising(id: impl Into<String>) -> Self {
        DeviceIdentifier::Advertising(id.into())
    }

    /// Hash a raw platform device id.
    pub fn from_device_id(raw: &str) -> Self {
        DeviceIdentifier::Hashed(hex::encode(Sha1::digest(raw.as_bytes())))
    }

    /// Unencoded `udid` value; empty when absent.
    pub fn udid(&self) -> String {
        match self {
            DeviceIdentifier::Advertising(id) => format!("ifa:{id}"),
            DeviceIdentifier::Hashed(digest) => format!("sha:{digest}"),
            DeviceIdentifier::Absent => String::new(),
        }
    }
}

/// Connection class reported in the `ct` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NetworkType {
    #[default]
    Unknown,
    Ethernet,
    Wifi,
    Mobile,
}

impl NetworkType {
    pub fn code(self) -> u8 {
        match self {
            NetworkType::Unknown => 0,
            NetworkType::Ethernet => 1,
            NetworkType::Wifi => 2,
            NetworkType::Mobile => 3,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Whether the companion app is present on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InstallStatus {
    #[default]
    Unknown,
    NotInstalled,
    Installed,
}

/// Every value that can appear in an ad request URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlParameters {
    pub ad_unit_id: Option<String>,
    pub sdk_version: String,
    pub device: DeviceDescriptor,
    pub udid: DeviceIdentifier,
    pub do_not_track: bool,
    pub keywords: Option<String>,
    pub location: Option<Location>,
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub country_iso: Option<String>,
    pub carrier_name: Option<String>,
    pub network_type: NetworkType,
    pub external_storage_permission: bool,
    pub install_status: InstallStatus,
}

/// Accumulates `key=value` pairs behind a base URL.
struct QueryWriter {
    url: String,
    has_query: bool,
}

impl QueryWriter {
    fn new(base: String) -> Self {
        Self {
            url: base,
            has_query: false,
        }
    }

    fn param(&mut self, key: &str, value: &str) {
        self.url.push(if self.has_query { '&' } else { '?' });
        self.has_query = true;
        self.url.push_str(key);
        self.url.push('=');
        self.url.push_str(&encode_component(value));
    }

    fn param_if_present(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value.filter(|value| !value.is_empty()) {
            self.param(key, value);
        }
    }

    fn finish(self) -> String {
        self.url
    }
}

/// Serialize `params` into the ad request URL for `host`.
pub fn build_ad_url(host: &str, params: &UrlParameters) -> String {
    let mut query = QueryWriter::new(format!("http://{host}{AD_HANDLER_PATH}"));

    query.param("v", API_VERSION);
    query.param_if_present("id", params.ad_unit_id.as_deref());
    query.param("nv", &params.sdk_version);
    query.param("dn", &params.device.to_string());
    query.param("udid", &params.udid.udid());
    if params.do_not_track {
        query.param("dnt", "1");
    }
    query.param_if_present("q", params.keywords.as_deref());
    if let Some(location) = params.location {
        let lat_lon = format!(
            "{},{}",
            format_coordinate(location.latitude),
            format_coordinate(location.longitude)
        );
        query.param("ll", &lat_lon);
        query.param("lla", &round_accuracy(location.accuracy).to_string());
    }
    query.param("z", TIMEZONE_OFFSET);
    query.param("o", ORIENTATION);
    query.param("sc_a", SCALE_FACTOR);
    query.param("mr", MULTI_AD_REQUEST);
    query.param_if_present("mcc", params.mcc.as_deref());
    query.param_if_present("mnc", params.mnc.as_deref());
    query.param_if_present("iso", params.country_iso.as_deref());
    query.param_if_present("cn", params.carrier_name.as_deref());
    query.param("ct", &params.network_type.to_string());
    query.param("av", APP_VERSION);
    query.param(
        "android_perms_ext_storage",
        if params.external_storage_permission { "1" } else { "0" },
    );
    if params.install_status == InstallStatus::Installed {
        query.param("ts", "1");
    }

    query.finish()
}
