//! Settings and configuration module
//!
//! Provides the mediator configuration with:
//! - Serde defaults for every field
//! - JSON loading from strings or files
//! - Ad timeout resolution

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout applied to adapter loads when none (or a negative one) is configured.
pub const DEFAULT_INTERSTITIAL_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Host used when building ad request URLs.
pub const DEFAULT_AD_HOST: &str = "ads.mopub.com";

/// Decimal places kept when location awareness is [`LocationAwareness::Truncated`].
pub const DEFAULT_LOCATION_PRECISION: u32 = 6;

const MAX_LOCATION_PRECISION: u32 = 15;

/// How much of the device location may leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationAwareness {
    #[default]
    Normal,
    Truncated,
    Disabled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Mediator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    pub ad_host: String,
    /// Adapter load timeout in seconds; unset or negative falls back to 30 s.
    pub ad_timeout_secs: Option<i64>,
    pub sdk_version: String,
    pub location_awareness: LocationAwareness,
    pub location_precision: u32,
    pub enable_metrics: bool,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            ad_host: DEFAULT_AD_HOST.to_string(),
            ad_timeout_secs: None,
            sdk_version: crate::VERSION.to_string(),
            location_awareness: LocationAwareness::Normal,
            location_precision: DEFAULT_LOCATION_PRECISION,
            enable_metrics: true,
        }
    }
}

impl MediatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn ad_timeout(&self) -> Duration {
        ad_timeout(self.ad_timeout_secs)
    }

    /// Reject values that would produce unusable request URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ad_host.trim().is_empty() || self.ad_host.contains(['/', '?', '#', ' ']) {
            return Err(ConfigError::InvalidValue {
                field: "ad_host",
                reason: format!("{:?} is not a bare host name", self.ad_host),
            });
        }
        if self.sdk_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sdk_version",
                reason: "must not be empty".to_string(),
            });
        }
        if self.location_precision > MAX_LOCATION_PRECISION {
            return Err(ConfigError::InvalidValue {
                field: "location_precision",
                reason: format!("must be at most {MAX_LOCATION_PRECISION}"),
            });
        }
        Ok(())
    }
}

/// Convert a configured timeout in seconds into the load timeout.
///
/// Zero disables the timer entirely.
pub fn ad_timeout(seconds: Option<i64>) -> Duration {
    match seconds {
        Some(secs) if secs >= 0 => Duration::from_millis((secs as u64).saturating_mul(1000)),
        _ => DEFAULT_INTERSTITIAL_TIMEOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_defaults_when_unset_or_negative() {
        assert_eq!(ad_timeout(None), DEFAULT_INTERSTITIAL_TIMEOUT);
        assert_eq!(ad_timeout(Some(-1)), DEFAULT_INTERSTITIAL_TIMEOUT);
        assert_eq!(ad_timeout(Some(0)), Duration::ZERO);
        assert_eq!(ad_timeout(Some(12)), Duration::from_millis(12_000));
    }

    #[test]
    fn loads_partial_json() {
        let config = MediatorConfig::from_json_str(
            r#"{"ad_timeout_secs": 5, "location_awareness": "truncated"}"#,
        )
        .unwrap();
        assert_eq!(config.ad_timeout(), Duration::from_secs(5));
        assert_eq!(config.location_awareness, LocationAwareness::Truncated);
        assert_eq!(config.ad_host, DEFAULT_AD_HOST);
        assert!(config.enable_metrics);
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(MediatorConfig::default().validate().is_ok());

        let config = MediatorConfig {
            ad_host: "ads.example.com/m".into(),
            ..MediatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "ad_host", .. })
        ));

        let config = MediatorConfig {
            location_precision: 40,
            ..MediatorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MediatorConfig {
            sdk_version: String::new(),
            ..MediatorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "sdk_version", .. })
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            MediatorConfig::from_json_str("{"),
            Err(ConfigError::InvalidJson(_))
        ));
    }
}
