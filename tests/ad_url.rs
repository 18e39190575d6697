use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mediation_rs::collector::{
    AdvertisingInfo, ConnectionKind, ConnectivityProvider, DeviceProvider, LocationProvider,
    PhoneType, ProviderError, ProviderResult, SimState, TelephonyProvider,
};
use mediation_rs::{
    AdUrlGenerator, DeviceDescriptor, InstallStatus, InstallStatusCache, Location,
    LocationAwareness, Mediator, MediatorConfig, ParameterCollector,
};

const HOST: &str = "ads.mopub.com";
const HASHED_UDID: &str = "sha%3A88777d47c2950b018b82342e2dc81eb5f50b4c86";

struct FakeDevice {
    device_id: Option<String>,
    advertising: Option<AdvertisingInfo>,
    storage_permission: bool,
    install_status: InstallStatus,
    status_checks: AtomicUsize,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            device_id: Some("android-device-id".into()),
            advertising: None,
            storage_permission: false,
            install_status: InstallStatus::Unknown,
            status_checks: AtomicUsize::new(0),
        }
    }
}

impl DeviceProvider for FakeDevice {
    fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::new("LGE", "Nexus 5", "hammerhead")
    }

    fn device_id(&self) -> ProviderResult<Option<String>> {
        Ok(self.device_id.clone())
    }

    fn advertising_info(&self) -> ProviderResult<Option<AdvertisingInfo>> {
        Ok(self.advertising.clone())
    }

    fn has_external_storage_permission(&self) -> ProviderResult<bool> {
        Ok(self.storage_permission)
    }

    fn companion_app_status(&self) -> InstallStatus {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        self.install_status
    }
}

struct FakeTelephony {
    phone_type: PhoneType,
    sim_state: SimState,
    network_operator: String,
    sim_operator: String,
    country_iso: String,
    operator_name: ProviderResult<String>,
}

impl Default for FakeTelephony {
    fn default() -> Self {
        Self {
            phone_type: PhoneType::Gsm,
            sim_state: SimState::Ready,
            network_operator: String::new(),
            sim_operator: String::new(),
            country_iso: String::new(),
            operator_name: Ok(String::new()),
        }
    }
}

impl TelephonyProvider for FakeTelephony {
    fn phone_type(&self) -> ProviderResult<PhoneType> {
        Ok(self.phone_type)
    }

    fn sim_state(&self) -> ProviderResult<SimState> {
        Ok(self.sim_state)
    }

    fn network_operator(&self) -> ProviderResult<String> {
        Ok(self.network_operator.clone())
    }

    fn sim_operator(&self) -> ProviderResult<String> {
        Ok(self.sim_operator.clone())
    }

    fn network_country_iso(&self) -> ProviderResult<String> {
        Ok(self.country_iso.clone())
    }

    fn network_operator_name(&self) -> ProviderResult<String> {
        self.operator_name.clone()
    }
}

struct FakeConnectivity(ProviderResult<Option<ConnectionKind>>);

impl ConnectivityProvider for FakeConnectivity {
    fn active_network(&self) -> ProviderResult<Option<ConnectionKind>> {
        self.0.clone()
    }
}

struct FakeLocation(ProviderResult<Option<Location>>);

impl LocationProvider for FakeLocation {
    fn last_known_location(&self) -> ProviderResult<Option<Location>> {
        self.0.clone()
    }
}

fn collector(device: FakeDevice, telephony: FakeTelephony) -> ParameterCollector {
    ParameterCollector::new("1.17.0").unwrap()
        .with_device_provider(Arc::new(device))
        .with_telephony_provider(Arc::new(telephony))
        .with_connectivity_provider(Arc::new(FakeConnectivity(Ok(Some(ConnectionKind::Mobile)))))
}

fn expected_minimal() -> String {
    format!(
        "http://ads.mopub.com/m/ad?v=6&nv=1.17.0&dn=LGE%2CNexus%205%2Chammerhead&udid={HASHED_UDID}\
         &z=-0700&o=u&sc_a=1.0&mr=1&ct=3&av=1.0&android_perms_ext_storage=0"
    )
}

#[test]
fn minimal_url() {
    let cache = InstallStatusCache::new();
    let generator = AdUrlGenerator::with_install_status_cache(
        collector(FakeDevice::default(), FakeTelephony::default()),
        &cache,
    );
    assert_eq!(generator.generate_url_string(HOST), expected_minimal());
}

#[test]
fn generation_is_idempotent() {
    let cache = InstallStatusCache::new();
    let generator = AdUrlGenerator::with_install_status_cache(
        collector(FakeDevice::default(), FakeTelephony::default()),
        &cache,
    )
    .with_ad_unit_id("adUnitId")
    .with_keywords("key:value");
    assert_eq!(
        generator.generate_url_string(HOST),
        generator.generate_url_string(HOST)
    );
}

#[test]
fn full_url_in_wire_order() {
    let cache = InstallStatusCache::new();
    let device = FakeDevice {
        storage_permission: true,
        ..FakeDevice::default()
    };
    let telephony = FakeTelephony {
        network_operator: "123456".into(),
        country_iso: "EXPECTED COUNTRY".into(),
        operator_name: Ok("expected carrier".into()),
        ..FakeTelephony::default()
    };
    let url = AdUrlGenerator::with_install_status_cache(collector(device, telephony), &cache)
        .with_ad_unit_id("adUnitId")
        .with_keywords("key:value")
        .with_location(Location::new(20.1, 30.0, 1.23))
        .generate_url_string(HOST);

    assert_eq!(
        url,
        format!(
            "http://ads.mopub.com/m/ad?v=6&id=adUnitId&nv=1.17.0\
             &dn=LGE%2CNexus%205%2Chammerhead&udid={HASHED_UDID}&q=key%3Avalue\
             &ll=20.1%2C30.0&lla=1&z=-0700&o=u&sc_a=1.0&mr=1&mcc=123&mnc=456\
             &iso=expected%20country&cn=expected%20carrier&ct=3&av=1.0\
             &android_perms_ext_storage=1"
        )
    );
}

#[test]
fn operator_code_degrades_with_length() {
    let cases = [
        ("123456", "&mcc=123&mnc=456&"),
        ("12345", "&mcc=123&mnc=45&"),
        ("1234", "&mcc=123&mnc=4&"),
        ("123", "&mcc=123&ct="),
        ("12", "&mcc=12&ct="),
    ];
    for (code, fragment) in cases {
        let cache = InstallStatusCache::new();
        let telephony = FakeTelephony {
            network_operator: code.into(),
            ..FakeTelephony::default()
        };
        let url = AdUrlGenerator::with_install_status_cache(
            collector(FakeDevice::default(), telephony),
            &cache,
        )
        .generate_url_string(HOST);
        assert!(url.contains(fragment), "operator {code}: {url}");
    }
}

#[test]
fn ready_cdma_sim_reports_sim_operator() {
    let url_for = |phone_type, sim_state| {
        let cache = InstallStatusCache::new();
        let telephony = FakeTelephony {
            phone_type,
            sim_state,
            network_operator: "123456".into(),
            sim_operator: "654321".into(),
            ..FakeTelephony::default()
        };
        AdUrlGenerator::with_install_status_cache(
            collector(FakeDevice::default(), telephony),
            &cache,
        )
        .generate_url_string(HOST)
    };

    assert!(url_for(PhoneType::Cdma, SimState::Ready).contains("&mcc=654&mnc=321&"));
    assert!(url_for(PhoneType::Cdma, SimState::Absent).contains("&mcc=123&mnc=456&"));
    assert!(url_for(PhoneType::Gsm, SimState::Ready).contains("&mcc=123&mnc=456&"));
}

#[test]
fn network_type_codes() {
    let cases: [(ProviderResult<Option<ConnectionKind>>, &str); 7] = [
        (Ok(Some(ConnectionKind::Ethernet)), "&ct=1&"),
        (Ok(Some(ConnectionKind::Wifi)), "&ct=2&"),
        (Ok(Some(ConnectionKind::Mobile)), "&ct=3&"),
        (Ok(Some(ConnectionKind::MobileHipri)), "&ct=3&"),
        (Ok(Some(ConnectionKind::Bluetooth)), "&ct=0&"),
        (Ok(None), "&ct=0&"),
        (
            Err(ProviderError::PermissionDenied("ACCESS_NETWORK_STATE")),
            "&ct=0&",
        ),
    ];
    for (network, fragment) in cases {
        let cache = InstallStatusCache::new();
        let collector = ParameterCollector::new("1.17.0").unwrap()
            .with_device_provider(Arc::new(FakeDevice::default()))
            .with_connectivity_provider(Arc::new(FakeConnectivity(network.clone())));
        let url = AdUrlGenerator::with_install_status_cache(collector, &cache)
            .generate_url_string(HOST);
        assert!(url.contains(fragment), "{network:?}: {url}");
    }
}

#[test]
fn denied_carrier_name_is_omitted() {
    let cache = InstallStatusCache::new();
    let telephony = FakeTelephony {
        operator_name: Err(ProviderError::PermissionDenied("READ_PHONE_STATE")),
        ..FakeTelephony::default()
    };
    let url = AdUrlGenerator::with_install_status_cache(
        collector(FakeDevice::default(), telephony),
        &cache,
    )
    .generate_url_string(HOST);
    assert!(!url.contains("&cn="));
    assert_eq!(url, expected_minimal());
}

#[test]
fn advertising_id_and_do_not_track() {
    let url_for = |limit_ad_tracking| {
        let cache = InstallStatusCache::new();
        let device = FakeDevice {
            advertising: Some(AdvertisingInfo {
                id: "38400000-8cf0-11bd-b23e-10b96e40000d".into(),
                limit_ad_tracking,
            }),
            ..FakeDevice::default()
        };
        AdUrlGenerator::with_install_status_cache(
            collector(device, FakeTelephony::default()),
            &cache,
        )
        .generate_url_string(HOST)
    };

    assert!(
        url_for(true)
            .contains("&udid=ifa%3A38400000-8cf0-11bd-b23e-10b96e40000d&dnt=1&z=-0700")
    );
    let tracked = url_for(false);
    assert!(tracked.contains("&udid=ifa%3A38400000-8cf0-11bd-b23e-10b96e40000d&z=-0700"));
    assert!(!tracked.contains("dnt="));
}

#[test]
fn missing_device_id_leaves_udid_empty() {
    let cache = InstallStatusCache::new();
    let device = FakeDevice {
        device_id: None,
        ..FakeDevice::default()
    };
    let url = AdUrlGenerator::with_install_status_cache(
        collector(device, FakeTelephony::default()),
        &cache,
    )
    .generate_url_string(HOST);
    assert!(url.contains("&udid=&z=-0700"));
}

#[test]
fn installed_status_is_cached_for_later_generators() {
    let cache = InstallStatusCache::new();
    let installed = Arc::new(FakeDevice {
        install_status: InstallStatus::Installed,
        ..FakeDevice::default()
    });
    let first = AdUrlGenerator::with_install_status_cache(
        ParameterCollector::new("1.17.0").unwrap().with_device_provider(installed.clone()),
        &cache,
    )
    .generate_url_string(HOST);
    assert!(first.ends_with("&android_perms_ext_storage=0&ts=1"));

    let missing = Arc::new(FakeDevice {
        install_status: InstallStatus::NotInstalled,
        ..FakeDevice::default()
    });
    let second = AdUrlGenerator::with_install_status_cache(
        ParameterCollector::new("1.17.0").unwrap().with_device_provider(missing.clone()),
        &cache,
    )
    .generate_url_string(HOST);
    assert!(second.ends_with("&ts=1"));
    assert_eq!(installed.status_checks.load(Ordering::SeqCst), 1);
    assert_eq!(missing.status_checks.load(Ordering::SeqCst), 0);
}

#[test]
fn not_installed_is_cached_without_flag() {
    let cache = InstallStatusCache::new();
    let missing = Arc::new(FakeDevice {
        install_status: InstallStatus::NotInstalled,
        ..FakeDevice::default()
    });
    let generator = AdUrlGenerator::with_install_status_cache(
        ParameterCollector::new("1.17.0").unwrap().with_device_provider(missing.clone()),
        &cache,
    );
    assert!(!generator.generate_url_string(HOST).contains("ts="));
    assert!(!generator.generate_url_string(HOST).contains("ts="));
    assert_eq!(missing.status_checks.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(), Some(InstallStatus::NotInstalled));
}

#[test]
fn unknown_status_is_checked_again() {
    let cache = InstallStatusCache::new();
    let unknown = Arc::new(FakeDevice::default());
    let generator = AdUrlGenerator::with_install_status_cache(
        ParameterCollector::new("1.17.0").unwrap().with_device_provider(unknown.clone()),
        &cache,
    );
    assert!(!generator.generate_url_string(HOST).contains("ts="));
    assert!(!generator.generate_url_string(HOST).contains("ts="));
    assert_eq!(unknown.status_checks.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get(), None);
}

#[test]
fn location_provider_and_awareness() {
    let provider = Arc::new(FakeLocation(Ok(Some(Location::new(
        37.774_929_8,
        -122.419_416,
        12.0,
    )))));
    let base = ParameterCollector::new("1.17.0").unwrap()
        .with_device_provider(Arc::new(FakeDevice::default()))
        .with_location_provider(provider);

    let cache = InstallStatusCache::new();
    let normal = AdUrlGenerator::with_install_status_cache(base.clone(), &cache)
        .generate_url_string(HOST);
    assert!(normal.contains("&ll=37.7749298%2C-122.419416&lla=12&"));

    let truncated = AdUrlGenerator::with_install_status_cache(
        base.clone()
            .with_location_awareness(LocationAwareness::Truncated, 2),
        &cache,
    )
    .generate_url_string(HOST);
    assert!(truncated.contains("&ll=37.77%2C-122.42&lla=12&"));

    let explicit = AdUrlGenerator::with_install_status_cache(base.clone(), &cache)
        .with_location(Location::new(20.1, 30.0, 1.5))
        .generate_url_string(HOST);
    assert!(explicit.contains("&ll=20.1%2C30.0&lla=2&"));

    let disabled = AdUrlGenerator::with_install_status_cache(
        base.with_location_awareness(LocationAwareness::Disabled, 6),
        &cache,
    )
    .with_location(Location::new(20.1, 30.0, 1.5))
    .generate_url_string(HOST);
    assert!(!disabled.contains("ll="));
}

#[test]
fn denied_location_is_skipped() {
    let cache = InstallStatusCache::new();
    let collector = ParameterCollector::new("1.17.0").unwrap()
        .with_device_provider(Arc::new(FakeDevice::default()))
        .with_location_provider(Arc::new(FakeLocation(Err(
            ProviderError::PermissionDenied("ACCESS_FINE_LOCATION"),
        ))));
    let url = AdUrlGenerator::with_install_status_cache(collector, &cache).generate_url_string(HOST);
    assert!(!url.contains("ll="));
    assert!(!url.contains("lla="));
}

#[test]
fn mediator_applies_config_to_generators() {
    let config = MediatorConfig {
        ad_host: "ads.example.com".into(),
        sdk_version: "2.0.0".into(),
        location_awareness: LocationAwareness::Disabled,
        ..MediatorConfig::default()
    };
    let mediator = Mediator::builder().with_config(config).build().unwrap();
    let generator = mediator
        .ad_url_generator(ParameterCollector::new("ignored").unwrap())
        .with_location(Location::new(20.1, 30.0, 1.0));

    let url = mediator.ad_url(&generator);
    assert!(url.starts_with("http://ads.example.com/m/ad?v=6&nv=2.0.0&"));
    assert!(!url.contains("ll="));

    let parsed = generator.generate_url("ads.example.com").unwrap();
    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    assert_eq!(pairs[0], ("v".to_string(), "6".to_string()));
    assert!(pairs.contains(&("dn".to_string(), ",,".to_string())));
    assert!(pairs.contains(&("udid".to_string(), String::new())));
}
