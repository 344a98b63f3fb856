use std::io::Write;
use std::net::SocketAddr;

use dnssec_chain::dns::enums::DNSResourceType;
use dnssec_chain::dns::name::DomainName;
use dnssec_chain::dnssec::TrustAnchorError;
use dnssec_chain::{ChainConfig, ConfigError};
use tempfile::NamedTempFile;

const CORP_ANCHOR: &str = "corp.example. 12345 13 2 \
    E2D3C916F6DEEAC73294E8268FB5885044A833FC5459588F4A9184CFC41A5766";

#[test]
fn test_load_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
resolvers = ["192.0.2.1", "[2001:db8::53]:5353"]
timeout_ms = 2500
retries = 3
probe_type = "AAAA"
tcp_fallback = false
trust_anchors = ["{}"]
"#,
        CORP_ANCHOR
    )
    .unwrap();

    let config = ChainConfig::from_file(file.path()).unwrap();
    assert_eq!(
        config.resolvers,
        vec![
            "192.0.2.1:53".parse::<SocketAddr>().unwrap(),
            "[2001:db8::53]:5353".parse().unwrap(),
        ]
    );
    assert_eq!(config.timeout_ms, 2500);
    assert_eq!(config.retries, 3);
    assert_eq!(config.probe_type, DNSResourceType::AAAA);
    assert!(!config.tcp_fallback);

    // unspecified fields keep their defaults
    let defaults = ChainConfig::default();
    assert_eq!(config.clock_skew_tolerance_sec, defaults.clock_skew_tolerance_sec);
    assert_eq!(config.udp_payload_size, defaults.udp_payload_size);

    let store = config.trust_anchor_store().unwrap();
    let corp = DomainName::parse("corp.example").unwrap();
    assert_eq!(store.anchors_for(&corp).len(), 1);
    assert_eq!(store.anchors_for(&corp)[0].key_tag, 12345);
    assert!(!store.anchors_for(&DomainName::root()).is_empty());
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        ChainConfig::from_file(&missing),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn test_invalid_documents_are_rejected() {
    assert!(matches!(
        ChainConfig::from_toml_str("timeout_ms = \"soon\""),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        ChainConfig::from_toml_str("resolvers = [\"resolver.example\"]"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        ChainConfig::from_toml_str("resolvers = []"),
        Err(ConfigError::InvalidResolver(_))
    ));
    assert!(matches!(
        ChainConfig::from_toml_str("retries = 50"),
        Err(ConfigError::InvalidValue { field: "retries", .. })
    ));
    assert!(matches!(
        ChainConfig::from_toml_str("udp_payload_size = 256"),
        Err(ConfigError::InvalidValue {
            field: "udp_payload_size",
            ..
        })
    ));
    assert!(matches!(
        ChainConfig::from_toml_str("trust_anchors = [\"corp.example. 1 2\"]"),
        Err(ConfigError::InvalidTrustAnchor(TrustAnchorError::TooFewFields(_)))
    ));
    assert!(matches!(
        ChainConfig::from_toml_str("trust_anchors = [\"corp.example. DNSKEY 257 3 15\"]"),
        Err(ConfigError::InvalidTrustAnchor(
            TrustAnchorError::MissingKeyMaterial(_)
        ))
    ));
}

#[test]
fn test_empty_document_is_the_default() {
    assert_eq!(ChainConfig::from_toml_str("").unwrap(), ChainConfig::default());
}

#[test]
fn test_file_then_env_layering() {
    let mut config = ChainConfig::from_toml_str("timeout_ms = 900\nretries = 1").unwrap();
    config
        .apply_env(|key| match key {
            "DNSSEC_CHAIN_RETRIES" => Some("5".to_string()),
            "DNSSEC_CHAIN_TRUST_ANCHORS" => Some(format!("{};", CORP_ANCHOR)),
            _ => None,
        })
        .unwrap();
    config.validate().unwrap();

    assert_eq!(config.timeout_ms, 900);
    assert_eq!(config.retries, 5);
    assert_eq!(config.trust_anchors, vec![CORP_ANCHOR.to_string()]);
}

#[test]
fn test_config_serializes_back_to_toml() {
    let config = ChainConfig {
        retries: 4,
        ..Default::default()
    };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(ChainConfig::from_toml_str(&text).unwrap(), config);
}
