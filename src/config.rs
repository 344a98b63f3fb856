use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::dns::enums::DNSResourceType;
use crate::dnssec::constants::DNSSEC_UDP_SIZE;
use crate::dnssec::denial::MAX_NSEC3_ITERATIONS;
use crate::dnssec::{TrustAnchor, TrustAnchorStore};
use crate::error::ConfigError;

const MAX_TIMEOUT_MS: u64 = 300_000;
const MAX_RETRIES: u32 = 10;
const MAX_CLOCK_SKEW_SEC: u32 = 86_400;
const MAX_CONSISTENCY_SERVERS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Recursive resolvers to query, in priority order
    #[serde(deserialize_with = "deserialize_resolvers")]
    pub resolvers: Vec<SocketAddr>,

    /// Per-exchange timeout
    pub timeout_ms: u64,

    /// Extra attempts after the first, rotating through `resolvers`
    pub retries: u32,

    /// Tolerance applied on both ends of a signature validity window
    pub clock_skew_tolerance_sec: u32,

    /// Base delay between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,

    /// Record type fetched at the target to check the final zone's data
    pub probe_type: DNSResourceType,

    /// NSEC3 records above this iteration count make a proof inconclusive
    pub max_nsec3_iterations: u16,

    /// EDNS payload size advertised on UDP queries
    pub udp_payload_size: u16,

    /// Whether truncated UDP answers are retried over TCP
    pub tcp_fallback: bool,

    /// Additional anchors in DS presentation form, e.g.
    /// `"corp.example. 12345 13 2 <hex>"`
    pub trust_anchors: Vec<String>,

    /// Ask each zone's authoritative servers directly whether they agree
    /// on the DNSKEY set
    pub check_consistency: bool,

    /// Upper bound on servers asked per zone by the consistency check
    pub consistency_max_servers: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            resolvers: vec![
                SocketAddr::from(([1, 1, 1, 1], 53)),
                SocketAddr::from(([8, 8, 8, 8], 53)),
                SocketAddr::from(([9, 9, 9, 9], 53)),
            ],
            timeout_ms: 5_000,
            retries: 2,
            clock_skew_tolerance_sec: 300,
            retry_backoff_ms: 100,
            probe_type: DNSResourceType::A,
            max_nsec3_iterations: MAX_NSEC3_ITERATIONS,
            udp_payload_size: DNSSEC_UDP_SIZE,
            tcp_fallback: true,
            trust_anchors: Vec::new(),
            check_consistency: false,
            consistency_max_servers: 5,
        }
    }
}

impl ChainConfig {
    /// Defaults overridden by `DNSSEC_CHAIN_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup; split out so tests need not
    /// touch the process environment
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(resolvers) = lookup("DNSSEC_CHAIN_RESOLVERS") {
            self.resolvers = resolvers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_resolver)
                .collect::<Result<_, _>>()?;
        }

        if let Some(timeout) = lookup("DNSSEC_CHAIN_TIMEOUT_MS") {
            self.timeout_ms = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(timeout.clone()))?;
        }

        if let Some(retries) = lookup("DNSSEC_CHAIN_RETRIES") {
            self.retries = parse_number("retries", &retries)?;
        }

        if let Some(skew) = lookup("DNSSEC_CHAIN_CLOCK_SKEW_SEC") {
            self.clock_skew_tolerance_sec = parse_number("clock_skew_tolerance_sec", &skew)?;
        }

        if let Some(backoff) = lookup("DNSSEC_CHAIN_RETRY_BACKOFF_MS") {
            self.retry_backoff_ms = parse_number("retry_backoff_ms", &backoff)?;
        }

        if let Some(probe) = lookup("DNSSEC_CHAIN_PROBE_TYPE") {
            self.probe_type = probe.parse().map_err(|message| ConfigError::InvalidValue {
                field: "probe_type",
                message,
            })?;
        }

        if let Some(iterations) = lookup("DNSSEC_CHAIN_MAX_NSEC3_ITERATIONS") {
            self.max_nsec3_iterations = parse_number("max_nsec3_iterations", &iterations)?;
        }

        if let Some(payload) = lookup("DNSSEC_CHAIN_UDP_PAYLOAD_SIZE") {
            self.udp_payload_size = parse_number("udp_payload_size", &payload)?;
        }

        if let Some(fallback) = lookup("DNSSEC_CHAIN_TCP_FALLBACK") {
            self.tcp_fallback = parse_bool(&fallback, true);
        }

        if let Some(check) = lookup("DNSSEC_CHAIN_CHECK_CONSISTENCY") {
            self.check_consistency = parse_bool(&check, false);
        }

        if let Some(servers) = lookup("DNSSEC_CHAIN_CONSISTENCY_MAX_SERVERS") {
            self.consistency_max_servers = parse_number("consistency_max_servers", &servers)?;
        }

        if let Some(anchors) = lookup("DNSSEC_CHAIN_TRUST_ANCHORS") {
            self.trust_anchors = anchors
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolvers.is_empty() {
            return Err(ConfigError::InvalidResolver(
                "At least one resolver is required".to_string(),
            ));
        }

        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::InvalidTimeout(format!(
                "{} ms (must be between 1 and {})",
                self.timeout_ms, MAX_TIMEOUT_MS
            )));
        }

        if self.retries > MAX_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "retries",
                message: format!("{} exceeds maximum of {}", self.retries, MAX_RETRIES),
            });
        }

        if self.clock_skew_tolerance_sec > MAX_CLOCK_SKEW_SEC {
            return Err(ConfigError::InvalidValue {
                field: "clock_skew_tolerance_sec",
                message: format!("{} exceeds one day", self.clock_skew_tolerance_sec),
            });
        }

        if self.udp_payload_size < 512 {
            return Err(ConfigError::InvalidValue {
                field: "udp_payload_size",
                message: format!("{} is below the 512 octet minimum", self.udp_payload_size),
            });
        }

        if self.consistency_max_servers == 0
            || self.consistency_max_servers > MAX_CONSISTENCY_SERVERS
        {
            return Err(ConfigError::InvalidValue {
                field: "consistency_max_servers",
                message: format!(
                    "{} (must be between 1 and {})",
                    self.consistency_max_servers, MAX_CONSISTENCY_SERVERS
                ),
            });
        }

        self.parsed_trust_anchors()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    fn parsed_trust_anchors(&self) -> Result<Vec<TrustAnchor>, ConfigError> {
        self.trust_anchors
            .iter()
            .map(|a| a.parse().map_err(ConfigError::from))
            .collect()
    }

    /// Root anchors plus any configured ones
    pub fn trust_anchor_store(&self) -> Result<TrustAnchorStore, ConfigError> {
        let mut store = TrustAnchorStore::new();
        for anchor in self.parsed_trust_anchors()? {
            store.add_anchor(anchor);
        }
        Ok(store)
    }
}

/// Accept `ip`, `ip:port` or `[v6]:port`, defaulting to port 53
pub fn parse_resolver(input: &str) -> Result<SocketAddr, ConfigError> {
    let input = input.trim();
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }
    input
        .parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, 53))
        .map_err(|_| ConfigError::InvalidResolver(input.to_string()))
}

fn deserialize_resolvers<'de, D>(deserializer: D) -> Result<Vec<SocketAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    raw.iter()
        .map(|s| parse_resolver(s).map_err(serde::de::Error::custom))
        .collect()
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        message: format!("'{}' is not a valid number", value),
    })
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}
