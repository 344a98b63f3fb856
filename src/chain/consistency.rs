//! DNSKEY agreement across a zone's authoritative servers.
//!
//! Each server is asked once, directly, for the zone's DNSKEY set. Key tags
//! are compared against the first server that answered.

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::zone::fetch_with_retry;
use crate::config::ChainConfig;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::DomainName;
use crate::dnssec::SigningKey;
use crate::error::FetchError;
use crate::fetcher::{FetchRequest, FetchResponse, QueryOutcome, RecordSource};

/// Port used for direct queries to authoritative servers
const AUTHORITATIVE_PORT: u16 = 53;

/// What one authoritative server returned for the zone's DNSKEY set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub server: DomainName,
    pub address: SocketAddr,
    pub responded: bool,
    pub key_tags: Vec<u16>,
    pub has_rrsig: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub zone: DomainName,
    pub nameservers_queried: usize,
    pub nameservers_responded: usize,
    pub consistent: bool,
    pub issues: Vec<String>,
    pub servers: Vec<ServerResponse>,
}

impl ConsistencyReport {
    fn new(zone: DomainName) -> Self {
        Self {
            zone,
            nameservers_queried: 0,
            nameservers_responded: 0,
            consistent: true,
            issues: Vec::new(),
            servers: Vec::new(),
        }
    }

    pub fn status_label(&self) -> String {
        if self.nameservers_queried == 0 {
            "Not checked".to_string()
        } else if self.nameservers_responded == 0 {
            "No responses".to_string()
        } else if self.consistent {
            format!(
                "Consistent ({}/{})",
                self.nameservers_responded, self.nameservers_queried
            )
        } else {
            format!("INCONSISTENT ({} issues)", self.issues.len())
        }
    }
}

pub struct ConsistencyChecker<'a> {
    config: &'a ChainConfig,
    source: &'a dyn RecordSource,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(config: &'a ChainConfig, source: &'a dyn RecordSource) -> Self {
        Self { config, source }
    }

    pub async fn check(&self, zone: &DomainName) -> ConsistencyReport {
        let mut report = ConsistencyReport::new(zone.clone());

        let mut servers = self.authoritative_servers(zone).await;
        if servers.is_empty() {
            report
                .issues
                .push("Could not find authoritative nameservers".to_string());
            return report;
        }
        servers.truncate(self.config.consistency_max_servers);
        report.nameservers_queried = servers.len();

        for (server, address) in servers {
            let response = self.query_direct(zone, server, address).await;
            if response.responded {
                report.nameservers_responded += 1;
            }
            report.servers.push(response);
        }

        let mut responders = report.servers.iter().filter(|s| s.responded);
        if let Some(reference) = responders.next() {
            let expected: BTreeSet<u16> = reference.key_tags.iter().copied().collect();
            for other in responders {
                let tags: BTreeSet<u16> = other.key_tags.iter().copied().collect();
                let missing: Vec<u16> = expected.difference(&tags).copied().collect();
                let extra: Vec<u16> = tags.difference(&expected).copied().collect();
                if !missing.is_empty() {
                    report.consistent = false;
                    report
                        .issues
                        .push(format!("{} missing keys: {}", other.server, tag_list(&missing)));
                }
                if !extra.is_empty() {
                    report.consistent = false;
                    report
                        .issues
                        .push(format!("{} has extra keys: {}", other.server, tag_list(&extra)));
                }
            }
        }

        for server in &report.servers {
            if !server.responded {
                report.issues.push(format!(
                    "{} did not respond: {}",
                    server.address,
                    server.error.as_deref().unwrap_or("unknown")
                ));
            }
        }
        for server in &report.servers {
            if server.responded && !server.has_rrsig && !server.key_tags.is_empty() {
                report.consistent = false;
                report
                    .issues
                    .push(format!("{} returned DNSKEY without RRSIG", server.server));
            }
        }

        if report.consistent {
            debug!("{}: {}", zone, report.status_label());
        } else {
            warn!("{}: {}: {}", zone, report.status_label(), report.issues.join("; "));
        }
        report
    }

    /// NS names of `zone` with their IPv4 addresses, in answer order
    async fn authoritative_servers(&self, zone: &DomainName) -> Vec<(DomainName, SocketAddr)> {
        let request = FetchRequest::new(zone.clone(), DNSResourceType::NS).in_zone(zone);
        let response = fetch_with_retry(self.config, self.source, &request).await;
        let Some(answer) = response.answer.filter(|a| a.rtype == DNSResourceType::NS) else {
            debug!("{}: no NS answer ({})", zone, response.outcome);
            return Vec::new();
        };

        let mut servers = Vec::new();
        for rdata in &answer.rdata {
            let Ok((ns, _)) = DomainName::decode(rdata, 0) else {
                continue;
            };
            let request = FetchRequest::new(ns.clone(), DNSResourceType::A);
            let response = fetch_with_retry(self.config, self.source, &request).await;
            let Some(addresses) = response.answer.filter(|a| a.rtype == DNSResourceType::A) else {
                debug!("{}: no address for {}", zone, ns);
                continue;
            };
            for octets in &addresses.rdata {
                let Ok(octets) = <[u8; 4]>::try_from(octets.as_slice()) else {
                    continue;
                };
                let address = SocketAddr::new(Ipv4Addr::from(octets).into(), AUTHORITATIVE_PORT);
                if !servers.iter().any(|(_, a)| *a == address) {
                    servers.push((ns.clone(), address));
                }
            }
        }
        servers
    }

    async fn query_direct(
        &self,
        zone: &DomainName,
        server: DomainName,
        address: SocketAddr,
    ) -> ServerResponse {
        let request = FetchRequest::new(zone.clone(), DNSResourceType::DNSKEY).in_zone(zone);
        let started = Instant::now();
        let response = match timeout(self.config.timeout(), self.source.fetch(&request, address)).await {
            Ok(response) => response,
            Err(_) => FetchResponse::failure(
                QueryOutcome::Timeout,
                FetchError::Timeout(self.config.timeout_ms),
            ),
        };
        let response_time_ms = started.elapsed().as_millis() as u64;

        let responded = !matches!(
            response.outcome,
            QueryOutcome::Timeout | QueryOutcome::NetworkError
        );
        let key_tags = response
            .answer
            .as_ref()
            .filter(|a| a.rtype == DNSResourceType::DNSKEY)
            .map(|a| SigningKey::from_rrset(a).iter().map(|k| k.key_tag).collect())
            .unwrap_or_default();

        ServerResponse {
            server,
            address,
            responded,
            key_tags,
            has_rrsig: !response.signatures.is_empty(),
            error: response.error.map(|e| e.to_string()),
            response_time_ms,
        }
    }
}

fn tag_list(tags: &[u16]) -> String {
    tags.iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
