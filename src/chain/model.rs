use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::consistency::ConsistencyReport;
use crate::dns::name::DomainName;
use crate::dnssec::denial::DenialOutcome;
use crate::dnssec::records::{DigestInfo, KeyInfo};
use crate::dnssec::verifier::SignatureTiming;

/// Trust state of a zone or a whole chain.
///
/// Variants are declared in ascending precedence, so `max` over a set of
/// statuses gives the combined status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Secure,
    Insecure,
    Indeterminate,
    Bogus,
}

impl TrustStatus {
    /// Marker used by the text report
    pub fn symbol(&self) -> &'static str {
        match self {
            TrustStatus::Secure => "✓",
            TrustStatus::Insecure => "○",
            TrustStatus::Bogus => "✗",
            TrustStatus::Indeterminate => "?",
        }
    }

    pub fn combine(self, other: TrustStatus) -> TrustStatus {
        self.max(other)
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustStatus::Secure => "SECURE",
            TrustStatus::Insecure => "INSECURE",
            TrustStatus::Bogus => "BOGUS",
            TrustStatus::Indeterminate => "INDETERMINATE",
        };
        f.write_str(name)
    }
}

/// What a zone's status rests on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// A configured anchor digest matched a key that signs the DNSKEY set
    TrustAnchor { key: KeyInfo, digest: DigestInfo },
    /// A parent DS record matched a key that signs the DNSKEY set
    MatchedDigest {
        key: KeyInfo,
        digest: DigestInfo,
        matched: usize,
        total: usize,
    },
    /// The DNSKEY set verifies under its own keys but is not chained to an anchor
    MatchedKey { key: KeyInfo },
    /// A signed denial; `record_type` is `NSEC` or `NSEC3`
    DenialProof {
        outcome: DenialOutcome,
        record_type: String,
    },
    InheritedFromParent { parent: DomainName },
    None,
}

/// Outcome of evaluating one zone of the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneVerdict {
    pub zone: DomainName,
    pub status: TrustStatus,
    pub evidence: Evidence,
    pub reason: String,
    #[serde(default)]
    pub keys: Vec<KeyInfo>,
    #[serde(default)]
    pub digests: Vec<DigestInfo>,
    #[serde(default)]
    pub signature: Option<SignatureTiming>,
    /// Present only when the authoritative servers were compared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencyReport>,
}

impl ZoneVerdict {
    pub fn new(
        zone: DomainName,
        status: TrustStatus,
        evidence: Evidence,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            zone,
            status,
            evidence,
            reason: reason.into(),
            keys: Vec::new(),
            digests: Vec::new(),
            signature: None,
            consistency: None,
        }
    }

    pub fn with_keys(mut self, keys: Vec<KeyInfo>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_digests(mut self, digests: Vec<DigestInfo>) -> Self {
        self.digests = digests;
        self
    }

    pub fn with_signature(mut self, signature: Option<SignatureTiming>) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_consistency(mut self, consistency: ConsistencyReport) -> Self {
        self.consistency = Some(consistency);
        self
    }
}

/// Complete result of one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainResult {
    pub target: DomainName,
    /// Ordered root first
    pub verdicts: Vec<ZoneVerdict>,
    pub overall_status: TrustStatus,
    pub overall_reason: String,
    pub explanation: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
    #[serde(default)]
    pub resolvers: Vec<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ChainResult {
    /// First zone whose status determines the overall status
    pub fn breaking_zone(&self) -> Option<&ZoneVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.status != TrustStatus::Secure && v.status == self.overall_status)
    }

    pub fn with_run_info(mut self, resolvers: Vec<String>, duration_ms: u64) -> Self {
        self.resolvers = resolvers;
        self.duration_ms = duration_ms;
        self
    }
}
