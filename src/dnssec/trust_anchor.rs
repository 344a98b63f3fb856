use std::collections::HashMap;
use std::str::FromStr;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use super::digest::DigestType;
use super::errors::TrustAnchorError;
use super::records::{DelegationDigest, SigningKey};
use crate::dns::name::DomainName;

/// IANA root zone KSKs in DS form (root-anchors.xml)
const ROOT_ANCHORS: &[(u16, u8, u8, &str)] = &[
    // KSK-2017
    (
        20326,
        8,
        2,
        "E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D",
    ),
    // KSK-2024
    (
        38696,
        8,
        2,
        "683D2D0ACB8C9B712A1948B27F741219298D0A450D612C483AF444A4C0FB2B16",
    ),
];

/// A configured point of trust, expressed as a DS record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor(pub DelegationDigest);

impl TrustAnchor {
    pub fn zone(&self) -> &DomainName {
        &self.0.owner
    }
}

impl FromStr for TrustAnchor {
    type Err = TrustAnchorError;

    /// Presentation form `<zone> <key tag> <algorithm> <digest type> <hex digest>`,
    /// optionally with `DS` (and class) between the zone and the key tag.
    /// `<zone> DNSKEY <flags> <protocol> <algorithm> <base64 key>` is also
    /// accepted and stored as its SHA-256 digest.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s
            .split_whitespace()
            .filter(|f| !f.eq_ignore_ascii_case("DS") && !f.eq_ignore_ascii_case("IN"))
            .collect();
        if let [zone, rtype, rest @ ..] = fields.as_slice() {
            if rtype.eq_ignore_ascii_case("DNSKEY") {
                return parse_dnskey_anchor(zone, rest);
            }
        }
        let [zone, key_tag, algorithm, digest_type, digest @ ..] = fields.as_slice() else {
            return Err(TrustAnchorError::TooFewFields(s.trim().to_string()));
        };
        if digest.is_empty() {
            return Err(TrustAnchorError::MissingKeyMaterial(zone.to_string()));
        }

        let owner = parse_zone(zone)?;
        let key_tag = parse_field("key tag", key_tag)?;
        let algorithm = parse_field("algorithm", algorithm)?;
        let digest_type = parse_field("digest type", digest_type)?;
        let digest =
            hex::decode(digest.concat()).map_err(|e| TrustAnchorError::InvalidEncoding {
                field: "digest",
                message: e.to_string(),
            })?;

        Ok(TrustAnchor(DelegationDigest {
            owner,
            key_tag,
            algorithm,
            digest_type,
            digest,
        }))
    }
}

fn parse_zone(zone: &str) -> Result<DomainName, TrustAnchorError> {
    DomainName::parse(zone).map_err(|source| TrustAnchorError::InvalidZone {
        zone: zone.to_string(),
        source,
    })
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, TrustAnchorError> {
    value.parse().map_err(|_| TrustAnchorError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn parse_dnskey_anchor(zone: &str, fields: &[&str]) -> Result<TrustAnchor, TrustAnchorError> {
    let [flags, protocol, algorithm, key @ ..] = fields else {
        return Err(TrustAnchorError::TooFewFields(format!("{} DNSKEY", zone)));
    };
    if key.is_empty() {
        return Err(TrustAnchorError::MissingKeyMaterial(zone.to_string()));
    }
    if *protocol != "3" {
        return Err(TrustAnchorError::UnsupportedProtocol(protocol.to_string()));
    }

    let owner = parse_zone(zone)?;
    let flags = parse_field("DNSKEY flags", flags)?;
    let algorithm = parse_field("algorithm", algorithm)?;
    let public_key =
        BASE64_STANDARD
            .decode(key.concat())
            .map_err(|e| TrustAnchorError::InvalidEncoding {
                field: "public key",
                message: e.to_string(),
            })?;

    let key = SigningKey::new(owner, flags, algorithm, public_key);
    DelegationDigest::for_key(&key, DigestType::Sha256)
        .map(TrustAnchor)
        .ok_or(TrustAnchorError::DigestFailed)
}

/// Trust anchors keyed by zone
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorStore {
    anchors: HashMap<DomainName, Vec<DelegationDigest>>,
}

impl TrustAnchorStore {
    /// Store holding the current root KSK anchors
    pub fn new() -> Self {
        let mut store = Self::empty();
        for (key_tag, algorithm, digest_type, digest) in ROOT_ANCHORS {
            if let Ok(digest) = hex::decode(digest) {
                store.add_anchor(TrustAnchor(DelegationDigest {
                    owner: DomainName::root(),
                    key_tag: *key_tag,
                    algorithm: *algorithm,
                    digest_type: *digest_type,
                    digest,
                }));
            }
        }
        store
    }

    pub fn empty() -> Self {
        Self {
            anchors: HashMap::new(),
        }
    }

    pub fn add_anchor(&mut self, anchor: TrustAnchor) {
        let entry = self.anchors.entry(anchor.zone().clone()).or_default();
        if !entry.contains(&anchor.0) {
            entry.push(anchor.0);
        }
    }

    /// Anchors configured exactly at `zone`
    pub fn anchors_for(&self, zone: &DomainName) -> &[DelegationDigest] {
        self.anchors.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_anchor(&self, zone: &DomainName) -> bool {
        !self.anchors_for(zone).is_empty()
    }

    /// Closest configured anchor at or above `name`
    pub fn closest_anchor(&self, name: &DomainName) -> Option<&DomainName> {
        self.anchors
            .keys()
            .filter(|zone| name.is_subdomain_of(zone))
            .max_by_key(|zone| zone.label_count())
    }

    pub fn zone_count(&self) -> usize {
        self.anchors.len()
    }
}
