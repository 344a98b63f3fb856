use std::cmp::Ordering;
use std::fmt;

use ring::digest;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::records::{DenialEntry, DenialProof, DenialRecord, NSEC3_FLAG_OPT_OUT, NSEC3_HASH_SHA1, SigningKey, TypeBitmap};
use super::verifier::CryptoVerifier;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::DomainName;

/// Iteration cap for NSEC3 hashing (RFC 9276 recommends treating large
/// counts as insecure; validators commonly stop around 150)
pub const MAX_NSEC3_ITERATIONS: u16 = 150;

/// What an authenticated denial proves about a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenialOutcome {
    NameDoesNotExist,
    TypeDoesNotExistAtName,
    /// The parent proves a delegation with no DS record
    DelegationIsUnsigned,
    Inconclusive,
}

impl fmt::Display for DenialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameDoesNotExist => write!(f, "name does not exist"),
            Self::TypeDoesNotExistAtName => write!(f, "type does not exist at name"),
            Self::DelegationIsUnsigned => write!(f, "delegation is unsigned"),
            Self::Inconclusive => write!(f, "proof is inconclusive"),
        }
    }
}

/// RFC 5155 section 5 hash of `name`
pub fn nsec3_hash(name: &DomainName, salt: &[u8], iterations: u16) -> Vec<u8> {
    let mut input = name.to_wire();
    input.extend_from_slice(salt);
    let mut hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &input);
    for _ in 0..iterations {
        let mut next = hash.as_ref().to_vec();
        next.extend_from_slice(salt);
        hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &next);
    }
    hash.as_ref().to_vec()
}

/// Base32hex label for a hashed owner name, lowercase
pub fn encode_hash_label(hash: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648Hex { padding: false }, hash).to_ascii_lowercase()
}

fn decode_hash_label(label: &str) -> Option<Vec<u8>> {
    base32::decode(
        base32::Alphabet::Rfc4648Hex { padding: false },
        &label.to_ascii_uppercase(),
    )
}

/// Decide what a record's type bitmap says about `qtype` at its owner
fn type_denial(types: &TypeBitmap, qtype: DNSResourceType) -> DenialOutcome {
    if types.contains(qtype)
        || (qtype != DNSResourceType::CNAME && types.contains(DNSResourceType::CNAME))
    {
        return DenialOutcome::Inconclusive;
    }
    let delegation =
        types.contains(DNSResourceType::NS) && !types.contains(DNSResourceType::SOA);
    if qtype == DNSResourceType::DS {
        if delegation {
            return DenialOutcome::DelegationIsUnsigned;
        }
        if types.contains(DNSResourceType::SOA) {
            // child apex record, not the parent side of the cut
            return DenialOutcome::Inconclusive;
        }
        return DenialOutcome::TypeDoesNotExistAtName;
    }
    if delegation {
        return DenialOutcome::Inconclusive;
    }
    DenialOutcome::TypeDoesNotExistAtName
}

/// Hashed NSEC3 record, ready for range checks
struct HashedRecord<'a> {
    owner_hash: Vec<u8>,
    next_hash: &'a [u8],
    opt_out: bool,
    types: &'a TypeBitmap,
}

impl HashedRecord<'_> {
    fn covers(&self, hash: &[u8]) -> bool {
        let owner = self.owner_hash.as_slice();
        if owner < self.next_hash {
            owner < hash && hash < self.next_hash
        } else {
            // last record in the chain wraps to the first
            hash > owner || hash < self.next_hash
        }
    }
}

/// Checks NSEC and NSEC3 proofs against a zone's keys
pub struct DenialEvaluator<'a> {
    verifier: &'a CryptoVerifier,
    max_iterations: u16,
}

impl<'a> DenialEvaluator<'a> {
    pub fn new(verifier: &'a CryptoVerifier) -> Self {
        Self {
            verifier,
            max_iterations: MAX_NSEC3_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u16) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn evaluate(
        &self,
        proof: &DenialProof,
        zone_keys: &[SigningKey],
        qname: &DomainName,
        qtype: DNSResourceType,
    ) -> DenialOutcome {
        if proof.is_empty() || zone_keys.is_empty() {
            return DenialOutcome::Inconclusive;
        }
        if let Some(entry) = proof.entries.iter().find(|e| !self.is_authentic(e, zone_keys)) {
            debug!(
                "{} record at {} does not verify, denial inconclusive",
                entry.record.rtype(),
                entry.record.owner()
            );
            return DenialOutcome::Inconclusive;
        }

        let zone = &zone_keys[0].owner;
        let outcome = if proof.uses_nsec3() {
            self.evaluate_nsec3(proof, zone, qname, qtype)
        } else {
            self.evaluate_nsec(proof, zone, qname, qtype)
        };
        debug!("{} proof for {} {}: {}", proof.kind(), qname, qtype, outcome);
        outcome
    }

    fn is_authentic(&self, entry: &DenialEntry, keys: &[SigningKey]) -> bool {
        self.verifier
            .verify_rrset(&entry.rrset, &entry.signatures, keys)
            .is_valid()
    }

    fn evaluate_nsec(
        &self,
        proof: &DenialProof,
        zone: &DomainName,
        qname: &DomainName,
        qtype: DNSResourceType,
    ) -> DenialOutcome {
        let records: Vec<(&DomainName, &DomainName, &TypeBitmap)> = proof
            .entries
            .iter()
            .filter_map(|e| match &e.record {
                DenialRecord::Nsec { owner, next, types } => Some((owner, next, types)),
                DenialRecord::Nsec3 { .. } => None,
            })
            .filter(|(owner, _, _)| owner.is_subdomain_of(zone))
            .collect();

        if let Some(&(_, _, types)) = records.iter().find(|&&(owner, _, _)| owner == qname) {
            return type_denial(types, qtype);
        }

        let covers = |owner: &DomainName, next: &DomainName, name: &DomainName| {
            if owner.canonical_cmp(next) == Ordering::Less {
                owner < name && name < next
            } else {
                owner < name
            }
        };

        let Some(&(owner, next, _)) = records
            .iter()
            .find(|&&(owner, next, _)| covers(owner, next, qname))
        else {
            return DenialOutcome::Inconclusive;
        };

        // next name below qname means qname is an empty non-terminal
        if next.is_subdomain_of(qname) && next != qname {
            return DenialOutcome::TypeDoesNotExistAtName;
        }

        let encloser = {
            let a = qname.common_ancestor(owner);
            let b = qname.common_ancestor(next);
            if a.label_count() >= b.label_count() { a } else { b }
        };
        if !encloser.is_subdomain_of(zone) {
            return DenialOutcome::Inconclusive;
        }
        let Some(wildcard) = encloser.wildcard() else {
            return DenialOutcome::Inconclusive;
        };
        trace!("NSEC closest encloser {} for {}", encloser, qname);

        if let Some(&(_, _, types)) = records.iter().find(|&&(owner, _, _)| *owner == wildcard) {
            return type_denial(types, qtype);
        }
        if records
            .iter()
            .any(|&(owner, next, _)| covers(owner, next, &wildcard))
        {
            DenialOutcome::NameDoesNotExist
        } else {
            DenialOutcome::Inconclusive
        }
    }

    fn evaluate_nsec3(
        &self,
        proof: &DenialProof,
        zone: &DomainName,
        qname: &DomainName,
        qtype: DNSResourceType,
    ) -> DenialOutcome {
        let mut params: Option<(&[u8], u16)> = None;
        let mut records = Vec::new();
        for entry in &proof.entries {
            let DenialRecord::Nsec3 {
                owner,
                hash_algorithm,
                flags,
                iterations,
                salt,
                next_hashed,
                types,
            } = &entry.record
            else {
                continue;
            };
            if *hash_algorithm != NSEC3_HASH_SHA1 || owner.parent().as_ref() != Some(zone) {
                continue;
            }
            if *iterations > self.max_iterations {
                debug!(
                    "NSEC3 iterations {} exceed limit {}",
                    iterations, self.max_iterations
                );
                return DenialOutcome::Inconclusive;
            }
            match params {
                None => params = Some((salt.as_slice(), *iterations)),
                Some((s, i)) if s != salt.as_slice() || i != *iterations => {
                    return DenialOutcome::Inconclusive;
                }
                Some(_) => {}
            }
            let Some(owner_hash) = owner.first_label().and_then(decode_hash_label) else {
                continue;
            };
            records.push(HashedRecord {
                owner_hash,
                next_hash: next_hashed,
                opt_out: flags & NSEC3_FLAG_OPT_OUT != 0,
                types,
            });
        }
        let Some((salt, iterations)) = params else {
            return DenialOutcome::Inconclusive;
        };

        let hash = |name: &DomainName| nsec3_hash(name, salt, iterations);
        let matching = |name: &DomainName| {
            let h = hash(name);
            records.iter().find(|r| r.owner_hash == h)
        };
        let covering = |name: &DomainName| {
            let h = hash(name);
            records.iter().find(|r| r.covers(&h))
        };

        if let Some(record) = matching(qname) {
            return type_denial(record.types, qtype);
        }

        // closest provable encloser, walking up towards the apex
        let mut encloser = None;
        let mut candidate = qname.parent();
        while let Some(name) = candidate {
            if !name.is_subdomain_of(zone) {
                break;
            }
            if matching(&name).is_some() {
                encloser = Some(name);
                break;
            }
            candidate = name.parent();
        }
        let Some(encloser) = encloser else {
            return DenialOutcome::Inconclusive;
        };
        let next_closer = qname.trim_to(encloser.label_count() + 1);
        trace!(
            "NSEC3 closest encloser {}, next closer {}",
            encloser, next_closer
        );

        let Some(cover) = covering(&next_closer) else {
            return DenialOutcome::Inconclusive;
        };
        if cover.opt_out {
            // opt-out spans may hide unsigned delegations, nothing more
            return if qtype == DNSResourceType::DS {
                DenialOutcome::DelegationIsUnsigned
            } else {
                DenialOutcome::Inconclusive
            };
        }

        let Some(wildcard) = encloser.wildcard() else {
            return DenialOutcome::Inconclusive;
        };
        if let Some(record) = matching(&wildcard) {
            return type_denial(record.types, qtype);
        }
        if covering(&wildcard).is_some() {
            DenialOutcome::NameDoesNotExist
        } else {
            DenialOutcome::Inconclusive
        }
    }
}
