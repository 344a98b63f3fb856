//! Canonical forms used when computing and checking signatures (RFC 4034 6).

use super::errors::{DnsSecError, Result};
use super::records::{RecordSet, Signature};
use crate::dns::name::DomainName;

/// RDATA of `rrset` in canonical order with duplicates removed
pub fn canonical_rdata(rrset: &RecordSet) -> Vec<&[u8]> {
    let mut rdata: Vec<&[u8]> = rrset.rdata.iter().map(Vec::as_slice).collect();
    rdata.sort_unstable();
    rdata.dedup();
    rdata
}

/// Owner name as it was signed. When the RRSIG labels field is smaller
/// than the owner's label count the record was synthesized from a wildcard
/// (RFC 4035 5.3.2).
pub fn signed_owner(owner: &DomainName, labels: u8) -> Result<DomainName> {
    let labels = labels as usize;
    let count = owner.label_count();
    if labels > count {
        return Err(DnsSecError::InvalidLabelCount);
    }
    if labels == count {
        return Ok(owner.clone());
    }
    owner
        .trim_to(labels)
        .wildcard()
        .ok_or(DnsSecError::InvalidLabelCount)
}

/// The octets an RRSIG signs: its own RDATA without the signature followed
/// by every RR of the set in canonical form and order (RFC 4034 3.1.8.1).
pub fn signed_data(rrset: &RecordSet, sig: &Signature) -> Result<Vec<u8>> {
    let owner = signed_owner(&rrset.owner, sig.labels)?.to_wire();
    let rtype = u16::from(rrset.rtype).to_be_bytes();
    let class = u16::from(rrset.class).to_be_bytes();
    let ttl = sig.original_ttl.to_be_bytes();

    let mut data = sig.rdata_without_signature();
    for rdata in canonical_rdata(rrset) {
        data.extend_from_slice(&owner);
        data.extend_from_slice(&rtype);
        data.extend_from_slice(&class);
        data.extend_from_slice(&ttl);
        data.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        data.extend_from_slice(rdata);
    }
    Ok(data)
}
