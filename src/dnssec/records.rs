//! Typed views over DNSSEC resource records.

use serde::{Deserialize, Serialize};

use super::algorithm::{DnsSecAlgorithm, algorithm_name};
use super::digest::DigestType;
use super::errors::{DnsSecError, Result};
use super::key_tag::calculate_key_tag;
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::name::DomainName;
use crate::dns::resource::DNSResource;

pub const DNSKEY_FLAG_ZONE: u16 = 0x0100;
pub const DNSKEY_FLAG_REVOKE: u16 = 0x0080;
pub const DNSKEY_FLAG_SEP: u16 = 0x0001;
pub const DNSKEY_PROTOCOL: u8 = 3;

pub const NSEC3_FLAG_OPT_OUT: u8 = 0x01;
pub const NSEC3_HASH_SHA1: u8 = 1;

/// All records sharing owner, type and class, in the order they were fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    pub owner: DomainName,
    pub rtype: DNSResourceType,
    pub class: DNSResourceClass,
    pub ttl: u32,
    pub rdata: Vec<Vec<u8>>,
}

impl RecordSet {
    pub fn new(owner: DomainName, rtype: DNSResourceType, ttl: u32) -> Self {
        Self {
            owner,
            rtype,
            class: DNSResourceClass::IN,
            ttl,
            rdata: Vec::new(),
        }
    }

    pub fn with_rdata(mut self, rdata: Vec<u8>) -> Self {
        self.rdata.push(rdata);
        self
    }

    pub fn len(&self) -> usize {
        self.rdata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdata.is_empty()
    }

    /// Collect every record in `records` that matches `owner` and `rtype`
    pub fn collect<'a, I>(records: I, owner: &DomainName, rtype: DNSResourceType) -> Option<Self>
    where
        I: IntoIterator<Item = &'a DNSResource>,
    {
        let mut set: Option<RecordSet> = None;
        for record in records {
            if record.rtype != rtype || &record.name != owner {
                continue;
            }
            let entry = set.get_or_insert_with(|| RecordSet {
                owner: owner.clone(),
                rtype,
                class: record.rclass,
                ttl: record.ttl,
                rdata: Vec::new(),
            });
            entry.ttl = entry.ttl.min(record.ttl);
            if !entry.rdata.contains(&record.rdata) {
                entry.rdata.push(record.rdata.clone());
            }
        }
        set
    }
}

/// A DNSKEY record together with its owner and derived key tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub owner: DomainName,
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Vec<u8>,
    pub key_tag: u16,
}

impl SigningKey {
    pub fn new(owner: DomainName, flags: u16, algorithm: u8, public_key: Vec<u8>) -> Self {
        let key_tag = calculate_key_tag(flags, DNSKEY_PROTOCOL, algorithm, &public_key);
        Self {
            owner,
            flags,
            protocol: DNSKEY_PROTOCOL,
            algorithm,
            public_key,
            key_tag,
        }
    }

    pub fn parse(owner: &DomainName, rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 5 {
            return Err(DnsSecError::Malformed("DNSKEY"));
        }
        let flags = u16::from_be_bytes([rdata[0], rdata[1]]);
        let protocol = rdata[2];
        let algorithm = rdata[3];
        let public_key = rdata[4..].to_vec();
        Ok(Self {
            owner: owner.clone(),
            flags,
            protocol,
            algorithm,
            key_tag: calculate_key_tag(flags, protocol, algorithm, &public_key),
            public_key,
        })
    }

    /// Parse every DNSKEY in `rrset`, skipping malformed entries
    pub fn from_rrset(rrset: &RecordSet) -> Vec<Self> {
        rrset
            .rdata
            .iter()
            .filter_map(|rdata| Self::parse(&rrset.owner, rdata).ok())
            .collect()
    }

    pub fn rdata(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.public_key.len());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.push(self.protocol);
        out.push(self.algorithm);
        out.extend_from_slice(&self.public_key);
        out
    }

    pub fn is_zone_key(&self) -> bool {
        self.flags & DNSKEY_FLAG_ZONE != 0
    }

    pub fn is_sep(&self) -> bool {
        self.flags & DNSKEY_FLAG_SEP != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.flags & DNSKEY_FLAG_REVOKE != 0
    }

    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            key_tag: self.key_tag,
            algorithm: self.algorithm,
            algorithm_name: algorithm_name(self.algorithm),
            flags: self.flags,
            role: if self.is_sep() {
                KeyRole::Ksk
            } else {
                KeyRole::Zsk
            },
            key_length_bits: DnsSecAlgorithm::from_u8(self.algorithm)
                .and_then(|a| a.key_length_bits(&self.public_key)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRole {
    #[serde(rename = "KSK")]
    Ksk,
    #[serde(rename = "ZSK")]
    Zsk,
}

/// Summary of a DNSKEY suitable for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_tag: u16,
    pub algorithm: u8,
    pub algorithm_name: String,
    pub flags: u16,
    pub role: KeyRole,
    pub key_length_bits: Option<u32>,
}

impl KeyInfo {
    pub fn role_label(&self) -> &'static str {
        match self.role {
            KeyRole::Ksk => "KSK",
            KeyRole::Zsk => "ZSK",
        }
    }
}

/// A DS record, or a trust anchor in DS form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationDigest {
    pub owner: DomainName,
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: Vec<u8>,
}

impl DelegationDigest {
    pub fn parse(owner: &DomainName, rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 5 {
            return Err(DnsSecError::Malformed("DS"));
        }
        Ok(Self {
            owner: owner.clone(),
            key_tag: u16::from_be_bytes([rdata[0], rdata[1]]),
            algorithm: rdata[2],
            digest_type: rdata[3],
            digest: rdata[4..].to_vec(),
        })
    }

    pub fn from_rrset(rrset: &RecordSet) -> Vec<Self> {
        rrset
            .rdata
            .iter()
            .filter_map(|rdata| Self::parse(&rrset.owner, rdata).ok())
            .collect()
    }

    /// DS for `key`, hashing owner name and DNSKEY RDATA (RFC 4034 5.1.4)
    pub fn for_key(key: &SigningKey, digest_type: DigestType) -> Option<Self> {
        let mut data = key.owner.to_wire();
        data.extend_from_slice(&key.rdata());
        Some(Self {
            owner: key.owner.clone(),
            key_tag: key.key_tag,
            algorithm: key.algorithm,
            digest_type: digest_type.to_u8(),
            digest: digest_type.digest(&data)?,
        })
    }

    pub fn rdata(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.digest.len());
        out.extend_from_slice(&self.key_tag.to_be_bytes());
        out.push(self.algorithm);
        out.push(self.digest_type);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Both the signing algorithm and the digest type can be checked
    pub fn is_usable(&self) -> bool {
        DnsSecAlgorithm::from_u8(self.algorithm).is_some_and(|a| a.is_supported())
            && DigestType::from_u8(self.digest_type).is_some_and(|d| d.is_supported())
    }

    pub fn info(&self, validates_key: Option<u16>) -> DigestInfo {
        DigestInfo {
            key_tag: self.key_tag,
            algorithm: self.algorithm,
            digest_type: self.digest_type,
            digest: hex::encode_upper(&self.digest),
            validates_key,
        }
    }
}

/// Summary of a DS record and which DNSKEY (if any) it validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestInfo {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: String,
    pub validates_key: Option<u16>,
}

/// Parsed RRSIG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub owner: DomainName,
    pub type_covered: DNSResourceType,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: DomainName,
    pub signature: Vec<u8>,
}

impl Signature {
    pub fn parse(owner: &DomainName, rdata: &[u8]) -> Result<Self> {
        if rdata.len() < 19 {
            return Err(DnsSecError::Malformed("RRSIG"));
        }
        let be32 = |i: usize| u32::from_be_bytes([rdata[i], rdata[i + 1], rdata[i + 2], rdata[i + 3]]);
        // The signer name is never compressed, so decoding within the
        // RDATA alone is sufficient.
        let (signer, sig_start) =
            DomainName::decode(rdata, 18).map_err(|_| DnsSecError::Malformed("RRSIG"))?;
        Ok(Self {
            owner: owner.clone(),
            type_covered: u16::from_be_bytes([rdata[0], rdata[1]]).into(),
            algorithm: rdata[2],
            labels: rdata[3],
            original_ttl: be32(4),
            expiration: be32(8),
            inception: be32(12),
            key_tag: u16::from_be_bytes([rdata[16], rdata[17]]),
            signer,
            signature: rdata[sig_start..].to_vec(),
        })
    }

    /// Every RRSIG at `owner` covering `rtype`
    pub fn collect<'a, I>(records: I, owner: &DomainName, rtype: DNSResourceType) -> Vec<Self>
    where
        I: IntoIterator<Item = &'a DNSResource>,
    {
        records
            .into_iter()
            .filter(|r| r.rtype == DNSResourceType::RRSIG && &r.name == owner)
            .filter_map(|r| Self::parse(owner, &r.rdata).ok())
            .filter(|s| s.type_covered == rtype)
            .collect()
    }

    /// RRSIG RDATA up to and excluding the signature field
    pub fn rdata_without_signature(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(18 + self.signer.wire_len());
        out.extend_from_slice(&u16::from(self.type_covered).to_be_bytes());
        out.push(self.algorithm);
        out.push(self.labels);
        out.extend_from_slice(&self.original_ttl.to_be_bytes());
        out.extend_from_slice(&self.expiration.to_be_bytes());
        out.extend_from_slice(&self.inception.to_be_bytes());
        out.extend_from_slice(&self.key_tag.to_be_bytes());
        self.signer.write_wire(&mut out);
        out
    }

    pub fn rdata(&self) -> Vec<u8> {
        let mut out = self.rdata_without_signature();
        out.extend_from_slice(&self.signature);
        out
    }
}

/// Set of record types from an NSEC/NSEC3 type bitmap
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeBitmap(Vec<u16>);

impl TypeBitmap {
    pub fn from_types<I: IntoIterator<Item = DNSResourceType>>(types: I) -> Self {
        let mut codes: Vec<u16> = types.into_iter().map(u16::from).collect();
        codes.sort_unstable();
        codes.dedup();
        Self(codes)
    }

    /// Decode the window/bitmap encoding of RFC 4034 4.1.2
    pub fn parse(mut data: &[u8]) -> Result<Self> {
        let mut codes = Vec::new();
        let mut last_window: Option<u8> = None;
        while !data.is_empty() {
            let [window, len, rest @ ..] = data else {
                return Err(DnsSecError::Malformed("type bitmap"));
            };
            let len = *len as usize;
            if len == 0 || len > 32 || rest.len() < len || last_window.is_some_and(|w| w >= *window)
            {
                return Err(DnsSecError::Malformed("type bitmap"));
            }
            for (i, byte) in rest[..len].iter().enumerate() {
                for bit in 0..8u16 {
                    if byte & (0x80u8 >> bit) != 0 {
                        codes.push(((*window as u16) << 8) | (i as u16 * 8 + bit));
                    }
                }
            }
            last_window = Some(*window);
            data = &rest[len..];
        }
        Ok(Self(codes))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut index = 0;
        while index < self.0.len() {
            let window = (self.0[index] >> 8) as u8;
            let mut bits = [0u8; 32];
            let mut used = 0;
            while index < self.0.len() && (self.0[index] >> 8) as u8 == window {
                let low = (self.0[index] & 0xFF) as usize;
                bits[low / 8] |= 0x80 >> (low % 8);
                used = used.max(low / 8 + 1);
                index += 1;
            }
            out.push(window);
            out.push(used as u8);
            out.extend_from_slice(&bits[..used]);
        }
        out
    }

    pub fn contains(&self, rtype: DNSResourceType) -> bool {
        self.0.binary_search(&u16::from(rtype)).is_ok()
    }

    pub fn types(&self) -> impl Iterator<Item = DNSResourceType> + '_ {
        self.0.iter().map(|c| DNSResourceType::from(*c))
    }
}

/// One record of an authenticated-denial chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialRecord {
    Nsec {
        owner: DomainName,
        next: DomainName,
        types: TypeBitmap,
    },
    Nsec3 {
        owner: DomainName,
        hash_algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed: Vec<u8>,
        types: TypeBitmap,
    },
}

impl DenialRecord {
    pub fn parse(owner: &DomainName, rtype: DNSResourceType, rdata: &[u8]) -> Result<Self> {
        match rtype {
            DNSResourceType::NSEC => {
                let (next, end) =
                    DomainName::decode(rdata, 0).map_err(|_| DnsSecError::Malformed("NSEC"))?;
                Ok(DenialRecord::Nsec {
                    owner: owner.clone(),
                    next,
                    types: TypeBitmap::parse(&rdata[end..])?,
                })
            }
            DNSResourceType::NSEC3 => {
                let malformed = || DnsSecError::Malformed("NSEC3");
                let header = rdata.get(..5).ok_or_else(malformed)?;
                let iterations = u16::from_be_bytes([header[2], header[3]]);
                let salt_len = header[4] as usize;
                let salt = rdata.get(5..5 + salt_len).ok_or_else(malformed)?;
                let hash_len = *rdata.get(5 + salt_len).ok_or_else(malformed)? as usize;
                let hash_start = 6 + salt_len;
                let next_hashed = rdata
                    .get(hash_start..hash_start + hash_len)
                    .ok_or_else(malformed)?;
                Ok(DenialRecord::Nsec3 {
                    owner: owner.clone(),
                    hash_algorithm: header[0],
                    flags: header[1],
                    iterations,
                    salt: salt.to_vec(),
                    next_hashed: next_hashed.to_vec(),
                    types: TypeBitmap::parse(&rdata[hash_start + hash_len..])?,
                })
            }
            _ => Err(DnsSecError::Malformed("denial")),
        }
    }

    pub fn owner(&self) -> &DomainName {
        match self {
            DenialRecord::Nsec { owner, .. } | DenialRecord::Nsec3 { owner, .. } => owner,
        }
    }

    pub fn types(&self) -> &TypeBitmap {
        match self {
            DenialRecord::Nsec { types, .. } | DenialRecord::Nsec3 { types, .. } => types,
        }
    }

    pub fn rtype(&self) -> DNSResourceType {
        match self {
            DenialRecord::Nsec { .. } => DNSResourceType::NSEC,
            DenialRecord::Nsec3 { .. } => DNSResourceType::NSEC3,
        }
    }

    pub fn rdata(&self) -> Vec<u8> {
        match self {
            DenialRecord::Nsec { next, types, .. } => {
                let mut out = next.to_wire();
                out.extend_from_slice(&types.encode());
                out
            }
            DenialRecord::Nsec3 {
                hash_algorithm,
                flags,
                iterations,
                salt,
                next_hashed,
                types,
                ..
            } => {
                let mut out = vec![*hash_algorithm, *flags];
                out.extend_from_slice(&iterations.to_be_bytes());
                out.push(salt.len() as u8);
                out.extend_from_slice(salt);
                out.push(next_hashed.len() as u8);
                out.extend_from_slice(next_hashed);
                out.extend_from_slice(&types.encode());
                out
            }
        }
    }
}

/// A denial record with the RRset it came from and the signatures over it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialEntry {
    pub record: DenialRecord,
    pub rrset: RecordSet,
    pub signatures: Vec<Signature>,
}

/// NSEC or NSEC3 records returned for a negative answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenialProof {
    pub entries: Vec<DenialEntry>,
}

impl DenialProof {
    /// Gather NSEC/NSEC3 RRsets and their RRSIGs from response records
    pub fn collect(records: &[&DNSResource]) -> Option<Self> {
        let mut proof = DenialProof::default();
        for record in records {
            if !matches!(record.rtype, DNSResourceType::NSEC | DNSResourceType::NSEC3) {
                continue;
            }
            let Ok(parsed) = DenialRecord::parse(&record.name, record.rtype, &record.rdata) else {
                continue;
            };
            if proof.entries.iter().any(|e| e.record == parsed) {
                continue;
            }
            let rrset = RecordSet::new(record.name.clone(), record.rtype, record.ttl)
                .with_rdata(record.rdata.clone());
            let signatures =
                Signature::collect(records.iter().copied(), &record.name, record.rtype);
            proof.entries.push(DenialEntry {
                record: parsed,
                rrset,
                signatures,
            });
        }
        (!proof.entries.is_empty()).then_some(proof)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn uses_nsec3(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.record, DenialRecord::Nsec3 { .. }))
    }

    /// Record type label for reports
    pub fn kind(&self) -> &'static str {
        if self.uses_nsec3() { "NSEC3" } else { "NSEC" }
    }
}
