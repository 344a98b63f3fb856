use thiserror::Error;

use crate::dns::name::NameError;

/// Why a single RRSIG or DS check failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsSecError {
    #[error("no DNSKEY matches the signature's key tag and algorithm")]
    NoDnsKey,
    #[error("RRset carries no RRSIG")]
    NoRrsig,
    #[error("signature expired at {0}")]
    SignatureExpired(String),
    #[error("signature not valid until {0}")]
    SignatureNotYetValid(String),
    #[error("unsupported DNSSEC algorithm {0}")]
    UnsupportedAlgorithm(u8),
    #[error("unsupported digest type {0}")]
    UnsupportedDigestType(u8),
    #[error("signature does not verify")]
    SignatureVerificationFailed,
    #[error("DS digest does not match any DNSKEY")]
    DsDigestMismatch,
    #[error("signer {signer} is not the key owner {owner}")]
    SignerMismatch { signer: String, owner: String },
    #[error("RRSIG covers {covered}, not {rtype}")]
    TypeCoveredMismatch { covered: String, rtype: String },
    #[error("DNSKEY is not usable for zone signing ({0})")]
    UnusableKey(&'static str),
    #[error("RRSIG labels field exceeds owner name")]
    InvalidLabelCount,
    #[error("malformed {0} record")]
    Malformed(&'static str),
}

/// Why a configured trust anchor line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustAnchorError {
    #[error("trust anchor '{0}' has too few fields")]
    TooFewFields(String),
    #[error("trust anchor for {0} has no digest or public key")]
    MissingKeyMaterial(String),
    #[error("invalid zone '{zone}': {source}")]
    InvalidZone {
        zone: String,
        #[source]
        source: NameError,
    },
    #[error("invalid {field} '{value}'")]
    InvalidField { field: &'static str, value: String },
    #[error("invalid {field} encoding: {message}")]
    InvalidEncoding { field: &'static str, message: String },
    #[error("DNSKEY anchor protocol must be 3, got {0}")]
    UnsupportedProtocol(String),
    #[error("failed to digest DNSKEY anchor")]
    DigestFailed,
}

pub type Result<T> = std::result::Result<T, DnsSecError>;

impl DnsSecError {
    /// Rank used to keep the most specific failure when several keys or
    /// signatures are tried; higher wins.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            Self::NoRrsig => 0,
            Self::NoDnsKey | Self::UnsupportedAlgorithm(_) | Self::UnsupportedDigestType(_) => 1,
            Self::SignerMismatch { .. }
            | Self::TypeCoveredMismatch { .. }
            | Self::UnusableKey(_)
            | Self::InvalidLabelCount
            | Self::Malformed(_) => 2,
            Self::DsDigestMismatch => 2,
            Self::SignatureVerificationFailed => 3,
            Self::SignatureExpired(_) | Self::SignatureNotYetValid(_) => 4,
        }
    }
}
