pub mod algorithm;
pub mod canonical;
pub mod denial;
pub mod digest;
pub mod errors;
pub mod key_tag;
pub mod records;
pub mod trust_anchor;
pub mod verifier;

pub use algorithm::DnsSecAlgorithm;
pub use denial::{DenialEvaluator, DenialOutcome};
pub use digest::DigestType;
pub use errors::{DnsSecError, TrustAnchorError};
pub use key_tag::calculate_key_tag;
pub use records::{
    DelegationDigest, DenialProof, DenialRecord, KeyInfo, RecordSet, Signature, SigningKey,
};
pub use trust_anchor::{TrustAnchor, TrustAnchorStore};
pub use verifier::{CryptoVerifier, SignatureCheck, SignatureTiming};

/// DNSSEC constants
pub mod constants {
    /// EDNS payload advertised on queries (DNS flag day 2020)
    pub const DNSSEC_UDP_SIZE: u16 = 1232;
}
