use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::algorithm::DnsSecAlgorithm;
use super::canonical::signed_data;
use super::digest::DigestType;
use super::errors::{DnsSecError, Result};
use super::records::{DNSKEY_PROTOCOL, DelegationDigest, KeyInfo, RecordSet, Signature, SigningKey};
use crate::dns::name::DomainName;

/// Validity window of the signature that authenticated an RRset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTiming {
    pub signer: DomainName,
    pub key_tag: u16,
    pub inception: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub days_until_expiry: i64,
}

/// Outcome of checking an RRset against its signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid {
        key: KeyInfo,
        timing: SignatureTiming,
    },
    /// No signature verified; holds the most specific reason found
    Invalid(DnsSecError),
}

impl SignatureCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureCheck::Valid { .. })
    }
}

/// RRSIG and DS verification against a fixed clock
#[derive(Debug, Clone, Default)]
pub struct CryptoVerifier {
    clock_skew: u32,
    /// Pinned validation time, used by tests
    current_time: Option<i64>,
}

impl CryptoVerifier {
    pub fn new(clock_skew_secs: u32) -> Self {
        Self {
            clock_skew: clock_skew_secs,
            current_time: None,
        }
    }

    pub fn set_current_time(&mut self, unix_secs: i64) {
        self.current_time = Some(unix_secs);
    }

    pub fn with_current_time(mut self, unix_secs: i64) -> Self {
        self.set_current_time(unix_secs);
        self
    }

    fn now(&self) -> i64 {
        self.current_time
            .unwrap_or_else(|| Utc::now().timestamp())
    }

    /// Check one signature over `rrset` with one key, reporting why it fails
    pub fn check_signature(
        &self,
        rrset: &RecordSet,
        sig: &Signature,
        key: &SigningKey,
    ) -> Result<SignatureTiming> {
        if sig.type_covered != rrset.rtype {
            return Err(DnsSecError::TypeCoveredMismatch {
                covered: sig.type_covered.to_string(),
                rtype: rrset.rtype.to_string(),
            });
        }
        if sig.algorithm != key.algorithm || sig.key_tag != key.key_tag {
            return Err(DnsSecError::NoDnsKey);
        }
        if !key.is_zone_key() {
            return Err(DnsSecError::UnusableKey("ZONE flag clear"));
        }
        if key.protocol != DNSKEY_PROTOCOL {
            return Err(DnsSecError::UnusableKey("protocol is not 3"));
        }
        if key.is_revoked() {
            return Err(DnsSecError::UnusableKey("key revoked"));
        }
        if sig.signer != key.owner || !rrset.owner.is_subdomain_of(&sig.signer) {
            return Err(DnsSecError::SignerMismatch {
                signer: sig.signer.to_string(),
                owner: key.owner.to_string(),
            });
        }
        let algorithm = DnsSecAlgorithm::from_u8(sig.algorithm)
            .filter(|a| a.is_supported())
            .ok_or(DnsSecError::UnsupportedAlgorithm(sig.algorithm))?;

        let timing = self.check_validity_period(sig)?;

        let data = signed_data(rrset, sig)?;
        if !algorithm.verify(&key.public_key, &data, &sig.signature) {
            return Err(DnsSecError::SignatureVerificationFailed);
        }
        Ok(timing)
    }

    fn check_validity_period(&self, sig: &Signature) -> Result<SignatureTiming> {
        let now = self.now();
        let skew = self.clock_skew as i64;
        let inception = sig.inception as i64;
        let expiration = sig.expiration as i64;
        let stamp = |secs: i64| DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();

        if now + skew < inception {
            return Err(DnsSecError::SignatureNotYetValid(stamp(inception).to_rfc3339()));
        }
        if now - skew > expiration {
            return Err(DnsSecError::SignatureExpired(stamp(expiration).to_rfc3339()));
        }
        Ok(SignatureTiming {
            signer: sig.signer.clone(),
            key_tag: sig.key_tag,
            inception: stamp(inception),
            expiration: stamp(expiration),
            days_until_expiry: (expiration - now) / 86_400,
        })
    }

    pub fn verify_signature(&self, rrset: &RecordSet, sig: &Signature, key: &SigningKey) -> bool {
        self.check_signature(rrset, sig, key).is_ok()
    }

    /// Try every signature with every key; the first verifying pair wins
    pub fn verify_rrset(
        &self,
        rrset: &RecordSet,
        signatures: &[Signature],
        keys: &[SigningKey],
    ) -> SignatureCheck {
        let mut failure = DnsSecError::NoRrsig;
        for sig in signatures {
            for key in keys {
                match self.check_signature(rrset, sig, key) {
                    Ok(timing) => {
                        trace!(
                            "{} {} verified by key {} ({})",
                            rrset.owner, rrset.rtype, key.key_tag, key.owner
                        );
                        return SignatureCheck::Valid {
                            key: key.info(),
                            timing,
                        };
                    }
                    Err(e) if e.specificity() >= failure.specificity() => failure = e,
                    Err(_) => {}
                }
            }
            if keys.is_empty() {
                failure = DnsSecError::NoDnsKey;
            }
        }
        SignatureCheck::Invalid(failure)
    }

    /// Key from `keys` whose digest equals `ds`, if any
    pub fn verify_digest<'k>(
        &self,
        keys: &'k [SigningKey],
        ds: &DelegationDigest,
    ) -> Option<&'k SigningKey> {
        let digest_type = DigestType::from_u8(ds.digest_type)?;
        keys.iter()
            .filter(|k| k.algorithm == ds.algorithm && k.owner == ds.owner && k.is_zone_key())
            .find(|k| {
                DelegationDigest::for_key(k, digest_type)
                    .is_some_and(|computed| computed.digest == ds.digest)
            })
    }
}
