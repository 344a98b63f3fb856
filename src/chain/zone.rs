//! One parent to child step of the chain.
//!
//! A hop fetches the child's DNSKEY set, the DS set of the next child down
//! and, at the last hop, a probe record for the target, all at once. The
//! child's status comes from the delegation the previous hop established;
//! the lookahead DS answer, judged with the child's keys, becomes the
//! delegation for the next hop.

use std::collections::BTreeSet;

use tokio::time::{sleep, timeout};
use tracing::{debug, trace, warn};

use super::model::{Evidence, TrustStatus, ZoneVerdict};
use crate::config::ChainConfig;
use crate::dns::enums::DNSResourceType;
use crate::dns::name::DomainName;
use crate::dnssec::{
    CryptoVerifier, DelegationDigest, DenialEvaluator, DenialOutcome, DenialProof, RecordSet,
    Signature, SignatureCheck, SigningKey,
};
use crate::error::FetchError;
use crate::fetcher::{FetchRequest, FetchResponse, QueryOutcome, RecordSource};

/// Keys a zone's data can be checked with, and how far they are trusted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyState {
    /// Chained to a trust anchor
    Trusted(Vec<SigningKey>),
    /// Self-consistent, but the chain above them could not be established
    Local(Vec<SigningKey>),
    /// Proven unsigned; nothing below can be secure without a new anchor
    Unsigned,
    Unknown,
}

impl KeyState {
    pub fn keys(&self) -> &[SigningKey] {
        match self {
            KeyState::Trusted(keys) | KeyState::Local(keys) => keys,
            KeyState::Unsigned | KeyState::Unknown => &[],
        }
    }

    /// Status inherited by names that share these keys
    pub fn status(&self) -> TrustStatus {
        match self {
            KeyState::Trusted(_) => TrustStatus::Secure,
            KeyState::Unsigned => TrustStatus::Insecure,
            KeyState::Local(_) | KeyState::Unknown => TrustStatus::Indeterminate,
        }
    }

    fn demoted(&self) -> KeyState {
        match self {
            KeyState::Trusted(keys) => KeyState::Local(keys.clone()),
            other => other.clone(),
        }
    }

    fn owner(&self) -> Option<&DomainName> {
        self.keys().first().map(|k| &k.owner)
    }
}

/// What the parent side says about a child zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegation {
    /// DS records for the child, or configured anchors when `anchor` is set
    Digests {
        records: Vec<DelegationDigest>,
        authenticated: bool,
        anchor: bool,
    },
    /// Signed proof that the delegation has no DS
    Unsigned { kind: String },
    /// Signed proof that there is no zone cut at this name
    NoZoneCut { kind: String },
    /// Signed proof that the name does not exist
    NameAbsent { kind: String },
    ParentInsecure,
    Bogus(String),
    Unavailable(String),
}

impl Delegation {
    pub fn anchored(records: Vec<DelegationDigest>) -> Self {
        Delegation::Digests {
            records,
            authenticated: true,
            anchor: true,
        }
    }

    /// Zones below an insecure cut are still asked for keys so their own
    /// signing state can be reported
    fn needs_child_keys(&self) -> bool {
        matches!(
            self,
            Delegation::Digests { .. }
                | Delegation::Unavailable(_)
                | Delegation::Unsigned { .. }
                | Delegation::ParentInsecure
        )
    }

    /// Whether anything below this child can be checked at all
    fn continues(&self) -> bool {
        !matches!(
            self,
            Delegation::Unsigned { .. } | Delegation::ParentInsecure | Delegation::Bogus(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct HopOutcome {
    pub verdict: ZoneVerdict,
    pub next_keys: KeyState,
    /// Delegation for the next name down; `None` at the last hop
    pub next_digests: Option<Delegation>,
}

/// Evaluates single hops with a shared fetcher and verifier
pub struct ZoneEvaluator<'a> {
    config: &'a ChainConfig,
    source: &'a dyn RecordSource,
    verifier: &'a CryptoVerifier,
}

impl<'a> ZoneEvaluator<'a> {
    pub fn new(
        config: &'a ChainConfig,
        source: &'a dyn RecordSource,
        verifier: &'a CryptoVerifier,
    ) -> Self {
        Self {
            config,
            source,
            verifier,
        }
    }

    fn denial_evaluator(&self) -> DenialEvaluator<'_> {
        DenialEvaluator::new(self.verifier).with_max_iterations(self.config.max_nsec3_iterations)
    }

    /// Evaluate `child` given its parent's keys and the delegation the parent
    /// published. `lookahead` is the next name below `child`; when it is
    /// `None` this is the last hop and the probe record is checked.
    pub async fn evaluate_hop(
        &self,
        parent_keys: &KeyState,
        child: &DomainName,
        expected_digests: Delegation,
        lookahead: Option<&DomainName>,
    ) -> HopOutcome {
        let continues = expected_digests.continues();

        let dnskey_fetch = async {
            if expected_digests.needs_child_keys() {
                let request = FetchRequest::new(child.clone(), DNSResourceType::DNSKEY).in_zone(child);
                Some(self.fetch_with_retry(&request).await)
            } else {
                None
            }
        };
        let ds_fetch = async {
            match lookahead {
                Some(next) if continues => {
                    let request = FetchRequest::new(next.clone(), DNSResourceType::DS).in_zone(child);
                    Some(self.fetch_with_retry(&request).await)
                }
                _ => None,
            }
        };
        let probe_fetch = async {
            if lookahead.is_none() && continues {
                let request = FetchRequest::new(child.clone(), self.config.probe_type);
                Some(self.fetch_with_retry(&request).await)
            } else {
                None
            }
        };

        let (dnskey_response, ds_response, probe_response) =
            tokio::join!(dnskey_fetch, ds_fetch, probe_fetch);

        let (mut verdict, next_keys) =
            self.evaluate_child(parent_keys, child, expected_digests, dnskey_response);

        let next_digests = match lookahead {
            None => {
                if let Some(response) = probe_response {
                    self.check_probe(&mut verdict, &next_keys, child, response);
                }
                None
            }
            Some(next) => Some(match ds_response {
                Some(response) => self.evaluate_lookahead(&next_keys, next, response),
                None => match next_keys {
                    KeyState::Unsigned => Delegation::ParentInsecure,
                    _ => Delegation::Bogus(format!("parent zone {} is bogus", child)),
                },
            }),
        };

        debug!(
            "Hop {}: {} ({}), next delegation {:?}",
            child,
            verdict.status,
            verdict.reason,
            next_digests.as_ref().map(delegation_label)
        );

        HopOutcome {
            verdict,
            next_keys,
            next_digests,
        }
    }

    fn evaluate_child(
        &self,
        parent_keys: &KeyState,
        child: &DomainName,
        expected: Delegation,
        dnskey_response: Option<FetchResponse>,
    ) -> (ZoneVerdict, KeyState) {
        let parent_name = child.parent().unwrap_or_else(DomainName::root);
        match expected {
            Delegation::ParentInsecure => self.evaluate_insecure(
                child,
                Evidence::InheritedFromParent {
                    parent: parent_name,
                },
                "Parent zone is insecure".to_string(),
                dnskey_response,
            ),
            Delegation::Unsigned { kind } => self.evaluate_insecure(
                child,
                Evidence::DenialProof {
                    outcome: DenialOutcome::DelegationIsUnsigned,
                    record_type: kind.clone(),
                },
                format!("Parent proves there is no DS record ({})", kind),
                dnskey_response,
            ),
            Delegation::NoZoneCut { kind } => {
                let owner = parent_keys.owner().cloned().unwrap_or(parent_name);
                (
                    ZoneVerdict::new(
                        child.clone(),
                        parent_keys.status(),
                        Evidence::InheritedFromParent {
                            parent: owner.clone(),
                        },
                        format!("No zone cut, part of zone {} ({})", owner, kind),
                    ),
                    parent_keys.clone(),
                )
            }
            Delegation::NameAbsent { kind } => (
                ZoneVerdict::new(
                    child.clone(),
                    parent_keys.status(),
                    Evidence::DenialProof {
                        outcome: DenialOutcome::NameDoesNotExist,
                        record_type: kind.clone(),
                    },
                    format!("Name proven not to exist ({})", kind),
                ),
                parent_keys.clone(),
            ),
            Delegation::Bogus(reason) => (
                ZoneVerdict::new(child.clone(), TrustStatus::Bogus, Evidence::None, reason),
                KeyState::Unknown,
            ),
            Delegation::Unavailable(reason) => {
                self.evaluate_unanchored(parent_keys, child, reason, dnskey_response)
            }
            Delegation::Digests {
                records,
                authenticated,
                anchor,
            } => self.evaluate_digests(child, &records, authenticated, anchor, dnskey_response),
        }
    }

    /// Below an insecure cut: the status stays Insecure, but whatever keys
    /// the zone publishes are reported
    fn evaluate_insecure(
        &self,
        child: &DomainName,
        evidence: Evidence,
        reason: String,
        dnskey_response: Option<FetchResponse>,
    ) -> (ZoneVerdict, KeyState) {
        let verdict = |reason: String| {
            ZoneVerdict::new(child.clone(), TrustStatus::Insecure, evidence.clone(), reason)
        };

        let response = match dnskey_response {
            Some(response) if !response.outcome.is_failure() => response,
            Some(response) => {
                debug!(
                    "{}: DNSKEY lookup below insecure delegation failed: {}",
                    child,
                    failure_detail(&response)
                );
                return (verdict(reason), KeyState::Unsigned);
            }
            None => return (verdict(reason), KeyState::Unsigned),
        };

        let Some((rrset, keys, signatures)) = dnskey_set(&response) else {
            return (
                verdict(format!("{}; no DNSKEY records", reason)),
                KeyState::Unsigned,
            );
        };
        let key_infos = keys.iter().map(SigningKey::info).collect();
        let verdict = match self.verifier.verify_rrset(&rrset, &signatures, &keys) {
            SignatureCheck::Valid { timing, .. } => {
                verdict(format!("{}; zone is signed but not anchored", reason))
                    .with_keys(key_infos)
                    .with_signature(Some(timing))
            }
            SignatureCheck::Invalid(e) => {
                verdict(format!("{}; DNSKEY RRset does not verify: {}", reason, e))
                    .with_keys(key_infos)
            }
        };
        (verdict, KeyState::Unsigned)
    }

    /// DS state unknown: keep going with whatever keys verify locally
    fn evaluate_unanchored(
        &self,
        parent_keys: &KeyState,
        child: &DomainName,
        reason: String,
        dnskey_response: Option<FetchResponse>,
    ) -> (ZoneVerdict, KeyState) {
        let reason = format!("Delegation could not be verified: {}", reason);
        let Some((rrset, keys, signatures)) = dnskey_response.as_ref().and_then(dnskey_set) else {
            return (
                ZoneVerdict::new(
                    child.clone(),
                    TrustStatus::Indeterminate,
                    Evidence::None,
                    reason,
                ),
                parent_keys.demoted(),
            );
        };
        let key_infos = keys.iter().map(SigningKey::info).collect();
        match self.verifier.verify_rrset(&rrset, &signatures, &keys) {
            SignatureCheck::Valid { key, timing } => (
                ZoneVerdict::new(
                    child.clone(),
                    TrustStatus::Indeterminate,
                    Evidence::MatchedKey { key },
                    reason,
                )
                .with_keys(key_infos)
                .with_signature(Some(timing)),
                KeyState::Local(keys),
            ),
            SignatureCheck::Invalid(e) => (
                ZoneVerdict::new(
                    child.clone(),
                    TrustStatus::Indeterminate,
                    Evidence::None,
                    format!("{}; DNSKEY RRset does not verify: {}", reason, e),
                )
                .with_keys(key_infos),
                KeyState::Unknown,
            ),
        }
    }

    fn evaluate_digests(
        &self,
        child: &DomainName,
        records: &[DelegationDigest],
        authenticated: bool,
        anchor: bool,
        dnskey_response: Option<FetchResponse>,
    ) -> (ZoneVerdict, KeyState) {
        let indeterminate = |reason: String| {
            (
                ZoneVerdict::new(child.clone(), TrustStatus::Indeterminate, Evidence::None, reason),
                KeyState::Unknown,
            )
        };

        if records.is_empty() {
            return indeterminate("No trust anchor or DS records available".to_string());
        }

        let usable: Vec<&DelegationDigest> = records.iter().filter(|ds| ds.is_usable()).collect();
        if usable.is_empty() {
            let digests = records.iter().map(|ds| ds.info(None)).collect();
            let (status, keys) = if authenticated {
                (TrustStatus::Insecure, KeyState::Unsigned)
            } else {
                (TrustStatus::Indeterminate, KeyState::Unknown)
            };
            return (
                ZoneVerdict::new(
                    child.clone(),
                    status,
                    Evidence::None,
                    "No DS record uses a supported algorithm and digest type",
                )
                .with_digests(digests),
                keys,
            );
        }

        let response = match dnskey_response {
            Some(response) if response.outcome.is_failure() => {
                return indeterminate(format!(
                    "DNSKEY lookup failed: {}",
                    failure_detail(&response)
                ));
            }
            Some(response) => response,
            None => return indeterminate("DNSKEY lookup was not performed".to_string()),
        };

        let Some((dnskey_rrset, keys, signatures)) = dnskey_set(&response) else {
            let digests = records.iter().map(|ds| ds.info(None)).collect();
            return (
                ZoneVerdict::new(
                    child.clone(),
                    TrustStatus::Bogus,
                    Evidence::None,
                    format!("DS records exist but the zone has no DNSKEY records ({})", response.outcome),
                )
                .with_digests(digests),
                KeyState::Unknown,
            );
        };
        let key_infos: Vec<_> = keys.iter().map(SigningKey::info).collect();

        let mut digest_infos = Vec::with_capacity(records.len());
        let mut matched: Vec<(&DelegationDigest, &SigningKey)> = Vec::new();
        let mut failures = Vec::new();
        for ds in records {
            let key = ds
                .is_usable()
                .then(|| self.verifier.verify_digest(&keys, ds))
                .flatten();
            digest_infos.push(ds.info(key.map(|k| k.key_tag)));
            match key {
                Some(key) => matched.push((ds, key)),
                None if !ds.is_usable() => {}
                None if keys.iter().any(|k| k.key_tag == ds.key_tag) => {
                    failures.push(format!("DS tag={} digest mismatch", ds.key_tag))
                }
                None => failures.push(format!("DS tag={} no matching DNSKEY", ds.key_tag)),
            }
        }

        if matched.is_empty() {
            warn!("{}: no DS record matches a DNSKEY", child);
            return (
                ZoneVerdict::new(
                    child.clone(),
                    TrustStatus::Bogus,
                    Evidence::None,
                    format!("DS validation failed: {}", failures.join("; ")),
                )
                .with_keys(key_infos)
                .with_digests(digest_infos),
                KeyState::Unknown,
            );
        }

        let entry_keys: Vec<SigningKey> = matched.iter().map(|(_, k)| (*k).clone()).collect();
        let (timing, signing_key) =
            match self.verifier.verify_rrset(&dnskey_rrset, &signatures, &entry_keys) {
                SignatureCheck::Valid { key, timing } => (timing, key),
                SignatureCheck::Invalid(e) => {
                    warn!("{}: DNSKEY RRset signature invalid: {}", child, e);
                    return (
                        ZoneVerdict::new(
                            child.clone(),
                            TrustStatus::Bogus,
                            Evidence::None,
                            format!("DNSKEY RRset signature invalid: {}", e),
                        )
                        .with_keys(key_infos)
                        .with_digests(digest_infos),
                        KeyState::Unknown,
                    );
                }
            };

        let tags: BTreeSet<u16> = matched.iter().map(|(_, k)| k.key_tag).collect();
        let tag_list = tags
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let source = if anchor { "Trust anchor" } else { "DS" };
        let reason = if records.len() > 1 {
            format!(
                "{} validates DNSKEY {} ({}/{} DS records)",
                source,
                tag_list,
                matched.len(),
                records.len()
            )
        } else {
            format!("{} validates DNSKEY {}", source, tag_list)
        };

        let (ds, _) = matched
            .iter()
            .find(|(_, k)| k.key_tag == signing_key.key_tag)
            .unwrap_or(&matched[0]);
        let digest = ds.info(Some(signing_key.key_tag));
        let evidence = if anchor {
            Evidence::TrustAnchor {
                key: signing_key.clone(),
                digest,
            }
        } else {
            Evidence::MatchedDigest {
                key: signing_key.clone(),
                digest,
                matched: matched.len(),
                total: records.len(),
            }
        };

        let verdict = |status, reason: String| {
            ZoneVerdict::new(child.clone(), status, evidence.clone(), reason)
                .with_keys(key_infos.clone())
                .with_digests(digest_infos.clone())
                .with_signature(Some(timing.clone()))
        };

        if authenticated {
            (verdict(TrustStatus::Secure, reason), KeyState::Trusted(keys))
        } else {
            (
                verdict(
                    TrustStatus::Indeterminate,
                    format!("{}, but the DS records are not authenticated", reason),
                ),
                KeyState::Local(keys),
            )
        }
    }

    /// Judge the DS answer for `next` with the keys of the zone above it
    fn evaluate_lookahead(
        &self,
        zone_keys: &KeyState,
        next: &DomainName,
        response: FetchResponse,
    ) -> Delegation {
        if let KeyState::Unsigned = zone_keys {
            return Delegation::ParentInsecure;
        }
        if response.outcome.is_failure() {
            return Delegation::Unavailable(format!(
                "DS lookup for {} failed: {}",
                next,
                failure_detail(&response)
            ));
        }

        match (&response.answer, zone_keys) {
            (Some(answer), _) if answer.rtype == DNSResourceType::CNAME => {
                self.delegation_from_alias(zone_keys, next, answer, &response.signatures)
            }
            (Some(answer), _) if answer.rtype != DNSResourceType::DS => {
                Delegation::Unavailable(format!("DS query for {} returned {}", next, answer.rtype))
            }
            (Some(answer), KeyState::Trusted(keys)) => {
                match self.verifier.verify_rrset(answer, &response.signatures, keys) {
                    SignatureCheck::Valid { .. } => Delegation::Digests {
                        records: DelegationDigest::from_rrset(answer),
                        authenticated: true,
                        anchor: false,
                    },
                    SignatureCheck::Invalid(e) => {
                        warn!("DS RRset for {} does not verify: {}", next, e);
                        Delegation::Bogus(format!("DS RRset signature invalid: {}", e))
                    }
                }
            }
            (Some(answer), _) => Delegation::Digests {
                records: DelegationDigest::from_rrset(answer),
                authenticated: false,
                anchor: false,
            },
            (None, KeyState::Trusted(keys) | KeyState::Local(keys)) => {
                let Some(proof) = &response.denial else {
                    return Delegation::Unavailable(format!(
                        "{} for DS {} carries no denial proof",
                        response.outcome, next
                    ));
                };
                let trusted = matches!(zone_keys, KeyState::Trusted(_));
                self.delegation_from_denial(proof, keys, next, trusted)
            }
            (None, _) => Delegation::Unavailable(format!(
                "cannot verify DS denial for {} without zone keys",
                next
            )),
        }
    }

    /// An alias owner cannot be a zone cut, so a CNAME that verifies keeps
    /// `next` inside the zone above it
    fn delegation_from_alias(
        &self,
        zone_keys: &KeyState,
        next: &DomainName,
        answer: &RecordSet,
        signatures: &[Signature],
    ) -> Delegation {
        let keys = match zone_keys {
            KeyState::Trusted(keys) | KeyState::Local(keys) => keys,
            KeyState::Unsigned | KeyState::Unknown => {
                return Delegation::Unavailable(format!(
                    "cannot verify CNAME at {} without zone keys",
                    next
                ));
            }
        };
        match self.verifier.verify_rrset(answer, signatures, keys) {
            SignatureCheck::Valid { .. } => Delegation::NoZoneCut {
                kind: "CNAME".to_string(),
            },
            SignatureCheck::Invalid(e) if matches!(zone_keys, KeyState::Trusted(_)) => {
                warn!("CNAME at {} does not verify: {}", next, e);
                Delegation::Bogus(format!("CNAME RRset signature invalid: {}", e))
            }
            SignatureCheck::Invalid(e) => {
                Delegation::Unavailable(format!("CNAME at {} does not verify: {}", next, e))
            }
        }
    }

    fn delegation_from_denial(
        &self,
        proof: &DenialProof,
        keys: &[SigningKey],
        next: &DomainName,
        trusted: bool,
    ) -> Delegation {
        let kind = proof.kind().to_string();
        match self
            .denial_evaluator()
            .evaluate(proof, keys, next, DNSResourceType::DS)
        {
            DenialOutcome::DelegationIsUnsigned if trusted => Delegation::Unsigned { kind },
            DenialOutcome::DelegationIsUnsigned => Delegation::Unavailable(format!(
                "unsigned delegation of {} is not anchored",
                next
            )),
            DenialOutcome::TypeDoesNotExistAtName => Delegation::NoZoneCut { kind },
            DenialOutcome::NameDoesNotExist => Delegation::NameAbsent { kind },
            DenialOutcome::Inconclusive => {
                Delegation::Unavailable(format!("{} proof for DS {} is inconclusive", kind, next))
            }
        }
    }

    /// Check the probe record at the target; only a secure verdict can change
    fn check_probe(
        &self,
        verdict: &mut ZoneVerdict,
        keys: &KeyState,
        target: &DomainName,
        response: FetchResponse,
    ) {
        let (KeyState::Trusted(keys), TrustStatus::Secure) = (keys, verdict.status) else {
            return;
        };
        let probe = self.config.probe_type;

        if response.outcome.is_failure() {
            verdict.status = TrustStatus::Indeterminate;
            verdict.reason = format!(
                "{}; {} lookup failed: {}",
                verdict.reason,
                probe,
                failure_detail(&response)
            );
            return;
        }

        if let Some(answer) = &response.answer {
            match self.verifier.verify_rrset(answer, &response.signatures, keys) {
                SignatureCheck::Valid { .. } => {
                    trace!("{} {} verified", target, answer.rtype);
                }
                SignatureCheck::Invalid(e) => {
                    warn!("{} {} signature invalid: {}", target, answer.rtype, e);
                    verdict.status = TrustStatus::Bogus;
                    verdict.reason = format!("{} RRset signature invalid: {}", answer.rtype, e);
                }
            }
            return;
        }

        let outcome = response
            .denial
            .as_ref()
            .map(|proof| self.denial_evaluator().evaluate(proof, keys, target, probe))
            .unwrap_or(DenialOutcome::Inconclusive);
        match outcome {
            DenialOutcome::NameDoesNotExist | DenialOutcome::TypeDoesNotExistAtName => {
                verdict.reason = format!("{}; {} {}", verdict.reason, probe, outcome);
            }
            DenialOutcome::DelegationIsUnsigned | DenialOutcome::Inconclusive => {
                verdict.status = TrustStatus::Indeterminate;
                verdict.reason = format!(
                    "{}; denial of {} {} could not be verified",
                    verdict.reason, target, probe
                );
            }
        }
    }

    async fn fetch_with_retry(&self, request: &FetchRequest) -> FetchResponse {
        fetch_with_retry(self.config, self.source, request).await
    }
}

/// One fetch, retried against the resolvers in rotation
pub(crate) async fn fetch_with_retry(
    config: &ChainConfig,
    source: &dyn RecordSource,
    request: &FetchRequest,
) -> FetchResponse {
    let resolvers = &config.resolvers;
    let max_retries = config.retries as usize;
    let per_attempt = config.timeout();
    let mut last = FetchResponse::failure(
        QueryOutcome::NetworkError,
        FetchError::Io("no resolvers configured".to_string()),
    );

    if resolvers.is_empty() {
        return last;
    }

    for retry in 0..=max_retries {
        let resolver = resolvers[retry % resolvers.len()];
        if retry > 0 {
            sleep(config.retry_backoff() * retry as u32).await;
            debug!("Retry {} for {} using {}", retry, request, resolver);
        }

        let response = match timeout(per_attempt, source.fetch(request, resolver)).await {
            Ok(response) => response,
            Err(_) => FetchResponse::failure(
                QueryOutcome::Timeout,
                FetchError::Timeout(config.timeout_ms),
            ),
        };

        if !response.outcome.is_retryable() {
            return response;
        }
        debug!(
            "{} via {} failed: {}",
            request,
            resolver,
            failure_detail(&response)
        );
        last = response;
    }

    warn!(
        "{} failed after {} attempts: {}",
        request,
        max_retries + 1,
        failure_detail(&last)
    );
    last
}

/// DNSKEY RRset, its parsed keys and its signatures, if the answer has any
fn dnskey_set(response: &FetchResponse) -> Option<(RecordSet, Vec<SigningKey>, Vec<Signature>)> {
    let answer = response.answer.as_ref()?;
    if answer.rtype != DNSResourceType::DNSKEY {
        return None;
    }
    let keys = SigningKey::from_rrset(answer);
    if keys.is_empty() {
        return None;
    }
    Some((answer.clone(), keys, response.signatures.clone()))
}

fn failure_detail(response: &FetchResponse) -> String {
    match &response.error {
        Some(e) => format!("{} ({})", response.outcome, e),
        None => response.outcome.to_string(),
    }
}

fn delegation_label(delegation: &Delegation) -> &'static str {
    match delegation {
        Delegation::Digests { anchor: true, .. } => "anchor",
        Delegation::Digests {
            authenticated: true,
            ..
        } => "signed DS",
        Delegation::Digests { .. } => "unauthenticated DS",
        Delegation::Unsigned { .. } => "unsigned",
        Delegation::NoZoneCut { .. } => "no zone cut",
        Delegation::NameAbsent { .. } => "name absent",
        Delegation::ParentInsecure => "parent insecure",
        Delegation::Bogus(_) => "bogus",
        Delegation::Unavailable(_) => "unavailable",
    }
}
