//! Shared fixtures: a signed in-memory DNS hierarchy served by a scripted
//! record source, so chain walks run without the network.

#![allow(dead_code)] // each test file uses a different subset

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dnssec_chain::chain::ChainWalker;
use dnssec_chain::config::ChainConfig;
use dnssec_chain::dns::enums::DNSResourceType;
use dnssec_chain::dns::name::DomainName;
use dnssec_chain::dnssec::canonical::signed_data;
use dnssec_chain::dnssec::denial::{encode_hash_label, nsec3_hash};
use dnssec_chain::dnssec::records::{DenialEntry, TypeBitmap};
use dnssec_chain::dnssec::{
    CryptoVerifier, DelegationDigest, DenialProof, DenialRecord, DigestType, RecordSet, Signature,
    SigningKey, TrustAnchor, TrustAnchorStore,
};
use dnssec_chain::error::FetchError;
use dnssec_chain::fetcher::{FetchRequest, FetchResponse, QueryOutcome, RecordSource};
use ring::signature::{Ed25519KeyPair, KeyPair};

pub const DAY: i64 = 86_400;

pub fn name(s: &str) -> DomainName {
    DomainName::parse(s).unwrap()
}

/// Signature validity window relative to the fixture clock
#[derive(Debug, Clone, Copy)]
pub struct Validity {
    pub inception: i64,
    pub expiration: i64,
}

impl Validity {
    pub fn current(now: i64) -> Self {
        Self {
            inception: now - DAY,
            expiration: now + 30 * DAY,
        }
    }

    pub fn expired(now: i64) -> Self {
        Self {
            inception: now - 40 * DAY,
            expiration: now - 10 * DAY,
        }
    }
}

fn generate_pair() -> Ed25519KeyPair {
    let rng = ring::rand::SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
    Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap()
}

/// A zone with an Ed25519 KSK and ZSK
pub struct TestZone {
    pub name: DomainName,
    ksk_pair: Ed25519KeyPair,
    zsk_pair: Ed25519KeyPair,
    pub ksk: SigningKey,
    pub zsk: SigningKey,
}

impl TestZone {
    pub fn new(zone: &str) -> Self {
        let name = name(zone);
        let ksk_pair = generate_pair();
        let zsk_pair = generate_pair();
        let ksk = SigningKey::new(name.clone(), 257, 15, ksk_pair.public_key().as_ref().to_vec());
        let zsk = SigningKey::new(name.clone(), 256, 15, zsk_pair.public_key().as_ref().to_vec());
        Self {
            name,
            ksk_pair,
            zsk_pair,
            ksk,
            zsk,
        }
    }

    pub fn dnskey_rrset(&self) -> RecordSet {
        RecordSet::new(self.name.clone(), DNSResourceType::DNSKEY, 3600)
            .with_rdata(self.ksk.rdata())
            .with_rdata(self.zsk.rdata())
    }

    /// DS for the KSK, as the parent publishes it
    pub fn ds(&self) -> DelegationDigest {
        DelegationDigest::for_key(&self.ksk, DigestType::Sha256).unwrap()
    }

    pub fn trust_anchor(&self) -> TrustAnchor {
        TrustAnchor(self.ds())
    }

    pub fn sign_with_ksk(&self, rrset: &RecordSet, validity: Validity) -> Signature {
        sign(&self.ksk_pair, &self.ksk, rrset, validity)
    }

    pub fn sign_with_zsk(&self, rrset: &RecordSet, validity: Validity) -> Signature {
        sign(&self.zsk_pair, &self.zsk, rrset, validity)
    }
}

pub fn sign(pair: &Ed25519KeyPair, key: &SigningKey, rrset: &RecordSet, validity: Validity) -> Signature {
    let mut sig = Signature {
        owner: rrset.owner.clone(),
        type_covered: rrset.rtype,
        algorithm: key.algorithm,
        labels: rrset.owner.label_count() as u8,
        original_ttl: rrset.ttl,
        expiration: validity.expiration as u32,
        inception: validity.inception as u32,
        key_tag: key.key_tag,
        signer: key.owner.clone(),
        signature: Vec::new(),
    };
    sig.signature = pair.sign(&signed_data(rrset, &sig).unwrap()).as_ref().to_vec();
    sig
}

/// Response served for one owner/type pair
#[derive(Debug, Clone)]
pub struct Script {
    pub response: FetchResponse,
    pub delay: Option<Duration>,
}

/// In-memory record source answering from scripts. Unscripted queries
/// get SERVFAIL.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<(DomainName, DNSResourceType), Script>>,
    /// Answers from one server only, checked before `scripts`
    scripts_at: Mutex<HashMap<(SocketAddr, DomainName, DNSResourceType), FetchResponse>>,
    log: Mutex<Vec<(FetchRequest, SocketAddr)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    default_delay: Mutex<Option<Duration>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn set(&self, owner: &DomainName, rtype: DNSResourceType, response: FetchResponse) {
        self.scripts.lock().unwrap().insert(
            (owner.clone(), rtype),
            Script {
                response,
                delay: None,
            },
        );
    }

    /// Answer `owner`/`rtype` differently when asked at `server`
    pub fn set_at(
        &self,
        server: SocketAddr,
        owner: &DomainName,
        rtype: DNSResourceType,
        response: FetchResponse,
    ) {
        self.scripts_at
            .lock()
            .unwrap()
            .insert((server, owner.clone(), rtype), response);
    }

    pub fn delay(&self, owner: &DomainName, rtype: DNSResourceType, delay: Duration) {
        if let Some(script) = self.scripts.lock().unwrap().get_mut(&(owner.clone(), rtype)) {
            script.delay = Some(delay);
        }
    }

    /// Delay applied to every scripted answer without its own delay
    pub fn delay_all(&self, delay: Duration) {
        *self.default_delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<(FetchRequest, SocketAddr)> {
        self.log.lock().unwrap().clone()
    }

    pub fn request_count(&self, owner: &DomainName, rtype: DNSResourceType) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| &r.owner == owner && r.rtype == rtype)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch(&self, request: &FetchRequest, resolver: SocketAddr) -> FetchResponse {
        self.log.lock().unwrap().push((request.clone(), resolver));
        let direct = self
            .scripts_at
            .lock()
            .unwrap()
            .get(&(resolver, request.owner.clone(), request.rtype))
            .cloned();
        if let Some(response) = direct {
            return response;
        }
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&(request.owner.clone(), request.rtype))
            .cloned();
        let default_delay = *self.default_delay.lock().unwrap();

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        match script {
            Some(script) => {
                if let Some(delay) = script.delay.or(default_delay) {
                    tokio::time::sleep(delay).await;
                }
                script.response
            }
            None => FetchResponse::failure(QueryOutcome::ServerFailure, FetchError::ServerFailure(2)),
        }
    }
}

/// Root, `com.` and `example.com.` signed with fresh keys, plus helpers to
/// script every answer a walk needs
pub struct TestHierarchy {
    pub now: i64,
    pub root: TestZone,
    pub com: TestZone,
    pub example: TestZone,
    pub source: Arc<ScriptedSource>,
}

impl TestHierarchy {
    /// Fully signed chain for `example.com.` and `www.example.com.`
    pub fn secure() -> Self {
        let hierarchy = Self {
            now: Utc::now().timestamp(),
            root: TestZone::new("."),
            com: TestZone::new("com"),
            example: TestZone::new("example.com"),
            source: Arc::new(ScriptedSource::default()),
        };
        let valid = hierarchy.valid();

        hierarchy.script_dnskey(&hierarchy.root, valid);
        hierarchy.script_dnskey(&hierarchy.com, valid);
        hierarchy.script_dnskey(&hierarchy.example, valid);
        hierarchy.script_ds(&hierarchy.root, &hierarchy.com, valid);
        hierarchy.script_ds(&hierarchy.com, &hierarchy.example, valid);

        let www = name("www.example.com");
        hierarchy.script_no_zone_cut(&hierarchy.example, &www);
        hierarchy.script_a(&hierarchy.example, &name("example.com"), [192, 0, 2, 1], valid);
        hierarchy.script_a(&hierarchy.example, &www, [192, 0, 2, 2], valid);
        hierarchy
    }

    pub fn valid(&self) -> Validity {
        Validity::current(self.now)
    }

    pub fn config() -> ChainConfig {
        ChainConfig {
            resolvers: vec![
                "192.0.2.53:53".parse().unwrap(),
                "192.0.2.54:53".parse().unwrap(),
            ],
            timeout_ms: 1_000,
            retries: 1,
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    pub fn anchors(&self) -> TrustAnchorStore {
        let mut store = TrustAnchorStore::empty();
        store.add_anchor(self.root.trust_anchor());
        store
    }

    pub fn walker(&self) -> ChainWalker {
        self.walker_with(Self::config(), self.anchors())
    }

    pub fn walker_with(&self, config: ChainConfig, anchors: TrustAnchorStore) -> ChainWalker {
        let verifier = CryptoVerifier::new(config.clock_skew_tolerance_sec).with_current_time(self.now);
        ChainWalker::new(config, self.source.clone(), anchors).with_verifier(verifier)
    }

    pub fn script_dnskey(&self, zone: &TestZone, validity: Validity) {
        let rrset = zone.dnskey_rrset();
        let sig = zone.sign_with_ksk(&rrset, validity);
        self.source.set(
            &zone.name,
            DNSResourceType::DNSKEY,
            FetchResponse::answered(rrset, vec![sig]),
        );
    }

    pub fn script_ds(&self, parent: &TestZone, child: &TestZone, validity: Validity) {
        self.script_ds_records(parent, &child.name, vec![child.ds()], validity);
    }

    pub fn script_ds_records(
        &self,
        parent: &TestZone,
        child: &DomainName,
        records: Vec<DelegationDigest>,
        validity: Validity,
    ) {
        let mut rrset = RecordSet::new(child.clone(), DNSResourceType::DS, 3600);
        for ds in records {
            rrset = rrset.with_rdata(ds.rdata());
        }
        let sig = parent.sign_with_zsk(&rrset, validity);
        self.source
            .set(child, DNSResourceType::DS, FetchResponse::answered(rrset, vec![sig]));
    }

    pub fn script_a(&self, zone: &TestZone, owner: &DomainName, addr: [u8; 4], validity: Validity) {
        let rrset = RecordSet::new(owner.clone(), DNSResourceType::A, 300).with_rdata(addr.to_vec());
        let sig = zone.sign_with_zsk(&rrset, validity);
        self.source
            .set(owner, DNSResourceType::A, FetchResponse::answered(rrset, vec![sig]));
    }

    /// Signed NSEC at `owner` listing `types`, served for a DS query
    pub fn script_ds_nsec(&self, zone: &TestZone, owner: &DomainName, types: &[DNSResourceType]) {
        let next = owner
            .parent()
            .and_then(|parent| parent.prepend("zzz"))
            .unwrap();
        let record = DenialRecord::Nsec {
            owner: owner.clone(),
            next,
            types: TypeBitmap::from_types(types.iter().copied()),
        };
        let proof = self.signed_proof(zone, vec![record]);
        self.source.set(
            owner,
            DNSResourceType::DS,
            FetchResponse::negative(QueryOutcome::NoData, Some(proof)),
        );
    }

    /// `owner` is an ordinary name inside `zone`
    pub fn script_no_zone_cut(&self, zone: &TestZone, owner: &DomainName) {
        self.script_ds_nsec(
            zone,
            owner,
            &[DNSResourceType::A, DNSResourceType::RRSIG, DNSResourceType::NSEC],
        );
    }

    /// `owner` is delegated from `zone` without a DS record
    pub fn script_unsigned_delegation(&self, zone: &TestZone, owner: &DomainName) {
        self.script_ds_nsec(
            zone,
            owner,
            &[DNSResourceType::NS, DNSResourceType::RRSIG, DNSResourceType::NSEC],
        );
    }

    /// Negative answer for `owner`/`rtype` carrying `records` signed by `zone`
    pub fn script_denial(
        &self,
        zone: &TestZone,
        owner: &DomainName,
        rtype: DNSResourceType,
        outcome: QueryOutcome,
        records: Vec<DenialRecord>,
    ) {
        let proof = self.signed_proof(zone, records);
        self.source
            .set(owner, rtype, FetchResponse::negative(outcome, Some(proof)));
    }

    pub fn signed_proof(&self, zone: &TestZone, records: Vec<DenialRecord>) -> DenialProof {
        let valid = self.valid();
        let entries = records
            .into_iter()
            .map(|record| {
                let rrset = RecordSet::new(record.owner().clone(), record.rtype(), 3600)
                    .with_rdata(record.rdata());
                let signatures = vec![zone.sign_with_zsk(&rrset, valid)];
                DenialEntry {
                    record,
                    rrset,
                    signatures,
                }
            })
            .collect();
        DenialProof { entries }
    }
}

/// Hash one step past `name`'s, so a record at `name` covers nothing else
pub fn hash_after(name: &DomainName) -> Vec<u8> {
    let mut hash = nsec3_hash(name, &[], 0);
    for byte in hash.iter_mut().rev() {
        let (value, carry) = byte.overflowing_add(1);
        *byte = value;
        if !carry {
            break;
        }
    }
    hash
}

/// NSEC3 record in `zone` whose owner is the hash of `hashed_name`
pub fn nsec3_at(
    zone: &DomainName,
    hashed_name: &DomainName,
    next_hashed: Vec<u8>,
    opt_out: bool,
    types: &[DNSResourceType],
) -> DenialRecord {
    let owner_hash = nsec3_hash(hashed_name, &[], 0);
    nsec3_with_owner_hash(zone, &owner_hash, next_hashed, opt_out, types)
}

pub fn nsec3_with_owner_hash(
    zone: &DomainName,
    owner_hash: &[u8],
    next_hashed: Vec<u8>,
    opt_out: bool,
    types: &[DNSResourceType],
) -> DenialRecord {
    DenialRecord::Nsec3 {
        owner: zone.prepend(&encode_hash_label(owner_hash)).unwrap(),
        hash_algorithm: 1,
        flags: u8::from(opt_out),
        iterations: 0,
        salt: Vec::new(),
        next_hashed,
        types: TypeBitmap::from_types(types.iter().copied()),
    }
}
