mod common;

use std::time::Duration;

use common::{
    TestHierarchy, TestZone, Validity, hash_after, name, nsec3_at, nsec3_with_owner_hash,
};
use dnssec_chain::chain::{Evidence, TrustStatus};
use dnssec_chain::dns::enums::DNSResourceType;
use dnssec_chain::dnssec::records::TypeBitmap;
use dnssec_chain::dnssec::{DenialOutcome, DenialRecord, RecordSet};
use dnssec_chain::fetcher::{FetchResponse, QueryOutcome};
use dnssec_chain::{CancelToken, ChainConfig, ChainError};

const APEX_TYPES: &[DNSResourceType] = &[
    DNSResourceType::NS,
    DNSResourceType::SOA,
    DNSResourceType::RRSIG,
    DNSResourceType::NSEC,
    DNSResourceType::DNSKEY,
];

fn statuses(result: &dnssec_chain::ChainResult) -> Vec<TrustStatus> {
    result.verdicts.iter().map(|v| v.status).collect()
}

fn zones(result: &dnssec_chain::ChainResult) -> Vec<String> {
    result.verdicts.iter().map(|v| v.zone.to_string()).collect()
}

#[tokio::test]
async fn test_fully_signed_chain_is_secure() {
    let hierarchy = TestHierarchy::secure();
    let result = hierarchy
        .walker()
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        zones(&result),
        vec![".", "com.", "example.com.", "www.example.com."]
    );
    assert_eq!(statuses(&result), vec![TrustStatus::Secure; 4]);
    assert_eq!(result.overall_status, TrustStatus::Secure);
    assert_eq!(
        result.overall_reason,
        "Chain of trust is intact from root to www.example.com."
    );

    assert!(matches!(result.verdicts[0].evidence, Evidence::TrustAnchor { .. }));
    assert!(matches!(
        result.verdicts[1].evidence,
        Evidence::MatchedDigest { matched: 1, total: 1, .. }
    ));
    assert_eq!(
        result.verdicts[3].evidence,
        Evidence::InheritedFromParent {
            parent: name("example.com")
        }
    );
    assert_eq!(
        result.explanation[0],
        format!(".: Trust anchor validates DNSKEY {}", hierarchy.root.ksk.key_tag)
    );
    assert_eq!(
        result.explanation[2],
        format!("example.com.: DS validates DNSKEY {}", hierarchy.example.ksk.key_tag)
    );
}

#[tokio::test]
async fn test_secure_zone_reports_keys_and_timing() {
    let hierarchy = TestHierarchy::secure();
    let result = hierarchy
        .walker()
        .validate("Example.COM.", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.target, name("example.com"));
    assert_eq!(result.overall_status, TrustStatus::Secure);

    let zone = &result.verdicts[2];
    assert_eq!(zone.keys.len(), 2);
    assert_eq!(zone.digests.len(), 1);
    assert_eq!(zone.digests[0].validates_key, Some(hierarchy.example.ksk.key_tag));
    let timing = zone.signature.as_ref().unwrap();
    assert_eq!(timing.key_tag, hierarchy.example.ksk.key_tag);
    assert_eq!(timing.days_until_expiry, 30);
    assert_eq!(result.resolvers, vec!["192.0.2.53:53", "192.0.2.54:53"]);
}

#[tokio::test]
async fn test_unsigned_delegation_caps_descendants() {
    let hierarchy = TestHierarchy::secure();
    let unsigned = name("unsigned.com");
    hierarchy.script_unsigned_delegation(&hierarchy.com, &unsigned);

    let result = hierarchy
        .walker()
        .validate("www.unsigned.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![
            TrustStatus::Secure,
            TrustStatus::Secure,
            TrustStatus::Insecure,
            TrustStatus::Insecure
        ]
    );
    assert_eq!(result.overall_status, TrustStatus::Insecure);
    assert_eq!(
        result.overall_reason,
        "Chain breaks at unsigned.com.: Parent proves there is no DS record (NSEC)"
    );
    assert_eq!(result.verdicts[3].reason, "Parent zone is insecure");
    assert!(result.verdicts[2].keys.is_empty());
    // keys are still looked up for reporting, but no DS below the cut
    assert_eq!(
        hierarchy
            .source
            .request_count(&unsigned, DNSResourceType::DNSKEY),
        2
    );
    assert_eq!(
        hierarchy
            .source
            .request_count(&name("www.unsigned.com"), DNSResourceType::DS),
        0
    );
}

#[tokio::test]
async fn test_signed_zone_below_unsigned_delegation_stays_insecure() {
    let hierarchy = TestHierarchy::secure();
    let island = TestZone::new("unsigned.com");
    hierarchy.script_unsigned_delegation(&hierarchy.com, &island.name);
    hierarchy.script_dnskey(&island, hierarchy.valid());

    let result = hierarchy
        .walker()
        .validate("www.unsigned.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.overall_status, TrustStatus::Insecure);
    let zone = &result.verdicts[2];
    assert_eq!(zone.status, TrustStatus::Insecure);
    assert_eq!(
        zone.reason,
        "Parent proves there is no DS record (NSEC); zone is signed but not anchored"
    );
    assert_eq!(zone.keys.len(), 2);
    assert_eq!(
        zone.signature.as_ref().unwrap().key_tag,
        island.ksk.key_tag
    );
    assert_eq!(result.verdicts[3].status, TrustStatus::Insecure);
}

#[tokio::test]
async fn test_unsigned_delegation_with_broken_keys_stays_insecure() {
    let hierarchy = TestHierarchy::secure();
    let island = TestZone::new("unsigned.com");
    hierarchy.script_unsigned_delegation(&hierarchy.com, &island.name);
    hierarchy.script_dnskey(&island, Validity::expired(hierarchy.now));

    let result = hierarchy
        .walker()
        .validate("unsigned.com", &CancelToken::never())
        .await
        .unwrap();

    let zone = &result.verdicts[2];
    assert_eq!(zone.status, TrustStatus::Insecure);
    assert!(
        zone.reason
            .contains("; DNSKEY RRset does not verify: signature expired"),
        "{}",
        zone.reason
    );
    assert_eq!(zone.keys.len(), 2);
    assert!(zone.signature.is_none());
}

#[tokio::test]
async fn test_configured_anchor_restores_security_below_unsigned_delegation() {
    let hierarchy = TestHierarchy::secure();
    let island = TestZone::new("unsigned.com");
    let valid = hierarchy.valid();
    hierarchy.script_unsigned_delegation(&hierarchy.com, &island.name);
    hierarchy.script_dnskey(&island, valid);
    let www = name("www.unsigned.com");
    hierarchy.script_no_zone_cut(&island, &www);
    hierarchy.script_a(&island, &www, [198, 51, 100, 7], valid);

    let mut anchors = hierarchy.anchors();
    anchors.add_anchor(island.trust_anchor());
    let result = hierarchy
        .walker_with(TestHierarchy::config(), anchors)
        .validate("www.unsigned.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(statuses(&result), vec![TrustStatus::Secure; 4]);
    assert!(matches!(result.verdicts[2].evidence, Evidence::TrustAnchor { .. }));
}

#[tokio::test]
async fn test_ds_mismatch_is_bogus_and_stops_walk() {
    let hierarchy = TestHierarchy::secure();
    let mut wrong = hierarchy.example.ds();
    wrong.digest[0] ^= 0xff;
    hierarchy.script_ds_records(&hierarchy.com, &name("example.com"), vec![wrong], hierarchy.valid());

    let result = hierarchy
        .walker()
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![TrustStatus::Secure, TrustStatus::Secure, TrustStatus::Bogus]
    );
    assert_eq!(result.overall_status, TrustStatus::Bogus);
    assert_eq!(
        result.verdicts[2].reason,
        format!(
            "DS validation failed: DS tag={} digest mismatch",
            hierarchy.example.ksk.key_tag
        )
    );
    assert!(result.overall_reason.starts_with("Chain breaks at example.com.:"));
    assert_eq!(
        hierarchy
            .source
            .request_count(&name("www.example.com"), DNSResourceType::A),
        0
    );
}

#[tokio::test]
async fn test_any_matching_ds_suffices() {
    let hierarchy = TestHierarchy::secure();
    let mut stale = hierarchy.example.ds();
    stale.key_tag = stale.key_tag.wrapping_add(1);
    stale.digest[0] ^= 0xff;
    let mut unsupported = hierarchy.example.ds();
    unsupported.algorithm = 253;
    hierarchy.script_ds_records(
        &hierarchy.com,
        &name("example.com"),
        vec![stale, unsupported, hierarchy.example.ds()],
        hierarchy.valid(),
    );

    let result = hierarchy
        .walker()
        .validate("example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.overall_status, TrustStatus::Secure);
    assert_eq!(
        result.verdicts[2].reason,
        format!(
            "DS validates DNSKEY {} (1/3 DS records)",
            hierarchy.example.ksk.key_tag
        )
    );
}

#[tokio::test]
async fn test_timeouts_are_indeterminate_and_walk_continues() {
    let hierarchy = TestHierarchy::secure();
    let com = name("com");
    hierarchy
        .source
        .delay(&com, DNSResourceType::DNSKEY, Duration::from_millis(500));

    let config = dnssec_chain::ChainConfig {
        timeout_ms: 50,
        ..TestHierarchy::config()
    };
    let result = hierarchy
        .walker_with(config, hierarchy.anchors())
        .validate("example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![
            TrustStatus::Secure,
            TrustStatus::Indeterminate,
            TrustStatus::Indeterminate
        ]
    );
    assert_eq!(result.overall_status, TrustStatus::Indeterminate);
    assert!(result.verdicts[1].reason.starts_with("DNSKEY lookup failed: timeout"));
    // the next zone still checks out locally
    assert!(matches!(result.verdicts[2].evidence, Evidence::MatchedDigest { .. }));

    // one attempt plus one retry, rotating resolvers
    let attempts: Vec<_> = hierarchy
        .source
        .requests()
        .into_iter()
        .filter(|(r, _)| r.owner == com && r.rtype == DNSResourceType::DNSKEY)
        .map(|(_, resolver)| resolver.to_string())
        .collect();
    assert_eq!(attempts, vec!["192.0.2.53:53", "192.0.2.54:53"]);
}

#[tokio::test]
async fn test_server_failures_are_retried_then_indeterminate() {
    let hierarchy = TestHierarchy::secure();
    let ghost = name("ghost.example.com");

    let result = hierarchy
        .walker()
        .validate("ghost.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.verdicts.len(), 4);
    assert_eq!(result.verdicts[3].status, TrustStatus::Indeterminate);
    assert_eq!(result.overall_status, TrustStatus::Indeterminate);
    assert_eq!(
        hierarchy.source.request_count(&ghost, DNSResourceType::DS),
        2
    );
}

#[tokio::test]
async fn test_expired_dnskey_signature_is_bogus() {
    let hierarchy = TestHierarchy::secure();
    hierarchy.script_dnskey(&hierarchy.example, Validity::expired(hierarchy.now));

    let result = hierarchy
        .walker()
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.verdicts.len(), 3);
    assert_eq!(result.verdicts[2].status, TrustStatus::Bogus);
    assert!(
        result.verdicts[2]
            .reason
            .starts_with("DNSKEY RRset signature invalid: signature expired"),
        "{}",
        result.verdicts[2].reason
    );
    assert_eq!(result.overall_status, TrustStatus::Bogus);
}

#[tokio::test]
async fn test_forged_ds_signature_is_bogus() {
    let hierarchy = TestHierarchy::secure();
    let impostor = TestZone::new("com");
    hierarchy.script_ds(&impostor, &hierarchy.example, hierarchy.valid());

    let result = hierarchy
        .walker()
        .validate("example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.verdicts[2].status, TrustStatus::Bogus);
    assert!(result.verdicts[2].reason.starts_with("DS RRset signature invalid"));
}

#[tokio::test]
async fn test_bad_probe_signature_is_bogus() {
    let hierarchy = TestHierarchy::secure();
    let other = TestZone::new("example.com");
    hierarchy.script_a(&other, &name("www.example.com"), [192, 0, 2, 2], hierarchy.valid());

    let result = hierarchy
        .walker()
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.verdicts[3].status, TrustStatus::Bogus);
    assert!(result.verdicts[3].reason.starts_with("A RRset signature invalid"));
}

#[tokio::test]
async fn test_walk_is_deterministic() {
    let hierarchy = TestHierarchy::secure();
    let walker = hierarchy.walker();
    let first = walker
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();
    let second = walker
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(first.verdicts, second.verdicts);
    assert_eq!(first.overall_status, second.overall_status);
    assert_eq!(first.explanation, second.explanation);
}

#[tokio::test]
async fn test_invalid_name_fails_before_any_query() {
    let hierarchy = TestHierarchy::secure();
    let walker = hierarchy.walker();

    let long_label = "a".repeat(64);
    for input in ["", "bad..example", "exa mple.com", long_label.as_str()] {
        let err = walker.validate(input, &CancelToken::never()).await.unwrap_err();
        assert!(
            matches!(err, ChainError::InvalidDomain { .. }),
            "{:?} gave {:?}",
            input,
            err
        );
    }
    assert!(hierarchy.source.requests().is_empty());
}

#[tokio::test]
async fn test_cancel_before_walk() {
    let hierarchy = TestHierarchy::secure();
    let (handle, token) = CancelToken::new();
    handle.cancel();

    let err = hierarchy
        .walker()
        .validate("example.com", &token)
        .await
        .unwrap_err();
    assert_eq!(err, ChainError::Cancelled);
    assert!(hierarchy.source.requests().is_empty());
}

#[tokio::test]
async fn test_cancel_during_hop() {
    let hierarchy = TestHierarchy::secure();
    hierarchy
        .source
        .delay(&name("com"), DNSResourceType::DNSKEY, Duration::from_secs(30));
    let (handle, token) = CancelToken::new();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let config = dnssec_chain::ChainConfig {
        timeout_ms: 60_000,
        ..TestHierarchy::config()
    };
    let walker = hierarchy.walker_with(config, hierarchy.anchors());
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        walker.validate("example.com", &token),
    )
    .await
    .expect("cancellation should end the walk promptly");
    assert_eq!(outcome.unwrap_err(), ChainError::Cancelled);
}

#[tokio::test]
async fn test_fetches_within_a_hop_run_concurrently() {
    let hierarchy = TestHierarchy::secure();
    hierarchy.source.delay_all(Duration::from_millis(25));

    let result = hierarchy
        .walker()
        .validate("example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.overall_status, TrustStatus::Secure);
    // DNSKEY, lookahead DS and probe overlap at the last hop
    assert!(hierarchy.source.max_in_flight() >= 2);
}

#[tokio::test]
async fn test_concurrent_runs_share_nothing() {
    let hierarchy = TestHierarchy::secure();
    let walker = hierarchy.walker();
    let cancel = CancelToken::never();

    let (a, b) = tokio::join!(
        walker.validate("example.com", &cancel),
        walker.validate("www.example.com", &cancel)
    );
    assert_eq!(a.unwrap().verdicts.len(), 3);
    assert_eq!(b.unwrap().verdicts.len(), 4);
}

fn alias(hierarchy: &TestHierarchy, signer: &TestZone) -> FetchResponse {
    let rrset = RecordSet::new(name("www.example.com"), DNSResourceType::CNAME, 300)
        .with_rdata(name("example.com").to_wire());
    let sig = signer.sign_with_zsk(&rrset, hierarchy.valid());
    FetchResponse::answered(rrset, vec![sig])
}

#[tokio::test]
async fn test_signed_alias_is_not_a_zone_cut() {
    let hierarchy = TestHierarchy::secure();
    let www = name("www.example.com");
    let answer = alias(&hierarchy, &hierarchy.example);
    hierarchy.source.set(&www, DNSResourceType::DS, answer.clone());
    hierarchy.source.set(&www, DNSResourceType::A, answer);

    let result = hierarchy
        .walker()
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(statuses(&result), vec![TrustStatus::Secure; 4]);
    assert_eq!(
        result.verdicts[3].reason,
        "No zone cut, part of zone example.com. (CNAME)"
    );
}

#[tokio::test]
async fn test_forged_alias_is_bogus() {
    let hierarchy = TestHierarchy::secure();
    let impostor = TestZone::new("example.com");
    let www = name("www.example.com");
    hierarchy
        .source
        .set(&www, DNSResourceType::DS, alias(&hierarchy, &impostor));

    let result = hierarchy
        .walker()
        .validate("www.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.verdicts.len(), 4);
    assert_eq!(result.verdicts[3].status, TrustStatus::Bogus);
    assert!(
        result.verdicts[3]
            .reason
            .starts_with("CNAME RRset signature invalid"),
        "{}",
        result.verdicts[3].reason
    );
    assert_eq!(result.overall_status, TrustStatus::Bogus);
}

#[tokio::test]
async fn test_nonexistent_target_is_proven_absent() {
    let hierarchy = TestHierarchy::secure();
    let nope = name("nope.example.com");
    let span = || {
        vec![DenialRecord::Nsec {
            owner: name("example.com"),
            next: name("www.example.com"),
            types: TypeBitmap::from_types(APEX_TYPES.iter().copied()),
        }]
    };
    for rtype in [DNSResourceType::DS, DNSResourceType::A] {
        hierarchy.script_denial(&hierarchy.example, &nope, rtype, QueryOutcome::NameError, span());
    }

    let result = hierarchy
        .walker()
        .validate("nope.example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(statuses(&result), vec![TrustStatus::Secure; 4]);
    let target = &result.verdicts[3];
    assert_eq!(
        target.evidence,
        Evidence::DenialProof {
            outcome: DenialOutcome::NameDoesNotExist,
            record_type: "NSEC".to_string(),
        }
    );
    assert_eq!(
        target.reason,
        "Name proven not to exist (NSEC); A name does not exist"
    );
}

/// Signed NSEC at the apex of example.com served for a TXT query there
fn script_apex_txt_denial(hierarchy: &TestHierarchy, types: &[DNSResourceType]) {
    let apex = name("example.com");
    let record = DenialRecord::Nsec {
        owner: apex.clone(),
        next: name("www.example.com"),
        types: TypeBitmap::from_types(types.iter().copied()),
    };
    hierarchy.script_denial(
        &hierarchy.example,
        &apex,
        DNSResourceType::TXT,
        QueryOutcome::NoData,
        vec![record],
    );
}

fn txt_config() -> ChainConfig {
    ChainConfig {
        probe_type: DNSResourceType::TXT,
        ..TestHierarchy::config()
    }
}

#[tokio::test]
async fn test_signed_nodata_for_target_record_keeps_secure() {
    let hierarchy = TestHierarchy::secure();
    script_apex_txt_denial(&hierarchy, APEX_TYPES);

    let result = hierarchy
        .walker_with(txt_config(), hierarchy.anchors())
        .validate("example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(result.overall_status, TrustStatus::Secure);
    assert_eq!(
        result.verdicts[2].reason,
        format!(
            "DS validates DNSKEY {}; TXT type does not exist at name",
            hierarchy.example.ksk.key_tag
        )
    );
}

#[tokio::test]
async fn test_unprovable_target_denial_is_indeterminate() {
    let hierarchy = TestHierarchy::secure();
    // the bitmap claims TXT exists, so the NODATA answer proves nothing
    let mut types = APEX_TYPES.to_vec();
    types.push(DNSResourceType::TXT);
    script_apex_txt_denial(&hierarchy, &types);

    let result = hierarchy
        .walker_with(txt_config(), hierarchy.anchors())
        .validate("example.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![
            TrustStatus::Secure,
            TrustStatus::Secure,
            TrustStatus::Indeterminate
        ]
    );
    assert!(
        result.verdicts[2]
            .reason
            .ends_with("; denial of example.com. TXT could not be verified"),
        "{}",
        result.verdicts[2].reason
    );
}

#[tokio::test]
async fn test_nsec3_opt_out_delegation_is_insecure() {
    let hierarchy = TestHierarchy::secure();
    let com = name("com");
    let optout = name("optout.com");
    let records = vec![
        nsec3_at(&com, &com, hash_after(&com), false, APEX_TYPES),
        nsec3_with_owner_hash(&com, &[0u8; 20], vec![0xff; 20], true, &[]),
    ];
    hierarchy.script_denial(
        &hierarchy.com,
        &optout,
        DNSResourceType::DS,
        QueryOutcome::NoData,
        records,
    );

    let result = hierarchy
        .walker()
        .validate("optout.com", &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(
        statuses(&result),
        vec![
            TrustStatus::Secure,
            TrustStatus::Secure,
            TrustStatus::Insecure
        ]
    );
    assert_eq!(
        result.verdicts[2].evidence,
        Evidence::DenialProof {
            outcome: DenialOutcome::DelegationIsUnsigned,
            record_type: "NSEC3".to_string(),
        }
    );
    assert_eq!(
        result.overall_reason,
        "Chain breaks at optout.com.: Parent proves there is no DS record (NSEC3)"
    );
}
