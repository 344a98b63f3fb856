//! Structured and flat renderings of a [`ChainResult`].

use std::fmt::Write;

use crate::chain::{ChainResult, Evidence};

pub fn to_json(result: &ChainResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

pub fn from_json(input: &str) -> serde_json::Result<ChainResult> {
    serde_json::from_str(input)
}

/// One line per zone, root first, then the overall verdict
pub fn render_text(result: &ChainResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "DNSSEC chain of trust for {}", result.target);
    let _ = writeln!(
        out,
        "Evaluated {} in {} ms",
        result.evaluated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        result.duration_ms
    );
    if !result.resolvers.is_empty() {
        let _ = writeln!(out, "Resolvers: {}", result.resolvers.join(", "));
    }
    out.push('\n');

    let width = result
        .verdicts
        .iter()
        .map(|v| v.zone.to_string().len())
        .max()
        .unwrap_or(1);

    for verdict in &result.verdicts {
        let _ = writeln!(
            out,
            "  {} {:<width$}  {:<13}  {}",
            verdict.status.symbol(),
            verdict.zone.to_string(),
            verdict.status.to_string(),
            verdict.reason,
            width = width
        );
        if let Some(detail) = evidence_detail(&verdict.evidence) {
            let _ = writeln!(out, "    {:<width$}  {}", "", detail, width = width + 15);
        }
        if let Some(sig) = &verdict.signature {
            let _ = writeln!(
                out,
                "    {:<width$}  RRSIG by {} tag {} expires {} ({} days)",
                "",
                sig.signer,
                sig.key_tag,
                sig.expiration.format("%Y-%m-%d"),
                sig.days_until_expiry,
                width = width + 15
            );
        }
        if let Some(consistency) = &verdict.consistency {
            let _ = writeln!(
                out,
                "    {:<width$}  Nameservers: {}",
                "",
                consistency.status_label(),
                width = width + 15
            );
            for issue in &consistency.issues {
                let _ = writeln!(out, "    {:<width$}    {}", "", issue, width = width + 15);
            }
        }
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "{} {}: {}",
        result.overall_status.symbol(),
        result.overall_status,
        result.overall_reason
    );
    out
}

fn evidence_detail(evidence: &Evidence) -> Option<String> {
    match evidence {
        Evidence::TrustAnchor { key, digest } => Some(format!(
            "anchor DS {} matches {} {} ({})",
            digest.key_tag,
            key.role_label(),
            key.key_tag,
            key.algorithm_name
        )),
        Evidence::MatchedDigest {
            key,
            matched,
            total,
            ..
        } => Some(format!(
            "{}/{} DS match {} {} ({}{})",
            matched,
            total,
            key.role_label(),
            key.key_tag,
            key.algorithm_name,
            key.key_length_bits
                .map(|bits| format!(", {} bits", bits))
                .unwrap_or_default()
        )),
        Evidence::MatchedKey { key } => Some(format!(
            "self-signed by {} {} ({})",
            key.role_label(),
            key.key_tag,
            key.algorithm_name
        )),
        Evidence::DenialProof {
            outcome,
            record_type,
        } => Some(format!("{}: {}", record_type, outcome)),
        Evidence::InheritedFromParent { .. } | Evidence::None => None,
    }
}
