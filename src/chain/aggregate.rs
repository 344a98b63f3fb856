use chrono::{DateTime, Utc};

use super::model::{ChainResult, TrustStatus, ZoneVerdict};
use crate::dns::name::DomainName;

/// Combined status of a chain; an empty chain proves nothing
pub fn overall_status(verdicts: &[ZoneVerdict]) -> TrustStatus {
    verdicts
        .iter()
        .map(|v| v.status)
        .reduce(TrustStatus::combine)
        .unwrap_or(TrustStatus::Indeterminate)
}

/// `"<zone>: <reason>"` for each verdict, root first
pub fn explanation(verdicts: &[ZoneVerdict]) -> Vec<String> {
    verdicts
        .iter()
        .map(|v| format!("{}: {}", v.zone, v.reason))
        .collect()
}

pub fn overall_reason(target: &DomainName, verdicts: &[ZoneVerdict], status: TrustStatus) -> String {
    if verdicts.is_empty() {
        return format!("No zones were evaluated for {}", target);
    }
    if status == TrustStatus::Secure {
        return format!("Chain of trust is intact from root to {}", target);
    }
    match verdicts.iter().find(|v| v.status == status) {
        Some(v) => format!("Chain breaks at {}: {}", v.zone, v.reason),
        None => format!("Chain is {}", status),
    }
}

pub fn aggregate(
    target: DomainName,
    verdicts: Vec<ZoneVerdict>,
    evaluated_at: DateTime<Utc>,
) -> ChainResult {
    let overall_status = overall_status(&verdicts);
    ChainResult {
        overall_reason: overall_reason(&target, &verdicts, overall_status),
        explanation: explanation(&verdicts),
        target,
        verdicts,
        overall_status,
        evaluated_at,
        resolvers: Vec::new(),
        duration_ms: 0,
    }
}
