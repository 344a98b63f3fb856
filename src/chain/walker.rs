use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::aggregate::aggregate;
use super::consistency::ConsistencyChecker;
use super::model::{ChainResult, TrustStatus, ZoneVerdict};
use super::zone::{Delegation, KeyState, ZoneEvaluator};
use crate::cancel::CancelToken;
use crate::config::ChainConfig;
use crate::dns::name::DomainName;
use crate::dnssec::{CryptoVerifier, TrustAnchorStore};
use crate::error::{ChainError, ConfigError, Result};
use crate::fetcher::{RecordSource, UdpFetcher};

/// Drives validation from the root down to a target, one hop per label
pub struct ChainWalker {
    config: ChainConfig,
    source: Arc<dyn RecordSource>,
    anchors: TrustAnchorStore,
    verifier: CryptoVerifier,
}

impl ChainWalker {
    pub fn new(config: ChainConfig, source: Arc<dyn RecordSource>, anchors: TrustAnchorStore) -> Self {
        let verifier = CryptoVerifier::new(config.clock_skew_tolerance_sec);
        Self {
            config,
            source,
            anchors,
            verifier,
        }
    }

    /// Walker querying the configured resolvers over the network
    pub fn from_config(config: ChainConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let anchors = config.trust_anchor_store()?;
        let source = Arc::new(UdpFetcher::new(&config));
        Ok(Self::new(config, source, anchors))
    }

    /// Replace the verifier, e.g. to pin the validation time
    pub fn with_verifier(mut self, verifier: CryptoVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Validate `target`, given in presentation form
    pub async fn validate(&self, target: &str, cancel: &CancelToken) -> Result<ChainResult> {
        let target_name =
            DomainName::parse(target).map_err(|source| ChainError::InvalidDomain {
                input: target.to_string(),
                source,
            })?;

        let started = Instant::now();
        let evaluated_at = Utc::now();
        info!("Validating chain of trust for {}", target_name);

        let verdicts = self.walk(&target_name, cancel).await?;
        let result = aggregate(target_name, verdicts, evaluated_at).with_run_info(
            self.config.resolvers.iter().map(ToString::to_string).collect(),
            started.elapsed().as_millis() as u64,
        );

        info!(
            "{}: {} ({}) in {} ms",
            result.target, result.overall_status, result.overall_reason, result.duration_ms
        );
        Ok(result)
    }

    /// Verdicts for every label boundary from the root to `target`.
    ///
    /// Stops after the first bogus zone; cancellation is honoured between
    /// and during hops.
    pub async fn walk(&self, target: &DomainName, cancel: &CancelToken) -> Result<Vec<ZoneVerdict>> {
        let hierarchy = target.hierarchy();
        let evaluator = ZoneEvaluator::new(&self.config, self.source.as_ref(), &self.verifier);

        let mut verdicts = Vec::with_capacity(hierarchy.len());
        let mut parent_keys = KeyState::Unknown;
        let mut delegation = match self.anchors.anchors_for(&DomainName::root()) {
            [] => Delegation::Unavailable("no trust anchor configured for the root zone".to_string()),
            anchors => Delegation::anchored(anchors.to_vec()),
        };

        for (depth, zone) in hierarchy.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!("Walk for {} cancelled before {}", target, zone);
                return Err(ChainError::Cancelled);
            }

            if !zone.is_root() && self.anchors.has_anchor(zone) {
                debug!("Re-anchoring at {}", zone);
                delegation = Delegation::anchored(self.anchors.anchors_for(zone).to_vec());
            }

            let lookahead = hierarchy.get(depth + 1);
            let hop = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Walk for {} cancelled during {}", target, zone);
                    return Err(ChainError::Cancelled);
                }
                hop = evaluator.evaluate_hop(&parent_keys, zone, delegation, lookahead) => hop,
            };

            let mut verdict = hop.verdict;
            let status = verdict.status;
            info!("{} {}: {}", status.symbol(), zone, verdict.reason);

            if self.config.check_consistency && !zone.is_root() && !verdict.keys.is_empty() {
                let checker = ConsistencyChecker::new(&self.config, self.source.as_ref());
                let report = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Walk for {} cancelled checking {}", target, zone);
                        return Err(ChainError::Cancelled);
                    }
                    report = checker.check(zone) => report,
                };
                verdict = verdict.with_consistency(report);
            }
            verdicts.push(verdict);

            if status == TrustStatus::Bogus {
                warn!("Chain for {} is bogus at {}, stopping", target, zone);
                break;
            }

            parent_keys = hop.next_keys;
            match hop.next_digests {
                Some(next) => delegation = next,
                None => break,
            }
        }

        Ok(verdicts)
    }
}
