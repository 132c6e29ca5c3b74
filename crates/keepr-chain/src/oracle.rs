// SPDX-FileCopyrightText: 2026 Keepr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Eligibility oracle: ordered-fallback reads and the quorum-of-two policy.
//!
//! A single check walks the endpoint list once, first successful read wins.
//! Membership-changing callers pair two checks, with the second excluding
//! the endpoint the first actually used, so one flaky RPC can neither admit
//! nor expel anyone on its own.

use std::sync::Arc;

use tracing::{debug, warn};

use keepr_core::types::{EligibilityEvidence, EligibilityReason, EligibilityResult};
use keepr_core::ShareReader;

/// Joint verdict of a quorum-of-two check pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumDecision {
    /// Both checks read the chain and found the threshold met.
    Eligible,
    /// Both checks read the chain and found the threshold unmet.
    Ineligible,
    /// Split verdict or an indeterminate read; no action this cycle.
    Undecided,
}

/// The decision plus the evidence of both underlying checks.
#[derive(Debug, Clone)]
pub struct QuorumOutcome {
    pub decision: QuorumDecision,
    pub checks: [EligibilityResult; 2],
}

/// Share-gating eligibility oracle over an ordered endpoint pool.
pub struct Oracle {
    reader: Arc<dyn ShareReader>,
    endpoints: Vec<String>,
}

impl Oracle {
    pub fn new(reader: Arc<dyn ShareReader>, endpoints: Vec<String>) -> Self {
        Self { reader, endpoints }
    }

    /// The configured default endpoint order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// One ordered-fallback eligibility check.
    ///
    /// Walks `rpc_urls` (or the configured pool) in order; the first
    /// endpoint that answers settles the check with an inclusive
    /// `balance >= min_shares` comparison. If every endpoint fails the
    /// result is ineligible with reason `onchain_read_failed`, and the last
    /// attempted URL is recorded so a follow-up call can exclude it. No
    /// retries beyond the single walk; retry-with-delay is the caller's job.
    pub async fn check_shares_eligibility(
        &self,
        wallet_address: &str,
        token_address: &str,
        min_shares: u128,
        rpc_urls: Option<&[String]>,
    ) -> EligibilityResult {
        let urls = rpc_urls.unwrap_or(&self.endpoints);
        let mut last_attempted: Option<String> = None;

        for url in urls {
            last_attempted = Some(url.clone());
            match self
                .reader
                .share_balance(url, wallet_address, token_address)
                .await
            {
                Ok(balance) => {
                    let eligible = balance >= min_shares;
                    debug!(
                        wallet_address,
                        rpc_url = url.as_str(),
                        balance,
                        min_shares,
                        eligible,
                        "share balance read"
                    );
                    return EligibilityResult {
                        eligible,
                        reason: if eligible {
                            EligibilityReason::Ok
                        } else {
                            EligibilityReason::Ineligible
                        },
                        evidence: EligibilityEvidence {
                            rpc_url: Some(url.clone()),
                            block_number: None,
                            balance: Some(balance),
                        },
                    };
                }
                Err(e) => {
                    warn!(
                        wallet_address,
                        rpc_url = url.as_str(),
                        error = %e,
                        "share balance read failed, trying next endpoint"
                    );
                }
            }
        }

        EligibilityResult {
            eligible: false,
            reason: EligibilityReason::OnchainReadFailed,
            evidence: EligibilityEvidence {
                rpc_url: last_attempted,
                block_number: None,
                balance: None,
            },
        }
    }

    /// The quorum-of-two policy for membership-changing decisions.
    ///
    /// Runs one check with the default endpoint order, then a second with
    /// the first check's endpoint excluded. Both must agree on a successful
    /// read for a verdict; a split or any indeterminate read is
    /// [`QuorumDecision::Undecided`]. A pool of fewer than two endpoints
    /// can therefore never confirm anything -- deliberate.
    pub async fn check_shares_quorum(
        &self,
        wallet_address: &str,
        token_address: &str,
        min_shares: u128,
    ) -> QuorumOutcome {
        let first = self
            .check_shares_eligibility(wallet_address, token_address, min_shares, None)
            .await;

        let second_pool: Vec<String> = self
            .endpoints
            .iter()
            .filter(|url| Some(url.as_str()) != first.evidence.rpc_url.as_deref())
            .cloned()
            .collect();
        let second = self
            .check_shares_eligibility(wallet_address, token_address, min_shares, Some(&second_pool))
            .await;

        let decision = match (&first, &second) {
            (a, b) if a.eligible && b.eligible => QuorumDecision::Eligible,
            (a, b)
                if a.reason == EligibilityReason::Ineligible
                    && b.reason == EligibilityReason::Ineligible =>
            {
                QuorumDecision::Ineligible
            }
            _ => QuorumDecision::Undecided,
        };

        QuorumOutcome {
            decision,
            checks: [first, second],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keepr_core::KeeprError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted reader: per-URL fixed responses, plus a call log.
    struct ScriptedReader {
        responses: HashMap<String, Result<u128, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedReader {
        fn new(responses: Vec<(&str, Result<u128, &str>)>) -> Arc<Self> {
            Arc::new(Self {
                responses: responses
                    .into_iter()
                    .map(|(url, r)| (url.to_string(), r.map_err(|e| e.to_string())))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ShareReader for ScriptedReader {
        async fn share_balance(
            &self,
            rpc_url: &str,
            _wallet: &str,
            _token: &str,
        ) -> Result<u128, KeeprError> {
            self.calls.lock().unwrap().push(rpc_url.to_string());
            match self.responses.get(rpc_url) {
                Some(Ok(balance)) => Ok(*balance),
                Some(Err(msg)) => Err(KeeprError::Chain {
                    message: msg.clone(),
                    source: None,
                }),
                None => Err(KeeprError::Chain {
                    message: format!("unexpected endpoint {rpc_url}"),
                    source: None,
                }),
            }
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn first_successful_endpoint_wins() {
        let reader = ScriptedReader::new(vec![
            ("https://a", Err("connect refused")),
            ("https://b", Ok(150)),
            ("https://c", Ok(999)),
        ]);
        let oracle = Oracle::new(reader.clone(), urls(&["https://a", "https://b", "https://c"]));

        let result = oracle.check_shares_eligibility("0xw", "0xt", 100, None).await;
        assert!(result.eligible);
        assert_eq!(result.reason, EligibilityReason::Ok);
        assert_eq!(result.evidence.rpc_url.as_deref(), Some("https://b"));
        assert_eq!(result.evidence.balance, Some(150));
        // The walk stops at the first success.
        assert_eq!(reader.calls(), vec!["https://a", "https://b"]);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let reader = ScriptedReader::new(vec![("https://a", Ok(100))]);
        let oracle = Oracle::new(reader, urls(&["https://a"]));

        let result = oracle.check_shares_eligibility("0xw", "0xt", 100, None).await;
        assert!(result.eligible, "balance == min_shares must be eligible");

        let result = oracle.check_shares_eligibility("0xw", "0xt", 101, None).await;
        assert!(!result.eligible);
        assert_eq!(result.reason, EligibilityReason::Ineligible);
    }

    #[tokio::test]
    async fn all_endpoints_failing_is_indeterminate() {
        let reader = ScriptedReader::new(vec![
            ("https://a", Err("timeout")),
            ("https://b", Err("503")),
        ]);
        let oracle = Oracle::new(reader, urls(&["https://a", "https://b"]));

        let result = oracle.check_shares_eligibility("0xw", "0xt", 100, None).await;
        assert!(!result.eligible);
        assert_eq!(result.reason, EligibilityReason::OnchainReadFailed);
        assert_eq!(result.evidence.rpc_url.as_deref(), Some("https://b"));
        assert!(result.evidence.balance.is_none());
    }

    #[tokio::test]
    async fn empty_pool_is_indeterminate() {
        let reader = ScriptedReader::new(vec![]);
        let oracle = Oracle::new(reader, Vec::new());

        let result = oracle.check_shares_eligibility("0xw", "0xt", 100, None).await;
        assert_eq!(result.reason, EligibilityReason::OnchainReadFailed);
        assert!(result.evidence.rpc_url.is_none());
    }

    #[tokio::test]
    async fn quorum_second_check_excludes_first_endpoint() {
        let reader = ScriptedReader::new(vec![
            ("https://a", Ok(150)),
            ("https://b", Ok(150)),
        ]);
        let oracle = Oracle::new(reader.clone(), urls(&["https://a", "https://b"]));

        let outcome = oracle.check_shares_quorum("0xw", "0xt", 100).await;
        assert_eq!(outcome.decision, QuorumDecision::Eligible);
        assert_eq!(reader.calls(), vec!["https://a", "https://b"]);
        assert_eq!(outcome.checks[0].evidence.rpc_url.as_deref(), Some("https://a"));
        assert_eq!(outcome.checks[1].evidence.rpc_url.as_deref(), Some("https://b"));
    }

    #[tokio::test]
    async fn split_verdict_is_undecided() {
        // Endpoint a says eligible, endpoint b says not: the veto case.
        let reader = ScriptedReader::new(vec![
            ("https://a", Ok(150)),
            ("https://b", Ok(50)),
        ]);
        let oracle = Oracle::new(reader, urls(&["https://a", "https://b"]));

        let outcome = oracle.check_shares_quorum("0xw", "0xt", 100).await;
        assert_eq!(outcome.decision, QuorumDecision::Undecided);
    }

    #[tokio::test]
    async fn confirmed_ineligible_on_both_reads() {
        let reader = ScriptedReader::new(vec![
            ("https://a", Ok(99)),
            ("https://b", Ok(40)),
        ]);
        let oracle = Oracle::new(reader, urls(&["https://a", "https://b"]));

        let outcome = oracle.check_shares_quorum("0xw", "0xt", 100).await;
        assert_eq!(outcome.decision, QuorumDecision::Ineligible);
    }

    #[tokio::test]
    async fn indeterminate_read_never_confirms_a_removal() {
        // First check fails over to b and reads ineligible; the second
        // check has only the already-failed endpoint a left.
        let reader = ScriptedReader::new(vec![
            ("https://a", Err("flaky")),
            ("https://b", Ok(0)),
        ]);
        let oracle = Oracle::new(reader, urls(&["https://a", "https://b"]));

        let outcome = oracle.check_shares_quorum("0xw", "0xt", 100).await;
        assert_eq!(outcome.decision, QuorumDecision::Undecided);
        assert_eq!(
            outcome.checks[1].reason,
            EligibilityReason::OnchainReadFailed
        );
    }

    #[tokio::test]
    async fn single_endpoint_pool_cannot_reach_quorum() {
        let reader = ScriptedReader::new(vec![("https://a", Ok(0))]);
        let oracle = Oracle::new(reader, urls(&["https://a"]));

        let outcome = oracle.check_shares_quorum("0xw", "0xt", 100).await;
        assert_eq!(outcome.decision, QuorumDecision::Undecided);
    }
}
