//! # Evidence Synchronizer
//!
//! Owns the evidence map and the freshness of the distribution map.
//!
//! Every change to the evidence produces an [`InferenceTicket`] in the same
//! step; the caller dispatches it. Tickets carry a monotonically increasing
//! [`SequenceToken`], and a response is applied only if its token is the most
//! recently issued one. Slower, superseded responses are discarded.

use crate::Distribution;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node name -> selected state.
pub type EvidenceMap = BTreeMap<String, String>;

/// Node name -> probability mapping.
pub type DistributionMap = BTreeMap<String, Distribution>;

/// Identity of one issued inference request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceToken(pub u64);

/// An inference request to dispatch: the full evidence at issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceTicket {
    pub token: SequenceToken,
    pub evidence: EvidenceMap,
}

impl InferenceTicket {
    /// Baseline tickets carry no evidence.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        self.evidence.is_empty()
    }
}

/// What happened to an inference response or an evidence change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// The response was the latest and now backs the distribution map.
    /// `discarded` counts entries dropped for unknown nodes or malformed
    /// probabilities.
    Applied { nodes: usize, discarded: usize },
    /// A newer request was issued since; the response was dropped.
    Superseded,
    /// Not in trained mode; nothing was issued.
    Skipped,
}

/// Evidence map, distribution map and sequence bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSynchronizer {
    evidence: EvidenceMap,
    distributions: DistributionMap,
    /// Last token handed out. 0 means none yet.
    issued: u64,
    /// Token whose response backs `distributions`.
    applied: Option<SequenceToken>,
}

impl EvidenceSynchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn evidence(&self) -> &EvidenceMap {
        &self.evidence
    }

    #[must_use]
    pub fn distributions(&self) -> &DistributionMap {
        &self.distributions
    }

    #[must_use]
    pub fn distribution(&self, node: &str) -> Option<&Distribution> {
        self.distributions.get(node)
    }

    /// The most recently issued token, if any.
    #[must_use]
    pub fn latest(&self) -> Option<SequenceToken> {
        (self.issued > 0).then_some(SequenceToken(self.issued))
    }

    #[must_use]
    pub fn is_latest(&self, token: SequenceToken) -> bool {
        self.latest() == Some(token)
    }

    /// True when the distribution map reflects the latest issued request.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.applied.is_some() && self.applied == self.latest()
    }

    /// Issue a ticket for the current evidence.
    pub fn issue(&mut self) -> InferenceTicket {
        self.issued = self.issued.saturating_add(1);
        InferenceTicket {
            token: SequenceToken(self.issued),
            evidence: self.evidence.clone(),
        }
    }

    /// Toggle `node = state` and issue a ticket for the new evidence.
    ///
    /// If `node` is already fixed to `state` the entry is removed; otherwise
    /// it is set. Membership checks are the caller's job.
    pub fn toggle(&mut self, node: &str, state: &str) -> InferenceTicket {
        if self.evidence.get(node).is_some_and(|s| s == state) {
            self.evidence.remove(node);
        } else {
            self.evidence.insert(node.to_string(), state.to_string());
        }
        self.issue()
    }

    /// Drop all evidence and issue a baseline ticket.
    pub fn clear_evidence(&mut self) -> InferenceTicket {
        self.evidence.clear();
        self.issue()
    }

    /// Apply a response if `token` is still the latest.
    ///
    /// Entries rejected by `valid` (unknown node, or not a distribution over
    /// that node's states) are dropped.
    pub fn accept(
        &mut self,
        token: SequenceToken,
        distributions: DistributionMap,
        valid: impl Fn(&str, &Distribution) -> bool,
    ) -> InferenceOutcome {
        if !self.is_latest(token) {
            return InferenceOutcome::Superseded;
        }
        let received = distributions.len();
        self.distributions = distributions
            .into_iter()
            .filter(|(node, dist)| valid(node, dist))
            .collect();
        self.applied = Some(token);
        InferenceOutcome::Applied {
            nodes: self.distributions.len(),
            discarded: received - self.distributions.len(),
        }
    }

    /// Forget evidence and distributions, and orphan in-flight requests.
    ///
    /// Called whenever the model stops being trained.
    pub fn invalidate(&mut self) {
        self.evidence.clear();
        self.distributions.clear();
        self.applied = None;
        self.issued = self.issued.saturating_add(1);
    }
}

// =============================================================================
// TESTS
// =============================================================================
