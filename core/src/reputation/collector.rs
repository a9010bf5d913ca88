use std::collections::BTreeMap;

use super::ledger::{PeerId, RatingSnapshot};

/// One recommender's mention of a candidate. `quarantined_vouch` marks a
/// vouch below the probe threshold; such mentions never earn the
/// recommender credit or blame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub recommender: PeerId,
    pub quarantined_vouch: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProbeCandidate {
    pub reputable: bool,
    pub vouchers: Vec<Provenance>,
}

/// Probe candidates harvested from the sampled recommenders' tables,
/// keyed by candidate identity in deterministic order.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: BTreeMap<PeerId, ProbeCandidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one recommender's exported table into the set. Only a trusted
    /// recommender's above-threshold vouch can mark a candidate reputable;
    /// the flag is never cleared once set.
    pub fn absorb(
        &mut self,
        recommender: &PeerId,
        recommender_trusted: bool,
        table: &RatingSnapshot,
        caller: &PeerId,
        probe_thresh: i64,
    ) {
        for (subject, record) in table {
            if subject == caller {
                continue;
            }

            let vouch_high = record.probe_score() >= probe_thresh;
            let candidate = self.candidates.entry(subject.clone()).or_default();

            if recommender_trusted && vouch_high {
                candidate.reputable = true;
            }
            candidate.vouchers.push(Provenance {
                recommender: recommender.clone(),
                quarantined_vouch: !vouch_high,
            });
        }
    }

    pub fn get(&self, candidate: &str) -> Option<&ProbeCandidate> {
        self.candidates.get(candidate)
    }

    /// Candidate identities partitioned into (reputable, quarantined),
    /// each in identity order.
    pub fn split(&self) -> (Vec<PeerId>, Vec<PeerId>) {
        let mut reputable = Vec::new();
        let mut quarantined = Vec::new();

        for (peer, candidate) in &self.candidates {
            if candidate.reputable {
                reputable.push(peer.clone());
            } else {
                quarantined.push(peer.clone());
            }
        }

        (reputable, quarantined)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
