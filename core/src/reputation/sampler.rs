use crate::config::ProtocolConfig;
use rand::seq::SliceRandom;
use rand::Rng;

use super::ledger::{PeerId, RatingLedger};

/// Recommenders drawn for one ping, already partitioned by standing.
/// Trusted recommenders must be consulted before quarantined ones.
#[derive(Debug, Clone, Default)]
pub struct RecommenderSample {
    pub trusted: Vec<PeerId>,
    pub quarantined: Vec<PeerId>,
}

impl RecommenderSample {
    pub fn len(&self) -> usize {
        self.trusted.len() + self.quarantined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty() && self.quarantined.is_empty()
    }
}

pub fn sample_recommenders<R: Rng>(
    ledger: &RatingLedger,
    config: &ProtocolConfig,
    rng: &mut R,
) -> RecommenderSample {
    let mut trusted = Vec::new();
    let mut quarantined = Vec::new();

    for (peer, record) in ledger.iter() {
        if record.rec_score() >= config.rec_thresh {
            trusted.push(peer.clone());
        } else {
            quarantined.push(peer.clone());
        }
    }

    RecommenderSample {
        trusted: sample_up_to(&trusted, config.rec_count, rng),
        quarantined: sample_up_to(&quarantined, config.q_rec_count, rng),
    }
}

/// Uniform sample without replacement, capped to the pool size.
pub(super) fn sample_up_to<R: Rng>(pool: &[PeerId], count: usize, rng: &mut R) -> Vec<PeerId> {
    pool.choose_multiple(rng, count.min(pool.len()))
        .cloned()
        .collect()
}
