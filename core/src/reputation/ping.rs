use crate::config::ProtocolConfig;
use rand::Rng;

use super::collector::CandidateSet;
use super::consensus::{self, ProbeAnswer, Verdict};
use super::ledger::{PeerId, RatingLedger, RatingSnapshot};
use super::sampler::{self, RecommenderSample};
use super::update;

/// Capability a pinging peer needs from the rest of the network. Both
/// operations are answered by the owning peer: it exports an immutable
/// copy of its table and registers the caller in its own ledger itself,
/// so no peer ever writes another peer's state.
pub trait PeerQuery {
    /// The recommender's rating table, as of this instant.
    fn export_ratings(&mut self, recommender: &PeerId, caller: &PeerId) -> RatingSnapshot;

    /// Queries the target as a probe; returns whether its answer was correct.
    fn probe(&mut self, target: &PeerId, caller: &PeerId) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct PingOutcome {
    pub best_answer: bool,
    pub answers: Vec<ProbeAnswer>,
    pub recommenders: RecommenderSample,
}

impl PingOutcome {
    pub fn queried(&self) -> usize {
        self.answers.len()
    }
}

/// One full ping by `caller`: sample recommenders from its own ledger,
/// harvest probe candidates from theirs, query a handful of probes, vote,
/// and fold the outcome back into `ledger`. An isolated peer (empty
/// ledger) pings to a no-op.
pub fn ping<W: PeerQuery, R: Rng>(
    caller: &PeerId,
    ledger: &mut RatingLedger,
    world: &mut W,
    config: &ProtocolConfig,
    rng: &mut R,
) -> PingOutcome {
    let recommenders = sampler::sample_recommenders(ledger, config, rng);

    // Trusted recommenders first: only they may establish reputable status.
    let mut candidates = CandidateSet::new();
    for recommender in &recommenders.trusted {
        let table = world.export_ratings(recommender, caller);
        candidates.absorb(recommender, true, &table, caller, config.probe_thresh);
    }
    for recommender in &recommenders.quarantined {
        let table = world.export_ratings(recommender, caller);
        candidates.absorb(recommender, false, &table, caller, config.probe_thresh);
    }

    let picked = consensus::pick_probes(&candidates, config, rng);

    let mut answers = Vec::with_capacity(picked.len());
    for probe in picked {
        let correct = world.probe(&probe, caller);
        let reputable = candidates
            .get(&probe)
            .map(|candidate| candidate.reputable)
            .unwrap_or(false);
        answers.push(ProbeAnswer {
            probe,
            reputable,
            correct,
        });
    }

    let verdict = consensus::tally(&answers);
    update::apply_outcome(ledger, &candidates, &answers, verdict.best_answer);

    trace_round(caller, &verdict, &answers);

    PingOutcome {
        best_answer: verdict.best_answer,
        answers,
        recommenders,
    }
}

fn trace_round(caller: &PeerId, verdict: &Verdict, answers: &[ProbeAnswer]) {
    let fmt = |wanted: bool| {
        answers
            .iter()
            .filter(|a| a.reputable == wanted)
            .map(|a| format!("{}({})", a.probe, if a.correct { "T" } else { "F" }))
            .collect::<Vec<_>>()
            .join(" ")
    };

    tracing::debug!(
        "{} -> ({}): [ {} ] {}",
        caller,
        if verdict.best_answer { "T" } else { "F" },
        fmt(true),
        fmt(false),
    );
}
