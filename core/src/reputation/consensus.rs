use crate::config::ProtocolConfig;
use rand::Rng;

use super::collector::CandidateSet;
use super::ledger::PeerId;
use super::sampler::sample_up_to;

/// One queried probe's answer for the round. Only correctness is visible
/// to the evaluator, never the answer content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAnswer {
    pub probe: PeerId,
    pub reputable: bool,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verdict {
    pub best_answer: bool,
    pub good_votes: usize,
    pub bad_votes: usize,
}

/// Picks the probes actually queried this round: up to `probe_count`
/// reputable and `q_probe_count` quarantined candidates, reputable first.
pub fn pick_probes<R: Rng>(
    candidates: &CandidateSet,
    config: &ProtocolConfig,
    rng: &mut R,
) -> Vec<PeerId> {
    let (reputable, quarantined) = candidates.split();

    let mut picked = sample_up_to(&reputable, config.probe_count, rng);
    picked.extend(sample_up_to(&quarantined, config.q_probe_count, rng));
    picked
}

/// Majority vote over reputable answers only. Ties, including the empty
/// round, resolve to an incorrect consensus.
pub fn tally(answers: &[ProbeAnswer]) -> Verdict {
    let mut good_votes = 0;
    let mut bad_votes = 0;

    for answer in answers {
        if !answer.reputable {
            continue;
        }
        if answer.correct {
            good_votes += 1;
        } else {
            bad_votes += 1;
        }
    }

    Verdict {
        best_answer: good_votes > bad_votes,
        good_votes,
        bad_votes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::ledger::RatingRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn answer(probe: &str, reputable: bool, correct: bool) -> ProbeAnswer {
        ProbeAnswer {
            probe: probe.to_string(),
            reputable,
            correct,
        }
    }

    #[test]
    fn test_majority_of_reputable_answers_wins() {
        let verdict = tally(&[
            answer("a", true, true),
            answer("b", true, true),
            answer("c", true, false),
        ]);

        assert!(verdict.best_answer);
        assert_eq!(verdict.good_votes, 2);
        assert_eq!(verdict.bad_votes, 1);
    }

    #[test]
    fn test_tie_defaults_to_incorrect() {
        let verdict = tally(&[answer("a", true, true), answer("b", true, false)]);

        assert!(!verdict.best_answer);
    }

    #[test]
    fn test_empty_round_defaults_to_incorrect() {
        let verdict = tally(&[]);

        assert!(!verdict.best_answer);
        assert_eq!(verdict.good_votes, 0);
        assert_eq!(verdict.bad_votes, 0);
    }

    #[test]
    fn test_quarantined_answers_never_vote() {
        let verdict = tally(&[
            answer("a", true, false),
            answer("b", false, true),
            answer("c", false, true),
            answer("d", false, true),
        ]);

        assert!(!verdict.best_answer);
        assert_eq!(verdict.good_votes, 0);
        assert_eq!(verdict.bad_votes, 1);
    }

    #[test]
    fn test_pick_probes_respects_caps() {
        let mut set = CandidateSet::new();
        let table: crate::reputation::ledger::RatingSnapshot = (0..6)
            .map(|i| {
                (
                    format!("good-{}", i),
                    RatingRecord::from_counters(5, 0, 0, 0),
                )
            })
            .chain((0..4).map(|i| (format!("bad-{}", i), RatingRecord::new())))
            .collect();
        set.absorb(&"rec".to_string(), true, &table, &"caller".to_string(), 2);

        let config = ProtocolConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let picked = pick_probes(&set, &config, &mut rng);

        assert_eq!(picked.len(), config.probe_count + config.q_probe_count);

        let reputable_picked = picked
            .iter()
            .filter(|p| set.get(p).unwrap().reputable)
            .count();
        assert_eq!(reputable_picked, config.probe_count);
    }

    #[test]
    fn test_pick_probes_uses_small_pools_whole() {
        let mut set = CandidateSet::new();
        let table: crate::reputation::ledger::RatingSnapshot = [
            ("good".to_string(), RatingRecord::from_counters(5, 0, 0, 0)),
            ("bad".to_string(), RatingRecord::new()),
        ]
        .into_iter()
        .collect();
        set.absorb(&"rec".to_string(), true, &table, &"caller".to_string(), 2);

        let mut rng = StdRng::seed_from_u64(3);
        let mut picked = pick_probes(&set, &ProtocolConfig::default(), &mut rng);
        picked.sort();

        assert_eq!(picked, ["bad", "good"]);
    }
}
