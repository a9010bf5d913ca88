use super::collector::CandidateSet;
use super::consensus::ProbeAnswer;
use super::ledger::RatingLedger;

/// Folds the round's outcome back into the pinging peer's ledger. Every
/// queried probe is judged against the consensus answer, reputable or not;
/// its vouchers are credited or blamed with it, except quarantined vouches,
/// which stay untouched.
pub fn apply_outcome(
    ledger: &mut RatingLedger,
    candidates: &CandidateSet,
    answers: &[ProbeAnswer],
    best_answer: bool,
) {
    for answer in answers {
        let agreed = answer.correct == best_answer;
        ledger.record_probe(&answer.probe, agreed);

        let Some(candidate) = candidates.get(&answer.probe) else {
            continue;
        };
        for vouch in &candidate.vouchers {
            if vouch.quarantined_vouch {
                continue;
            }
            ledger.record_recommendation(&vouch.recommender, agreed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::ledger::{RatingRecord, RatingSnapshot};

    fn candidates_from(entries: &[(&str, i64)], recommender: &str, trusted: bool) -> CandidateSet {
        let table: RatingSnapshot = entries
            .iter()
            .map(|(peer, probe_score)| {
                let record = if *probe_score >= 0 {
                    RatingRecord::from_counters(*probe_score as u64, 0, 0, 0)
                } else {
                    RatingRecord::from_counters(0, probe_score.unsigned_abs(), 0, 0)
                };
                (peer.to_string(), record)
            })
            .collect();

        let mut set = CandidateSet::new();
        set.absorb(
            &recommender.to_string(),
            trusted,
            &table,
            &"caller".to_string(),
            2,
        );
        set
    }

    fn answer(probe: &str, reputable: bool, correct: bool) -> ProbeAnswer {
        ProbeAnswer {
            probe: probe.to_string(),
            reputable,
            correct,
        }
    }

    #[test]
    fn test_agreeing_probe_and_voucher_are_credited() {
        let candidates = candidates_from(&[("x", 5)], "rec", true);
        let mut ledger = RatingLedger::new();
        ledger.get_or_create("rec");

        apply_outcome(&mut ledger, &candidates, &[answer("x", true, true)], true);

        assert_eq!(ledger.get("x").unwrap().good_probe, 1);
        assert_eq!(ledger.get("x").unwrap().bad_probe, 0);
        assert_eq!(ledger.get("rec").unwrap().good_rec, 1);
        assert_eq!(ledger.get("rec").unwrap().bad_rec, 0);
    }

    #[test]
    fn test_disagreeing_probe_and_voucher_are_blamed() {
        let candidates = candidates_from(&[("x", 5)], "rec", true);
        let mut ledger = RatingLedger::new();
        ledger.get_or_create("rec");

        apply_outcome(&mut ledger, &candidates, &[answer("x", true, false)], true);

        assert_eq!(ledger.get("x").unwrap().bad_probe, 1);
        assert_eq!(ledger.get("rec").unwrap().bad_rec, 1);
    }

    #[test]
    fn test_quarantined_vouch_never_earns_or_loses() {
        // Vouch below threshold: the probe is judged, the voucher is not.
        let candidates = candidates_from(&[("x", 0)], "rec", true);
        let mut ledger = RatingLedger::new();
        ledger.get_or_create("rec");

        apply_outcome(&mut ledger, &candidates, &[answer("x", false, false)], false);

        assert_eq!(ledger.get("x").unwrap().good_probe, 1);
        let rec = ledger.get("rec").unwrap();
        assert_eq!(rec.good_rec, 0);
        assert_eq!(rec.bad_rec, 0);
    }

    #[test]
    fn test_quarantined_probe_is_judged_against_consensus() {
        // The quarantined probe did not vote, but agreeing with the
        // consensus still moves it toward promotion.
        let candidates = candidates_from(&[("x", -3)], "rec", true);
        let mut ledger = RatingLedger::new();

        apply_outcome(&mut ledger, &candidates, &[answer("x", false, true)], true);

        assert_eq!(ledger.get("x").unwrap().good_probe, 1);
    }

    #[test]
    fn test_strong_vouch_from_quarantined_recommender_is_judged() {
        let candidates = candidates_from(&[("x", 5)], "rec", false);
        let mut ledger = RatingLedger::new();
        ledger.get_or_create("rec");

        apply_outcome(&mut ledger, &candidates, &[answer("x", false, false)], true);

        assert_eq!(ledger.get("rec").unwrap().bad_rec, 1);
    }

    #[test]
    fn test_counters_never_decrease() {
        let candidates = candidates_from(&[("x", 5), ("y", 0)], "rec", true);
        let mut ledger = RatingLedger::new();
        ledger.insert("x".to_string(), RatingRecord::from_counters(3, 1, 0, 0));
        ledger.insert("rec".to_string(), RatingRecord::from_counters(0, 0, 2, 2));
        let before = ledger.snapshot();

        apply_outcome(
            &mut ledger,
            &candidates,
            &[answer("x", true, false), answer("y", false, true)],
            true,
        );

        for (peer, old) in &before {
            let new = ledger.get(peer).unwrap();
            assert!(new.good_probe >= old.good_probe);
            assert!(new.bad_probe >= old.bad_probe);
            assert!(new.good_rec >= old.good_rec);
            assert!(new.bad_rec >= old.bad_rec);
        }
    }
}
