mod collector;
mod consensus;
mod ledger;
mod ping;
mod sampler;
mod update;

pub use collector::{CandidateSet, ProbeCandidate, Provenance};
pub use consensus::{pick_probes, tally, ProbeAnswer, Verdict};
pub use ledger::{PeerId, RatingLedger, RatingRecord, RatingSnapshot};
pub use ping::{ping, PeerQuery, PingOutcome};
pub use sampler::{sample_recommenders, RecommenderSample};
pub use update::apply_outcome;
