use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::mem;

use crate::config::ProtocolConfig;
use crate::report::{NetworkReport, PingStats, ReputationMatrix};
use crate::reputation::{
    ping, PeerId, PeerQuery, PingOutcome, RatingLedger, RatingRecord, RatingSnapshot,
};

/// Rating a peer starts with for a contact it is told to trust.
pub const BASELINE_RECORD: RatingRecord = RatingRecord::from_counters(5, 0, 5, 0);

/// Rating a colluding peer artificially holds for its accomplices:
/// maximal probe trust, maximal recommender distrust.
pub const COLLUSION_RECORD: RatingRecord = RatingRecord::from_counters(100_000, 0, 0, 100_000);

#[derive(Debug, Clone)]
pub struct SimPeer {
    pub id: PeerId,
    pub miss_rate: f64,
    pub ledger: RatingLedger,
}

/// View of the population handed to a ping in progress. The owning peer
/// answers both queries itself: it registers the caller in its own ledger
/// and exports a detached copy, so the caller never touches foreign state.
struct SimWorld<'a> {
    peers: &'a mut [SimPeer],
    index: &'a HashMap<PeerId, usize>,
    rng: &'a mut StdRng,
}

impl PeerQuery for SimWorld<'_> {
    fn export_ratings(&mut self, recommender: &PeerId, caller: &PeerId) -> RatingSnapshot {
        match self.index.get(recommender) {
            Some(&i) => {
                let peer = &mut self.peers[i];
                peer.ledger.get_or_create(caller);
                peer.ledger.snapshot()
            }
            None => {
                tracing::warn!("unknown recommender {} queried by {}", recommender, caller);
                RatingSnapshot::new()
            }
        }
    }

    fn probe(&mut self, target: &PeerId, caller: &PeerId) -> bool {
        match self.index.get(target) {
            Some(&i) => {
                let peer = &mut self.peers[i];
                peer.ledger.get_or_create(caller);
                self.rng.gen::<f64>() >= peer.miss_rate
            }
            None => {
                tracing::warn!("unknown probe {} queried by {}", target, caller);
                false
            }
        }
    }
}

/// Simulated population driving the ping protocol round by round.
pub struct Network {
    peers: Vec<SimPeer>,
    index: HashMap<PeerId, usize>,
    config: ProtocolConfig,
    sample_rng: StdRng,
    answer_rng: StdRng,
    stats: PingStats,
    windows: u64,
}

impl Network {
    pub fn new(config: ProtocolConfig, seed: u64) -> Self {
        Self {
            peers: Vec::new(),
            index: HashMap::new(),
            config,
            // Two streams off one seed: sampling draws must not shift with
            // the number of answer draws earlier pings consumed.
            sample_rng: StdRng::seed_from_u64(seed),
            answer_rng: StdRng::seed_from_u64(seed ^ 0x5157_ee9d_85e2_b049),
            stats: PingStats::default(),
            windows: 0,
        }
    }

    /// Population of `count` honest peers with full mutual baseline trust.
    pub fn seeded(count: usize, config: ProtocolConfig, seed: u64) -> Self {
        let mut network = Self::new(config, seed);
        for _ in 0..count {
            network.add_peer(0.0);
        }

        let ids: Vec<PeerId> = network.peer_ids();
        for peer in &mut network.peers {
            for id in &ids {
                if *id != peer.id {
                    peer.ledger.insert(id.clone(), BASELINE_RECORD);
                }
            }
        }
        network
    }

    fn push_peer(&mut self, id: PeerId, miss_rate: f64, ledger: RatingLedger) -> PeerId {
        self.index.insert(id.clone(), self.peers.len());
        self.peers.push(SimPeer {
            id: id.clone(),
            miss_rate,
            ledger,
        });
        id
    }

    pub fn add_peer(&mut self, miss_rate: f64) -> PeerId {
        let id = format!("peer-{}", self.peers.len());
        self.push_peer(id, miss_rate, RatingLedger::new())
    }

    /// Newcomer bootstrapping from a referrer: it copies the referrer's
    /// table, rates the referrer at baseline trust, and the referrer
    /// registers the newcomer in turn.
    pub fn add_peer_with_referrer(&mut self, miss_rate: f64, referrer: &str) -> Option<PeerId> {
        let &referrer_index = self.index.get(referrer)?;

        let mut ledger = self.peers[referrer_index].ledger.clone();
        ledger.insert(referrer.to_string(), BASELINE_RECORD);

        let id = format!("peer-{}", self.peers.len());
        self.peers[referrer_index].ledger.get_or_create(&id);
        Some(self.push_peer(id, miss_rate, ledger))
    }

    /// Injects `count` colluding peers that rate every other peer, each
    /// other included, with the collusion record and always answer wrong.
    pub fn add_evil_cluster(&mut self, count: usize) -> Vec<PeerId> {
        let start = self.peers.len();
        let mut ids: Vec<PeerId> = self.peer_ids();
        for k in 0..count {
            ids.push(format!("peer-{}", start + k));
        }

        let mut added = Vec::with_capacity(count);
        for k in 0..count {
            let own = format!("peer-{}", start + k);
            let mut ledger = RatingLedger::new();
            for id in &ids {
                if *id != own {
                    ledger.insert(id.clone(), COLLUSION_RECORD);
                }
            }
            added.push(self.push_peer(own, 1.0, ledger));
        }
        added
    }

    pub fn set_miss_rate(&mut self, peer: &str, miss_rate: f64) -> bool {
        match self.index.get(peer) {
            Some(&i) => {
                self.peers[i].miss_rate = miss_rate;
                true
            }
            None => false,
        }
    }

    /// Runs one ping by the peer at `index` against the rest of the
    /// population and folds the outcome into the running stats.
    pub fn ping_peer(&mut self, index: usize) -> PingOutcome {
        let caller = self.peers[index].id.clone();
        let mut ledger = mem::take(&mut self.peers[index].ledger);

        let mut world = SimWorld {
            peers: &mut self.peers,
            index: &self.index,
            rng: &mut self.answer_rng,
        };
        let outcome = ping(
            &caller,
            &mut ledger,
            &mut world,
            &self.config,
            &mut self.sample_rng,
        );

        self.peers[index].ledger = ledger;
        self.stats.record(outcome.best_answer);
        outcome
    }

    /// One round: every peer pings once, in population order.
    pub fn round(&mut self) {
        for index in 0..self.peers.len() {
            self.ping_peer(index);
        }
    }

    pub fn run(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.round();
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|peer| peer.id.clone()).collect()
    }

    pub fn peer(&self, id: &str) -> Option<&SimPeer> {
        self.index.get(id).map(|&i| &self.peers[i])
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn stats(&self) -> PingStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Ordered peer pairs with no ledger entry at all.
    pub fn missing_links(&self) -> u64 {
        let mut missing = 0;
        for observer in &self.peers {
            for subject in &self.peers {
                if observer.id != subject.id && !observer.ledger.contains(&subject.id) {
                    missing += 1;
                }
            }
        }
        missing
    }

    pub fn report(&mut self) -> NetworkReport {
        self.windows += 1;
        let n = self.peers.len() as u64;
        let pairs = n * n - n;
        let missing = self.missing_links();

        NetworkReport {
            window: self.windows,
            peers: self.peers.len(),
            total_pings: self.stats.total_pings,
            correct_pings: self.stats.correct_pings,
            accuracy: self.stats.accuracy(),
            missing_links: missing,
            missing_link_ratio: if pairs == 0 {
                0.0
            } else {
                missing as f64 / pairs as f64
            },
        }
    }

    pub fn reputation_matrix(&self, subjects: &[PeerId]) -> ReputationMatrix {
        let rows = self
            .peers
            .iter()
            .map(|observer| {
                subjects
                    .iter()
                    .map(|subject| {
                        observer
                            .ledger
                            .get(subject)
                            .map(|record| (record.probe_score(), record.rec_score()))
                    })
                    .collect()
            })
            .collect();

        ReputationMatrix {
            observers: self.peer_ids(),
            subjects: subjects.to_vec(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_population_has_full_mutual_trust() {
        let network = Network::seeded(4, ProtocolConfig::default(), 1);

        assert_eq!(network.len(), 4);
        assert_eq!(network.missing_links(), 0);

        let peer = network.peer("peer-0").unwrap();
        assert_eq!(peer.ledger.get("peer-1"), Some(&BASELINE_RECORD));
        assert!(!peer.ledger.contains("peer-0"));
    }

    #[test]
    fn test_referrer_bootstrap_copies_table_and_links_back() {
        let mut network = Network::seeded(3, ProtocolConfig::default(), 1);

        let newcomer = network
            .add_peer_with_referrer(0.0, "peer-1")
            .expect("referrer exists");
        assert_eq!(newcomer, "peer-3");

        let newcomer_peer = network.peer("peer-3").unwrap();
        assert_eq!(newcomer_peer.ledger.get("peer-1"), Some(&BASELINE_RECORD));
        assert_eq!(newcomer_peer.ledger.get("peer-0"), Some(&BASELINE_RECORD));

        // The referrer now knows the newcomer, with a zeroed record.
        let referrer = network.peer("peer-1").unwrap();
        assert_eq!(referrer.ledger.get("peer-3"), Some(&RatingRecord::new()));
    }

    #[test]
    fn test_unknown_referrer_is_rejected() {
        let mut network = Network::new(ProtocolConfig::default(), 1);
        assert!(network.add_peer_with_referrer(0.0, "peer-9").is_none());
    }

    #[test]
    fn test_evil_cluster_rates_everyone_but_itself() {
        let mut network = Network::seeded(3, ProtocolConfig::default(), 1);
        let added = network.add_evil_cluster(2);
        assert_eq!(added, ["peer-3", "peer-4"]);

        let evil = network.peer("peer-3").unwrap();
        assert_eq!(evil.miss_rate, 1.0);
        assert_eq!(evil.ledger.get("peer-0"), Some(&COLLUSION_RECORD));
        assert_eq!(evil.ledger.get("peer-4"), Some(&COLLUSION_RECORD));
        assert!(!evil.ledger.contains("peer-3"));
    }

    #[test]
    fn test_isolated_peer_ping_is_a_noop() {
        let mut network = Network::new(ProtocolConfig::default(), 1);
        network.add_peer(0.0);

        let outcome = network.ping_peer(0);

        assert!(!outcome.best_answer);
        assert_eq!(outcome.queried(), 0);
        assert!(network.peer("peer-0").unwrap().ledger.is_empty());
        assert_eq!(network.stats().total_pings, 1);
        assert_eq!(network.stats().correct_pings, 0);
    }

    #[test]
    fn test_round_pings_every_peer_once() {
        let mut network = Network::seeded(5, ProtocolConfig::default(), 1);
        network.round();

        assert_eq!(network.stats().total_pings, 5);
    }

    #[test]
    fn test_reset_stats_opens_a_fresh_window() {
        let mut network = Network::seeded(3, ProtocolConfig::default(), 1);
        network.run(2);
        assert_eq!(network.stats().total_pings, 6);

        network.reset_stats();
        assert_eq!(network.stats().total_pings, 0);

        network.round();
        assert_eq!(network.stats().total_pings, 3);
    }

    #[test]
    fn test_report_ratio_over_ordered_pairs() {
        let mut network = Network::new(ProtocolConfig::default(), 1);
        network.add_peer(0.0);
        network.add_peer(0.0);
        network.add_peer(0.0);

        let report = network.report();
        assert_eq!(report.window, 1);
        assert_eq!(report.missing_links, 6);
        assert_eq!(report.missing_link_ratio, 1.0);
        assert_eq!(report.accuracy, None);

        assert_eq!(network.report().window, 2);
    }

    #[test]
    fn test_reputation_matrix_selects_subjects() {
        let mut network = Network::seeded(3, ProtocolConfig::default(), 1);
        network.run(2);

        let matrix = network.reputation_matrix(&["peer-2".to_string()]);
        assert_eq!(matrix.observers.len(), 3);
        assert_eq!(matrix.rows[0].len(), 1);
        assert!(matrix.rows[0][0].is_some());
    }

    #[test]
    fn test_identical_seeds_replay_identically() {
        let build = || {
            let mut network = Network::seeded(6, ProtocolConfig::default(), 123);
            network.add_evil_cluster(1);
            network.run(20);
            network
        };

        let first = build();
        let second = build();

        for id in first.peer_ids() {
            assert_eq!(
                first.peer(&id).unwrap().ledger,
                second.peer(&id).unwrap().ledger,
                "ledger of {} diverged",
                id
            );
        }
    }
}
