use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PeerId = String;

/// Rating counters one peer keeps about another. Counters only ever
/// increase; trust is read through the signed score deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub good_probe: u64,
    pub bad_probe: u64,
    pub good_rec: u64,
    pub bad_rec: u64,
}

impl RatingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn from_counters(good_probe: u64, bad_probe: u64, good_rec: u64, bad_rec: u64) -> Self {
        Self {
            good_probe,
            bad_probe,
            good_rec,
            bad_rec,
        }
    }

    /// Trust in the subject as an answering source.
    pub fn probe_score(&self) -> i64 {
        self.good_probe as i64 - self.bad_probe as i64
    }

    /// Trust in the subject as a voucher for third parties.
    pub fn rec_score(&self) -> i64 {
        self.good_rec as i64 - self.bad_rec as i64
    }

    pub fn record_probe(&mut self, good: bool) {
        if good {
            self.good_probe += 1;
        } else {
            self.bad_probe += 1;
        }
    }

    pub fn record_recommendation(&mut self, good: bool) {
        if good {
            self.good_rec += 1;
        } else {
            self.bad_rec += 1;
        }
    }
}

/// Immutable copy of a peer's rating table, as exported to another peer
/// during a ping. Identity-ordered so seeded runs replay exactly.
pub type RatingSnapshot = BTreeMap<PeerId, RatingRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingLedger {
    records: BTreeMap<PeerId, RatingRecord>,
}

impl RatingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, subject: &str) -> Option<&RatingRecord> {
        self.records.get(subject)
    }

    /// Returns the stored record, durably inserting a zeroed one the first
    /// time a subject is referenced. A peer never holds a record for itself.
    pub fn get_or_create(&mut self, subject: &str) -> &mut RatingRecord {
        self.records.entry(subject.to_string()).or_default()
    }

    pub fn insert(&mut self, subject: PeerId, record: RatingRecord) {
        self.records.insert(subject, record);
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.records.contains_key(subject)
    }

    pub fn record_probe(&mut self, subject: &str, good: bool) {
        self.get_or_create(subject).record_probe(good);
    }

    pub fn record_recommendation(&mut self, subject: &str, good: bool) {
        self.get_or_create(subject).record_recommendation(good);
    }

    pub fn snapshot(&self) -> RatingSnapshot {
        self.records.clone()
    }

    pub fn contacts(&self) -> impl Iterator<Item = &PeerId> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &RatingRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
