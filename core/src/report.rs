use serde::Serialize;
use std::fmt;

use crate::reputation::PeerId;

/// Running totals for a measurement window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PingStats {
    pub total_pings: u64,
    pub correct_pings: u64,
}

impl PingStats {
    pub fn record(&mut self, correct: bool) {
        self.total_pings += 1;
        if correct {
            self.correct_pings += 1;
        }
    }

    /// `None` when no pings were recorded; reported as "undefined" rather
    /// than dividing by zero.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_pings == 0 {
            None
        } else {
            Some(self.correct_pings as f64 / self.total_pings as f64)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub window: u64,
    pub peers: usize,
    pub total_pings: u64,
    pub correct_pings: u64,
    pub accuracy: Option<f64>,
    pub missing_links: u64,
    pub missing_link_ratio: f64,
}

impl fmt::Display for NetworkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stat {}", self.window)?;
        writeln!(f, "Total pings: {}", self.total_pings)?;
        match self.accuracy {
            Some(accuracy) => writeln!(f, "Accuracy: {}", accuracy)?,
            None => writeln!(f, "Accuracy: undefined")?,
        }
        write!(
            f,
            "Missing links (# | %): {} | {}",
            self.missing_links, self.missing_link_ratio
        )
    }
}

/// Score matrix over the population: one row per observer, one column per
/// selected subject, each cell the observer's `[probe_score, rec_score]`
/// for that subject or blank where no link exists yet.
#[derive(Debug, Clone, Serialize)]
pub struct ReputationMatrix {
    pub observers: Vec<PeerId>,
    pub subjects: Vec<PeerId>,
    pub rows: Vec<Vec<Option<(i64, i64)>>>,
}

impl fmt::Display for ReputationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some((probe, rec)) => format!("{}:{}", probe, rec),
                        None => "-".to_string(),
                    })
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = self.subjects.iter().map(|s| s.len()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }
        let observer_width = self
            .observers
            .iter()
            .map(|o| o.len())
            .max()
            .unwrap_or(0)
            .max("observer".len());

        write!(f, "{:<observer_width$}", "observer")?;
        for (subject, &width) in self.subjects.iter().zip(&widths) {
            write!(f, "  {:>width$}", subject)?;
        }
        for (observer, row) in self.observers.iter().zip(&cells) {
            writeln!(f)?;
            write!(f, "{:<observer_width$}", observer)?;
            for (cell, &width) in row.iter().zip(&widths) {
                write!(f, "  {:>width$}", cell)?;
            }
        }
        Ok(())
    }
}
