use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::labels::{AnsPeriod, ParticipantId, VisitId, VnsStatus};
use super::model::{CsvColumn, RecordingTable};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// SegmentKey – which rows form a segment
// ---------------------------------------------------------------------------

/// A (visit, condition, status) triple present in a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SegmentKey {
    pub visit: VisitId,
    pub period: AnsPeriod,
    pub status: VnsStatus,
}

impl SegmentKey {
    pub fn new(visit: VisitId, period: AnsPeriod, status: VnsStatus) -> Self {
        SegmentKey {
            visit,
            period,
            status,
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.visit, self.period, self.status)
    }
}

// ---------------------------------------------------------------------------
// SegmentIndex – row indices per label tuple
// ---------------------------------------------------------------------------

/// Row indices of every (participant, visit, condition, status) tuple of a
/// table. Rows whose labels fall outside the closed sets are left out of the
/// index; each distinct bad token is logged once.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    visits: BTreeSet<VisitId>,
    segments: BTreeMap<(String, SegmentKey), Vec<usize>>,
    skipped_rows: usize,
}

impl SegmentIndex {
    /// Index a table. Fails only when a label column is missing or not text.
    pub fn build(table: &RecordingTable, period_aliases: bool) -> Result<Self> {
        let participants = label_column(table, CsvColumn::ParticipantId)?;
        let visits = label_column(table, CsvColumn::VisitId)?;
        let periods = label_column(table, CsvColumn::AnsPeriod)?;
        let statuses = label_column(table, CsvColumn::AnsStatus)?;

        let parse_period = |s: &str| {
            if period_aliases {
                AnsPeriod::parse_with_aliases(s)
            } else {
                s.parse::<AnsPeriod>()
            }
        };

        let mut index = SegmentIndex::default();
        let mut bad_tokens: BTreeSet<String> = BTreeSet::new();

        for row in 0..table.len() {
            let visit = match visits[row].parse::<VisitId>() {
                Ok(v) => v,
                Err(e) => {
                    bad_tokens.insert(e.to_string());
                    index.skipped_rows += 1;
                    continue;
                }
            };
            index.visits.insert(visit);

            let labels = parse_period(&periods[row]).and_then(|period| {
                statuses[row]
                    .parse::<VnsStatus>()
                    .map(|status| (period, status))
            });
            match labels {
                Ok((period, status)) => index
                    .segments
                    .entry((participants[row].clone(), SegmentKey::new(visit, period, status)))
                    .or_default()
                    .push(row),
                Err(e) => {
                    bad_tokens.insert(e.to_string());
                    index.skipped_rows += 1;
                }
            }
        }

        for token in &bad_tokens {
            log::warn!("Skipping rows with invalid labels: {token}");
        }
        Ok(index)
    }

    /// Distinct visits present, in order.
    pub fn visits(&self) -> Vec<VisitId> {
        self.visits.iter().copied().collect()
    }

    /// Distinct (condition, status) pairs observed for a visit.
    pub fn conditions_and_status(&self, visit: VisitId) -> BTreeSet<(AnsPeriod, VnsStatus)> {
        self.segments
            .keys()
            .filter(|(_, key)| key.visit == visit)
            .map(|(_, key)| (key.period, key.status))
            .collect()
    }

    /// Every (visit, condition, status) triple present.
    pub fn triples(&self) -> BTreeSet<SegmentKey> {
        self.segments.keys().map(|(_, key)| *key).collect()
    }

    /// Rows of one segment; empty when the tuple does not occur.
    pub fn rows(&self, participant: &ParticipantId, key: &SegmentKey) -> &[usize] {
        self.segments
            .get(&(participant.as_str().to_string(), *key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Materialize one segment of `table` (which must be the indexed table).
    pub fn segment(
        &self,
        table: &RecordingTable,
        participant: &ParticipantId,
        key: &SegmentKey,
    ) -> RecordingTable {
        table.select_rows(self.rows(participant, key))
    }

    /// Rows left out because of invalid labels.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

fn label_column(table: &RecordingTable, column: CsvColumn) -> Result<&[String]> {
    table
        .text(column.name())
        .ok_or_else(|| Error::Validation(format!("table has no text column '{column}'")))
}
