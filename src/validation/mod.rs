//! Structural checks over the coarse time series.
//!
//! ```text
//! DatasetClient ──▶ runner ──▶ checks (pure) ──▶ CheckResult ──▶ ValidationReport
//! ```
//!
//! Checks never log and never fail: a data-quality problem is a
//! [`CheckResult`] with `passed == false`. Only the runner returns errors, and
//! only when the dataset cannot be scanned at all.

pub mod checks;
pub mod runner;

use serde::Serialize;

use crate::data::labels::{AnsPeriod, ParticipantId, VisitId, VnsStatus};

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    /// Failure description; `None` when the check passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        CheckResult {
            name: name.to_string(),
            passed: true,
            details: None,
        }
    }

    pub fn fail(name: &str, details: impl Into<String>) -> Self {
        CheckResult {
            name: name.to_string(),
            passed: false,
            details: Some(details.into()),
        }
    }
}

/// A check result and what it was run on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub participant: ParticipantId,
    /// `None` for participant-level entries (recording could not be loaded).
    pub visit: Option<VisitId>,
    /// `None` for visit-level (completeness) checks.
    pub segment: Option<(AnsPeriod, VnsStatus)>,
    #[serde(flatten)]
    pub result: CheckResult,
}

impl ReportEntry {
    /// Human readable location, e.g. `P1/SV1/IHG/ON`.
    pub fn location(&self) -> String {
        let mut s = self.participant.to_string();
        if let Some(visit) = self.visit {
            s.push('/');
            s.push_str(visit.as_str());
        }
        if let Some((period, status)) = self.segment {
            s.push_str(&format!("/{period}/{status}"));
        }
        s
    }
}

/// Ordered results of a validation run. Counts are derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub entries: Vec<ReportEntry>,
}

impl ValidationReport {
    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passed(&self) -> usize {
        self.entries.iter().filter(|e| e.result.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.passed()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.result.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.entries.iter().all(|e| e.result.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(passed: bool) -> ReportEntry {
        let result = if passed {
            CheckResult::pass("check_sampling_rate")
        } else {
            CheckResult::fail("check_sampling_rate", "Expected: 250, Actual: 125")
        };
        ReportEntry {
            participant: ParticipantId::new("P1").unwrap(),
            visit: Some(VisitId::Sv1),
            segment: Some((AnsPeriod::Ihg, VnsStatus::On)),
            result,
        }
    }

    #[test]
    fn counts_are_derived_from_entries() {
        let mut report = ValidationReport::default();
        report.push(entry(true));
        report.push(entry(false));
        report.push(entry(true));
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_passed());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn entries_serialize_flat() {
        let json = serde_json::to_value(entry(false)).unwrap();
        assert_eq!(json["participant"], "P1");
        assert_eq!(json["visit"], "SV1");
        assert_eq!(json["segment"], serde_json::json!(["IHG", "ON"]));
        assert_eq!(json["name"], "check_sampling_rate");
        assert_eq!(json["passed"], false);
        assert_eq!(entry(true).location(), "P1/SV1/IHG/ON");
        assert!(serde_json::to_value(entry(true)).unwrap().get("details").is_none());
    }
}
