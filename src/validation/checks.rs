use std::collections::BTreeSet;
use std::fmt::Display;
use std::time::Duration;

use super::CheckResult;
use crate::config::DEFAULT_SAMPLING_RATE_HZ;
use crate::data::labels::{AnsPeriod, VnsStatus};
use crate::data::model::{CsvColumn, RecordingTable};

/// Expected sampling rate of the coarse time series, in Hz.
pub const EXPECTED_SAMPLING_RATE: u32 = DEFAULT_SAMPLING_RATE_HZ;

/// (condition, status) pairs every visit is expected to contain.
///
/// BASEHUT is only expected OFF and RECHUT only ON, unlike the IHG and PECO
/// baseline/recovery pairs which are expected in both states.
pub const EXPECTED_ANS_PERIODS_AND_VNS_STATUS: [(AnsPeriod, VnsStatus); 16] = [
    (AnsPeriod::Stim1, VnsStatus::On),
    (AnsPeriod::Stim2, VnsStatus::On),
    (AnsPeriod::Stim3, VnsStatus::On),
    (AnsPeriod::Rest, VnsStatus::Off),
    (AnsPeriod::Ihg, VnsStatus::On),
    (AnsPeriod::Ihg, VnsStatus::Off),
    (AnsPeriod::Peco, VnsStatus::On),
    (AnsPeriod::Peco, VnsStatus::Off),
    (AnsPeriod::Hut, VnsStatus::On),
    (AnsPeriod::Hut, VnsStatus::Off),
    (AnsPeriod::BaselineIhg, VnsStatus::Off),
    (AnsPeriod::BaselineIhg, VnsStatus::On),
    (AnsPeriod::RecoveryPeco, VnsStatus::Off),
    (AnsPeriod::RecoveryPeco, VnsStatus::On),
    (AnsPeriod::BaselineHut, VnsStatus::Off),
    (AnsPeriod::RecoveryHut, VnsStatus::On),
];

pub const MISSING_ANS_PERIODS: &str = "check_missing_ans_periods_and_vns_status";
pub const UNEXPECTED_ANS_PERIODS: &str = "check_unexpected_ans_periods_and_vns_status";
pub const MISSING_CHANNELS: &str = "check_missing_recording_channels";
pub const UNEXPECTED_CHANNELS: &str = "check_unexpected_recording_channels";
pub const SAMPLING_RATE: &str = "check_sampling_rate";

pub fn expected_ans_periods_and_vns_status() -> BTreeSet<(AnsPeriod, VnsStatus)> {
    EXPECTED_ANS_PERIODS_AND_VNS_STATUS.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

pub fn check_missing_ans_periods_and_vns_status(
    observed: &BTreeSet<(AnsPeriod, VnsStatus)>,
) -> CheckResult {
    let missing: Vec<_> = expected_ans_periods_and_vns_status()
        .difference(observed)
        .map(|&(p, s)| format!("({p}, {s})"))
        .collect();
    if missing.is_empty() {
        return CheckResult::pass(MISSING_ANS_PERIODS);
    }
    CheckResult::fail(
        MISSING_ANS_PERIODS,
        format!(
            "Missing ANS periods and VNS status in the data. Missing: {}",
            braced(&missing)
        ),
    )
}

pub fn check_unexpected_ans_periods_and_vns_status(
    observed: &BTreeSet<(AnsPeriod, VnsStatus)>,
) -> CheckResult {
    let expected = expected_ans_periods_and_vns_status();
    let unexpected: Vec<_> = observed
        .difference(&expected)
        .map(|&(p, s)| format!("({p}, {s})"))
        .collect();
    if unexpected.is_empty() {
        return CheckResult::pass(UNEXPECTED_ANS_PERIODS);
    }
    CheckResult::fail(
        UNEXPECTED_ANS_PERIODS,
        format!(
            "Unexpected ANS periods and VNS status in the data. Unexpected: {}",
            braced(&unexpected)
        ),
    )
}

// ---------------------------------------------------------------------------
// Channel presence
// ---------------------------------------------------------------------------

pub fn check_missing_recording_channels(table: &RecordingTable) -> CheckResult {
    let actual: BTreeSet<&str> = table.column_names().into_iter().collect();
    let missing: BTreeSet<&str> = CsvColumn::required()
        .into_iter()
        .filter(|c| !actual.contains(c))
        .collect();
    if missing.is_empty() {
        return CheckResult::pass(MISSING_CHANNELS);
    }
    CheckResult::fail(
        MISSING_CHANNELS,
        format!("Missing channels in the data. Missing: {}", braced(&missing)),
    )
}

pub fn check_unexpected_recording_channels(table: &RecordingTable) -> CheckResult {
    let expected: BTreeSet<&str> = CsvColumn::required().into_iter().collect();
    let unexpected: BTreeSet<&str> = table
        .column_names()
        .into_iter()
        .filter(|c| !expected.contains(c))
        .collect();
    if unexpected.is_empty() {
        return CheckResult::pass(UNEXPECTED_CHANNELS);
    }
    CheckResult::fail(
        UNEXPECTED_CHANNELS,
        format!(
            "Unexpected channels in the data. Unexpected: {}",
            braced(&unexpected)
        ),
    )
}

// ---------------------------------------------------------------------------
// Sampling rate
// ---------------------------------------------------------------------------

/// Observed sampling rate of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRate {
    /// `round(rows / elapsed_seconds)`.
    Computed(u64),
    /// Fewer than two rows, or no time elapsed between first and last row.
    NotComputable { rows: usize, elapsed: Duration },
}

impl SamplingRate {
    pub fn of(table: &RecordingTable) -> Self {
        let rows = table.len();
        let elapsed = table.time_span().unwrap_or_default();
        if rows < 2 || elapsed.is_zero() {
            return SamplingRate::NotComputable { rows, elapsed };
        }
        SamplingRate::Computed((rows as f64 / elapsed.as_secs_f64()).round() as u64)
    }
}

pub fn check_sampling_rate(table: &RecordingTable, expected_hz: u32) -> CheckResult {
    match SamplingRate::of(table) {
        SamplingRate::Computed(actual) if actual == u64::from(expected_hz) => {
            CheckResult::pass(SAMPLING_RATE)
        }
        SamplingRate::Computed(actual) => CheckResult::fail(
            SAMPLING_RATE,
            format!("Unexpected sampling rate. Expected: {expected_hz}, Actual: {actual}"),
        ),
        SamplingRate::NotComputable { rows, elapsed } => CheckResult::fail(
            SAMPLING_RATE,
            format!(
                "Sampling rate not computable: {rows} rows over {:.3} s. Expected: {expected_hz}",
                elapsed.as_secs_f64()
            ),
        ),
    }
}

fn braced<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    let inner: Vec<String> = items.into_iter().map(|i| i.to_string()).collect();
    format!("{{{}}}", inner.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Channel, ChannelData};

    /// `rows` samples spaced `step_us` microseconds apart, all expected
    /// channels present.
    fn recording(rows: usize, step_us: u64) -> RecordingTable {
        let index = (0..rows as u64).map(|i| Duration::from_micros(i * step_us)).collect();
        let channels = CsvColumn::required()
            .into_iter()
            .map(|name| Channel {
                name: name.to_string(),
                data: if CsvColumn::is_text(name) {
                    ChannelData::Text(vec![String::new(); rows])
                } else {
                    ChannelData::Numeric(vec![0.0; rows])
                },
            })
            .collect();
        RecordingTable::new(index, channels).unwrap()
    }

    #[test]
    fn expected_set_has_sixteen_distinct_pairs() {
        assert_eq!(expected_ans_periods_and_vns_status().len(), 16);
    }

    #[test]
    fn hut_baseline_and_recovery_are_asymmetric() {
        let expected = expected_ans_periods_and_vns_status();
        assert!(expected.contains(&(AnsPeriod::BaselineHut, VnsStatus::Off)));
        assert!(!expected.contains(&(AnsPeriod::BaselineHut, VnsStatus::On)));
        assert!(expected.contains(&(AnsPeriod::RecoveryHut, VnsStatus::On)));
        assert!(!expected.contains(&(AnsPeriod::RecoveryHut, VnsStatus::Off)));
        // The IHG and PECO counterparts are expected in both states.
        for status in [VnsStatus::On, VnsStatus::Off] {
            assert!(expected.contains(&(AnsPeriod::BaselineIhg, status)));
            assert!(expected.contains(&(AnsPeriod::RecoveryPeco, status)));
        }
    }

    #[test]
    fn full_expected_set_passes_both_completeness_checks() {
        let observed = expected_ans_periods_and_vns_status();
        assert!(check_missing_ans_periods_and_vns_status(&observed).passed);
        assert!(check_unexpected_ans_periods_and_vns_status(&observed).passed);
    }

    #[test]
    fn removing_a_pair_fails_only_the_missing_check() {
        let mut observed = expected_ans_periods_and_vns_status();
        observed.remove(&(AnsPeriod::Ihg, VnsStatus::On));
        let missing = check_missing_ans_periods_and_vns_status(&observed);
        assert!(!missing.passed);
        assert_eq!(missing.name, MISSING_ANS_PERIODS);
        assert!(missing.details.unwrap().contains("(IHG, ON)"));
        assert!(check_unexpected_ans_periods_and_vns_status(&observed).passed);
    }

    #[test]
    fn adding_a_pair_fails_only_the_unexpected_check() {
        let mut observed = expected_ans_periods_and_vns_status();
        observed.insert((AnsPeriod::Rest, VnsStatus::On));
        assert!(check_missing_ans_periods_and_vns_status(&observed).passed);
        let unexpected = check_unexpected_ans_periods_and_vns_status(&observed);
        assert!(!unexpected.passed);
        assert_eq!(
            unexpected.details.as_deref(),
            Some("Unexpected ANS periods and VNS status in the data. Unexpected: {(REST, ON)}")
        );
    }

    #[test]
    fn complete_channels_pass_both_presence_checks() {
        let table = recording(10, 4000);
        assert_eq!(table.column_names().len(), 20);
        assert!(check_missing_recording_channels(&table).passed);
        assert!(check_unexpected_recording_channels(&table).passed);
    }

    #[test]
    fn dropping_hr_fails_only_the_missing_channel_check() {
        let mut table = recording(10, 4000);
        table.drop_channel("HR").unwrap();
        let missing = check_missing_recording_channels(&table);
        assert!(!missing.passed);
        assert_eq!(
            missing.details.as_deref(),
            Some("Missing channels in the data. Missing: {HR}")
        );
        assert!(check_unexpected_recording_channels(&table).passed);
    }

    #[test]
    fn extra_column_fails_only_the_unexpected_channel_check() {
        let mut table = recording(10, 4000);
        table
            .insert_channel(Channel {
                name: "unexpected".into(),
                data: ChannelData::Numeric(vec![1.0; 10]),
            })
            .unwrap();
        assert!(check_missing_recording_channels(&table).passed);
        let unexpected = check_unexpected_recording_channels(&table);
        assert!(!unexpected.passed);
        assert!(unexpected.details.unwrap().contains("unexpected"));
    }

    #[test]
    fn one_thousand_rows_at_250_hz_pass() {
        // 0 .. 3.996 s in 4 ms steps.
        let table = recording(1000, 4000);
        assert_eq!(table.index().last(), Some(&Duration::from_millis(3996)));
        assert_eq!(SamplingRate::of(&table), SamplingRate::Computed(250));
        assert!(check_sampling_rate(&table, EXPECTED_SAMPLING_RATE).passed);
    }

    #[test]
    fn halving_the_rows_reports_125_hz() {
        let table = recording(1000, 4000);
        let every_other: Vec<usize> = (0..1000).step_by(2).collect();
        let halved = table.select_rows(&every_other);
        let result = check_sampling_rate(&halved, EXPECTED_SAMPLING_RATE);
        assert!(!result.passed);
        assert_eq!(
            result.details.as_deref(),
            Some("Unexpected sampling rate. Expected: 250, Actual: 125")
        );
    }

    #[test]
    fn downsampled_to_100_hz_fails_with_the_rate() {
        let table = recording(400, 10_000);
        let result = check_sampling_rate(&table, EXPECTED_SAMPLING_RATE);
        assert!(!result.passed);
        assert!(result.details.unwrap().contains("Actual: 100"));
        assert!(check_sampling_rate(&table, 100).passed);
    }

    #[test]
    fn single_row_or_zero_span_is_not_computable() {
        let one = recording(1, 4000);
        assert!(matches!(
            SamplingRate::of(&one),
            SamplingRate::NotComputable { rows: 1, .. }
        ));
        let flat = recording(5, 0);
        assert!(matches!(
            SamplingRate::of(&flat),
            SamplingRate::NotComputable { rows: 5, .. }
        ));
        let result = check_sampling_rate(&flat, EXPECTED_SAMPLING_RATE);
        assert!(!result.passed);
        assert!(result.details.unwrap().contains("not computable"));
        assert!(!check_sampling_rate(&RecordingTable::default(), 250).passed);
    }
}
