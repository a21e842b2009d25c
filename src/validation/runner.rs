use std::path::PathBuf;

use super::checks::{
    check_missing_ans_periods_and_vns_status, check_missing_recording_channels,
    check_sampling_rate, check_unexpected_ans_periods_and_vns_status,
    check_unexpected_recording_channels,
};
use super::{CheckResult, ReportEntry, ValidationReport};
use crate::client::DatasetClient;
use crate::config::ClientConfig;
use crate::data::labels::ParticipantId;
use crate::error::Result;

/// Name of the entry reported when a participant's recording cannot be read.
pub const LOAD_RECORDING: &str = "load_recording";

/// Run every check over every participant, visit and segment.
///
/// Per visit: the two completeness checks, then for each (condition, status)
/// pair in order the missing-channel, unexpected-channel and sampling-rate
/// checks. A participant that cannot be read contributes one failed
/// [`LOAD_RECORDING`] entry. Data problems never make this return an error.
pub fn validate_coarse_time_series(client: &DatasetClient) -> ValidationReport {
    let expected_hz = client.coarse_time_series().config().expected_sampling_rate_hz;
    let mut report = ValidationReport::default();

    for participant in client.participant_ids() {
        if let Some(reason) = client.unresolved(participant) {
            report.push(load_failure(participant, reason));
            continue;
        }
        if let Err(e) = validate_participant(client, participant, expected_hz, &mut report) {
            report.push(load_failure(participant, &e.to_string()));
        }
    }

    log::info!(
        "Validated {} participants: {} checks passed, {} failed",
        client.participant_ids().len(),
        report.passed(),
        report.failed()
    );
    report
}

/// Open the dataset at `dataset_root` and validate it. Fails only when the
/// dataset cannot be scanned or the configuration is invalid.
pub fn validate_dataset(
    dataset_root: impl Into<PathBuf>,
    config: ClientConfig,
) -> Result<ValidationReport> {
    let client = DatasetClient::with_config(dataset_root, config)?;
    Ok(validate_coarse_time_series(&client))
}

fn validate_participant(
    client: &DatasetClient,
    participant: &ParticipantId,
    expected_hz: u32,
    report: &mut ValidationReport,
) -> Result<()> {
    let coarse = client.coarse_time_series();
    for &visit in client.visit_ids(participant) {
        let observed = client.ans_periods_and_vns_status(participant, visit)?;
        let entry = |result: CheckResult, segment| ReportEntry {
            participant: participant.clone(),
            visit: Some(visit),
            segment,
            result,
        };

        report.push(entry(check_missing_ans_periods_and_vns_status(&observed), None));
        report.push(entry(check_unexpected_ans_periods_and_vns_status(&observed), None));

        for &(period, status) in &observed {
            let segment = coarse.get_segment(participant, visit, period, status)?;
            let at = Some((period, status));
            report.push(entry(check_missing_recording_channels(&segment), at));
            report.push(entry(check_unexpected_recording_channels(&segment), at));
            report.push(entry(check_sampling_rate(&segment, expected_hz), at));
        }
    }
    Ok(())
}

fn load_failure(participant: &ParticipantId, reason: &str) -> ReportEntry {
    ReportEntry {
        participant: participant.clone(),
        visit: None,
        segment: None,
        result: CheckResult::fail(LOAD_RECORDING, reason),
    }
}
