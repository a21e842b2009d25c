use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::config::ClientConfig;
use crate::data::client::TimeSeriesClient;
use crate::data::labels::{AnsPeriod, ParticipantId, VisitId, VnsStatus};
use crate::error::Result;

/// Entry point to a dataset.
///
/// Participants and their visits are resolved once, at construction. A
/// participant whose visits cannot be resolved (typically because the
/// recording is missing or malformed) stays listed, with no visits and the
/// reason kept in [`unresolved`](Self::unresolved).
pub struct DatasetClient {
    coarse: TimeSeriesClient,
    participants: Vec<ParticipantId>,
    visits: BTreeMap<ParticipantId, Vec<VisitId>>,
    unresolved: BTreeMap<ParticipantId, String>,
}

impl DatasetClient {
    /// Resolve participants and visits through `coarse`. Fails only when the
    /// participant directory cannot be listed.
    pub fn new(coarse: TimeSeriesClient) -> Result<Self> {
        let participants = coarse.get_participant_ids()?;
        let mut visits = BTreeMap::new();
        let mut unresolved = BTreeMap::new();

        for participant in &participants {
            match coarse.get_visit_ids(participant) {
                Ok(ids) => {
                    visits.insert(participant.clone(), ids);
                }
                Err(e) => {
                    log::warn!("Could not resolve visits of {participant}: {e}");
                    unresolved.insert(participant.clone(), e.to_string());
                }
            }
        }
        log::info!(
            "Dataset at {}: {} participants ({} unresolved)",
            coarse.layout().root().display(),
            participants.len(),
            unresolved.len()
        );

        Ok(DatasetClient {
            coarse,
            participants,
            visits,
            unresolved,
        })
    }

    /// Client over the current dataset generation with default settings.
    pub fn from_path(dataset_root: impl Into<PathBuf>) -> Result<Self> {
        DatasetClient::new(TimeSeriesClient::from_path(dataset_root)?)
    }

    pub fn with_config(dataset_root: impl Into<PathBuf>, config: ClientConfig) -> Result<Self> {
        DatasetClient::new(TimeSeriesClient::new(dataset_root, config)?)
    }

    /// Participant ids in directory order.
    pub fn participant_ids(&self) -> &[ParticipantId] {
        &self.participants
    }

    /// Visits of a participant; empty for unknown or unresolved participants.
    pub fn visit_ids(&self, participant: &ParticipantId) -> &[VisitId] {
        self.visits.get(participant).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Why a participant's visits could not be resolved, if they could not.
    pub fn unresolved(&self, participant: &ParticipantId) -> Option<&str> {
        self.unresolved.get(participant).map(String::as_str)
    }

    pub fn ans_periods_and_vns_status(
        &self,
        participant: &ParticipantId,
        visit: VisitId,
    ) -> Result<BTreeSet<(AnsPeriod, VnsStatus)>> {
        self.coarse.get_conditions_and_status(participant, visit)
    }

    pub fn coarse_time_series(&self) -> &TimeSeriesClient {
        &self.coarse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;

    #[test]
    fn unresolvable_participants_stay_listed() {
        let tmp = tempfile::tempdir().unwrap();
        let ans = tmp.path().join("primary/sub-P1/ANS");
        fs::create_dir_all(&ans).unwrap();
        fs::write(
            ans.join("P1_lab_ans_all.csv"),
            "LabChartTime|Participant_ID|Visit_ID|ANS_Period|ANS_Status\n0|P1|SV2|REST|OFF\n",
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("primary/sub-P2")).unwrap();

        let client = DatasetClient::from_path(tmp.path()).unwrap();
        assert_eq!(client.participant_ids().len(), 2);

        let p1 = ParticipantId::new("P1").unwrap();
        let p2 = ParticipantId::new("P2").unwrap();
        assert_eq!(client.visit_ids(&p1), &[VisitId::Sv2]);
        assert!(client.unresolved(&p1).is_none());
        assert!(client.visit_ids(&p2).is_empty());
        assert!(client.unresolved(&p2).is_some());
        assert_eq!(
            client.ans_periods_and_vns_status(&p1, VisitId::Sv2).unwrap().len(),
            1
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            DatasetClient::from_path(tmp.path().join("nope")),
            Err(Error::NotFound(_))
        ));
    }
}
