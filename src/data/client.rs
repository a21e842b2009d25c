use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use super::cache::TableCache;
use super::filter::{SegmentIndex, SegmentKey};
use super::labels::{AnsPeriod, ParticipantId, VisitId, VnsStatus};
use super::layout::DatasetLayout;
use super::loader::load_recording;
use super::model::{CsvColumn, RecordingTable};
use crate::config::{ClientConfig, VisitSource};
use crate::error::{Error, Result};

/// A participant's decoded recording and its segment index. This is the
/// cache unit.
#[derive(Debug)]
pub struct Recording {
    pub participant: ParticipantId,
    pub table: RecordingTable,
    pub index: SegmentIndex,
}

// ---------------------------------------------------------------------------
// TimeSeriesClient
// ---------------------------------------------------------------------------

/// Access to the coarse (250 Hz) time series of a dataset.
///
/// Each participant's recording is decoded at most once while it stays in
/// the LRU cache; every query is answered from the cached table.
pub struct TimeSeriesClient {
    layout: DatasetLayout,
    config: ClientConfig,
    delimiter: u8,
    cache: TableCache<ParticipantId, Recording>,
}

impl TimeSeriesClient {
    pub fn new(dataset_root: impl Into<PathBuf>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let delimiter = config.schema.delimiter_byte()?;
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .ok_or_else(|| Error::Config("cache capacity must be at least 1".into()))?;
        Ok(TimeSeriesClient {
            layout: DatasetLayout::new(dataset_root, config.schema.clone()),
            config,
            delimiter,
            cache: TableCache::new(capacity),
        })
    }

    /// Client with the default (current generation) configuration.
    pub fn from_path(dataset_root: impl Into<PathBuf>) -> Result<Self> {
        TimeSeriesClient::new(dataset_root, ClientConfig::default())
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get_participant_ids(&self) -> Result<Vec<ParticipantId>> {
        self.layout.list_participant_ids()
    }

    /// Decoded recording of a participant, from the cache when possible.
    pub fn load_participant(&self, participant: &ParticipantId) -> Result<Arc<Recording>> {
        self.cache
            .get_or_load(participant, || self.decode_participant(participant))
    }

    /// Visits of a participant, from file names or from the `Visit_ID`
    /// column depending on the schema. Unknown tokens are skipped.
    pub fn get_visit_ids(&self, participant: &ParticipantId) -> Result<Vec<VisitId>> {
        match self.config.schema.visit_source {
            VisitSource::FileNames => self.layout.visit_ids_from_file_names(participant),
            VisitSource::DataColumn => Ok(self.load_participant(participant)?.index.visits()),
        }
    }

    /// Distinct (condition, status) pairs recorded during a visit.
    pub fn get_conditions_and_status(
        &self,
        participant: &ParticipantId,
        visit: VisitId,
    ) -> Result<BTreeSet<(AnsPeriod, VnsStatus)>> {
        Ok(self
            .load_participant(participant)?
            .index
            .conditions_and_status(visit))
    }

    /// Rows of one (participant, visit, condition, status) tuple. Empty when
    /// the tuple does not occur in the recording.
    pub fn get_segment(
        &self,
        participant: &ParticipantId,
        visit: VisitId,
        period: AnsPeriod,
        status: VnsStatus,
    ) -> Result<RecordingTable> {
        let recording = self.load_participant(participant)?;
        let key = SegmentKey::new(visit, period, status);
        Ok(recording.index.segment(&recording.table, participant, &key))
    }

    /// [`get_segment`](Self::get_segment) with string labels. A label that
    /// does not parse is an error.
    pub fn get_segment_by_labels(
        &self,
        participant: &str,
        visit: &str,
        period: &str,
        status: &str,
    ) -> Result<RecordingTable> {
        let participant = ParticipantId::new(participant)?;
        let period = if self.config.schema.period_aliases {
            AnsPeriod::parse_with_aliases(period)?
        } else {
            period.parse()?
        };
        self.get_segment(&participant, visit.parse()?, period, status.parse()?)
    }

    /// Participants currently cached, most recently used first.
    pub fn cached_participants(&self) -> Vec<ParticipantId> {
        self.cache.keys()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn decode_participant(&self, participant: &ParticipantId) -> Result<Recording> {
        let files = self.layout.recording_files(participant)?;
        if files.is_empty() {
            return Err(Error::NotFound(self.layout.participant_dir(participant)));
        }

        let mut table = RecordingTable::default();
        for file in files {
            let part = load_recording(&file.path, self.delimiter)?;
            warn_on_label_mismatch(&part, participant, file.visit, &file.path);
            table
                .append(part)
                .map_err(|msg| Error::parse(&file.path, msg))?;
        }

        let index = SegmentIndex::build(&table, self.config.schema.period_aliases)?;
        log::info!(
            "Loaded recording of {participant}: {} rows, {} segments",
            table.len(),
            index.triples().len()
        );
        Ok(Recording {
            participant: participant.clone(),
            table,
            index,
        })
    }
}

/// Files are expected to hold one participant (and, for per-visit files, one
/// visit). Deviations are logged; the rows are kept.
fn warn_on_label_mismatch(
    table: &RecordingTable,
    participant: &ParticipantId,
    visit: Option<VisitId>,
    path: &std::path::Path,
) {
    fn distinct(table: &RecordingTable, column: CsvColumn) -> BTreeSet<&str> {
        table
            .text(column.name())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    let participants = distinct(table, CsvColumn::ParticipantId);
    if participants.len() > 1 {
        log::warn!("{}: expected 1 participant ID, found {}", path.display(), participants.len());
    }
    if !table.is_empty() && !participants.contains(participant.as_str()) {
        log::warn!("{}: participant ID {participant} not found in the data", path.display());
    }

    if let Some(visit) = visit {
        let visits = distinct(table, CsvColumn::VisitId);
        if visits.len() > 1 {
            log::warn!("{}: expected 1 visit ID, found {}", path.display(), visits.len());
        }
        if !table.is_empty() && !visits.contains(visit.as_str()) {
            log::warn!("{}: visit ID {visit} not found in the data", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use std::fs;
    use std::path::Path;

    const HEADER: &str = "LabChartTime|Participant_ID|Visit_ID|ANS_Period|ANS_Status|HR";

    fn write_recording(root: &Path, participant: &str, rows: &[&str]) {
        let dir = root.join("primary").join(format!("sub-{participant}")).join("ANS");
        fs::create_dir_all(&dir).unwrap();
        let mut text = format!("{HEADER}\n");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        fs::write(dir.join(format!("{participant}_lab_ans_all.csv")), text).unwrap();
    }

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    #[test]
    fn answers_queries_from_one_decode() {
        let tmp = tempfile::tempdir().unwrap();
        write_recording(
            tmp.path(),
            "P1",
            &[
                "0.000|P1|SV1|REST|OFF|60",
                "0.004|P1|SV1|REST|OFF|61",
                "0.008|P1|SV1|STIM1|ON|62",
                "0.000|P1|SV2|HUT|ON|70",
            ],
        );
        let client = TimeSeriesClient::from_path(tmp.path()).unwrap();

        assert_eq!(client.get_visit_ids(&p("P1")).unwrap(), vec![VisitId::Sv1, VisitId::Sv2]);
        let pairs = client.get_conditions_and_status(&p("P1"), VisitId::Sv1).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs, client.get_conditions_and_status(&p("P1"), VisitId::Sv1).unwrap());

        let rest = client
            .get_segment(&p("P1"), VisitId::Sv1, AnsPeriod::Rest, VnsStatus::Off)
            .unwrap();
        assert_eq!(rest.numeric("HR").unwrap(), &[60.0, 61.0]);
        assert_eq!(client.cached_participants(), vec![p("P1")]);
    }

    #[test]
    fn absent_segment_is_empty_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_recording(tmp.path(), "P1", &["0.000|P1|SV1|REST|OFF|60"]);
        let client = TimeSeriesClient::from_path(tmp.path()).unwrap();
        let segment = client
            .get_segment(&p("P1"), VisitId::Sv2, AnsPeriod::Peco, VnsStatus::On)
            .unwrap();
        assert!(segment.is_empty());
    }

    #[test]
    fn string_labels_are_validated() {
        let tmp = tempfile::tempdir().unwrap();
        write_recording(tmp.path(), "P1", &["0.000|P1|SV1|REST|OFF|60"]);
        let client = TimeSeriesClient::from_path(tmp.path()).unwrap();
        assert_eq!(
            client.get_segment_by_labels("P1", "SV1", "REST", "OFF").unwrap().len(),
            1
        );
        assert!(matches!(
            client.get_segment_by_labels("P1", "SV1", "WARMUP", "OFF"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn missing_recording_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("primary/sub-P9")).unwrap();
        let client = TimeSeriesClient::from_path(tmp.path()).unwrap();
        assert!(matches!(
            client.get_conditions_and_status(&p("P9"), VisitId::Sv1),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn cache_is_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        for id in ["P1", "P2", "P3"] {
            write_recording(tmp.path(), id, &[&format!("0.000|{id}|SV1|REST|OFF|60")]);
        }
        let config = ClientConfig {
            cache_capacity: 2,
            ..Default::default()
        };
        let client = TimeSeriesClient::new(tmp.path(), config).unwrap();
        for id in ["P1", "P2", "P1", "P3"] {
            client.load_participant(&p(id)).unwrap();
        }
        assert_eq!(client.cached_participants(), vec![p("P3"), p("P1")]);
        client.clear_cache();
        assert!(client.cached_participants().is_empty());
    }

    #[test]
    fn legacy_visits_come_from_file_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("primary/sub-P1");
        fs::create_dir_all(&dir).unwrap();
        let header = "LabChartTime,Participant_ID,Visit_ID,ANS_Period,ANS_Status,HR";
        fs::write(dir.join("P1_sv1_all.csv"), format!("{header}\n0,P1,SV1,REST,OFF,60\n")).unwrap();
        fs::write(dir.join("P1_sv2_all.csv"), format!("{header}\n0,P1,SV2,IHG,ON,65\n")).unwrap();

        let client =
            TimeSeriesClient::new(tmp.path(), ClientConfig::with_schema(SchemaConfig::legacy()))
                .unwrap();
        assert_eq!(client.get_visit_ids(&p("P1")).unwrap(), vec![VisitId::Sv1, VisitId::Sv2]);
        let ihg = client
            .get_segment(&p("P1"), VisitId::Sv2, AnsPeriod::Ihg, VnsStatus::On)
            .unwrap();
        assert_eq!(ihg.numeric("HR").unwrap(), &[65.0]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClientConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            TimeSeriesClient::new("/tmp", config),
            Err(Error::Config(_))
        ));
    }
}
