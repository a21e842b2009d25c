use std::fs;
use std::path::{Path, PathBuf};

use super::labels::{AnsPeriod, ParticipantId, VisitId, VnsStatus};
use super::layout::{DatasetLayout, DOCS_DIR};
use super::model::CsvColumn;
use crate::config::{SchemaConfig, DEFAULT_SAMPLING_RATE_HZ};
use crate::error::Result;
use crate::stim::{slot_columns, PARTICIPANT_MAPPING_FILE, STIM_OPTION_MAPPING_FILE};
use crate::validation::checks::EXPECTED_ANS_PERIODS_AND_VNS_STATUS;

/// What to generate.
///
/// At rate `r`, a segment of `n` rows measures `round(r + r / (n - 1))` Hz,
/// so segments need more than `2r + 1` rows to measure exactly `r`.
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub participants: Vec<String>,
    pub visits: Vec<VisitId>,
    pub segments: Vec<(AnsPeriod, VnsStatus)>,
    pub samples_per_segment: usize,
    pub sampling_rate_hz: u32,
    /// Channels left out of the recordings.
    pub omit_channels: Vec<CsvColumn>,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        SyntheticSpec {
            participants: vec!["Sample-001".into(), "Sample-002".into()],
            visits: VisitId::ALL.to_vec(),
            segments: EXPECTED_ANS_PERIODS_AND_VNS_STATUS.to_vec(),
            samples_per_segment: 1000,
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            omit_channels: Vec::new(),
            seed: 42,
        }
    }
}

/// Files written by [`write_dataset`].
#[derive(Debug, Default)]
pub struct SyntheticSummary {
    pub recordings: Vec<PathBuf>,
    pub rows: usize,
    pub docs: Vec<PathBuf>,
}

/// Write a complete dataset under `root`, laid out as `schema` expects:
/// recordings for every participant and visit, plus the stimulation
/// reference tables.
pub fn write_dataset(
    root: &Path,
    schema: &SchemaConfig,
    spec: &SyntheticSpec,
) -> Result<SyntheticSummary> {
    schema.validate()?;
    let layout = DatasetLayout::new(root, schema.clone());
    let delimiter = schema.delimiter_byte()?;
    let mut rng = SimpleRng::new(spec.seed);
    let mut summary = SyntheticSummary::default();

    for id in &spec.participants {
        let participant = ParticipantId::new(id.as_str())?;
        if schema.is_per_visit() {
            for &visit in &spec.visits {
                let path = layout.recording_path(&participant, Some(visit));
                summary.rows +=
                    write_recording(&path, delimiter, &participant, &[visit], spec, &mut rng)?;
                summary.recordings.push(path);
            }
        } else {
            let path = layout.recording_path(&participant, None);
            summary.rows += write_recording(
                &path,
                delimiter,
                &participant,
                &spec.visits,
                spec,
                &mut rng,
            )?;
            summary.recordings.push(path);
        }
    }

    summary.docs = write_stim_tables(root, &spec.participants, &mut rng)?;
    log::info!(
        "Wrote {} recordings ({} rows) under {}",
        summary.recordings.len(),
        summary.rows,
        root.display()
    );
    Ok(summary)
}

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Channel value at time `t` (seconds).
fn sample(column: CsvColumn, t: f64, stim_on: bool, rng: &mut SimpleRng) -> f64 {
    let hr = if stim_on { 64.0 } else { 70.0 };
    let beat_phase = (t * hr / 60.0).fract();
    let breath = (2.0 * std::f64::consts::PI * t * 0.25).sin();
    match column {
        CsvColumn::Ecg => gaussian(beat_phase, 0.3, 0.015, 1.2) + rng.gauss(0.0, 0.02),
        CsvColumn::Nibp => 95.0 + 25.0 * (2.0 * std::f64::consts::PI * beat_phase).cos(),
        CsvColumn::Systolic => 120.0 + rng.gauss(0.0, 2.0),
        CsvColumn::Diastolic => 78.0 + rng.gauss(0.0, 1.5),
        CsvColumn::Mean => 92.0 + rng.gauss(0.0, 1.0),
        CsvColumn::HeartRate => hr + rng.gauss(0.0, 1.0),
        CsvColumn::Handgrip | CsvColumn::PercentMvc => rng.gauss(0.0, 0.05).abs(),
        CsvColumn::RespiratoryWaveform => breath,
        CsvColumn::RespiratoryRate => 15.0,
        CsvColumn::RawMsna | CsvColumn::FilteredMsna => rng.gauss(0.0, 0.1),
        CsvColumn::RmsMsna | CsvColumn::IntegratedMsna => rng.gauss(0.0, 0.1).abs(),
        CsvColumn::Stimulator => {
            if stim_on {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

fn write_recording(
    path: &Path,
    delimiter: u8,
    participant: &ParticipantId,
    visits: &[VisitId],
    spec: &SyntheticSpec,
    rng: &mut SimpleRng,
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let columns: Vec<CsvColumn> = CsvColumn::ALL
        .into_iter()
        .filter(|c| !spec.omit_channels.contains(c))
        .collect();

    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    writer.write_record(columns.iter().map(|c| c.name()))?;

    let rate = f64::from(spec.sampling_rate_hz);
    let mut n = 0usize;
    for &visit in visits {
        for &(period, status) in &spec.segments {
            for _ in 0..spec.samples_per_segment {
                let t = n as f64 / rate;
                let row: Vec<String> = columns
                    .iter()
                    .map(|&c| match c {
                        CsvColumn::ParticipantId => participant.to_string(),
                        CsvColumn::VisitId => visit.to_string(),
                        CsvColumn::AnsPeriod => period.to_string(),
                        CsvColumn::AnsStatus => status.to_string(),
                        CsvColumn::LabChartTime => t.to_string(),
                        CsvColumn::Comment => String::new(),
                        other => format!("{:.4}", sample(other, t, status == VnsStatus::On, rng)),
                    })
                    .collect();
                writer.write_record(&row)?;
                n += 1;
            }
        }
    }
    writer.flush()?;
    log::debug!("Wrote {} ({n} rows)", path.display());
    Ok(n)
}

/// Lettered option table (A-F) and a random assignment per participant.
fn write_stim_tables(
    root: &Path,
    participants: &[String],
    rng: &mut SimpleRng,
) -> Result<Vec<PathBuf>> {
    let docs = root.join(DOCS_DIR);
    fs::create_dir_all(&docs)?;

    let options = docs.join(STIM_OPTION_MAPPING_FILE);
    let mut writer = csv::WriterBuilder::new().delimiter(b'|').from_path(&options)?;
    writer.write_record([
        "stim_option",
        "pulse_width_ms",
        "level_ma",
        "freq_hz",
        "duty_cycle_off_min",
    ])?;
    let letters = ['A', 'B', 'C', 'D', 'E', 'F'];
    for (i, letter) in letters.iter().enumerate() {
        let pulse_width = if i % 2 == 0 { 0.25 } else { 0.5 };
        let frequency = [5, 10, 20][i / 2];
        writer.write_record([
            letter.to_string(),
            pulse_width.to_string(),
            format!("{:.1}", 1.0 + 0.5 * i as f64),
            frequency.to_string(),
            "1.1".to_string(),
        ])?;
    }
    writer.flush()?;

    let assignments = docs.join(PARTICIPANT_MAPPING_FILE);
    let mut writer = csv::WriterBuilder::new().delimiter(b'|').from_path(&assignments)?;
    let slots = slot_columns();
    let mut header = vec!["Participant_ID".to_string()];
    header.extend(slots.iter().map(|(name, _, _)| name.clone()));
    writer.write_record(&header)?;
    for participant in participants {
        let mut row = vec![participant.clone()];
        for _ in &slots {
            let pick = (rng.next_u64() % letters.len() as u64) as usize;
            row.push(letters[pick].to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;

    Ok(vec![options, assignments])
}

/// Minimal deterministic PRNG (xoshiro256**).
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller.
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_recording;

    fn small() -> SyntheticSpec {
        SyntheticSpec {
            participants: vec!["P1".into()],
            segments: vec![(AnsPeriod::Rest, VnsStatus::Off), (AnsPeriod::Stim1, VnsStatus::On)],
            samples_per_segment: 10,
            ..Default::default()
        }
    }

    #[test]
    fn evolved_layout_writes_one_file_per_participant() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = write_dataset(tmp.path(), &SchemaConfig::evolved(), &small()).unwrap();
        assert_eq!(summary.recordings.len(), 1);
        assert_eq!(summary.rows, 2 * 2 * 10);
        assert!(summary.recordings[0].ends_with("primary/sub-P1/ANS/P1_lab_ans_all.csv"));

        let table = load_recording(&summary.recordings[0], b'|').unwrap();
        assert_eq!(table.len(), 40);
        assert_eq!(table.column_names().len(), 20);
        assert!(table.is_time_ordered());
        assert!(summary.docs.iter().all(|p| p.is_file()));
    }

    #[test]
    fn legacy_layout_writes_one_file_per_visit() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = SyntheticSpec {
            omit_channels: vec![CsvColumn::HeartRate],
            ..small()
        };
        let summary = write_dataset(tmp.path(), &SchemaConfig::legacy(), &spec).unwrap();
        assert_eq!(summary.recordings.len(), 2);
        assert!(summary.recordings[1].ends_with("primary/sub-P1/P1_sv2_all.csv"));

        let table = load_recording(&summary.recordings[0], b',').unwrap();
        assert_eq!(table.len(), 20);
        assert!(table.channel("HR").is_none());
    }

    #[test]
    fn same_seed_same_output() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let sa = write_dataset(a.path(), &SchemaConfig::evolved(), &small()).unwrap();
        let sb = write_dataset(b.path(), &SchemaConfig::evolved(), &small()).unwrap();
        assert_eq!(
            fs::read(&sa.recordings[0]).unwrap(),
            fs::read(&sb.recordings[0]).unwrap()
        );
    }
}
