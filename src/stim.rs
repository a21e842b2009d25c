//! Stimulation settings per participant, visit and stimulation slot.
//!
//! Two reference tables under `docs/` are joined:
//!
//! ```text
//! rc_rand_vns_stim_parameters.csv            option → {pulse width, current, frequency, duty cycle}
//! rc_rand_ans_participant_stim_settings.csv  participant → option for SV1_STIM1 .. SV2_STIM3
//! ```
//!
//! Options are letters `A`–`F` in older tables (`stim_option` column) and
//! numbers `1`–`6` in newer ones (`stim_option_number`).

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::labels::{AnsPeriod, ParticipantId, VisitId};
use crate::data::layout::DOCS_DIR;
use crate::error::{Error, Result};

pub const STIM_OPTION_MAPPING_FILE: &str = "rc_rand_vns_stim_parameters.csv";
pub const PARTICIPANT_MAPPING_FILE: &str = "rc_rand_ans_participant_stim_settings.csv";

const LETTER_OPTION_COLUMN: &str = "stim_option";
const NUMBER_OPTION_COLUMN: &str = "stim_option_number";
const PARTICIPANT_COLUMN: &str = "Participant_ID";

/// Duty cycle ON time when the tables do not give one, in minutes.
pub const DEFAULT_DUTY_CYCLE_ON_MIN: f64 = 1.0;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How options are labelled in a parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScheme {
    /// `A`–`F`.
    Lettered,
    /// `1`–`6`.
    Numbered,
}

impl OptionScheme {
    fn column(self) -> &'static str {
        match self {
            OptionScheme::Lettered => LETTER_OPTION_COLUMN,
            OptionScheme::Numbered => NUMBER_OPTION_COLUMN,
        }
    }

    /// Parse an option token of this scheme.
    pub fn parse(self, token: &str) -> Result<StimOption> {
        let t = token.trim();
        let option = match self {
            OptionScheme::Lettered => {
                let mut chars = t.chars();
                match (chars.next(), chars.next()) {
                    (Some(c @ 'A'..='F'), None) => Some(StimOption::Letter(c)),
                    _ => None,
                }
            }
            OptionScheme::Numbered => whole_number(t)
                .filter(|n| (1..=6).contains(n))
                .map(StimOption::Number),
        };
        option.ok_or_else(|| Error::Validation(format!("invalid stimulation option '{token}'")))
    }
}

/// `"3"` or `"3.0"`; spreadsheet exports write either.
fn whole_number(s: &str) -> Option<u8> {
    if let Ok(n) = s.parse::<u8>() {
        return Some(n);
    }
    let f: f64 = s.parse().ok()?;
    (f.fract() == 0.0 && (0.0..=255.0).contains(&f)).then_some(f as u8)
}

/// A stimulation option as labelled in the reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum StimOption {
    Letter(char),
    Number(u8),
}

impl fmt::Display for StimOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimOption::Letter(c) => write!(f, "{c}"),
            StimOption::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Parameters of one stimulation option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StimulationSetting {
    pub option: StimOption,
    /// Milliseconds.
    pub pulse_width: f64,
    /// Milliamperes.
    pub current: f64,
    /// Hertz.
    pub frequency: u32,
    /// Minutes.
    pub duty_cycle_off: f64,
    /// Minutes.
    pub duty_cycle_on: f64,
}

#[derive(Debug, Deserialize)]
struct OptionRow {
    pulse_width_ms: f64,
    level_ma: f64,
    freq_hz: f64,
    duty_cycle_off_min: f64,
    #[serde(default)]
    duty_cycle_on_min: Option<f64>,
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Participant, visit and stimulation slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StimKey {
    pub participant: ParticipantId,
    pub visit: VisitId,
    pub period: AnsPeriod,
}

impl fmt::Display for StimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.participant, self.visit, self.period)
    }
}

/// Result of the join: resolved settings, and the entries that could not be
/// resolved.
#[derive(Debug, Default)]
pub struct StimResolution {
    pub settings: BTreeMap<StimKey, StimulationSetting>,
    pub errors: Vec<(StimKey, Error)>,
}

impl StimResolution {
    pub fn get(
        &self,
        participant: &ParticipantId,
        visit: VisitId,
        period: AnsPeriod,
    ) -> Option<&StimulationSetting> {
        self.settings.get(&StimKey {
            participant: participant.clone(),
            visit,
            period,
        })
    }
}

/// Slot columns of the assignment table, in order.
pub fn slot_columns() -> Vec<(String, VisitId, AnsPeriod)> {
    VisitId::ALL
        .into_iter()
        .flat_map(|visit| {
            AnsPeriod::stimulation_slots()
                .into_iter()
                .map(move |period| (format!("{visit}_{period}"), visit, period))
        })
        .collect()
}

/// Join the two reference tables of the dataset at `dataset_root`.
pub fn resolve_stim_mapping(dataset_root: &Path) -> Result<StimResolution> {
    let docs = dataset_root.join(DOCS_DIR);
    let (scheme, options) = read_option_table_file(&docs.join(STIM_OPTION_MAPPING_FILE))?;
    let assignments = read_assignment_file(&docs.join(PARTICIPANT_MAPPING_FILE))?;
    Ok(join(scheme, &options, assignments))
}

/// Resolve raw assignments against an option table.
pub fn join(
    scheme: OptionScheme,
    options: &BTreeMap<StimOption, StimulationSetting>,
    assignments: Vec<(StimKey, String)>,
) -> StimResolution {
    let mut resolution = StimResolution::default();
    for (key, token) in assignments {
        let setting = scheme.parse(&token).and_then(|option| {
            options.get(&option).copied().ok_or_else(|| {
                Error::Validation(format!("option {option} is not in the parameter table"))
            })
        });
        match setting {
            Ok(setting) => {
                resolution.settings.insert(key, setting);
            }
            Err(e) => {
                log::warn!("Cannot resolve stimulation setting for {key}: {e}");
                resolution.errors.push((key, e));
            }
        }
    }
    resolution
}

// ---------------------------------------------------------------------------
// Table readers
// ---------------------------------------------------------------------------

fn open_sniffed(path: &Path) -> Result<(Vec<u8>, u8)> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let delimiter = sniff_delimiter(&bytes[..])?;
    Ok((bytes, delimiter))
}

/// `|` if the header line contains one, `,` otherwise.
pub fn sniff_delimiter<R: Read>(reader: R) -> Result<u8> {
    let mut header = String::new();
    BufReader::new(reader).read_line(&mut header)?;
    Ok(if header.contains('|') { b'|' } else { b',' })
}

fn read_option_table_file(
    path: &Path,
) -> Result<(OptionScheme, BTreeMap<StimOption, StimulationSetting>)> {
    let (bytes, delimiter) = open_sniffed(path)?;
    read_option_table(&bytes[..], delimiter, path)
}

fn read_assignment_file(path: &Path) -> Result<Vec<(StimKey, String)>> {
    let (bytes, delimiter) = open_sniffed(path)?;
    read_assignments(&bytes[..], delimiter, path)
}

/// Read the option parameter table. The scheme is detected from the header.
pub fn read_option_table<R: Read>(
    reader: R,
    delimiter: u8,
    source: &Path,
) -> Result<(OptionScheme, BTreeMap<StimOption, StimulationSetting>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| Error::parse(source, format!("reading header: {e}")))?
        .clone();

    let scheme = if headers.iter().any(|h| h == LETTER_OPTION_COLUMN) {
        OptionScheme::Lettered
    } else if headers.iter().any(|h| h == NUMBER_OPTION_COLUMN) {
        OptionScheme::Numbered
    } else {
        return Err(Error::parse(
            source,
            format!("neither '{LETTER_OPTION_COLUMN}' nor '{NUMBER_OPTION_COLUMN}' column present"),
        ));
    };
    let option_idx = headers
        .iter()
        .position(|h| h == scheme.column())
        .ok_or_else(|| Error::parse(source, format!("missing '{}' column", scheme.column())))?;

    let mut options = BTreeMap::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::parse(source, format!("row {row_no}: {e}")))?;
        let token = record.get(option_idx).unwrap_or("");
        let option = scheme
            .parse(token)
            .map_err(|e| Error::parse(source, format!("row {row_no}: {e}")))?;
        let row: OptionRow = record
            .deserialize(Some(&headers))
            .map_err(|e| Error::parse(source, format!("row {row_no}: {e}")))?;
        let frequency = whole_hz(row.freq_hz).ok_or_else(|| {
            Error::parse(source, format!("row {row_no}: bad frequency {}", row.freq_hz))
        })?;

        let setting = StimulationSetting {
            option,
            pulse_width: row.pulse_width_ms,
            current: row.level_ma,
            frequency,
            duty_cycle_off: row.duty_cycle_off_min,
            duty_cycle_on: row.duty_cycle_on_min.unwrap_or(DEFAULT_DUTY_CYCLE_ON_MIN),
        };
        if options.insert(option, setting).is_some() {
            log::warn!("{}: option {option} defined twice, keeping the last row", source.display());
        }
    }
    log::debug!("{}: {} stimulation options", source.display(), options.len());
    Ok((scheme, options))
}

fn whole_hz(f: f64) -> Option<u32> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
}

/// Read the participant assignment table into raw (slot, option token)
/// pairs. Absent slot columns and empty cells yield nothing.
pub fn read_assignments<R: Read>(
    reader: R,
    delimiter: u8,
    source: &Path,
) -> Result<Vec<(StimKey, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| Error::parse(source, format!("reading header: {e}")))?
        .clone();
    let participant_idx = headers
        .iter()
        .position(|h| h == PARTICIPANT_COLUMN)
        .ok_or_else(|| Error::parse(source, format!("missing '{PARTICIPANT_COLUMN}' column")))?;
    let slots: Vec<(usize, VisitId, AnsPeriod)> = slot_columns()
        .into_iter()
        .filter_map(|(name, visit, period)| {
            headers
                .iter()
                .position(|h| h == name)
                .map(|idx| (idx, visit, period))
        })
        .collect();

    let mut assignments = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::parse(source, format!("row {row_no}: {e}")))?;
        let participant = match ParticipantId::new(record.get(participant_idx).unwrap_or("")) {
            Ok(p) => p,
            Err(_) => {
                log::warn!("{}: row {row_no} has no participant id, skipping", source.display());
                continue;
            }
        };
        for &(idx, visit, period) in &slots {
            let token = record.get(idx).unwrap_or("");
            if token.is_empty() {
                continue;
            }
            let key = StimKey {
                participant: participant.clone(),
                visit,
                period,
            };
            assignments.push((key, token.to_string()));
        }
    }
    Ok(assignments)
}
