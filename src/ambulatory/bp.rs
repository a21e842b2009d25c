use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{fields, read_first_row};
use crate::error::Result;

/// Systolic or diastolic pressure over one window (mmHg).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PressureStats {
    pub min: u32,
    pub max: u32,
    pub avg: u32,
}

/// Ambulatory blood pressure summary of one participant visit, with the
/// sleep diary answers.
///
/// Windows: `24hrs` hours 1-24, `day` 06:00-24:00, `narday` 09:00-21:00,
/// `night` 00:00-06:00, `narnt` 01:00-06:00.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BpFeatures {
    #[serde(rename = "Participant_ID")]
    pub participant_id: String,
    #[serde(rename = "Visit_ID")]
    pub visit_id: String,
    /// Days between enrollment and recording start.
    #[serde(rename = "DeId_RecordingStart")]
    pub deid_recording_start: i64,
    #[serde(rename = "RecordingStartTime", deserialize_with = "fields::hm")]
    pub recording_start_time: NaiveTime,

    #[serde(rename = "DBP_MIN_24HRS")]
    pub dbp_min_24hrs: u32,
    #[serde(rename = "DBP_MAX_24HRS")]
    pub dbp_max_24hrs: u32,
    #[serde(rename = "DBP_AVG_24HRS")]
    pub dbp_avg_24hrs: u32,
    #[serde(rename = "SBP_MIN_24HRS")]
    pub sbp_min_24hrs: u32,
    #[serde(rename = "SBP_MAX_24HRS")]
    pub sbp_max_24hrs: u32,
    #[serde(rename = "SBP_AVG_24HRS")]
    pub sbp_avg_24hrs: u32,

    pub dbp_min_day: u32,
    pub dbp_max_day: u32,
    pub dbp_avg_day: u32,
    pub dbp_min_narday: u32,
    pub dbp_max_narday: u32,
    pub dbp_avg_narday: u32,

    pub sbp_min_day: u32,
    pub sbp_max_day: u32,
    pub sbp_avg_day: u32,
    pub sbp_min_narday: u32,
    pub sbp_max_narday: u32,
    pub sbp_avg_narday: u32,

    pub dbp_min_night: u32,
    pub dbp_max_night: u32,
    pub dbp_avg_night: u32,
    pub dbp_min_narnt: u32,
    pub dbp_max_narnt: u32,
    pub dbp_avg_narnt: u32,

    pub sbp_min_night: u32,
    pub sbp_max_night: u32,
    pub sbp_avg_night: u32,
    pub sbp_min_narnt: u32,
    pub sbp_max_narnt: u32,
    pub sbp_avg_narnt: u32,

    // Sleep diary
    #[serde(rename = "bedtime", deserialize_with = "fields::hm")]
    pub bedtime: NaiveTime,
    #[serde(rename = "awake", deserialize_with = "fields::hm")]
    pub awake: NaiveTime,
    #[serde(
        rename = "first_nap_start",
        default,
        deserialize_with = "fields::optional_hms_fraction"
    )]
    pub first_nap_start: Option<NaiveTime>,
    #[serde(
        rename = "first_nap_end",
        default,
        deserialize_with = "fields::optional_hms_fraction"
    )]
    pub first_nap_end: Option<NaiveTime>,
    /// Minutes.
    #[serde(rename = "first_nap_total", default)]
    pub first_nap_total: Option<u32>,
    #[serde(
        rename = "second_nap_start",
        default,
        deserialize_with = "fields::optional_hms_fraction"
    )]
    pub second_nap_start: Option<NaiveTime>,
    #[serde(
        rename = "second_nap_end",
        default,
        deserialize_with = "fields::optional_hms_fraction"
    )]
    pub second_nap_end: Option<NaiveTime>,
    #[serde(rename = "second_nap_total", default)]
    pub second_nap_total: Option<u32>,
    #[serde(
        rename = "third_nap_start",
        default,
        deserialize_with = "fields::optional_hms_fraction"
    )]
    pub third_nap_start: Option<NaiveTime>,
    #[serde(
        rename = "third_nap_end",
        default,
        deserialize_with = "fields::optional_hms_fraction"
    )]
    pub third_nap_end: Option<NaiveTime>,
    #[serde(rename = "third_nap_total", default)]
    pub third_nap_total: Option<u32>,

    /// Times woken up to use the bathroom.
    #[serde(rename = "bathroom")]
    pub bathroom: u32,
    /// Times woken up and out of bed for other reasons.
    #[serde(rename = "other_than_bathroom")]
    pub other_than_bathroom: u32,
    /// Coded answer to "how did you sleep compared to usual?".
    #[serde(rename = "sleep_compared_to_usual")]
    pub sleep_compared_to_usual: u32,
}

impl BpFeatures {
    pub fn from_csv(path: &Path) -> Result<Self> {
        read_first_row(path)
    }

    pub fn systolic_24h(&self) -> PressureStats {
        PressureStats {
            min: self.sbp_min_24hrs,
            max: self.sbp_max_24hrs,
            avg: self.sbp_avg_24hrs,
        }
    }

    pub fn diastolic_24h(&self) -> PressureStats {
        PressureStats {
            min: self.dbp_min_24hrs,
            max: self.dbp_max_24hrs,
            avg: self.dbp_avg_24hrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn header() -> String {
        let mut cols = vec![
            "Participant_ID".to_string(),
            "Visit_ID".into(),
            "DeId_RecordingStart".into(),
            "RecordingStartTime".into(),
        ];
        for window in ["24HRS", "DAY", "NARDAY", "NIGHT", "NARNT"] {
            for bp in ["DBP", "SBP"] {
                for stat in ["MIN", "MAX", "AVG"] {
                    cols.push(format!("{bp}_{stat}_{window}"));
                }
            }
        }
        cols.extend(["bedtime".into(), "awake".into()]);
        for nap in ["first", "second", "third"] {
            for part in ["start", "end", "total"] {
                cols.push(format!("{nap}_nap_{part}"));
            }
        }
        cols.extend([
            "bathroom".into(),
            "other_than_bathroom".into(),
            "sleep_compared_to_usual".into(),
        ]);
        cols.join("|")
    }

    fn row(first_nap: &str) -> String {
        let mut cells = vec!["P1".to_string(), "SV2".into(), "-3".into(), "09:30".into()];
        // 30 pressures: DBP then SBP per window.
        for _window in 0..5 {
            cells.extend(["60", "95", "75"].map(String::from));
            cells.extend(["100", "150", "125"].map(String::from));
        }
        cells.extend(["22:45".into(), "06:30".into()]);
        cells.push(first_nap.to_string());
        cells.extend(["14:52:00.0000000".into(), "30".into()]);
        cells.extend(["".into(), "".into(), "".into()]);
        cells.extend(["".into(), "".into(), "".into()]);
        cells.extend(["1".into(), "0".into(), "2".into()]);
        cells.join("|")
    }

    fn write(text: String) -> (tempfile::TempDir, std::path::PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bp.csv");
        std::fs::write(&path, text).unwrap();
        (tmp, path)
    }

    #[test]
    fn reads_pressures_and_diary() {
        let (_tmp, path) = write(format!("{}\n{}\n", header(), row("14:22:00.0000000")));
        let bp = BpFeatures::from_csv(&path).unwrap();

        assert_eq!(bp.visit_id, "SV2");
        assert_eq!(bp.deid_recording_start, -3);
        assert_eq!(bp.recording_start_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(
            bp.systolic_24h(),
            PressureStats {
                min: 100,
                max: 150,
                avg: 125
            }
        );
        assert_eq!(bp.diastolic_24h().avg, 75);
        assert_eq!(bp.bedtime, NaiveTime::from_hms_opt(22, 45, 0).unwrap());
        assert_eq!(bp.first_nap_start, NaiveTime::from_hms_opt(14, 22, 0));
        assert_eq!(bp.first_nap_end, NaiveTime::from_hms_opt(14, 52, 0));
        assert_eq!(bp.first_nap_total, Some(30));
        assert_eq!(bp.second_nap_start, None);
        assert_eq!(bp.third_nap_total, None);
        assert_eq!(bp.sleep_compared_to_usual, 2);
    }

    #[test]
    fn bad_nap_time_is_a_parse_error() {
        let (_tmp, path) = write(format!("{}\n{}\n", header(), row("2pm")));
        assert!(matches!(BpFeatures::from_csv(&path), Err(Error::Parse { .. })));
    }
}
