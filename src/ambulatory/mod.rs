//! Pre-computed ambulatory summaries (Holter ECG, 24h blood pressure).
//!
//! Each summary file is a pipe-delimited CSV whose first data row holds the
//! features of one participant visit.

pub mod bp;
pub mod ecg;

pub use bp::BpFeatures;
pub use ecg::EcgFeatures;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Field delimiter of the summary files.
pub const SUMMARY_DELIMITER: u8 = b'|';

/// Deserialize the first row of a summary file.
pub(crate) fn read_first_row<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(SUMMARY_DELIMITER)
        .trim(csv::Trim::All)
        .from_path(path)?;
    match reader.deserialize::<T>().next() {
        Some(row) => row.map_err(|e| Error::parse(path, e.to_string())),
        None => Err(Error::parse(path, "no data rows")),
    }
}

/// `deserialize_with` helpers for the summary formats.
pub(crate) mod fields {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer};

    fn time<'de, D: Deserializer<'de>>(d: D, format: &str) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(d)?;
        NaiveTime::parse_from_str(s.trim(), format)
            .map_err(|e| de::Error::custom(format!("bad time '{s}' ({format}): {e}")))
    }

    /// `HH:MM:SS`.
    pub fn hms<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        time(d, "%H:%M:%S")
    }

    /// `HH:MM`.
    pub fn hm<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        time(d, "%H:%M")
    }

    /// Optional `HH:MM:SS.fffffff`; the fraction is always zero and dropped.
    pub fn optional_hms_fraction<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let Some(s) = Option::<String>::deserialize(d)? else {
            return Ok(None);
        };
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        let whole = s.split('.').next().unwrap_or(s);
        NaiveTime::parse_from_str(whole, "%H:%M:%S")
            .map(Some)
            .map_err(|e| de::Error::custom(format!("bad time '{s}': {e}")))
    }

    /// Presence flag: `1/0`, `true/false`, `y/n` or `yes/no`.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let s = String::deserialize(d)?;
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" | "y" | "yes" => Ok(true),
            "0" | "0.0" | "false" | "n" | "no" => Ok(false),
            other => Err(de::Error::custom(format!("bad flag '{other}'"))),
        }
    }
}
