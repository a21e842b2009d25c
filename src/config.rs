use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decoded-table cache size. One decoded file is ~200MB, so 20 entries stay
/// around 4GB.
pub const DEFAULT_CACHE_CAPACITY: usize = 20;

/// Sampling rate of the coarse time series, in Hz.
pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 250;

/// Placeholder for the participant id in a path template.
pub const PARTICIPANT_PLACEHOLDER: &str = "{participant_id}";

/// Placeholder for the lower-case visit token in a path template.
pub const VISIT_PLACEHOLDER: &str = "{visit_id}";

// ---------------------------------------------------------------------------
// SchemaConfig – how one dataset generation is laid out
// ---------------------------------------------------------------------------

/// Where visit identifiers are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitSource {
    /// Parse the visit token out of per-visit recording file names.
    FileNames,
    /// Distinct values of the `Visit_ID` column of the decoded recording.
    DataColumn,
}

/// Delimiter, recording path template and visit-source strategy of a
/// dataset generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Field delimiter of recording files.
    pub delimiter: char,
    /// Recording path relative to `primary/sub-<id>/`. May contain
    /// `{participant_id}` and `{visit_id}`.
    pub path_template: String,
    pub visit_source: VisitSource,
    /// Accept `BASELINE_*` / `RECOVERY_*` period spellings.
    pub period_aliases: bool,
}

impl SchemaConfig {
    /// First dataset generation: one comma-separated file per visit.
    pub fn legacy() -> Self {
        SchemaConfig {
            delimiter: ',',
            path_template: "{participant_id}_{visit_id}_all.csv".to_string(),
            visit_source: VisitSource::FileNames,
            period_aliases: false,
        }
    }

    /// Current generation: one pipe-separated file per participant.
    pub fn evolved() -> Self {
        SchemaConfig {
            delimiter: '|',
            path_template: "ANS/{participant_id}_lab_ans_all.csv".to_string(),
            visit_source: VisitSource::DataColumn,
            period_aliases: false,
        }
    }

    /// Preset by name (`legacy` or `evolved`).
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "legacy" => Ok(SchemaConfig::legacy()),
            "evolved" => Ok(SchemaConfig::evolved()),
            other => Err(Error::Config(format!(
                "unknown schema preset '{other}' (expected 'legacy' or 'evolved')"
            ))),
        }
    }

    /// Whether the template yields one file per visit.
    pub fn is_per_visit(&self) -> bool {
        self.path_template.contains(VISIT_PLACEHOLDER)
    }

    /// Delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(|b| b.is_ascii())
            .ok_or_else(|| {
                Error::Config(format!("delimiter '{}' is not a single ASCII byte", self.delimiter))
            })
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.path_template.trim().is_empty() {
            return Err(Error::Config("path template is empty".into()));
        }
        if self.visit_source == VisitSource::FileNames && !self.is_per_visit() {
            return Err(Error::Config(format!(
                "visit ids cannot come from file names: template '{}' has no {VISIT_PLACEHOLDER}",
                self.path_template
            )));
        }
        Ok(())
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaConfig::evolved()
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Settings of a [`TimeSeriesClient`](crate::data::client::TimeSeriesClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub schema: SchemaConfig,
    /// Maximum number of decoded participant recordings kept in memory.
    pub cache_capacity: usize,
    pub expected_sampling_rate_hz: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            schema: SchemaConfig::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            expected_sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
        }
    }
}

impl ClientConfig {
    pub fn with_schema(schema: SchemaConfig) -> Self {
        ClientConfig {
            schema,
            ..Default::default()
        }
    }

    /// Load a JSON config; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config: ClientConfig =
            serde_json::from_str(&text).map_err(|e| Error::parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache capacity must be at least 1".into()));
        }
        if self.expected_sampling_rate_hz == 0 {
            return Err(Error::Config("expected sampling rate must be positive".into()));
        }
        self.schema.validate()
    }
}
