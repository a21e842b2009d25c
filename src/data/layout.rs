use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::labels::{ParticipantId, VisitId};
use crate::config::{SchemaConfig, PARTICIPANT_PLACEHOLDER, VISIT_PLACEHOLDER};
use crate::error::{Error, Result};

/// Directory holding one `sub-<id>` folder per participant.
pub const PRIMARY_DIR: &str = "primary";

/// Directory holding the stimulation reference tables.
pub const DOCS_DIR: &str = "docs";

fn participant_dir_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sub-(\S+)").expect("static regex"))
}

/// Extract the participant id from a folder name, e.g.
/// `sub-Sample-001` → `Sample-001`.
pub fn extract_participant_id(folder_name: &str) -> Result<ParticipantId> {
    let caps = participant_dir_regex()
        .captures(folder_name)
        .ok_or_else(|| Error::Validation(format!("no participant id in '{folder_name}'")))?;
    ParticipantId::new(&caps[1])
}

/// A recording file together with the visit it holds (per-visit layouts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFile {
    pub visit: Option<VisitId>,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// DatasetLayout
// ---------------------------------------------------------------------------

/// Maps a dataset root to participant folders and recording files.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    schema: SchemaConfig,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>, schema: SchemaConfig) -> Self {
        DatasetLayout {
            root: root.into(),
            schema,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    pub fn primary_dir(&self) -> PathBuf {
        self.root.join(PRIMARY_DIR)
    }

    pub fn participant_dir(&self, participant: &ParticipantId) -> PathBuf {
        self.primary_dir().join(format!("sub-{participant}"))
    }

    /// Participant ids of every `sub-<id>` folder, in directory order.
    ///
    /// Folders that do not follow the convention are skipped with a warning.
    pub fn list_participant_ids(&self) -> Result<Vec<ParticipantId>> {
        let primary = self.primary_dir();
        if !primary.is_dir() {
            return Err(Error::NotFound(primary));
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&primary)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match extract_participant_id(&name) {
                Ok(id) => ids.push(id),
                Err(_) => log::warn!(
                    "Participant folder {} does not have a valid name, skipping.",
                    entry.path().display()
                ),
            }
        }
        Ok(ids)
    }

    /// Render the path template for a participant (and visit, if per-visit).
    pub fn recording_path(&self, participant: &ParticipantId, visit: Option<VisitId>) -> PathBuf {
        let mut relative = self
            .schema
            .path_template
            .replace(PARTICIPANT_PLACEHOLDER, participant.as_str());
        if let Some(visit) = visit {
            relative = relative.replace(VISIT_PLACEHOLDER, &visit.as_str().to_ascii_lowercase());
        }
        self.participant_dir(participant).join(relative)
    }

    /// The recording files of a participant.
    ///
    /// Per-participant templates resolve to exactly one file, which must
    /// exist. Per-visit templates list the directory and keep the files whose
    /// names match the template; files with an unknown visit token are
    /// skipped with a warning. Results are sorted by visit.
    pub fn recording_files(&self, participant: &ParticipantId) -> Result<Vec<RecordingFile>> {
        if !self.schema.is_per_visit() {
            let path = self.recording_path(participant, None);
            if !path.is_file() {
                return Err(Error::NotFound(path));
            }
            return Ok(vec![RecordingFile { visit: None, path }]);
        }

        let rendered = self
            .schema
            .path_template
            .replace(PARTICIPANT_PLACEHOLDER, participant.as_str());
        let (dir_part, file_pattern) = match rendered.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, rendered.as_str()),
        };
        if dir_part.is_some_and(|d| d.contains(VISIT_PLACEHOLDER)) {
            return Err(Error::Config(format!(
                "{VISIT_PLACEHOLDER} must appear in the file name of '{}'",
                self.schema.path_template
            )));
        }
        let dir = match dir_part {
            Some(d) => self.participant_dir(participant).join(d),
            None => self.participant_dir(participant),
        };
        if !dir.is_dir() {
            return Err(Error::NotFound(dir));
        }

        let matcher = file_name_matcher(file_pattern)?;
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(caps) = matcher.captures(&name) else {
                continue;
            };
            match caps["visit"].parse::<VisitId>() {
                Ok(visit) => files.push(RecordingFile {
                    visit: Some(visit),
                    path: entry.path(),
                }),
                Err(e) => log::warn!(
                    "Participant file {} does not have a valid name ({e}), skipping.",
                    entry.path().display()
                ),
            }
        }
        files.sort_by_key(|f| f.visit);
        Ok(files)
    }

    /// Visit ids derived from recording file names (per-visit layouts only).
    pub fn visit_ids_from_file_names(&self, participant: &ParticipantId) -> Result<Vec<VisitId>> {
        if !self.schema.is_per_visit() {
            return Err(Error::Config(format!(
                "template '{}' has no {VISIT_PLACEHOLDER}",
                self.schema.path_template
            )));
        }
        let mut visits: Vec<VisitId> = self
            .recording_files(participant)?
            .into_iter()
            .filter_map(|f| f.visit)
            .collect();
        visits.dedup();
        Ok(visits)
    }
}

/// Regex matching a file name pattern with exactly one `{visit_id}` slot.
fn file_name_matcher(pattern: &str) -> Result<Regex> {
    let (before, after) = pattern.split_once(VISIT_PLACEHOLDER).ok_or_else(|| {
        Error::Config(format!("'{pattern}' has no {VISIT_PLACEHOLDER} in the file name"))
    })?;
    let source = format!(
        "^{}(?P<visit>[^/]+?){}$",
        regex::escape(before),
        regex::escape(after)
    );
    Regex::new(&source).map_err(|e| Error::Config(format!("bad path template: {e}")))
}
