use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// Study identifier of a participant, e.g. `Sample-001` from `sub-Sample-001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap a raw identifier. Empty or whitespace-only ids are rejected.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Validation("participant id must not be empty".into()));
        }
        Ok(ParticipantId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ParticipantId::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl FromStr for ParticipantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ParticipantId::new(s)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// VisitId
// ---------------------------------------------------------------------------

/// Study visit. File names carry the token in lower case (`sv1`), the
/// `Visit_ID` column in upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VisitId {
    #[serde(rename = "SV1")]
    Sv1,
    #[serde(rename = "SV2")]
    Sv2,
}

impl VisitId {
    pub const ALL: [VisitId; 2] = [VisitId::Sv1, VisitId::Sv2];

    pub fn as_str(self) -> &'static str {
        match self {
            VisitId::Sv1 => "SV1",
            VisitId::Sv2 => "SV2",
        }
    }
}

impl FromStr for VisitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SV1" => Ok(VisitId::Sv1),
            "SV2" => Ok(VisitId::Sv2),
            _ => Err(Error::Validation(format!("unknown visit id '{s}'"))),
        }
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AnsPeriod
// ---------------------------------------------------------------------------

/// Labelled phase of the autonomic testing protocol (`ANS_Period` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnsPeriod {
    #[serde(rename = "REST")]
    Rest,
    /// First acute stimulation of the day.
    #[serde(rename = "STIM1")]
    Stim1,
    /// Second acute stimulation of the day.
    #[serde(rename = "STIM2")]
    Stim2,
    /// Third acute stimulation of the day.
    #[serde(rename = "STIM3")]
    Stim3,
    /// Isometric handgrip.
    #[serde(rename = "IHG")]
    Ihg,
    /// Post-exercise circulatory occlusion.
    #[serde(rename = "PECO")]
    Peco,
    /// Head-up tilt.
    #[serde(rename = "HUT")]
    Hut,
    #[serde(rename = "BASEIHG")]
    BaselineIhg,
    #[serde(rename = "RECPECO")]
    RecoveryPeco,
    #[serde(rename = "BASEHUT")]
    BaselineHut,
    #[serde(rename = "RECHUT")]
    RecoveryHut,
}

impl AnsPeriod {
    pub const ALL: [AnsPeriod; 11] = [
        AnsPeriod::Rest,
        AnsPeriod::Stim1,
        AnsPeriod::Stim2,
        AnsPeriod::Stim3,
        AnsPeriod::Ihg,
        AnsPeriod::Peco,
        AnsPeriod::Hut,
        AnsPeriod::BaselineIhg,
        AnsPeriod::RecoveryPeco,
        AnsPeriod::BaselineHut,
        AnsPeriod::RecoveryHut,
    ];

    /// Canonical serialization used in recording files.
    pub fn as_str(self) -> &'static str {
        match self {
            AnsPeriod::Rest => "REST",
            AnsPeriod::Stim1 => "STIM1",
            AnsPeriod::Stim2 => "STIM2",
            AnsPeriod::Stim3 => "STIM3",
            AnsPeriod::Ihg => "IHG",
            AnsPeriod::Peco => "PECO",
            AnsPeriod::Hut => "HUT",
            AnsPeriod::BaselineIhg => "BASEIHG",
            AnsPeriod::RecoveryPeco => "RECPECO",
            AnsPeriod::BaselineHut => "BASEHUT",
            AnsPeriod::RecoveryHut => "RECHUT",
        }
    }

    /// The three acute stimulation periods, in slot order.
    pub fn stimulation_slots() -> [AnsPeriod; 3] {
        [AnsPeriod::Stim1, AnsPeriod::Stim2, AnsPeriod::Stim3]
    }

    /// Parse, additionally accepting the `BASELINE_*` / `RECOVERY_*` spellings
    /// written by older exports. Alias hits are logged so they stay visible.
    pub fn parse_with_aliases(s: &str) -> Result<Self> {
        if let Ok(period) = s.parse() {
            return Ok(period);
        }
        let period = match s.trim() {
            "BASELINE_IHG" => AnsPeriod::BaselineIhg,
            "RECOVERY_PECO" => AnsPeriod::RecoveryPeco,
            "BASELINE_HUT" => AnsPeriod::BaselineHut,
            "RECOVERY_HUT" => AnsPeriod::RecoveryHut,
            _ => return Err(Error::Validation(format!("unknown ANS period '{s}'"))),
        };
        log::debug!("ANS period alias '{s}' read as '{}'", period.as_str());
        Ok(period)
    }
}

impl FromStr for AnsPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        AnsPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == token)
            .ok_or_else(|| Error::Validation(format!("unknown ANS period '{s}'")))
    }
}

impl fmt::Display for AnsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// VnsStatus
// ---------------------------------------------------------------------------

/// Whether vagus nerve stimulation is active (`ANS_Status` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VnsStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl VnsStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VnsStatus::On => "ON",
            VnsStatus::Off => "OFF",
        }
    }
}

impl FromStr for VnsStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ON" => Ok(VnsStatus::On),
            "OFF" => Ok(VnsStatus::Off),
            _ => Err(Error::Validation(format!("unknown VNS status '{s}'"))),
        }
    }
}

impl fmt::Display for VnsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
