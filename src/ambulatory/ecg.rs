use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{fields, read_first_row};
use crate::error::Result;

/// Holter ECG summary of one participant visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgFeatures {
    #[serde(rename = "Participant_ID")]
    pub participant_id: String,
    #[serde(rename = "Visit_ID")]
    pub visit_id: String,

    /// Monitored time in hours.
    #[serde(rename = "tot_time")]
    pub total_time: f64,
    #[serde(deserialize_with = "fields::hms")]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "fields::hms")]
    pub stop_time: NaiveTime,

    #[serde(rename = "total_QRS")]
    pub total_qrs: u32,
    #[serde(rename = "maxHR")]
    pub max_hr: u32,
    #[serde(rename = "minHR")]
    pub min_hr: u32,
    #[serde(rename = "avgHR")]
    pub avg_hr: u32,

    // Ventricular ectopy
    #[serde(rename = "PVC_events")]
    pub pvc_events: u32,
    #[serde(rename = "PVC")]
    pub pvc: u32,
    #[serde(rename = "PVC_couplet")]
    pub pvc_couplet: u32,
    #[serde(rename = "PVC_bigeminy")]
    pub pvc_bigeminy: u32,
    #[serde(rename = "PVC_trigeminy")]
    pub pvc_trigeminy: u32,
    #[serde(rename = "PVC_runs")]
    pub pvc_runs: u32,
    /// Beats.
    #[serde(rename = "PVC_longest")]
    pub pvc_longest: u32,
    /// Beats per minute.
    #[serde(rename = "PVC_fastest")]
    pub pvc_fastest: u32,

    #[serde(rename = "VT", deserialize_with = "fields::flag")]
    pub vt_present: bool,
    #[serde(rename = "VT_count")]
    pub vt_count: u32,
    #[serde(rename = "VT_longest")]
    pub vt_longest: u32,
    #[serde(rename = "VT_fastestHR")]
    pub vt_fastest_hr: u32,

    // Supraventricular ectopy
    #[serde(rename = "PAC_events")]
    pub pac_events: u32,
    #[serde(rename = "PAC")]
    pub pac: u32,
    #[serde(rename = "PAC_couplet")]
    pub pac_couplet: u32,
    #[serde(rename = "PAC_bigeminy")]
    pub pac_bigeminy: u32,
    #[serde(rename = "PAC_trigeminy")]
    pub pac_trigeminy: u32,
    #[serde(rename = "PAC_runs")]
    pub pac_runs: u32,
    #[serde(rename = "PAC_longest")]
    pub pac_longest: u32,
    #[serde(rename = "PAC_fastest")]
    pub pac_fastest: u32,

    #[serde(rename = "SVT_yn", deserialize_with = "fields::flag")]
    pub svt_present: bool,
    #[serde(rename = "SVT_count")]
    pub svt_count: u32,
    #[serde(rename = "SVT_longest")]
    pub svt_longest: u32,
    #[serde(rename = "SVT_fastestHR")]
    pub svt_fastest_hr: u32,

    #[serde(rename = "afib", deserialize_with = "fields::flag")]
    pub afib_present: bool,
    pub afib_count: u32,
    #[serde(rename = "afib_avgHR")]
    pub afib_avg_hr: u32,
    pub afib_longest: u32,
    #[serde(rename = "afib_fastestHR")]
    pub afib_fastest_hr: u32,

    #[serde(rename = "aflut", deserialize_with = "fields::flag")]
    pub aflut_present: bool,
    pub aflut_count: u32,
    #[serde(rename = "aflut_avgHR")]
    pub aflut_avg_hr: u32,
    pub aflut_longest: u32,
    #[serde(rename = "aflut_fastestHR")]
    pub aflut_fastest_hr: u32,

    #[serde(rename = "pause", deserialize_with = "fields::flag")]
    pub pause_present: bool,
    pub pause_count: u32,
    /// Length of the longest pause.
    pub pause_time: u32,

    /// Free text.
    #[serde(default)]
    pub other_rhythm: String,
}

impl EcgFeatures {
    pub fn from_csv(path: &Path) -> Result<Self> {
        read_first_row(path)
    }
}
