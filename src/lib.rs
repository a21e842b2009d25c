//! Read access and structural validation for the REVEAL physiological
//! dataset: coarse (250 Hz) time series, stimulation settings and
//! ambulatory summaries.

pub mod ambulatory;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod stim;
pub mod validation;

pub use client::DatasetClient;
pub use config::{ClientConfig, SchemaConfig, VisitSource};
pub use data::client::TimeSeriesClient;
pub use data::labels::{AnsPeriod, ParticipantId, VisitId, VnsStatus};
pub use data::model::RecordingTable;
pub use error::{Error, Result};
pub use validation::{CheckResult, ValidationReport};
