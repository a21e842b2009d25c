use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "reveal-data",
    version,
    about = "Read and validate the REVEAL physiological dataset",
    long_about = "Lint the coarse time series, list recorded segments, resolve stimulation \
                  settings and read ambulatory summaries.\n\
                  The dataset root can also be set with $REVEAL_DATASET."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the completeness and format checks over every participant
    Lint(DatasetArgs),
    /// List participants, visits and recorded (period, status) pairs
    List(DatasetArgs),
    /// Summarize one segment of a participant's recording
    Segment(SegmentArgs),
    /// Resolve stimulation settings from the docs/ reference tables
    Stim(DatasetArgs),
    /// Read an ambulatory summary file
    Features(FeaturesArgs),
}

#[derive(Args, Clone)]
pub struct DatasetArgs {
    /// Dataset root directory (contains primary/ and docs/)
    #[arg(long, env = "REVEAL_DATASET")]
    pub dataset: PathBuf,

    /// Dataset generation preset
    #[arg(long, env = "REVEAL_SCHEMA", value_enum)]
    pub schema: Option<SchemaPreset>,

    /// JSON client configuration; --schema overrides its schema
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Participant id (folder name without "sub-")
    pub participant: String,
    /// Visit, e.g. SV1
    pub visit: String,
    /// ANS period, e.g. IHG
    pub period: String,
    /// VNS status, ON or OFF
    pub status: String,
}

#[derive(Args)]
pub struct FeaturesArgs {
    #[arg(value_enum)]
    pub kind: FeatureKind,
    /// Pipe-delimited summary file
    pub file: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SchemaPreset {
    /// Comma-separated, one file per visit
    Legacy,
    /// Pipe-separated, one file per participant
    Evolved,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FeatureKind {
    Ecg,
    Bp,
}
