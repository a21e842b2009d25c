mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Cli, Command, DatasetArgs, FeatureKind, SchemaPreset, SegmentArgs};
use reveal_data::ambulatory::{BpFeatures, EcgFeatures};
use reveal_data::data::model::ChannelData;
use reveal_data::stim::resolve_stim_mapping;
use reveal_data::validation::runner::validate_coarse_time_series;
use reveal_data::{ClientConfig, DatasetClient, SchemaConfig, TimeSeriesClient};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let json = cli.json;
    let outcome = match cli.command {
        Command::Lint(args) => lint(&args, json),
        Command::List(args) => list(&args, json),
        Command::Segment(args) => segment(&args, json),
        Command::Stim(args) => stim(&args, json),
        Command::Features(args) => features(args.kind, &args.file),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn preset(p: SchemaPreset) -> SchemaConfig {
    match p {
        SchemaPreset::Legacy => SchemaConfig::legacy(),
        SchemaPreset::Evolved => SchemaConfig::evolved(),
    }
}

fn client_config(args: &DatasetArgs) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(p) = args.schema {
        config.schema = preset(p);
    }
    Ok(config)
}

fn open(args: &DatasetArgs) -> Result<DatasetClient> {
    DatasetClient::with_config(&args.dataset, client_config(args)?)
        .with_context(|| format!("opening dataset {}", args.dataset.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn lint(args: &DatasetArgs, json: bool) -> Result<ExitCode> {
    let client = open(args)?;
    let report = validate_coarse_time_series(&client);

    if json {
        print_json(&report)?;
    } else {
        for entry in report.failures() {
            println!(
                "FAIL {:<45} {}: {}",
                entry.location(),
                entry.result.name,
                entry.result.details.as_deref().unwrap_or("")
            );
        }
        println!("{} checks: {} passed, {} failed", report.len(), report.passed(), report.failed());
    }
    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[derive(Serialize)]
struct VisitListing {
    participant: String,
    visit: String,
    segments: Vec<(String, String)>,
}

fn list(args: &DatasetArgs, json: bool) -> Result<ExitCode> {
    let client = open(args)?;
    let mut listing = Vec::new();
    for participant in client.participant_ids() {
        if let Some(reason) = client.unresolved(participant) {
            eprintln!("{participant}: {reason}");
            continue;
        }
        for &visit in client.visit_ids(participant) {
            let pairs = client
                .ans_periods_and_vns_status(participant, visit)
                .with_context(|| format!("reading {participant}/{visit}"))?;
            listing.push(VisitListing {
                participant: participant.to_string(),
                visit: visit.to_string(),
                segments: pairs
                    .into_iter()
                    .map(|(p, s)| (p.to_string(), s.to_string()))
                    .collect(),
            });
        }
    }

    if json {
        print_json(&listing)?;
    } else {
        for item in &listing {
            let pairs: Vec<String> = item
                .segments
                .iter()
                .map(|(p, s)| format!("{p}/{s}"))
                .collect();
            println!("{} {}: {}", item.participant, item.visit, pairs.join(" "));
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct ChannelSummary {
    name: String,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Serialize)]
struct SegmentSummary {
    rows: usize,
    span_seconds: f64,
    channels: Vec<ChannelSummary>,
}

fn segment(args: &SegmentArgs, json: bool) -> Result<ExitCode> {
    let coarse = TimeSeriesClient::new(&args.dataset.dataset, client_config(&args.dataset)?)?;
    let table = coarse
        .get_segment_by_labels(&args.participant, &args.visit, &args.period, &args.status)
        .with_context(|| {
            format!(
                "reading segment {}/{}/{}/{}",
                args.participant, args.visit, args.period, args.status
            )
        })?;

    let channels = table
        .channels()
        .iter()
        .filter_map(|c| match &c.data {
            ChannelData::Numeric(values) => {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                let n = finite.len() as f64;
                Some(ChannelSummary {
                    name: c.name.clone(),
                    mean: (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / n),
                    min: finite.iter().copied().reduce(f64::min),
                    max: finite.iter().copied().reduce(f64::max),
                })
            }
            ChannelData::Text(_) => None,
        })
        .collect();
    let summary = SegmentSummary {
        rows: table.len(),
        span_seconds: table.time_span().unwrap_or_default().as_secs_f64(),
        channels,
    };

    if json {
        print_json(&summary)?;
    } else {
        println!("{} rows over {:.3} s", summary.rows, summary.span_seconds);
        for c in &summary.channels {
            match (c.mean, c.min, c.max) {
                (Some(mean), Some(min), Some(max)) => {
                    println!("  {:<22} mean {mean:>10.3}  min {min:>10.3}  max {max:>10.3}", c.name)
                }
                _ => println!("  {:<22} no values", c.name),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn stim(args: &DatasetArgs, json: bool) -> Result<ExitCode> {
    let resolution = resolve_stim_mapping(&args.dataset)
        .with_context(|| format!("resolving stimulation settings in {}", args.dataset.display()))?;

    if json {
        let entries: Vec<_> = resolution.settings.iter().collect();
        print_json(&entries)?;
    } else {
        for (key, s) in &resolution.settings {
            println!(
                "{:<24} option {:<2} {:>5} ms {:>5} mA {:>3} Hz  on {} min / off {} min",
                key.to_string(),
                s.option.to_string(),
                s.pulse_width,
                s.current,
                s.frequency,
                s.duty_cycle_on,
                s.duty_cycle_off
            );
        }
    }
    for (key, e) in &resolution.errors {
        eprintln!("{key}: {e}");
    }
    Ok(if resolution.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn features(kind: FeatureKind, file: &std::path::Path) -> Result<ExitCode> {
    let context = || format!("reading {}", file.display());
    match kind {
        FeatureKind::Ecg => print_json(&EcgFeatures::from_csv(file).with_context(context)?)?,
        FeatureKind::Bp => print_json(&BpFeatures::from_csv(file).with_context(context)?)?,
    }
    Ok(ExitCode::SUCCESS)
}
