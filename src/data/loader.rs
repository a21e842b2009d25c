use std::io::Read;
use std::path::Path;
use std::time::Duration;

use super::model::{Channel, ChannelData, CsvColumn, RecordingTable};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Decode a recording file into a [`RecordingTable`].
///
/// Layout: header row, one row per sample. `LabChartTime` holds float
/// seconds and becomes the time index; the four label columns
/// (`Participant_ID`, `Visit_ID`, `ANS_Period`, `ANS_Status`) must be present.
/// Every other column becomes a channel.
pub fn load_recording(path: &Path, delimiter: u8) -> Result<RecordingTable> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let table = read_recording(file, delimiter, path)?;
    log::debug!(
        "Decoded {} ({} rows, {} channels)",
        path.display(),
        table.len(),
        table.channels().len()
    );
    Ok(table)
}

/// Decode recording content from any reader. `source` is only used in
/// error messages.
pub fn read_recording<R: Read>(reader: R, delimiter: u8, source: &Path) -> Result<RecordingTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::parse(source, format!("reading header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let time_idx = headers
        .iter()
        .position(|h| h == CsvColumn::index())
        .ok_or_else(|| Error::parse(source, format!("missing '{}' column", CsvColumn::index())))?;
    for label in CsvColumn::LABELS {
        if !headers.iter().any(|h| h == label.name()) {
            return Err(Error::parse(source, format!("missing '{label}' column")));
        }
    }
    for (i, h) in headers.iter().enumerate() {
        if headers[..i].contains(h) {
            return Err(Error::parse(source, format!("duplicate column '{h}'")));
        }
    }

    let mut index = Vec::new();
    let mut columns: Vec<ColumnBuilder> = headers
        .iter()
        .map(|h| ColumnBuilder::for_header(h))
        .collect();

    let mut record = csv::StringRecord::new();
    let mut row_no = 0usize;
    while reader
        .read_record(&mut record)
        .map_err(|e| Error::parse(source, format!("row {row_no}: {e}")))?
    {
        let time = record.get(time_idx).unwrap_or("");
        index.push(parse_seconds(time).map_err(|msg| {
            Error::parse(source, format!("row {row_no}, {}: {msg}", CsvColumn::index()))
        })?);
        for (col_idx, value) in record.iter().enumerate() {
            if col_idx != time_idx {
                columns[col_idx].push(value, &headers[col_idx]);
            }
        }
        row_no += 1;
    }

    let channels = headers
        .into_iter()
        .zip(columns)
        .enumerate()
        .filter(|(i, _)| *i != time_idx)
        .map(|(_, (name, column))| Channel {
            name,
            data: column.finish(),
        })
        .collect();

    let table = RecordingTable::new(index, channels).map_err(|msg| Error::parse(source, msg))?;
    if !table.is_time_ordered() {
        log::warn!(
            "{}: {} is not monotonically non-decreasing",
            source.display(),
            CsvColumn::index()
        );
    }
    Ok(table)
}

/// Elapsed seconds → duration. Negative, NaN and infinite values are errors.
fn parse_seconds(s: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("'{s}' is not a valid elapsed time"))
}

/// Per-column accumulator. Label columns and `Comment` are text from the
/// header on; any other column is numeric until a cell fails to parse, at
/// which point it is demoted to text. Empty numeric cells become `NaN`.
enum ColumnBuilder {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnBuilder {
    fn for_header(name: &str) -> Self {
        if CsvColumn::is_text(name) {
            ColumnBuilder::Text(Vec::new())
        } else {
            ColumnBuilder::Numeric(Vec::new())
        }
    }

    fn push(&mut self, cell: &str, name: &str) {
        match self {
            ColumnBuilder::Text(values) => values.push(cell.to_string()),
            ColumnBuilder::Numeric(values) => {
                let trimmed = cell.trim();
                if trimmed.is_empty() {
                    values.push(f64::NAN);
                } else if let Ok(v) = trimmed.parse::<f64>() {
                    values.push(v);
                } else {
                    log::debug!("Channel '{name}' has non-numeric cells, keeping it as text");
                    let mut text: Vec<String> = values
                        .iter()
                        .map(|v| if v.is_nan() { String::new() } else { v.to_string() })
                        .collect();
                    text.push(cell.to_string());
                    *self = ColumnBuilder::Text(text);
                }
            }
        }
    }

    fn finish(self) -> ChannelData {
        match self {
            ColumnBuilder::Numeric(values) => ChannelData::Numeric(values),
            ColumnBuilder::Text(values) => ChannelData::Text(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "test.csv";

    fn decode(text: &str, delimiter: u8) -> Result<RecordingTable> {
        read_recording(text.as_bytes(), delimiter, Path::new(SOURCE))
    }

    #[test]
    fn decodes_pipe_separated_rows() {
        let text = "\
LabChartTime|Participant_ID|Visit_ID|ANS_Period|ANS_Status|HR|Comment
0.000|P1|SV1|REST|OFF|60.5|start
0.004|P1|SV1|REST|OFF||
";
        let table = decode(text, b'|').unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.index()[1], Duration::from_millis(4));
        assert_eq!(
            table.column_names(),
            vec!["Participant_ID", "Visit_ID", "ANS_Period", "ANS_Status", "HR", "Comment"]
        );
        let hr = table.numeric("HR").unwrap();
        assert_eq!(hr[0], 60.5);
        assert!(hr[1].is_nan());
        assert_eq!(table.text("Comment").unwrap()[1], "");
    }

    #[test]
    fn numeric_looking_ids_stay_text() {
        let text = "LabChartTime,Participant_ID,Visit_ID,ANS_Period,ANS_Status\n0,001,SV1,REST,OFF\n";
        let table = decode(text, b',').unwrap();
        assert_eq!(table.text("Participant_ID").unwrap()[0], "001");
    }

    #[test]
    fn missing_time_column_is_a_parse_error() {
        let text = "Participant_ID,Visit_ID,ANS_Period,ANS_Status\nP1,SV1,REST,OFF\n";
        let err = decode(text, b',').unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("LabChartTime"));
    }

    #[test]
    fn missing_label_column_is_a_parse_error() {
        let text = "LabChartTime,Participant_ID,Visit_ID,ANS_Period\n0,P1,SV1,REST\n";
        assert!(matches!(decode(text, b','), Err(Error::Parse { .. })));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let text = "LabChartTime,Participant_ID,Visit_ID,ANS_Period,ANS_Status\n0,P1,SV1,REST\n";
        assert!(matches!(decode(text, b','), Err(Error::Parse { .. })));
    }

    #[test]
    fn negative_time_is_rejected() {
        let text = "LabChartTime,Participant_ID,Visit_ID,ANS_Period,ANS_Status\n-1,P1,SV1,REST,OFF\n";
        assert!(matches!(decode(text, b','), Err(Error::Parse { .. })));
    }

    #[test]
    fn wrong_delimiter_fails_on_missing_columns() {
        let text = "LabChartTime|Participant_ID|Visit_ID|ANS_Period|ANS_Status\n0|P1|SV1|REST|OFF\n";
        assert!(decode(text, b',').is_err());
    }

    #[test]
    fn non_numeric_channel_is_demoted_to_text() {
        let text = "\
LabChartTime|Participant_ID|Visit_ID|ANS_Period|ANS_Status|Stimulator
0.000|P1|SV1|REST|OFF|1.5
0.004|P1|SV1|REST|OFF|
0.008|P1|SV1|REST|OFF|pulse
";
        let table = decode(text, b'|').unwrap();
        assert_eq!(table.text("Stimulator").unwrap(), &["1.5", "", "pulse"]);
        assert!(table.numeric("Stimulator").is_none());
    }

    #[test]
    fn columns_are_typed_from_the_header() {
        let text = "\
LabChartTime,Participant_ID,Visit_ID,ANS_Period,ANS_Status,HR,Comment
0,P1,SV1,REST,OFF,60,12
0.004,P1,SV1,REST,OFF,61,
";
        let table = decode(text, b',').unwrap();
        assert_eq!(table.numeric("HR").unwrap(), &[60.0, 61.0]);
        assert_eq!(table.text("Comment").unwrap(), &["12", ""]);
        assert_eq!(table.index().len(), 2);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_recording(Path::new("/nonexistent/recording.csv"), b'|').unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
