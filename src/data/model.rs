use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CsvColumn – the recording file format
// ---------------------------------------------------------------------------

/// Columns of a coarse time-series recording file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsvColumn {
    ParticipantId,
    VisitId,
    AnsPeriod,
    AnsStatus,
    LabChartTime,
    Ecg,
    Nibp,
    Handgrip,
    RespiratoryWaveform,
    Systolic,
    Diastolic,
    Mean,
    HeartRate,
    RawMsna,
    FilteredMsna,
    RmsMsna,
    RespiratoryRate,
    PercentMvc,
    Stimulator,
    IntegratedMsna,
    Comment,
}

impl CsvColumn {
    pub const ALL: [CsvColumn; 21] = [
        CsvColumn::ParticipantId,
        CsvColumn::VisitId,
        CsvColumn::AnsPeriod,
        CsvColumn::AnsStatus,
        CsvColumn::LabChartTime,
        CsvColumn::Ecg,
        CsvColumn::Nibp,
        CsvColumn::Handgrip,
        CsvColumn::RespiratoryWaveform,
        CsvColumn::Systolic,
        CsvColumn::Diastolic,
        CsvColumn::Mean,
        CsvColumn::HeartRate,
        CsvColumn::RawMsna,
        CsvColumn::FilteredMsna,
        CsvColumn::RmsMsna,
        CsvColumn::RespiratoryRate,
        CsvColumn::PercentMvc,
        CsvColumn::Stimulator,
        CsvColumn::IntegratedMsna,
        CsvColumn::Comment,
    ];

    /// Label columns every decoded row must carry.
    pub const LABELS: [CsvColumn; 4] = [
        CsvColumn::ParticipantId,
        CsvColumn::VisitId,
        CsvColumn::AnsPeriod,
        CsvColumn::AnsStatus,
    ];

    /// Header name in the file.
    pub fn name(self) -> &'static str {
        match self {
            CsvColumn::ParticipantId => "Participant_ID",
            CsvColumn::VisitId => "Visit_ID",
            CsvColumn::AnsPeriod => "ANS_Period",
            CsvColumn::AnsStatus => "ANS_Status",
            CsvColumn::LabChartTime => "LabChartTime",
            CsvColumn::Ecg => "ECG",
            CsvColumn::Nibp => "NIBP",
            CsvColumn::Handgrip => "Handgrip",
            CsvColumn::RespiratoryWaveform => "Respiratory_Waveform",
            CsvColumn::Systolic => "Systolic",
            CsvColumn::Diastolic => "Diastolic",
            CsvColumn::Mean => "Mean",
            CsvColumn::HeartRate => "HR",
            CsvColumn::RawMsna => "Raw MSNA",
            CsvColumn::FilteredMsna => "Filtered_MSNA",
            CsvColumn::RmsMsna => "RMS_MSNA",
            CsvColumn::RespiratoryRate => "Respiratory Rate",
            CsvColumn::PercentMvc => "%MVC",
            CsvColumn::Stimulator => "Stimulator",
            CsvColumn::IntegratedMsna => "Integrated_MSNA",
            CsvColumn::Comment => "Comment",
        }
    }

    /// The time index column.
    pub fn index() -> &'static str {
        CsvColumn::LabChartTime.name()
    }

    /// Every column except the time index (20 names).
    pub fn required() -> Vec<&'static str> {
        CsvColumn::ALL
            .iter()
            .filter(|c| **c != CsvColumn::LabChartTime)
            .map(|c| c.name())
            .collect()
    }

    /// Columns that are decoded as text regardless of their content.
    pub fn is_text(name: &str) -> bool {
        CsvColumn::LABELS.iter().any(|c| c.name() == name) || name == CsvColumn::Comment.name()
    }
}

impl fmt::Display for CsvColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Channel – one named column of a recording
// ---------------------------------------------------------------------------

/// Column storage. Numeric cells that were empty in the file are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ChannelData {
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Numeric(v) => v.len(),
            ChannelData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, rows: &[usize]) -> ChannelData {
        match self {
            ChannelData::Numeric(v) => ChannelData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ChannelData::Text(v) => {
                ChannelData::Text(rows.iter().map(|&r| v[r].clone()).collect())
            }
        }
    }

    /// Append `other`; hands it back when a numeric column meets text.
    fn extend(&mut self, other: ChannelData) -> Option<ChannelData> {
        match (self, other) {
            (ChannelData::Numeric(a), ChannelData::Numeric(b)) => a.extend(b),
            (ChannelData::Text(a), ChannelData::Text(b)) => a.extend(b),
            (ChannelData::Text(a), ChannelData::Numeric(b)) => {
                a.extend(b.into_iter().map(|v| v.to_string()))
            }
            (ChannelData::Numeric(_), rest) => return Some(rest),
        }
        None
    }

    fn into_text(self) -> Vec<String> {
        match self {
            ChannelData::Numeric(v) => v.into_iter().map(|x| x.to_string()).collect(),
            ChannelData::Text(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub data: ChannelData,
}

// ---------------------------------------------------------------------------
// RecordingTable – a decoded recording (or a segment of one)
// ---------------------------------------------------------------------------

/// Samples ordered by elapsed time, with one column per channel.
///
/// The time index is not part of [`column_names`](Self::column_names), the
/// same way `LabChartTime` is the frame index rather than a channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingTable {
    index: Vec<Duration>,
    channels: Vec<Channel>,
}

impl RecordingTable {
    /// Build a table. Every channel must have one value per index entry.
    pub fn new(index: Vec<Duration>, channels: Vec<Channel>) -> Result<Self, String> {
        for ch in &channels {
            if ch.data.len() != index.len() {
                return Err(format!(
                    "channel '{}' has {} values but the index has {}",
                    ch.name,
                    ch.data.len(),
                    index.len()
                ));
            }
        }
        Ok(RecordingTable { index, channels })
    }

    /// Table with an index and no channels. Handy for sampling-rate work.
    pub fn from_index(index: Vec<Duration>) -> Self {
        RecordingTable {
            index,
            channels: Vec::new(),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[Duration] {
        &self.index
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel names in file order, excluding the time index.
    pub fn column_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[f64]> {
        match &self.channel(name)?.data {
            ChannelData::Numeric(v) => Some(v),
            ChannelData::Text(_) => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&[String]> {
        match &self.channel(name)?.data {
            ChannelData::Text(v) => Some(v),
            ChannelData::Numeric(_) => None,
        }
    }

    /// Elapsed time between the first and the last sample.
    pub fn time_span(&self) -> Option<Duration> {
        let first = self.index.first()?;
        let last = self.index.last()?;
        Some(last.saturating_sub(*first))
    }

    /// Copy the given rows (in the given order) into a new table.
    pub fn select_rows(&self, rows: &[usize]) -> RecordingTable {
        RecordingTable {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            channels: self
                .channels
                .iter()
                .map(|c| Channel {
                    name: c.name.clone(),
                    data: c.data.select(rows),
                })
                .collect(),
        }
    }

    /// Same columns, zero rows.
    pub fn empty_like(&self) -> RecordingTable {
        self.select_rows(&[])
    }

    /// Append the rows of `other`. Both tables must have the same columns in
    /// the same order; a column that is numeric in one and text in the other
    /// is kept as text.
    pub fn append(&mut self, other: RecordingTable) -> Result<(), String> {
        if self.channels.is_empty() && self.index.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.column_names() != other.column_names() {
            return Err(format!(
                "column mismatch: {:?} vs {:?}",
                self.column_names(),
                other.column_names()
            ));
        }
        self.index.extend(other.index);
        for (mine, theirs) in self.channels.iter_mut().zip(other.channels) {
            if let Some(rest) = mine.data.extend(theirs.data) {
                // Numeric here, text there: demote to text.
                let mut text = std::mem::replace(&mut mine.data, ChannelData::Text(Vec::new()))
                    .into_text();
                text.extend(rest.into_text());
                mine.data = ChannelData::Text(text);
            }
        }
        Ok(())
    }

    /// Remove a channel, returning it.
    pub fn drop_channel(&mut self, name: &str) -> Option<Channel> {
        let pos = self.channels.iter().position(|c| c.name == name)?;
        Some(self.channels.remove(pos))
    }

    /// Add (or replace) a channel.
    pub fn insert_channel(&mut self, channel: Channel) -> Result<(), String> {
        if channel.data.len() != self.index.len() {
            return Err(format!(
                "channel '{}' has {} values but the index has {}",
                channel.name,
                channel.data.len(),
                self.index.len()
            ));
        }
        match self.channels.iter_mut().find(|c| c.name == channel.name) {
            Some(existing) => *existing = channel,
            None => self.channels.push(channel),
        }
        Ok(())
    }

    /// Whether the time index never decreases.
    pub fn is_time_ordered(&self) -> bool {
        self.index.windows(2).all(|w| w[0] <= w[1])
    }
}
