/// Benchmark record extraction from plain-text benchmark logs.
///
/// A record is a six-line window anchored at a line beginning with
/// [`MARKER`]. Each line holds `label: value`; labels are positional and not
/// checked, values are kept as opaque strings.

/// Prefix identifying the first line of a record window.
pub const MARKER: &str = "+ job_name";

/// Number of lines in a record window, marker line included.
pub const RECORD_WINDOW: usize = 6;

const FIELD_NAMES: [&str; RECORD_WINDOW] = [
    "job_name",
    "job_size",
    "proof_duration",
    "verify_duration",
    "output_bytes",
    "proof_bytes",
];

/// One benchmark run as reported in a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkRecord {
    /// 1-based line number of the marker line.
    pub line: usize,
    pub job_name: String,
    pub job_size: String,
    pub proof_duration: String,
    pub verify_duration: String,
    pub output_bytes: String,
    pub proof_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record at line {line} is truncated: only {available} of 6 lines available")]
    Truncated { line: usize, available: usize },
    #[error("line {line}: `{field}` has no `:` separator")]
    MissingColon { line: usize, field: &'static str },
    #[error("line {line}: `{field}` is empty")]
    EmptyField { line: usize, field: &'static str },
}

impl RecordError {
    /// 1-based line number the error points at.
    pub fn line(&self) -> usize {
        match self {
            RecordError::Truncated { line, .. }
            | RecordError::MissingColon { line, .. }
            | RecordError::EmptyField { line, .. } => *line,
        }
    }
}

/// Lazily scan `lines` for records, yielding one result per marker line.
///
/// The scan moves one line at a time, so markers closer than
/// [`RECORD_WINDOW`] lines apart produce overlapping windows.
pub fn scan_records<'a, S: AsRef<str> + 'a>(
    lines: &'a [S],
) -> impl Iterator<Item = Result<BenchmarkRecord, RecordError>> + 'a {
    lines
        .iter()
        .enumerate()
        .filter(|&(_, line)| line.as_ref().starts_with(MARKER))
        .map(move |(anchor, _)| read_window(lines, anchor))
}

/// Extract every record in `lines`, stopping at the first malformed one.
pub fn extract_records<S: AsRef<str>>(lines: &[S]) -> Result<Vec<BenchmarkRecord>, RecordError> {
    scan_records(lines).collect()
}

fn read_window<S: AsRef<str>>(lines: &[S], anchor: usize) -> Result<BenchmarkRecord, RecordError> {
    let window = lines
        .get(anchor..anchor + RECORD_WINDOW)
        .ok_or_else(|| RecordError::Truncated {
            line: anchor + 1,
            available: lines.len() - anchor,
        })?;

    let mut values: [&str; RECORD_WINDOW] = [""; RECORD_WINDOW];
    for (offset, raw) in window.iter().enumerate() {
        let line = anchor + offset + 1;
        let field = FIELD_NAMES[offset];
        let mut value = field_value(raw.as_ref())
            .ok_or_else(|| RecordError::MissingColon { line, field })?;
        if offset == 0 {
            value = strip_quotes(value);
        }
        if value.is_empty() {
            return Err(RecordError::EmptyField { line, field });
        }
        values[offset] = value;
    }

    let [job_name, job_size, proof_duration, verify_duration, output_bytes, proof_bytes] = values;
    Ok(BenchmarkRecord {
        line: anchor + 1,
        job_name: job_name.to_string(),
        job_size: job_size.to_string(),
        proof_duration: proof_duration.to_string(),
        verify_duration: verify_duration.to_string(),
        output_bytes: output_bytes.to_string(),
        proof_bytes: proof_bytes.to_string(),
    })
}

/// Everything after the first `:`, trimmed.
fn field_value(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}

/// Remove one layer of surrounding double quotes, if both are present.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
