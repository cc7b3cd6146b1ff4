use crate::record::BenchmarkRecord;

/// Header row written at the top of every summary table.
pub const HEADER: [&str; 5] = [
    "Instance type + job name + job size",
    "Proof duration",
    "Verify duration",
    "Output bytes",
    "Proof bytes",
];

/// One line of the summary table. Values are copied verbatim from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub label: String,
    pub proof_duration: String,
    pub verify_duration: String,
    pub output_bytes: String,
    pub proof_bytes: String,
}

impl OutputRow {
    /// Columns in header order.
    pub fn fields(&self) -> [&str; 5] {
        [
            self.label.as_str(),
            self.proof_duration.as_str(),
            self.verify_duration.as_str(),
            self.output_bytes.as_str(),
            self.proof_bytes.as_str(),
        ]
    }
}

/// Build the summary row for `record`, labelled with the instance it ran on.
pub fn build_row(instance_type: &str, record: &BenchmarkRecord) -> OutputRow {
    OutputRow {
        label: format!(
            "{} {} {}",
            instance_type, record.job_name, record.job_size
        ),
        proof_duration: record.proof_duration.clone(),
        verify_duration: record.verify_duration.clone(),
        output_bytes: record.output_bytes.clone(),
        proof_bytes: record.proof_bytes.clone(),
    }
}
