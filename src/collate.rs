/// Collation: fetch result logs, scan every file for benchmark records and
/// write one summary row per record.
use crate::config::{CollateConfig, MalformedPolicy};
use crate::csv_out::{CsvSink, SinkError};
use crate::fetch::{FetchError, Fetcher};
use crate::record::{extract_records, scan_records, RecordError};
use crate::row::build_row;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollateSummary {
    pub files: usize,
    pub records: usize,
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CollateError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to list input directory {}: {source}", .dir.display())]
    ListInput {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid input pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed record in {}: {source}", .path.display())]
    Record { path: PathBuf, source: RecordError },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Drives a full run from an explicit configuration.
pub struct Collator {
    config: CollateConfig,
}

impl Collator {
    pub fn new(config: CollateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollateConfig {
        &self.config
    }

    /// The copy command that populates the input directory.
    pub fn fetcher(&self) -> Fetcher {
        Fetcher::from_config(&self.config.fetch, &self.config.input.dir)
    }

    /// Fetch (if enabled), then collate.
    pub fn run(&self) -> Result<CollateSummary, CollateError> {
        if self.config.fetch.enabled {
            self.fetch()?;
        } else {
            tracing::debug!("fetch disabled, using local results only");
        }
        self.collate()
    }

    fn fetch(&self) -> Result<(), CollateError> {
        match self.fetcher().run() {
            Ok(()) => Ok(()),
            Err(e) if !self.config.fetch.fail_on_error => {
                tracing::warn!(error = %e, "fetch failed, collating whatever is on disk");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Scan every input file and write the summary table.
    ///
    /// The table is only moved into place once every file has been processed,
    /// so an aborted run leaves any previous output untouched.
    pub fn collate(&self) -> Result<CollateSummary, CollateError> {
        let files = self.input_files()?;
        tracing::info!(
            dir = %self.config.input.dir.display(),
            files = files.len(),
            "collating benchmark results"
        );

        let mut sink = CsvSink::create(&self.config.output.path)?;
        let mut summary = CollateSummary::default();
        for path in &files {
            self.collate_file(path, &mut sink, &mut summary)?;
            summary.files += 1;
        }

        let written = sink.finish()?;
        tracing::info!(
            output = %written.display(),
            files = summary.files,
            records = summary.records,
            skipped = summary.skipped,
            "wrote summary"
        );
        Ok(summary)
    }

    fn collate_file(
        &self,
        path: &Path,
        sink: &mut CsvSink,
        summary: &mut CollateSummary,
    ) -> Result<(), CollateError> {
        let lines = read_lines(path).map_err(|source| CollateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let instance = instance_type(path);
        let before = sink.rows();

        match self.config.parse.on_malformed {
            MalformedPolicy::Abort => {
                let records = extract_records(&lines).map_err(|source| CollateError::Record {
                    path: path.to_path_buf(),
                    source,
                })?;
                for record in &records {
                    sink.append(&build_row(&instance, record))?;
                }
                summary.records += records.len();
            }
            MalformedPolicy::Skip => {
                for result in scan_records(&lines) {
                    match result {
                        Ok(record) => {
                            sink.append(&build_row(&instance, &record))?;
                            summary.records += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                file = %path.display(),
                                line = e.line(),
                                error = %e,
                                "skipping malformed record"
                            );
                            summary.skipped += 1;
                        }
                    }
                }
            }
        }

        tracing::debug!(
            file = %path.display(),
            instance = %instance,
            rows = sink.rows() - before,
            "collated file"
        );
        Ok(())
    }

    /// Regular files directly under the input directory whose names match
    /// the configured pattern, sorted by name.
    fn input_files(&self) -> Result<Vec<PathBuf>, CollateError> {
        let pattern = glob::Pattern::new(&self.config.input.pattern).map_err(|source| {
            CollateError::Pattern {
                pattern: self.config.input.pattern.clone(),
                source,
            }
        })?;

        let dir = &self.config.input.dir;
        let list_err = |source| CollateError::ListInput {
            dir: dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(list_err)? {
            let path = entry.map_err(list_err)?.path();
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "skipping non-file entry");
                continue;
            }
            let name_matches = path
                .file_name()
                .is_some_and(|n| pattern.matches(&n.to_string_lossy()));
            if !name_matches {
                tracing::debug!(path = %path.display(), "skipping file not matching pattern");
                continue;
            }
            files.push(path);
        }

        files.sort();
        Ok(files)
    }
}

/// Instance type label for a log file: its file name minus the final extension.
pub fn instance_type(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    std::io::BufReader::new(file).lines().collect()
}
