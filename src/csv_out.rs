//! Summary table output.
//!
//! Rows are appended to a temporary file next to the destination and the
//! file is renamed into place on `finish()`. An unfinished sink removes its
//! temporary file on drop, so a failed run never leaves a half-written table.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::Writer;
use tempfile::{Builder, NamedTempFile};

use crate::row::{OutputRow, HEADER};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create temporary output next to {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write CSV record: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to move output into place at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Append-only CSV writer for the summary table.
pub struct CsvSink {
    writer: Writer<BufWriter<NamedTempFile>>,
    final_path: PathBuf,
    rows: usize,
}

impl CsvSink {
    /// Start a new table at `path` and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let final_path = path.as_ref().to_path_buf();
        let parent = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let temp = temp_builder().tempfile_in(parent).map_err(|source| SinkError::Create {
            path: final_path.clone(),
            source,
        })?;

        let mut writer = Writer::from_writer(BufWriter::new(temp));
        writer.write_record(HEADER)?;

        Ok(Self {
            writer,
            final_path,
            rows: 0,
        })
    }

    pub fn append(&mut self, row: &OutputRow) -> Result<(), SinkError> {
        self.writer.write_record(row.fields())?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and atomically replace the destination. Returns its path.
    pub fn finish(self) -> Result<PathBuf, SinkError> {
        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))?;
        let temp = buf_writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))?;

        // Replacing a table keeps its mode; a fresh one gets the umask default.
        if let Ok(existing) = std::fs::metadata(&self.final_path) {
            temp.as_file().set_permissions(existing.permissions())?;
        }

        temp.persist(&self.final_path)
            .map_err(|e| SinkError::Persist {
                path: self.final_path.clone(),
                source: e.error,
            })?;

        Ok(self.final_path)
    }
}

/// Temp files default to 0600; ask for 0666 so the umask decides, as it
/// would for a plainly created file.
#[cfg(unix)]
fn temp_builder() -> Builder<'static, 'static> {
    use std::os::unix::fs::PermissionsExt;
    let mut builder = Builder::new();
    builder.permissions(std::fs::Permissions::from_mode(0o666));
    builder
}

#[cfg(not(unix))]
fn temp_builder() -> Builder<'static, 'static> {
    Builder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn row(label: &str) -> OutputRow {
        OutputRow {
            label: label.to_string(),
            proof_duration: "12.3s".to_string(),
            verify_duration: "0.4s".to_string(),
            output_bytes: "256".to_string(),
            proof_bytes: "1024".to_string(),
        }
    }

    #[test]
    fn writes_header_then_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&row("m5.xlarge sum_test 1024")).unwrap();
        assert_eq!(sink.rows(), 1);
        let written = sink.finish().unwrap();

        assert_eq!(written, path);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Instance type + job name + job size,Proof duration,Verify duration,Output bytes,Proof bytes\n\
             m5.xlarge sum_test 1024,12.3s,0.4s,256,1024\n"
        );
    }

    #[test]
    fn header_only_when_no_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        CsvSink::create(&path).unwrap().finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn quotes_embedded_delimiters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        let mut r = row("a b,c 1");
        r.proof_duration = "say \"hi\"".to_string();
        sink.append(&r).unwrap();
        sink.finish().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "a b,c 1");
        assert_eq!(&records[0][1], "say \"hi\"");
    }

    #[test]
    fn overwrites_existing_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "OLD_CONTENT").unwrap();

        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&row("new")).unwrap();
        sink.finish().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("OLD_CONTENT"));
        assert!(content.contains("new,12.3s"));
    }

    #[test]
    fn dropped_sink_leaves_no_trace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "previous").unwrap();

        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.append(&row("partial")).unwrap();
        }

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temporary file should be removed on drop");
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous");
    }

    #[test]
    fn missing_parent_directory_fails_to_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_such_dir").join("output.csv");
        let err = CsvSink::create(&path).err().unwrap();
        assert!(matches!(err, SinkError::Create { .. }));
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn replacing_output_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        CsvSink::create(&path).unwrap().finish().unwrap();

        assert_eq!(mode(&path), 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn new_output_gets_default_file_mode() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("reference.txt");
        fs::write(&reference, "").unwrap();
        let path = dir.path().join("output.csv");

        CsvSink::create(&path).unwrap().finish().unwrap();

        assert_eq!(mode(&path), mode(&reference));
    }
}
