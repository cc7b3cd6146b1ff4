use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from collate.toml.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CollateConfig {
    pub fetch: FetchConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub parse: ParseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub enabled: bool,
    /// Remote location handed to the copy command as `{remote}`.
    pub remote: String,
    pub command: String,
    /// Arguments; `{remote}` and `{dest}` are substituted before running.
    pub args: Vec<String>,
    /// Stop the run when the copy command fails instead of collating
    /// whatever is already on disk.
    pub fail_on_error: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: PathBuf,
    /// Glob matched against file names directly under `dir`.
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ParseConfig {
    pub on_malformed: MalformedPolicy,
}

/// What to do with a record that is truncated or has an unparseable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Stop the whole run at the first bad record.
    #[default]
    Abort,
    /// Log a warning, drop the record and keep scanning.
    Skip,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// --- Default implementations ---

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: "s3://zk-benchmarking/".to_string(),
            command: "aws".to_string(),
            args: vec![
                "s3".to_string(),
                "cp".to_string(),
                "{remote}".to_string(),
                "{dest}".to_string(),
                "--recursive".to_string(),
            ],
            fail_on_error: false,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            pattern: "*".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output.csv"),
        }
    }
}

impl CollateConfig {
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load configuration from `path`.
///
/// A missing file yields the defaults unless `required` is set, in which
/// case it is reported as a read error like any other I/O failure.
pub fn load_config(path: &Path, required: bool) -> Result<CollateConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => CollateConfig::from_toml(path, &contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(CollateConfig::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_original_layout() {
        let cfg = CollateConfig::default();
        assert!(cfg.fetch.enabled);
        assert_eq!(cfg.fetch.remote, "s3://zk-benchmarking/");
        assert_eq!(cfg.fetch.command, "aws");
        assert_eq!(
            cfg.fetch.args,
            vec!["s3", "cp", "{remote}", "{dest}", "--recursive"]
        );
        assert!(!cfg.fetch.fail_on_error);
        assert_eq!(cfg.input.dir, PathBuf::from("results"));
        assert_eq!(cfg.input.pattern, "*");
        assert_eq!(cfg.output.path, PathBuf::from("output.csv"));
        assert_eq!(cfg.parse.on_malformed, MalformedPolicy::Abort);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let cfg = CollateConfig::from_toml(Path::new("collate.toml"), "").unwrap();
        assert_eq!(cfg.input.dir, PathBuf::from("results"));
        assert_eq!(cfg.fetch.command, "aws");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let toml = r#"
[fetch]
remote = "s3://other-bucket/runs/"
fail_on_error = true

[input]
pattern = "*.log"

[parse]
on_malformed = "skip"
"#;
        let cfg = CollateConfig::from_toml(Path::new("collate.toml"), toml).unwrap();
        assert_eq!(cfg.fetch.remote, "s3://other-bucket/runs/");
        assert!(cfg.fetch.fail_on_error);
        assert!(cfg.fetch.enabled);
        assert_eq!(cfg.fetch.command, "aws");
        assert_eq!(cfg.input.pattern, "*.log");
        assert_eq!(cfg.input.dir, PathBuf::from("results"));
        assert_eq!(cfg.output.path, PathBuf::from("output.csv"));
        assert_eq!(cfg.parse.on_malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn unknown_policy_is_parse_error() {
        let err = CollateConfig::from_toml(
            Path::new("collate.toml"),
            "[parse]\non_malformed = \"ignore\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_optional_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(&dir.path().join("collate.toml"), false).unwrap();
        assert_eq!(cfg.output.path, PathBuf::from("output.csv"));
    }

    #[test]
    fn missing_required_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("collate.toml"), true).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn loads_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collate.toml");
        std::fs::write(&path, "[output]\npath = \"summary.csv\"\n").unwrap();
        let cfg = load_config(&path, true).unwrap();
        assert_eq!(cfg.output.path, PathBuf::from("summary.csv"));
    }
}
