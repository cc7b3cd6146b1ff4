use crate::config::FetchConfig;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to create fetch destination {}: {source}", .dir.display())]
    Prepare {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` exited with {}", .code.map_or("a signal".to_string(), |c| format!("status {c}")))]
    Failed { command: String, code: Option<i32> },
}

/// Copies benchmark logs from the remote store into a local directory by
/// shelling out to an external bulk-copy tool (`aws s3 cp` by default).
#[derive(Debug, Clone)]
pub struct Fetcher {
    program: String,
    args: Vec<String>,
    dest: PathBuf,
}

impl Fetcher {
    /// Build the copy command, substituting `{remote}` and `{dest}` in the
    /// configured arguments.
    pub fn from_config(config: &FetchConfig, dest: &Path) -> Self {
        let dest_str = dest.to_string_lossy();
        let args = config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{remote}", &config.remote)
                    .replace("{dest}", &dest_str)
            })
            .collect();
        Self {
            program: config.command.clone(),
            args,
            dest: dest.to_path_buf(),
        }
    }

    /// The full command line, for logs and dry runs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the copy to completion. Output goes straight to the terminal.
    pub fn run(&self) -> Result<(), FetchError> {
        let command = self.command_line();

        std::fs::create_dir_all(&self.dest).map_err(|source| FetchError::Prepare {
            dir: self.dest.clone(),
            source,
        })?;

        tracing::info!(command = %command, "fetching benchmark results");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| FetchError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(FetchError::Failed {
                command,
                code: status.code(),
            });
        }
        Ok(())
    }
}
