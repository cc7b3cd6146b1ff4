mod collate;
mod config;
mod csv_out;
mod fetch;
mod record;
mod row;

use clap::Parser;
use collate::Collator;
use config::{CollateConfig, MalformedPolicy};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_CONFIG: &str = "collate.toml";

/// Fetch zk benchmark logs from object storage and collate every
/// `+ job_name` record they contain into a single CSV summary.
#[derive(Parser, Debug)]
#[command(name = "bench-collate", version, about)]
pub struct Cli {
    /// Config file path [default: collate.toml, optional]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote location to copy results from (overrides config)
    #[arg(long)]
    remote: Option<String>,

    /// Local directory holding result logs (overrides config)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output CSV path (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the remote copy and collate the local directory as-is
    #[arg(long)]
    no_fetch: bool,

    /// Warn about malformed records and keep going instead of aborting
    #[arg(long)]
    skip_malformed: bool,

    /// Print resolved settings and the fetch command, don't run
    #[arg(long)]
    dry_run: bool,

    /// Extra logging (per-file progress, skipped entries)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut CollateConfig) {
        if let Some(ref remote) = self.remote {
            config.fetch.remote = remote.clone();
        }
        if let Some(ref dir) = self.input_dir {
            config.input.dir = dir.clone();
        }
        if let Some(ref output) = self.output {
            config.output.path = output.clone();
        }
        if self.no_fetch {
            config.fetch.enabled = false;
        }
        if self.skip_malformed {
            config.parse.on_malformed = MalformedPolicy::Skip;
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Resolved settings shown by `--dry-run`.
fn resolved_settings(collator: &Collator) -> String {
    let cfg = collator.config();
    let mut out = format!("bench-collate v{}\n", env!("CARGO_PKG_VERSION"));
    if cfg.fetch.enabled {
        let on_error = if cfg.fetch.fail_on_error { "fatal" } else { "ignored" };
        out += &format!("Fetch:        {}\n", collator.fetcher().command_line());
        out += &format!("Fetch errors: {on_error}\n");
    } else {
        out += "Fetch:        disabled\n";
    }
    out += &format!("Input dir:    {}\n", cfg.input.dir.display());
    out += &format!("Pattern:      {}\n", cfg.input.pattern);
    out += &format!("Output:       {}\n", cfg.output.path.display());
    out += &format!("Malformed:    {:?}\n", cfg.parse.on_malformed);
    out += "Dry run mode, nothing fetched or written.";
    out
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level())),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let (config_path, required) = match cli.config {
        Some(ref path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let mut config = match config::load_config(&config_path, required) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut config);

    let collator = Collator::new(config);
    if cli.dry_run {
        println!("{}", resolved_settings(&collator));
        return ExitCode::SUCCESS;
    }

    match collator.run() {
        Ok(summary) => {
            if summary.skipped > 0 {
                tracing::warn!(
                    skipped = summary.skipped,
                    "some records were malformed and skipped"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "collation failed");
            ExitCode::FAILURE
        }
    }
}
