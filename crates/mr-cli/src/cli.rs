//! CLI argument definitions using clap derive API

use clap::{Args, Parser};
use mr_core::Mode;
use std::path::PathBuf;

/// Apply the ordered SQL migration manifest to the database in DATABASE_URL
#[derive(Parser, Debug)]
#[command(name = "manifest-runner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Run options
    #[command(flatten)]
    pub run: RunArgs,
}

/// Where to run and how noisy to be
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose diagnostic output
    #[arg(short, long)]
    pub verbose: bool,

    /// Repository root that manifest paths resolve against
    #[arg(short = 'p', long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Database connection string (postgres://..., host=... key/value pairs, duckdb://<path> or a .duckdb file)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

/// Manifest selection and execution flags
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Run the baseline schema migrations before the core set (empty database)
    #[arg(long)]
    pub fresh: bool,

    /// Also run entries marked optional
    #[arg(long)]
    pub include_optional: bool,

    /// Log what would run without executing any SQL
    #[arg(long)]
    pub dry_run: bool,

    /// Keep going after a failed entry and report all failures at the end
    #[arg(long)]
    pub continue_on_error: bool,

    /// First entry to attempt (relative path or file name)
    #[arg(long, value_name = "NAME")]
    pub from: Option<String>,

    /// Last entry to attempt (relative path or file name)
    #[arg(long, value_name = "NAME")]
    pub to: Option<String>,

    /// Run log path (default: packages/db/logs/production-manifest-<timestamp>.log)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Also write the run report as JSON
    #[arg(long, value_name = "PATH")]
    pub report_file: Option<PathBuf>,

    /// Print the effective manifest and exit without connecting
    #[arg(long)]
    pub list: bool,
}

impl RunArgs {
    pub fn mode(&self) -> Mode {
        if self.fresh {
            Mode::Fresh
        } else {
            Mode::Existing
        }
    }
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
