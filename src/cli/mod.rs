//! Command-line interface for statusmail
//!
//! One flat command: load the config, run every configured command, render
//! the report and mail it (or print it with `--dry-run`).

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

mod output;
mod run;

pub use output::Output;

use crate::parallel::default_worker_count;

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_BODY_TEMPLATE: &str = "body-template.html";
pub const DEFAULT_ATTACHMENT_TEMPLATE: &str = "attachment-template.txt";

/// Run server status commands and email the results
#[derive(Parser, Debug)]
#[command(name = "statusmail", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML config file [default: config.yml beside the executable]
    #[arg(short = 'f', long, value_name = "FILE", env = "STATUSMAIL_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Path to a Jinja template file for the email body
    /// [default: body-template.html beside the executable]
    #[arg(long, value_name = "FILE")]
    pub body_template: Option<PathBuf>,

    /// Path to a Jinja template file for command result attachment files
    /// [default: attachment-template.txt beside the executable, if present]
    #[arg(long, value_name = "FILE")]
    pub attachment_template: Option<PathBuf>,

    /// Maximum number of commands to run in parallel [default: 2 x CPU count]
    #[arg(short = 'j', long, value_name = "N", value_parser = parse_worker_count)]
    pub num_parallel_commands: Option<usize>,

    /// Run the commands and render the report, but print it instead of sending
    #[arg(long)]
    pub dry_run: bool,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments after defaults are resolved; echoed into templates as `args`
#[derive(Debug, Clone, Serialize)]
pub struct RunArgs {
    pub config_file: PathBuf,
    pub body_template: PathBuf,
    pub attachment_template: Option<PathBuf>,
    pub num_parallel_commands: usize,
    pub dry_run: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);
        let output = Output::new(self.verbose > 0, self.quiet);

        tracing::info!("Starting {} {}", crate::PKG_NAME, crate::VERSION);
        let args = self.resolve();
        run::execute(args, output).await
    }

    /// Fill in defaults that depend on where the executable lives
    pub fn resolve(&self) -> RunArgs {
        let attachment_template = self.attachment_template.clone().or_else(|| {
            let candidate = beside_executable(DEFAULT_ATTACHMENT_TEMPLATE);
            candidate.is_file().then_some(candidate)
        });

        RunArgs {
            config_file: self
                .config_file
                .clone()
                .unwrap_or_else(|| beside_executable(DEFAULT_CONFIG_FILE)),
            body_template: self
                .body_template
                .clone()
                .unwrap_or_else(|| beside_executable(DEFAULT_BODY_TEMPLATE)),
            attachment_template,
            num_parallel_commands: self
                .num_parallel_commands
                .unwrap_or_else(default_worker_count),
            dry_run: self.dry_run,
        }
    }
}

fn beside_executable(name: &str) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn parse_worker_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug,lettre=info"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // try_init: tests may install a subscriber first
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
