//! # statusmail - server status reports by email
//!
//! Runs a configured list of shell commands in parallel, renders their
//! output into an HTML email body and per-command text files, zips the
//! files and mails the whole thing over SMTP.
//!
//! ## Quick Start
//!
//! ```bash
//! # Preview the report without sending it
//! statusmail -f config.yml --body-template body-template.html --dry-run
//!
//! # Send it, running at most 4 commands at a time
//! statusmail -f config.yml -j 4
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! from: status@example.com
//! to:
//!   - ops@example.com
//! subject: "Server status for {host}"
//! smtp:
//!   server: smtp.example.com
//!   port: 587
//!   tls: true
//!   login: true
//!   user: reporter
//!   password: secret   # or STATUSMAIL_SMTP__PASSWORD
//! commands:
//!   - label: Uptime
//!     command: uptime
//!   - label: Processes
//!     command: ps aux
//!     attachment_only: true
//! ```
//!
//! ## Pipeline
//!
//! config ([`config`]) → commands in parallel ([`runner`], [`parallel`]) →
//! templates ([`report`]) → SMTP ([`mail`]).

pub mod cli;
pub mod config;
pub mod mail;
pub mod parallel;
pub mod report;
pub mod runner;
pub mod shared;

pub use cli::{Cli, Output};
pub use config::Config;

/// Result type alias for statusmail operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
