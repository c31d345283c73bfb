//! Terminal output for statusmail
//!
//! User-facing progress lines, styled with `console`. Diagnostics go through
//! `tracing` instead; this handler is what a person watching the run reads.
//! `--quiet` silences all of it.

use console::style;

/// Output handler for consistent CLI formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    fn print(&self, line: impl std::fmt::Display) {
        if !self.quiet {
            println!("{line}");
        }
    }

    pub fn success(&self, message: &str) {
        self.print(format_args!("{} {}", style("✔").green(), message));
    }

    pub fn warning(&self, message: &str) {
        self.print(format_args!("{} {}", style("⚠").yellow(), message));
    }

    /// Only shown with `-v`
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            self.print(format_args!("{} {}", style("ℹ").dim(), style(message).dim()));
        }
    }

    /// Section title, preceded by a blank line
    pub fn section(&self, title: &str) {
        self.print(format_args!("\n{}", style(title).bold().underlined()));
    }

    /// A pipeline stage starting
    pub fn stage(&self, description: &str) {
        self.print(format_args!("{} {}", style("❯").cyan(), description));
    }

    /// A labelled value, such as an email header in the dry-run preview
    pub fn field(&self, name: &str, value: &str, highlight: bool) {
        let value = if highlight {
            style(value).green().bold()
        } else {
            style(value).white()
        };
        self.print(format_args!("  {} {}", style(name).dim(), value));
    }

    /// One file inside the zip attachment
    pub fn archive_entry(&self, file_name: &str) {
        self.print(format_args!("    • {file_name}"));
    }

    pub fn blank_line(&self) {
        self.print("");
    }

    /// `finished` of `total` commands done; only shown with `-v`
    pub fn commands_progress(&self, finished: usize, total: usize) {
        if self.verbose {
            self.print(format_args!(
                "{} {}/{} commands finished",
                style("►").cyan(),
                style(finished).bold(),
                total
            ));
        }
    }

    /// Per-command summary line: label, exit status and duration
    pub fn command_outcome(&self, label: &str, detail: &str, succeeded: bool) {
        let icon = if succeeded {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        self.print(format_args!("{} {} {}", icon, style(label).bold(), style(detail).dim()));
    }
}

