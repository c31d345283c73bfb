//! Report assembly
//!
//! Turns raw [`CommandResult`]s into display records and bundles them with
//! run metadata into the read-only [`ReportContext`] that templates see.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::runner::CommandResult;

pub mod archive;
pub mod render;

pub use archive::build_zip;
pub use render::{RenderedAttachment, ReportRenderer};

/// A command result plus the display fields templates want
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandReport {
    #[serde(flatten)]
    pub result: CommandResult,
    pub start_time_str: String,
    pub end_time_str: String,
    pub execution_time_seconds: f64,
}

impl CommandReport {
    /// `date_time_format` must be a valid strftime pattern (checked by
    /// config validation).
    pub fn new(result: CommandResult, date_time_format: &str) -> Self {
        let execution_time_seconds = (result.end_time - result.start_time)
            .to_std()
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            start_time_str: result.start_time.format(date_time_format).to_string(),
            end_time_str: result.end_time.format(date_time_format).to_string(),
            execution_time_seconds,
            result,
        }
    }
}

/// Everything the body and attachment templates can reference
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    pub host: String,
    pub now: DateTime<Local>,
    pub now_str: String,
    pub command_results: Vec<CommandReport>,
    pub attachment_only_command_results: Vec<CommandReport>,
    /// Command-line arguments as resolved for this run
    pub args: Value,
    pub config: Config,
}

impl ReportContext {
    pub fn new(
        host: String,
        now: DateTime<Local>,
        results: Vec<CommandResult>,
        args: Value,
        config: Config,
    ) -> Self {
        let command_results: Vec<CommandReport> = results
            .into_iter()
            .map(|result| CommandReport::new(result, &config.date_time_format))
            .collect();
        let attachment_only_command_results = command_results
            .iter()
            .filter(|report| report.result.attachment_only)
            .cloned()
            .collect();

        Self {
            host,
            now_str: now.format(&config.date_time_format).to_string(),
            now,
            command_results,
            attachment_only_command_results,
            args,
            config,
        }
    }

    /// The context as a JSON object, for name templates
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).context("Failed to serialize report context")
    }

    /// Global context overlaid with one command's fields.
    ///
    /// Command fields win on name collisions; the whole record is also
    /// available as `command_result`.
    pub fn command_value(global: &Value, report: &CommandReport) -> Result<Value> {
        let Value::Object(mut merged) = global.clone() else {
            bail!("Report context is not an object");
        };
        let Value::Object(fields) =
            serde_json::to_value(report).context("Failed to serialize command result")?
        else {
            bail!("Command result is not an object");
        };

        merged.insert("command_result".to_string(), Value::Object(fields.clone()));
        merged.extend(fields);
        Ok(Value::Object(merged))
    }

    /// Context for the zip file name: the global context overlaid with the
    /// last command's fields, or just the global context when there are no
    /// commands.
    pub fn archive_name_value(&self, global: &Value) -> Result<Value> {
        match self.command_results.last() {
            Some(report) => Self::command_value(global, report),
            None => Ok(global.clone()),
        }
    }
}

/// Name of this machine as reported by the OS
pub fn local_hostname() -> Result<String> {
    let host = hostname::get().context("Failed to determine host name")?;
    Ok(host.to_string_lossy().into_owned())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_display_fields() {
        let report = CommandReport::new(result("Uptime", "up 3 days", Some(0), false), "%H:%M:%S");
        assert_eq!(report.start_time_str, "09:00:00");
        assert_eq!(report.end_time_str, "09:00:02");
        assert_eq!(report.execution_time_seconds, 2.0);
    }

    #[test]
    fn test_context_keeps_order_and_filters_attachment_only() {
        let ctx = context(vec![
            result("A", "", Some(0), false),
            result("B", "", Some(0), true),
            result("C", "", Some(1), true),
        ]);

        let labels: Vec<_> = ctx.command_results.iter().map(|r| r.result.label.as_str()).collect();
        assert_eq!(labels, ["A", "B", "C"]);
        let attachment_only: Vec<_> = ctx
            .attachment_only_command_results
            .iter()
            .map(|r| r.result.label.as_str())
            .collect();
        assert_eq!(attachment_only, ["B", "C"]);
        assert_eq!(ctx.now_str, "2026-10-18 09:30:00");
    }

    #[test]
    fn test_command_result_serializes_flat() {
        let report = CommandReport::new(result("Disk", "ok", None, false), "%c");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["label"], "Disk");
        assert_eq!(value["label_slug"], "disk");
        assert_eq!(value["returncode"], Value::Null);
        assert!(value["start_time_str"].is_string());
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_command_fields_override_global_fields() {
        let ctx = context(vec![result("Disk", "ok", Some(0), false)]);
        let global = serde_json::json!({ "host": "web-01", "label": "global", "stdout": "x" });
        let merged = ReportContext::command_value(&global, &ctx.command_results[0]).unwrap();

        assert_eq!(merged["host"], "web-01");
        assert_eq!(merged["label"], "Disk");
        assert_eq!(merged["stdout"], "ok");
        assert_eq!(merged["command_result"]["label"], "Disk");
    }

    #[test]
    fn test_archive_name_sees_last_command() {
        let ctx = context(vec![
            result("Disk", "", Some(0), false),
            result("Memory", "", Some(0), true),
        ]);
        let global = ctx.to_value().unwrap();
        let value = ctx.archive_name_value(&global).unwrap();

        assert_eq!(value["host"], "web-01");
        assert_eq!(value["label_slug"], "memory");
        assert_eq!(
            crate::shared::format_braces("{host}-{label_slug}.zip", &value).unwrap(),
            "web-01-memory.zip"
        );
    }

    #[test]
    fn test_archive_name_without_commands_uses_global_context() {
        let ctx = context(Vec::new());
        let global = ctx.to_value().unwrap();
        assert_eq!(ctx.archive_name_value(&global).unwrap(), global);
    }

    #[test]
    fn test_password_never_reaches_templates() {
        let mut ctx = context(Vec::new());
        ctx.config.smtp.password = Some("hunter2".to_string());
        let value = ctx.to_value().unwrap();
        assert!(value["config"]["smtp"].get("password").is_none());
    }

    #[test]
    fn test_local_hostname() {
        let host = local_hostname().unwrap();
        assert!(!host.is_empty());
    }
}
