use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use super::{Output, RunArgs};
use crate::config;
use crate::mail::{MailReport, Mailer, ZipAttachment, build_message};
use crate::report::{ReportContext, ReportRenderer, build_zip, local_hostname};
use crate::runner::{CommandResult, run_commands};
use crate::shared::format_braces;

/// Load config, run the commands, render the report and deliver it.
pub async fn execute(args: RunArgs, output: Output) -> Result<()> {
    output.section("Server status report");

    let config = config::load(&args.config_file)?;
    output.field("Config:", &args.config_file.display().to_string(), false);

    let renderer =
        ReportRenderer::from_files(&args.body_template, args.attachment_template.as_deref())?;
    if !renderer.has_attachment_template() {
        output.verbose("No attachment template, the email will have no zip attachment");
    }

    let results = run_all(&config.commands, args.num_parallel_commands, output).await?;
    summarize(&results, output);

    let now = Local::now();
    let host = local_hostname()?;
    let args_value = serde_json::to_value(&args).context("Failed to serialize arguments")?;
    let context = ReportContext::new(host, now, results, args_value, config.clone());
    let global = context.to_value()?;

    info!("Generating email body");
    let html_body = renderer.render_body(&context)?;

    let attachment = if renderer.has_attachment_template() {
        info!("Generating attachment");
        let files = renderer.render_attachments(&context)?;
        let name_context = context.archive_name_value(&global)?;
        let file_name = format_braces(&config.attachment.file_name, &name_context)
            .context("Failed to build attachment file name")?;
        Some((file_name, files))
    } else {
        None
    };

    let subject = format_braces(&config.subject, &global).context("Failed to build subject")?;

    if args.dry_run {
        print_preview(&config, &subject, &html_body, attachment.as_ref(), output);
    }

    let attachment = attachment
        .map(|(file_name, files)| -> Result<ZipAttachment> {
            Ok(ZipAttachment {
                data: build_zip(&files)?,
                file_name,
            })
        })
        .transpose()?;

    let message = build_message(
        &config,
        MailReport {
            subject,
            html_body,
            attachment,
        },
    )?;

    if args.dry_run {
        output.success("Dry run: email not sent");
        return Ok(());
    }

    output.stage(&format!("Sending report via {}", config.smtp.server));
    Mailer::new(config.smtp.clone()).send(message).await?;
    output.success(&format!("Report sent to {}", config.to.join(", ")));

    Ok(())
}

async fn run_all(
    specs: &[config::CommandSpec],
    workers: usize,
    output: Output,
) -> Result<Vec<CommandResult>> {
    output.stage(&format!(
        "Running {} commands ({} at a time)",
        specs.len(),
        workers
    ));

    let specs = specs.to_vec();
    tokio::task::spawn_blocking(move || {
        run_commands(
            specs,
            workers,
            Some(|finished: usize, total: usize| output.commands_progress(finished, total)),
        )
    })
    .await
    .context("Command execution task failed")?
}

fn summarize(results: &[CommandResult], output: Output) {
    for result in results {
        let elapsed = (result.end_time - result.start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let status = match result.returncode {
            Some(code) => format!("exit {code} in {elapsed:.2}s"),
            None => "no command".to_string(),
        };
        output.command_outcome(&result.label, &status, result.succeeded());
    }

    let failed = results.iter().filter(|r| !r.succeeded()).count();
    if failed > 0 {
        output.warning(&format!(
            "{failed} of {} commands did not succeed; see the report for details",
            results.len()
        ));
    }
}

fn print_preview(
    config: &config::Config,
    subject: &str,
    html_body: &str,
    attachment: Option<&(String, Vec<crate::report::RenderedAttachment>)>,
    output: Output,
) {
    output.section("Email preview");
    output.field("From:", &config.from, false);
    output.field("To:", &config.to.join(", "), false);
    output.field("Subject:", subject, true);
    if let Some((file_name, files)) = attachment {
        output.field("Attachment:", file_name, false);
        for file in files {
            output.archive_entry(&file.file_name);
        }
    }
    output.blank_line();

    // Printed even in quiet mode
    println!("{html_body}");
}
