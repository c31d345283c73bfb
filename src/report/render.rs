use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior};
use tracing::{debug, info};

use super::ReportContext;
use crate::shared::format_braces;

const BODY_TEMPLATE: &str = "body";
const ATTACHMENT_TEMPLATE: &str = "attachment";

/// One rendered per-command attachment file
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAttachment {
    pub label: String,
    pub file_name: String,
    pub content: String,
}

/// Renders the email body and per-command attachment files.
///
/// Templates use Jinja syntax. Referencing an undefined variable is an
/// error rather than an empty string.
pub struct ReportRenderer {
    env: Environment<'static>,
    has_attachment: bool,
}

impl ReportRenderer {
    pub fn new(body_source: String, attachment_source: Option<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        env.add_template_owned(BODY_TEMPLATE, body_source)
            .context("Failed to parse body template")?;

        let has_attachment = attachment_source.is_some();
        if let Some(source) = attachment_source {
            env.add_template_owned(ATTACHMENT_TEMPLATE, source)
                .context("Failed to parse attachment template")?;
        }

        Ok(Self { env, has_attachment })
    }

    /// Load templates from disk
    pub fn from_files(body_path: &Path, attachment_path: Option<&Path>) -> Result<Self> {
        info!("Loading body template from {}", body_path.display());
        let body = std::fs::read_to_string(body_path)
            .with_context(|| format!("Failed to read body template: {}", body_path.display()))?;

        let attachment = attachment_path
            .map(|path| {
                info!("Loading attachment template from {}", path.display());
                std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read attachment template: {}", path.display())
                })
            })
            .transpose()?;

        Self::new(body, attachment)
    }

    pub fn has_attachment_template(&self) -> bool {
        self.has_attachment
    }

    /// Render the email body, trimmed
    pub fn render_body(&self, context: &ReportContext) -> Result<String> {
        let body = self
            .env
            .get_template(BODY_TEMPLATE)?
            .render(context)
            .context("Failed to render body template")?;
        debug!("Generated email body:\n{body}");
        Ok(body.trim().to_string())
    }

    /// Render the attachment template once per command, in command order.
    ///
    /// Each render sees the report context overlaid with that command's
    /// fields. File names come from `attachment.command_result_file_name`
    /// evaluated against the same context. Returns nothing when no
    /// attachment template was configured.
    pub fn render_attachments(&self, context: &ReportContext) -> Result<Vec<RenderedAttachment>> {
        if !self.has_attachment {
            return Ok(Vec::new());
        }

        let template = self.env.get_template(ATTACHMENT_TEMPLATE)?;
        let global = context.to_value()?;
        let name_template = &context.config.attachment.command_result_file_name;

        context
            .command_results
            .iter()
            .map(|report| -> Result<RenderedAttachment> {
                let label = &report.result.label;
                let command_context = ReportContext::command_value(&global, report)?;

                let file_name = format_braces(name_template, &command_context).with_context(|| {
                    format!("Failed to build attachment file name for command '{label}'")
                })?;
                let content = template.render(&command_context).with_context(|| {
                    format!("Failed to render attachment template for command '{label}'")
                })?;
                debug!("Rendered attachment {file_name} for {label}");

                Ok(RenderedAttachment {
                    label: label.clone(),
                    file_name,
                    content: content.trim().to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::*;
    use std::fs;
    use tempfile::TempDir;

    const BODY: &str = r#"
<h1>{{ host }}</h1>
{% for r in command_results %}<h2>{{ r.label }}</h2>
<p>exit={{ r.returncode }} in {{ r.execution_time_seconds }}s</p><pre>{{ r.stdout }}</pre>
{% endfor %}
<p>{{ attachment_only_command_results | length }} in attachment only</p>
"#;

    const ATTACHMENT: &str = "{{ label }} @ {{ host }}\n$ {{ command }}\n{{ stdout }}\n";

    fn sample_context() -> ReportContext {
        context(vec![
            result("Uptime", "up 3 days", Some(0), false),
            result("Processes", "1 init", Some(0), true),
        ])
    }

    #[test]
    fn test_render_body() {
        let renderer = ReportRenderer::new(BODY.to_string(), None).unwrap();
        let body = renderer.render_body(&sample_context()).unwrap();

        assert!(body.starts_with("<h1>web-01</h1>"));
        assert!(body.contains("<h2>Uptime</h2>\n<p>exit=0 in 2.0s</p><pre>up 3 days</pre>"));
        assert!(body.contains("<h2>Processes</h2>"));
        assert!(body.ends_with("<p>1 in attachment only</p>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer =
            ReportRenderer::new(BODY.to_string(), Some(ATTACHMENT.to_string())).unwrap();
        let ctx = sample_context();

        assert_eq!(renderer.render_body(&ctx).unwrap(), renderer.render_body(&ctx).unwrap());
        assert_eq!(
            renderer.render_attachments(&ctx).unwrap(),
            renderer.render_attachments(&ctx).unwrap()
        );
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let renderer = ReportRenderer::new("{{ no_such_field }}".to_string(), None).unwrap();
        assert!(renderer.render_body(&sample_context()).is_err());

        let renderer =
            ReportRenderer::new("ok".to_string(), Some("{{ stdout }} {{ nope }}".to_string()))
                .unwrap();
        assert!(renderer.render_attachments(&sample_context()).is_err());
    }

    #[test]
    fn test_syntax_error_is_reported_at_load() {
        assert!(ReportRenderer::new("{% for %}".to_string(), None).is_err());
    }

    #[test]
    fn test_render_attachments() {
        let renderer = ReportRenderer::new(BODY.to_string(), Some(ATTACHMENT.to_string())).unwrap();
        let attachments = renderer.render_attachments(&sample_context()).unwrap();

        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].file_name, "uptime.txt");
        assert_eq!(attachments[0].content, "Uptime @ web-01\n$ echo Uptime\nup 3 days");
        assert_eq!(attachments[1].label, "Processes");
        assert_eq!(attachments[1].file_name, "processes.txt");
    }

    #[test]
    fn test_attachment_sees_command_result_record() {
        let renderer = ReportRenderer::new(
            "ok".to_string(),
            Some("{{ command_result.label_slug }}/{{ config.from }}".to_string()),
        )
        .unwrap();
        let attachments = renderer.render_attachments(&sample_context()).unwrap();
        assert_eq!(attachments[0].content, "uptime/status@example.com");
    }

    #[test]
    fn test_unknown_field_in_file_name_is_an_error() {
        let renderer = ReportRenderer::new("ok".to_string(), Some("x".to_string())).unwrap();
        let mut ctx = sample_context();
        ctx.config.attachment.command_result_file_name = "{missing}.txt".to_string();

        let err = renderer.render_attachments(&ctx).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown field 'missing'"));
    }

    #[test]
    fn test_no_attachment_template() {
        let renderer = ReportRenderer::new("ok".to_string(), None).unwrap();
        assert!(!renderer.has_attachment_template());
        assert!(renderer.render_attachments(&sample_context()).unwrap().is_empty());
    }

    #[test]
    fn test_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let body = temp_dir.path().join("body.html");
        let attachment = temp_dir.path().join("attachment.txt");
        fs::write(&body, "<p>{{ host }}</p>\n").unwrap();
        fs::write(&attachment, "{{ label }}").unwrap();

        let renderer = ReportRenderer::from_files(&body, Some(&attachment)).unwrap();
        assert!(renderer.has_attachment_template());
        assert_eq!(renderer.render_body(&sample_context()).unwrap(), "<p>web-01</p>");

        let missing = temp_dir.path().join("missing.html");
        assert!(ReportRenderer::from_files(&missing, None).is_err());
    }
}
