//! Report delivery over SMTP
//!
//! Builds a `multipart/mixed` message (HTML body plus an optional zip
//! attachment) and sends it through `lettre`'s async SMTP transport.

use anyhow::{Context, Result, anyhow};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::{Config, SmtpConfig};

/// Default port for plain SMTP and STARTTLS
pub const SMTP_PORT: u16 = 25;
/// Default port for SMTP over implicit TLS
pub const SUBMISSIONS_PORT: u16 = 465;

/// Rendered report ready to be wrapped into an email
#[derive(Debug, Clone)]
pub struct MailReport {
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<ZipAttachment>,
}

#[derive(Debug, Clone)]
pub struct ZipAttachment {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSecurity {
    /// TLS from the first byte
    ImplicitTls,
    /// Plaintext upgraded with STARTTLS before authenticating
    StartTls,
    Plain,
}

impl ConnectionSecurity {
    pub fn from_config(smtp: &SmtpConfig) -> Self {
        if smtp.ssl {
            ConnectionSecurity::ImplicitTls
        } else if smtp.tls {
            ConnectionSecurity::StartTls
        } else {
            ConnectionSecurity::Plain
        }
    }
}

/// Port to connect to; 0 selects the protocol default
pub fn resolve_port(smtp: &SmtpConfig) -> u16 {
    match (smtp.port, ConnectionSecurity::from_config(smtp)) {
        (0, ConnectionSecurity::ImplicitTls) => SUBMISSIONS_PORT,
        (0, _) => SMTP_PORT,
        (port, _) => port,
    }
}

/// Assemble the email for `report`, addressed per `config`.
pub fn build_message(config: &Config, report: MailReport) -> Result<Message> {
    let from: Mailbox = config
        .from
        .parse()
        .with_context(|| format!("Invalid 'from' address: {}", config.from))?;

    let mut builder = Message::builder().from(from).subject(report.subject);
    for recipient in &config.to {
        let mailbox: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid 'to' address: {recipient}"))?;
        builder = builder.to(mailbox);
    }

    let mut parts = MultiPart::mixed().singlepart(SinglePart::html(report.html_body));
    if let Some(attachment) = report.attachment {
        let content_type = ContentType::parse("application/zip")
            .map_err(|e| anyhow!("Invalid attachment content type: {e}"))?;
        parts = parts.singlepart(
            Attachment::new(attachment.file_name).body(attachment.data, content_type),
        );
    }

    builder
        .multipart(parts)
        .context("Failed to assemble email message")
}

/// Sends messages through the configured SMTP server
pub struct Mailer {
    smtp: SmtpConfig,
}

impl Mailer {
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let server = self.smtp.server.as_str();
        let port = resolve_port(&self.smtp);

        let tls = match ConnectionSecurity::from_config(&self.smtp) {
            ConnectionSecurity::ImplicitTls => {
                info!("Connecting via SSL");
                Tls::Wrapper(tls_parameters(server)?)
            }
            ConnectionSecurity::StartTls => {
                info!("Enabling TLS");
                Tls::Required(tls_parameters(server)?)
            }
            ConnectionSecurity::Plain => Tls::None,
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
            .port(port)
            .tls(tls);

        if self.smtp.login {
            let (Some(user), Some(password)) = (&self.smtp.user, &self.smtp.password) else {
                return Err(anyhow!("SMTP login requires both 'user' and 'password'"));
            };
            info!("Logging in to {} as {}", server, user);
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// Deliver `message`. Connection, TLS, authentication and delivery
    /// failures are all returned as errors; nothing is retried.
    pub async fn send(&self, message: Message) -> Result<()> {
        let recipients = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "Sending email to {} via {} on port {}",
            recipients,
            self.smtp.server,
            resolve_port(&self.smtp)
        );

        let transport = self.transport()?;
        info!("Transferring message");
        transport.send(message).await.with_context(|| {
            format!(
                "Failed to send email via {}:{}",
                self.smtp.server,
                resolve_port(&self.smtp)
            )
        })?;

        Ok(())
    }
}

fn tls_parameters(server: &str) -> Result<TlsParameters> {
    TlsParameters::new(server.to_string())
        .with_context(|| format!("Failed to set up TLS for {server}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::config;

    fn smtp(port: u16, ssl: bool, tls: bool) -> SmtpConfig {
        SmtpConfig {
            server: "localhost".to_string(),
            port,
            ssl,
            tls,
            login: false,
            user: None,
            password: None,
        }
    }

    fn report(attachment: Option<ZipAttachment>) -> MailReport {
        MailReport {
            subject: "Server status for web-01".to_string(),
            html_body: "<h1>web-01</h1>".to_string(),
            attachment,
        }
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(resolve_port(&smtp(0, false, false)), 25);
        assert_eq!(resolve_port(&smtp(0, false, true)), 25);
        assert_eq!(resolve_port(&smtp(0, true, false)), 465);
        assert_eq!(resolve_port(&smtp(2525, true, false)), 2525);
    }

    #[test]
    fn test_ssl_takes_precedence_over_starttls() {
        assert_eq!(
            ConnectionSecurity::from_config(&smtp(0, true, true)),
            ConnectionSecurity::ImplicitTls
        );
        assert_eq!(
            ConnectionSecurity::from_config(&smtp(0, false, true)),
            ConnectionSecurity::StartTls
        );
        assert_eq!(
            ConnectionSecurity::from_config(&smtp(0, false, false)),
            ConnectionSecurity::Plain
        );
    }

    #[test]
    fn test_message_headers_and_parts() {
        let mut cfg = config(Vec::new());
        cfg.to.push("oncall@example.com".to_string());

        let message = build_message(
            &cfg,
            report(Some(ZipAttachment {
                file_name: "Server status for web-01.zip".to_string(),
                data: b"PK\x05\x06".to_vec(),
            })),
        )
        .unwrap();

        assert_eq!(message.envelope().to().len(), 2);
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(formatted.contains("From: status@example.com"));
        assert!(formatted.contains("ops@example.com, oncall@example.com"));
        assert!(formatted.contains("Subject: Server status for web-01"));
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("text/html"));
        assert!(formatted.contains("application/zip"));
        assert!(formatted.contains("Server status for web-01.zip"));
    }

    #[test]
    fn test_message_without_attachment() {
        let message = build_message(&config(Vec::new()), report(None)).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(formatted.contains("text/html"));
        assert!(!formatted.contains("application/zip"));
    }

    #[test]
    fn test_invalid_address_is_an_error() {
        let mut cfg = config(Vec::new());
        cfg.to = vec!["not an address".to_string()];
        let err = build_message(&cfg, report(None)).unwrap_err();
        assert!(err.to_string().contains("Invalid 'to' address"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        // Nothing listens on port 1
        let mailer = Mailer::new(smtp(1, false, false));
        let message = build_message(&config(Vec::new()), report(None)).unwrap();
        let err = mailer.send(message).await.unwrap_err();
        assert!(err.to_string().contains("Failed to send email via localhost:1"));
    }
}
