//! Configuration management for statusmail
//!
//! The config file is read into a loosely-typed [`RawConfig`] (every field
//! optional), then [`validate`] checks the required fields and fills in the
//! defaults, producing an immutable [`Config`] that the rest of the run
//! only reads.

use anyhow::{Result, bail};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Deserializer, Serialize};

use crate::shared::slugify;

pub mod core;
pub mod smart_load;

pub use self::core::{ENV_PREFIX, load, load_raw};

pub const DEFAULT_SMTP_SERVER: &str = "localhost";
pub const DEFAULT_SUBJECT: &str = "Server status for {host}";
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%c";
pub const DEFAULT_ATTACHMENT_FILE_NAME: &str = "Server status for {host} [{now_str}].zip";
pub const DEFAULT_COMMAND_RESULT_FILE_NAME: &str = "{label_slug}.txt";

/// Validated configuration, fully defaulted
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Config {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub date_time_format: String,
    pub smtp: SmtpConfig,
    pub attachment: AttachmentConfig,
    pub commands: Vec<CommandSpec>,
}

/// SMTP connection settings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SmtpConfig {
    pub server: String,
    /// 0 selects the protocol default port
    pub port: u16,
    /// Implicit TLS from the first byte
    pub ssl: bool,
    /// STARTTLS upgrade of a plaintext connection
    pub tls: bool,
    pub login: bool,
    pub user: Option<String>,
    /// Never serialized, so it stays out of logs and templates
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// File-name templates for the zip attachment and its entries
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttachmentConfig {
    pub file_name: String,
    pub command_result_file_name: String,
}

/// One command to run and report on
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandSpec {
    pub label: String,
    /// Shell invocation; may be empty, the runner reports that case
    pub command: String,
    pub attachment_only: bool,
    pub label_slug: String,
}

/// Config as read from disk, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub from: Option<String>,
    pub to: Option<Vec<String>>,
    pub subject: Option<String>,
    pub date_time_format: Option<String>,
    #[serde(default)]
    pub smtp: RawSmtpConfig,
    #[serde(default)]
    pub attachment: RawAttachmentConfig,
    pub commands: Option<Vec<RawCommand>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSmtpConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    pub tls: Option<bool>,
    pub login: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttachmentConfig {
    pub file_name: Option<String>,
    pub command_result_file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommand {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub label: Option<String>,
    /// Outer `None`: key absent. `Some(None)`: key present but null.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub command: Option<Option<String>>,
    pub attachment_only: Option<bool>,
    pub label_slug: Option<String>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Scalars that should be read as text even when they look like numbers.
///
/// Environment overrides and unquoted YAML turn `123456` into an integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextScalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<TextScalar> for String {
    fn from(scalar: TextScalar) -> Self {
        match scalar {
            TextScalar::Text(text) => text,
            TextScalar::Unsigned(n) => n.to_string(),
            TextScalar::Signed(n) => n.to_string(),
            TextScalar::Float(n) => n.to_string(),
            TextScalar::Bool(b) => b.to_string(),
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<TextScalar>::deserialize(deserializer).map(|scalar| scalar.map(String::from))
}

/// Check required fields and apply defaults.
///
/// Pure: the raw config is consumed and a new [`Config`] returned.
pub fn validate(raw: RawConfig) -> Result<Config> {
    let smtp = validate_smtp(raw.smtp)?;

    let Some(from) = raw.from else {
        bail!("Missing 'from' attribute");
    };
    let to = match raw.to {
        Some(to) if !to.is_empty() => to,
        _ => bail!("Missing or empty 'to' attribute"),
    };

    let date_time_format = raw
        .date_time_format
        .unwrap_or_else(|| DEFAULT_DATE_TIME_FORMAT.to_string());
    if StrftimeItems::new(&date_time_format).any(|item| matches!(item, Item::Error)) {
        bail!("Invalid 'date_time_format' pattern: {date_time_format:?}");
    }

    let attachment = AttachmentConfig {
        file_name: raw
            .attachment
            .file_name
            .unwrap_or_else(|| DEFAULT_ATTACHMENT_FILE_NAME.to_string()),
        command_result_file_name: raw
            .attachment
            .command_result_file_name
            .unwrap_or_else(|| DEFAULT_COMMAND_RESULT_FILE_NAME.to_string()),
    };

    let Some(raw_commands) = raw.commands else {
        bail!("Missing 'commands' attribute");
    };
    let commands = raw_commands
        .into_iter()
        .enumerate()
        .map(|(index, command)| validate_command(index, command))
        .collect::<Result<Vec<_>>>()?;

    Ok(Config {
        from,
        to,
        subject: raw.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        date_time_format,
        smtp,
        attachment,
        commands,
    })
}

fn validate_smtp(raw: RawSmtpConfig) -> Result<SmtpConfig> {
    let login = raw.login.unwrap_or(false);
    if login {
        if raw.user.is_none() {
            bail!("'user' attribute must be specified if SMTP requires login");
        }
        if raw.password.is_none() {
            bail!("'password' attribute must be specified if SMTP requires login");
        }
    }

    Ok(SmtpConfig {
        server: raw.server.unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
        port: raw.port.unwrap_or(0),
        ssl: raw.ssl.unwrap_or(false),
        tls: raw.tls.unwrap_or(false),
        login,
        user: raw.user,
        password: raw.password,
    })
}

fn validate_command(index: usize, raw: RawCommand) -> Result<CommandSpec> {
    let Some(label) = raw.label else {
        bail!("Command {index} missing 'label' attribute");
    };
    let Some(command) = raw.command else {
        bail!("Command {index} missing 'command' attribute");
    };

    let label_slug = raw.label_slug.unwrap_or_else(|| slugify(&label));
    Ok(CommandSpec {
        command: command.unwrap_or_default(),
        attachment_only: raw.attachment_only.unwrap_or(false),
        label_slug,
        label,
    })
}
