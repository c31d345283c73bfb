use std::path::Path;

use figment::providers::{Format, Json, Toml, Yaml};
use tracing::debug;

/// Pick the figment provider for a config file from its extension.
///
/// Unknown extensions fall back to sniffing the content; YAML is the
/// default since that is what the tool ships with.
pub fn auto<P: AsRef<Path>>(path: P) -> impl figment::Provider {
    let path = path.as_ref();
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension.to_lowercase().as_str() {
        "toml" => SmartProvider::Toml(Toml::file(path)),
        "json" => SmartProvider::Json(Json::file(path)),
        "yaml" | "yml" => SmartProvider::Yaml(Yaml::file(path)),
        _ => {
            let detected = std::fs::read_to_string(path)
                .ok()
                .and_then(|content| detect_format_from_content(&content));
            debug!(
                "Config format for {} detected as {:?}",
                path.display(),
                detected.unwrap_or(DetectedFormat::Yaml)
            );
            match detected {
                Some(DetectedFormat::Json) => SmartProvider::Json(Json::file(path)),
                Some(DetectedFormat::Toml) => SmartProvider::Toml(Toml::file(path)),
                Some(DetectedFormat::Yaml) | None => SmartProvider::Yaml(Yaml::file(path)),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectedFormat {
    Json,
    Yaml,
    Toml,
}

/// Wrapper enum to handle different provider types
enum SmartProvider {
    Toml(figment::providers::Data<Toml>),
    Json(figment::providers::Data<Json>),
    Yaml(figment::providers::Data<Yaml>),
}

impl figment::Provider for SmartProvider {
    fn metadata(&self) -> figment::Metadata {
        match self {
            SmartProvider::Toml(p) => p.metadata(),
            SmartProvider::Json(p) => p.metadata(),
            SmartProvider::Yaml(p) => p.metadata(),
        }
    }

    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        match self {
            SmartProvider::Toml(p) => p.data(),
            SmartProvider::Json(p) => p.data(),
            SmartProvider::Yaml(p) => p.data(),
        }
    }
}

fn detect_format_from_content(content: &str) -> Option<DetectedFormat> {
    let trimmed = content.trim();

    if (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        return Some(DetectedFormat::Json);
    }

    // TOML tables or `key = value` lines
    if trimmed.lines().any(|line| {
        let line = line.trim();
        (line.starts_with('[') && line.ends_with(']') && !line.contains(':'))
            || (line.contains('=') && !line.contains(':'))
    }) {
        return Some(DetectedFormat::Toml);
    }

    if trimmed.contains("---") || trimmed.lines().any(|line| line.contains(':')) {
        return Some(DetectedFormat::Yaml);
    }

    None
}
