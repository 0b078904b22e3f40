//! Output formatting

use serde::Serialize;

use crate::error::CliResult;

/// Output format for structured command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per item
    #[default]
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Render `data` as JSON or YAML; `None` for text, which callers format themselves.
pub fn render<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<Option<String>> {
    Ok(match format {
        OutputFormat::Text => None,
        OutputFormat::Json => Some(serde_json::to_string_pretty(data)?),
        OutputFormat::Yaml => Some(serde_yaml::to_string(data)?),
    })
}
