//! document formats
//!
//! Input documents are json, yaml or dotenv. Output adds `env-json` (dotenv with json values).
use crate::dotenv::{generate_dotenv, parse_env, DotenvStyle};
use crate::value::Value;
use crate::{Error, Result};
use std::path::Path;

/// Extensions tried, in order, when looking for a file
pub const SEARCH_EXTENSIONS: [&str; 4] = ["json", "yml", "yaml", "env"];

/// Input format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Env,
}

impl Format {
    /// Format from the file extension, or `env` for `.env*` file names
    pub fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Ok(format) = extension.parse() {
            return Ok(format);
        }

        let is_dotenv = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(".env"));
        if is_dotenv {
            return Ok(Format::Env);
        }

        Err(Error::UnsupportedFormat(extension))
    }

    /// File extensions of this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Json => &["json"],
            Format::Yaml => &["yml", "yaml"],
            Format::Env => &["env"],
        }
    }
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Format::Json),
            "yml" | "yaml" => Ok(Format::Yaml),
            "env" => Ok(Format::Env),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parse document text
pub fn parse_document(content: &str, format: Format) -> Result<Value> {
    Ok(match format {
        Format::Json => serde_json::from_str(content)?,
        Format::Yaml => serde_yaml::from_str(content)?,
        Format::Env => Value::Object(parse_env(content)),
    })
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// pretty printed, 2-space indent
    #[default]
    Json,
    Yaml,
    /// dotenv, nested keys joined with `__`
    Env,
    /// dotenv, nested values as json
    EnvJson,
}

impl OutputFormat {
    /// Format for a destination file
    pub fn detect(path: &Path) -> Result<Self> {
        Ok(Format::detect(path)?.into())
    }
}

impl From<Format> for OutputFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml,
            Format::Env => OutputFormat::Env,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "yml" | "yaml" => Ok(OutputFormat::Yaml),
            "env" | "__" => Ok(OutputFormat::Env),
            "env-json" => Ok(OutputFormat::EnvJson),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
            OutputFormat::Env => f.write_str("env"),
            OutputFormat::EnvJson => f.write_str("env-json"),
        }
    }
}

/// Render a resolved tree
///
/// A missing tree renders as empty text, a string tree renders as the raw string.
pub fn render(tree: Option<&Value>, format: OutputFormat, prefix: Option<&str>) -> Result<String> {
    let Some(tree) = tree else {
        return Ok(String::new());
    };

    if let Value::String(raw) = tree {
        return Ok(raw.clone());
    }

    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(tree)?,
        OutputFormat::Yaml => serde_yaml::to_string(tree)?,
        OutputFormat::Env => generate_dotenv(tree, DotenvStyle::Underscore, prefix),
        OutputFormat::EnvJson => generate_dotenv(tree, DotenvStyle::Json, prefix),
    })
}
