//! writing resolved trees to disk
use crate::format::{parse_document, render, Format, OutputFormat};
use crate::merge::deep_merge;
use crate::source::{work_dir, CONFIG_DIR};
use crate::value::Value;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Where a config item wants its tree written
#[derive(Debug, Clone, PartialEq)]
pub struct Destination<'a> {
    pub cwd: &'a Path,
    pub path: &'a str,
    pub format: Option<&'a str>,
}

impl Destination<'_> {
    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.format {
            Some(format) => format.parse(),
            None => OutputFormat::detect(Path::new(self.path)),
        }
    }

    pub fn resolved_path(&self) -> PathBuf {
        self.cwd.join(self.path)
    }
}

/// Receives composed trees in apply mode
pub trait ConfigWriter: Send + Sync {
    fn write(&self, tree: &Value, destination: &Destination) -> Result<()>;
}

/// Renders into the destination file, creating parent directories
#[derive(Debug, Default, Clone, Copy)]
pub struct FileWriter;

impl ConfigWriter for FileWriter {
    fn write(&self, tree: &Value, destination: &Destination) -> Result<()> {
        let format = destination.output_format()?;
        let content = render(Some(tree), format, None)?;
        let path = destination.resolved_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path=%path.display(), %format, "writing config");
        std::fs::write(&path, content)?;
        Ok(())
    }
}

/// Where `set` writes
#[derive(Debug, Clone, Default)]
pub struct SetRequest {
    pub stage: Option<String>,
    pub cwd: Option<PathBuf>,
    pub module: Option<String>,
    pub path: Option<PathBuf>,
    pub format: Option<String>,
    /// overwrite the file instead of merging into it
    pub replace: bool,
}

/// Write `data` into a yaml template
///
/// The target is `path`, or `.config/<stage>.<module>.<format>` (format defaults to `yml`).
/// An existing file is deep-merged with `data` unless [SetRequest::replace] is set.
pub fn set_template(request: &SetRequest, data: Value) -> Result<PathBuf> {
    let format = request.format.as_deref().unwrap_or("yml");
    if format.parse::<Format>()? != Format::Yaml {
        return Err(Error::UnsupportedFormat(format!("{format}, only yaml can be written")));
    }

    let cwd = work_dir(request.cwd.as_deref())?;
    let path = match &request.path {
        Some(path) => cwd.join(path),
        None => {
            let name: Vec<&str> = [request.stage.as_deref(), request.module.as_deref()]
                .into_iter()
                .flatten()
                .filter(|part| !part.is_empty())
                .collect();
            if name.is_empty() {
                return Err(Error::MissingStageOrModule);
            }
            cwd.join(CONFIG_DIR).join(format!("{}.{format}", name.join(".")))
        }
    };

    let tree = if path.is_file() && !request.replace {
        let existing = parse_document(&std::fs::read_to_string(&path)?, Format::Yaml)?;
        deep_merge(existing, data)
    } else {
        data
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path=%path.display(), "writing template");
    std::fs::write(&path, render(Some(&tree), OutputFormat::Yaml, None)?)?;
    Ok(path)
}
