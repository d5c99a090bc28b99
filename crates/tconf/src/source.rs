//! template documents
//!
//! A template is found in one of these places
//! - inline content (text with a declared format, or an in-memory [Value])
//! - an explicit path, relative to the work directory
//! - `<cwd>/.config/<stage>.<module>.<ext>` or `<cwd>/.config/<stage>.<module>.template.<ext>`
//!   where `<ext>` is tried in [SEARCH_EXTENSIONS] order
use crate::context::{resolve_stage, Context, ResolvePolicy};
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::format::{parse_document, Format, SEARCH_EXTENSIONS};
use crate::value::Value;
use crate::walker::resolve_tree;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Module name used when a template request names none
pub const DEFAULT_MODULE: &str = "local";

/// Directory holding stage/module files
pub const CONFIG_DIR: &str = ".config";

#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    Document(Value),
}

/// Where to find a template and how to resolve it
#[derive(Debug, Clone, Default)]
pub struct TemplateRequest {
    pub stage: Option<String>,
    pub cwd: Option<PathBuf>,
    pub module: Option<String>,
    pub path: Option<PathBuf>,
    pub format: Option<Format>,
    pub content: Option<Content>,
    /// dotted path of the sub-tree to return
    pub property: Option<String>,
    pub context: Context,
    pub resolve: ResolvePolicy,
    /// a missing file resolves to nothing instead of failing
    pub ignore_empty: bool,
}

/// A parsed, not yet resolved, template
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTemplate {
    pub tree: Value,
    pub path: Option<PathBuf>,
    pub stage: String,
}

/// Work directory, the current one when `cwd` is not given
pub fn work_dir(cwd: Option<&Path>) -> Result<PathBuf> {
    match cwd {
        Some(cwd) => Ok(cwd.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

/// `<cwd>/.config/<stage>.<module>`, without extension
pub fn stage_module_base(cwd: &Path, stage: &str, module: &str) -> PathBuf {
    cwd.join(CONFIG_DIR).join(format!("{stage}.{module}"))
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// First existing `<base>.<ext>` or `<base>.template.<ext>`
fn locate(base: &Path, extensions: &[&str]) -> Option<PathBuf> {
    extensions.iter().find_map(|ext| {
        [format!(".{ext}"), format!(".template.{ext}")]
            .into_iter()
            .map(|suffix| with_suffix(base, &suffix))
            .find(|candidate| candidate.is_file())
    })
}

/// Find and parse the requested template
///
/// Returns `None` for a missing file when [TemplateRequest::ignore_empty] is set.
pub fn load_template(request: &TemplateRequest, environment: &dyn Environment) -> Result<Option<LoadedTemplate>> {
    let stage = resolve_stage(request.stage.as_deref(), environment);

    if let Some(content) = &request.content {
        let tree = match content {
            Content::Document(tree) => tree.clone(),
            Content::Text(text) => {
                let format = request.format.ok_or(Error::MissingFormat)?;
                parse_document(text, format)?
            }
        };
        return Ok(Some(LoadedTemplate {
            tree,
            path: None,
            stage,
        }));
    }

    let cwd = work_dir(request.cwd.as_deref())?;
    let path = match &request.path {
        Some(path) => cwd.join(path),
        None => {
            let module = request.module.as_deref().unwrap_or(DEFAULT_MODULE);
            let base = stage_module_base(&cwd, &stage, module);
            let extensions = request
                .format
                .map(|format| format.extensions())
                .unwrap_or(&SEARCH_EXTENSIONS);

            locate(&base, extensions)
                .unwrap_or_else(|| with_suffix(&base, &format!(".{}", extensions[0])))
        }
    };

    if !path.is_file() {
        if request.ignore_empty {
            tracing::debug!(path=%path.display(), "template not found, ignored");
            return Ok(None);
        }
        return Err(Error::ConfigNotFound(path));
    }

    tracing::info!(path=%path.display(), "loading template");
    let content = std::fs::read_to_string(&path)?;
    let format = match request.format {
        Some(format) => format,
        None => Format::detect(&path)?,
    };

    Ok(Some(LoadedTemplate {
        tree: parse_document(&content, format)?,
        path: Some(path),
        stage,
    }))
}

impl TemplateRequest {
    /// Context for this request's pass: the request context plus stage and policy
    fn pass_context(&self, stage: &str) -> Context {
        Context {
            stage: Some(stage.to_string()),
            resolve: self.resolve,
            ..self.context.clone()
        }
    }
}

/// Load and resolve a template
pub async fn resolve_template(request: &TemplateRequest, evaluator: &Evaluator) -> Result<Option<Value>> {
    let Some(loaded) = load_template(request, evaluator.environment())? else {
        return Ok(None);
    };

    let context = request.pass_context(&loaded.stage);
    let path = loaded
        .path
        .as_ref()
        .map(|path| format!("{}>", path.display()))
        .unwrap_or_default();

    resolve_tree(
        evaluator,
        &loaded.tree,
        &context,
        request.property.as_deref(),
        &path,
    )
    .await
}

/// [resolve_template] without waiting on I/O
pub fn resolve_template_blocking(request: &TemplateRequest, evaluator: &Evaluator) -> Result<Option<Value>> {
    let evaluator = evaluator.denied();
    futures::executor::block_on(resolve_template(request, &evaluator))
}
