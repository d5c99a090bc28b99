//! config item definitions
//!
//! A config file holds a `configs` key with either a list of items or a single item, which is
//! named `default`:
//!
//! ```yaml
//! configs:
//!   - name: api
//!     destination: .env
//!     values:
//!       - name: "@"
//!         templateModule: api
//!       - name: db.password
//!         valueFrom: env:DB_PASSWORD
//! ```
use crate::context::{resolve_stage, Context, ResolvePolicy};
use crate::environment::Environment;
use crate::format::{parse_document, Format};
use crate::source::{stage_module_base, work_dir};
use crate::value::Value;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Module name used when a config request names none
pub const DEFAULT_MODULE: &str = "config";

/// Name given to an item that has none
pub const DEFAULT_NAME: &str = "default";

const CONFIG_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub destination_format: Option<String>,
    pub values: Vec<ConfigValue>,
    #[serde(default)]
    pub context: Option<Context>,
}

impl ConfigItem {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }
}

/// One assignment of an item: where (`name`) and where from
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigValue {
    pub name: String,
    #[serde(default)]
    pub value_from: Option<String>,
    #[serde(default)]
    pub object_from: Option<String>,
    #[serde(default)]
    pub template_module: Option<String>,
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    /// policy for template sources
    #[serde(default)]
    pub resolve: Option<ResolvePolicy>,
    #[serde(default)]
    pub ignore_empty: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueSource<'a> {
    Constant(&'a Value),
    Literal(&'a str),
    Object(&'a str),
    Template {
        module: Option<&'a str>,
        path: Option<&'a str>,
    },
}

impl ConfigValue {
    /// The single source of this value
    pub fn source(&self) -> Result<ValueSource<'_>> {
        let template = (self.template_module.is_some() || self.template_path.is_some()).then_some(
            ValueSource::Template {
                module: self.template_module.as_deref(),
                path: self.template_path.as_deref(),
            },
        );

        let sources: Vec<ValueSource> = [
            self.value.as_ref().map(ValueSource::Constant),
            self.value_from.as_deref().map(ValueSource::Literal),
            self.object_from.as_deref().map(ValueSource::Object),
            template,
        ]
        .into_iter()
        .flatten()
        .collect();

        match sources.as_slice() {
            [source] => Ok(*source),
            [] => Err(Error::InvalidConfigSchema {
                origin: format!("value '{}'", self.name),
                reason: "one of value, valueFrom, objectFrom, templateModule or templatePath is required"
                    .to_string(),
            }),
            _ => Err(Error::InvalidConfigSchema {
                origin: format!("value '{}'", self.name),
                reason: "only one of value, valueFrom, objectFrom, templateModule or templatePath is allowed"
                    .to_string(),
            }),
        }
    }
}

/// Item list, a single item is accepted as the `default` item
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
enum RawItems {
    List(Vec<ConfigItem>),
    Single(ConfigItem),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigItems(pub Vec<ConfigItem>);

impl ConfigItems {
    /// Read items from a parsed document (the content of the `configs` key)
    pub fn from_value(value: Value, origin: &str) -> Result<Self> {
        let raw: RawItems =
            serde_json::from_value(serde_json::to_value(&value)?).map_err(|err| Error::InvalidConfigSchema {
                origin: origin.to_string(),
                reason: err.to_string(),
            })?;

        let items = match raw {
            RawItems::List(items) => items,
            RawItems::Single(item) => vec![ConfigItem {
                name: Some(item.name.unwrap_or_else(|| DEFAULT_NAME.to_string())),
                ..item
            }],
        };

        for value in items.iter().flat_map(|item| &item.values) {
            value.source().map_err(|err| match err {
                Error::InvalidConfigSchema { origin: what, reason } => Error::InvalidConfigSchema {
                    origin: format!("{origin}, {what}"),
                    reason,
                },
                err => err,
            })?;
        }

        Ok(Self(items))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigItem> {
        self.0.iter()
    }
}

/// Where config items come from
#[derive(Debug, Clone, Default)]
pub struct ConfigRequest {
    pub stage: Option<String>,
    pub cwd: Option<PathBuf>,
    pub module: Option<String>,
    pub path: Option<PathBuf>,
    /// in-memory definitions, no file is read
    pub items: Option<ConfigItems>,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub items: ConfigItems,
    pub stage: String,
    pub module: String,
    pub cwd: PathBuf,
}

fn config_path(cwd: &Path, request: &ConfigRequest, stage: &str, module: &str) -> PathBuf {
    let base = match &request.path {
        Some(path) if path.extension().is_some() => return cwd.join(path),
        Some(path) => cwd.join(path),
        None => stage_module_base(cwd, stage, module),
    };

    CONFIG_EXTENSIONS
        .iter()
        .map(|ext| {
            let mut path = base.as_os_str().to_owned();
            path.push(format!(".{ext}"));
            PathBuf::from(path)
        })
        .find(|candidate| candidate.is_file())
        .unwrap_or(base)
}

/// Read the item definitions for a stage/module
pub fn load_config_items(request: &ConfigRequest, environment: &dyn Environment) -> Result<LoadedConfig> {
    let cwd = work_dir(request.cwd.as_deref())?;
    let stage = resolve_stage(request.stage.as_deref(), environment);
    let module = request
        .module
        .clone()
        .filter(|module| !module.is_empty())
        .unwrap_or_else(|| DEFAULT_MODULE.to_string());

    if let Some(items) = &request.items {
        return Ok(LoadedConfig {
            items: items.clone(),
            stage,
            module,
            cwd,
        });
    }

    let path = config_path(&cwd, request, &stage, &module);
    if !path.is_file() {
        return Err(Error::ConfigNotFound(path));
    }

    tracing::info!(path=%path.display(), "loading config items");
    let format = Format::detect(&path)?;
    if format == Format::Env {
        return Err(Error::UnsupportedFormat("env".to_string()));
    }

    let origin = format!("file {}", path.display());
    let document = parse_document(&std::fs::read_to_string(&path)?, format)?;
    let configs = match document {
        Value::Object(mut map) => map.shift_remove("configs").unwrap_or_default(),
        _ => Value::Null,
    };

    Ok(LoadedConfig {
        items: ConfigItems::from_value(configs, &origin)?,
        stage,
        module,
        cwd,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document;
    use crate::environment::MapEnvironment;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_item_is_default() {
        let items = ConfigItems::from_value(
            document!(r#"{"values": [{"name": "a", "value": "b"}]}"#),
            "test",
        )
        .unwrap();

        assert_eq!(items.0.len(), 1);
        assert_eq!(items.0[0].name(), "default");
        assert_eq!(
            items.0[0].values[0].source().unwrap(),
            ValueSource::Constant(&Value::from("b"))
        );
    }

    #[test]
    fn item_list() {
        let items = ConfigItems::from_value(
            document!(
                r#"[
                    {"name": "api", "destination": ".env", "values": [
                        {"name": "@", "templateModule": "api", "resolve": "only", "ignoreEmpty": true},
                        {"name": "db.url", "valueFrom": "env:DB_URL"}
                    ], "context": {"stage": "qa"}},
                    {"name": "web", "destinationFormat": "json", "values": [
                        {"name": "flags", "objectFrom": "env:FLAGS"}
                    ]}
                ]"#
            ),
            "test",
        )
        .unwrap();

        let names: Vec<_> = items.iter().map(ConfigItem::name).collect();
        assert_eq!(names, vec!["api", "web"]);

        let api = &items.0[0];
        assert_eq!(api.destination.as_deref(), Some(".env"));
        assert_eq!(api.context.as_ref().unwrap().stage(), "qa");
        assert_eq!(api.values[0].resolve, Some(ResolvePolicy::Only));
        assert_eq!(api.values[0].ignore_empty, Some(true));
        assert_eq!(
            api.values[0].source().unwrap(),
            ValueSource::Template {
                module: Some("api"),
                path: None
            }
        );
        assert_eq!(
            items.0[1].values[0].source().unwrap(),
            ValueSource::Object("env:FLAGS")
        );
    }

    #[test]
    fn invalid_definitions() {
        let err = ConfigItems::from_value(document!(r#"{"values": "nope"}"#), "file x.yml").unwrap_err();
        assert!(matches!(&err, Error::InvalidConfigSchema { origin, .. } if origin == "file x.yml"));

        let err = ConfigItems::from_value(
            document!(r#"{"values": [{"name": "a", "value": "b", "valueFrom": "env:B"}]}"#),
            "file x.yml",
        )
        .unwrap_err();
        assert!(matches!(&err, Error::InvalidConfigSchema { origin, .. } if origin == "file x.yml, value 'a'"));

        let err = ConfigItems::from_value(document!(r#"{"values": [{"name": "a"}]}"#), "x").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigSchema { .. }));

        assert!(ConfigItems::from_value(Value::Null, "x").is_err());
    }

    #[test]
    fn loads_stage_module_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".config")).unwrap();
        std::fs::write(
            dir.path().join(".config/dev.config.yml"),
            "configs:\n  values:\n    - name: a\n      value: b\n",
        )
        .unwrap();

        let request = ConfigRequest {
            stage: Some("dev".to_string()),
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let loaded = load_config_items(&request, &MapEnvironment::new()).unwrap();
        assert_eq!(loaded.stage, "dev");
        assert_eq!(loaded.module, "config");
        assert_eq!(loaded.items.0[0].name(), "default");

        let request = ConfigRequest {
            module: Some("other".to_string()),
            ..request
        };
        let err = load_config_items(&request, &MapEnvironment::new()).unwrap_err();
        assert!(err.to_string().ends_with("dev.other' not found"), "{err}");
    }

    #[test]
    fn explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("items.json"),
            r#"{"configs": [{"name": "x", "values": [{"name": "a", "value": 1}]}]}"#,
        )
        .unwrap();

        for path in ["items.json", "items"] {
            let request = ConfigRequest {
                cwd: Some(dir.path().to_path_buf()),
                path: Some(PathBuf::from(path)),
                ..Default::default()
            };
            let loaded = load_config_items(&request, &MapEnvironment::new()).unwrap();
            assert_eq!(loaded.items.0[0].name(), "x", "{path}");
        }
    }
}
