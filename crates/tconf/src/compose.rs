//! config composition
//!
//! Every [ConfigItem] folds its values, in order, into one tree with [merge_into]. Each item gets
//! a fresh [ResolutionCache] and its own context deep-merged over the ambient one.
use crate::apply::{ConfigWriter, Destination};
use crate::cache::ResolutionCache;
use crate::config::{load_config_items, ConfigItem, ConfigItems, ConfigRequest, ConfigValue, ValueSource};
use crate::context::Context;
use crate::evaluator::Evaluator;
use crate::merge::merge_into;
use crate::source::{resolve_template, TemplateRequest};
use crate::value::{Map, Value};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub stage: Option<String>,
    pub cwd: Option<PathBuf>,
    pub module: Option<String>,
    pub path: Option<PathBuf>,
    /// in-memory item definitions instead of a config file
    pub items: Option<ConfigItems>,
    /// only compose the item with this name
    pub target: Option<String>,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Composed {
    /// every item by name
    Trees(IndexMap<String, Value>),
    /// the requested target, `None` when no item has that name
    Target(Option<Value>),
}

impl Composed {
    /// The requested target, or the `default` item
    pub fn into_tree(self) -> Option<Value> {
        match self {
            Composed::Target(tree) => tree,
            Composed::Trees(mut trees) => trees.shift_remove(crate::config::DEFAULT_NAME),
        }
    }
}

struct ItemComposer<'a> {
    evaluator: &'a Evaluator,
    context: Context,
    stage: &'a str,
    cwd: &'a Path,
    cache: ResolutionCache,
}

impl ItemComposer<'_> {
    async fn compose(&self, item: &ConfigItem) -> Result<Value> {
        let mut tree = Value::Object(Map::new());

        for value in &item.values {
            let path = format!("{}>{}", item.name(), value.name);
            let Some(resolved) = self.resolve_value(value, &path).await? else {
                tracing::debug!(%path, "value resolved to nothing, skipped");
                continue;
            };

            tracing::debug!(%path, "merging value");
            tree = merge_into(tree, &value.name, resolved)?;
        }

        Ok(tree)
    }

    async fn resolve_value(&self, value: &ConfigValue, path: &str) -> Result<Option<Value>> {
        match value.source()? {
            ValueSource::Constant(constant) => Ok(Some(constant.clone())),
            ValueSource::Literal(expression) => {
                self.evaluator
                    .evaluate(expression, &self.context, path, &self.cache)
                    .await
            }
            ValueSource::Object(expression) => {
                let resolved = self
                    .evaluator
                    .evaluate(expression, &self.context, path, &self.cache)
                    .await?;
                match resolved {
                    Some(Value::String(text)) => Value::parse_json(&text)
                        .map(Some)
                        .map_err(|source| Error::InvalidJson {
                            path: path.to_string(),
                            source,
                        }),
                    other => Ok(other),
                }
            }
            ValueSource::Template {
                module,
                path: template_path,
            } => {
                let request = TemplateRequest {
                    stage: Some(self.stage.to_string()),
                    cwd: Some(self.cwd.to_path_buf()),
                    module: module.map(str::to_string),
                    path: template_path.map(PathBuf::from),
                    context: self.context.clone(),
                    resolve: value.resolve.unwrap_or_default(),
                    ignore_empty: value.ignore_empty.unwrap_or_default(),
                    ..Default::default()
                };
                resolve_template(&request, self.evaluator).await
            }
        }
    }
}

/// Compose config items into named trees
///
/// With a `writer`, items that declare a destination are handed to it once composed.
pub async fn compose_configs(
    options: &ComposeOptions,
    evaluator: &Evaluator,
    writer: Option<&dyn ConfigWriter>,
) -> Result<Composed> {
    let request = ConfigRequest {
        stage: options.stage.clone(),
        cwd: options.cwd.clone(),
        module: options.module.clone(),
        path: options.path.clone(),
        items: options.items.clone(),
    };
    let loaded = load_config_items(&request, evaluator.environment())?;

    let ambient = Context {
        stage: options
            .context
            .stage
            .clone()
            .or_else(|| Some(loaded.stage.clone())),
        ..options.context.clone()
    };

    let mut configs: IndexMap<String, Value> = IndexMap::new();

    for item in loaded.items.iter() {
        let name = item.name();
        if options.target.as_deref().is_some_and(|target| target != name) {
            continue;
        }
        if configs.contains_key(name) {
            return Err(Error::DuplicateConfigName(name.to_string()));
        }

        tracing::debug!(name, values = item.values.len(), "composing config");
        let composer = ItemComposer {
            evaluator,
            context: ambient.overlay(item.context.as_ref()),
            stage: &loaded.stage,
            cwd: &loaded.cwd,
            cache: ResolutionCache::new(),
        };
        let tree = composer.compose(item).await?;

        if let (Some(destination), Some(writer)) = (&item.destination, writer) {
            writer.write(
                &tree,
                &Destination {
                    cwd: &loaded.cwd,
                    path: destination,
                    format: item.destination_format.as_deref(),
                },
            )?;
        }

        configs.insert(name.to_string(), tree);
    }

    Ok(match &options.target {
        Some(target) => Composed::Target(configs.shift_remove(target)),
        None => Composed::Trees(configs),
    })
}

/// [compose_configs] without waiting on I/O, `arn` literals fail with [Error::AsyncNotAllowed]
pub fn compose_configs_blocking(
    options: &ComposeOptions,
    evaluator: &Evaluator,
    writer: Option<&dyn ConfigWriter>,
) -> Result<Composed> {
    let evaluator = evaluator.denied();
    futures::executor::block_on(compose_configs(options, &evaluator, writer))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document;
    use crate::environment::MapEnvironment;
    use crate::secrets::{SecretAccess, StaticSecretProvider};
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn items(definitions: &str) -> Option<ConfigItems> {
        Some(ConfigItems::from_value(document!(definitions), "test").unwrap())
    }

    fn evaluator() -> Evaluator {
        Evaluator::without_secrets(Arc::new(
            MapEnvironment::new()
                .with("DB_HOST", "db.local")
                .with("FLAGS", r#"{"beta": true}"#)
                .with("BROKEN", "{nope"),
        ))
    }

    fn compose(options: &ComposeOptions) -> Result<Composed> {
        compose_configs_blocking(options, &evaluator(), None)
    }

    #[test]
    fn values_fold_in_order() {
        let options = ComposeOptions {
            stage: Some("dev".to_string()),
            items: items(
                r#"{"values": [
                    {"name": "db.host", "valueFrom": "env:DB_HOST"},
                    {"name": "db__port", "value": 5432},
                    {"name": "flags", "objectFrom": "env:FLAGS"},
                    {"name": "stage", "valueFrom": "func:stage"},
                    {"name": "missing", "valueFrom": "env:NOT_SET"},
                    {"name": "@", "value": {"db": {"user": "app"}}}
                ]}"#,
            ),
            ..Default::default()
        };

        assert_eq!(
            compose(&options).unwrap().into_tree(),
            Some(document!(
                r#"{"db": {"host": "db.local", "port": 5432, "user": "app"},
                    "flags": {"beta": true}, "stage": "dev"}"#
            ))
        );
    }

    #[test]
    fn targets_and_duplicates() {
        let definitions = r#"[
            {"name": "a", "values": [{"name": "x", "value": 1}]},
            {"name": "b", "values": [{"name": "x", "value": 2}]},
            {"name": "a", "values": [{"name": "x", "value": 3}]}
        ]"#;

        let options = ComposeOptions {
            items: items(definitions),
            target: Some("b".to_string()),
            ..Default::default()
        };
        assert_eq!(
            compose(&options).unwrap(),
            Composed::Target(Some(document!(r#"{"x": 2}"#)))
        );

        let options = ComposeOptions {
            target: Some("c".to_string()),
            ..options
        };
        assert_eq!(compose(&options).unwrap(), Composed::Target(None));

        let options = ComposeOptions {
            target: None,
            ..options
        };
        assert!(matches!(
            compose(&options),
            Err(Error::DuplicateConfigName(name)) if name == "a"
        ));
    }

    #[test]
    fn item_context_overrides_ambient() {
        let options = ComposeOptions {
            stage: Some("dev".to_string()),
            items: items(
                r#"[
                    {"name": "a", "values": [{"name": "s", "valueFrom": "func:stage"}]},
                    {"name": "b", "values": [{"name": "s", "valueFrom": "func:stage"}],
                     "context": {"stage": "qa"}}
                ]"#,
            ),
            ..Default::default()
        };

        let Composed::Trees(trees) = compose(&options).unwrap() else {
            panic!("expected all trees");
        };
        assert_eq!(trees["a"], document!(r#"{"s": "dev"}"#));
        assert_eq!(trees["b"], document!(r#"{"s": "qa"}"#));
    }

    #[test]
    fn object_from_errors() {
        let options = ComposeOptions {
            items: items(r#"{"values": [{"name": "x", "objectFrom": "env:BROKEN"}]}"#),
            ..Default::default()
        };
        assert!(matches!(
            compose(&options),
            Err(Error::InvalidJson { path, .. }) if path == "default>x"
        ));

        let options = ComposeOptions {
            items: items(r#"{"values": [{"name": "x", "value": "y"}, {"name": "x.z", "value": 1}]}"#),
            ..Default::default()
        };
        assert!(matches!(compose(&options), Err(Error::PathConflict { .. })));
    }

    #[test]
    fn secrets_need_async() {
        let options = ComposeOptions {
            items: items(
                r#"{"values": [{"name": "pw", "valueFrom": "arn:aws:ssm:eu-west-1:123:parameter/db/pw"}]}"#,
            ),
            ..Default::default()
        };
        assert!(matches!(compose(&options), Err(Error::AsyncNotAllowed { .. })));
    }

    #[tokio::test]
    async fn secrets_resolve_async() {
        let evaluator = Evaluator::new(
            Arc::new(MapEnvironment::new()),
            SecretAccess::provider(StaticSecretProvider::default().with("/db/pw", "hunter2")),
        );
        let options = ComposeOptions {
            items: items(
                r#"{"values": [{"name": "db.pw", "valueFrom": "arn:aws:ssm:eu-west-1:123:parameter/db/pw"}]}"#,
            ),
            ..Default::default()
        };

        let composed = compose_configs(&options, &evaluator, None).await.unwrap();
        assert_eq!(composed.into_tree(), Some(document!(r#"{"db": {"pw": "hunter2"}}"#)));
    }

    #[derive(Default)]
    struct RecordingWriter {
        written: Mutex<Vec<(String, Option<String>, Value)>>,
    }

    impl ConfigWriter for RecordingWriter {
        fn write(&self, tree: &Value, destination: &Destination) -> Result<()> {
            self.written.lock().unwrap().push((
                destination.path.to_string(),
                destination.format.map(str::to_string),
                tree.clone(),
            ));
            Ok(())
        }
    }

    #[test]
    fn writer_receives_destinations() {
        let options = ComposeOptions {
            items: items(
                r#"[
                    {"name": "a", "destination": ".env", "values": [{"name": "x", "value": 1}]},
                    {"name": "b", "values": [{"name": "y", "value": 2}]},
                    {"name": "c", "destination": "out/c.conf", "destinationFormat": "json",
                     "values": [{"name": "z", "value": 3}]}
                ]"#,
            ),
            ..Default::default()
        };

        let writer = RecordingWriter::default();
        compose_configs_blocking(&options, &evaluator(), Some(&writer)).unwrap();

        let written = writer.written.into_inner().unwrap();
        assert_eq!(
            written,
            vec![
                (".env".to_string(), None, document!(r#"{"x": 1}"#)),
                (
                    "out/c.conf".to_string(),
                    Some("json".to_string()),
                    document!(r#"{"z": 3}"#)
                ),
            ]
        );
    }
}
