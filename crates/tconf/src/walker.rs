//! recursive template resolution
//!
//! [TreeWalker] descends a [Value] tree and substitutes every template literal it finds in string
//! nodes. Siblings are resolved concurrently (they only share the [ResolutionCache]), literals
//! inside one string are evaluated left to right. Each literal replaces its first occurrence in the
//! already substituted string, so a resolved value may itself contain the text of a later literal.
//!
//! The [ResolvePolicy] decides what survives:
//!
//! | node | all | ignore | remove | only |
//! |------|-----|--------|--------|------|
//! | string with literals | substituted | verbatim | dropped | substituted |
//! | other leaf | kept | kept | kept | dropped |
//!
//! Objects and arrays that lose all their children are dropped as well. The document root is the
//! exception: an object root always resolves to an object, possibly empty.
//!
//! There is a single walker for both modes. Whether `arn` literals may be awaited is decided by
//! the [Evaluator]'s secret access; [resolve_tree_blocking] drives the same walk without any
//! secret access so it never waits on I/O.
use crate::cache::ResolutionCache;
use crate::context::{Context, ResolvePolicy};
use crate::evaluator::Evaluator;
use crate::literal::{Mutator, Template};
use crate::value::{Map, Value};
use crate::{Error, Result};
use futures::future::{try_join_all, BoxFuture, FutureExt};

#[derive(derive_new::new)]
pub struct TreeWalker<'a> {
    evaluator: &'a Evaluator,
    context: &'a Context,
    cache: &'a ResolutionCache,
}

impl<'a> TreeWalker<'a> {
    /// Resolve `document`, optionally only the sub-tree at the dotted `property`
    ///
    /// `path` prefixes every location reported in errors.
    pub async fn resolve(
        &self,
        document: &Value,
        property: Option<&str>,
        path: &str,
    ) -> Result<Option<Value>> {
        if let Some(property) = property.filter(|property| !property.is_empty()) {
            return self.resolve_property(document, property, path).await;
        }

        let resolved = self.resolve_node(document, path.to_string()).await?;
        match (resolved, document) {
            (None, Value::Object(_)) => Ok(Some(Value::Object(Map::new()))),
            (resolved, _) => Ok(resolved),
        }
    }

    async fn resolve_property(
        &self,
        document: &Value,
        property: &str,
        path: &str,
    ) -> Result<Option<Value>> {
        let mut node = document;
        let mut path = path.to_string();
        let mut remaining = property;

        loop {
            let (key, rest) = remaining.split_once('.').unwrap_or((remaining, ""));

            let map = match node {
                Value::Object(map) => map,
                Value::Null => return Ok(Some(Value::Null)),
                _ => {
                    return Err(Error::PropertyNotAnObject {
                        path: format!("{path}.{remaining}"),
                    })
                }
            };

            let Some(child) = map.get(key) else {
                tracing::debug!(%path, key, "property not found");
                return Ok(None);
            };

            path = format!("{path}.{key}");
            node = child;

            if rest.is_empty() {
                break;
            }
            remaining = rest;
        }

        self.resolve_node(node, path).await
    }

    fn resolve_node<'s>(&'s self, node: &'s Value, path: String) -> BoxFuture<'s, Result<Option<Value>>> {
        async move {
            match node {
                Value::Object(map) => {
                    if map.is_empty() {
                        return Ok(self.keep_leaf(node));
                    }

                    let resolved = try_join_all(
                        map.iter()
                            .map(|(key, value)| self.resolve_node(value, format!("{path}.{key}"))),
                    )
                    .await?;

                    let object: Map = map
                        .keys()
                        .zip(resolved)
                        .filter_map(|(key, value)| value.map(|value| (key.clone(), value)))
                        .collect();

                    Ok((!object.is_empty()).then_some(Value::Object(object)))
                }
                Value::Array(items) => {
                    if items.is_empty() {
                        return Ok(self.keep_leaf(node));
                    }

                    let resolved = try_join_all(
                        items
                            .iter()
                            .enumerate()
                            .map(|(index, item)| self.resolve_node(item, format!("{path}[{index}]"))),
                    )
                    .await?;

                    let array: Vec<Value> = resolved.into_iter().flatten().collect();
                    Ok((!array.is_empty()).then_some(Value::Array(array)))
                }
                Value::String(text) => self.resolve_string(text, &path).await,
                _ => Ok(self.keep_leaf(node)),
            }
        }
        .boxed()
    }

    /// A node without literals
    fn keep_leaf(&self, node: &Value) -> Option<Value> {
        match self.context.resolve {
            ResolvePolicy::Only => None,
            _ => Some(node.clone()),
        }
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn resolve_string(&self, text: &str, path: &str) -> Result<Option<Value>> {
        let template = Template::parse(text);

        if !template.has_literals() {
            return Ok(self.keep_leaf(&Value::String(template.text())));
        }

        match self.context.resolve {
            ResolvePolicy::Ignore => return Ok(Some(Value::String(text.to_string()))),
            ResolvePolicy::Remove => return Ok(None),
            ResolvePolicy::All | ResolvePolicy::Only => {}
        }

        let mut running = Some(Value::String(text.to_string()));
        for literal in template.literals() {
            let mutator = Mutator::parse(literal.mutator, path)?;
            let resolved = self
                .evaluator
                .evaluate(literal.expression, self.context, path, self.cache)
                .await?;
            let resolved = mutate(mutator, resolved, path)?;

            let current = running.as_ref().map(Value::to_text).unwrap_or_default();
            running = if current == literal.raw {
                resolved
            } else {
                let replacement = resolved.as_ref().map(Value::to_text).unwrap_or_default();
                Some(Value::String(replace_literal(&current, literal.raw, &replacement)))
            };
        }

        // escapes are only dropped once every literal is substituted
        if template.text() != text {
            if let Some(Value::String(substituted)) = running {
                return Ok(Some(Value::String(Template::parse(&substituted).text())));
            }
        }

        Ok(running)
    }
}

/// Replace the first unescaped occurrence of `raw`
fn replace_literal(running: &str, raw: &str, replacement: &str) -> String {
    let found = running
        .match_indices(raw)
        .find(|(index, _)| !running[..*index].ends_with('\\'));

    match found {
        Some((index, _)) => format!(
            "{}{}{}",
            &running[..index],
            replacement,
            &running[index + raw.len()..]
        ),
        None => running.to_string(),
    }
}

fn mutate(mutator: Mutator, resolved: Option<Value>, path: &str) -> Result<Option<Value>> {
    match (mutator, resolved) {
        (Mutator::Verbatim, resolved) => Ok(resolved),
        (Mutator::Object, Some(Value::String(text))) if !text.is_empty() => Value::parse_json(&text)
            .map(Some)
            .map_err(|source| Error::InvalidJson {
                path: path.to_string(),
                source,
            }),
        (Mutator::Object, None | Some(Value::Null) | Some(Value::String(_))) => {
            Ok(Some(Value::from("")))
        }
        (Mutator::Object, Some(structured)) => Ok(Some(structured)),
    }
}

/// Resolve `document` with a fresh cache
pub async fn resolve_tree(
    evaluator: &Evaluator,
    document: &Value,
    context: &Context,
    property: Option<&str>,
    path: &str,
) -> Result<Option<Value>> {
    let cache = ResolutionCache::new();
    let resolved = TreeWalker::new(evaluator, context, &cache)
        .resolve(document, property, path)
        .await?;
    tracing::trace!(literals = cache.len(), "tree resolved");
    Ok(resolved)
}

/// [resolve_tree] without waiting on I/O, `arn` literals fail with [Error::AsyncNotAllowed]
pub fn resolve_tree_blocking(
    evaluator: &Evaluator,
    document: &Value,
    context: &Context,
    property: Option<&str>,
    path: &str,
) -> Result<Option<Value>> {
    let evaluator = evaluator.denied();
    futures::executor::block_on(resolve_tree(&evaluator, document, context, property, path))
}
