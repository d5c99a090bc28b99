//! literal evaluation
//!
//! [Evaluator::evaluate] turns one literal expression (`env:HOME`, `func:stage`, `arn:...`) into a
//! value. Results are memoized in the pass's [ResolutionCache], except `func:timestamp` which is
//! fresh on every use.
use crate::cache::ResolutionCache;
use crate::context::Context;
use crate::environment::Environment;
use crate::literal::{Command, Function};
use crate::secrets::{SecretAccess, SecretArn, SecretRequest};
use crate::value::Value;
use crate::{Error, Result};
use std::sync::Arc;

/// Resolvers for every literal command
#[derive(Debug, Clone)]
pub struct Evaluator {
    environment: Arc<dyn Environment>,
    secrets: SecretAccess,
}

impl Evaluator {
    pub fn new(environment: Arc<dyn Environment>, secrets: SecretAccess) -> Self {
        Self {
            environment,
            secrets,
        }
    }

    /// Evaluator that may not fetch secrets
    pub fn without_secrets(environment: Arc<dyn Environment>) -> Self {
        Self::new(environment, SecretAccess::Denied)
    }

    /// Same resolvers with secret fetching denied
    pub fn denied(&self) -> Self {
        Self::new(self.environment.clone(), SecretAccess::Denied)
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    /// Evaluate `expression` in `context`
    ///
    /// `Ok(None)` means the literal resolved to nothing, e.g. an unset environment variable.
    #[tracing::instrument(level = "trace", skip(self, context, cache))]
    pub async fn evaluate(
        &self,
        expression: &str,
        context: &Context,
        path: &str,
        cache: &ResolutionCache,
    ) -> Result<Option<Value>> {
        if expression.is_empty() {
            return Ok(Some(Value::from(expression)));
        }

        if let Some(cached) = cache.get(expression) {
            tracing::trace!(expression, "cache hit");
            return Ok(cached);
        }

        let command = Command::parse(expression, path)?;
        if command == Command::Func(Function::Timestamp) {
            return Ok(Some(timestamp()));
        }

        cache
            .get_or_try_insert_with(expression, || {
                self.run(command, expression, context, path)
            })
            .await
    }

    async fn run(
        &self,
        command: Command,
        expression: &str,
        context: &Context,
        path: &str,
    ) -> Result<Option<Value>> {
        tracing::trace!(?command, "evaluating literal");

        match command {
            Command::Env(name) => Ok(self.environment.var(&name).map(Value::String)),
            Command::Func(Function::Stage) => Ok(Some(Value::from(context.stage()))),
            Command::Func(Function::Timestamp) => Ok(Some(timestamp())),
            Command::Arn(arn) => self
                .fetch_secret(&arn, expression, context, path)
                .await
                .map(|secret| Some(Value::String(secret))),
        }
    }

    async fn fetch_secret(
        &self,
        arn: &str,
        expression: &str,
        context: &Context,
        path: &str,
    ) -> Result<String> {
        let SecretAccess::Provider(provider) = &self.secrets else {
            return Err(Error::AsyncNotAllowed {
                path: path.to_string(),
                expression: expression.to_string(),
            });
        };

        let Some(parsed) = SecretArn::parse(arn) else {
            return Err(Error::UnresolvableArn {
                path: path.to_string(),
                arn: arn.to_string(),
            });
        };

        let request = SecretRequest::new(parsed, context.aws.as_ref(), self.environment());
        tracing::debug!(arn, region = ?request.region, "fetching secret");

        provider
            .fetch_secret(&request)
            .await
            .map_err(|source| Error::SecretFetchFailed {
                arn: arn.to_string(),
                source,
            })
    }
}

/// Current instant, ISO-8601 with milliseconds in UTC
fn timestamp() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}
