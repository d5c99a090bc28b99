//! resolution context
//!
//! A [Context] travels with every resolution pass. It names the active stage, the [ResolvePolicy]
//! and optionally the aws settings used for `arn` literals. Unknown keys are kept in
//! [Context::extra] so item definitions may carry their own data.
use crate::environment::Environment;
use crate::merge::deep_merge;
use crate::value::{Map, Value};
use crate::Error;

/// Stage used when neither an option nor `STAGE` names one
pub const DEFAULT_STAGE: &str = "local";

/// Pick the stage: explicit value, then `STAGE`, then [DEFAULT_STAGE]
pub fn resolve_stage(stage: Option<&str>, environment: &dyn Environment) -> String {
    stage
        .filter(|stage| !stage.is_empty())
        .map(str::to_string)
        .or_else(|| environment.var("STAGE").filter(|stage| !stage.is_empty()))
        .unwrap_or_else(|| DEFAULT_STAGE.to_string())
}

/// Which nodes survive a resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvePolicy {
    /// substitute literals, keep everything
    #[default]
    All,
    /// keep literals verbatim
    Ignore,
    /// drop strings that contain literals
    Remove,
    /// keep only strings that contain literals
    Only,
}

impl std::str::FromStr for ResolvePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "ignore" => Ok(Self::Ignore),
            "remove" => Ok(Self::Remove),
            "only" => Ok(Self::Only),
            other => Err(Error::UnknownPolicy(other.to_string())),
        }
    }
}

impl std::fmt::Display for ResolvePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvePolicy::All => f.write_str("all"),
            ResolvePolicy::Ignore => f.write_str("ignore"),
            ResolvePolicy::Remove => f.write_str("remove"),
            ResolvePolicy::Only => f.write_str("only"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub resolve: ResolvePolicy,
    #[serde(default)]
    pub aws: Option<AwsConfig>,
    #[serde(flatten)]
    pub extra: Map,
}

impl Context {
    pub fn for_stage(stage: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, resolve: ResolvePolicy) -> Self {
        self.resolve = resolve;
        self
    }

    /// Active stage, [DEFAULT_STAGE] when unset
    pub fn stage(&self) -> &str {
        self.stage.as_deref().unwrap_or(DEFAULT_STAGE)
    }

    /// Deep-merge `other` over `self`
    ///
    /// The policy is not merged, it belongs to whoever starts the pass.
    pub fn overlay(&self, other: Option<&Context>) -> Context {
        let Some(other) = other else {
            return self.clone();
        };

        let aws = match (&self.aws, &other.aws) {
            (Some(base), Some(over)) => Some(base.overlay(over)),
            (base, over) => over.clone().or_else(|| base.clone()),
        };

        let extra = match deep_merge(
            Value::Object(self.extra.clone()),
            Value::Object(other.extra.clone()),
        ) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Context {
            stage: other.stage.clone().or_else(|| self.stage.clone()),
            resolve: self.resolve,
            aws,
            extra,
        }
    }
}

/// Settings for the secret provider
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub endpoint: Option<String>,
    pub credentials: Option<AwsCredentials>,
}

impl AwsConfig {
    fn overlay(&self, other: &AwsConfig) -> AwsConfig {
        AwsConfig {
            region: other.region.clone().or_else(|| self.region.clone()),
            account_id: other.account_id.clone().or_else(|| self.account_id.clone()),
            endpoint: other.endpoint.clone().or_else(|| self.endpoint.clone()),
            credentials: other
                .credentials
                .clone()
                .or_else(|| self.credentials.clone()),
        }
    }
}

#[derive(Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

// keep secrets out of logs
impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}
