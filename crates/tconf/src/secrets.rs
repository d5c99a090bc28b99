//! remote secret references (`${arn:...}`)
//!
//! Two arn shapes are understood:
//!
//! | service | arn | secret name |
//! |---------|-----|-------------|
//! | ssm parameter store | `arn:aws:ssm:<region>:<account>:parameter/<path>` | `/<path>` |
//! | secrets manager | `arn:aws:secretsmanager:<region>:<account>:secret:<path>` | `<path>` |
//!
//! Region and account may be left empty, they are then taken from the context's `aws` settings
//! or from `AWS_REGION` / `AWS_DEFAULT_REGION`.
//!
//! Fetching is done by a [SecretProvider]. [SecretAccess] decides whether a resolution pass may
//! fetch at all.
use crate::context::{AwsConfig, AwsCredentials};
use crate::environment::Environment;
use crate::error::SecretError;
use crate::format::{parse_document, Format};
use crate::value::Value;
use crate::Result;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretService {
    ParameterStore,
    SecretsManager,
}

/// A parsed secret arn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretArn {
    pub arn: String,
    pub service: SecretService,
    pub region: Option<String>,
    pub account_id: Option<String>,
    /// parameter name or secret id
    pub name: String,
}

fn arn_patterns() -> &'static [(SecretService, Regex); 2] {
    static PATTERNS: OnceLock<[(SecretService, Regex); 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                SecretService::ParameterStore,
                Regex::new(r"^arn:aws:ssm:(?P<region>[^:]*):(?P<account>\d*):parameter/(?P<path>.+)$")
                    .expect("ssm arn pattern must compile"),
            ),
            (
                SecretService::SecretsManager,
                Regex::new(
                    r"^arn:aws:secretsmanager:(?P<region>[^:]*):(?P<account>\d*):secret:(?P<path>.+)$",
                )
                .expect("secrets manager arn pattern must compile"),
            ),
        ]
    })
}

impl SecretArn {
    /// `None` when `arn` matches none of the known shapes
    pub fn parse(arn: &str) -> Option<Self> {
        let arn = arn.trim();
        arn_patterns().iter().find_map(|(service, pattern)| {
            let captures = pattern.captures(arn)?;
            let non_empty = |name| {
                captures
                    .name(name)
                    .map(|m| m.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            let path = non_empty("path")?;

            Some(SecretArn {
                arn: arn.to_string(),
                service: *service,
                region: non_empty("region"),
                account_id: non_empty("account"),
                name: match service {
                    SecretService::ParameterStore => format!("/{path}"),
                    SecretService::SecretsManager => path,
                },
            })
        })
    }
}

/// Everything a provider needs for one lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SecretRequest {
    pub arn: SecretArn,
    pub region: Option<String>,
    pub account_id: Option<String>,
    pub endpoint: Option<String>,
    pub credentials: Option<AwsCredentials>,
}

impl SecretRequest {
    /// Fill region/account from the arn, then `aws`, then the environment
    pub fn new(arn: SecretArn, aws: Option<&AwsConfig>, environment: &dyn Environment) -> Self {
        let region = arn
            .region
            .clone()
            .or_else(|| aws.and_then(|aws| aws.region.clone()))
            .or_else(|| environment.var("AWS_REGION"))
            .or_else(|| environment.var("AWS_DEFAULT_REGION"));
        let account_id = arn
            .account_id
            .clone()
            .or_else(|| aws.and_then(|aws| aws.account_id.clone()));

        Self {
            arn,
            region,
            account_id,
            endpoint: aws.and_then(|aws| aws.endpoint.clone()),
            credentials: aws.and_then(|aws| aws.credentials.clone()),
        }
    }
}

/// Looks up secret values
#[async_trait::async_trait]
pub trait SecretProvider: Send + Sync + std::fmt::Debug {
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<String, SecretError>;
}

/// Whether `arn` literals may be fetched during a pass
#[derive(Debug, Clone)]
pub enum SecretAccess {
    /// synchronous mode: `arn` literals fail with [crate::Error::AsyncNotAllowed]
    Denied,
    Provider(Arc<dyn SecretProvider>),
}

impl SecretAccess {
    pub fn provider(provider: impl SecretProvider + 'static) -> Self {
        Self::Provider(Arc::new(provider))
    }
}

/// Secrets from a fixed table, keyed by arn or by secret name
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    secrets: indexmap::IndexMap<String, String>,
}

impl StaticSecretProvider {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    /// Load a flat json/yaml mapping of arn (or name) to value
    pub fn load_file(path: &Path) -> Result<Self> {
        tracing::info!(path=%path.display(), "loading secrets");
        let content = std::fs::read_to_string(path)?;
        let format = Format::detect(path)?;

        let secrets = match parse_document(&content, format)? {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| (key, value.to_text()))
                .collect(),
            Value::Null => Default::default(),
            other => {
                return Err(crate::Error::InvalidConfigSchema {
                    origin: path.display().to_string(),
                    reason: format!("expected a mapping of secrets, found {}", other.type_name()),
                })
            }
        };

        Ok(Self { secrets })
    }
}

#[async_trait::async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn fetch_secret(&self, request: &SecretRequest) -> Result<String, SecretError> {
        self.secrets
            .get(&request.arn.arn)
            .or_else(|| self.secrets.get(&request.arn.name))
            .cloned()
            .ok_or_else(|| format!("no secret stored for '{}'", request.arn.name).into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::environment::MapEnvironment;
    use pretty_assertions::assert_eq;

    #[test]
    fn ssm_arn() {
        let arn = SecretArn::parse("arn:aws:ssm:eu-west-1:1234567890:parameter/myapp/flags").unwrap();
        assert_eq!(arn.service, SecretService::ParameterStore);
        assert_eq!(arn.region.as_deref(), Some("eu-west-1"));
        assert_eq!(arn.account_id.as_deref(), Some("1234567890"));
        assert_eq!(arn.name, "/myapp/flags");
    }

    #[test]
    fn secrets_manager_arn_without_region() {
        let arn = SecretArn::parse("arn:aws:secretsmanager:::secret:db/password").unwrap();
        assert_eq!(arn.service, SecretService::SecretsManager);
        assert_eq!(arn.region, None);
        assert_eq!(arn.account_id, None);
        assert_eq!(arn.name, "db/password");
    }

    #[test]
    fn unknown_arns() {
        assert_eq!(SecretArn::parse("arn:aws:s3:::bucket/key"), None);
        assert_eq!(SecretArn::parse("arn:aws:ssm:::parameter/"), None);
    }

    #[test]
    fn request_region_fallback() {
        let env = MapEnvironment::new().with("AWS_REGION", "us-east-2");
        let aws = AwsConfig {
            region: Some("eu-central-1".to_string()),
            account_id: Some("42".to_string()),
            ..Default::default()
        };

        let arn = SecretArn::parse("arn:aws:ssm:::parameter/x").unwrap();
        let request = SecretRequest::new(arn.clone(), Some(&aws), &env);
        assert_eq!(request.region.as_deref(), Some("eu-central-1"));
        assert_eq!(request.account_id.as_deref(), Some("42"));

        let request = SecretRequest::new(arn, None, &env);
        assert_eq!(request.region.as_deref(), Some("us-east-2"));

        let arn = SecretArn::parse("arn:aws:ssm:ap-south-1::parameter/x").unwrap();
        let request = SecretRequest::new(arn, Some(&aws), &env);
        assert_eq!(request.region.as_deref(), Some("ap-south-1"));
    }

    #[test]
    fn request_default_region() {
        let arn = SecretArn::parse("arn:aws:ssm:::parameter/x").unwrap();

        let env = MapEnvironment::new().with("AWS_DEFAULT_REGION", "sa-east-1");
        let request = SecretRequest::new(arn.clone(), None, &env);
        assert_eq!(request.region.as_deref(), Some("sa-east-1"));

        let env = env.with("AWS_REGION", "us-east-2");
        let request = SecretRequest::new(arn.clone(), None, &env);
        assert_eq!(request.region.as_deref(), Some("us-east-2"));

        let request = SecretRequest::new(arn, None, &MapEnvironment::new());
        assert_eq!(request.region, None);
    }

    #[tokio::test]
    async fn static_provider_lookup() {
        let provider = StaticSecretProvider::default()
            .with("/myapp/flags", "on")
            .with("arn:aws:secretsmanager:::secret:token", "abc");
        let env = MapEnvironment::new();

        let by_name = SecretRequest::new(
            SecretArn::parse("arn:aws:ssm:::parameter/myapp/flags").unwrap(),
            None,
            &env,
        );
        assert_eq!(provider.fetch_secret(&by_name).await.unwrap(), "on");

        let by_arn = SecretRequest::new(
            SecretArn::parse("arn:aws:secretsmanager:::secret:token").unwrap(),
            None,
            &env,
        );
        assert_eq!(provider.fetch_secret(&by_arn).await.unwrap(), "abc");

        let missing = SecretRequest::new(
            SecretArn::parse("arn:aws:ssm:::parameter/nope").unwrap(),
            None,
            &env,
        );
        assert!(provider.fetch_secret(&missing).await.is_err());
    }
}
