//! error taxonomy
//!
//! Every failure aborts the current resolution pass. Errors raised while walking a document carry
//! the dotted/bracketed location (`path`) of the node that failed.
use std::path::PathBuf;

/// Error type returned by secret providers
pub type SecretError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration file '{}' not found", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Format is required when path is not provided")]
    MissingFormat,
    #[error("Invalid configuration {origin}: {reason}")]
    InvalidConfigSchema { origin: String, reason: String },
    #[error("Unknown resolve policy '{0}', expected one of: all, ignore, remove, only")]
    UnknownPolicy(String),

    #[error("Property '{path}' is not an object")]
    PropertyNotAnObject { path: String },
    #[error("Property '{path}' not found")]
    PropertyNotFound { path: String },
    #[error("Cannot use both --keys and --property at the same time")]
    ConflictingSelectors,

    #[error("Unsupported template literal '{path}': '{expression}'")]
    UnsupportedLiteral { path: String, expression: String },
    #[error("Unsupported function '{path}': {expression}")]
    UnsupportedFunction { path: String, expression: String },
    #[error("Unsupported mutator '{mutator}' in '{path}'")]
    UnsupportedMutator { path: String, mutator: String },
    #[error("Could not parse secret arn '{arn}' in '{path}'")]
    UnresolvableArn { path: String, arn: String },
    #[error("Can not resolve async '{path}': {expression}")]
    AsyncNotAllowed { path: String, expression: String },
    #[error("Value of '{path}' is not valid json")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Could not get secret {arn}")]
    SecretFetchFailed {
        arn: String,
        #[source]
        source: SecretError,
    },

    #[error("Cannot set root value to \"{value}\"")]
    RootValueNotObject { value: String },
    #[error("Cannot create tree path at {path}, {segment} is not an object")]
    PathConflict { path: String, segment: String },
    #[error("Multiple configs with the same name '{0}'")]
    DuplicateConfigName(String),
    #[error("Stage or module must be specified")]
    MissingStageOrModule,

    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse json")]
    Json(#[from] serde_json::Error),
    #[error("Unable to parse yaml")]
    Yaml(#[from] serde_yaml::Error),
}
