//! # tconf - template configuration
//!
//! Resolve staged configuration trees from templates, compose them into named outputs and write
//! them as json, yaml or dotenv.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tconf` works internally.
//!
//! ### Templates
//!
//! A template is any json, yaml or dotenv document. String values may contain template literals:
//!
//! ```yaml
//! database:
//!   host: ${env:DB_HOST}            # environment variable
//!   url: postgres://${env:DB_HOST}/app_${func:stage}
//!   password: ${arn:aws:ssm:eu-west-1:123456789012:parameter/app/db}
//! features: $object{env:FEATURES}   # parsed as json
//! note: \${not a literal}
//! ```
//!
//! A literal is `$<mutator>{<command>:<argument>}`, see [literal]. The commands are
//! - `env:<NAME>`: environment variable, missing variables resolve to nothing
//! - `func:stage`, `func:timestamp`
//! - `arn:<arn>`: ssm parameter or secrets manager secret, see [secrets]
//!
//! ### Loading
//!
//! see [source::load_template]
//!
//! Templates live at `.config/<stage>.<module>[.template].<json|yml|yaml|env>` or at an explicit
//! path. The stage falls back to the `STAGE` environment variable and then to `local`.
//!
//! ### Resolving
//!
//! see [walker::TreeWalker]
//!
//! The walker descends the document and hands every literal to the [evaluator::Evaluator]. One
//! [cache::ResolutionCache] per pass makes sure every distinct literal is evaluated once, even when
//! siblings are resolved concurrently. The [context::ResolvePolicy] decides which nodes survive:
//!
//! | policy   | `{a: "b", c: "${env:TEST}"}` with `TEST=test` |
//! |----------|-----------------------------------------------|
//! | `all`    | `{a: "b", c: "test"}`                         |
//! | `ignore` | `{a: "b", c: "${env:TEST}"}`                  |
//! | `remove` | `{a: "b"}`                                    |
//! | `only`   | `{c: "test"}`                                 |
//!
//! Secrets are the only literals that wait on I/O. The `*_blocking` entry points run the same walk
//! with secret access denied, so `arn` literals fail with [Error::AsyncNotAllowed] instead.
//!
//! ### Composing
//!
//! see [compose::compose_configs]
//!
//! A config file (`.config/<stage>.config.yml`) lists items. Each item folds its values into one
//! tree, every value is placed at a path with [merge::merge_into]:
//!
//! ```yaml
//! configs:
//!   - name: api
//!     destination: api/.env
//!     values:
//!       - name: "@"                # merged into the root
//!         templateModule: api
//!       - name: database__password # same as database.password
//!         valueFrom: env:DB_PASSWORD
//! ```
//!
//! ### Output
//!
//! [format::render] writes trees as pretty json, yaml, dotenv (`a__b="c"`) or dotenv with json
//! values. In apply mode [apply::FileWriter] writes each item to its destination.
//!
pub mod apply;
pub mod cache;
pub mod compose;
pub mod config;
pub mod context;
pub mod dotenv;
pub mod environment;
mod error;
pub mod evaluator;
pub mod format;
pub mod literal;
pub mod merge;
pub mod query;
pub mod secrets;
pub mod source;
pub mod value;
pub mod walker;

pub use error::{Error, Result, SecretError};
