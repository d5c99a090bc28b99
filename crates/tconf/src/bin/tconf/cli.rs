//! tconf cli interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;
use tconf::context::ResolvePolicy;
use tconf::format::Format;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tconf ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a single template
    ///
    /// Looks for .config/<stage>.<module>[.template].<json|yml|yaml|env> unless --path is given
    Template(TemplateCommand),

    /// Compose config items and print one of them
    Get(GetCommand),

    /// Compose config items and write them to their destinations
    Apply(ApplyCommand),

    /// Write a value into a yaml template
    Set(SetCommand),
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Stage, defaults to $STAGE or `local`
    #[clap(short = 's', long)]
    pub stage: Option<String>,

    #[clap(short = 'm', long)]
    pub module: Option<String>,

    /// Explicit file, relative to the work directory
    #[clap(short = 'p', long)]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Extra context as json, e.g. '{"aws": {"region": "eu-west-1"}}'
    #[clap(long)]
    pub context: Option<String>,

    /// json/yaml file mapping secret arns (or names) to values
    #[clap(long)]
    pub secrets: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct TemplateCommand {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub resolve_args: ResolveArgs,

    /// Template format, detected from the file name by default
    #[clap(short = 'f', long)]
    pub format: Option<Format>,

    /// Only return the value or sub-tree at this dotted path
    #[clap(long)]
    pub property: Option<String>,

    /// all, ignore (keep literals), remove (drop literals) or only (keep only literals)
    #[clap(short = 'r', long, default_value_t)]
    pub resolve: ResolvePolicy,

    /// Print nothing instead of failing when the template does not exist
    #[clap(long)]
    pub ignore_empty: bool,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct GetCommand {
    /// Shorthand for --stage, --module and --target
    #[clap(value_name = "STAGE.MODULE.TARGET")]
    pub shorthand: Option<String>,

    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub resolve_args: ResolveArgs,

    /// Config item name, `default` when omitted
    #[clap(short = 't', long)]
    pub target: Option<String>,

    /// Only return the value or sub-tree at this path (`a.b` or `a__b`)
    #[clap(long)]
    pub property: Option<String>,

    /// Only return these comma separated keys, keeping their paths
    #[clap(long)]
    pub keys: Option<String>,

    /// Prefix for env output keys
    #[clap(long)]
    pub prefix: Option<String>,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct ApplyCommand {
    /// Shorthand for --stage and --module
    #[clap(value_name = "STAGE.MODULE")]
    pub shorthand: Option<String>,

    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub resolve_args: ResolveArgs,

    /// Only apply this config item
    #[clap(short = 't', long)]
    pub target: Option<String>,
}

#[derive(Parser, Debug)]
pub struct SetCommand {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// File format, only yaml can be written
    #[clap(short = 'f', long)]
    pub format: Option<String>,

    /// Path to set (`a.b` or `a__b`)
    #[clap(long, required_unless_present("json"), conflicts_with("json"))]
    pub property: Option<String>,

    #[clap(long, requires("property"))]
    pub value: Option<String>,

    /// A json object to merge into the template
    #[clap(long)]
    pub json: Option<String>,

    /// Replace the file instead of merging into it
    #[clap(long)]
    pub replace: bool,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(alias = "yml")]
    Yaml,
    #[value(alias = "__")]
    Env,
    EnvJson,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
            OutputFormat::Env => f.write_str("env"),
            OutputFormat::EnvJson => f.write_str("env-json"),
        }
    }
}

impl From<OutputFormat> for tconf::format::OutputFormat {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Json => Self::Json,
            OutputFormat::Yaml => Self::Yaml,
            OutputFormat::Env => Self::Env,
            OutputFormat::EnvJson => Self::EnvJson,
        }
    }
}

/// Split `stage.module[.target]`
pub fn split_shorthand(shorthand: &str) -> anyhow::Result<(String, String, Option<String>)> {
    match shorthand.split('.').collect::<Vec<_>>().as_slice() {
        [stage, module] => Ok((stage.to_string(), module.to_string(), None)),
        [stage, module, target] => Ok((stage.to_string(), module.to_string(), Some(target.to_string()))),
        _ => anyhow::bail!("Invalid shorthand '{shorthand}', use <stage>.<module>[.<target>]"),
    }
}
