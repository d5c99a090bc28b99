mod cli;

use std::sync::Arc;
use tconf::compose::{compose_configs, ComposeOptions};
use tconf::context::Context;
use tconf::environment::ProcessEnvironment;
use tconf::evaluator::Evaluator;
use tconf::secrets::{SecretAccess, StaticSecretProvider};
use tconf::source::{resolve_template, TemplateRequest};
use tconf::value::Value;

#[tokio::main]
async fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TCONF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Template(template_cli) => template(template_cli).await,
        cli::Command::Get(get_cli) => get(get_cli).await,
        cli::Command::Apply(apply_cli) => apply(apply_cli).await,
        cli::Command::Set(set_cli) => set(set_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

fn evaluator(args: &cli::ResolveArgs) -> anyhow::Result<Evaluator> {
    let secrets = match &args.secrets {
        Some(path) => StaticSecretProvider::load_file(path)?,
        None => StaticSecretProvider::default(),
    };

    Ok(Evaluator::new(
        Arc::new(ProcessEnvironment),
        SecretAccess::provider(secrets),
    ))
}

fn context(args: &cli::ResolveArgs) -> anyhow::Result<Context> {
    match &args.context {
        Some(json) => Ok(serde_json::from_str(json)?),
        None => Ok(Context::default()),
    }
}

fn print(tree: Option<&Value>, format: cli::OutputFormat, prefix: Option<&str>) -> anyhow::Result<()> {
    let output = tconf::format::render(tree, format.into(), prefix)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

pub async fn template(cli: cli::TemplateCommand) -> anyhow::Result<()> {
    let request = TemplateRequest {
        stage: cli.source.stage,
        cwd: None,
        module: cli.source.module,
        path: cli.source.path,
        format: cli.format,
        content: None,
        property: cli.property,
        context: context(&cli.resolve_args)?,
        resolve: cli.resolve,
        ignore_empty: cli.ignore_empty,
    };

    let tree = resolve_template(&request, &evaluator(&cli.resolve_args)?).await?;
    print(tree.as_ref(), cli.output.format, None)
}

fn compose_options(
    shorthand: Option<&str>,
    source: cli::SourceArgs,
    target: Option<String>,
    context: Context,
) -> anyhow::Result<ComposeOptions> {
    let mut options = ComposeOptions {
        stage: source.stage,
        module: source.module,
        path: source.path,
        target,
        context,
        ..Default::default()
    };

    if let Some(shorthand) = shorthand {
        let (stage, module, target) = cli::split_shorthand(shorthand)?;
        options.stage = Some(stage);
        options.module = Some(module);
        options.target = target.or(options.target);
    }

    Ok(options)
}

pub async fn get(cli: cli::GetCommand) -> anyhow::Result<()> {
    let options = compose_options(
        cli.shorthand.as_deref(),
        cli.source,
        cli.target,
        context(&cli.resolve_args)?,
    )?;

    let composed = compose_configs(&options, &evaluator(&cli.resolve_args)?, None).await?;
    let selected = tconf::query::select(
        composed.into_tree(),
        cli.property.as_deref(),
        cli.keys.as_deref(),
    )?;

    print(selected.as_ref(), cli.output.format, cli.prefix.as_deref())
}

pub async fn apply(cli: cli::ApplyCommand) -> anyhow::Result<()> {
    let options = compose_options(
        cli.shorthand.as_deref(),
        cli.source,
        cli.target,
        context(&cli.resolve_args)?,
    )?;

    compose_configs(
        &options,
        &evaluator(&cli.resolve_args)?,
        Some(&tconf::apply::FileWriter),
    )
    .await?;
    Ok(())
}

pub fn set(cli: cli::SetCommand) -> anyhow::Result<()> {
    let data = match (&cli.json, &cli.property) {
        (Some(json), _) => Value::parse_json(json)?,
        (None, Some(property)) => tconf::merge::merge_into(
            Value::Null,
            property,
            cli.value.map(Value::String).unwrap_or_default(),
        )?,
        (None, None) => anyhow::bail!("Either --property or --json must be specified"),
    };

    let request = tconf::apply::SetRequest {
        stage: cli.source.stage,
        cwd: None,
        module: cli.source.module,
        path: cli.source.path,
        format: cli.format,
        replace: cli.replace,
    };

    let path = tconf::apply::set_template(&request, data)?;
    tracing::info!(path=%path.display(), "template updated");
    Ok(())
}
