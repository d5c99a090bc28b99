//! Composition against config files on disk

use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tconf::apply::FileWriter;
use tconf::compose::{compose_configs_blocking, ComposeOptions, Composed};
use tconf::environment::MapEnvironment;
use tconf::evaluator::Evaluator;
use tconf::format::{parse_document, render, Format, OutputFormat};
use tconf::source::{resolve_template_blocking, TemplateRequest};

const API_TEMPLATE: &str = r#"
mysection:
  myparameter: myvalue
customsection:
  myparameter: ${func:stage}
"#;

const CONFIG: &str = r#"
configs:
  - name: api
    destination: out/api.env
    values:
      - name: "@"
        templateModule: api
      - name: customsection__extra
        valueFrom: env:EXTRA
  - name: web
    destination: out/web.json
    values:
      - name: api
        templateModule: api
        resolve: only
      - name: missing
        templateModule: nope
        ignoreEmpty: true
      - name: web.port
        value: 8080
"#;

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join(".config");
    std::fs::create_dir_all(&config).unwrap();
    std::fs::write(config.join("dev.api.yml"), API_TEMPLATE).unwrap();
    std::fs::write(config.join("dev.config.yml"), CONFIG).unwrap();
    dir
}

fn evaluator() -> Evaluator {
    Evaluator::without_secrets(Arc::new(MapEnvironment::new().with("EXTRA", "x")))
}

fn options(cwd: &Path) -> ComposeOptions {
    ComposeOptions {
        stage: Some("dev".to_string()),
        cwd: Some(cwd.to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn template_to_env() {
    let dir = workspace();
    let request = TemplateRequest {
        stage: Some("dev".to_string()),
        cwd: Some(dir.path().to_path_buf()),
        module: Some("api".to_string()),
        ..Default::default()
    };

    let tree = resolve_template_blocking(&request, &evaluator()).unwrap();
    assert_eq!(
        render(tree.as_ref(), OutputFormat::Env, None).unwrap(),
        "mysection__myparameter=\"myvalue\"\ncustomsection__myparameter=\"dev\""
    );
}

#[test]
fn compose_target() {
    let dir = workspace();
    let options = ComposeOptions {
        target: Some("api".to_string()),
        ..options(dir.path())
    };

    let composed = compose_configs_blocking(&options, &evaluator(), None).unwrap();
    let Composed::Target(tree) = composed else {
        panic!("expected the target tree");
    };

    assert_eq!(
        render(tree.as_ref(), OutputFormat::Env, Some("APP_")).unwrap(),
        [
            r#"APP_mysection__myparameter="myvalue""#,
            r#"APP_customsection__myparameter="dev""#,
            r#"APP_customsection__extra="x""#,
        ]
        .join("\n")
    );

    // compose does not write
    assert!(!dir.path().join("out").exists());
}

#[test]
fn apply_writes_destinations() {
    let dir = workspace();

    let composed = compose_configs_blocking(&options(dir.path()), &evaluator(), Some(&FileWriter)).unwrap();
    let Composed::Trees(trees) = composed else {
        panic!("expected all trees");
    };
    assert_eq!(trees.keys().collect::<Vec<_>>(), vec!["api", "web"]);

    let api = std::fs::read_to_string(dir.path().join("out/api.env")).unwrap();
    assert_eq!(
        api,
        "mysection__myparameter=\"myvalue\"\ncustomsection__myparameter=\"dev\"\ncustomsection__extra=\"x\""
    );

    let web = std::fs::read_to_string(dir.path().join("out/web.json")).unwrap();
    assert_eq!(
        parse_document(&web, Format::Json).unwrap(),
        tconf::document!(r#"{"api": {"customsection": {"myparameter": "dev"}}, "web": {"port": 8080}}"#)
    );
}

#[test]
fn missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = compose_configs_blocking(&options(dir.path()), &evaluator(), None).unwrap_err();
    assert!(matches!(err, tconf::Error::ConfigNotFound(_)));
}
