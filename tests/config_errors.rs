// tests/config_errors.rs

use std::io::Write;

use tempfile::NamedTempFile;
use rewind::config::{load_and_validate, load_from_str, validate_config};
use rewind::errors::RewindError;
use rewind::model::{ActionKey, ArtifactKind};
use rewind::types::BugReportMode;

fn write_graph(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

fn expect_config_error(contents: &str, needle: &str) {
    let file = write_graph(contents);
    match load_and_validate(file.path()) {
        Err(RewindError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "'{msg}' does not mention '{needle}'");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn valid_graph_loads_with_defaults() {
    let file = write_graph(
        r#"
[artifact."out/t"]
kind = "tree"
members = ["out/t/a"]

[action."//pkg:gen#0"]
mnemonic = "Genrule"
inputs = ["src/gen.sh"]
outputs = ["out/t"]

[action."//pkg:use#0"]
inputs = ["out/t"]
outputs = ["out/use"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.config.bug_report, BugReportMode::Log);
    assert_eq!(cfg.config.max_rewinds_per_action, 10);
    assert_eq!(cfg.producer_of("out/t"), Some(&ActionKey::new("//pkg:gen", 0)));
    assert_eq!(cfg.artifact_for("src/gen.sh").kind, ArtifactKind::Source);
    assert_eq!(cfg.artifact_for("out/use").kind, ArtifactKind::Derived);
    assert_eq!(cfg.artifact_for("out/t").kind, ArtifactKind::Tree);
    assert_eq!(cfg.action[&ActionKey::new("//pkg:use", 0)].mnemonic, "Action");
}

#[test]
fn cycle_returns_structured_error() {
    let file = write_graph(
        r#"
[action."//a:a#0"]
inputs = ["out/b"]
outputs = ["out/a"]

[action."//b:b#0"]
inputs = ["out/a"]
outputs = ["out/b"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(RewindError::GraphCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("//a:a#0") || msg.contains("//b:b#0"));
        }
        Err(e) => panic!("Expected GraphCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_graph_is_rejected() {
    expect_config_error("[config]\nbug_report = \"log\"\n", "at least one");
}

#[test]
fn zero_rewind_limit_is_rejected() {
    expect_config_error(
        r#"
[config]
max_rewinds_per_action = 0

[action."//a:a#0"]
outputs = ["out/a"]
"#,
        "max_rewinds_per_action",
    );
}

#[test]
fn malformed_action_key_is_rejected() {
    expect_config_error(
        r#"
[action."//a:a"]
outputs = ["out/a"]
"#,
        "invalid action key",
    );
}

#[test]
fn duplicate_producer_is_rejected() {
    expect_config_error(
        r#"
[action."//a:a#0"]
outputs = ["out/x"]

[action."//a:a#1"]
outputs = ["out/x"]
"#,
        "produced by both",
    );
}

#[test]
fn declared_derived_artifact_without_producer_is_rejected() {
    expect_config_error(
        r#"
[artifact."out/orphan"]
kind = "derived"

[action."//a:a#0"]
outputs = ["out/a"]
"#,
        "no producing action",
    );
}

#[test]
fn members_on_plain_artifact_are_rejected() {
    expect_config_error(
        r#"
[artifact."out/a"]
members = ["out/a/x"]

[action."//a:a#0"]
outputs = ["out/a"]
"#,
        "not a tree or runfiles",
    );
}

#[test]
fn expansion_of_unknown_action_is_rejected() {
    expect_config_error(
        r#"
[artifact."out/t"]
kind = "tree"
expanded_actions = ["//tpl:gen#7"]

[action."//a:a#0"]
inputs = ["out/t"]
"#,
        "unknown expanded action",
    );
}

#[test]
fn unknown_bug_report_mode_fails_to_parse() {
    let result = load_from_str("[config]\nbug_report = \"shout\"\n");
    assert!(matches!(result, Err(RewindError::TomlError(_))));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Rewind.toml"));
    assert!(matches!(result, Err(RewindError::IoError(_))));
}

#[test]
fn bug_report_mode_parses_case_insensitively() {
    assert_eq!("PANIC".parse::<BugReportMode>(), Ok(BugReportMode::Panic));
    assert_eq!(" log ".parse::<BugReportMode>(), Ok(BugReportMode::Log));
    assert!("shout".parse::<BugReportMode>().is_err());
}

#[test]
fn validate_config_checks_raw_description_in_place() {
    let raw = load_from_str(
        r#"
[action."//a:a#0"]
inputs = ["src/a.in"]
outputs = ["out/a"]
"#,
    )
    .unwrap();
    assert!(validate_config(&raw).is_ok());

    let raw = load_from_str(
        r#"
[artifact."src/a.in"]
kind = "source"

[action."//a:a#0"]
outputs = ["src/a.in"]
"#,
    )
    .unwrap();
    match validate_config(&raw) {
        Err(RewindError::ConfigError(msg)) => assert!(msg.contains("source artifact")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}
