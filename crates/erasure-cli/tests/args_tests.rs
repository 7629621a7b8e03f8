use super::args::{CliArgs, Command};
use super::tracing_config::LogFormat;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_parses_analyze() {
    let args = CliArgs::try_parse_from(["erasure", "analyze", "query.json"])
        .expect("analyze should parse");
    assert_eq!(
        args.command,
        Command::Analyze {
            file: PathBuf::from("query.json")
        }
    );
}

#[test]
fn test_parses_rewrite_flags() {
    let args = CliArgs::try_parse_from([
        "erasure",
        "rewrite",
        "query.json",
        "--options",
        r#"{"eraseEnums":false}"#,
        "--compact",
    ])
    .expect("rewrite should parse");
    assert_eq!(
        args.command,
        Command::Rewrite {
            file: PathBuf::from("query.json"),
            options: Some(r#"{"eraseEnums":false}"#.to_string()),
            compact: true,
        }
    );

    let args = CliArgs::try_parse_from(["erasure", "rewrite", "q.json"]).unwrap();
    assert!(matches!(
        args.command,
        Command::Rewrite {
            options: None,
            compact: false,
            ..
        }
    ));
}

#[test]
fn test_rejects_missing_file_and_unknown_command() {
    assert!(CliArgs::try_parse_from(["erasure", "analyze"]).is_err());
    assert!(CliArgs::try_parse_from(["erasure", "compile", "q.json"]).is_err());
    assert!(CliArgs::try_parse_from(["erasure"]).is_err());
}

#[test]
fn test_log_format_names() {
    assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
    assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
    assert_eq!(LogFormat::parse(""), LogFormat::Text);
    assert_eq!(LogFormat::parse("fancy"), LogFormat::Text);
}
