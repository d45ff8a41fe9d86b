use std::path::Path;

use clap::Parser;
use queryscope::cli::app::{Cli, Command};

#[test]
fn parses_global_runtime_flags_for_run() {
    let cli = Cli::parse_from([
        "queryscope",
        "--home-dir",
        "/home/tester",
        "--data-dir",
        "/tmp/qs-data",
        "run",
        "SELECT 1",
        "--target",
        "app.sqlite",
        "--read-only",
        "--row-cap",
        "50",
    ]);

    assert_eq!(
        cli.runtime.home_dir.as_deref(),
        Some(Path::new("/home/tester"))
    );
    assert_eq!(
        cli.runtime.data_dir.as_deref(),
        Some(Path::new("/tmp/qs-data"))
    );
    assert!(cli.runtime.cwd.is_none());

    match cli.command {
        Command::Run(args) => {
            assert_eq!(args.sql, "SELECT 1");
            assert_eq!(args.target, Path::new("app.sqlite"));
            assert!(args.read_only);
            assert_eq!(args.row_cap, 50);
            assert!(!args.no_store);
        }
        other => panic!("expected run command, got {other:?}"),
    }
}

#[test]
fn run_requires_a_target() {
    let err = Cli::try_parse_from(["queryscope", "run", "SELECT 1"])
        .expect_err("missing --target must fail");
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn parses_analyze_json_flag() {
    let cli = Cli::parse_from(["queryscope", "analyze", "select * from t", "--json"]);

    match cli.command {
        Command::Analyze(args) => {
            assert!(args.json);
            assert_eq!(args.sql, "select * from t");
        }
        other => panic!("expected analyze command, got {other:?}"),
    }
}

#[test]
fn parses_estimate_with_defaults() {
    let cli = Cli::parse_from(["queryscope", "estimate", "telemetry.json"]);

    match cli.command {
        Command::Estimate(args) => {
            assert_eq!(args.input, Path::new("telemetry.json"));
            assert_eq!(args.elapsed_ms, 0.0);
            assert!(args.sql.is_empty());
        }
        other => panic!("expected estimate command, got {other:?}"),
    }
}

#[test]
fn history_show_conflicts_with_clear() {
    let cli = Cli::parse_from(["queryscope", "history", "--show", "7"]);
    match cli.command {
        Command::History(args) => {
            assert_eq!(args.show.as_deref(), Some("7"));
            assert_eq!(args.limit, 20);
            assert!(!args.clear);
        }
        other => panic!("expected history command, got {other:?}"),
    }

    let err = Cli::try_parse_from(["queryscope", "history", "--show", "7", "--clear"])
        .expect_err("--show and --clear must conflict");
    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
}

#[test]
fn parses_summary_and_schema_flags() {
    let cli = Cli::parse_from(["queryscope", "summary", "--json"]);
    assert!(matches!(cli.command, Command::Summary(args) if args.json && args.trend == 10));

    let cli = Cli::parse_from(["queryscope", "summary", "--trend", "5"]);
    assert!(matches!(cli.command, Command::Summary(args) if !args.json && args.trend == 5));

    let cli = Cli::parse_from(["queryscope", "schema", "--compact"]);
    assert!(matches!(cli.command, Command::Schema(args) if args.compact));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let err = Cli::try_parse_from(["queryscope", "snapshot"])
        .expect_err("unknown subcommand must fail");
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
}
