//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - resolves the layered configuration
//! - runs the requested stage(s)
//! - prints reports/plots

use clap::Parser;

use crate::cli::{Command, CommonArgs, FitArgs, PlotArgs, RunArgs};
use crate::config::{ConfigLayer, load_config_file};
use crate::domain::{AnalysisConfig, Artifact};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `quake` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is normal.
    dotenvy::dotenv().ok();

    // `quake` and `quake --bbox ...` behave like `quake run ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Preprocess(args) => handle_preprocess(args),
        Command::Partition(args) => handle_partition(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    crate::telemetry::init_tracing(args.common.verbose);
    let config = analysis_config(&args.common, Some(&args.fit))?;
    let run = pipeline::run_full(&config)?;

    println!("{}", crate::report::format_run_summary(&run, &config));
    if let Some(plot) = &run.plot.ascii {
        println!("{plot}");
    }

    fail_on_artifacts(run.artifacts())
}

fn handle_preprocess(args: CommonArgs) -> Result<(), AppError> {
    crate::telemetry::init_tracing(args.verbose);
    let config = analysis_config(&args, None)?;
    let out = pipeline::run_preprocess(&config)?;
    println!("{}", crate::report::format_preprocess_summary(&out, &config.input));
    Ok(())
}

fn handle_partition(args: CommonArgs) -> Result<(), AppError> {
    crate::telemetry::init_tracing(args.verbose);
    let config = analysis_config(&args, None)?;
    let out = pipeline::run_partition(&config)?;

    println!("{}", crate::report::format_partition_summary(&out, &config));
    println!("{}", crate::report::format_artifacts([&out.table]));

    fail_on_artifacts([&out.table])
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    crate::telemetry::init_tracing(args.common.verbose);
    let config = analysis_config(&args.common, Some(&args.fit))?;
    let table = args.table.clone().unwrap_or_else(|| config.energy_table_path());
    let out = pipeline::run_plot(&config, &table)?;

    println!("{}", crate::report::format_table_plot_summary(&out));
    if let Some(plot) = &out.plot.ascii {
        println!("{plot}");
    }

    fail_on_artifacts(out.plot.artifacts.iter())
}

/// Resolve CLI/env flags over the optional TOML file over defaults.
pub fn analysis_config(common: &CommonArgs, fit: Option<&FitArgs>) -> Result<AnalysisConfig, AppError> {
    let file = match &common.config {
        Some(path) => load_config_file(path)?,
        None => ConfigLayer::default(),
    };

    let mut cli = common.layer();
    cli.initial_guess = fit.and_then(|f| f.guess);

    let mut config = file.overlay(cli).resolve()?;
    if let Some(fit) = fit {
        config.plots = !fit.no_plots;
        config.ascii_plot = fit.ascii;
        config.plot_width = fit.width;
        config.plot_height = fit.height;
    }
    Ok(config)
}

/// Any failed artifact turns an otherwise finished run into an I/O error.
fn fail_on_artifacts<'a>(artifacts: impl IntoIterator<Item = &'a Artifact>) -> Result<(), AppError> {
    let failed: Vec<&str> = artifacts
        .into_iter()
        .filter(|a| a.is_failed())
        .map(|a| a.name)
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::io(format!("Failed to write: {}", failed.join(", "))))
    }
}

/// Rewrite argv so `quake` defaults to `quake run`.
///
/// Rules:
/// - `quake`                      -> `quake run`
/// - `quake --bbox ... ...`       -> `quake run --bbox ... ...`
/// - `quake --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "preprocess" | "partition" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactStatus;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rewrite_defaults_to_run() {
        assert_eq!(rewrite_args(argv(&["quake"])), argv(&["quake", "run"]));
        assert_eq!(
            rewrite_args(argv(&["quake", "--min-magnitude", "3"])),
            argv(&["quake", "run", "--min-magnitude", "3"])
        );
        assert_eq!(rewrite_args(argv(&["quake", "plot"])), argv(&["quake", "plot"]));
        assert_eq!(rewrite_args(argv(&["quake", "--help"])), argv(&["quake", "--help"]));
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quake.toml");
        std::fs::write(&path, "output_dir = \"from-file\"\nmin_magnitude = 3.0\ninitial_guess = [5.0, 0.3]\n").unwrap();

        let common = CommonArgs {
            config: Some(path),
            output_dir: Some(PathBuf::from("from-cli")),
            ..CommonArgs::default()
        };
        let fit = FitArgs {
            guess: None,
            no_plots: true,
            ascii: false,
            width: 60,
            height: 15,
        };
        let config = analysis_config(&common, Some(&fit)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("from-cli"));
        assert_eq!(config.filter.min_magnitude, Some(3.0));
        assert_eq!(config.initial_guess.a, 5.0);
        assert!(!config.plots);
        assert_eq!(config.plot_width, 60);
    }

    #[test]
    fn unreadable_config_is_config_error() {
        let common = CommonArgs {
            config: Some(PathBuf::from("/no/such/quake.toml")),
            ..CommonArgs::default()
        };
        let err = analysis_config(&common, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn failed_artifacts_map_to_io_error() {
        let ok = Artifact {
            name: "a.svg",
            path: PathBuf::from("a.svg"),
            status: ArtifactStatus::Written,
        };
        let bad = Artifact {
            name: "b.svg",
            path: PathBuf::from("b.svg"),
            status: ArtifactStatus::Failed("disk full".to_string()),
        };
        assert!(fail_on_artifacts([&ok]).is_ok());
        let err = fail_on_artifacts([&ok, &bad]).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("b.svg"));
    }
}
