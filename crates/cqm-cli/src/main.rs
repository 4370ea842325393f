//! `cqm`: record ↔ patient conversion from the command line.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cqm_cli::commands::{
    load_registry, run_code_systems, run_datatypes, run_to_patient, run_to_record,
};
use cqm_cli::logging::{LogConfig, LogFormat, init_logging};
use cqm_core::ConverterOptions;
use tracing::info;
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli.command) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(command: Command) -> Result<()> {
    let registry = load_registry()?;
    match command {
        Command::ToRecord(args) => {
            let options =
                ConverterOptions::default().with_codeless_entries_dropped(!args.keep_codeless);
            let entries =
                run_to_record(&registry, &args.patient, args.output.as_deref(), options)?;
            info!(entries, "record written");
        }
        Command::ToPatient(args) => {
            let options = ConverterOptions::default().with_oid_resolution(!args.no_oid_resolution);
            let events = run_to_patient(
                &registry,
                &args.record,
                args.materialized.as_deref(),
                args.measure.as_deref(),
                args.output.as_deref(),
                options,
            )?;
            info!(events, "patient written");
        }
        Command::CodeSystems => run_code_systems(&registry),
        Command::Datatypes => run_datatypes(&registry)?,
    }
    Ok(())
}

/// `--log-level` wins over `-v/-q`; either one disables `RUST_LOG`.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::default().with_level_filter(cli.verbosity.tracing_level_filter());
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config = config
        .with_format(match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        })
        .with_log_file(cli.log_file.clone());
    config.with_ansi(match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    })
}
