//! Command-line definitions for `cqm`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cqm",
    version,
    about = "Convert between flat patient records and typed clinical events",
    long_about = "Convert between flat patient records and typed clinical event lists.\n\n\
                  Attribute mappings and code-system OIDs come from the verified standards\n\
                  directory (CQM_STANDARDS_DIR, or the bundled standards/)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a patient (typed event list) into a flat record.
    ToRecord(ToRecordArgs),

    /// Convert a flat record into a patient.
    ToPatient(ToPatientArgs),

    /// List code-system names and their OIDs.
    CodeSystems,

    /// List the event datatypes and how many attributes each maps.
    Datatypes,
}

#[derive(Parser)]
pub struct ToRecordArgs {
    /// Patient JSON file.
    #[arg(value_name = "PATIENT_JSON")]
    pub patient: PathBuf,

    /// Write the record here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep entries whose event carried no codes.
    #[arg(long = "keep-codeless")]
    pub keep_codeless: bool,
}

#[derive(Parser)]
pub struct ToPatientArgs {
    /// Record JSON file.
    #[arg(value_name = "RECORD_JSON")]
    pub record: PathBuf,

    /// Pre-materialized events (`{"TypeName": [event, ...]}`).
    ///
    /// Without it, events are materialized from the record with the
    /// attribute mapping table.
    #[arg(long = "materialized", value_name = "EVENTS_JSON")]
    pub materialized: Option<PathBuf>,

    /// Measure JSON (`source_data_criteria`, `value_sets`) used for
    /// characteristic codes and criterion OIDs.
    #[arg(long = "measure", value_name = "MEASURE_JSON")]
    pub measure: Option<PathBuf>,

    /// Write the patient here instead of stdout.
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Leave code-system names as they are instead of resolving OIDs.
    #[arg(long = "no-oid-resolution")]
    pub no_oid_resolution: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
