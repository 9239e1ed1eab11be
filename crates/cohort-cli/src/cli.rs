//! CLI argument definitions for the cohort tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort",
    version,
    about = "Retrospective cohort construction - label admissions and match on propensity",
    long_about = "Build a labeled cohort from time-stamped clinical criteria.\n\n\
                  `label` derives the staged condition flags, labels each subject's latest\n\
                  admission and writes labels.csv (and diagnosis_features.csv when a\n\
                  diagnosis table is given). `match` pairs treated and untreated\n\
                  subjects on their propensity scores and writes matches.csv."
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

    /// Log output format (pretty for human, json for machine parsing).
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
    /// Derive stage flags and label each subject's latest admission.
    Label(LabelArgs),

    /// Greedy caliper matching of treated to untreated subjects.
    Match(MatchArgs),
}

#[derive(Parser)]
pub struct LabelArgs {
    /// Folder holding the input CSV files.
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Output directory for labels.csv (default: <DATA_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON options file; flags below override its values.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Time-stamped criteria (stage A), relative to DATA_DIR.
    #[arg(long = "criteria", value_name = "FILE", default_value = "criteria.csv")]
    pub criteria: PathBuf,

    /// Admission-level infection evidence; repeat for several sources.
    #[arg(
        long = "infection",
        value_name = "FILE",
        default_values = ["icd9_infection.csv", "note_infection.csv"]
    )]
    pub infections: Vec<PathBuf>,

    /// Admission-level organ dysfunction attribute (stage B).
    #[arg(long = "dysfunction", value_name = "FILE", default_value = "organ_dysfunction.csv")]
    pub dysfunction: PathBuf,

    /// Stay-level timed attributes (stage C); repeat for several sources.
    #[arg(
        long = "terminal-attribute",
        value_name = "FILE",
        default_values = ["hypotension.csv", "fluid.csv"]
    )]
    pub terminal_attributes: Vec<PathBuf>,

    /// Admission windows.
    #[arg(long = "admissions", value_name = "FILE", default_value = "admissions.csv")]
    pub admissions: PathBuf,

    /// Diagnosis table; when given, diagnosis_features.csv is written as well.
    #[arg(long = "diagnoses", value_name = "FILE")]
    pub diagnoses: Option<PathBuf>,

    /// Hours after admission before which a terminal flag excludes the admission.
    #[arg(long = "exclusion-window-hours", value_name = "HOURS")]
    pub exclusion_window_hours: Option<f64>,

    /// Only process the N smallest subject ids.
    #[arg(long = "development-subjects", value_name = "N")]
    pub development_subjects: Option<usize>,

    /// Label and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct MatchArgs {
    /// CSV with subject id, propensity score and treatment indicator columns.
    #[arg(value_name = "SCORES")]
    pub scores: PathBuf,

    /// Output directory for matches.csv (default: the folder of SCORES).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON options file; flags below override its values.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Match distance limit in logit standard deviations.
    #[arg(long = "caliper", value_name = "SD")]
    pub caliper: Option<f64>,

    /// Match and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
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
