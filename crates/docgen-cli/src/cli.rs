//! CLI argument definitions for the template converter.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "conga-docgen",
    version,
    about = "Convert Conga Composer templates to Box DocGen templates",
    long_about = "Convert Conga Composer merge templates to Box DocGen (handlebars) templates.\n\n\
                  Reads .docx and plain-text templates, rewrites every recognised tag in place\n\
                  without touching run formatting, and validates the result."
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

    /// Allow template text in trace-level logs.
    #[arg(long = "log-templates", global = true)]
    pub log_templates: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert one or more templates.
    Convert(ConvertArgs),

    /// Validate an already converted template.
    Validate(ValidateArgs),

    /// List the legacy tags found in a template.
    Tags(TagsArgs),
}

#[derive(Parser)]
pub struct ConvertArgs {
    /// Templates to convert (.docx, .txt, .hbs, .tmpl).
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (default: next to each input).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// JSON schema describing the merge data.
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Data queries (JSON object of name to query, or raw SOQL).
    #[arg(long = "query", value_name = "FILE")]
    pub query: Option<PathBuf>,

    /// Extra instructions passed to the AI adapter.
    #[arg(long = "instructions", value_name = "TEXT")]
    pub instructions: Option<String>,

    /// Configuration file.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Delegate tags no rule converts to Box AI.
    #[arg(long = "ai")]
    pub ai: bool,

    /// Convert and validate without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Write a JSON report of the batch.
    #[arg(long = "report", value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Output file name prefix (default: converted_).
    #[arg(long = "prefix", value_name = "TEXT")]
    pub prefix: Option<String>,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Converted template to check.
    #[arg(value_name = "CONVERTED")]
    pub converted: PathBuf,

    /// Original template, enables the conversion-quality check.
    #[arg(long = "original", value_name = "FILE")]
    pub original: Option<PathBuf>,

    /// JSON schema describing the merge data.
    #[arg(long = "schema", value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Configuration file.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ReportFormatArg,
}

#[derive(Parser)]
pub struct TagsArgs {
    /// Template to inspect.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Configuration file (for literal mappings).
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Table,
    Json,
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
