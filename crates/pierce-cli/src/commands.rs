//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use pierce::{GrammarGeneration, WaitForState};
use std::path::PathBuf;

/// Pierce: selector query engine with shadow-piercing matching and auto-waiting
#[derive(Parser, Debug)]
#[command(name = "pierce")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Selector grammar generation (overrides config and environment)
    #[arg(long, global = true)]
    pub grammar: Option<GrammarArg>,

    /// YAML file with selector settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a selector and print its canonical form
    Parse(ParseArgs),

    /// Query a document fixture once
    Query(QueryArgs),

    /// Wait until a selector reaches a state in a document fixture
    Wait(WaitArgs),

    /// List available selector engines
    Engines,
}

/// Arguments for the parse command
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Selector to parse
    pub selector: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the query command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Selector to evaluate
    pub selector: String,

    /// Document fixture (YAML, or JSON by extension)
    #[arg(short, long)]
    pub document: PathBuf,

    /// Print every match instead of the first
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the wait command
#[derive(Parser, Debug)]
pub struct WaitArgs {
    /// Selector to wait for
    pub selector: String,

    /// Document fixture (YAML, or JSON by extension)
    #[arg(short, long)]
    pub document: PathBuf,

    /// Target state
    #[arg(short, long, value_enum, default_value = "visible")]
    pub state: StateArg,

    /// Timeout in milliseconds (0 waits forever)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Fail when more than one element matches
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Grammar generation argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrammarArg {
    /// Plain css plus engine prefixes
    #[value(alias = "v1")]
    Legacy,
    /// Full grammar with `:visible`, `:index` and `:light`
    #[value(alias = "v2")]
    Extended,
}

impl From<GrammarArg> for GrammarGeneration {
    fn from(arg: GrammarArg) -> Self {
        match arg {
            GrammarArg::Legacy => Self::Legacy,
            GrammarArg::Extended => Self::Extended,
        }
    }
}

/// Wait state argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateArg {
    /// Present in the document
    Attached,
    /// Absent from the document
    Detached,
    /// Present and rendered with a non-empty box
    #[default]
    Visible,
    /// Absent or not rendered
    Hidden,
}

impl From<StateArg> for WaitForState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Attached => Self::Attached,
            StateArg::Detached => Self::Detached,
            StateArg::Visible => Self::Visible,
            StateArg::Hidden => Self::Hidden,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
