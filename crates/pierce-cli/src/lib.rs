//! Pierce CLI Library
//!
//! Command-line interface for the Pierce selector engine: parse selectors,
//! query document fixtures and wait for target states.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, FormatArg, GrammarArg, ParseArgs, QueryArgs, StateArg, WaitArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{ElementReport, Reporter};

/// Install the `tracing` subscriber on stderr; `RUST_LOG` wins over `verbosity`
pub fn init_tracing(verbosity: Verbosity) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
