//! Pierce CLI: selector queries against document fixtures
//!
//! ## Usage
//!
//! ```bash
//! pierce parse 'id:light=target'                       # Canonical form
//! pierce query 'data-testid=foo' -d page.yaml --all    # Every match
//! pierce wait 'div:visible' -d page.yaml --timeout 100 # Wait or time out
//! pierce engines                                       # Engine names
//! ```

use clap::Parser;
use pierce_cli::{
    handlers, init_tracing, Cli, CliConfig, CliResult, ColorChoice, Commands, Reporter, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Build configuration from CLI args
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    if config.verbosity.is_verbose() {
        let selectors_config = config.selectors_config()?;
        reporter.info(&format!(
            "grammar {}, poll interval {}ms",
            reporter.emphasize(selectors_config.grammar.as_str()),
            selectors_config.poll_interval_ms
        ));
    }

    let output = match &cli.command {
        Commands::Parse(args) => handlers::run_parse(&config, args)?,
        Commands::Query(args) => handlers::run_query(&config, args)?,
        Commands::Wait(args) => handlers::run_wait(&config, args)?,
        Commands::Engines => handlers::run_engines(&config)?,
    };
    reporter.result(&output);
    Ok(())
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_grammar(cli.grammar.map(Into::into))
        .with_config_file(cli.config.clone())
}
