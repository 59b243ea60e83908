//! CLI configuration

use crate::error::{CliError, CliResult};
use pierce::{GrammarGeneration, SelectorsConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Map `-q` and the `-v` count to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default tracing filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "pierce=debug,info",
            Self::Debug => "pierce=trace,debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Grammar override from `--grammar`
    pub grammar: Option<GrammarGeneration>,
    /// Selector configuration file from `--config`
    pub config_file: Option<PathBuf>,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Force a grammar generation
    #[must_use]
    pub const fn with_grammar(mut self, grammar: Option<GrammarGeneration>) -> Self {
        self.grammar = grammar;
        self
    }

    /// Read selector settings from a YAML file
    #[must_use]
    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Selector configuration: file, then `PIERCE_*` environment, then `--grammar`
    pub fn selectors_config(&self) -> CliResult<SelectorsConfig> {
        self.selectors_config_with(|key| std::env::var(key).ok())
    }

    /// [`selectors_config`](Self::selectors_config) with an explicit environment
    pub fn selectors_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CliResult<SelectorsConfig> {
        let base = match &self.config_file {
            Some(path) => load_file(path)?,
            None => SelectorsConfig::default(),
        };
        let config = base.with_env_overrides(lookup)?;
        Ok(match self.grammar {
            Some(grammar) => config.with_grammar(grammar),
            None => config,
        })
    }
}

fn load_file(path: &Path) -> CliResult<SelectorsConfig> {
    SelectorsConfig::load(path)
        .map_err(|e| CliError::config(format!("cannot load {}: {e}", path.display())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_verbosity() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Debug);
        }

        #[test]
        fn test_is_quiet_and_verbose() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_quiet());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Verbose.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
        }

        #[test]
        fn test_log_filter() {
            assert_eq!(Verbosity::Quiet.log_filter(), "error");
            assert!(Verbosity::Debug.log_filter().contains("pierce=trace"));
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_forced_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod selectors_config_tests {
        use super::*;

        #[test]
        fn test_defaults_without_file_or_env() {
            let config = CliConfig::new().selectors_config_with(|_| None).unwrap();
            assert_eq!(config, SelectorsConfig::default());
        }

        #[test]
        fn test_grammar_flag_beats_env() {
            let config = CliConfig::new()
                .with_grammar(Some(GrammarGeneration::Extended))
                .selectors_config_with(|key| {
                    (key == pierce::ENV_GRAMMAR).then(|| "legacy".to_string())
                })
                .unwrap();
            assert_eq!(config.grammar, GrammarGeneration::Extended);
        }

        #[test]
        fn test_env_beats_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("pierce.yaml");
            std::fs::write(&path, "grammar: legacy\npoll_interval_ms: 5\n").unwrap();
            let config = CliConfig::new()
                .with_config_file(Some(path))
                .selectors_config_with(|key| {
                    (key == pierce::ENV_POLL_INTERVAL_MS).then(|| "20".to_string())
                })
                .unwrap();
            assert_eq!(config.grammar, GrammarGeneration::Legacy);
            assert_eq!(config.poll_interval_ms, 20);
        }

        #[test]
        fn test_missing_file_is_config_error() {
            let err = CliConfig::new()
                .with_config_file(Some(PathBuf::from("/no/such/pierce.yaml")))
                .selectors_config_with(|_| None)
                .unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
        }
    }
}
