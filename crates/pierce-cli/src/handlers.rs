//! Command handlers.
//!
//! Each handler renders its result to a string so `main` decides where it
//! goes; failures come back as [`CliError`].

use crate::commands::{FormatArg, ParseArgs, QueryArgs, WaitArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ElementReport;
use pierce::prelude::*;
use serde_json::json;

fn selectors(config: &CliConfig) -> CliResult<Selectors> {
    Ok(Selectors::with_config(config.selectors_config()?))
}

fn load_document(path: &std::path::Path) -> CliResult<Document> {
    let fixture = DocumentFixture::load(path).map_err(|e| {
        CliError::invalid_argument(format!("cannot load document {}: {e}", path.display()))
    })?;
    Ok(fixture.build()?)
}

/// `pierce parse`
pub fn run_parse(config: &CliConfig, args: &ParseArgs) -> CliResult<String> {
    let selectors = selectors(config)?;
    let expression = selectors.parse(&args.selector)?;
    tracing::debug!(selector = %args.selector, grammar = %selectors.grammar(), "parsed selector");
    match args.format {
        FormatArg::Text => Ok(expression.to_string()),
        FormatArg::Json => Ok(serde_json::to_string_pretty(&json!({
            "selector": args.selector,
            "canonical": expression.to_string(),
            "grammar": selectors.grammar(),
            "engines": expression.engine_names(),
            "expression": &*expression,
        }))?),
    }
}

/// `pierce query`
pub fn run_query(config: &CliConfig, args: &QueryArgs) -> CliResult<String> {
    let selectors = selectors(config)?;
    let doc = load_document(&args.document)?;
    let matches = if args.all {
        selectors.query_selector_all(&doc, &args.selector)?
    } else {
        selectors
            .query_selector(&doc, &args.selector)?
            .into_iter()
            .collect()
    };
    tracing::debug!(selector = %args.selector, matches = matches.len(), "query finished");
    if matches.is_empty() {
        return Err(CliError::no_match(&args.selector));
    }
    let reports: Vec<ElementReport> = matches
        .into_iter()
        .map(|node| ElementReport::new(&doc, node))
        .collect();
    render_reports(&reports, args.format)
}

fn render_reports(reports: &[ElementReport], format: FormatArg) -> CliResult<String> {
    match format {
        FormatArg::Text => Ok(reports
            .iter()
            .map(ElementReport::to_line)
            .collect::<Vec<_>>()
            .join("\n")),
        FormatArg::Json => Ok(serde_json::to_string_pretty(reports)?),
    }
}

/// `pierce wait`: the fixture is static, so this either resolves on the
/// first pass or runs into the timeout
pub fn run_wait(config: &CliConfig, args: &WaitArgs) -> CliResult<String> {
    let selectors_config = config.selectors_config()?;
    let options = WaitOptions::new()
        .with_state(args.state.into())
        .with_timeout(args.timeout.unwrap_or(selectors_config.default_timeout_ms))
        .with_poll_interval(
            args.poll_interval
                .unwrap_or(selectors_config.poll_interval_ms),
        )
        .with_strict(args.strict);
    let selectors = Selectors::with_config(selectors_config);
    let shared = SharedDocument::new(load_document(&args.document)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let result = runtime.block_on(selectors.wait(&shared, &args.selector, options, None))?;

    let snapshot = shared.read()?;
    let report = result
        .element
        .map(|node| ElementReport::new(&snapshot, node));
    let elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX);
    match args.format {
        FormatArg::Text => Ok(match report {
            Some(report) => format!(
                "{} after {elapsed_ms}ms: {}",
                result.state,
                report.to_line()
            ),
            None => format!("{} after {elapsed_ms}ms", result.state),
        }),
        FormatArg::Json => Ok(serde_json::to_string_pretty(&json!({
            "selector": args.selector,
            "state": result.state,
            "elapsed_ms": elapsed_ms,
            "ticks": result.ticks,
            "element": report,
        }))?),
    }
}

/// `pierce engines`
pub fn run_engines(config: &CliConfig) -> CliResult<String> {
    Ok(selectors(config)?.engine_names().join("\n"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::StateArg;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const PAGE: &str = r"
body:
  - tag: section
    children:
      - tag: div
        attrs: { id: host }
        shadow:
          children:
            - tag: span
              attrs: { id: target }
              text: Hello from root
      - tag: div
        attrs: { id: empty }
";

    fn page() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.yaml");
        std::fs::write(&path, PAGE).unwrap();
        (dir, path)
    }

    fn config() -> CliConfig {
        CliConfig::new().with_grammar(Some(GrammarGeneration::Extended))
    }

    fn query(selector: &str, document: PathBuf, all: bool) -> QueryArgs {
        QueryArgs {
            selector: selector.to_string(),
            document,
            all,
            format: FormatArg::Text,
        }
    }

    fn wait(selector: &str, document: PathBuf, state: StateArg, timeout: u64) -> WaitArgs {
        WaitArgs {
            selector: selector.to_string(),
            document,
            state,
            timeout: Some(timeout),
            poll_interval: Some(10),
            strict: false,
            format: FormatArg::Text,
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_canonical_text() {
            let args = ParseArgs {
                selector: "ID:light=target".to_string(),
                format: FormatArg::Text,
            };
            assert_eq!(run_parse(&config(), &args).unwrap(), "id:light=target");
        }

        #[test]
        fn test_json() {
            let args = ParseArgs {
                selector: "section >> text=Hello".to_string(),
                format: FormatArg::Json,
            };
            let out: serde_json::Value =
                serde_json::from_str(&run_parse(&config(), &args).unwrap()).unwrap();
            assert_eq!(out["grammar"], "extended");
            assert_eq!(out["engines"], json!(["css", "text"]));
        }

        #[test]
        fn test_legacy_rejects_visible() {
            let args = ParseArgs {
                selector: "div:visible".to_string(),
                format: FormatArg::Text,
            };
            let legacy = CliConfig::new().with_grammar(Some(GrammarGeneration::Legacy));
            let err = run_parse(&legacy, &args).unwrap_err();
            assert!(matches!(err, CliError::Pierce(PierceError::Syntax { .. })));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_pierced_match() {
            let (_dir, path) = page();
            let out = run_query(&config(), &query("id=target", path, false)).unwrap();
            assert!(out.contains("Hello from root"));
            assert!(out.contains("in shadow of div#host"));
        }

        #[test]
        fn test_light_no_match() {
            let (_dir, path) = page();
            let err = run_query(&config(), &query("id:light=target", path, false)).unwrap_err();
            assert!(matches!(err, CliError::NoMatch { .. }));
        }

        #[test]
        fn test_all_json() {
            let (_dir, path) = page();
            let mut args = query("div", path, true);
            args.format = FormatArg::Json;
            let out: serde_json::Value =
                serde_json::from_str(&run_query(&config(), &args).unwrap()).unwrap();
            assert_eq!(out.as_array().unwrap().len(), 2);
        }

        #[test]
        fn test_missing_document() {
            let err = run_query(&config(), &query("div", PathBuf::from("/no/page.yaml"), false))
                .unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
        }
    }

    mod wait_tests {
        use super::*;

        #[test]
        fn test_visible_resolves() {
            let (_dir, path) = page();
            let out = run_wait(&config(), &wait("id=target", path, StateArg::Visible, 1_000))
                .unwrap();
            assert!(out.starts_with("visible after"));
        }

        #[test]
        fn test_hidden_for_empty_div() {
            let (_dir, path) = page();
            let out =
                run_wait(&config(), &wait("id=empty", path, StateArg::Hidden, 1_000)).unwrap();
            assert!(out.starts_with("hidden after"));
        }

        #[test]
        fn test_timeout_message() {
            let (_dir, path) = page();
            let err = run_wait(&config(), &wait("id=empty", path, StateArg::Visible, 100))
                .unwrap_err();
            assert!(err.to_string().contains("100ms"));
        }
    }

    #[test]
    fn test_engines_lists_builtins() {
        let out = run_engines(&config()).unwrap();
        for name in ["css", "id", "data-testid", "text"] {
            assert!(out.lines().any(|line| line == name), "missing {name}");
        }
    }
}
