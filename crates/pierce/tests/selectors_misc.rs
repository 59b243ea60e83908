//! End-to-end selector scenarios: shadow piercing, `:index`, `:visible`
//! and auto-waiting against a live document.

#![allow(clippy::unwrap_used)]

use pierce::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn selectors() -> Selectors {
    Selectors::with_config(SelectorsConfig::default().with_poll_interval(10))
}

fn text_of(doc: &dyn DomView, node: NodeId) -> String {
    pierce::dom::normalize_whitespace(&doc.text_content(node))
}

fn deep_shadow() -> Document {
    DocumentFixture::load(fixture_path("deep-shadow.yaml"))
        .unwrap()
        .build()
        .unwrap()
}

/// `<section>` with three ordinal targets followed by a fourth candidate
fn ordinal_targets() -> (Document, NodeId) {
    let mut doc = Document::new();
    let body = doc.body();
    let section = doc.append_element(body, "section", &[]).unwrap();
    doc.append_element(section, "div", &[("id", "target1")]).unwrap();
    doc.append_element(section, "div", &[("id", "target2")]).unwrap();
    doc.append_element(section, "span", &[("id", "target3")]).unwrap();
    doc.append_element(section, "div", &[("id", "target4")]).unwrap();
    (doc, section)
}

/// Two present-but-empty `<div>` elements
fn empty_divs() -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    doc.append_element(body, "div", &[("id", "target1")]).unwrap();
    doc.append_element(body, "div", &[("id", "target2")]).unwrap();
    doc
}

fn attached(timeout_ms: u64) -> WaitOptions {
    WaitOptions::new()
        .with_state(WaitForState::Attached)
        .with_timeout(timeout_ms)
        .with_poll_interval(10)
}

mod shadow_tests {
    use super::*;

    #[test]
    fn test_id_pierces_nested_shadow_roots() {
        let doc = deep_shadow();
        let s = selectors();
        let found = s.query_selector(&doc, "id=target").unwrap().unwrap();
        assert_eq!(text_of(&doc, found), "Hello from root2");
        assert_eq!(s.query_selector_all(&doc, "id=target").unwrap().len(), 1);
        assert_eq!(s.query_selector(&doc, "id:light=target").unwrap(), None);
    }

    #[test]
    fn test_testid_document_order_and_closed_roots() {
        let doc = deep_shadow();
        let s = selectors();
        let all = s.query_selector_all(&doc, "data-testid=foo").unwrap();
        let texts: Vec<String> = all.iter().map(|n| text_of(&doc, *n)).collect();
        assert_eq!(
            texts,
            vec!["Hello from root1", "Hello from root2", "Hello from root3"]
        );
        assert_eq!(
            s.query_selector(&doc, "data-testid=foo")
                .unwrap()
                .map(|n| text_of(&doc, n)),
            Some("Hello from root1".to_string())
        );
        assert!(s
            .query_selector_all(&doc, "data-testid:light=foo")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_same_css_pierced_and_light() {
        let doc = deep_shadow();
        let s = selectors();
        assert_eq!(s.query_selector_all(&doc, "section span").unwrap().len(), 3);
        assert!(s
            .query_selector_all(&doc, "section span:light")
            .unwrap()
            .is_empty());
        assert!(s
            .query_selector_all(&doc, "css:light=section span")
            .unwrap()
            .is_empty());
        assert_eq!(s.query_selector_all(&doc, "section div:light").unwrap().len(), 2);
    }

    #[test]
    fn test_chain_scopes_into_host() {
        let doc = deep_shadow();
        let s = selectors();
        let inner = s
            .query_selector_all(&doc, "id=outer >> div.inner-host >> span")
            .unwrap();
        let texts: Vec<String> = inner.iter().map(|n| text_of(&doc, *n)).collect();
        assert_eq!(texts, vec!["Hello from root2", "Hello from root3"]);
        let by_text = s
            .query_selector(&doc, "id=outer >> text=\"Hello from root3\"")
            .unwrap()
            .unwrap();
        assert_eq!(text_of(&doc, by_text), "Hello from root3");
    }
}

mod index_tests {
    use super::*;

    #[test]
    fn test_index_selects_ordinal_targets() {
        let (doc, _) = ordinal_targets();
        let s = selectors();
        for n in 1..=3 {
            let found = s
                .query_selector(&doc, &format!(":index({n}, div, span)"))
                .unwrap()
                .unwrap();
            assert_eq!(doc.attribute(found, "id"), Some(format!("target{n}").as_str()));
        }
        let exact = s.query_selector_all(&doc, ":index(3, div, span)").unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(doc.attribute(exact[0], "id"), Some("target3"));
        assert_eq!(doc.tag_name(exact[0]), Some("span"));
    }

    #[test]
    fn test_index_past_union_is_empty_and_stable() {
        let (doc, _) = ordinal_targets();
        let s = selectors();
        for n in 5..12 {
            assert!(s
                .query_selector_all(&doc, &format!(":index({n}, div, span)"))
                .unwrap()
                .is_empty());
        }
        let first = s.query_selector_all(&doc, ":index(4, div, span)").unwrap();
        let second = s.query_selector_all(&doc, ":index(4, div, span)").unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_index_wait_times_out() {
        let (doc, _) = ordinal_targets();
        let shared = SharedDocument::new(doc);
        let started = Instant::now();
        let err = selectors()
            .wait_for_selector(&shared, ":index(5, div, span)", attached(100))
            .await
            .unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(matches!(err, PierceError::Timeout { ms: 100, .. }));
        assert!(err.to_string().contains("100ms"));
        assert!(err.to_string().contains(":index(5, div, span)"));
    }

    #[tokio::test]
    async fn test_index_wait_resolves_on_append() {
        let (doc, section) = ordinal_targets();
        let shared = SharedDocument::new(doc);
        let writer = shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer
                .mutate(|doc| doc.append_element(section, "span", &[("id", "late")]))
                .unwrap()
                .unwrap();
        });
        let found = selectors()
            .wait_for_selector(&shared, ":index(5, div, span)", attached(5_000))
            .await
            .unwrap()
            .unwrap();
        let snapshot = shared.read().unwrap();
        assert_eq!(snapshot.tag_name(found), Some("span"));
        assert_eq!(snapshot.attribute(found, "id"), Some("late"));
    }
}

mod visible_tests {
    use super::*;

    #[test]
    fn test_empty_divs_are_not_visible() {
        let doc = empty_divs();
        let s = selectors();
        assert_eq!(s.query_selector(&doc, "div:visible").unwrap(), None);
        assert_eq!(s.query_selector_all(&doc, "div").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_visible_wait_times_out() {
        let shared = SharedDocument::new(empty_divs());
        let err = selectors()
            .wait_for_selector(&shared, "div:visible", attached(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("100ms"));
    }

    #[tokio::test]
    async fn test_visible_wait_resolves_when_content_appears() {
        let shared = SharedDocument::new(empty_divs());
        let writer = shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer
                .mutate(|doc| {
                    let target2 = doc.children(doc.body())[1];
                    doc.set_text_content(target2, "Now visible")
                })
                .unwrap()
                .unwrap();
        });
        let s = selectors();
        let found = s
            .wait_for_selector(&shared, "div:visible", attached(5_000))
            .await
            .unwrap()
            .unwrap();
        let snapshot = shared.read().unwrap();
        assert_eq!(snapshot.attribute(found, "id"), Some("target2"));
        assert_eq!(s.query_selector(&*snapshot, "div:visible").unwrap(), Some(found));
    }

    #[tokio::test]
    async fn test_hidden_wait_after_display_none() {
        let mut doc = Document::new();
        let body = doc.body();
        let banner = doc.append_element(body, "p", &[("id", "banner")]).unwrap();
        doc.set_text_content(banner, "Loading").unwrap();
        let shared = SharedDocument::new(doc);
        let writer = shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer
                .mutate(|doc| doc.set_attribute(banner, "style", "display: none"))
                .unwrap()
                .unwrap();
        });
        let options = WaitOptions::new()
            .with_state(WaitForState::Hidden)
            .with_timeout(5_000);
        let found = selectors()
            .wait_for_selector(&shared, "id=banner", options)
            .await
            .unwrap();
        assert_eq!(found, None);
    }
}

mod wait_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_waits_do_not_interfere() {
        let (doc, section) = ordinal_targets();
        let shared = SharedDocument::new(doc);
        let s = Arc::new(selectors());
        let writer = shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer
                .mutate(|doc| doc.append_element(section, "p", &[("id", "para")]))
                .unwrap()
                .unwrap();
        });

        let (present, late, missing) = tokio::join!(
            s.wait_for_selector(&shared, "id=target3", attached(2_000)),
            s.wait_for_selector(&shared, "id=para", attached(2_000)),
            s.wait_for_selector(&shared, "id=never", attached(150)),
        );
        assert!(present.unwrap().is_some());
        assert!(late.unwrap().is_some());
        assert!(matches!(missing, Err(PierceError::Timeout { ms: 150, .. })));
    }

    #[tokio::test]
    async fn test_cancellation_ends_wait_early() {
        let shared = SharedDocument::new(empty_divs());
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let err = selectors()
            .wait_for_selector_with_cancel(&shared, "div:visible", attached(10_000), token)
            .await
            .unwrap_err();
        assert!(matches!(err, PierceError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_blocking_wait_sees_other_thread() {
        let shared = SharedDocument::new(empty_divs());
        let writer = shared.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            writer
                .mutate(|doc| {
                    let target1 = doc.children(doc.body())[0];
                    doc.set_text_content(target1, "ready")
                })
                .unwrap()
                .unwrap();
        });
        let found = selectors()
            .wait_for_selector_blocking(&shared, "div:visible", attached(5_000))
            .unwrap();
        handle.join().unwrap();
        let snapshot = shared.read().unwrap();
        assert_eq!(snapshot.attribute(found.unwrap(), "id"), Some("target1"));
    }

    #[tokio::test]
    async fn test_errors_surface_before_polling() {
        let shared = SharedDocument::new(empty_divs());
        let s = selectors();
        let started = Instant::now();
        let syntax = s
            .wait_for_selector(&shared, "div[", attached(10_000))
            .await
            .unwrap_err();
        assert!(matches!(syntax, PierceError::Syntax { .. }));
        let unknown = s
            .wait_for_selector(&shared, "nosuch=thing", attached(10_000))
            .await
            .unwrap_err();
        assert!(matches!(unknown, PierceError::UnknownEngine { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_locator_wait_and_text() {
        let shared = SharedDocument::new(deep_shadow());
        let locator = Locator::new(Arc::new(selectors()), shared, "id=target")
            .with_timeout(Duration::from_millis(500));
        assert!(locator.wait_for(WaitForState::Visible).await.unwrap().is_some());
        assert_eq!(
            locator.text_content().unwrap().as_deref(),
            Some("Hello from root2")
        );
    }
}

mod grammar_tests {
    use super::*;

    #[test]
    fn test_legacy_generation_is_queryable() {
        let legacy = Selectors::with_config(
            SelectorsConfig::default().with_grammar(GrammarGeneration::Legacy),
        );
        let extended = Selectors::with_config(
            SelectorsConfig::default().with_grammar(GrammarGeneration::Extended),
        );
        assert!(!legacy.supports_extended_grammar());
        assert!(extended.supports_extended_grammar());

        let doc = empty_divs();
        for selector in ["div:visible", ":index(1, div)", "div:light"] {
            if legacy.supports_extended_grammar() {
                continue;
            }
            assert!(matches!(
                legacy.query_selector(&doc, selector),
                Err(PierceError::Syntax { .. })
            ));
            assert!(extended.query_selector(&doc, selector).is_ok());
        }
        assert_eq!(legacy.query_selector_all(&doc, "div").unwrap().len(), 2);
    }

    #[test]
    fn test_custom_engine_in_global_registry() {
        struct LastElement;
        impl SelectorEngine for LastElement {
            fn query_all(&self, scope: &EngineScope<'_>, body: &str) -> Result<Vec<NodeId>, String> {
                let tag = body.trim();
                Ok(scope
                    .elements()
                    .into_iter()
                    .filter(|node| scope.dom().tag_name(*node) == Some(tag))
                    .last()
                    .into_iter()
                    .collect())
            }
        }

        let s = Selectors::new();
        s.register_engine("last-of", Arc::new(LastElement)).unwrap();
        assert!(matches!(
            s.register_engine("last-of", Arc::new(LastElement)),
            Err(PierceError::EngineAlreadyRegistered { .. })
        ));
        assert!(matches!(
            s.register_engine("css", Arc::new(LastElement)),
            Err(PierceError::EngineAlreadyRegistered { .. })
        ));
        let (doc, _) = ordinal_targets();
        let found = s.query_selector(&doc, "last-of=div").unwrap().unwrap();
        assert_eq!(doc.attribute(found, "id"), Some("target4"));
        assert!(Selectors::new().engine_names().contains(&"last-of".to_string()));
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_index_beyond_union_is_empty(extra in 1_usize..20) {
            let (doc, _) = ordinal_targets();
            let selector = format!(":index({}, div, span)", 4 + extra);
            prop_assert!(selectors().query_selector_all(&doc, &selector).unwrap().is_empty());
        }

        #[test]
        fn prop_light_never_reaches_shadow_content(testid in "[a-z]{1,6}") {
            let mut doc = Document::new();
            let body = doc.body();
            let host = doc.append_element(body, "div", &[]).unwrap();
            let root = doc.attach_shadow(host, ShadowRootMode::Open).unwrap();
            doc.append_element(root, "span", &[("data-testid", testid.as_str())]).unwrap();
            let s = selectors();
            let pierced = s.query_selector_all(&doc, &format!("data-testid={testid}")).unwrap();
            let light = s.query_selector_all(&doc, &format!("data-testid:light={testid}")).unwrap();
            prop_assert_eq!(pierced.len(), 1);
            prop_assert!(light.is_empty());
        }
    }
}
