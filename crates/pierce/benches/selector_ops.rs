//! Selector Operations Benchmarks
//!
//! Benchmarks for selector parsing, memoized parsing, and shadow-piercing
//! evaluation against documents of increasing size.
//!
//! Run with: `cargo bench --bench selector_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pierce::prelude::*;
use std::sync::Arc;

fn build_document(hosts: usize) -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    let section = doc.append_element(body, "section", &[]).unwrap();
    for i in 0..hosts {
        let host = doc
            .append_element(section, "div", &[("class", "host")])
            .unwrap();
        let root = doc.attach_shadow(host, ShadowRootMode::Open).unwrap();
        let item = doc
            .append_element(root, "span", &[("data-testid", "item")])
            .unwrap();
        doc.set_text_content(item, &format!("item {i}")).unwrap();
    }
    doc
}

fn isolated() -> Selectors {
    Selectors::with_config(SelectorsConfig::default().with_parse_cache_capacity(0))
        .with_registry(Arc::new(EngineRegistry::new()))
}

fn bench_selector_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_parsing");

    let selectors = vec![
        ("simple_id", "#my-button"),
        ("engine_prefix", "data-testid=submit"),
        ("light_engine", "id:light=target"),
        ("complex", "div.container > button.btn-primary:first-child"),
        ("nth_child", "li:nth-child(2n+1)"),
        ("visible", "div:visible"),
        ("index", ":index(2, div, span)"),
        ("chained", "section >> css=div.host >> text=\"item 3\""),
    ];

    for (name, selector) in selectors {
        group.bench_with_input(BenchmarkId::from_parameter(name), &selector, |bench, sel| {
            bench.iter(|| {
                let parsed = parse(black_box(sel), GrammarGeneration::Extended);
                black_box(parsed)
            });
        });
    }

    group.finish();
}

fn bench_parse_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_cache");

    for capacity in [0_usize, 256] {
        let cache = ParseCache::new(capacity);
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &cache,
            |bench, cache| {
                bench.iter(|| {
                    let parsed = cache.parse(
                        black_box("section > div.host:index(3, div, span)"),
                        GrammarGeneration::Extended,
                    );
                    black_box(parsed)
                });
            },
        );
    }

    group.finish();
}

fn bench_query_pierce_vs_light(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_pierce_vs_light");
    let selectors = isolated();

    for hosts in [10_usize, 100, 1000] {
        let doc = build_document(hosts);
        group.bench_with_input(BenchmarkId::new("pierce", hosts), &doc, |bench, doc| {
            bench.iter(|| {
                let found = selectors.query_selector_all(doc, black_box("data-testid=item"));
                black_box(found)
            });
        });
        group.bench_with_input(BenchmarkId::new("light", hosts), &doc, |bench, doc| {
            bench.iter(|| {
                let found = selectors.query_selector_all(doc, black_box("data-testid:light=item"));
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_pseudo_classes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pseudo_classes");
    let selectors = isolated();
    let doc = build_document(200);

    let cases = vec![
        ("visible", "span:visible"),
        ("index_first", ":index(1, span)"),
        ("index_last", ":index(200, div.host, span)"),
        ("has_text", "span:has-text(\"item 150\")"),
        ("not", "span:not(:first-child)"),
    ];

    for (name, selector) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &selector, |bench, sel| {
            bench.iter(|| {
                let found = selectors.query_selector(&doc, black_box(sel));
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_plan_reuse(c: &mut Criterion) {
    let selectors = isolated();
    let doc = build_document(100);
    let plan = selectors.plan("section >> div.host >> span").unwrap();

    c.bench_function("plan_evaluate_chain", |bench| {
        bench.iter(|| black_box(plan.evaluate(black_box(&doc))));
    });
}

criterion_group!(
    benches,
    bench_selector_parsing,
    bench_parse_cache,
    bench_query_pierce_vs_light,
    bench_pseudo_classes,
    bench_plan_reuse,
);
criterion_main!(benches);
