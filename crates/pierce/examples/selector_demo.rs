//! Selector Demo - Shadow-Piercing Queries and Auto-Waiting
//!
//! Demonstrates the Pierce selector grammar against an in-memory document
//! with nested shadow roots, and waits that resolve once the document
//! changes.
//!
//! # Running
//!
//! ```bash
//! cargo run --example selector_demo -p pierce
//! ```
//!
//! # Features
//!
//! - Engine prefixes (`id=`, `data-testid=`, `text=`)
//! - `:light` to stay out of shadow roots
//! - `:index(n, ...)` and `:visible`
//! - Waiting for attached/visible/hidden states

#![allow(clippy::uninlined_format_args, clippy::unwrap_used)]

use pierce::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const PAGE: &str = r"
body:
  - tag: section
    children:
      - tag: div
        attrs: { id: card }
        shadow:
          children:
            - tag: h2
              text: Account
            - tag: button
              attrs: { data-testid: save }
              text: Save
            - tag: button
              attrs: { data-testid: cancel }
              text: Cancel
      - tag: div
        attrs: { id: status }
";

#[tokio::main]
async fn main() {
    println!("=== Pierce Selector Demo ===\n");

    let doc = DocumentFixture::from_yaml_str(PAGE).unwrap().build().unwrap();

    // Demo 1: Parsing
    demo_parsing();

    // Demo 2: Piercing vs light
    demo_piercing(&doc);

    // Demo 3: Extended pseudo-classes
    demo_pseudo_classes(&doc);

    // Demo 4: Auto-waiting
    demo_waiting(SharedDocument::new(doc)).await;

    println!("\n=== Selector Demo Complete ===");
}

fn demo_parsing() {
    println!("--- Demo 1: Parsing ---\n");

    for selector in [
        "button.primary",
        "data-testid=save",
        "id:light=card",
        "section >> text=\"Save\"",
        ":index(2, button, a)",
    ] {
        let expression = parse(selector, GrammarGeneration::Extended).unwrap();
        println!("{:<28} -> {}", selector, expression);
    }

    let legacy = parse("div:visible", GrammarGeneration::Legacy);
    println!("\nLegacy grammar on 'div:visible': {}", legacy.unwrap_err());
    println!("Extended grammar active: {}", extended_grammar_enabled());
    println!();
}

fn demo_piercing(doc: &Document) {
    println!("--- Demo 2: Piercing vs Light ---\n");

    let selectors = Selectors::new();
    for selector in ["data-testid=save", "data-testid:light=save", "button", "button:light"] {
        let count = selectors.query_selector_all(doc, selector).unwrap().len();
        println!("{:<26} matches {}", selector, count);
    }
    println!();
}

fn demo_pseudo_classes(doc: &Document) {
    println!("--- Demo 3: Pseudo-classes ---\n");

    let selectors = Selectors::new();
    let second = selectors
        .query_selector(doc, ":index(2, button)")
        .unwrap()
        .unwrap();
    println!(":index(2, button) -> {:?}", doc.text_content(second));

    let visible = selectors.query_selector_all(doc, "div:visible").unwrap();
    println!("div:visible -> {} element(s) (#status is empty)", visible.len());

    let texty = selectors.query_selector(doc, "button:has-text(cancel)").unwrap();
    println!("button:has-text(cancel) -> {:?}", texty.map(|n| doc.text_content(n)));
    println!();
}

async fn demo_waiting(shared: SharedDocument) {
    println!("--- Demo 4: Auto-waiting ---\n");

    let selectors = Arc::new(Selectors::new());
    let writer = shared.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        writer
            .mutate(|doc| {
                let status = doc.children(doc.children(doc.body())[0])[1];
                doc.set_text_content(status, "Saved")
            })
            .unwrap()
            .unwrap();
    });

    let status = Locator::new(selectors.clone(), shared.clone(), "id=status")
        .with_timeout(Duration::from_secs(2));
    let options = WaitOptions::new()
        .with_state(WaitForState::Attached)
        .with_timeout(2_000);
    let result = selectors
        .wait(&shared, "#status:visible", options, None)
        .await
        .unwrap();
    println!(
        "#status:visible resolved after {:?} ({} ticks): {:?}",
        result.elapsed,
        result.ticks,
        status.text_content().unwrap()
    );

    let missing = Locator::new(selectors, shared, "text=Deleted")
        .with_timeout(Duration::from_millis(150));
    match missing.wait_for(WaitForState::Attached).await {
        Ok(found) => println!("unexpected match: {:?}", found),
        Err(err) => println!("text=Deleted -> {}", err),
    }
}
