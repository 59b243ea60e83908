//! Tree matcher: evaluates a parsed selector against a document.
//!
//! A [`QueryPlan`] binds every clause of a [`SelectorExpression`] to its
//! resolved engine once, before the first evaluation. Each call to
//! [`QueryPlan::evaluate`] is one read-only pass over the tree.

mod css;
mod pseudo;
mod traversal;

pub use css::CssMatcher;
pub use pseudo::is_visible;
pub use traversal::{descendants, element_parent, element_siblings, DocumentOrder, TraversalMode};

use crate::dom::{DomView, NodeId};
use crate::engine::{
    match_attribute, unquote, Engine, EngineRegistry, EngineScope, SelectorEngine, TextMatcher,
};
use crate::result::{PierceError, PierceResult};
use crate::selector::{ClauseBody, SelectorExpression, SelectorList};
use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

enum ClausePlan {
    Css(SelectorList),
    Attribute {
        attribute: &'static str,
        value: String,
    },
    Text(TextMatcher),
    Custom {
        engine: Arc<dyn SelectorEngine>,
        body: String,
    },
}

struct PlannedClause {
    mode: TraversalMode,
    plan: ClausePlan,
}

/// A selector with its engines resolved and bodies compiled
pub struct QueryPlan {
    selector: String,
    expression: Arc<SelectorExpression>,
    clauses: Vec<PlannedClause>,
}

impl fmt::Debug for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlan")
            .field("selector", &self.selector)
            .field("clauses", &self.clauses.len())
            .finish()
    }
}

impl QueryPlan {
    /// Resolve engines and compile clause bodies.
    ///
    /// Fails with `UnknownEngine` for unregistered engines and `Syntax` for
    /// bodies an engine cannot compile (e.g. a bad text pattern).
    pub fn compile(
        selector: &str,
        expression: Arc<SelectorExpression>,
        registry: &EngineRegistry,
    ) -> PierceResult<Self> {
        let engines = registry.resolve_expression(&expression, selector)?;
        let clauses = expression
            .clauses
            .iter()
            .zip(engines)
            .map(|(clause, engine)| {
                let raw = match &clause.body {
                    ClauseBody::Css(list) if matches!(engine, Engine::Css) => {
                        return Ok(PlannedClause {
                            mode: TraversalMode::from_light(clause.light),
                            plan: ClausePlan::Css(list.clone()),
                        });
                    }
                    ClauseBody::Css(list) => list.to_string(),
                    ClauseBody::Raw(body) => body.clone(),
                };
                let plan = match engine {
                    Engine::Css => {
                        return Err(PierceError::syntax(selector, "css clause was not parsed"));
                    }
                    Engine::Attribute(attribute) => ClausePlan::Attribute {
                        attribute,
                        value: unquote(&raw),
                    },
                    Engine::Text => ClausePlan::Text(
                        TextMatcher::compile(&raw)
                            .map_err(|message| PierceError::syntax(selector, message))?,
                    ),
                    Engine::Custom(engine) => ClausePlan::Custom { engine, body: raw },
                };
                Ok(PlannedClause {
                    mode: TraversalMode::from_light(clause.light),
                    plan,
                })
            })
            .collect::<PierceResult<Vec<_>>>()?;
        Ok(Self {
            selector: selector.to_string(),
            expression,
            clauses,
        })
    }

    /// The selector as written by the caller
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The parsed expression
    #[must_use]
    pub fn expression(&self) -> &SelectorExpression {
        &self.expression
    }

    /// All matches from the document root, in document order
    pub fn evaluate(&self, dom: &dyn DomView) -> PierceResult<Vec<NodeId>> {
        self.evaluate_from(dom, dom.document())
    }

    /// All matches below `root` (exclusive), in document order
    pub fn evaluate_from(&self, dom: &dyn DomView, root: NodeId) -> PierceResult<Vec<NodeId>> {
        let order: OnceCell<DocumentOrder> = OnceCell::new();
        let mut scopes = vec![root];
        for clause in &self.clauses {
            let mut matches = Vec::new();
            for &scope in &scopes {
                matches.extend(self.evaluate_clause(dom, clause, scope)?);
            }
            if scopes.len() > 1 || matches!(clause.plan, ClausePlan::Custom { .. }) {
                order
                    .get_or_init(|| DocumentOrder::new(dom))
                    .sort_dedup(&mut matches);
            }
            if matches.is_empty() {
                return Ok(matches);
            }
            scopes = matches;
        }
        Ok(scopes)
    }

    /// First match in document order
    pub fn first(&self, dom: &dyn DomView) -> PierceResult<Option<NodeId>> {
        Ok(self.evaluate(dom)?.into_iter().next())
    }

    fn evaluate_clause(
        &self,
        dom: &dyn DomView,
        clause: &PlannedClause,
        scope: NodeId,
    ) -> PierceResult<Vec<NodeId>> {
        match &clause.plan {
            ClausePlan::Css(list) => Ok(CssMatcher::new(dom, scope, clause.mode).query(list)),
            ClausePlan::Attribute { attribute, value } => {
                let candidates = descendants(dom, scope, clause.mode);
                Ok(match_attribute(dom, &candidates, attribute, value))
            }
            ClausePlan::Text(matcher) => {
                Ok(matcher.query(dom, &descendants(dom, scope, clause.mode)))
            }
            ClausePlan::Custom { engine, body } => {
                let engine_scope = EngineScope::new(dom, scope, clause.mode);
                let found = engine.query_all(&engine_scope, body).map_err(|message| {
                    PierceError::Evaluation {
                        selector: self.selector.clone(),
                        message,
                    }
                })?;
                // Engines only get to answer for their own scope
                let in_scope: HashSet<NodeId> = engine_scope.elements().into_iter().collect();
                Ok(found
                    .into_iter()
                    .filter(|node| in_scope.contains(node))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::GrammarGeneration;
    use crate::dom::{Document, ShadowRootMode};
    use crate::selector::parse;

    fn plan(selector: &str, registry: &EngineRegistry) -> QueryPlan {
        let expression = Arc::new(parse(selector, GrammarGeneration::Extended).unwrap());
        QueryPlan::compile(selector, expression, registry).unwrap()
    }

    fn run(doc: &Document, selector: &str) -> Vec<NodeId> {
        plan(selector, &EngineRegistry::new()).evaluate(doc).unwrap()
    }

    /// section#host [shadow: span(data-testid=foo), div [shadow: span#target(foo), span(foo)]]
    fn deep_shadow() -> (Document, [NodeId; 3]) {
        let mut doc = Document::new();
        let body = doc.body();
        let section = doc.append_element(body, "section", &[]).unwrap();
        let root1 = doc.attach_shadow(section, ShadowRootMode::Open).unwrap();
        let span1 = doc
            .append_element(root1, "span", &[("data-testid", "foo")])
            .unwrap();
        let inner = doc.append_element(root1, "div", &[]).unwrap();
        let root2 = doc.attach_shadow(inner, ShadowRootMode::Open).unwrap();
        let span2 = doc
            .append_element(root2, "span", &[("id", "target"), ("data-testid", "foo")])
            .unwrap();
        let span3 = doc
            .append_element(root2, "span", &[("data-testid", "foo")])
            .unwrap();
        (doc, [span1, span2, span3])
    }

    mod engine_clause_tests {
        use super::*;

        #[test]
        fn test_attribute_engines_pierce_by_default() {
            let (doc, spans) = deep_shadow();
            assert_eq!(run(&doc, "id=target"), vec![spans[1]]);
            assert_eq!(run(&doc, "data-testid=foo"), spans.to_vec());
            assert_eq!(run(&doc, "data-testid='foo'"), spans.to_vec());
        }

        #[test]
        fn test_light_engines_stay_out_of_shadow_trees() {
            let (doc, _) = deep_shadow();
            assert!(run(&doc, "id:light=target").is_empty());
            assert!(run(&doc, "data-testid:light=foo").is_empty());
            assert!(run(&doc, "span:light").is_empty());
        }

        #[test]
        fn test_text_engine() {
            let mut doc = Document::new();
            let body = doc.body();
            let div = doc.append_element(body, "div", &[]).unwrap();
            let span = doc.append_element(div, "span", &[]).unwrap();
            doc.set_text_content(span, "Hello world").unwrap();
            assert_eq!(run(&doc, "text=hello"), vec![span]);
            assert_eq!(run(&doc, r#""Hello world""#), vec![span]);
            assert!(run(&doc, r#""Hello""#).is_empty());
            assert_eq!(run(&doc, "text=/WORLD$/i"), vec![span]);
        }

        #[test]
        fn test_bad_text_pattern_fails_compilation() {
            let expression = Arc::new(parse("text=/(/", GrammarGeneration::Extended).unwrap());
            let err = QueryPlan::compile("text=/(/", expression, &EngineRegistry::new()).unwrap_err();
            assert!(matches!(err, PierceError::Syntax { .. }));
        }
    }

    mod chain_tests {
        use super::*;

        #[test]
        fn test_chained_clauses_search_descendants() {
            let (doc, spans) = deep_shadow();
            assert_eq!(run(&doc, "section >> div >> span"), vec![spans[1], spans[2]]);
            assert_eq!(run(&doc, "section >> id=target"), vec![spans[1]]);
            assert!(run(&doc, "span >> span").is_empty());
        }

        #[test]
        fn test_chain_result_is_sorted_and_unique() {
            let mut doc = Document::new();
            let body = doc.body();
            let outer = doc.append_element(body, "div", &[]).unwrap();
            let inner = doc.append_element(outer, "div", &[]).unwrap();
            let p = doc.append_element(inner, "p", &[]).unwrap();
            let q = doc.append_element(outer, "p", &[]).unwrap();
            assert_eq!(run(&doc, "div >> p"), vec![p, q]);
        }

        #[test]
        fn test_evaluation_is_repeatable() {
            let (doc, _) = deep_shadow();
            let plan = plan("data-testid=foo >> *, span", &EngineRegistry::new());
            assert_eq!(plan.evaluate(&doc).unwrap(), plan.evaluate(&doc).unwrap());
        }
    }

    mod custom_engine_tests {
        use super::*;

        struct TagEngine;

        impl SelectorEngine for TagEngine {
            fn query_all(&self, scope: &EngineScope<'_>, body: &str) -> Result<Vec<NodeId>, String> {
                if body == "fail" {
                    return Err("engine failed".to_string());
                }
                let dom = scope.dom();
                let mut found: Vec<NodeId> = scope
                    .elements()
                    .into_iter()
                    .filter(|&node| dom.tag_name(node) == Some(body))
                    .collect();
                found.reverse();
                found.extend(found.clone());
                Ok(found)
            }
        }

        #[test]
        fn test_custom_results_are_sorted_and_deduplicated() {
            let (doc, spans) = deep_shadow();
            let registry = EngineRegistry::new();
            registry.register("tag", Arc::new(TagEngine)).unwrap();
            assert_eq!(plan("tag=span", &registry).evaluate(&doc).unwrap(), spans.to_vec());
        }

        #[test]
        fn test_custom_results_outside_scope_are_dropped() {
            let (doc, spans) = deep_shadow();
            let body = doc.body();
            let section = doc.children(body)[0];
            let everywhere = vec![body, section, spans[0], spans[2]];
            let registry = EngineRegistry::new();
            registry
                .register(
                    "everywhere",
                    Arc::new(move |_: &EngineScope<'_>, _: &str| {
                        Ok::<_, String>(everywhere.clone())
                    }),
                )
                .unwrap();

            assert_eq!(
                plan("section >> everywhere=x", &registry).evaluate(&doc).unwrap(),
                vec![spans[0], spans[2]]
            );
            assert_eq!(
                plan("section >> everywhere:light=x", &registry).evaluate(&doc).unwrap(),
                Vec::<NodeId>::new()
            );
            assert_eq!(
                plan("id=target >> everywhere=x", &registry).evaluate(&doc).unwrap(),
                Vec::<NodeId>::new()
            );
        }

        #[test]
        fn test_custom_engine_error_is_evaluation_error() {
            let (doc, _) = deep_shadow();
            let registry = EngineRegistry::new();
            registry.register("tag", Arc::new(TagEngine)).unwrap();
            let err = plan("tag=fail", &registry).evaluate(&doc).unwrap_err();
            assert!(err.is_transient());
            assert!(err.to_string().contains("tag=fail"));
        }
    }
}
