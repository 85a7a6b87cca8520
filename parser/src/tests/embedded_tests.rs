//! Embedded grammars: nested parses spliced back as terminal-like leaves.

use std::sync::Arc;

use espalier_runtime::{RuleSetBuilder, RuntimeRuleSet};

use crate::tests::children_of;
use crate::Parser;

fn inner_b() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("inner")
        .literal("'b'", "b")
        .concatenation("B", &["'b'"])
        .build()
}

/// Outer `S = 'a' gB 'a'` where `gB` embeds grammar `B = 'b'`.
fn outer_rules(inner: Arc<RuntimeRuleSet>) -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("outer")
        .literal("'a'", "a")
        .embedded("gB", inner, "B")
        .concatenation("S", &["'a'", "gB", "'a'"])
        .build()
}

#[test]
fn embedded_grammar_parses_as_one_leaf() {
    let parser = Parser::new(outer_rules(inner_b()));
    let result = parser.parse_for_goal("S", "aba").expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    assert!(result.issues.is_empty());
    let children = children_of(&tree, tree.root_id());
    assert_eq!(children.len(), 3);
    let gb = children[1];
    assert_eq!(tree.node(gb).tag, "gB");
    assert_eq!(tree.node(gb).span, (1, 2));
    // The middle child wraps the independent nested parse of B.
    let inner_root = children_of(&tree, gb)[0];
    assert_eq!(tree.node(inner_root).tag, "B");
    assert_eq!(tree.text_of(inner_root, "aba"), "b");
}

#[test]
fn embedded_failure_is_wrapped_not_flattened() {
    let parser = Parser::new(outer_rules(inner_b()));
    let result = parser.parse_for_goal("S", "aca").expect("parse runs");
    assert!(result.tree.is_none());
    let issue = &result.issues[0];
    assert_eq!(issue.location.position, 1);
    assert!(
        issue.expected.contains("'b'"),
        "the embedded grammar's expectation survives the boundary: {:?}",
        issue.expected
    );
}

#[test]
fn embedded_rule_sets_are_discoverable() {
    let inner = inner_b();
    let outer = outer_rules(Arc::clone(&inner));
    let found = outer.embedded_rule_sets();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].number(), inner.number());
    assert!(inner.embedded_rule_sets().is_empty());
}

#[test]
fn two_levels_of_embedding() {
    let innermost = RuleSetBuilder::new("deep")
        .literal("'c'", "c")
        .concatenation("C", &["'c'"])
        .build();
    let middle = RuleSetBuilder::new("mid")
        .literal("'b'", "b")
        .embedded("gC", Arc::clone(&innermost), "C")
        .concatenation("B", &["'b'", "gC"])
        .build();
    let outer = RuleSetBuilder::new("top")
        .literal("'a'", "a")
        .embedded("gB", Arc::clone(&middle), "B")
        .concatenation("S", &["'a'", "gB"])
        .build();
    assert_eq!(outer.embedded_rule_sets().len(), 2);
    let parser = Parser::new(outer);
    let result = parser.parse_for_goal("S", "abc").expect("parse runs");
    assert!(result.tree.is_some(), "nested embedding parses end to end");
}
