//! Skip-rule interleaving: whitespace and comments as trivia.

use espalier_runtime::RuleSetBuilder;

use crate::tests::{children_of, skip_ws_rules};
use crate::{ParseOptions, Parser};

#[test]
fn surrounding_whitespace_becomes_trivia() {
    let parser = Parser::new(skip_ws_rules());
    let result = parser.parse_for_goal("S", " a ").expect("parse runs");
    let tree = result.tree.expect("skip text does not block the parse");
    assert!(result.issues.is_empty());
    // Grammar content is just the 'a'.
    let root = tree.root();
    assert_eq!(root.tag, "S");
    assert_eq!(root.span, (1, 2));
    let leaf = children_of(&tree, tree.root_id())[0];
    assert_eq!(tree.text_of(leaf, " a "), "a");
    // The leading blank hangs off the leaf; the trailing one off the tree.
    assert!(!tree.node(leaf).leading_skip.is_empty());
    assert!(!tree.trailing_skip().is_empty());
}

#[test]
fn skip_between_tokens() {
    let rules = RuleSetBuilder::new("two")
        .skip_pattern("WS", r"\s+")
        .literal("'a'", "a")
        .literal("'b'", "b")
        .concatenation("S", &["'a'", "'b'"])
        .build();
    let parser = Parser::new(rules);
    let result = parser.parse_for_goal("S", "a \n b").expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    let b = children_of(&tree, tree.root_id())[1];
    assert_eq!(tree.node(b).span, (4, 5));
    assert!(!tree.node(b).leading_skip.is_empty());
}

#[test]
fn mixed_skip_rules_chain() {
    // Whitespace and line comments interleave through the skip choice.
    let rules = RuleSetBuilder::new("mixed")
        .skip_pattern("WS", r"\s+")
        .skip_pattern("COMMENT", r"//[^\n]*")
        .literal("'a'", "a")
        .concatenation("S", &["'a'", "'a'"])
        .build();
    let parser = Parser::new(rules);
    let result = parser
        .parse_for_goal("S", "a // note\n a")
        .expect("parse runs");
    assert!(result.tree.is_some(), "comment plus newline skips as one run");
}

#[test]
fn skip_matching_works_without_the_cache() {
    let parser = Parser::new(skip_ws_rules());
    let mut options = ParseOptions::for_goal("S");
    options.cache_skip = false;
    let result = parser.parse(" a ", &options).expect("parse runs");
    assert!(result.tree.is_some());
}

#[test]
fn skip_only_input_still_needs_content() {
    let parser = Parser::new(skip_ws_rules());
    let result = parser.parse_for_goal("S", "   ").expect("parse runs");
    assert!(result.tree.is_none());
    assert!(result.issues[0].expected.contains("'a'"));
}

#[test]
fn grammars_without_skip_rules_take_text_literally() {
    let rules = RuleSetBuilder::new("noskip")
        .literal("'a'", "a")
        .concatenation("S", &["'a'"])
        .build();
    let parser = Parser::new(rules);
    assert!(parser.parse_for_goal("S", " a").unwrap().tree.is_none());
    assert!(parser.parse_for_goal("S", "a").unwrap().tree.is_some());
}
