//! End-to-end parsing scenarios over the GSS engine.

use espalier_runtime::{RuleSetBuilder, TreeNodeKind};

use crate::tests::{
    abc_rules, ambiguous_rules, arithmetic_rules, child_tags, children_of, left_recursive_rules,
};
use crate::{AutomatonKind, ParseOptions, Parser};

#[test]
fn concatenation_consumes_all_input() {
    let parser = Parser::new(abc_rules());
    let result = parser.parse_for_goal("S", "abc").expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    assert!(result.issues.is_empty());
    assert!(!tree.is_ambiguous());
    let root = tree.root();
    assert_eq!(root.tag, "S");
    assert_eq!(root.span, (0, 3));
    assert_eq!(child_tags(&tree, tree.root_id()), vec!["'a'", "'b'", "'c'"]);
}

#[test]
fn rejects_wrong_terminal() {
    let parser = Parser::new(abc_rules());
    let result = parser.parse_for_goal("S", "abx").expect("parse runs");
    assert!(result.tree.is_none());
    assert!(!result.issues.is_empty());
}

#[test]
fn left_recursion_parses_unambiguously() {
    let parser = Parser::new(left_recursive_rules());
    let result = parser.parse_for_goal("S", "aaaa").expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    assert!(!tree.is_ambiguous(), "left-recursive list has one derivation");
    assert_eq!(tree.root().span, (0, 4));
    // Left spine: S(0,4) -> S(0,3) -> S(0,2) -> S(0,1).
    let mut spine = tree.root_id();
    for expected_end in [3, 2, 1] {
        let children = children_of(&tree, spine);
        assert_eq!(tree.node(children[0]).tag, "S");
        spine = children[0];
        assert_eq!(tree.node(spine).span, (0, expected_end));
    }
}

#[test]
fn priority_choice_honours_precedence_order() {
    let parser = Parser::new(arithmetic_rules());
    let result = parser.parse_for_goal("S", "vmvav").expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    assert!(result.issues.is_empty());
    assert!(!tree.is_ambiguous(), "priority choice resolves to one derivation");
    // S -> E, where E picked the addition option (the loosest binder).
    let e = children_of(&tree, tree.root_id())[0];
    assert_eq!(tree.node(e).tag, "E");
    let e_option = match &tree.node(e).kind {
        TreeNodeKind::Branch { option, .. } => *option,
        _ => panic!("E must be a branch"),
    };
    assert_eq!(e_option, 2, "addition is option 2 of E = R < M < A");
    // The addition's first operand is the multiplication over "vmv".
    let a = children_of(&tree, e)[0];
    assert_eq!(tree.node(a).tag, "A");
    let first_operand = children_of(&tree, a)[0];
    assert_eq!(tree.node(first_operand).tag, "E");
    assert_eq!(tree.node(first_operand).span, (0, 3));
    match tree.node(children_of(&tree, first_operand)[0]).tag.as_str() {
        "M" => {}
        other => panic!("expected multiplication inside the addition, got {other}"),
    }
}

#[test]
fn optional_present_and_absent() {
    let rules = RuleSetBuilder::new("opt")
        .literal("'a'", "a")
        .literal("'b'", "b")
        .optional("OB", "'b'")
        .concatenation("S", &["'a'", "OB"])
        .build();
    let parser = Parser::new(rules);

    let with = parser.parse_for_goal("S", "ab").expect("parse runs");
    let tree = with.tree.expect("'ab' parses");
    assert_eq!(tree.root().span, (0, 2));

    let without = parser.parse_for_goal("S", "a").expect("parse runs");
    let tree = without.tree.expect("'a' parses via the empty branch");
    assert_eq!(tree.root().span, (0, 1));
    let ob = children_of(&tree, tree.root_id())[1];
    assert_eq!(tree.node(ob).tag, "OB");
    assert_eq!(tree.node(ob).length(), 0);
}

#[test]
fn bounded_list_enforces_min_and_max() {
    let rules = RuleSetBuilder::new("list23")
        .literal("'a'", "a")
        .list("S", 2, Some(3), "'a'")
        .build();
    let parser = Parser::new(rules);
    assert!(parser.parse_for_goal("S", "aa").unwrap().tree.is_some());
    assert!(parser.parse_for_goal("S", "aaa").unwrap().tree.is_some());
    assert!(parser.parse_for_goal("S", "a").unwrap().tree.is_none(), "below min");
    assert!(parser.parse_for_goal("S", "aaaa").unwrap().tree.is_none(), "above max");
}

#[test]
fn separated_list_alternates_items_and_separators() {
    let rules = RuleSetBuilder::new("slist")
        .literal("'a'", "a")
        .literal("','", ",")
        .separated_list("S", 1, None, "'a'", "','")
        .build();
    let parser = Parser::new(rules);
    let result = parser.parse_for_goal("S", "a,a,a").expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    assert_eq!(
        child_tags(&tree, tree.root_id()),
        vec!["'a'", "','", "'a'", "','", "'a'"]
    );
    assert!(parser.parse_for_goal("S", "a,").unwrap().tree.is_none(), "dangling separator");
}

#[test]
fn ambiguous_choice_packs_alternatives() {
    let parser = Parser::new(ambiguous_rules());
    let mut options = ParseOptions::for_goal("A");
    options.report_grammar_ambiguities = true;
    let result = parser.parse("aaa", &options).expect("parse runs");
    let tree = result.tree.expect("parse succeeds");
    assert!(tree.is_ambiguous(), "A = A A | 'a' over 'aaa' has two splits");
    assert!(
        result
            .issues
            .iter()
            .any(|i| i.kind == crate::IssueKind::AmbiguityWarning),
        "opted-in ambiguity reporting produces a warning"
    );
}

#[test]
fn ambiguity_is_silent_unless_requested() {
    let parser = Parser::new(ambiguous_rules());
    let result = parser.parse_for_goal("A", "aaa").expect("parse runs");
    assert!(result.tree.is_some());
    assert!(result.issues.is_empty());
}

#[test]
fn lookahead_none_kind_parses_too() {
    let parser = Parser::new(abc_rules());
    let mut options = ParseOptions::for_goal("S");
    options.kind = AutomatonKind::LookaheadNone;
    let result = parser.parse("abc", &options).expect("parse runs");
    assert!(result.tree.is_some());
}

#[test]
fn run_metadata_is_populated() {
    let parser = Parser::new(abc_rules());
    let result = parser.parse_for_goal("S", "abc").expect("parse runs");
    assert!(result.rounds >= 3, "three terminals need at least three rounds");
    assert!(result.max_heads >= 1);
}

#[test]
fn one_parser_serves_many_parses() {
    let parser = Parser::new(left_recursive_rules());
    for n in 1..6 {
        let text = "a".repeat(n);
        let result = parser.parse_for_goal("S", &text).expect("parse runs");
        assert!(result.tree.is_some(), "'{text}' must parse");
    }
}

#[test]
fn deep_cloned_rule_set_parses_identically() {
    let original = arithmetic_rules();
    let clone = std::sync::Arc::new(original.deep_clone());
    assert_ne!(original.number(), clone.number());
    let a = Parser::new(original).parse_for_goal("S", "vmvav").unwrap();
    let b = Parser::new(clone).parse_for_goal("S", "vmvav").unwrap();
    let ta = a.tree.expect("original parses");
    let tb = b.tree.expect("clone parses");
    assert_eq!(ta.root().span, tb.root().span);
    assert_eq!(ta.to_text("vmvav"), tb.to_text("vmvav"));
}

#[test]
fn whole_tree_renders_matched_text() {
    let parser = Parser::new(abc_rules());
    let tree = parser.parse_for_goal("S", "abc").unwrap().tree.unwrap();
    let leaves = children_of(&tree, tree.root_id());
    assert_eq!(tree.text_of(leaves[1], "abc"), "b");
}
