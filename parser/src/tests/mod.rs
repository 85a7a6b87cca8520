//! Integration-level tests for the automaton builder and the GSS engine.

mod embedded_tests;
mod parser_tests;
mod property_tests;
mod skip_tests;

use std::sync::Arc;

use espalier_runtime::{ChoiceKind, RuleSetBuilder, RuntimeRuleSet};

/// `S = 'a' 'b' 'c'`
pub(crate) fn abc_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("abc")
        .literal("'a'", "a")
        .literal("'b'", "b")
        .literal("'c'", "c")
        .concatenation("S", &["'a'", "'b'", "'c'"])
        .build()
}

/// `S = 'a' | S 'a'` — unambiguous left-recursive list.
pub(crate) fn left_recursive_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("leftrec")
        .literal("'a'", "a")
        .choice("S", ChoiceKind::LongestPriority, &[&["'a'"], &["S", "'a'"]])
        .build()
}

/// `S = E; E = R < M < A; R = 'v'; M = [E/'m']2+; A = [E/'a']2+`
/// Priority-longest choice: addition (listed last) binds loosest.
pub(crate) fn arithmetic_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("arith")
        .literal("'v'", "v")
        .literal("'m'", "m")
        .literal("'a'", "a")
        .concatenation("R", &["'v'"])
        .separated_list("M", 2, None, "E", "'m'")
        .separated_list("A", 2, None, "E", "'a'")
        .choice("E", ChoiceKind::PriorityLongest, &[&["R"], &["M"], &["A"]])
        .concatenation("S", &["E"])
        .build()
}

/// `S = b | a S c` — nested recursion.
pub(crate) fn nested_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("nested")
        .literal("'a'", "a")
        .literal("'b'", "b")
        .literal("'c'", "c")
        .choice("S", ChoiceKind::LongestPriority, &[&["'b'"], &["'a'", "S", "'c'"]])
        .build()
}

/// Skip rule `WS = "\s+"` and `S = 'a'`.
pub(crate) fn skip_ws_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("skipws")
        .skip_pattern("WS", r"\s+")
        .literal("'a'", "a")
        .concatenation("S", &["'a'"])
        .build()
}

/// `A = A A | 'a'` — exponentially ambiguous.
pub(crate) fn ambiguous_rules() -> Arc<RuntimeRuleSet> {
    RuleSetBuilder::new("ambig")
        .literal("'a'", "a")
        .choice("A", ChoiceKind::Ambiguous, &[&["A", "A"], &["'a'"]])
        .build()
}

/// Tags of a branch node's children, in order.
pub(crate) fn child_tags(tree: &espalier_runtime::ParseTree, id: espalier_runtime::TreeNodeId) -> Vec<String> {
    match &tree.node(id).kind {
        espalier_runtime::TreeNodeKind::Branch { children, .. } => children
            .iter()
            .map(|&c| tree.node(c).tag.clone())
            .collect(),
        espalier_runtime::TreeNodeKind::Leaf => Vec::new(),
    }
}

/// Child ids of a branch node.
pub(crate) fn children_of(
    tree: &espalier_runtime::ParseTree,
    id: espalier_runtime::TreeNodeId,
) -> Vec<espalier_runtime::TreeNodeId> {
    match &tree.node(id).kind {
        espalier_runtime::TreeNodeKind::Branch { children, .. } => children.clone(),
        espalier_runtime::TreeNodeKind::Leaf => Vec::new(),
    }
}
