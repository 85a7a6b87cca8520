//! Grammar text rendering.
//!
//! Produces a readable EBNF-flavoured listing of a rule set, one rule per
//! line, with skip rules and synthesized pseudo-rules annotated. Used by
//! diagnostics and tests to eyeball what a builder actually produced.

use std::fmt::Write;

use crate::position::RuleIndex;
use crate::rhs::{ChoiceKind, RuntimeRuleRhs, TerminalRhs};
use crate::rule_set::RuntimeRuleSet;

/// Render the whole rule set, pseudo-rules included.
pub fn format_rule_set(rules: &RuntimeRuleSet) -> String {
    let mut buf = String::with_capacity(1024);
    let _ = writeln!(buf, "grammar {} ;", rules.name());
    for rule in rules.rules() {
        let mut line = String::new();
        if rule.is_skip {
            line.push_str("skip ");
        }
        let _ = write!(line, "{} = {}", rule.tag, format_rhs(rules, &rule.rhs));
        if rule.is_pseudo {
            line.push_str(" ;  (* synthesized *)");
        } else {
            line.push_str(" ;");
        }
        let _ = writeln!(buf, "{line}");
    }
    buf
}

/// Render one right-hand side.
pub fn format_rhs(rules: &RuntimeRuleSet, rhs: &RuntimeRuleRhs) -> String {
    match rhs {
        RuntimeRuleRhs::Goal { item } => tag_of(rules, *item),
        RuntimeRuleRhs::Terminal(t) => format_terminal(t),
        RuntimeRuleRhs::Embedded { rule_set, goal_tag } => {
            format!("<{}::{}>", rule_set.name(), goal_tag)
        }
        RuntimeRuleRhs::Concatenation { items } => items_text(rules, items),
        RuntimeRuleRhs::Choice { kind, options } => {
            let sep = match kind {
                ChoiceKind::Ambiguous => " || ",
                ChoiceKind::LongestPriority => " | ",
                ChoiceKind::PriorityLongest => " < ",
            };
            options
                .iter()
                .map(|o| items_text(rules, o))
                .collect::<Vec<_>>()
                .join(sep)
        }
        RuntimeRuleRhs::Optional { item } => format!("{}?", tag_of(rules, *item)),
        RuntimeRuleRhs::ListSimple { min, max, item } => {
            format!("{}{}", tag_of(rules, *item), multiplicity(*min, *max))
        }
        RuntimeRuleRhs::ListSeparated { min, max, item, separator } => format!(
            "[{} / {}]{}",
            tag_of(rules, *item),
            tag_of(rules, *separator),
            multiplicity(*min, *max)
        ),
    }
}

fn items_text(rules: &RuntimeRuleSet, items: &[RuleIndex]) -> String {
    items
        .iter()
        .map(|&i| tag_of(rules, i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn tag_of(rules: &RuntimeRuleSet, rule: RuleIndex) -> String {
    rules.rule(rule).tag.clone()
}

fn format_terminal(t: &TerminalRhs) -> String {
    match t {
        TerminalRhs::Literal(text) => format!("'{text}'"),
        TerminalRhs::Pattern(pattern) => format!("\"{pattern}\""),
        TerminalRhs::EndOfText => "<EOT>".to_string(),
        TerminalRhs::Empty => "<empty>".to_string(),
        TerminalRhs::EmptyList => "<empty-list>".to_string(),
    }
}

fn multiplicity(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (min, None) => format!("{min}+"),
        (min, Some(max)) if min == max => format!("{{{min}}}"),
        (min, Some(max)) => format!("{{{min}..{max}}}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RuleSetBuilder;
    use crate::rhs::ChoiceKind;

    #[test]
    fn renders_rules_one_per_line() {
        let rules = RuleSetBuilder::new("demo")
            .skip_pattern("WS", r"\s+")
            .literal("'a'", "a")
            .choice("S", ChoiceKind::PriorityLongest, &[&["'a'"], &["xs"]])
            .separated_list("xs", 2, None, "'a'", "'a'")
            .build();
        let text = format_rule_set(&rules);
        assert!(text.contains("grammar demo ;"));
        assert!(text.contains("skip WS = \"\\s+\" ;"));
        assert!(text.contains("S = 'a' < xs ;"));
        assert!(text.contains("xs = ['a' / 'a']2+ ;"));
        assert!(text.contains("(* synthesized *)"), "goal rules are annotated");
    }

    #[test]
    fn renders_multiplicities() {
        assert_eq!(multiplicity(0, None), "*");
        assert_eq!(multiplicity(1, None), "+");
        assert_eq!(multiplicity(3, None), "3+");
        assert_eq!(multiplicity(2, Some(2)), "{2}");
        assert_eq!(multiplicity(1, Some(4)), "{1..4}");
    }
}
