//! Programmatic construction of rule sets.
//!
//! `RuleSetBuilder` is the ingestion surface for the grammar compiler (and
//! for tests): rules are declared by tag, cross-references are resolved at
//! `build()` time, and the synthetic machinery — one goal rule per
//! non-skip non-terminal, the skip choice/multi pair — is appended
//! automatically. A dangling tag reference is a programming error and
//! panics at `build()`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::position::RuleIndex;
use crate::precedence::PrecedenceRule;
use crate::rhs::{ChoiceKind, RuntimeRuleRhs, TerminalRhs};
use crate::rule::{RuleKind, RuntimeRule};
use crate::rule_set::RuntimeRuleSet;

enum PendingRhs {
    Terminal(TerminalRhs),
    Embedded { rule_set: Arc<RuntimeRuleSet>, goal_tag: String },
    Concatenation { items: Vec<String> },
    Choice { kind: ChoiceKind, options: Vec<Vec<String>> },
    Optional { item: String },
    ListSimple { min: u32, max: Option<u32>, item: String },
    ListSeparated { min: u32, max: Option<u32>, item: String, separator: String },
}

struct PendingRule {
    tag: String,
    is_skip: bool,
    rhs: PendingRhs,
}

pub struct RuleSetBuilder {
    name: String,
    pending: Vec<PendingRule>,
    precedence_rules: Vec<PrecedenceRule>,
}

impl RuleSetBuilder {
    pub fn new(name: &str) -> Self {
        RuleSetBuilder {
            name: name.to_string(),
            pending: Vec::new(),
            precedence_rules: Vec::new(),
        }
    }

    fn push(&mut self, tag: &str, is_skip: bool, rhs: PendingRhs) -> &mut Self {
        if self.pending.iter().any(|p| p.tag == tag) {
            panic!("rule '{tag}' defined twice in rule set '{}'", self.name);
        }
        self.pending.push(PendingRule { tag: tag.to_string(), is_skip, rhs });
        self
    }

    /// A terminal matching the literal text exactly.
    pub fn literal(&mut self, tag: &str, text: &str) -> &mut Self {
        self.push(tag, false, PendingRhs::Terminal(TerminalRhs::Literal(text.to_string())))
    }

    /// A terminal matching a regular expression.
    pub fn pattern(&mut self, tag: &str, pattern: &str) -> &mut Self {
        self.push(tag, false, PendingRhs::Terminal(TerminalRhs::Pattern(pattern.to_string())))
    }

    /// A skip terminal matching the literal text.
    pub fn skip_literal(&mut self, tag: &str, text: &str) -> &mut Self {
        self.push(tag, true, PendingRhs::Terminal(TerminalRhs::Literal(text.to_string())))
    }

    /// A skip terminal matching a regular expression.
    pub fn skip_pattern(&mut self, tag: &str, pattern: &str) -> &mut Self {
        self.push(tag, true, PendingRhs::Terminal(TerminalRhs::Pattern(pattern.to_string())))
    }

    pub fn concatenation(&mut self, tag: &str, items: &[&str]) -> &mut Self {
        let items = items.iter().map(|s| s.to_string()).collect();
        self.push(tag, false, PendingRhs::Concatenation { items })
    }

    pub fn choice(&mut self, tag: &str, kind: ChoiceKind, options: &[&[&str]]) -> &mut Self {
        let options = options
            .iter()
            .map(|o| o.iter().map(|s| s.to_string()).collect())
            .collect();
        self.push(tag, false, PendingRhs::Choice { kind, options })
    }

    pub fn optional(&mut self, tag: &str, item: &str) -> &mut Self {
        self.push(tag, false, PendingRhs::Optional { item: item.to_string() })
    }

    pub fn list(&mut self, tag: &str, min: u32, max: Option<u32>, item: &str) -> &mut Self {
        self.push(tag, false, PendingRhs::ListSimple { min, max, item: item.to_string() })
    }

    pub fn separated_list(
        &mut self,
        tag: &str,
        min: u32,
        max: Option<u32>,
        item: &str,
        separator: &str,
    ) -> &mut Self {
        self.push(
            tag,
            false,
            PendingRhs::ListSeparated {
                min,
                max,
                item: item.to_string(),
                separator: separator.to_string(),
            },
        )
    }

    /// A terminal-like rule delegating to a goal rule of another complete
    /// rule set.
    pub fn embedded(&mut self, tag: &str, rule_set: Arc<RuntimeRuleSet>, goal_tag: &str) -> &mut Self {
        self.push(
            tag,
            false,
            PendingRhs::Embedded { rule_set, goal_tag: goal_tag.to_string() },
        )
    }

    pub fn precedence(&mut self, rule: PrecedenceRule) -> &mut Self {
        self.precedence_rules.push(rule);
        self
    }

    /// Resolve all tag references, synthesize goal and skip rules, and
    /// freeze the rule set.
    pub fn build(&mut self) -> Arc<RuntimeRuleSet> {
        let index_of: BTreeMap<String, RuleIndex> = self
            .pending
            .iter()
            .enumerate()
            .map(|(i, p)| (p.tag.clone(), i as RuleIndex))
            .collect();
        let resolve = |tag: &str| -> RuleIndex {
            *index_of.get(tag).unwrap_or_else(|| {
                panic!("rule set '{}' references undefined rule '{tag}'", self.name)
            })
        };

        let set_number_placeholder = 0; // patched once the set number is allocated
        let mut rules: Vec<RuntimeRule> = Vec::with_capacity(self.pending.len() + 8);
        for (i, p) in self.pending.iter().enumerate() {
            let rhs = match &p.rhs {
                PendingRhs::Terminal(t) => RuntimeRuleRhs::Terminal(t.clone()),
                PendingRhs::Embedded { rule_set, goal_tag } => RuntimeRuleRhs::Embedded {
                    rule_set: Arc::clone(rule_set),
                    goal_tag: goal_tag.clone(),
                },
                PendingRhs::Concatenation { items } => RuntimeRuleRhs::Concatenation {
                    items: items.iter().map(|t| resolve(t)).collect(),
                },
                PendingRhs::Choice { kind, options } => RuntimeRuleRhs::Choice {
                    kind: *kind,
                    options: options
                        .iter()
                        .map(|o| o.iter().map(|t| resolve(t)).collect())
                        .collect(),
                },
                PendingRhs::Optional { item } => RuntimeRuleRhs::Optional { item: resolve(item) },
                PendingRhs::ListSimple { min, max, item } => RuntimeRuleRhs::ListSimple {
                    min: *min,
                    max: *max,
                    item: resolve(item),
                },
                PendingRhs::ListSeparated { min, max, item, separator } => {
                    RuntimeRuleRhs::ListSeparated {
                        min: *min,
                        max: *max,
                        item: resolve(item),
                        separator: resolve(separator),
                    }
                }
            };
            rules.push(RuntimeRule {
                rule_set_number: set_number_placeholder,
                rule_number: i as RuleIndex,
                tag: p.tag.clone(),
                is_skip: p.is_skip,
                is_pseudo: false,
                rhs,
            });
        }

        // Synthesize the skip choice/multi pair and its goal.
        let skip_tags: Vec<RuleIndex> = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_skip)
            .map(|(i, _)| i as RuleIndex)
            .collect();
        let skip_goal = if skip_tags.is_empty() {
            None
        } else {
            let choice_idx = rules.len() as RuleIndex;
            rules.push(RuntimeRule {
                rule_set_number: set_number_placeholder,
                rule_number: choice_idx,
                tag: "<SKIP-CHOICE>".to_string(),
                is_skip: true,
                is_pseudo: true,
                rhs: RuntimeRuleRhs::Choice {
                    kind: ChoiceKind::LongestPriority,
                    options: skip_tags.iter().map(|&t| vec![t]).collect(),
                },
            });
            let multi_idx = rules.len() as RuleIndex;
            rules.push(RuntimeRule {
                rule_set_number: set_number_placeholder,
                rule_number: multi_idx,
                tag: "<SKIP-MULTI>".to_string(),
                is_skip: true,
                is_pseudo: true,
                rhs: RuntimeRuleRhs::ListSimple { min: 1, max: None, item: choice_idx },
            });
            let goal_idx = rules.len() as RuleIndex;
            rules.push(RuntimeRule {
                rule_set_number: set_number_placeholder,
                rule_number: goal_idx,
                tag: "<GOAL-SKIP>".to_string(),
                is_skip: true,
                is_pseudo: true,
                rhs: RuntimeRuleRhs::Goal { item: multi_idx },
            });
            Some(goal_idx)
        };

        // Synthesize one goal rule per non-skip non-terminal.
        let user_rule_count = rules.len();
        for i in 0..user_rule_count {
            let rule = &rules[i];
            if rule.is_skip || rule.is_pseudo {
                continue;
            }
            if matches!(rule.kind(), RuleKind::NonTerminal | RuleKind::Embedded) {
                let goal_idx = rules.len() as RuleIndex;
                let tag = format!("<GOAL-{}>", rule.tag);
                let item = i as RuleIndex;
                rules.push(RuntimeRule {
                    rule_set_number: set_number_placeholder,
                    rule_number: goal_idx,
                    tag,
                    is_skip: false,
                    is_pseudo: true,
                    rhs: RuntimeRuleRhs::Goal { item },
                });
            }
        }

        let set = RuntimeRuleSet::new(
            self.name.clone(),
            rules,
            std::mem::take(&mut self.precedence_rules),
            skip_goal,
        );
        let number = set.number();
        let mut set = set;
        for r in &mut set.rules {
            r.rule_set_number = number;
        }
        Arc::new(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_goal_rules_for_nonterminals() {
        let set = RuleSetBuilder::new("g")
            .literal("'a'", "a")
            .concatenation("S", &["'a'"])
            .build();
        let goal = set.goal_rule_for("S").expect("goal rule for S");
        assert!(set.rule(goal).is_pseudo);
        assert_eq!(set.rule(goal).kind(), RuleKind::Goal);
        assert!(set.goal_rule_for("'a'").is_none());
    }

    #[test]
    fn synthesizes_skip_pair_once() {
        let set = RuleSetBuilder::new("g")
            .skip_pattern("WS", r"\s+")
            .literal("'a'", "a")
            .concatenation("S", &["'a'"])
            .build();
        let goal = set.skip_goal().expect("skip goal");
        assert_eq!(set.rule(goal).tag, "<GOAL-SKIP>");
        assert_eq!(set.skip_rules().len(), 1);
        assert_eq!(set.skip_terminals().len(), 1);
    }

    #[test]
    #[should_panic]
    fn dangling_reference_is_fatal() {
        RuleSetBuilder::new("g").concatenation("S", &["missing"]).build();
    }
}
