//! Right-hand-side definitions of runtime rules.
//!
//! Every grammar construct (concatenation, choice, optional, lists,
//! embedded sub-grammars) normalizes to one of the variants here. The two
//! operations `items_at` and `next_positions` are the sole contract the
//! closure and automaton code depend on; each variant implements them as
//! pure functions of its fields.
//!
//! List multiplicity is encoded in the position space: bounded lists count
//! items with numeric positions up to `max`; unbounded lists count up to
//! `min` and then cycle through the `POSITION_MULTI_*` loop positions.

use std::sync::Arc;

use crate::position::{
    RuleIndex, RulePosition, POSITION_MULTI_ITEM, POSITION_MULTI_SEPARATOR, POSITION_START,
};
use crate::rule::{RULE_EMPTY, RULE_EMPTY_LIST};
use crate::rule_set::RuntimeRuleSet;

/// Disambiguation policy of a choice rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    /// Keep all derivations; the result tree carries alternatives.
    Ambiguous,
    /// Prefer the longer match, then the higher-priority option.
    LongestPriority,
    /// Prefer the higher-priority option, then the longer match.
    /// Priority is the option index: later options bind looser and win at
    /// the outermost level.
    PriorityLongest,
}

/// Payload of a terminal rule. Terminals store no sub-items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalRhs {
    /// Matches the literal text exactly.
    Literal(String),
    /// Matches a regular expression (source text; compilation is the
    /// scanner's concern).
    Pattern(String),
    /// Matches only at end of input, zero width.
    EndOfText,
    /// Matches anywhere, zero width. The empty branch of an optional.
    Empty,
    /// Matches anywhere, zero width. The empty branch of a list.
    EmptyList,
}

/// The right-hand side of a rule. Option numbering:
/// single-option variants use option 0; `Choice` uses the alternative
/// index; `Optional` and the list variants reserve option 1 for their
/// empty branch.
#[derive(Debug, Clone)]
pub enum RuntimeRuleRhs {
    /// Wraps exactly one user start rule. Two positions: start, end.
    Goal { item: RuleIndex },
    Terminal(TerminalRhs),
    /// Terminal-like reference into another complete rule set. The
    /// referenced set is shared, not owned.
    Embedded {
        rule_set: Arc<RuntimeRuleSet>,
        goal_tag: String,
    },
    Concatenation {
        items: Vec<RuleIndex>,
    },
    Choice {
        kind: ChoiceKind,
        options: Vec<Vec<RuleIndex>>,
    },
    Optional {
        item: RuleIndex,
    },
    ListSimple {
        min: u32,
        max: Option<u32>,
        item: RuleIndex,
    },
    ListSeparated {
        min: u32,
        max: Option<u32>,
        item: RuleIndex,
        separator: RuleIndex,
    },
}

/// Option index of the item-bearing branch of optionals and lists.
pub const OPTION_ITEMS: u32 = 0;
/// Option index of the empty branch of optionals and lists.
pub const OPTION_EMPTY: u32 = 1;

impl RuntimeRuleRhs {
    /// The options a derivation of this rule may start with.
    pub fn start_options(&self) -> Vec<u32> {
        match self {
            RuntimeRuleRhs::Choice { options, .. } => (0..options.len() as u32).collect(),
            RuntimeRuleRhs::Optional { .. } => vec![OPTION_ITEMS, OPTION_EMPTY],
            RuntimeRuleRhs::ListSimple { min, .. }
            | RuntimeRuleRhs::ListSeparated { min, .. } => {
                if *min == 0 {
                    vec![OPTION_ITEMS, OPTION_EMPTY]
                } else {
                    vec![OPTION_ITEMS]
                }
            }
            _ => vec![0],
        }
    }

    /// The rules expected at (option, position). Panics on a pair outside
    /// this rule's shape: that is a broken rule model, not bad input.
    pub fn items_at(&self, option: u32, position: i32) -> Vec<RuleIndex> {
        match self {
            RuntimeRuleRhs::Goal { item } => {
                check_shape(option == 0 && position == POSITION_START, option, position, "goal");
                vec![*item]
            }
            RuntimeRuleRhs::Terminal(_) | RuntimeRuleRhs::Embedded { .. } => Vec::new(),
            RuntimeRuleRhs::Concatenation { items } => {
                let idx = position as usize;
                check_shape(
                    option == 0 && position >= 0 && idx < items.len(),
                    option,
                    position,
                    "concatenation",
                );
                vec![items[idx]]
            }
            RuntimeRuleRhs::Choice { options, .. } => {
                let items = options.get(option as usize).unwrap_or_else(|| {
                    panic!("choice has no option {option} (position {position})")
                });
                let idx = position as usize;
                check_shape(position >= 0 && idx < items.len(), option, position, "choice");
                vec![items[idx]]
            }
            RuntimeRuleRhs::Optional { item } => {
                check_shape(position == POSITION_START, option, position, "optional");
                match option {
                    OPTION_ITEMS => vec![*item],
                    OPTION_EMPTY => vec![RULE_EMPTY],
                    _ => panic!("optional has no option {option}"),
                }
            }
            RuntimeRuleRhs::ListSimple { min, max, item } => match option {
                OPTION_ITEMS => {
                    check_shape(
                        position == POSITION_MULTI_ITEM
                            || (0..list_numeric_len(*min, *max) as i32).contains(&position),
                        option,
                        position,
                        "list",
                    );
                    vec![*item]
                }
                OPTION_EMPTY if *min == 0 => {
                    check_shape(position == POSITION_START, option, position, "list");
                    vec![RULE_EMPTY_LIST]
                }
                _ => panic!("list has no option {option}"),
            },
            RuntimeRuleRhs::ListSeparated { min, max, item, separator } => match option {
                OPTION_ITEMS => match position {
                    POSITION_MULTI_ITEM => vec![*item],
                    POSITION_MULTI_SEPARATOR => vec![*separator],
                    p => {
                        check_shape(
                            p >= 0 && (p as u32) < slist_numeric_len(*min, *max),
                            option,
                            position,
                            "separated list",
                        );
                        if p % 2 == 0 {
                            vec![*item]
                        } else {
                            vec![*separator]
                        }
                    }
                },
                OPTION_EMPTY if *min == 0 => {
                    check_shape(position == POSITION_START, option, position, "separated list");
                    vec![RULE_EMPTY_LIST]
                }
                _ => panic!("separated list has no option {option}"),
            },
        }
    }

    /// Successor positions reachable from (option, position) by consuming
    /// one expected item.
    pub fn next_positions(&self, rule: RuleIndex, option: u32, position: i32) -> Vec<RulePosition> {
        match self {
            RuntimeRuleRhs::Goal { .. }
            | RuntimeRuleRhs::Terminal(_)
            | RuntimeRuleRhs::Embedded { .. }
            | RuntimeRuleRhs::Optional { .. } => {
                // One item (or the empty sentinel), then done.
                self.items_at(option, position);
                vec![RulePosition::end(rule, option)]
            }
            RuntimeRuleRhs::Concatenation { items } => {
                self.items_at(option, position);
                if (position as usize) + 1 < items.len() {
                    vec![RulePosition::new(rule, option, position + 1)]
                } else {
                    vec![RulePosition::end(rule, option)]
                }
            }
            RuntimeRuleRhs::Choice { options, .. } => {
                self.items_at(option, position);
                if (position as usize) + 1 < options[option as usize].len() {
                    vec![RulePosition::new(rule, option, position + 1)]
                } else {
                    vec![RulePosition::end(rule, option)]
                }
            }
            RuntimeRuleRhs::ListSimple { min, max, .. } => {
                self.items_at(option, position);
                if option == OPTION_EMPTY {
                    return vec![RulePosition::end(rule, option)];
                }
                let min_eff = (*min).max(1);
                let mut succ = Vec::with_capacity(2);
                match (position, max) {
                    (POSITION_MULTI_ITEM, _) => {
                        succ.push(RulePosition::new(rule, option, POSITION_MULTI_ITEM));
                        succ.push(RulePosition::end(rule, option));
                    }
                    (p, Some(max)) => {
                        let count = p as u32 + 1;
                        if count < *max {
                            succ.push(RulePosition::new(rule, option, p + 1));
                        }
                        if count >= min_eff {
                            succ.push(RulePosition::end(rule, option));
                        }
                    }
                    (p, None) => {
                        let count = p as u32 + 1;
                        if count < min_eff {
                            succ.push(RulePosition::new(rule, option, p + 1));
                        } else {
                            succ.push(RulePosition::new(rule, option, POSITION_MULTI_ITEM));
                            succ.push(RulePosition::end(rule, option));
                        }
                    }
                }
                succ
            }
            RuntimeRuleRhs::ListSeparated { min, max, .. } => {
                self.items_at(option, position);
                if option == OPTION_EMPTY {
                    return vec![RulePosition::end(rule, option)];
                }
                let min_eff = (*min).max(1);
                let mut succ = Vec::with_capacity(2);
                match (position, max) {
                    (POSITION_MULTI_ITEM, _) => {
                        succ.push(RulePosition::new(rule, option, POSITION_MULTI_SEPARATOR));
                        succ.push(RulePosition::end(rule, option));
                    }
                    (POSITION_MULTI_SEPARATOR, _) => {
                        succ.push(RulePosition::new(rule, option, POSITION_MULTI_ITEM));
                    }
                    (p, Some(max)) if p % 2 == 0 => {
                        let count = p as u32 / 2 + 1;
                        if count < *max {
                            succ.push(RulePosition::new(rule, option, p + 1));
                        }
                        if count >= min_eff {
                            succ.push(RulePosition::end(rule, option));
                        }
                    }
                    (p, Some(_)) => {
                        // After a separator the next item is mandatory.
                        succ.push(RulePosition::new(rule, option, p + 1));
                    }
                    (p, None) if p % 2 == 0 => {
                        let count = p as u32 / 2 + 1;
                        if count < min_eff {
                            succ.push(RulePosition::new(rule, option, p + 1));
                        } else {
                            succ.push(RulePosition::new(rule, option, POSITION_MULTI_SEPARATOR));
                            succ.push(RulePosition::end(rule, option));
                        }
                    }
                    (p, None) => {
                        succ.push(RulePosition::new(rule, option, p + 1));
                    }
                }
                succ
            }
        }
    }
}

/// Number of numeric item positions a simple list uses.
fn list_numeric_len(min: u32, max: Option<u32>) -> u32 {
    match max {
        Some(max) => max,
        None => min.max(1),
    }
}

/// Number of numeric positions a separated list uses (items and
/// separators interleaved).
fn slist_numeric_len(min: u32, max: Option<u32>) -> u32 {
    match max {
        Some(max) => 2 * max - 1,
        None => 2 * min.max(1) - 1,
    }
}

fn check_shape(ok: bool, option: u32, position: i32, shape: &str) {
    if !ok {
        panic!("(option {option}, position {position}) is outside this {shape} rule");
    }
}
