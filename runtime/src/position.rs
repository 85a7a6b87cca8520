//! Rule positions: "dotted" points within a rule's right-hand side.
//!
//! A `RulePosition` names a rule, one of its options (alternatives), and a
//! position inside that option. Positions are the algebra the automaton is
//! built from: `items_at` answers "which rules are expected here" and
//! `next` answers "where does consuming one of them lead".

use crate::rule_set::RuntimeRuleSet;

/// Index of a rule within its rule set. Negative values are the
/// process-wide sentinel rules (see [`crate::rule`]).
pub type RuleIndex = i32;

/// Position at the start of a rule option.
pub const POSITION_START: i32 = 0;
/// Position after the last item of a rule option.
pub const POSITION_END: i32 = -1;
/// Loop position of an unbounded list once its minimum is satisfied:
/// expecting one more item.
pub const POSITION_MULTI_ITEM: i32 = -2;
/// Loop position of an unbounded separated list: expecting the separator.
pub const POSITION_MULTI_SEPARATOR: i32 = -3;

/// A rule, a chosen option, and a position within that option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RulePosition {
    pub rule: RuleIndex,
    pub option: u32,
    pub position: i32,
}

impl RulePosition {
    pub fn new(rule: RuleIndex, option: u32, position: i32) -> Self {
        RulePosition { rule, option, position }
    }

    /// Position at the start of the given option.
    pub fn start(rule: RuleIndex, option: u32) -> Self {
        RulePosition::new(rule, option, POSITION_START)
    }

    /// Position at the end of the given option.
    pub fn end(rule: RuleIndex, option: u32) -> Self {
        RulePosition::new(rule, option, POSITION_END)
    }

    pub fn is_at_start(&self) -> bool {
        self.position == POSITION_START
    }

    pub fn is_at_end(&self) -> bool {
        self.position == POSITION_END
    }

    /// The rules expected to start at this position. Empty at end-of-rule
    /// and for terminal rules.
    pub fn items(&self, rules: &RuntimeRuleSet) -> Vec<RuleIndex> {
        if self.is_at_end() {
            return Vec::new();
        }
        rules.rule(self.rule).rhs.items_at(self.option, self.position)
    }

    /// Successor positions reachable by consuming one expected item.
    /// Empty at end-of-rule.
    pub fn next(&self, rules: &RuntimeRuleSet) -> Vec<RulePosition> {
        if self.is_at_end() {
            return Vec::new();
        }
        rules
            .rule(self.rule)
            .rhs
            .next_positions(self.rule, self.option, self.position)
    }
}

/// A (rule, option) pair: the disambiguation key between automaton states
/// derived from the same rule at the same textual position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleOption {
    pub rule: RuleIndex,
    pub option: u32,
}

impl RuleOption {
    pub fn new(rule: RuleIndex, option: u32) -> Self {
        RuleOption { rule, option }
    }
}

impl From<RulePosition> for RuleOption {
    fn from(rp: RulePosition) -> Self {
        RuleOption::new(rp.rule, rp.option)
    }
}
