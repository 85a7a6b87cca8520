//! Runtime rules and the process-wide sentinel rules.

use once_cell::sync::Lazy;

use crate::position::RuleIndex;
use crate::rhs::{RuntimeRuleRhs, TerminalRhs};

/// Rule number of the END-OF-TEXT sentinel terminal.
pub const RULE_EOT: RuleIndex = -1;
/// Rule number of the zero-width EMPTY sentinel terminal (empty branch of
/// an optional).
pub const RULE_EMPTY: RuleIndex = -2;
/// Rule number of the zero-width EMPTY-LIST sentinel terminal (empty
/// branch of a list with `min == 0`).
pub const RULE_EMPTY_LIST: RuleIndex = -3;

/// Rule-set number carried by the sentinel rules, which belong to no set.
pub const SENTINEL_RULE_SET: u32 = u32::MAX;

/// The END-OF-TEXT terminal, shared by all rule sets.
pub static END_OF_TEXT: Lazy<RuntimeRule> = Lazy::new(|| RuntimeRule {
    rule_set_number: SENTINEL_RULE_SET,
    rule_number: RULE_EOT,
    tag: "<EOT>".to_string(),
    is_skip: false,
    is_pseudo: true,
    rhs: RuntimeRuleRhs::Terminal(TerminalRhs::EndOfText),
});

/// The zero-width EMPTY terminal, shared by all rule sets.
pub static EMPTY: Lazy<RuntimeRule> = Lazy::new(|| RuntimeRule {
    rule_set_number: SENTINEL_RULE_SET,
    rule_number: RULE_EMPTY,
    tag: "<EMPTY>".to_string(),
    is_skip: false,
    is_pseudo: true,
    rhs: RuntimeRuleRhs::Terminal(TerminalRhs::Empty),
});

/// The zero-width EMPTY-LIST terminal, shared by all rule sets.
pub static EMPTY_LIST: Lazy<RuntimeRule> = Lazy::new(|| RuntimeRule {
    rule_set_number: SENTINEL_RULE_SET,
    rule_number: RULE_EMPTY_LIST,
    tag: "<EMPTY_LIST>".to_string(),
    is_skip: false,
    is_pseudo: true,
    rhs: RuntimeRuleRhs::Terminal(TerminalRhs::EmptyList),
});

/// Broad classification of a rule, derived from its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Goal,
    Terminal,
    NonTerminal,
    Embedded,
}

/// A single rule of a compiled grammar.
///
/// Identity is (rule-set number, rule number); the tag is the
/// user-visible name. The right-hand side is set at construction and never
/// mutated afterwards — the only way to get a modified copy is
/// [`crate::rule_set::RuntimeRuleSet::deep_clone`].
#[derive(Debug, Clone)]
pub struct RuntimeRule {
    pub rule_set_number: u32,
    pub rule_number: RuleIndex,
    pub tag: String,
    /// Skip rules (whitespace, comments) are matched between tokens and
    /// excluded from the primary parse tree.
    pub is_skip: bool,
    /// Pseudo rules are synthesized during compilation (goal rules, the
    /// skip choice/multi pair, group rules) and carry generated tags.
    pub is_pseudo: bool,
    pub rhs: RuntimeRuleRhs,
}

impl RuntimeRule {
    pub fn kind(&self) -> RuleKind {
        match self.rhs {
            RuntimeRuleRhs::Goal { .. } => RuleKind::Goal,
            RuntimeRuleRhs::Terminal(_) => RuleKind::Terminal,
            RuntimeRuleRhs::Embedded { .. } => RuleKind::Embedded,
            _ => RuleKind::NonTerminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.rhs, RuntimeRuleRhs::Terminal(_))
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.rhs, RuntimeRuleRhs::Embedded { .. })
    }

    /// Terminals that match without consuming input: EMPTY, EMPTY-LIST.
    pub fn is_zero_width(&self) -> bool {
        matches!(
            self.rhs,
            RuntimeRuleRhs::Terminal(TerminalRhs::Empty)
                | RuntimeRuleRhs::Terminal(TerminalRhs::EmptyList)
        )
    }
}
